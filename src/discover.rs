// 该文件是 Yunjian （云检） 项目的一部分。
// src/discover.rs - 输入图像发现
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DiscoverError {
  #[error("无法读取目录 {dir}: {source}")]
  ReadDir {
    dir: PathBuf,
    source: std::io::Error,
  },
  #[error("目录 {dir} 中没有找到 *.{extension} 图像")]
  NoImages { dir: PathBuf, extension: String },
}

/// 列出目录下匹配扩展名的图像文件，按文件名字典序排序。
///
/// 空目录（或没有匹配文件）是整个管线唯一的输入校验点，
/// 返回 `NoImages` 终止运行。
pub fn discover_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoverError> {
  let entries = std::fs::read_dir(dir).map_err(|source| DiscoverError::ReadDir {
    dir: dir.to_path_buf(),
    source,
  })?;

  let mut images = Vec::new();
  for entry in entries.flatten() {
    let path = entry.path();
    let matched = path.is_file()
      && path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if matched {
      images.push(path);
    }
  }

  images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

  if images.is_empty() {
    return Err(DiscoverError::NoImages {
      dir: dir.to_path_buf(),
      extension: extension.to_string(),
    });
  }

  info!("在 {} 中发现 {} 张图像", dir.display(), images.len());
  for path in images.iter().take(3) {
    if let Some(name) = path.file_name() {
      info!("  示例图像: {}", name.to_string_lossy());
    }
  }

  Ok(images)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"x").unwrap();
  }

  #[test]
  fn sorts_by_filename_and_filters_extension() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "0002.png");
    touch(dir.path(), "0001.png");
    touch(dir.path(), "0003.png");
    touch(dir.path(), "notes.txt");

    let images = discover_images(dir.path(), "png").unwrap();
    let names: Vec<_> = images
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, vec!["0001.png", "0002.png", "0003.png"]);
  }

  #[test]
  fn extension_match_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a.PNG");
    let images = discover_images(dir.path(), "png").unwrap();
    assert_eq!(images.len(), 1);
  }

  #[test]
  fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = discover_images(dir.path(), "png").unwrap_err();
    assert!(matches!(err, DiscoverError::NoImages { .. }));
  }

  #[test]
  fn non_matching_files_only_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "readme.md");
    let err = discover_images(dir.path(), "png").unwrap_err();
    assert!(matches!(err, DiscoverError::NoImages { .. }));
  }
}
