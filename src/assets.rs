// 该文件是 Yunjian （云检） 项目的一部分。
// src/assets.rs - 模型权重与字体的本地缓存
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::detector::ModelSize;

/// 预导出的 YOLOv8 ONNX 权重下载地址
const WEIGHT_BASE_URL: &str = "https://github.com/ultralytics/assets/releases/download/v8.3.0";

/// 标注字体下载地址（与 ultralytics 绘图使用的字体一致）
const FONT_URL: &str = "https://ultralytics.com/assets/Arial.ttf";

const FONT_FILE: &str = "Arial.ttf";

#[derive(Error, Debug)]
pub enum AssetError {
  #[error("无法确定本地缓存目录")]
  NoCacheDir,
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("下载 {url} 失败: {source}")]
  Download {
    url: String,
    source: Box<ureq::Error>,
  },
}

/// 本地资源缓存目录，不存在时创建。
pub fn cache_dir() -> Result<PathBuf, AssetError> {
  let dir = dirs::cache_dir()
    .ok_or(AssetError::NoCacheDir)?
    .join("yunjian");
  std::fs::create_dir_all(&dir)?;
  Ok(dir)
}

/// 解析模型权重路径，缓存未命中时按需下载。
/// 无重试策略，下载失败直接终止运行。
pub fn ensure_weights(size: ModelSize) -> Result<PathBuf, AssetError> {
  let name = size.weight_name();
  let dest = cache_dir()?.join(&name);
  if !dest.is_file() {
    fetch(&format!("{WEIGHT_BASE_URL}/{name}"), &dest)?;
  }
  Ok(dest)
}

/// 解析标注字体路径，缓存未命中时按需下载。
pub fn ensure_font() -> Result<PathBuf, AssetError> {
  let dest = cache_dir()?.join(FONT_FILE);
  if !dest.is_file() {
    fetch(FONT_URL, &dest)?;
  }
  Ok(dest)
}

// 先写入临时文件再改名，避免中断后留下半截缓存
fn fetch(url: &str, dest: &Path) -> Result<(), AssetError> {
  info!("正在下载 {} 到 {}", url, dest.display());

  let response = ureq::get(url)
    .call()
    .map_err(|source| AssetError::Download {
      url: url.to_string(),
      source: Box::new(source),
    })?;

  let tmp = dest.with_extension("part");
  let mut file = std::fs::File::create(&tmp)?;
  std::io::copy(&mut response.into_reader(), &mut file)?;
  std::fs::rename(&tmp, dest)?;

  info!("下载完成: {}", dest.display());
  Ok(())
}
