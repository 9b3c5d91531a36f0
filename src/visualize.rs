// 该文件是 Yunjian （云检） 项目的一部分。
// src/visualize.rs - 预览拼图与逐图标注输出
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

use image::{ImageReader, Rgb, RgbImage};
use thiserror::Error;
use tracing::info;

use crate::draw::Draw;
use crate::record::DetectionIndex;

/// 预览拼图中每格的固定尺寸
const TILE_WIDTH: u32 = 480;
const TILE_HEIGHT: u32 = 360;
const CAPTION_HEIGHT: u32 = 24;

/// 预览拼图最多采样的图像数
pub const PREVIEW_SAMPLES: usize = 3;

#[derive(Error, Debug)]
pub enum VisualizeError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("缺少 {0} 的检测记录")]
  MissingRecord(String),
}

fn filename_of(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

fn load_rgb(path: &Path) -> Result<RgbImage, VisualizeError> {
  Ok(ImageReader::open(path)?.decode()?.to_rgb8())
}

/// 固定尺寸的并排预览拼图：前 `PREVIEW_SAMPLES` 张图像各占一格，
/// 顶部留标题条写 `filename (k objects)`。
pub fn save_preview(
  images: &[PathBuf],
  index: &DetectionIndex,
  draw: &Draw,
  path: &Path,
) -> Result<(), VisualizeError> {
  let samples = &images[..images.len().min(PREVIEW_SAMPLES)];

  let mut canvas = RgbImage::from_pixel(
    TILE_WIDTH * samples.len() as u32,
    CAPTION_HEIGHT + TILE_HEIGHT,
    Rgb([255, 255, 255]),
  );

  for (idx, image_path) in samples.iter().enumerate() {
    let filename = filename_of(image_path);
    let record = index
      .get(&filename)
      .ok_or_else(|| VisualizeError::MissingRecord(filename.clone()))?;

    // 全分辨率标注后再缩放进格子
    let mut image = load_rgb(image_path)?;
    draw.draw_detections(&mut image, &record.detections);
    let tile = image::imageops::resize(
      &image,
      TILE_WIDTH,
      TILE_HEIGHT,
      image::imageops::FilterType::Triangle,
    );

    let x0 = TILE_WIDTH * idx as u32;
    image::imageops::replace(&mut canvas, &tile, x0 as i64, CAPTION_HEIGHT as i64);

    let caption = format!("{} ({} objects)", filename, record.num_detections);
    draw.draw_text(&mut canvas, x0 as i32 + 4, 2, &caption, [0, 0, 0]);
  }

  canvas.save(path)?;
  info!("预览拼图已保存: {}", path.display());
  Ok(())
}

/// 为每张输入图像写出一份烧入边框与标签的副本，保留原始文件名。
pub fn save_annotated(
  images: &[PathBuf],
  index: &DetectionIndex,
  draw: &Draw,
  annotated_dir: &Path,
) -> Result<Vec<PathBuf>, VisualizeError> {
  std::fs::create_dir_all(annotated_dir)?;

  let checkpoint = (images.len() / 10).max(1);
  let mut outputs = Vec::with_capacity(images.len());

  for (idx, image_path) in images.iter().enumerate() {
    let filename = filename_of(image_path);
    let record = index
      .get(&filename)
      .ok_or_else(|| VisualizeError::MissingRecord(filename.clone()))?;

    let mut image = load_rgb(image_path)?;
    draw.draw_detections(&mut image, &record.detections);

    let output_path = annotated_dir.join(&filename);
    image.save(&output_path)?;
    outputs.push(output_path);

    if (idx + 1) % checkpoint == 0 {
      info!("已保存 {}/{} 张标注图像", idx + 1, images.len());
    }
  }

  Ok(outputs)
}
