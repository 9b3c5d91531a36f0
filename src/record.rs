// 该文件是 Yunjian （云检） 项目的一部分。
// src/record.rs - 检测记录与统计
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

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detector::Detection;

/// 序列化的边界框（原图像素坐标）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x_min: f32,
  pub y_min: f32,
  pub x_max: f32,
  pub y_max: f32,
  pub width: f32,
  pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
  pub class_id: usize,
  pub class_name: String,
  pub confidence: f32,
  pub bbox: BoundingBox,
}

/// 单张图像的检测记录，构建后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
  pub num_detections: usize,
  pub detections: Vec<DetectionRecord>,
  pub image_path: String,
}

/// 文件名 → 记录的映射，即 detections.json 的内容。
/// 文件按字典序发现、按字典序插入，BTreeMap 迭代顺序与插入顺序一致。
pub type DetectionIndex = BTreeMap<String, ImageRecord>;

impl From<&Detection> for DetectionRecord {
  fn from(detection: &Detection) -> Self {
    DetectionRecord {
      class_id: detection.class_id,
      class_name: detection.class_name.clone(),
      confidence: detection.confidence,
      bbox: BoundingBox {
        x_min: detection.x_min,
        y_min: detection.y_min,
        x_max: detection.x_max,
        y_max: detection.y_max,
        width: detection.width(),
        height: detection.height(),
      },
    }
  }
}

/// 由一张图像的检测结果构建记录，保持检测器返回顺序。
pub fn image_record(path: &Path, detections: &[Detection]) -> (String, ImageRecord) {
  let filename = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());

  let detections: Vec<DetectionRecord> = detections.iter().map(DetectionRecord::from).collect();

  let record = ImageRecord {
    num_detections: detections.len(),
    detections,
    image_path: path.display().to_string(),
  };

  (filename, record)
}

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 将全部记录写为带缩进的 JSON 文件。
pub fn save_detections(index: &DetectionIndex, path: &Path) -> Result<(), RecordError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  let file = std::fs::File::create(path)?;
  serde_json::to_writer_pretty(file, index)?;
  Ok(())
}

/// 跨图像聚合统计，始终由记录重新推导，不单独持久化。
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
  pub total_images: usize,
  pub total_detections: usize,
  pub images_with_detections: usize,
  /// 类别 → 累计数量，按数量降序，同数保持首次出现顺序
  pub class_counts: Vec<(String, usize)>,
}

impl Summary {
  pub fn from_index(index: &DetectionIndex) -> Self {
    let total_images = index.len();
    let total_detections = index.values().map(|rec| rec.num_detections).sum();
    let images_with_detections = index.values().filter(|rec| rec.num_detections > 0).count();

    let mut class_counts: Vec<(String, usize)> = Vec::new();
    for record in index.values() {
      for detection in &record.detections {
        match class_counts
          .iter_mut()
          .find(|(name, _)| name == &detection.class_name)
        {
          Some((_, count)) => *count += 1,
          None => class_counts.push((detection.class_name.clone(), 1)),
        }
      }
    }
    // 稳定排序：同数保持首次出现顺序
    class_counts.sort_by(|a, b| b.1.cmp(&a.1));

    Summary {
      total_images,
      total_detections,
      images_with_detections,
      class_counts,
    }
  }

  /// 平均每张图像检测数；发现阶段保证 total_images > 0。
  pub fn average_per_image(&self) -> f32 {
    self.total_detections as f32 / self.total_images as f32
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(class_id: usize, class_name: &str, confidence: f32) -> Detection {
    Detection {
      class_id,
      class_name: class_name.to_string(),
      confidence,
      x_min: 4.0,
      y_min: 8.0,
      x_max: 24.0,
      y_max: 38.0,
    }
  }

  fn sample_index() -> DetectionIndex {
    let mut index = DetectionIndex::new();
    let (name, rec) = image_record(
      Path::new("/data/0001.png"),
      &[
        detection(2, "car", 0.9),
        detection(0, "person", 0.8),
        detection(2, "car", 0.7),
      ],
    );
    index.insert(name, rec);
    let (name, rec) = image_record(Path::new("/data/0002.png"), &[detection(0, "person", 0.6)]);
    index.insert(name, rec);
    let (name, rec) = image_record(Path::new("/data/0003.png"), &[]);
    index.insert(name, rec);
    index
  }

  #[test]
  fn record_counts_match_detection_list() {
    let (filename, record) = image_record(
      Path::new("/data/0001.png"),
      &[detection(0, "person", 0.8), detection(2, "car", 0.7)],
    );
    assert_eq!(filename, "0001.png");
    assert_eq!(record.num_detections, record.detections.len());
    assert_eq!(record.image_path, "/data/0001.png");
  }

  #[test]
  fn bounding_box_is_consistent() {
    let record = DetectionRecord::from(&detection(2, "car", 0.9));
    let bbox = &record.bbox;
    assert!(bbox.x_min <= bbox.x_max);
    assert!(bbox.y_min <= bbox.y_max);
    assert!((bbox.width - (bbox.x_max - bbox.x_min)).abs() < 1e-5);
    assert!((bbox.height - (bbox.y_max - bbox.y_min)).abs() < 1e-5);
  }

  #[test]
  fn detection_order_is_preserved() {
    let (_, record) = image_record(
      Path::new("0001.png"),
      &[detection(2, "car", 0.3), detection(0, "person", 0.9)],
    );
    assert_eq!(record.detections[0].class_name, "car");
    assert_eq!(record.detections[1].class_name, "person");
  }

  #[test]
  fn summary_aggregates_from_records() {
    let summary = Summary::from_index(&sample_index());
    assert_eq!(summary.total_images, 3);
    assert_eq!(summary.total_detections, 4);
    assert_eq!(summary.images_with_detections, 2);
    assert!((summary.average_per_image() - 4.0 / 3.0).abs() < 1e-6);
  }

  #[test]
  fn class_counts_sorted_descending_with_first_seen_ties() {
    let summary = Summary::from_index(&sample_index());
    assert_eq!(
      summary.class_counts,
      vec![("car".to_string(), 2), ("person".to_string(), 2)]
    );
    // car 与 person 同为 2，car 首先出现故排前
    let counts: Vec<usize> = summary.class_counts.iter().map(|(_, c)| *c).collect();
    let mut sorted = counts.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(counts, sorted);
  }

  #[test]
  fn saved_json_has_one_key_per_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detections.json");
    let index = sample_index();
    save_detections(&index, &path).unwrap();

    let loaded: DetectionIndex =
      serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded, index);
  }
}
