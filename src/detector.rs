// 该文件是 Yunjian （云检） 项目的一部分。
// src/detector.rs - 检测器接口
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

use image::RgbImage;

/// 单个检测结果（原图像素坐标）
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 类别索引
  pub class_id: usize,
  /// 类别名称
  pub class_name: String,
  /// 置信度
  pub confidence: f32,
  /// 边界框左上角 x 坐标
  pub x_min: f32,
  /// 边界框左上角 y 坐标
  pub y_min: f32,
  /// 边界框右下角 x 坐标
  pub x_max: f32,
  /// 边界框右下角 y 坐标
  pub y_max: f32,
}

impl Detection {
  pub fn width(&self) -> f32 {
    self.x_max - self.x_min
  }

  pub fn height(&self) -> f32 {
    self.y_max - self.y_min
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  /// 计算两个边界框的 IoU
  pub fn iou(&self, other: &Detection) -> f32 {
    let x1 = self.x_min.max(other.x_min);
    let y1 = self.y_min.max(other.y_min);
    let x2 = self.x_max.min(other.x_max);
    let y2 = self.y_max.min(other.y_max);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 { intersection / union } else { 0.0 }
  }
}

/// 检测器接口，批处理管线只依赖该接口。
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 对单张图像推理，按检测器返回顺序给出检测结果。
  fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error>;

  /// 用于报告的模型描述
  fn descriptor(&self) -> String;
}

mod yolo;
pub use self::yolo::{COCO_CLASSES, ModelSize, YoloDetector, YoloError, non_max_suppression};
