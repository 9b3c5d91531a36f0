// 该文件是 Yunjian （云检） 项目的一部分。
// src/detector/yolo.rs - YOLOv8 ONNX 目标检测器
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

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use ndarray::{Array4, ArrayViewD};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;
use thiserror::Error;
use tracing::info;

use crate::assets::{self, AssetError};
use crate::detector::{Detection, Detector};

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 模型规格代号，选择预训练权重变体。
/// 没有默认值，必须由外部配置显式给出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSize {
  Nano,
  Small,
  Medium,
  Large,
  XLarge,
}

impl ModelSize {
  pub fn letter(&self) -> &'static str {
    match self {
      ModelSize::Nano => "n",
      ModelSize::Small => "s",
      ModelSize::Medium => "m",
      ModelSize::Large => "l",
      ModelSize::XLarge => "x",
    }
  }

  pub fn weight_name(&self) -> String {
    format!("yolov8{}.onnx", self.letter())
  }
}

impl fmt::Display for ModelSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.letter())
  }
}

impl FromStr for ModelSize {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "n" | "nano" => Ok(ModelSize::Nano),
      "s" | "small" => Ok(ModelSize::Small),
      "m" | "medium" => Ok(ModelSize::Medium),
      "l" | "large" => Ok(ModelSize::Large),
      "x" | "xlarge" => Ok(ModelSize::XLarge),
      other => Err(format!("未知的模型规格 '{other}'，可选 n/s/m/l/x")),
    }
  }
}

#[derive(Error, Debug)]
pub enum YoloError {
  #[error("模型资源错误: {0}")]
  Asset(#[from] AssetError),
  #[error("ONNX 运行时错误: {0}")]
  Ort(#[from] ort::Error),
  #[error("模型输出形状异常: {0:?}")]
  OutputShape(Vec<usize>),
}

/// YOLOv8 目标检测器（COCO 预训练，80 类）
pub struct YoloDetector {
  session: Session,
  size: ModelSize,
  /// 模型输入边长
  input_size: u32,
  /// 置信度阈值
  confidence_threshold: f32,
  /// NMS IOU 阈值
  nms_threshold: f32,
}

impl YoloDetector {
  /// 创建一个新的 YOLOv8 检测器。权重缓存未命中时自动下载。
  pub fn new(
    size: ModelSize,
    confidence_threshold: f32,
    nms_threshold: f32,
  ) -> Result<Self, YoloError> {
    let weights = assets::ensure_weights(size)?;

    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(4)?
      .commit_from_file(&weights)?;

    info!("模型已加载: {}", weights.display());

    Ok(Self {
      session,
      size,
      input_size: 640,
      confidence_threshold,
      nms_threshold,
    })
  }

  /// letterbox 预处理：等比缩放后置于画布左上角，返回缩放比。
  fn preprocess(&self, image: &RgbImage) -> (Array4<f32>, f32) {
    let (w0, h0) = image.dimensions();
    let size = self.input_size;
    let ratio = (size as f32 / w0 as f32).min(size as f32 / h0 as f32);
    let w1 = ((w0 as f32 * ratio).round() as u32).clamp(1, size);
    let h1 = ((h0 as f32 * ratio).round() as u32).clamp(1, size);

    let resized = image::imageops::resize(image, w1, h1, image::imageops::FilterType::Triangle);

    let mut input = Array4::<f32>::from_elem(
      (1, 3, size as usize, size as usize),
      144.0 / 255.0, // 填充灰色
    );
    for (x, y, pixel) in resized.enumerate_pixels() {
      let [r, g, b] = pixel.0;
      input[[0, 0, y as usize, x as usize]] = r as f32 / 255.0;
      input[[0, 1, y as usize, x as usize]] = g as f32 / 255.0;
      input[[0, 2, y as usize, x as usize]] = b as f32 / 255.0;
    }

    (input, ratio)
  }

  /// 解码 [1, 4 + 类别数, 锚点数] 输出头，过滤低置信度并做 NMS。
  fn postprocess(
    &self,
    output: &ArrayViewD<'_, f32>,
    ratio: f32,
    original_width: f32,
    original_height: f32,
  ) -> Result<Vec<Detection>, YoloError> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
      return Err(YoloError::OutputShape(shape.to_vec()));
    }
    let num_classes = shape[1] - 4;
    let num_anchors = shape[2];

    let mut detections = Vec::new();
    for anchor in 0..num_anchors {
      // 找到最高类别分数
      let mut max_class_score = 0.0f32;
      let mut max_class_id = 0usize;
      for class_id in 0..num_classes {
        let score = output[[0, 4 + class_id, anchor]];
        if score > max_class_score {
          max_class_score = score;
          max_class_id = class_id;
        }
      }

      if max_class_score < self.confidence_threshold {
        continue;
      }

      // 中心点格式转角点格式，并还原 letterbox 缩放
      let cx = output[[0, 0, anchor]];
      let cy = output[[0, 1, anchor]];
      let w = output[[0, 2, anchor]];
      let h = output[[0, 3, anchor]];

      let x_min = ((cx - w / 2.0) / ratio).clamp(0.0, original_width);
      let y_min = ((cy - h / 2.0) / ratio).clamp(0.0, original_height);
      let x_max = ((cx + w / 2.0) / ratio).clamp(0.0, original_width);
      let y_max = ((cy + h / 2.0) / ratio).clamp(0.0, original_height);

      if x_min >= x_max || y_min >= y_max {
        continue;
      }

      detections.push(Detection {
        class_id: max_class_id,
        class_name: COCO_CLASSES
          .get(max_class_id)
          .unwrap_or(&"unknown")
          .to_string(),
        confidence: max_class_score,
        x_min,
        y_min,
        x_max,
        y_max,
      });
    }

    Ok(non_max_suppression(detections, self.nms_threshold))
  }
}

impl Detector for YoloDetector {
  type Error = YoloError;

  fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
    let (original_width, original_height) = image.dimensions();
    let (input, ratio) = self.preprocess(image);

    let value = Value::from_array(input)?;
    // SessionOutputs 持有 session 的可变借用，先取出张量再做后处理
    let output = {
      let outputs = self.session.run(ort::inputs!["images" => &value])?;
      outputs["output0"].try_extract_array::<f32>()?.to_owned()
    };

    self.postprocess(
      &output.view(),
      ratio,
      original_width as f32,
      original_height as f32,
    )
  }

  fn descriptor(&self) -> String {
    format!("YOLOv8{} (COCO, 80 classes)", self.size)
  }
}

/// 同类非极大值抑制，保持置信度降序。
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut kept: Vec<Detection> = Vec::new();
  for candidate in detections {
    let drop = kept
      .iter()
      .any(|d| d.class_id == candidate.class_id && d.iou(&candidate) > iou_threshold);
    if !drop {
      kept.push(candidate);
    }
  }
  kept
}
