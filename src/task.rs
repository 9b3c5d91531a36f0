// 该文件是 Yunjian （云检） 项目的一部分。
// src/task.rs - 批处理管线
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use image::ImageReader;
use tracing::info;

use crate::detector::Detector;
use crate::discover;
use crate::draw::Draw;
use crate::record::{self, DetectionIndex, Summary};
use crate::report::{self, RunMeta};
use crate::upload::{self, Artifacts, Confirm, ObjectStore};
use crate::visualize;

/// 一次批处理运行的配置
#[derive(Debug, Clone)]
pub struct Pipeline {
  pub image_dir: PathBuf,
  pub output_dir: PathBuf,
  pub extension: String,
  pub upload: Option<UploadTarget>,
}

#[derive(Debug, Clone)]
pub struct UploadTarget {
  pub bucket: String,
  pub prefix: String,
}

/// 上传阶段的结局，拒绝与未配置都不算错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
  /// 未配置上传目标或对象存储
  Disabled,
  /// 用户在确认提示处拒绝
  Declined,
  /// 已上传的对象数
  Uploaded(usize),
}

/// 一次批处理运行的产物与上传结局
#[derive(Debug)]
pub struct RunOutcome {
  pub artifacts: Artifacts,
  pub upload: UploadOutcome,
}

/// 逐张推理，保持发现顺序，每处理约 10% 打一次进度。
/// 任意一张失败即终止整个运行。
pub fn run_inference<D: Detector>(
  detector: &mut D,
  images: &[PathBuf],
) -> Result<DetectionIndex> {
  let checkpoint = (images.len() / 10).max(1);
  let mut index = DetectionIndex::new();

  for (idx, path) in images.iter().enumerate() {
    let image = ImageReader::open(path)
      .with_context(|| format!("无法打开图像: {}", path.display()))?
      .decode()
      .with_context(|| format!("无法解码图像: {}", path.display()))?
      .to_rgb8();

    let detections = detector
      .detect(&image)
      .with_context(|| format!("推理失败: {}", path.display()))?;

    let (filename, record) = record::image_record(path, &detections);
    index.insert(filename, record);

    if (idx + 1) % checkpoint == 0 {
      info!("已处理 {}/{} 张图像", idx + 1, images.len());
    }
  }

  info!("推理完成，共 {} 张图像", images.len());
  Ok(index)
}

/// 顺序执行整条管线：发现 → 模型加载 → 推理 → JSON → 统计 →
/// 预览 → 标注副本 → 报告 → （可选、确认后）上传。
///
/// 检测器由工厂延迟构建：输入目录为空时在下载权重之前终止。
pub fn run<D, S, F>(
  cfg: &Pipeline,
  make_detector: F,
  draw: &Draw,
  store: Option<&S>,
  confirm: &mut dyn Confirm,
) -> Result<RunOutcome>
where
  D: Detector,
  S: ObjectStore,
  F: FnOnce() -> Result<D>,
{
  let started_at = Local::now();

  let images = discover::discover_images(&cfg.image_dir, &cfg.extension)?;

  let mut detector = make_detector()?;

  std::fs::create_dir_all(&cfg.output_dir)
    .with_context(|| format!("无法创建输出目录: {}", cfg.output_dir.display()))?;
  let detections_json = cfg.output_dir.join("detections.json");
  let preview = cfg.output_dir.join("sample_detections.png");
  let report_path = cfg.output_dir.join("report.txt");
  let annotated_dir = cfg.output_dir.join("annotated_images");

  info!("开始推理...");
  let index = run_inference(&mut detector, &images)?;

  record::save_detections(&index, &detections_json)?;
  info!("检测结果已保存: {}", detections_json.display());

  let summary = Summary::from_index(&index);
  info!("总检测数: {}", summary.total_detections);
  info!("有检测的图像数: {}", summary.images_with_detections);
  info!("平均每张检测数: {:.2}", summary.average_per_image());

  visualize::save_preview(&images, &index, draw, &preview)?;
  let annotated = visualize::save_annotated(&images, &index, draw, &annotated_dir)?;
  info!("标注图像目录: {}", annotated_dir.display());

  let meta = RunMeta {
    generated_at: started_at,
    image_dir: cfg.image_dir.clone(),
    model_descriptor: detector.descriptor(),
    detections_json: detections_json.clone(),
    annotated_dir,
    preview: preview.clone(),
    report: report_path.clone(),
  };
  let report = report::render_report(&meta, &summary);
  report::save_report(&report_path, &report)
    .with_context(|| format!("无法写入报告: {}", report_path.display()))?;
  println!("{report}");
  info!("报告已保存: {}", report_path.display());

  let artifacts = Artifacts {
    detections_json,
    report: report_path,
    preview,
    annotated,
  };

  let upload = match (&cfg.upload, store) {
    (Some(target), Some(store)) => upload_gate(target, store, confirm, &artifacts, &started_at)?,
    _ => UploadOutcome::Disabled,
  };

  Ok(RunOutcome { artifacts, upload })
}

fn upload_gate<S: ObjectStore>(
  target: &UploadTarget,
  store: &S,
  confirm: &mut dyn Confirm,
  artifacts: &Artifacts,
  started_at: &chrono::DateTime<Local>,
) -> Result<UploadOutcome> {
  let key_prefix = format!(
    "{}/{}",
    target.prefix,
    started_at.format("%Y-%m-%d-%H%M%S")
  );
  let prompt = format!("上传结果到 s3://{}/{} ?", target.bucket, key_prefix);

  if confirm.confirm(&prompt)? {
    let count = upload::upload_artifacts(store, &key_prefix, artifacts)?;
    info!(
      "已上传 {} 个对象到 s3://{}/{}",
      count, target.bucket, key_prefix
    );
    Ok(UploadOutcome::Uploaded(count))
  } else {
    info!("已跳过上传");
    println!("已跳过上传");
    Ok(UploadOutcome::Declined)
  }
}
