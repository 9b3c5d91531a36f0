// 该文件是 Yunjian （云检） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::path::Path;

use ab_glyph::FontVec;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use yunjian::assets;
use yunjian::detector::YoloDetector;
use yunjian::draw::Draw;
use yunjian::task::{self, Pipeline, UploadTarget};
use yunjian::upload::{AssumeYes, Confirm, HttpObjectStore, StdinConfirm};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  println!("Yunjian 批量目标检测管线");
  println!("========================");
  println!("输入目录: {}", args.input.display());
  println!("输出目录: {}", args.output.display());
  println!("模型规格: YOLOv8{}", args.model_size);
  println!("置信度阈值: {}", args.confidence);
  println!("NMS 阈值: {}", args.nms_threshold);
  println!();

  // 字体缺失只影响标签文字，不终止运行
  let draw = match load_font(args.font.as_deref()) {
    Ok(font) => Draw::new(Some(font)),
    Err(err) => {
      warn!("无法加载标签字体，仅绘制边框: {err:#}");
      Draw::without_font()
    }
  };

  let store = match &args.bucket {
    Some(bucket) => Some(HttpObjectStore::from_env(bucket)?),
    None => None,
  };
  let mut confirm: Box<dyn Confirm> = if args.assume_yes {
    Box::new(AssumeYes)
  } else {
    Box::new(StdinConfirm)
  };

  let cfg = Pipeline {
    image_dir: args.input,
    output_dir: args.output,
    extension: args.extension,
    upload: args.bucket.map(|bucket| UploadTarget {
      bucket,
      prefix: args.prefix,
    }),
  };

  // 权重下载与会话构建推迟到输入目录通过校验之后
  let make_detector = || {
    println!("正在加载模型...");
    let detector = YoloDetector::new(args.model_size, args.confidence, args.nms_threshold)?;
    println!("模型加载完成");
    Ok(detector)
  };

  let outcome = task::run(&cfg, make_detector, &draw, store.as_ref(), confirm.as_mut())?;
  let artifacts = &outcome.artifacts;

  println!();
  println!("推理完成!");
  println!("本地结果目录: {}", cfg.output_dir.display());
  println!("  - {}", artifacts.detections_json.display());
  println!("  - {}", artifacts.preview.display());
  println!("  - {}", artifacts.report.display());
  println!("  - 标注图像 {} 张", artifacts.annotated.len());
  if let task::UploadOutcome::Uploaded(count) = outcome.upload {
    println!("  - 已上传 {count} 个对象");
  }

  Ok(())
}

fn load_font(path: Option<&Path>) -> Result<FontVec> {
  let path = match path {
    Some(path) => path.to_path_buf(),
    None => assets::ensure_font()?,
  };
  let bytes =
    std::fs::read(&path).with_context(|| format!("无法读取字体文件: {}", path.display()))?;
  FontVec::try_from_vec(bytes)
    .map_err(|_| anyhow::anyhow!("无效的字体文件: {}", path.display()))
}
