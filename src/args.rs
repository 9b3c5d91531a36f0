// 该文件是 Yunjian （云检） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

use yunjian::detector::ModelSize;

/// Yunjian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像目录
  #[arg(long, value_name = "DIR")]
  pub input: PathBuf,

  /// 输出目录
  #[arg(long, default_value = "./yolo_detections", value_name = "DIR")]
  pub output: PathBuf,

  /// 模型规格 (n/s/m/l/x)，必填，无默认值
  #[arg(long, value_name = "SIZE")]
  pub model_size: ModelSize,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 输入图像扩展名过滤
  #[arg(long, default_value = "png", value_name = "EXT")]
  pub extension: String,

  /// 上传目标存储桶，缺省时跳过上传步骤
  #[arg(long, value_name = "BUCKET")]
  pub bucket: Option<String>,

  /// 上传对象键前缀，实际前缀再附加运行时间戳
  #[arg(long, default_value = "yolo-detections", value_name = "PREFIX")]
  pub prefix: String,

  /// 跳过交互确认，直接上传
  #[arg(long)]
  pub assume_yes: bool,

  /// 标签字体文件路径，缺省时自动下载到缓存
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}
