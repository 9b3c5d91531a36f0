// 该文件是 Yunjian （云检） 项目的一部分。
// src/report.rs - 文本报告
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

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::record::Summary;

/// 一次运行的元信息，与统计一起写入报告。
#[derive(Debug, Clone)]
pub struct RunMeta {
  pub generated_at: DateTime<Local>,
  pub image_dir: PathBuf,
  pub model_descriptor: String,
  pub detections_json: PathBuf,
  pub annotated_dir: PathBuf,
  pub preview: PathBuf,
  pub report: PathBuf,
}

/// 组装一次性写出的报告文本。
pub fn render_report(meta: &RunMeta, summary: &Summary) -> String {
  let mut report = String::new();

  let _ = writeln!(report, "YOLO Object Detection Results");
  let _ = writeln!(report, "==============================");
  let _ = writeln!(
    report,
    "Generated: {}",
    meta.generated_at.format("%Y-%m-%d %H:%M:%S")
  );
  let _ = writeln!(report);
  let _ = writeln!(report, "Input Images:");
  let _ = writeln!(report, "  Directory: {}", meta.image_dir.display());
  let _ = writeln!(report, "  Total images: {}", summary.total_images);
  let _ = writeln!(report);
  let _ = writeln!(report, "Model:");
  let _ = writeln!(report, "  Architecture: {}", meta.model_descriptor);
  let _ = writeln!(report, "  Pretrained: COCO dataset (80 classes)");
  let _ = writeln!(
    report,
    "  Classes: person, car, dog, cat, bicycle, truck, etc."
  );
  let _ = writeln!(report);
  let _ = writeln!(report, "Detection Summary:");
  let _ = writeln!(
    report,
    "  Total objects detected: {}",
    summary.total_detections
  );
  let _ = writeln!(
    report,
    "  Images with detections: {}",
    summary.images_with_detections
  );
  let _ = writeln!(
    report,
    "  Average objects per image: {:.2}",
    summary.average_per_image()
  );
  let _ = writeln!(report);
  let _ = writeln!(report, "Detected Classes:");
  for (class_name, count) in &summary.class_counts {
    let _ = writeln!(report, "  - {}: {} detections", class_name, count);
  }
  let _ = writeln!(report);
  let _ = writeln!(report, "Output Files:");
  let _ = writeln!(report, "  - {}", meta.detections_json.display());
  let _ = writeln!(report, "  - {}/", meta.annotated_dir.display());
  let _ = writeln!(report, "  - {}", meta.preview.display());
  let _ = writeln!(report, "  - {}", meta.report.display());

  report
}

pub fn save_report(path: &Path, report: &str) -> std::io::Result<()> {
  std::fs::write(path, report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::{DetectionIndex, Summary, image_record};
  use crate::detector::Detection;

  fn meta() -> RunMeta {
    RunMeta {
      generated_at: Local::now(),
      image_dir: PathBuf::from("/data/rgb"),
      model_descriptor: "YOLOv8n (COCO, 80 classes)".to_string(),
      detections_json: PathBuf::from("out/detections.json"),
      annotated_dir: PathBuf::from("out/annotated_images"),
      preview: PathBuf::from("out/sample_detections.png"),
      report: PathBuf::from("out/report.txt"),
    }
  }

  fn summary() -> Summary {
    let det = |class_id: usize, name: &str| Detection {
      class_id,
      class_name: name.to_string(),
      confidence: 0.9,
      x_min: 0.0,
      y_min: 0.0,
      x_max: 10.0,
      y_max: 10.0,
    };
    let mut index = DetectionIndex::new();
    let (name, rec) = image_record(
      Path::new("0001.png"),
      &[det(2, "car"), det(2, "car"), det(0, "person")],
    );
    index.insert(name, rec);
    let (name, rec) = image_record(Path::new("0002.png"), &[det(0, "person")]);
    index.insert(name, rec);
    Summary::from_index(&index)
  }

  #[test]
  fn report_totals_match_summary() {
    let summary = summary();
    let report = render_report(&meta(), &summary);
    assert!(report.contains("Total images: 2"));
    assert!(report.contains("Total objects detected: 4"));
    assert!(report.contains("Images with detections: 2"));
    assert!(report.contains("Average objects per image: 2.00"));
  }

  #[test]
  fn report_lists_classes_in_descending_order() {
    let report = render_report(&meta(), &summary());
    let car = report.find("- car: 2 detections").unwrap();
    let person = report.find("- person: 2 detections").unwrap();
    // car 首先出现，同数时排在前面
    assert!(car < person);
  }

  #[test]
  fn report_names_output_files() {
    let report = render_report(&meta(), &summary());
    assert!(report.contains("out/detections.json"));
    assert!(report.contains("out/annotated_images/"));
    assert!(report.contains("out/sample_detections.png"));
    assert!(report.contains("out/report.txt"));
  }
}
