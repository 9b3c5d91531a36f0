// 该文件是 Yunjian （云检） 项目的一部分。
// src/draw.rs - 检测结果可视化绘制
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};

use crate::record::DetectionRecord;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色

/// 边框与标签绘制器。字体缺失时退化为只画边框。
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  box_color: [u8; 3],
}

impl Draw {
  pub fn new(font: Option<FontVec>) -> Self {
    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      box_color: BOX_COLOR,
    }
  }

  pub fn without_font() -> Self {
    Self::new(None)
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 把全部检测框与 `"{class} {confidence:.2f}"` 标签画进图像。
  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[DetectionRecord]) {
    for detection in detections {
      self.draw_bbox_with_label(image, detection);
    }
  }

  /// 在任意位置绘制文本，无字体时跳过。
  pub fn draw_text(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: [u8; 3]) {
    if let Some(font) = &self.font {
      let scale = PxScale::from(self.font_size);
      draw_text_mut(image, Rgb(color), x, y, scale, font, text);
    }
  }

  // 在图像上绘制一个矩形边框与其标签，bbox 为像素坐标
  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &DetectionRecord) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let bbox = &detection.bbox;

    let mut x_min = bbox.x_min.floor() as i32;
    let mut y_min = bbox.y_min.floor() as i32;
    let mut x_max = bbox.x_max.ceil() as i32;
    let mut y_max = bbox.y_max.ceil() as i32;

    // Clamp to image bounds
    x_min = x_min.clamp(0, w - 1);
    y_min = y_min.clamp(0, h - 1);
    x_max = x_max.clamp(0, w - 1);
    y_max = y_max.clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 绘制边框（加粗为2像素）
    for thickness in 0..2 {
      let x_min_t = (x_min + thickness).min(w - 1);
      let y_min_t = (y_min + thickness).min(h - 1);
      let x_max_t = (x_max - thickness).max(0);
      let y_max_t = (y_max - thickness).max(0);

      for x in x_min_t..=x_max_t {
        *image.get_pixel_mut(x as u32, y_min_t as u32) = Rgb(self.box_color);
        *image.get_pixel_mut(x as u32, y_max_t as u32) = Rgb(self.box_color);
      }
      for y in y_min_t..=y_max_t {
        *image.get_pixel_mut(x_min_t as u32, y as u32) = Rgb(self.box_color);
        *image.get_pixel_mut(x_max_t as u32, y as u32) = Rgb(self.box_color);
      }
    }

    let Some(font) = &self.font else {
      return;
    };

    // 创建标签文本
    let label = format!("{} {:.2}", detection.class_name, detection.confidence);

    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]); // 白色文本

    // 估算文本大小（粗略估计）
    let text_width = (label.len() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    // 标签背景放在边框上方，空间不足时落在框内顶部
    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(self.box_color));

      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}

impl Default for Draw {
  fn default() -> Self {
    Self::without_font()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::{BoundingBox, DetectionRecord};

  fn record(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> DetectionRecord {
    DetectionRecord {
      class_id: 0,
      class_name: "person".to_string(),
      confidence: 0.87,
      bbox: BoundingBox {
        x_min,
        y_min,
        x_max,
        y_max,
        width: x_max - x_min,
        height: y_max - y_min,
      },
    }
  }

  #[test]
  fn draws_box_border_pixels() {
    let mut image = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
    let draw = Draw::without_font();
    draw.draw_detections(&mut image, &[record(10.0, 10.0, 40.0, 40.0)]);

    assert_eq!(*image.get_pixel(20, 10), Rgb(BOX_COLOR)); // 上边框
    assert_eq!(*image.get_pixel(10, 20), Rgb(BOX_COLOR)); // 左边框
    assert_eq!(*image.get_pixel(30, 30), Rgb([0, 0, 0])); // 框内不填充
  }

  #[test]
  fn out_of_bounds_box_is_clamped_not_panicking() {
    let mut image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let draw = Draw::without_font();
    draw.draw_detections(&mut image, &[record(-5.0, -5.0, 100.0, 100.0)]);
    assert_eq!(*image.get_pixel(0, 0), Rgb(BOX_COLOR));
  }

  #[test]
  fn degenerate_box_is_skipped() {
    let mut image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let draw = Draw::without_font();
    draw.draw_detections(&mut image, &[record(5.0, 5.0, 5.0, 5.0)]);
    assert_eq!(*image.get_pixel(5, 5), Rgb([0, 0, 0]));
  }
}
