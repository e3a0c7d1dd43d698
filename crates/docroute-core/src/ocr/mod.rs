//! Text recognition for scanned pages.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Turns a page image into plain text.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Recognizer used when no OCR models are available.
///
/// Documents then classify from their embedded text layer and header
/// templates only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOcr;

impl TextRecognizer for NoOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Ok(String::new())
    }
}

/// A recognized line of text with its quadrilateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Corner coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Axis-aligned bounding rectangle as (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Height of a text row when grouping boxes into lines.
const ROW_HEIGHT: f32 = 20.0;

/// Join boxes top-to-bottom, left-to-right.
pub fn reading_order_text(mut boxes: Vec<TextBox>) -> String {
    boxes.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();
        let row_a = (ay / ROW_HEIGHT) as i32;
        let row_b = (by / ROW_HEIGHT) as i32;
        row_a
            .cmp(&row_b)
            .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
    });

    boxes
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order() {
        let boxes = vec![
            text_box(300.0, 102.0, "NIF 501496912"),
            text_box(10.0, 5.0, "Garrafeira"),
            text_box(10.0, 100.0, "Contribuinte"),
            text_box(120.0, 8.0, "Soares"),
        ];
        assert_eq!(
            reading_order_text(boxes),
            "Garrafeira\nSoares\nContribuinte\nNIF 501496912"
        );
    }

    #[test]
    fn test_no_ocr_is_empty() {
        let image = DynamicImage::new_luma8(10, 10);
        assert_eq!(NoOcr.recognize(&image).unwrap(), "");
    }
}
