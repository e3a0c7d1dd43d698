//! PDF processing module.

mod extractor;

pub use extractor::PdfRasterizer;

use std::path::Path;

use image::DynamicImage;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// First page of a document, as seen by the classifier.
#[derive(Debug, Clone, Default)]
pub struct RasterizedPage {
    /// Page image at the configured resolution (scanned documents).
    pub image: Option<DynamicImage>,
    /// Embedded text layer, when the PDF has one.
    pub embedded_text: Option<String>,
}

impl RasterizedPage {
    /// Embedded text if it is long enough to stand in for OCR.
    pub fn usable_text(&self, min_length: usize) -> Option<&str> {
        self.embedded_text
            .as_deref()
            .filter(|t| t.trim().chars().count() >= min_length)
    }
}

/// Turns a PDF file into its first page.
pub trait Rasterizer {
    /// Rasterize the first page of the document at `path`.
    ///
    /// Fails when neither an image nor a text layer can be recovered.
    fn rasterize(&self, path: &Path) -> Result<RasterizedPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_text() {
        let page = RasterizedPage {
            image: None,
            embedded_text: Some("  short  ".to_string()),
        };
        assert_eq!(page.usable_text(50), None);
        assert_eq!(page.usable_text(5), Some("  short  "));
        assert_eq!(RasterizedPage::default().usable_text(0), None);
    }
}
