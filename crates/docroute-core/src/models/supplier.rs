//! Supplier profiles and their downstream targets.

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Kind of document a supplier sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    /// Supplier invoice (fatura).
    Invoice,
    /// Till receipt, credit note, return guide and similar.
    Receipt,
}

impl std::fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentClass::Invoice => write!(f, "invoice"),
            DocumentClass::Receipt => write!(f, "receipt"),
        }
    }
}

/// Downstream data-extraction API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownstreamApi {
    Parseur,
    Docupipe,
}

impl std::fmt::Display for DownstreamApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownstreamApi::Parseur => write!(f, "parseur"),
            DownstreamApi::Docupipe => write!(f, "docupipe"),
        }
    }
}

/// Where a supplier's documents are submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "api", rename_all = "snake_case")]
pub enum DownstreamTarget {
    /// Parseur mailbox (one mailbox per supplier template).
    Parseur { mailbox_id: String },
    /// Docupipe, optionally with a predefined workflow.
    Docupipe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workflow_id: Option<String>,
    },
}

impl DownstreamTarget {
    /// The API this target belongs to.
    pub fn api(&self) -> DownstreamApi {
        match self {
            DownstreamTarget::Parseur { .. } => DownstreamApi::Parseur,
            DownstreamTarget::Docupipe { .. } => DownstreamApi::Docupipe,
        }
    }

    /// The API-specific workflow parameter (Parseur mailbox or Docupipe workflow).
    pub fn workflow(&self) -> Option<&str> {
        match self {
            DownstreamTarget::Parseur { mailbox_id } => Some(mailbox_id.as_str()),
            DownstreamTarget::Docupipe { workflow_id } => workflow_id.as_deref(),
        }
    }
}

/// Pixel rectangle of the page header used for template matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl HeaderRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Clip the region to an image of the given size.
    ///
    /// Returns `None` when nothing of the region lies inside the image.
    pub fn clip(&self, image_width: u32, image_height: u32) -> Option<HeaderRegion> {
        if self.x >= image_width || self.y >= image_height {
            return None;
        }
        let width = self.width.min(image_width - self.x);
        let height = self.height.min(image_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(HeaderRegion::new(self.x, self.y, width, height))
    }
}

/// Static description of a known supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierProfile {
    /// Short identity key, lower case (e.g. `soares`).
    pub identity: String,

    /// Human readable name.
    pub display_name: String,

    /// Tax identifier (NIF). Absent for keyword-only suppliers and variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    /// Identity of the supplier whose tax identifier this entry shares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_of: Option<String>,

    /// Name, address and domain fragments, matched case-insensitively.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Header crop compared against the reference template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_region: Option<HeaderRegion>,

    /// Invoice or receipt.
    pub document_class: DocumentClass,

    /// Downstream API and workflow.
    pub target: DownstreamTarget,

    /// Reference header image, loaded from the templates directory.
    #[serde(skip)]
    pub template: Option<GrayImage>,
}

impl SupplierProfile {
    /// Tax identifier with separators removed.
    pub fn normalized_tax_id(&self) -> Option<String> {
        self.tax_id.as_deref().map(normalize_digits)
    }

    /// Whether this profile takes part in template matching.
    pub fn has_template(&self) -> bool {
        self.header_region.is_some() && self.template.is_some()
    }
}

/// Remove the separators OCR and typesetting put inside identifiers.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '-' | '\u{2013}'))
        .collect()
}
