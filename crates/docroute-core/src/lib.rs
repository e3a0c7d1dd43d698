//! Core library for supplier classification and routing of scanned
//! invoices and receipts.
//!
//! This crate provides:
//! - Supplier registry with tax identifiers, keywords and header templates
//! - Tiered supplier matching (tax id, keywords, SSIM header templates, hybrid)
//! - Issue date extraction for Portuguese and English documents
//! - Canonical file naming with collision-free moves
//! - Routing to Parseur (invoices) and Docupipe (receipts)
//! - Folder processing into MATCHED and REVIEW

pub mod classify;
pub mod dates;
pub mod error;
pub mod models;
pub mod naming;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod registry;
pub mod routing;
pub mod upload;

pub use classify::{Classifier, MatchCandidate, Matcher};
pub use dates::DateExtractor;
pub use error::{Result, RouterError};
pub use models::{
    ClassificationResult, DocumentClass, DownstreamApi, ExtractedDate, MatchMethod, Placement,
    ProcessingOutcome, RouterConfig, Stage, SupplierProfile, UploadStatus,
};
pub use naming::NameResolver;
pub use ocr::{NoOcr, TextRecognizer};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PdfRasterizer, RasterizedPage, Rasterizer};
pub use pipeline::{generate_templates, DocumentAnalysis, ProcessOptions, Processor, TemplateReport};
pub use registry::SupplierRegistry;
pub use routing::{RoutingDecision, RoutingTable};
pub use upload::{PendingUploads, UploadDispatcher, Uploader};
