//! Error types for the docroute-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the docroute library.
///
/// Only configuration and registry problems, run-lock contention and
/// folder-level I/O surface through this type. Per-document failures are
/// recorded in [`ProcessingOutcome`](crate::models::outcome::ProcessingOutcome)
/// and never abort a batch.
#[derive(Error, Debug)]
pub enum RouterError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Supplier registry is invalid.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Upload client could not be constructed or used.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another run holds the folder lock.
    #[error("folder is locked by another run: {}", .0.display())]
    Locked(PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Neither a scanned image nor a text layer could be recovered.
    #[error("unreadable document: {0}")]
    Unreadable(String),

    /// Reading the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors that invalidate the supplier registry. Always fatal at startup.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry JSON could not be parsed.
    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_json::Error),

    /// Registry file could not be read.
    #[error("failed to read registry: {0}")]
    Io(#[from] std::io::Error),

    /// A supplier entry has an empty identity.
    #[error("supplier entry #{0} has an empty identity")]
    EmptyIdentity(usize),

    /// An identity with leading or trailing whitespace.
    #[error("supplier identity {0:?} has surrounding whitespace")]
    UntrimmedIdentity(String),

    /// Two entries share an identity.
    #[error("duplicate supplier identity: {0}")]
    DuplicateIdentity(String),

    /// Two entries share a tax identifier.
    #[error("tax identifier {tax_id} is used by both {first} and {second}")]
    DuplicateTaxId {
        tax_id: String,
        first: String,
        second: String,
    },

    /// A tax identifier is not a plausible digit string.
    #[error("supplier {identity} has an invalid tax identifier {tax_id:?}")]
    InvalidTaxId { identity: String, tax_id: String },

    /// A variant points at a supplier that does not exist or has no tax id.
    #[error("supplier {identity} is a variant of {parent}, which is missing or has no tax identifier")]
    InvalidParent { identity: String, parent: String },

    /// A variant declares its own tax identifier.
    #[error("variant {0} must not declare its own tax identifier")]
    VariantWithTaxId(String),

    /// An entry offers nothing to match on.
    #[error("supplier {0} has no tax identifier, keywords or parent")]
    NoSignal(String),

    /// A Parseur target is missing its mailbox.
    #[error("supplier {0} routes to Parseur without a mailbox id")]
    MissingMailbox(String),
}

/// Errors raised while building upload clients.
#[derive(Error, Debug)]
pub enum UploadError {
    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Ledger file could not be read or written.
    #[error("pending-upload ledger error: {0}")]
    Ledger(String),
}

/// Result type for the docroute library.
pub type Result<T> = std::result::Result<T, RouterError>;
