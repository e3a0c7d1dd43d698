//! Data models shared across the engine.

pub mod config;
pub mod outcome;
pub mod supplier;

pub use config::RouterConfig;
pub use outcome::{
    ClassificationResult, DateOrigin, DocumentFailure, ExtractedDate, MatchEvidence, MatchMethod,
    Placement, ProcessingOutcome, Stage, UploadStatus,
};
pub use supplier::{DocumentClass, DownstreamApi, DownstreamTarget, HeaderRegion, SupplierProfile};
