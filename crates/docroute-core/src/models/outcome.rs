//! Per-document results: classification, dates and processing outcomes.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Method that produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    TaxId,
    Keyword,
    Template,
    Hybrid,
    None,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchMethod::TaxId => "tax-id",
            MatchMethod::Keyword => "keyword",
            MatchMethod::Template => "template",
            MatchMethod::Hybrid => "hybrid",
            MatchMethod::None => "none",
        };
        f.write_str(name)
    }
}

/// What a matcher saw when it fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchEvidence {
    TaxId { tax_id: String },
    Keywords { matched: Vec<String>, ratio: f32 },
    Template { similarity: f32 },
}

/// Verdict for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Matched supplier identity, `None` when the document needs review.
    pub supplier: Option<String>,

    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,

    /// Method that decided the verdict.
    pub method: MatchMethod,

    /// Agreeing methods for hybrid verdicts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributing: Vec<MatchMethod>,

    /// Evidence from every contributing matcher.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<MatchEvidence>,
}

impl ClassificationResult {
    /// Verdict for a document no matcher recognised.
    pub fn unmatched() -> Self {
        Self {
            supplier: None,
            confidence: 0.0,
            method: MatchMethod::None,
            contributing: Vec::new(),
            evidence: Vec::new(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.supplier.is_some()
    }
}

/// How an issue date was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrigin {
    /// Directly after an issue-date label.
    Labeled,
    /// Earliest date not adjacent to a due-date keyword.
    Earliest,
    /// Found by re-reading the page header.
    HeaderRegion,
}

/// Issue date of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDate {
    pub date: NaiveDate,
    pub origin: DateOrigin,
}

impl ExtractedDate {
    pub fn new(date: NaiveDate, origin: DateOrigin) -> Self {
        Self { date, origin }
    }
}

/// Terminal folder of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Matched,
    Review,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Matched => write!(f, "MATCHED"),
            Placement::Review => write!(f, "REVIEW"),
        }
    }
}

/// Processing stage a document reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovered,
    Rasterized,
    Classified,
    DateExtracted,
    Named,
    MovedToMatched,
    MovedToReview,
    Uploaded,
    UploadSkipped,
    UploadFailed,
}

/// Result of handing a document to a downstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    /// Upload was not requested or the document went to review.
    NotRequested,
    /// Dry run: the upload would have been attempted.
    Planned,
    /// Upload was requested but could not be attempted.
    Skipped { reason: String },
    /// Downstream API accepted the document.
    Uploaded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    /// Downstream API rejected the document or was unreachable.
    Failed { message: String },
}

/// Per-document failure that stopped processing of that document only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Stage that was being attempted.
    pub stage: Stage,
    pub message: String,
}

/// Everything decided about one input file during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    /// Path of the file in the monitored folder.
    pub original: PathBuf,

    /// Last stage reached.
    pub stage: Stage,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<ExtractedDate>,

    /// File name in the destination folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,

    /// Full destination path (planned path in dry runs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,

    pub upload: UploadStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DocumentFailure>,
}

impl ProcessingOutcome {
    /// Fresh outcome for a discovered file.
    pub fn discovered(original: PathBuf) -> Self {
        Self {
            original,
            stage: Stage::Discovered,
            classification: None,
            date: None,
            canonical_name: None,
            placement: None,
            destination: None,
            upload: UploadStatus::NotRequested,
            failure: None,
        }
    }

    /// Move to a later stage. Stages never go backwards.
    pub fn advance(&mut self, stage: Stage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }

    /// Record a failure while attempting `stage`.
    pub fn fail(&mut self, stage: Stage, message: impl Into<String>) {
        self.failure = Some(DocumentFailure {
            stage,
            message: message.into(),
        });
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Original file name, for reports.
    pub fn file_name(&self) -> String {
        self.original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_advance_is_forward_only() {
        let mut outcome = ProcessingOutcome::discovered(PathBuf::from("scan.pdf"));
        outcome.advance(Stage::Classified);
        assert_eq!(outcome.stage, Stage::Classified);

        outcome.advance(Stage::Rasterized);
        assert_eq!(outcome.stage, Stage::Classified);

        outcome.advance(Stage::MovedToMatched);
        outcome.advance(Stage::UploadFailed);
        assert_eq!(outcome.stage, Stage::UploadFailed);
    }

    #[test]
    fn test_fail_keeps_last_stage_reached() {
        let mut outcome = ProcessingOutcome::discovered(PathBuf::from("scan.pdf"));
        outcome.advance(Stage::Named);
        outcome.fail(Stage::MovedToReview, "disk full");
        assert_eq!(outcome.stage, Stage::Named);
        assert_eq!(outcome.failure.unwrap().stage, Stage::MovedToReview);
    }
}
