//! Ledger of uploads that failed after the document was moved.
//!
//! The file stays in MATCHED when its upload fails; the ledger records
//! enough to retry it later without classifying again.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Uploader;
use crate::error::UploadError;
use crate::models::outcome::UploadStatus;
use crate::routing::RoutingDecision;

/// One upload awaiting a retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpload {
    /// Document in the MATCHED folder.
    pub path: PathBuf,
    pub supplier: String,
    pub route: RoutingDecision,
    /// Last failure message.
    pub error: String,
    pub recorded_at: DateTime<Utc>,
}

/// JSON-backed list of pending uploads.
#[derive(Debug, Default)]
pub struct PendingUploads {
    path: PathBuf,
    entries: Vec<PendingUpload>,
}

/// Counts from a retry pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetrySummary {
    pub uploaded: usize,
    pub still_pending: usize,
    /// Entries dropped because their file no longer exists.
    pub missing: usize,
}

impl PendingUploads {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| UploadError::Ledger(format!("{}: {}", path.display(), e)))?;
        let entries: Vec<PendingUpload> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content)
                .map_err(|e| UploadError::Ledger(format!("{}: {}", path.display(), e)))?
        };
        debug!("Loaded {} pending uploads from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[PendingUpload] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a failed upload, replacing any earlier entry for the same file.
    pub fn record(&mut self, path: &Path, supplier: &str, route: &RoutingDecision, error: &str) {
        self.entries.retain(|e| e.path != path);
        self.entries.push(PendingUpload {
            path: path.to_path_buf(),
            supplier: supplier.to_string(),
            route: route.clone(),
            error: error.to_string(),
            recorded_at: Utc::now(),
        });
    }

    /// Drop the entry for `path`. Returns whether one existed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.path != path);
        self.entries.len() != before
    }

    /// Write the ledger back; an empty ledger removes the file.
    pub fn save(&self) -> Result<(), UploadError> {
        if self.entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)
                    .map_err(|e| UploadError::Ledger(format!("{}: {}", self.path.display(), e)))?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| UploadError::Ledger(format!("{}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| UploadError::Ledger(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| UploadError::Ledger(format!("{}: {}", self.path.display(), e)))
    }

    /// Retry every pending upload. Successful and vanished entries are
    /// removed; failures keep their entry with the new error message.
    pub fn retry(&mut self, uploader: &dyn Uploader) -> RetrySummary {
        let mut summary = RetrySummary::default();
        let mut remaining = Vec::with_capacity(self.entries.len());

        for mut entry in self.entries.drain(..) {
            if !entry.path.exists() {
                warn!("Dropping pending upload for missing file {}", entry.path.display());
                summary.missing += 1;
                continue;
            }

            match uploader.upload(&entry.path, &entry.supplier, &entry.route) {
                UploadStatus::Uploaded { .. } => {
                    info!("Retried upload of {} succeeded", entry.path.display());
                    summary.uploaded += 1;
                }
                UploadStatus::Failed { message } | UploadStatus::Skipped { reason: message } => {
                    entry.error = message;
                    entry.recorded_at = Utc::now();
                    summary.still_pending += 1;
                    remaining.push(entry);
                }
                UploadStatus::NotRequested | UploadStatus::Planned => {
                    summary.still_pending += 1;
                    remaining.push(entry);
                }
            }
        }

        self.entries = remaining;
        summary
    }
}
