//! Submission of classified documents to downstream extraction APIs.
//!
//! Uploads are best-effort: every outcome is reported as an
//! [`UploadStatus`] and never undoes the file move that preceded it.

mod docupipe;
pub mod ledger;
mod parseur;

pub use docupipe::DocupipeClient;
pub use ledger::{PendingUpload, PendingUploads, RetrySummary};
pub use parseur::ParseurClient;

use std::path::Path;

use tracing::warn;

use crate::error::UploadError;
use crate::models::config::{ApiConfig, DOCUPIPE_KEY_VAR, PARSEUR_KEY_VAR};
use crate::models::outcome::UploadStatus;
use crate::models::supplier::DownstreamApi;
use crate::routing::RoutingDecision;

/// Hands a document to the API named in its routing decision.
pub trait Uploader {
    fn upload(&self, path: &Path, supplier: &str, route: &RoutingDecision) -> UploadStatus;
}

/// Status codes the downstream APIs use for an accepted document.
pub(crate) fn is_accepted(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 200 | 201 | 202)
}

/// Routes uploads to the Parseur or Docupipe client.
///
/// A client whose API key is not configured is absent; uploads for it are
/// reported as skipped.
#[derive(Debug, Default)]
pub struct UploadDispatcher {
    parseur: Option<ParseurClient>,
    docupipe: Option<DocupipeClient>,
}

impl UploadDispatcher {
    /// Build clients for every API with a key in the config or environment.
    pub fn from_config(apis: &ApiConfig) -> Result<Self, UploadError> {
        let parseur = match apis.parseur.resolve_key(PARSEUR_KEY_VAR) {
            Some(key) => Some(ParseurClient::new(&apis.parseur, key)?),
            None => {
                warn!("{} not set, Parseur uploads will be skipped", PARSEUR_KEY_VAR);
                None
            }
        };
        let docupipe = match apis.docupipe.resolve_key(DOCUPIPE_KEY_VAR) {
            Some(key) => Some(DocupipeClient::new(&apis.docupipe, key)?),
            None => {
                warn!("{} not set, Docupipe uploads will be skipped", DOCUPIPE_KEY_VAR);
                None
            }
        };
        Ok(Self { parseur, docupipe })
    }

    pub fn with_clients(parseur: Option<ParseurClient>, docupipe: Option<DocupipeClient>) -> Self {
        Self { parseur, docupipe }
    }
}

impl Uploader for UploadDispatcher {
    fn upload(&self, path: &Path, supplier: &str, route: &RoutingDecision) -> UploadStatus {
        match route.api {
            DownstreamApi::Parseur => match &self.parseur {
                Some(client) => client.upload(path, supplier, route),
                None => UploadStatus::Skipped {
                    reason: format!("{} not set", PARSEUR_KEY_VAR),
                },
            },
            DownstreamApi::Docupipe => match &self.docupipe {
                Some(client) => client.upload(path, supplier, route),
                None => UploadStatus::Skipped {
                    reason: format!("{} not set", DOCUPIPE_KEY_VAR),
                },
            },
        }
    }
}
