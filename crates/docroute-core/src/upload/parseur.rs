//! Parseur client (invoices).

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use tracing::{error, info};

use super::{is_accepted, Uploader};
use crate::error::UploadError;
use crate::models::config::ApiEndpoint;
use crate::models::outcome::UploadStatus;
use crate::routing::RoutingDecision;

/// Uploads documents to a Parseur mailbox.
#[derive(Debug, Clone)]
pub struct ParseurClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ParseurClient {
    pub fn new(endpoint: &ApiEndpoint, api_key: String) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn send(&self, path: &Path, supplier: &str, mailbox_id: &str) -> Result<UploadStatus, String> {
        let data = std::fs::read(path).map_err(|e| format!("could not read file: {}", e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = multipart::Part::bytes(data)
            .file_name(file_name.clone())
            .mime_str("application/pdf")
            .map_err(|e| e.to_string())?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("supplier", supplier.to_string());

        let url = format!("{}/parser/{}/upload", self.base_url, mailbox_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {}", e)
                }
            })?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !is_accepted(status) {
            return Err(format!("HTTP {}: {}", status.as_u16(), body));
        }

        info!("Uploaded {} to Parseur mailbox {}", file_name, mailbox_id);
        Ok(UploadStatus::Uploaded {
            reference: Some(format!("mailbox {}", mailbox_id)),
        })
    }
}

impl Uploader for ParseurClient {
    fn upload(&self, path: &Path, supplier: &str, route: &RoutingDecision) -> UploadStatus {
        let Some(mailbox_id) = route.workflow.as_deref() else {
            return UploadStatus::Skipped {
                reason: format!("no Parseur mailbox for {}", supplier),
            };
        };

        match self.send(path, supplier, mailbox_id) {
            Ok(status) => status,
            Err(message) => {
                error!("Parseur upload of {} failed: {}", path.display(), message);
                UploadStatus::Failed { message }
            }
        }
    }
}
