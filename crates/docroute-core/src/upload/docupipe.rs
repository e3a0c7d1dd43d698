//! Docupipe client (receipts).

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::{is_accepted, Uploader};
use crate::error::UploadError;
use crate::models::config::ApiEndpoint;
use crate::models::outcome::UploadStatus;
use crate::routing::RoutingDecision;

/// Uploads documents to Docupipe, optionally into a workflow.
#[derive(Debug, Clone)]
pub struct DocupipeClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Fields of the upload response we report.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    document_id: Option<String>,
    job_id: Option<String>,
}

impl DocupipeClient {
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

    fn send(&self, path: &Path, workflow_id: Option<&str>) -> Result<UploadStatus, String> {
        let data = std::fs::read(path).map_err(|e| format!("could not read file: {}", e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let mut payload = json!({
            "document": {
                "file": {
                    "contents": base64::engine::general_purpose::STANDARD.encode(&data),
                    "filename": file_name,
                }
            }
        });
        if let Some(workflow_id) = workflow_id {
            payload["workflowId"] = json!(workflow_id);
        }

        let response = self
            .client
            .post(format!("{}/document", self.base_url))
            .header("accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .json(&payload)
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

        let parsed: UploadResponse = serde_json::from_str(&body).unwrap_or_default();
        let reference = parsed.document_id.or(parsed.job_id);
        info!(
            "Uploaded {} to Docupipe (document {})",
            file_name,
            reference.as_deref().unwrap_or("?")
        );
        Ok(UploadStatus::Uploaded { reference })
    }
}

impl Uploader for DocupipeClient {
    fn upload(&self, path: &Path, _supplier: &str, route: &RoutingDecision) -> UploadStatus {
        match self.send(path, route.workflow.as_deref()) {
            Ok(status) => status,
            Err(message) => {
                error!("Docupipe upload of {} failed: {}", path.display(), message);
                UploadStatus::Failed { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::supplier::{DocumentClass, DownstreamApi};
    use crate::upload::test_server::serve_once;
    use pretty_assertions::assert_eq;

    fn route(workflow: Option<&str>) -> RoutingDecision {
        RoutingDecision {
            document_class: DocumentClass::Receipt,
            api: DownstreamApi::Docupipe,
            workflow: workflow.map(String::from),
        }
    }

    fn client(base_url: &str) -> DocupipeClient {
        let endpoint = ApiEndpoint {
            api_key: None,
            base_url: format!("{}/", base_url),
            timeout_secs: 5,
        };
        DocupipeClient::new(&endpoint, "key-123".to_string()).unwrap()
    }

    fn sample_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20250110_Lidl.pdf");
        std::fs::write(&path, b"receipt").unwrap();
        (dir, path)
    }

    #[test]
    fn test_upload_with_workflow() {
        let (url, received) = serve_once(201, r#"{"documentId":"doc-9","jobId":"job-1"}"#);
        let (_dir, path) = sample_file();

        let status = client(&url).upload(&path, "lidl", &route(Some("YxiR0kCy")));
        assert_eq!(
            status,
            UploadStatus::Uploaded {
                reference: Some("doc-9".to_string())
            }
        );

        let request = received.recv().unwrap();
        assert_eq!(request.request_line, "POST /document HTTP/1.1");
        assert_eq!(request.header("x-api-key"), Some("key-123"));

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["workflowId"], "YxiR0kCy");
        assert_eq!(body["document"]["file"]["filename"], "20250110_Lidl.pdf");
        assert_eq!(body["document"]["file"]["contents"], "cmVjZWlwdA==");
    }

    #[test]
    fn test_upload_without_workflow() {
        let (url, received) = serve_once(200, "");
        let (_dir, path) = sample_file();

        let status = client(&url).upload(&path, "kiabi", &route(None));
        assert_eq!(status, UploadStatus::Uploaded { reference: None });

        let body: serde_json::Value = serde_json::from_slice(&received.recv().unwrap().body).unwrap();
        assert!(body.get("workflowId").is_none());
    }

    #[test]
    fn test_server_error_fails() {
        let (url, _received) = serve_once(500, "boom");
        let (_dir, path) = sample_file();

        match client(&url).upload(&path, "lidl", &route(None)) {
            UploadStatus::Failed { message } => assert_eq!(message, "HTTP 500: boom"),
            other => panic!("unexpected status {:?}", other),
        }
    }
}
