//! Configuration structures for the routing engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for docroute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// PDF rasterization configuration.
    pub pdf: PdfConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Supplier matching configuration.
    pub classification: ClassificationConfig,

    /// Issue date extraction configuration.
    pub dates: DateConfig,

    /// Output folders and run bookkeeping.
    pub output: OutputConfig,

    /// Downstream API credentials.
    pub apis: ApiConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Resolution the first page is normalised to. Header regions are in
    /// pixels at this resolution.
    pub render_dpi: u32,

    /// Use the embedded text layer instead of OCR when it is long enough.
    pub prefer_embedded_text: bool,

    /// Minimum text length to consider the embedded text layer usable.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 200,
            prefer_embedded_text: true,
            min_text_length: 50,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Re-read the page header when the full page yields no date.
    pub header_date_fallback: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            header_date_fallback: true,
        }
    }
}

/// Supplier matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Registry JSON replacing the built-in supplier table.
    pub registry: Option<PathBuf>,

    /// Directory holding `{identity}_template.png` reference headers.
    pub templates_dir: PathBuf,

    /// Minimum structural similarity for a template match.
    pub template_threshold: f32,

    /// Floor applied to hybrid confidences.
    pub hybrid_floor: f32,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            registry: None,
            templates_dir: PathBuf::from("templates"),
            template_threshold: 0.4,
            hybrid_floor: 0.9,
        }
    }
}

/// Issue date extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Earliest plausible document year.
    pub min_year: i32,

    /// Latest plausible document year.
    pub max_year: i32,

    /// Characters before a date searched for due-date keywords.
    pub due_keyword_window: usize,

    /// Characters after an issue-date label searched for its date.
    pub label_window: usize,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            min_year: 2015,
            max_year: 2040,
            due_keyword_window: 50,
            label_window: 30,
        }
    }
}

/// Output folders and run bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Folder name for classified documents.
    pub matched_dir: String,

    /// Folder name for documents needing manual review.
    pub review_dir: String,

    /// Lock file created in the monitored folder for the duration of a run.
    pub lock_file: String,

    /// Ledger of uploads that failed after the file was moved.
    pub pending_uploads: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            matched_dir: "MATCHED".to_string(),
            review_dir: "REVIEW".to_string(),
            lock_file: ".docroute.lock".to_string(),
            pending_uploads: None,
        }
    }
}

/// Downstream API credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub parseur: ApiEndpoint,
    pub docupipe: ApiEndpoint,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            parseur: ApiEndpoint {
                api_key: None,
                base_url: "https://api.parseur.com".to_string(),
                timeout_secs: 60,
            },
            docupipe: ApiEndpoint {
                api_key: None,
                base_url: "https://app.docupipe.ai".to_string(),
                timeout_secs: 120,
            },
        }
    }
}

/// One downstream API endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoint {
    /// API key; falls back to an environment variable when unset.
    pub api_key: Option<String>,

    pub base_url: String,

    pub timeout_secs: u64,
}

impl ApiEndpoint {
    /// Configured key, or the named environment variable.
    pub fn resolve_key(&self, env_var: &str) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(env_var).ok().filter(|k| !k.is_empty()))
    }
}

/// Environment variable holding the Parseur API key.
pub const PARSEUR_KEY_VAR: &str = "PARSEUR_API_KEY";

/// Environment variable holding the Docupipe API key.
pub const DOCUPIPE_KEY_VAR: &str = "DOCUPIPE_API_KEY";

impl RouterConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.ocr.model_dir.join(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RouterConfig =
            serde_json::from_str(r#"{"dates": {"min_year": 2020}}"#).unwrap();
        assert_eq!(config.dates.min_year, 2020);
        assert_eq!(config.dates.max_year, 2040);
        assert_eq!(config.pdf.render_dpi, 200);
        assert_eq!(config.output.matched_dir, "MATCHED");
        assert_eq!(config.apis.docupipe.timeout_secs, 120);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RouterConfig::default();
        config.classification.template_threshold = 0.55;
        config.save(&path).unwrap();

        let loaded = RouterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.classification.template_threshold, 0.55);
    }

    #[test]
    fn test_configured_key_wins() {
        let endpoint = ApiEndpoint {
            api_key: Some("from-config".to_string()),
            ..ApiEndpoint::default()
        };
        assert_eq!(
            endpoint.resolve_key("DOCROUTE_TEST_UNSET_KEY").as_deref(),
            Some("from-config")
        );
    }
}
