//! CLI subcommands and the wiring they share.

pub mod classify;
pub mod config;
pub mod process;
pub mod suppliers;
pub mod templates;
pub mod uploads;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use docroute_core::models::config::RouterConfig;
use docroute_core::ocr::{NoOcr, PureOcrEngine, TextRecognizer};
use docroute_core::{Classifier, PdfRasterizer, Processor, SupplierRegistry, UploadDispatcher};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docroute")
        .join("config.json")
}

/// Configuration from `--config`, else the default file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RouterConfig> {
    if let Some(path) = config_path {
        return RouterConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config {}", default_path.display());
        Ok(RouterConfig::from_file(&default_path)?)
    } else {
        Ok(RouterConfig::default())
    }
}

/// Validated registry with templates, as configured.
pub fn load_registry(config: &RouterConfig) -> anyhow::Result<Arc<SupplierRegistry>> {
    let registry = SupplierRegistry::from_config(&config.classification)
        .map_err(|e| anyhow::anyhow!("Invalid supplier registry: {}", e))?;
    Ok(Arc::new(registry))
}

/// OCR engine from the configured model directory, or no OCR at all.
pub fn load_recognizer(config: &RouterConfig) -> Box<dyn TextRecognizer> {
    match PureOcrEngine::from_config(&config.ocr) {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            warn!(
                "OCR unavailable ({}), scanned pages will classify by template only",
                e
            );
            Box::new(NoOcr)
        }
    }
}

/// Processor wired with the PDF rasterizer, OCR and upload clients.
pub fn build_processor(config: RouterConfig) -> anyhow::Result<Processor> {
    let registry = load_registry(&config)?;
    let classifier = Classifier::new(registry, &config.classification);
    let rasterizer = PdfRasterizer::new(config.pdf.render_dpi);
    let recognizer = load_recognizer(&config);
    let uploader = UploadDispatcher::from_config(&config.apis)?;

    Ok(Processor::new(classifier, Box::new(rasterizer), recognizer, config)
        .with_uploader(Box::new(uploader)))
}
