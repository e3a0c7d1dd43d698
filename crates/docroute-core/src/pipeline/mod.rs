//! Folder processing: classify, date, name, move and upload each document.
//!
//! Documents are handled one at a time in file-name order. A failure on one
//! document is recorded in its [`ProcessingOutcome`] and the batch moves on;
//! only folder-level problems (lock contention, an unreadable folder) abort
//! a run.

mod lock;
pub mod templates;

pub use lock::RunLock;
pub use templates::{generate_templates, TemplateReport};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Datelike;
use glob::MatchOptions;
use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::dates::DateExtractor;
use crate::error::{Result, RouterError};
use crate::models::config::RouterConfig;
use crate::models::outcome::{
    ClassificationResult, DateOrigin, ExtractedDate, Placement, ProcessingOutcome, Stage,
    UploadStatus,
};
use crate::naming::NameResolver;
use crate::ocr::TextRecognizer;
use crate::pdf::{RasterizedPage, Rasterizer};
use crate::registry::SupplierRegistry;
use crate::routing::RoutingTable;
use crate::upload::{PendingUploads, Uploader};

/// Share of the page height read by the header date fallback.
const HEADER_HEIGHT_RATIO: f32 = 0.4;

/// Options for one processing run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Compute everything, move and upload nothing.
    pub dry_run: bool,
    /// Send MATCHED documents to their downstream API.
    pub upload: bool,
    /// Parent of the MATCHED and REVIEW folders (default: the input folder).
    pub output_dir: Option<PathBuf>,
}

/// Where the classified text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Embedded,
    Ocr,
    None,
}

/// Side-effect free view of one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub classification: ClassificationResult,
    pub date: Option<ExtractedDate>,
    pub text_source: TextSource,
    #[serde(skip)]
    pub text: String,
}

/// Processes folders of scanned documents.
pub struct Processor {
    classifier: Classifier,
    routing: RoutingTable,
    dates: DateExtractor,
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Box<dyn TextRecognizer>,
    uploader: Option<Box<dyn Uploader>>,
    config: RouterConfig,
    current_year: i32,
}

impl Processor {
    pub fn new(
        classifier: Classifier,
        rasterizer: Box<dyn Rasterizer>,
        recognizer: Box<dyn TextRecognizer>,
        config: RouterConfig,
    ) -> Self {
        let routing = RoutingTable::from_registry(classifier.registry());
        Self {
            classifier,
            routing,
            dates: DateExtractor::new(&config.dates),
            rasterizer,
            recognizer,
            uploader: None,
            config,
            current_year: chrono::Local::now().year(),
        }
    }

    /// Uploader used for MATCHED documents when a run asks for uploads.
    pub fn with_uploader(mut self, uploader: Box<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Year used in placeholder names of undated documents.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn registry(&self) -> &Arc<SupplierRegistry> {
        self.classifier.registry()
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Classify and date a document without touching it.
    pub fn analyze(&self, path: &Path) -> Result<DocumentAnalysis> {
        let page = self.rasterizer.rasterize(path)?;
        let (classification, text, text_source) = self.classify_page(path, &page);
        let date = self.date_of(path, &page, &text);

        Ok(DocumentAnalysis {
            classification,
            date,
            text_source,
            text,
        })
    }

    fn classify_page(&self, path: &Path, page: &RasterizedPage) -> (ClassificationResult, String, TextSource) {
        let (text, text_source) = self.page_text(path, page);
        let classification = self.classifier.classify(&text, page.image.as_ref());
        (classification, text, text_source)
    }

    fn date_of(&self, path: &Path, page: &RasterizedPage, text: &str) -> Option<ExtractedDate> {
        self.dates
            .extract(text)
            .or_else(|| self.header_date(path, page))
    }

    /// Process every PDF directly inside `folder`.
    pub fn process(&self, folder: &Path, options: &ProcessOptions) -> Result<Vec<ProcessingOutcome>> {
        if !folder.is_dir() {
            return Err(RouterError::Config(format!(
                "{} is not a directory",
                folder.display()
            )));
        }
        let _lock = RunLock::acquire(&folder.join(&self.config.output.lock_file))?;

        let base = options.output_dir.as_deref().unwrap_or(folder);
        let matched_dir = base.join(&self.config.output.matched_dir);
        let review_dir = base.join(&self.config.output.review_dir);

        let mut ledger = match (&self.config.output.pending_uploads, options.upload && !options.dry_run) {
            (Some(path), true) => Some(PendingUploads::load(path)?),
            _ => None,
        };

        let documents = scan_folder(folder)?;
        info!(
            "Processing {} documents in {}{}",
            documents.len(),
            folder.display(),
            if options.dry_run { " (dry run)" } else { "" }
        );

        let target = Destinations {
            matched: &matched_dir,
            review: &review_dir,
        };
        let mut resolver = NameResolver::new();
        let mut outcomes = Vec::with_capacity(documents.len());
        for path in documents {
            let mut outcome = ProcessingOutcome::discovered(path);
            self.process_document(&mut outcome, &target, &mut resolver, ledger.as_mut(), options);
            outcomes.push(outcome);
        }

        if let Some(ledger) = &ledger {
            ledger.save()?;
        }
        Ok(outcomes)
    }

    fn process_document(
        &self,
        outcome: &mut ProcessingOutcome,
        target: &Destinations<'_>,
        resolver: &mut NameResolver,
        ledger: Option<&mut PendingUploads>,
        options: &ProcessOptions,
    ) {
        let path = outcome.original.clone();

        let page = match self.rasterizer.rasterize(&path) {
            Ok(page) => page,
            Err(e) => {
                warn!("{}: rasterization failed: {}", path.display(), e);
                outcome.fail(Stage::Rasterized, e.to_string());
                return;
            }
        };
        outcome.advance(Stage::Rasterized);

        let (classification, text, _) = self.classify_page(&path, &page);
        let supplier = classification.supplier.clone();
        outcome.classification = Some(classification);
        outcome.advance(Stage::Classified);

        outcome.date = self.date_of(&path, &page, &text);
        outcome.advance(Stage::DateExtracted);

        let (placement, dir) = match &supplier {
            Some(_) => (Placement::Matched, target.matched),
            None => (Placement::Review, target.review),
        };
        let claimed = match &supplier {
            Some(identity) => resolver.claim_canonical(
                dir,
                outcome.date.map(|d| d.date),
                identity,
                self.current_year,
            ),
            None => resolver.claim_original(dir, &path),
        };
        let claim = match claimed {
            Ok(claim) => claim,
            Err(e) => {
                warn!("{}: naming failed: {}", path.display(), e);
                outcome.fail(Stage::Named, e.to_string());
                return;
            }
        };
        outcome.advance(Stage::Named);
        outcome.placement = Some(placement);
        outcome.canonical_name = Some(claim.file_name());
        outcome.destination = Some(claim.path());

        let moved_stage = match placement {
            Placement::Matched => Stage::MovedToMatched,
            Placement::Review => Stage::MovedToReview,
        };
        if !options.dry_run {
            let moved = std::fs::create_dir_all(dir).and_then(|_| resolver.move_into(&path, claim));
            match moved {
                Ok(claim) => {
                    outcome.advance(moved_stage);
                    outcome.canonical_name = Some(claim.file_name());
                    outcome.destination = Some(claim.path());
                }
                Err(e) => {
                    warn!("{}: move to {} failed: {}", path.display(), placement, e);
                    outcome.fail(moved_stage, e.to_string());
                    return;
                }
            }
        }

        info!(
            "{} -> {}/{} ({})",
            outcome.file_name(),
            placement,
            outcome.canonical_name.as_deref().unwrap_or_default(),
            describe(outcome.classification.as_ref())
        );

        if let (Placement::Matched, Some(identity), true) = (placement, &supplier, options.upload) {
            self.upload(outcome, identity, ledger, options.dry_run);
        }
    }

    fn upload(
        &self,
        outcome: &mut ProcessingOutcome,
        identity: &str,
        ledger: Option<&mut PendingUploads>,
        dry_run: bool,
    ) {
        let Some(route) = self.routing.route(identity) else {
            outcome.upload = UploadStatus::Skipped {
                reason: format!("no route for {}", identity),
            };
            outcome.advance(Stage::UploadSkipped);
            return;
        };
        if dry_run {
            outcome.upload = UploadStatus::Planned;
            return;
        }
        let Some(destination) = outcome.destination.clone() else {
            return;
        };

        let status = match &self.uploader {
            Some(uploader) => uploader.upload(&destination, identity, route),
            None => UploadStatus::Skipped {
                reason: "no uploader configured".to_string(),
            },
        };

        match &status {
            UploadStatus::Uploaded { .. } => outcome.advance(Stage::Uploaded),
            UploadStatus::Skipped { reason } => {
                info!("{}: upload skipped: {}", outcome.file_name(), reason);
                outcome.advance(Stage::UploadSkipped);
            }
            UploadStatus::Failed { message } => {
                outcome.advance(Stage::UploadFailed);
                if let Some(ledger) = ledger {
                    ledger.record(&destination, identity, route, message);
                }
            }
            UploadStatus::NotRequested | UploadStatus::Planned => {}
        }
        outcome.upload = status;
    }

    /// Text to classify: the embedded layer when it is good enough,
    /// otherwise OCR of the page image.
    fn page_text(&self, path: &Path, page: &RasterizedPage) -> (String, TextSource) {
        let pdf = &self.config.pdf;
        if pdf.prefer_embedded_text {
            if let Some(text) = page.usable_text(pdf.min_text_length) {
                debug!("{}: using embedded text layer", path.display());
                return (text.to_string(), TextSource::Embedded);
            }
        }

        if let Some(image) = &page.image {
            match self.recognizer.recognize(image) {
                Ok(text) => return (text, TextSource::Ocr),
                Err(e) => warn!("{}: OCR failed, continuing without text: {}", path.display(), e),
            }
        }

        match &page.embedded_text {
            Some(text) if !text.trim().is_empty() => (text.clone(), TextSource::Embedded),
            _ => (String::new(), TextSource::None),
        }
    }

    /// Re-read the top right of the page, where issue dates usually sit.
    fn header_date(&self, path: &Path, page: &RasterizedPage) -> Option<ExtractedDate> {
        if !self.config.ocr.header_date_fallback {
            return None;
        }
        let header = header_crop(page.image.as_ref()?)?;
        let text = match self.recognizer.recognize(&header) {
            Ok(text) => text,
            Err(e) => {
                debug!("{}: header OCR failed: {}", path.display(), e);
                return None;
            }
        };
        let found = self.dates.extract(&text)?;
        debug!("{}: date {} from page header", path.display(), found.date);
        Some(ExtractedDate::new(found.date, DateOrigin::HeaderRegion))
    }
}

struct Destinations<'a> {
    matched: &'a Path,
    review: &'a Path,
}

/// Top 40 % of the right half of a page.
fn header_crop(image: &DynamicImage) -> Option<DynamicImage> {
    let (width, height) = image.dimensions();
    let x = width / 2;
    let crop_height = (height as f32 * HEADER_HEIGHT_RATIO) as u32;
    if width - x == 0 || crop_height == 0 {
        return None;
    }
    Some(image.crop_imm(x, 0, width - x, crop_height))
}

fn describe(classification: Option<&ClassificationResult>) -> String {
    match classification {
        Some(c) if c.is_matched() => format!("{} {:.2}", c.method, c.confidence),
        _ => "unmatched".to_string(),
    }
}

/// PDFs directly inside `folder`, any extension case, sorted by name.
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    let folder_str = folder
        .to_str()
        .ok_or_else(|| RouterError::Config(format!("non UTF-8 path: {}", folder.display())))?;
    let pattern = format!("{}/*.pdf", glob::Pattern::escape(folder_str));
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut documents: Vec<PathBuf> = glob::glob_with(&pattern, options)
        .map_err(|e| RouterError::Config(e.to_string()))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_folder_sorted_any_case() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PDF", "a.pdf", "c.txt", "d.Pdf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let names: Vec<String> = scan_folder(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF", "d.Pdf"]);
    }

    #[test]
    fn test_header_crop() {
        let image = DynamicImage::new_luma8(1000, 1400);
        let header = header_crop(&image).unwrap();
        assert_eq!(header.dimensions(), (500, 560));
        assert!(header_crop(&DynamicImage::new_luma8(1, 1)).is_none());
    }
}
