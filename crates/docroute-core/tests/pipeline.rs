//! End-to-end folder processing with stub collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use docroute_core::error::PdfError;
use docroute_core::models::config::RouterConfig;
use docroute_core::{
    Classifier, MatchMethod, NoOcr, Placement, ProcessOptions, Processor, RasterizedPage,
    Rasterizer, RouterError, RoutingDecision, Stage, SupplierRegistry, UploadStatus, Uploader,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SOARES: &str = "Garrafeira Soares\nNIF: 501 496 912\nData de emissao: 27/02/2025\nData de vencimento: 29/03/2025";
const TEOFILO: &str = "Estabelecimentos Teofilo Fontainhas Neto\nMessines\nNIF 500 099 871\nFatura FT 2026/18";
const UNKNOWN: &str = "Loja desconhecida\nTotal 12,50 EUR\nObrigado";

/// Treats each file's bytes as its embedded text layer.
struct TextFiles;

impl Rasterizer for TextFiles {
    fn rasterize(&self, path: &Path) -> docroute_core::pdf::Result<RasterizedPage> {
        let text = std::fs::read_to_string(path)?;
        if text.starts_with("BROKEN") {
            return Err(PdfError::Unreadable("no image and no text".to_string()));
        }
        Ok(RasterizedPage {
            image: None,
            embedded_text: Some(text),
        })
    }
}

type Calls = Arc<Mutex<Vec<(PathBuf, String, RoutingDecision)>>>;

/// Records every call and answers with a fixed status.
struct Recording {
    calls: Calls,
    status: UploadStatus,
}

impl Uploader for Recording {
    fn upload(&self, path: &Path, supplier: &str, route: &RoutingDecision) -> UploadStatus {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), supplier.to_string(), route.clone()));
        self.status.clone()
    }
}

fn processor(config: RouterConfig, status: UploadStatus) -> (Processor, Calls) {
    let registry = Arc::new(SupplierRegistry::builtin().unwrap());
    let classifier = Classifier::new(registry, &config.classification);
    let calls: Calls = Arc::default();
    let uploader = Recording {
        calls: Arc::clone(&calls),
        status,
    };
    let processor = Processor::new(classifier, Box::new(TextFiles), Box::new(NoOcr), config)
        .with_uploader(Box::new(uploader))
        .with_current_year(2026);
    (processor, calls)
}

fn folder(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn names(outcomes: &[docroute_core::ProcessingOutcome]) -> Vec<Option<String>> {
    outcomes.iter().map(|o| o.canonical_name.clone()).collect()
}

#[test]
fn test_two_soares_documents_are_deduplicated() {
    let input = folder(&[("scan_001.pdf", SOARES), ("scan_002.pdf", SOARES)]);
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);

    let outcomes = processor.process(input.path(), &ProcessOptions::default()).unwrap();

    assert_eq!(
        names(&outcomes),
        vec![
            Some("20250227_Soares.pdf".to_string()),
            Some("20250227_Soares_1.pdf".to_string()),
        ]
    );
    let matched = input.path().join("MATCHED");
    assert!(matched.join("20250227_Soares.pdf").exists());
    assert!(matched.join("20250227_Soares_1.pdf").exists());
    assert!(!input.path().join("scan_001.pdf").exists());

    let classification = outcomes[0].classification.as_ref().unwrap();
    assert_eq!(classification.method, MatchMethod::TaxId);
    assert_eq!(classification.confidence, 0.95);
    assert_eq!(outcomes[0].stage, Stage::MovedToMatched);
}

#[test]
fn test_existing_file_in_matched_is_not_overwritten() {
    let input = folder(&[("scan.pdf", SOARES)]);
    let matched = input.path().join("MATCHED");
    std::fs::create_dir(&matched).unwrap();
    std::fs::write(matched.join("20250227_Soares.pdf"), "earlier").unwrap();
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);

    let outcomes = processor.process(input.path(), &ProcessOptions::default()).unwrap();

    assert_eq!(outcomes[0].canonical_name.as_deref(), Some("20250227_Soares_1.pdf"));
    assert_eq!(
        std::fs::read_to_string(matched.join("20250227_Soares.pdf")).unwrap(),
        "earlier"
    );
}

#[test]
fn test_undated_document_uses_year_placeholder() {
    let input = folder(&[("teofilo.pdf", TEOFILO)]);
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);

    let outcomes = processor.process(input.path(), &ProcessOptions::default()).unwrap();

    assert_eq!(outcomes[0].date, None);
    assert_eq!(outcomes[0].canonical_name.as_deref(), Some("2026XXXX_Teofilo.pdf"));
}

#[test]
fn test_unmatched_goes_to_review_without_upload() {
    let input = folder(&[("Recibo 17.pdf", UNKNOWN)]);
    let (processor, calls) = processor(RouterConfig::default(), UploadStatus::Uploaded { reference: None });
    let options = ProcessOptions {
        upload: true,
        ..ProcessOptions::default()
    };

    let outcomes = processor.process(input.path(), &options).unwrap();

    assert_eq!(outcomes[0].placement, Some(Placement::Review));
    assert_eq!(outcomes[0].canonical_name.as_deref(), Some("Recibo 17.pdf"));
    assert_eq!(outcomes[0].upload, UploadStatus::NotRequested);
    assert!(input.path().join("REVIEW").join("Recibo 17.pdf").exists());
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_dry_run_matches_live_run() {
    let files = [
        ("a.pdf", SOARES),
        ("b.pdf", SOARES),
        ("c.pdf", TEOFILO),
        ("d.pdf", UNKNOWN),
    ];
    let input = folder(&files);
    let (processor, calls) = processor(RouterConfig::default(), UploadStatus::Uploaded { reference: None });

    let dry = ProcessOptions {
        dry_run: true,
        upload: true,
        output_dir: None,
    };
    let planned = processor.process(input.path(), &dry).unwrap();

    // Nothing moved, nothing uploaded.
    for (name, _) in &files {
        assert!(input.path().join(name).exists());
    }
    assert!(!input.path().join("MATCHED").exists());
    assert!(!input.path().join("REVIEW").exists());
    assert!(calls.lock().unwrap().is_empty());
    assert!(planned[..3].iter().all(|o| o.upload == UploadStatus::Planned));
    assert!(planned.iter().all(|o| o.stage == Stage::Named));

    let live = ProcessOptions {
        dry_run: false,
        ..dry
    };
    let done = processor.process(input.path(), &live).unwrap();

    let destinations = |outcomes: &[docroute_core::ProcessingOutcome]| -> Vec<Option<PathBuf>> {
        outcomes.iter().map(|o| o.destination.clone()).collect()
    };
    assert_eq!(names(&planned), names(&done));
    assert_eq!(destinations(&planned), destinations(&done));
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[test]
fn test_upload_uses_routing_decision() {
    let input = folder(&[("scan.pdf", SOARES)]);
    let (processor, calls) = processor(
        RouterConfig::default(),
        UploadStatus::Uploaded {
            reference: Some("mailbox 111948".to_string()),
        },
    );
    let options = ProcessOptions {
        upload: true,
        ..ProcessOptions::default()
    };

    let outcomes = processor.process(input.path(), &options).unwrap();

    assert_eq!(outcomes[0].stage, Stage::Uploaded);
    let calls = calls.lock().unwrap();
    let (path, supplier, route) = &calls[0];
    assert_eq!(path, &input.path().join("MATCHED").join("20250227_Soares.pdf"));
    assert_eq!(supplier, "soares");
    assert_eq!(route.workflow.as_deref(), Some("111948"));
}

#[test]
fn test_failed_upload_keeps_file_and_is_recorded() {
    let input = folder(&[("scan.pdf", SOARES)]);
    let state = tempfile::tempdir().unwrap();
    let ledger = state.path().join("pending.json");
    let mut config = RouterConfig::default();
    config.output.pending_uploads = Some(ledger.clone());
    let (processor, _) = processor(
        config,
        UploadStatus::Failed {
            message: "HTTP 500: boom".to_string(),
        },
    );
    let options = ProcessOptions {
        upload: true,
        ..ProcessOptions::default()
    };

    let outcomes = processor.process(input.path(), &options).unwrap();

    assert_eq!(outcomes[0].stage, Stage::UploadFailed);
    assert!(input.path().join("MATCHED").join("20250227_Soares.pdf").exists());
    let pending = docroute_core::PendingUploads::load(&ledger).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending.entries()[0].supplier, "soares");
}

#[test]
fn test_unreadable_document_does_not_stop_batch() {
    let input = folder(&[("a.pdf", "BROKEN"), ("b.pdf", SOARES)]);
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);

    let outcomes = processor.process(input.path(), &ProcessOptions::default()).unwrap();

    assert!(outcomes[0].is_failed());
    assert_eq!(outcomes[0].stage, Stage::Discovered);
    assert_eq!(outcomes[0].failure.as_ref().unwrap().stage, Stage::Rasterized);
    assert!(input.path().join("a.pdf").exists());
    assert_eq!(outcomes[1].canonical_name.as_deref(), Some("20250227_Soares.pdf"));
}

#[test]
fn test_output_dir_override() {
    let input = folder(&[("scan.pdf", UNKNOWN)]);
    let output = tempfile::tempdir().unwrap();
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);
    let options = ProcessOptions {
        output_dir: Some(output.path().to_path_buf()),
        ..ProcessOptions::default()
    };

    processor.process(input.path(), &options).unwrap();

    assert!(output.path().join("REVIEW").join("scan.pdf").exists());
    assert!(!input.path().join("REVIEW").exists());
}

#[test]
fn test_locked_folder_is_rejected() {
    let input = folder(&[("scan.pdf", SOARES)]);
    std::fs::write(input.path().join(".docroute.lock"), "pid=1").unwrap();
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);

    let result = processor.process(input.path(), &ProcessOptions::default());

    assert!(matches!(result, Err(RouterError::Locked(_))));
    assert!(input.path().join("scan.pdf").exists());
}

#[test]
fn test_stage_records_progress_before_failed_move() {
    let input = folder(&[("scan.pdf", SOARES)]);
    let output = tempfile::tempdir().unwrap();
    // A plain file where the MATCHED folder should be created.
    std::fs::write(output.path().join("MATCHED"), "not a folder").unwrap();
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);
    let options = ProcessOptions {
        output_dir: Some(output.path().to_path_buf()),
        ..ProcessOptions::default()
    };

    let outcomes = processor.process(input.path(), &options).unwrap();

    assert_eq!(outcomes[0].stage, Stage::Named);
    assert_eq!(outcomes[0].failure.as_ref().unwrap().stage, Stage::MovedToMatched);
    assert!(outcomes[0].classification.as_ref().unwrap().is_matched());
    assert!(input.path().join("scan.pdf").exists());
}

#[test]
fn test_successful_run_reaches_final_stage() {
    let input = folder(&[("a.pdf", SOARES), ("b.pdf", UNKNOWN)]);
    let (processor, _) = processor(RouterConfig::default(), UploadStatus::NotRequested);

    let outcomes = processor.process(input.path(), &ProcessOptions::default()).unwrap();

    let stages: Vec<Stage> = outcomes.iter().map(|o| o.stage).collect();
    assert_eq!(stages, vec![Stage::MovedToMatched, Stage::MovedToReview]);
    assert!(outcomes.iter().all(|o| !o.is_failed()));
}
