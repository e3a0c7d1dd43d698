//! Process command - classify, rename, move and upload a folder.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use docroute_core::{Placement, ProcessOptions, ProcessingOutcome, UploadStatus};

use super::build_processor;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Monitored folder containing PDF documents
    #[arg(required = true)]
    folder: PathBuf,

    /// Show what would happen without moving or uploading anything
    #[arg(long)]
    dry_run: bool,

    /// Upload MATCHED documents to Parseur or Docupipe
    #[arg(long)]
    upload: bool,

    /// Parent directory for the MATCHED and REVIEW folders
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write every outcome as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write a CSV summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;
    let processor = build_processor(config)?;

    let options = ProcessOptions {
        dry_run: args.dry_run,
        upload: args.upload,
        output_dir: args.output_dir.clone(),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Processing {}", args.folder.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let outcomes = processor.process(&args.folder, &options);
    spinner.finish_and_clear();
    let outcomes = outcomes?;

    if outcomes.is_empty() {
        println!("{} No PDF files in {}", style("ℹ").blue(), args.folder.display());
        return Ok(());
    }

    for outcome in &outcomes {
        print_outcome(outcome, args.dry_run);
    }

    if let Some(report) = &args.report {
        fs::write(report, serde_json::to_string_pretty(&outcomes)?)?;
        println!("{} Report written to {}", style("✓").green(), report.display());
    }

    if let Some(summary) = &args.summary {
        write_summary(summary, &outcomes)?;
        println!("{} Summary written to {}", style("✓").green(), summary.display());
    }

    print_totals(&outcomes, args.dry_run);
    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_outcome(outcome: &ProcessingOutcome, dry_run: bool) {
    if let Some(failure) = &outcome.failure {
        println!(
            "{} {} ({:?}): {}",
            style("✗").red(),
            outcome.file_name(),
            failure.stage,
            failure.message
        );
        return;
    }

    let arrow = if dry_run { "would move to" } else { "->" };
    let folder = match outcome.placement {
        Some(Placement::Matched) => style("MATCHED").green(),
        Some(Placement::Review) => style("REVIEW").yellow(),
        None => style("-").dim(),
    };
    let verdict = outcome
        .classification
        .as_ref()
        .filter(|c| c.is_matched())
        .map(|c| format!("{} {:.2}", c.method, c.confidence))
        .unwrap_or_else(|| "unmatched".to_string());

    println!(
        "  {} {} {}/{} {}",
        outcome.file_name(),
        arrow,
        folder,
        outcome.canonical_name.as_deref().unwrap_or_default(),
        style(format!("[{}]", verdict)).dim()
    );

    match &outcome.upload {
        UploadStatus::NotRequested => {}
        UploadStatus::Planned => println!("      {}", style("upload planned").dim()),
        UploadStatus::Skipped { reason } => {
            println!("      {} {}", style("upload skipped:").yellow(), reason)
        }
        UploadStatus::Uploaded { reference } => println!(
            "      {} {}",
            style("uploaded").green(),
            reference.as_deref().unwrap_or_default()
        ),
        UploadStatus::Failed { message } => {
            println!("      {} {}", style("upload failed:").red(), message)
        }
    }
}

fn print_totals(outcomes: &[ProcessingOutcome], dry_run: bool) {
    let count = |placement: Placement| {
        outcomes
            .iter()
            .filter(|o| !o.is_failed() && o.placement == Some(placement))
            .count()
    };
    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    let uploaded = outcomes
        .iter()
        .filter(|o| matches!(o.upload, UploadStatus::Uploaded { .. }))
        .count();
    let upload_failed = outcomes
        .iter()
        .filter(|o| matches!(o.upload, UploadStatus::Failed { .. }))
        .count();

    println!();
    println!(
        "{} {} {} documents",
        style("✓").green(),
        if dry_run { "Planned" } else { "Processed" },
        outcomes.len()
    );
    println!(
        "   {} matched, {} review, {} failed",
        style(count(Placement::Matched)).green(),
        style(count(Placement::Review)).yellow(),
        style(failed).red()
    );
    if uploaded + upload_failed > 0 {
        println!(
            "   {} uploaded, {} upload failures",
            style(uploaded).green(),
            style(upload_failed).red()
        );
    }
}

fn write_summary(path: &Path, outcomes: &[ProcessingOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "supplier",
        "method",
        "confidence",
        "issue_date",
        "placement",
        "new_name",
        "upload",
        "error",
    ])?;

    for outcome in outcomes {
        let classification = outcome.classification.as_ref();
        let upload = match &outcome.upload {
            UploadStatus::NotRequested => "".to_string(),
            UploadStatus::Planned => "planned".to_string(),
            UploadStatus::Skipped { reason } => format!("skipped: {}", reason),
            UploadStatus::Uploaded { .. } => "uploaded".to_string(),
            UploadStatus::Failed { message } => format!("failed: {}", message),
        };

        wtr.write_record([
            outcome.file_name(),
            classification
                .and_then(|c| c.supplier.clone())
                .unwrap_or_default(),
            classification.map(|c| c.method.to_string()).unwrap_or_default(),
            classification
                .map(|c| format!("{:.2}", c.confidence))
                .unwrap_or_default(),
            outcome.date.map(|d| d.date.to_string()).unwrap_or_default(),
            outcome.placement.map(|p| p.to_string()).unwrap_or_default(),
            outcome.canonical_name.clone().unwrap_or_default(),
            upload,
            outcome
                .failure
                .as_ref()
                .map(|f| f.message.clone())
                .unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
