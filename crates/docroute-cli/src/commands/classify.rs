//! Classify command - analyse a folder without moving anything.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

use docroute_core::pipeline::scan_folder;
use docroute_core::DocumentAnalysis;

use super::build_processor;

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Folder containing PDF documents
    #[arg(required = true)]
    folder: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Print the text each document was classified from
    #[arg(long)]
    show_text: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary grouped by supplier
    Text,
}

#[derive(Serialize)]
struct Classified {
    file: String,
    #[serde(flatten)]
    analysis: Option<DocumentAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: ClassifyArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let processor = build_processor(config)?;

    let documents = scan_folder(&args.folder)?;
    if documents.is_empty() {
        println!("{} No PDF files in {}", style("ℹ").blue(), args.folder.display());
        return Ok(());
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(documents.len());
    for path in &documents {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(file.clone());

        let classified = match processor.analyze(path) {
            Ok(analysis) => Classified {
                file,
                analysis: Some(analysis),
                error: None,
            },
            Err(e) => {
                warn!("Failed to analyse {}: {}", path.display(), e);
                Classified {
                    file,
                    analysis: None,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(classified);
        pb.inc(1);
    }
    pb.finish_and_clear();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => print_grouped(&results, args.show_text),
    }

    Ok(())
}

fn print_grouped(results: &[Classified], show_text: bool) {
    let mut groups: BTreeMap<String, Vec<&Classified>> = BTreeMap::new();
    for result in results {
        let key = match &result.analysis {
            Some(a) => a
                .classification
                .supplier
                .clone()
                .unwrap_or_else(|| "REVIEW".to_string()),
            None => "ERROR".to_string(),
        };
        groups.entry(key).or_default().push(result);
    }

    for (supplier, members) in &groups {
        println!("{} ({})", style(supplier).bold(), members.len());
        for result in members {
            match &result.analysis {
                Some(analysis) => {
                    let c = &analysis.classification;
                    let date = analysis
                        .date
                        .map(|d| d.date.to_string())
                        .unwrap_or_else(|| "no date".to_string());
                    println!(
                        "  {} {} {:.2} {}",
                        result.file,
                        style(c.method).cyan(),
                        c.confidence,
                        style(date).dim()
                    );
                    if show_text {
                        for line in analysis.text.lines().filter(|l| !l.trim().is_empty()) {
                            println!("      {}", style(line).dim());
                        }
                    }
                }
                None => println!(
                    "  {} {}",
                    result.file,
                    style(result.error.as_deref().unwrap_or("unknown error")).red()
                ),
            }
        }
    }

    let matched = results
        .iter()
        .filter(|r| r.analysis.as_ref().is_some_and(|a| a.classification.is_matched()))
        .count();
    println!();
    println!(
        "{} {} documents: {} matched, {} not matched",
        style("✓").green(),
        results.len(),
        style(matched).green(),
        style(results.len() - matched).yellow()
    );
}
