//! Uploads command - inspect and retry uploads that failed during a run.

use clap::{Args, Subcommand};
use console::style;

use docroute_core::models::config::RouterConfig;
use docroute_core::{PendingUploads, UploadDispatcher};

/// Arguments for the uploads command.
#[derive(Args)]
pub struct UploadsArgs {
    #[command(subcommand)]
    command: UploadsCommand,
}

#[derive(Subcommand)]
enum UploadsCommand {
    /// List pending uploads
    List,

    /// Retry every pending upload
    Retry,
}

pub fn run(args: UploadsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let mut ledger = open_ledger(&config)?;

    match args.command {
        UploadsCommand::List => {
            list(&ledger);
            Ok(())
        }
        UploadsCommand::Retry => retry(&config, &mut ledger),
    }
}

fn open_ledger(config: &RouterConfig) -> anyhow::Result<PendingUploads> {
    let Some(path) = &config.output.pending_uploads else {
        anyhow::bail!(
            "No pending-upload ledger configured. Set output.pending_uploads with 'docroute config set'."
        );
    };
    Ok(PendingUploads::load(path)?)
}

fn list(ledger: &PendingUploads) {
    if ledger.is_empty() {
        println!("{} No pending uploads", style("✓").green());
        return;
    }

    for entry in ledger.entries() {
        println!(
            "  {} {} {:?} {}",
            entry.path.display(),
            style(&entry.supplier).bold(),
            entry.route.api,
            style(&entry.error).red()
        );
        println!("      {}", style(entry.recorded_at.to_rfc3339()).dim());
    }
    println!();
    println!("{} pending uploads in {}", ledger.len(), ledger.path().display());
}

fn retry(config: &RouterConfig, ledger: &mut PendingUploads) -> anyhow::Result<()> {
    if ledger.is_empty() {
        println!("{} No pending uploads", style("✓").green());
        return Ok(());
    }

    let uploader = UploadDispatcher::from_config(&config.apis)?;
    let summary = ledger.retry(&uploader);
    ledger.save()?;

    println!(
        "{} {} uploaded, {} still pending, {} dropped (file missing)",
        style("✓").green(),
        style(summary.uploaded).green(),
        style(summary.still_pending).yellow(),
        summary.missing
    );

    Ok(())
}
