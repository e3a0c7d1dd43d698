//! Templates command - build reference headers from sample documents.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use docroute_core::{generate_templates, PdfRasterizer};

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// Generate templates from samples named after their supplier
    Generate {
        /// Folder of sample PDFs (e.g. soares_2025_01.pdf)
        samples: PathBuf,

        /// Output directory (default: the configured templates directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(args: TemplatesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        TemplatesCommand::Generate { samples, output } => generate(samples, output, config_path),
    }
}

fn generate(samples: PathBuf, output: Option<PathBuf>, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let registry = super::load_registry(&config)?;
    let output = output.unwrap_or_else(|| config.classification.templates_dir.clone());
    let rasterizer = PdfRasterizer::new(config.pdf.render_dpi);

    let report = generate_templates(&samples, &output, &registry, &rasterizer)?;

    for generated in &report.generated {
        println!(
            "{} {} from {}",
            style("✓").green(),
            generated.supplier,
            generated.sample.display()
        );
    }
    for (supplier, reason) in &report.failed {
        println!("{} {}: {}", style("✗").red(), supplier, reason);
    }
    for path in &report.unassigned {
        println!(
            "{} {} does not name a known supplier",
            style("ℹ").blue(),
            path.display()
        );
    }

    println!();
    println!(
        "{} {} templates written to {}",
        style("✓").green(),
        report.generated.len(),
        output.display()
    );

    Ok(())
}
