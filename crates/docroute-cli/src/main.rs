//! CLI for classifying, renaming and routing scanned supplier documents.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{classify, config, process, suppliers, templates, uploads};

/// docroute - Identify suppliers of scanned invoices and receipts and route them
#[derive(Parser)]
#[command(name = "docroute")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify documents in a folder without moving them
    Classify(classify::ClassifyArgs),

    /// Classify, rename and move documents, optionally uploading them
    Process(process::ProcessArgs),

    /// Build reference header templates from sample documents
    Templates(templates::TemplatesArgs),

    /// Inspect the supplier registry
    Suppliers(suppliers::SuppliersArgs),

    /// Inspect and retry failed uploads
    Uploads(uploads::UploadsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    // API keys may come from a .env file in the working directory.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Classify(args) => classify::run(args, config_path),
        Commands::Process(args) => process::run(args, config_path),
        Commands::Templates(args) => templates::run(args, config_path),
        Commands::Suppliers(args) => suppliers::run(args, config_path),
        Commands::Uploads(args) => uploads::run(args, config_path),
        Commands::Config(args) => config::run(args, config_path),
    }
}
