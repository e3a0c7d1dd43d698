//! Suppliers command - inspect the supplier registry.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use docroute_core::models::config::RouterConfig;
use docroute_core::models::DownstreamTarget;
use docroute_core::{RoutingTable, SupplierRegistry};

/// Arguments for the suppliers command.
#[derive(Args)]
pub struct SuppliersArgs {
    /// Registry JSON to use instead of the configured one
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: SuppliersCommand,
}

#[derive(Subcommand)]
enum SuppliersCommand {
    /// List suppliers in registry order
    List,

    /// Show one supplier as JSON
    Show {
        /// Supplier identity (e.g. "soares")
        identity: String,
    },

    /// Validate the registry and report template coverage
    Check,

    /// Print the registry as JSON (a starting point for a custom registry)
    Export,
}

pub fn run(args: SuppliersArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(path) = args.registry {
        config.classification.registry = Some(path);
    }

    match args.command {
        SuppliersCommand::List => list(&config),
        SuppliersCommand::Show { identity } => show(&config, &identity),
        SuppliersCommand::Check => check(&config),
        SuppliersCommand::Export => export(&config),
    }
}

fn list(config: &RouterConfig) -> anyhow::Result<()> {
    let registry = super::load_registry(config)?;
    let routing = RoutingTable::from_registry(&registry);

    for profile in registry.iter() {
        let route = routing
            .route(&profile.identity)
            .map(|r| match &r.workflow {
                Some(workflow) => format!("{:?} {}", r.api, workflow),
                None => format!("{:?}", r.api),
            })
            .unwrap_or_default();
        println!(
            "{:<18} {:<12} {:<40} {}",
            style(&profile.identity).bold(),
            profile.tax_id.as_deref().unwrap_or("-"),
            profile.display_name,
            style(route).dim()
        );
    }
    println!();
    println!("{} suppliers", registry.len());

    Ok(())
}

fn show(config: &RouterConfig, identity: &str) -> anyhow::Result<()> {
    let registry = super::load_registry(config)?;
    let profile = registry
        .get(identity)
        .ok_or_else(|| anyhow::anyhow!("Unknown supplier: {}", identity))?;

    println!("{}", serde_json::to_string_pretty(profile)?);
    if profile.template.is_some() {
        println!("{} reference template loaded", style("✓").green());
    }

    Ok(())
}

fn check(config: &RouterConfig) -> anyhow::Result<()> {
    let registry = super::load_registry(config)?;

    let with_tax_id = registry.iter().filter(|p| p.tax_id.is_some()).count();
    let variants = registry.iter().filter(|p| p.variant_of.is_some()).count();
    let templates = registry.iter().filter(|p| p.has_template()).count();
    let parseur = registry
        .iter()
        .filter(|p| matches!(p.target, DownstreamTarget::Parseur { .. }))
        .count();

    println!("{} Registry is valid: {} suppliers", style("✓").green(), registry.len());
    println!("   {} with tax identifier, {} variants", with_tax_id, variants);
    println!("   {} Parseur, {} Docupipe", parseur, registry.len() - parseur);
    println!(
        "   {} of {} reference templates loaded from {}",
        templates,
        registry.len(),
        config.classification.templates_dir.display()
    );

    Ok(())
}

fn export(config: &RouterConfig) -> anyhow::Result<()> {
    let registry = match &config.classification.registry {
        Some(path) => SupplierRegistry::from_file(path)?,
        None => SupplierRegistry::builtin()?,
    };
    println!("{}", registry.to_json()?);
    Ok(())
}
