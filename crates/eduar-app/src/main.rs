//! EduAR - Main entry point
//!
//! Browse the model catalog, scan a marker and explore the model in 3D.

mod app;
mod camera_access;
mod config;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use eduar_core::Catalog;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "eduar")]
#[command(about = "Educational AR model viewer")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "eduar.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the model catalog and exit
    #[arg(long)]
    list: bool,

    /// Write a default configuration file to --config and exit
    #[arg(long)]
    write_default_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("EduAR v{}", env!("CARGO_PKG_VERSION"));

    if args.write_default_config {
        config::save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let config = config::load_config(&args.config)?;

    let catalog = match &config.app.catalog_path {
        Some(path) => Catalog::from_file(Path::new(path))
            .with_context(|| format!("loading catalog {}", path))?,
        None => Catalog::builtin()?,
    };

    info!(
        models = catalog.records().len(),
        categories = catalog.categories().len(),
        "Catalog loaded"
    );

    if args.list {
        print_catalog(&catalog);
        return Ok(());
    }

    app::run(config, catalog)
}

fn print_catalog(catalog: &Catalog) {
    for category in catalog.categories() {
        println!("{} ({}):", category.title, category.id);
        for record in catalog.list_by_category(&category.id) {
            println!("  - {} [{}] {}", record.name, record.id, record.sub_category);
            if !record.labels.is_empty() {
                let names: Vec<&str> = record.labels.iter().map(|l| l.name.as_str()).collect();
                println!("    Labels: {}", names.join(", "));
            }
        }
    }
}
