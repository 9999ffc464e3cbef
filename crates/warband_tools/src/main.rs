//! Warband - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "warband-tools")]
#[command(about = "Development tools for Warband")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match warband_tools::validate::validate_data_directory(&path) {
                Ok(report) => {
                    match ron::ser::to_string_pretty(&report, ron::ser::PrettyConfig::default()) {
                        Ok(text) => println!("{text}"),
                        Err(e) => tracing::warn!("Failed to format report: {e}"),
                    }
                    tracing::info!(
                        promotions = report.promotions,
                        unit_types = report.unit_types,
                        warnings = report.warnings.len(),
                        "Validation passed"
                    );
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
