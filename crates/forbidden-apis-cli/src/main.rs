//! forbidden-apis CLI tool.
//!
//! Usage:
//! ```bash
//! forbidden-apis check [OPTIONS] [CLASSES_DIR]
//! forbidden-apis list-bundled
//! forbidden-apis init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Checks compiled JVM classes for forbidden API usage
#[derive(Parser)]
#[command(name = "forbidden-apis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check class files against forbidden API signatures
    Check(commands::check::CheckArgs),

    /// List bundled signature catalogs
    ListBundled,

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
    /// The XML report format.
    Xml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => {
            let project_dir = args.path.clone().unwrap_or_else(|| PathBuf::from("."));
            let source = config_resolver::resolve(&project_dir, cli.config.as_deref());
            commands::check::run(args, &source)
        }
        Commands::ListBundled => {
            commands::list_bundled::run();
            Ok(())
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
