//! # Scenedex CLI
//!
//! Command-line interface for the Scenedex scene search index.
//!
//! ## Commands
//!
//! - `scenedex index` - Index every catalog scene not indexed yet
//! - `scenedex update <ids>` - Re-index specific scenes
//! - `scenedex remove <ids>` - Remove scenes from the index
//! - `scenedex query <text>` - Fuzzy search the index
//! - `scenedex match <filename>` - Find scenes for a media file
//! - `scenedex canonicalize <filenames>` - Show the query a filename turns into
//! - `scenedex status` - Show index status
//! - `scenedex clear` - Delete the index
//!
//! ## Example Usage
//!
//! ```bash
//! # Build the index from a catalog export
//! scenedex --catalog scenes.json index
//!
//! # Search by cast name, with or without the space
//! scenedex --catalog scenes.json query "JaneDoe"
//!
//! # Match a downloaded file
//! scenedex --catalog scenes.json match "PXVR-258_8K_180x180.mp4"
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Scenedex - Full-text search for a scene catalog
#[derive(Parser)]
#[command(name = "scenedex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog file (JSON array of scene records)
    #[arg(long, global = true, env = "SCENEDEX_CATALOG")]
    catalog: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every catalog scene that is not indexed yet
    Index,

    /// Re-index scenes after their catalog records changed
    Update {
        /// Scene ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Remove scenes from the index
    Remove {
        /// Scene ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Search for scenes
    Query {
        /// Query text (supports field:term, +must, -must_not)
        text: String,

        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Find scenes matching a media filename
    Match {
        filename: String,

        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Print the search query derived from each filename
    Canonicalize {
        #[arg(required = true)]
        filenames: Vec<String>,
    },

    /// Show index status
    Status,

    /// Delete the index (rebuild it with `index`)
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => scenedex_core::Config::load_from(path)?,
        None => scenedex_core::Config::load()?,
    };

    let level = log_level(cli.quiet, cli.verbose, &config.general.log_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if cli.catalog.is_some() {
        config.catalog.path = cli.catalog;
    }

    match cli.command {
        Commands::Index => commands::index::run(config),
        Commands::Update { ids } => commands::update::run(config, ids),
        Commands::Remove { ids } => commands::remove::run(config, ids),
        Commands::Query {
            text,
            limit,
            output,
        } => commands::query::run(config, &text, limit, output),
        Commands::Match {
            filename,
            limit,
            output,
        } => commands::matching::run(config, &filename, limit, output),
        Commands::Canonicalize { filenames } => commands::canonicalize::run(&filenames),
        Commands::Status => commands::status::run(config),
        Commands::Clear { yes } => commands::clear::run(config, yes),
    }
}

/// Log level from the command-line flags, falling back to the configured one.
fn log_level(quiet: bool, verbose: u8, configured: &str) -> &str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}
