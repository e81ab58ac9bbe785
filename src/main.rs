//! Ridedb CLI - Command-line front-end for the bike-share trip store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ridedb")]
#[command(version)]
#[command(about = "Bike-share trip report importer - idempotent SQLite store with statistics")]
#[command(long_about = r#"
Ridedb loads bike-share trip reports into a local SQLite file:
  • Re-importing a report (or an overlapping one) never duplicates trips
  • Each report imports as a single transaction
  • Statistics summarize rows, source files, and checkout range

Example usage:
  ridedb init
  ridedb import reports/2024-06.csv reports/2024-07.csv
  ridedb stats
  ridedb view range june "2024-06-01 00:00:00" "2024-06-30 23:59:59"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Trip table name (overrides config)
    #[arg(short, long, global = true)]
    table: Option<String>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store (and optionally a config file)
    Init {
        /// Write the resolved settings to the config file
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Import one or more trip report files
    Import {
        /// Report files, each imported as its own transaction
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show statistics about the imported trips
    Stats,

    /// Create a view over the trip table and summarize it
    View {
        #[command(subcommand)]
        kind: ViewKind,
    },

    /// Drop every view defined in the store
    DropViews,
}

#[derive(Subcommand)]
pub enum ViewKind {
    /// Trips imported from one report file
    File {
        /// View name
        name: String,
        /// Report base name as stored in FileName
        file_name: String,
    },
    /// Trips whose checkout datetime lies within [start, end]
    Range {
        /// View name
        name: String,
        /// Lower bound, `YYYY-MM-DD HH:MM:SS`
        start: String,
        /// Upper bound, `YYYY-MM-DD HH:MM:SS`
        end: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a JSON success envelope
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

/// Print a JSON failure envelope
pub fn emit_error(mode: OutputMode, command: &str, message: &str) {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": false,
            "command": command,
            "error": message,
        });
        println!("{}", envelope);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config = ridedb::config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = config.resolve_database(cli.database.as_deref());
    let table = config.resolve_table(cli.table.as_deref());
    tracing::debug!("Using database {} (table {})", database.display(), table);

    let settings = commands::Settings {
        database,
        table,
        config_path: cli.config.unwrap_or_else(ridedb::config::default_config_path),
        output_mode,
    };

    match cli.command {
        Commands::Init { write_config, force } => commands::run_init(&settings, write_config, force),
        Commands::Import { files } => commands::run_import(&settings, &files),
        Commands::Stats => commands::run_stats(&settings),
        Commands::View { kind } => commands::run_view(&settings, kind),
        Commands::DropViews => commands::run_drop_views(&settings),
    }
}
