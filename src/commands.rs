use crate::{OutputMode, ViewKind, emit_error, emit_success};
use owo_colors::OwoColorize;
use ridedb::config::{self, RidedbConfig};
use ridedb::ui::{self, Icons, Spinner};
use ridedb::{RideStore, Stats};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Resolved settings shared by every command
pub struct Settings {
    pub database: PathBuf,
    pub table: String,
    pub config_path: PathBuf,
    pub output_mode: OutputMode,
}

impl Settings {
    fn open_store(&self) -> anyhow::Result<RideStore> {
        Ok(RideStore::open_table(&self.database, &self.table)?)
    }
}

pub fn run_init(settings: &Settings, write_config: bool, force: bool) -> anyhow::Result<()> {
    config::ensure_db_dir(&settings.database)?;
    let store = settings.open_store()?;

    if write_config {
        let cfg = RidedbConfig {
            database: Some(settings.database.display().to_string()),
            table: Some(settings.table.clone()),
        };
        config::write_config(&settings.config_path, &cfg, force)?;
    }

    if settings.output_mode.is_human() {
        ui::success("Store ready");
        ui::info("Database", &store.path().display().to_string());
        ui::info("Table", store.table());
        if write_config {
            ui::info("Config", &settings.config_path.display().to_string());
        }
    } else {
        emit_success(settings.output_mode, "init", serde_json::json!({
            "database": store.path().display().to_string(),
            "table": store.table(),
            "config": write_config.then(|| settings.config_path.display().to_string()),
        }))?;
    }
    Ok(())
}

pub fn run_import(settings: &Settings, files: &[PathBuf]) -> anyhow::Result<()> {
    let store = settings.open_store()?;
    let started = Instant::now();
    let mut imported = Vec::new();
    let mut failures = Vec::new();

    if settings.output_mode.is_human() {
        ui::header(&format!("Importing {} report(s) into {}", files.len(), store.path().display()));
    }

    for file in files {
        let spinner = settings
            .output_mode
            .is_human()
            .then(|| Spinner::new(&format!("Importing {}", file.display())));
        let outcome = ridedb::import_file(&store, file);
        if let Some(spinner) = &spinner {
            spinner.finish_and_clear();
        }

        match outcome {
            Ok(result) => {
                if settings.output_mode.is_human() {
                    ui::file_imported(&result.file_name, result.rows);
                }
                imported.push(result);
            }
            Err(e) => {
                tracing::warn!("Import of {} failed: {}", file.display(), e);
                if settings.output_mode.is_human() {
                    ui::error(&format!("import report failure | {}: {}", file.display(), e));
                }
                failures.push((file.display().to_string(), e.to_string()));
            }
        }
    }

    if settings.output_mode.is_human() {
        ui::timing(&format!("{:.2?}", started.elapsed()));
        print_stats(&ridedb::stats(&store, store.table()), "Store");
    } else if failures.is_empty() {
        emit_success(settings.output_mode, "import", serde_json::json!({ "imported": imported }))?;
    } else {
        let message = failures
            .iter()
            .map(|(file, err)| format!("{}: {}", file, err))
            .collect::<Vec<_>>()
            .join("; ");
        emit_error(settings.output_mode, "import", &message);
    }

    if !failures.is_empty() {
        anyhow::bail!("{} of {} report(s) failed to import", failures.len(), files.len());
    }
    Ok(())
}

pub fn run_stats(settings: &Settings) -> anyhow::Result<()> {
    let store = settings.open_store()?;
    let stats = ridedb::stats(&store, store.table());
    report_stats(settings, "stats", &stats, store.path())
}

pub fn run_view(settings: &Settings, kind: ViewKind) -> anyhow::Result<()> {
    let store = settings.open_store()?;
    let name = match kind {
        ViewKind::File { name, file_name } => {
            store.create_file_view(&name, &file_name)?;
            name
        }
        ViewKind::Range { name, start, end } => {
            store.create_checkout_range_view(&name, &start, &end)?;
            name
        }
    };

    // Views live until the next open, so summarize this one now.
    let stats = ridedb::stats(&store, &name);
    report_stats(settings, "view", &stats, store.path())
}

pub fn run_drop_views(settings: &Settings) -> anyhow::Result<()> {
    let store = settings.open_store()?;
    let dropped = store.drop_temporary_views()?;

    if settings.output_mode.is_human() {
        println!("{} Dropped {} view(s)", Icons::DEL, dropped.bold());
    } else {
        emit_success(settings.output_mode, "drop-views", serde_json::json!({ "dropped": dropped }))?;
    }
    Ok(())
}

fn report_stats(settings: &Settings, command: &str, stats: &Stats, database: &Path) -> anyhow::Result<()> {
    if settings.output_mode.is_human() {
        print_stats(stats, &database.display().to_string());
    } else {
        emit_success(settings.output_mode, command, serde_json::to_value(stats)?)?;
    }
    Ok(())
}

fn print_stats(stats: &Stats, title: &str) {
    ui::section(&format!(" {} {} ", Icons::STATS, title));
    println!("{}", ui::stats_table(stats));
    if stats.row_count == 0 {
        ui::warn("No trips imported yet");
    }
}
