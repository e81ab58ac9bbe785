//! # Ridedb - Bike-share trip report store
//!
//! Imports bike-share trip-report files into a single SQLite file and
//! answers summary questions about what has been accumulated.
//!
//! Ridedb provides:
//! - A fixed trip table created on first open and verified on every open
//! - Idempotent replace-by-key imports, one transaction per report file
//! - Aggregate statistics over the table or any view layered on it
//! - Session-scoped views that are cleared on the next open

pub mod record;
pub mod storage;
pub mod import;
pub mod stats;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use record::Row;
pub use storage::{RideStore, table_exists};
pub use import::{ImportFailure, ImportResult, import_file, import_file_at};
pub use stats::{Stats, stats, try_stats};

/// Result type alias for Ridedb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Ridedb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open store at {path}: {source}")]
    StoreOpen {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Report header mismatch (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    ImportSchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Import failure: {0}")]
    Import(#[from] ImportFailure),

    #[error("Stats query error: {0}")]
    StatsQuery(#[source] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
