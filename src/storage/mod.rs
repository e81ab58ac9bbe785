//! Storage Layer - SQLite-backed persistence
//!
//! System of record is one SQLite file holding:
//! - the trip table (default `ride_data`), keyed by `TripId`
//! - zero or more views layered on it, cleared on every open

pub mod schema;
pub mod sqlite;

pub use sqlite::{RideStore, table_exists};
