//! Aggregate statistics over the trip table or a view layered on it

use crate::record::Row;
use crate::storage::RideStore;
use crate::storage::schema::quote_ident;
use crate::{Error, Result};

/// Summary of a trip table or view
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    pub row_count: u64,
    pub file_count: u64,
    /// Smallest `CheckoutDateLocal + " " + CheckoutTimeLocal`, compared as text
    pub min_checkout_datetime: Option<String>,
    /// Largest `CheckoutDateLocal + " " + CheckoutTimeLocal`, compared as text
    pub max_checkout_datetime: Option<String>,
}

impl Stats {
    fn from_row(row: &Row) -> Self {
        Self {
            row_count: row.get_i64("row_count").unwrap_or(0) as u64,
            file_count: row.get_i64("file_count").unwrap_or(0) as u64,
            min_checkout_datetime: row.get_text("min_date").map(str::to_string),
            max_checkout_datetime: row.get_text("max_date").map(str::to_string),
        }
    }
}

fn stats_sql(table: &str) -> String {
    format!(
        "SELECT COUNT(*) AS row_count, \
                COUNT(DISTINCT FileName) AS file_count, \
                MIN(CheckoutDateLocal || ' ' || CheckoutTimeLocal) AS min_date, \
                MAX(CheckoutDateLocal || ' ' || CheckoutTimeLocal) AS max_date \
         FROM {}",
        quote_ident(table)
    )
}

/// Compute statistics, surfacing query failures
pub fn try_stats(store: &RideStore, table: &str) -> Result<Stats> {
    let conn = store.connect()?;
    let row = conn
        .query_row(&stats_sql(table), [], Row::from_sql)
        .map_err(Error::StatsQuery)?;
    Ok(Stats::from_row(&row))
}

/// Compute statistics for a summary view.
///
/// Never fails: a missing table or broken store is logged and yields
/// zeroed statistics.
pub fn stats(store: &RideStore, table: &str) -> Stats {
    match try_stats(store, table) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("db stats error | {}", e);
            Stats::default()
        }
    }
}
