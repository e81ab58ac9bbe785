//! Database schema definitions

/// Name of the trip table when none is configured
pub const DEFAULT_TABLE: &str = "ride_data";

/// Primary key column
pub const KEY_COLUMN: &str = "TripId";

/// How a source column is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Integer primary key
    Key,
    /// Free text, including Y/N flags and local date/time strings
    Text,
    /// Numeric measure; blanks are kept as empty text
    Real,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Key => "INTEGER PRIMARY KEY",
            ColumnKind::Text => "TEXT",
            ColumnKind::Real => "REAL",
        }
    }
}

/// A column present in trip report files
#[derive(Debug, Clone, Copy)]
pub struct SourceColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> SourceColumn {
    SourceColumn { name, kind }
}

/// The 28 columns a trip report header must carry, in report order
pub const SOURCE_COLUMNS: [SourceColumn; 28] = [
    col("TripId", ColumnKind::Key),
    col("UserProgramName", ColumnKind::Text),
    col("UserId", ColumnKind::Text),
    col("UserRole", ColumnKind::Text),
    col("UserCity", ColumnKind::Text),
    col("UserState", ColumnKind::Text),
    col("UserZip", ColumnKind::Text),
    col("UserCountry", ColumnKind::Text),
    col("MembershipType", ColumnKind::Text),
    col("Bike", ColumnKind::Text),
    col("BikeType", ColumnKind::Text),
    col("CheckoutKioskName", ColumnKind::Text),
    col("ReturnKioskName", ColumnKind::Text),
    col("DurationMins", ColumnKind::Real),
    col("AdjustedDurationMins", ColumnKind::Real),
    col("UsageFee", ColumnKind::Real),
    col("AdjustmentFlag", ColumnKind::Text),
    col("Distance", ColumnKind::Real),
    col("EstimatedCarbonOffset", ColumnKind::Real),
    col("EstimatedCaloriesBurned", ColumnKind::Real),
    col("CheckoutDateLocal", ColumnKind::Text),
    col("ReturnDateLocal", ColumnKind::Text),
    col("CheckoutTimeLocal", ColumnKind::Text),
    col("ReturnTimeLocal", ColumnKind::Text),
    col("TripOver30Mins", ColumnKind::Text),
    col("LocalProgramFlag", ColumnKind::Text),
    col("TripRouteCategory", ColumnKind::Text),
    col("TripProgramName", ColumnKind::Text),
];

/// Columns computed at import time, appended after the source columns
pub const DERIVED_COLUMNS: [&str; 4] = [
    "FileName",
    "ImportDateTime",
    "CheckoutDateTime",
    "ReturnDateTime",
];

/// Every stored column name, source columns first
pub fn all_column_names() -> impl Iterator<Item = &'static str> {
    SOURCE_COLUMNS
        .iter()
        .map(|c| c.name)
        .chain(DERIVED_COLUMNS.iter().copied())
}

/// Quote an SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal (views cannot take bound parameters)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SQL to create the trip table
pub fn create_table_sql(table: &str) -> String {
    let columns: Vec<String> = SOURCE_COLUMNS
        .iter()
        .map(|c| format!("    {} {}", quote_ident(c.name), c.kind.sql_type()))
        .chain(
            DERIVED_COLUMNS
                .iter()
                .map(|name| format!("    {} TEXT", quote_ident(name))),
        )
        .collect();

    format!("CREATE TABLE {} (\n{}\n)", quote_ident(table), columns.join(",\n"))
}

/// SQL to create indexes backing the file and datetime lookups
pub fn create_index_sql(table: &str) -> Vec<String> {
    ["FileName", "CheckoutDateTime"]
        .iter()
        .map(|column| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                quote_ident(&format!("idx_{}_{}", table, column.to_lowercase())),
                quote_ident(table),
                quote_ident(column),
            )
        })
        .collect()
}

/// SQL for the replace-by-key write of one full trip row
pub fn upsert_sql(table: &str) -> String {
    let names: Vec<String> = all_column_names().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", "),
    )
}
