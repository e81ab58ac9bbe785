//! Trip report import pipeline
//!
//! A report file is read, its header checked against the 28 known columns,
//! and every record normalized and written with `INSERT OR REPLACE`. The
//! whole file goes in one transaction: either every row lands or none do.
//!
//! The write is a full-row replace keyed on `TripId`. A re-imported trip
//! takes all of its values from the newer file; nothing is merged.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use chrono::{Local, NaiveDateTime};
use rusqlite::types::Value;
use crate::storage::schema::{self, ColumnKind, SOURCE_COLUMNS};
use crate::storage::{RideStore, table_exists};
use crate::{Error, Result};

/// Layout of the `ImportDateTime` column
pub const IMPORT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ways a single file import can fail after the header checks out
#[derive(Debug, thiserror::Error)]
pub enum ImportFailure {
    #[error("report not found: {0}")]
    FileNotFound(String),

    #[error("cannot read report {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("no such table: {0}")]
    MissingTable(String),

    #[error("{0}")]
    Storage(#[from] rusqlite::Error),
}

/// Outcome of a committed import
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ImportResult {
    /// Base name of the imported file, as stored in `FileName`
    pub file_name: String,
    /// Number of rows written (inserted or replaced)
    pub rows: usize,
    /// Value stored in `ImportDateTime` for every row of this import
    pub imported_at: String,
}

/// Import a report file, stamping rows with the current local time
pub fn import_file(store: &RideStore, path: &Path) -> Result<ImportResult> {
    import_file_at(store, path, Local::now().naive_local())
}

/// Import a report file with an explicit import timestamp
pub fn import_file_at(store: &RideStore, path: &Path, imported_at: NaiveDateTime) -> Result<ImportResult> {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let imported_at = imported_at.format(IMPORT_DATETIME_FORMAT).to_string();

    let mut reader = open_report(path)?;
    let positions = header_positions(&mut reader, path)?;

    let mut conn = store.connect()?;
    if !table_exists(&conn, store.table()) {
        return Err(ImportFailure::MissingTable(store.table().to_string()).into());
    }

    // Dropping `tx` on any early return rolls the whole file back.
    let tx = conn.transaction().map_err(ImportFailure::from)?;
    let mut rows = 0;
    {
        let mut stmt = tx
            .prepare(&schema::upsert_sql(store.table()))
            .map_err(ImportFailure::from)?;
        let derived = Derived {
            file_name: &file_name,
            imported_at: &imported_at,
        };

        for record in reader.records() {
            let record = record.map_err(|e| read_error(path, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let values = normalize_record(&record, &positions, &derived, line)?;
            stmt.execute(rusqlite::params_from_iter(values))
                .map_err(ImportFailure::from)?;
            rows += 1;
        }
    }
    tx.commit().map_err(ImportFailure::from)?;

    tracing::info!("Imported {} rows from {} into {}", rows, file_name, store.table());
    Ok(ImportResult {
        file_name,
        rows,
        imported_at,
    })
}

struct Derived<'a> {
    file_name: &'a str,
    imported_at: &'a str,
}

fn open_report(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ImportFailure::FileNotFound(path.display().to_string()),
        _ => read_error(path, e.into()),
    })?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn read_error(path: &Path, source: csv::Error) -> ImportFailure {
    if let csv::ErrorKind::UnequalLengths { pos, expected_len, len } = source.kind() {
        return ImportFailure::MalformedRow {
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            reason: format!("expected {} fields, found {}", expected_len, len),
        };
    }
    ImportFailure::Read {
        path: path.display().to_string(),
        source,
    }
}

/// Map each source column to its index in the report, or report the mismatch
fn header_positions<R: std::io::Read>(reader: &mut csv::Reader<R>, path: &Path) -> Result<Vec<usize>> {
    let headers = reader.headers().map_err(|e| read_error(path, e))?.clone();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut unexpected: BTreeSet<String> = BTreeSet::new();
    for (idx, name) in headers.iter().enumerate() {
        let known = SOURCE_COLUMNS.iter().any(|c| c.name == name);
        if !known || seen.insert(name, idx).is_some() {
            unexpected.insert(name.to_string());
        }
    }

    let missing: Vec<String> = SOURCE_COLUMNS
        .iter()
        .filter(|c| !seen.contains_key(c.name))
        .map(|c| c.name.to_string())
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(Error::ImportSchemaMismatch {
            missing,
            unexpected: unexpected.into_iter().collect(),
        });
    }

    Ok(SOURCE_COLUMNS.iter().map(|c| seen[c.name]).collect())
}

/// Produce the full set of stored values for one record, in column order
fn normalize_record(
    record: &csv::StringRecord,
    positions: &[usize],
    derived: &Derived<'_>,
    line: u64,
) -> Result<Vec<Value>> {
    let malformed = |reason: String| Error::from(ImportFailure::MalformedRow { line, reason });

    let mut values = Vec::with_capacity(SOURCE_COLUMNS.len() + schema::DERIVED_COLUMNS.len());
    for (column, &pos) in SOURCE_COLUMNS.iter().zip(positions) {
        let raw = record.get(pos).unwrap_or("");
        let value = match column.kind {
            ColumnKind::Key => raw
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| malformed(format!("{} must be an integer, got {:?}", column.name, raw)))?,
            kind => normalize_value(raw, kind)
                .ok_or_else(|| malformed(format!("{} must be numeric, got {:?}", column.name, raw)))?,
        };
        values.push(value);
    }

    values.push(Value::Text(derived.file_name.to_string()));
    values.push(Value::Text(derived.imported_at.to_string()));
    values.push(Value::Text(join_datetime(
        cell(record, positions, "CheckoutDateLocal"),
        cell(record, positions, "CheckoutTimeLocal"),
    )));
    values.push(Value::Text(join_datetime(
        cell(record, positions, "ReturnDateLocal"),
        cell(record, positions, "ReturnTimeLocal"),
    )));
    Ok(values)
}

fn cell<'r>(record: &'r csv::StringRecord, positions: &[usize], name: &str) -> &'r str {
    SOURCE_COLUMNS
        .iter()
        .position(|c| c.name == name)
        .and_then(|i| record.get(positions[i]))
        .unwrap_or("")
}

/// Normalize one non-key cell. `None` means a numeric column held non-numeric
/// or non-finite text (`NaN` would otherwise be stored as NULL).
///
/// Blank cells become empty text, never NULL. Literal booleans become 0/1.
pub fn normalize_value(raw: &str, kind: ColumnKind) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(Value::Text(String::new()));
    }
    if raw.eq_ignore_ascii_case("true") {
        return Some(Value::Integer(1));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Some(Value::Integer(0));
    }
    match kind {
        ColumnKind::Real => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Real),
        ColumnKind::Key | ColumnKind::Text => Some(Value::Text(raw.to_string())),
    }
}

/// Date and time joined by a single space
pub fn join_datetime(date: &str, time: &str) -> String {
    format!("{} {}", date, time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "TripId,UserProgramName,UserId,UserRole,UserCity,UserState,UserZip,UserCountry,\
MembershipType,Bike,BikeType,CheckoutKioskName,ReturnKioskName,DurationMins,AdjustedDurationMins,UsageFee,\
AdjustmentFlag,Distance,EstimatedCarbonOffset,EstimatedCaloriesBurned,CheckoutDateLocal,ReturnDateLocal,\
CheckoutTimeLocal,ReturnTimeLocal,TripOver30Mins,LocalProgramFlag,TripRouteCategory,TripProgramName";

    fn trip_line(trip_id: &str, distance: &str, date: &str, time: &str) -> String {
        format!(
            "{},Des Moines BCycle,2395732,Maintenance,,,,UNITED STATES,,21865,Standard,Lauridsen Skatepark,\
Lauridsen Skatepark,0,0,0,N,{},.0,0,{},{},{},16:06:32,N,Y,Round Trip,Des Moines BCycle",
            trip_id, distance, date, date, time
        )
    }

    fn sample_lines() -> Vec<String> {
        vec![
            trip_line("33567793", ".0", "2024-06-02", "16:06:24"),
            trip_line("33567803", ".0", "2024-06-02", "16:07:27"),
        ]
    }

    fn write_report(dir: &Path, name: &str, header: &str, lines: &[String]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", header).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn setup() -> (TempDir, RideStore) {
        let dir = TempDir::new().unwrap();
        let store = RideStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn fixed_time() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-07-01 08:30:00", IMPORT_DATETIME_FORMAT).unwrap()
    }

    #[test]
    fn test_import_writes_rows_and_derived_fields() {
        let (dir, store) = setup();
        let report = write_report(dir.path(), "june.csv", HEADER, &sample_lines());

        let result = import_file_at(&store, &report, fixed_time()).unwrap();
        assert_eq!(result.rows, 2);
        assert_eq!(result.file_name, "june.csv");
        assert_eq!(result.imported_at, "2024-07-01 08:30:00");

        let row = store.find_trip(33567793).unwrap().unwrap();
        assert_eq!(row.get_text("FileName"), Some("june.csv"));
        assert_eq!(row.get_text("ImportDateTime"), Some("2024-07-01 08:30:00"));
        assert_eq!(row.get_text("CheckoutDateTime"), Some("2024-06-02 16:06:24"));
        assert_eq!(row.get_text("ReturnDateTime"), Some("2024-06-02 16:06:32"));
        assert_eq!(row.get_text("AdjustmentFlag"), Some("N"));
        assert_eq!(row.get_f64("Distance"), Some(0.0));
        // blank cells are stored as empty text, not NULL
        assert_eq!(row.get_text("UserCity"), Some(""));
        assert_eq!(row.get_text("MembershipType"), Some(""));
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let (dir, store) = setup();
        let report = write_report(dir.path(), "june.csv", HEADER, &sample_lines());

        import_file(&store, &report).unwrap();
        import_file(&store, &report).unwrap();
        assert_eq!(store.count_trips().unwrap(), 2);
    }

    #[test]
    fn test_reimport_replaces_whole_row() {
        let (dir, store) = setup();
        let first = write_report(dir.path(), "first.csv", HEADER, &[trip_line("1", "2.5", "2024-06-02", "10:00:00")]);
        import_file(&store, &first).unwrap();

        // Second file changes Distance and blanks the checkout time: the row
        // is replaced wholesale, so the old time does not survive.
        let second = write_report(dir.path(), "second.csv", HEADER, &[trip_line("1", "7.25", "2024-06-02", "")]);
        import_file(&store, &second).unwrap();

        assert_eq!(store.count_trips().unwrap(), 1);
        let row = store.find_trip(1).unwrap().unwrap();
        assert_eq!(row.get_f64("Distance"), Some(7.25));
        assert_eq!(row.get_text("FileName"), Some("second.csv"));
        assert_eq!(row.get_text("CheckoutTimeLocal"), Some(""));
        assert_eq!(row.get_text("CheckoutDateTime"), Some("2024-06-02 "));
    }

    #[test]
    fn test_header_in_any_order() {
        let (dir, store) = setup();
        let mut names: Vec<&str> = HEADER.split(',').collect();
        names.reverse();
        let line: Vec<String> = {
            let mut cells: Vec<String> = trip_line("5", "1.5", "2024-06-03", "09:00:00")
                .split(',')
                .map(str::to_string)
                .collect();
            cells.reverse();
            cells
        };
        let report = write_report(dir.path(), "rev.csv", &names.join(","), &[line.join(",")]);

        import_file(&store, &report).unwrap();
        let row = store.find_trip(5).unwrap().unwrap();
        assert_eq!(row.get_f64("Distance"), Some(1.5));
        assert_eq!(row.get_text("CheckoutDateTime"), Some("2024-06-03 09:00:00"));
    }

    #[test]
    fn test_header_mismatch() {
        let (dir, store) = setup();
        let header = HEADER.replace("Distance", "Miles");
        let report = write_report(dir.path(), "bad.csv", &header, &sample_lines());

        match import_file(&store, &report).unwrap_err() {
            Error::ImportSchemaMismatch { missing, unexpected } => {
                assert_eq!(missing, vec!["Distance".to_string()]);
                assert_eq!(unexpected, vec!["Miles".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.count_trips().unwrap(), 0);
    }

    #[test]
    fn test_header_extra_column() {
        let (dir, store) = setup();
        let header = format!("{},Extra", HEADER);
        let lines: Vec<String> = sample_lines().into_iter().map(|l| format!("{},x", l)).collect();
        let report = write_report(dir.path(), "extra.csv", &header, &lines);

        let err = import_file(&store, &report).unwrap_err();
        assert!(matches!(err, Error::ImportSchemaMismatch { ref missing, .. } if missing.is_empty()));
    }

    #[test]
    fn test_missing_report() {
        let (dir, store) = setup();
        let err = import_file(&store, &dir.path().join("foo.csv")).unwrap_err();
        assert!(matches!(err, Error::Import(ImportFailure::FileNotFound(_))));
    }

    #[test]
    fn test_missing_table() {
        let (dir, store) = setup();
        store.connect().unwrap().execute("DROP TABLE ride_data", []).unwrap();
        let report = write_report(dir.path(), "june.csv", HEADER, &sample_lines());

        let err = import_file(&store, &report).unwrap_err();
        assert!(matches!(err, Error::Import(ImportFailure::MissingTable(ref t)) if t == "ride_data"));
        assert_eq!(err.to_string(), "Import failure: no such table: ride_data");
        assert!(!store.table_exists("ride_data"));
    }

    #[test]
    fn test_malformed_row_rolls_back_file() {
        let (dir, store) = setup();
        let mut lines = sample_lines();
        lines.push(trip_line("33567999", "far", "2024-06-02", "17:00:00"));
        let report = write_report(dir.path(), "june.csv", HEADER, &lines);

        let err = import_file(&store, &report).unwrap_err();
        match err {
            Error::Import(ImportFailure::MalformedRow { line, reason }) => {
                assert_eq!(line, 4);
                assert!(reason.contains("Distance"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.count_trips().unwrap(), 0);
    }

    #[test]
    fn test_non_finite_measure_is_malformed() {
        let (dir, store) = setup();
        for (name, distance) in [("nan.csv", "NaN"), ("inf.csv", "inf")] {
            let report = write_report(dir.path(), name, HEADER, &[trip_line("1", distance, "2024-06-02", "10:00:00")]);
            let err = import_file(&store, &report).unwrap_err();
            match err {
                Error::Import(ImportFailure::MalformedRow { line, reason }) => {
                    assert_eq!(line, 2);
                    assert!(reason.contains("Distance"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(store.count_trips().unwrap(), 0);
        assert!(store.find_trip(1).unwrap().is_none());
    }

    #[test]
    fn test_short_row_is_malformed() {
        let (dir, store) = setup();
        let mut lines = sample_lines();
        lines.push("33567999,Des Moines BCycle".to_string());
        let report = write_report(dir.path(), "june.csv", HEADER, &lines);

        let err = import_file(&store, &report).unwrap_err();
        assert!(matches!(err, Error::Import(ImportFailure::MalformedRow { .. })));
        assert_eq!(store.count_trips().unwrap(), 0);
    }

    #[test]
    fn test_blank_trip_id_is_malformed() {
        let (dir, store) = setup();
        let report = write_report(dir.path(), "june.csv", HEADER, &[trip_line("", "1", "2024-06-02", "10:00:00")]);
        let err = import_file(&store, &report).unwrap_err();
        assert!(matches!(err, Error::Import(ImportFailure::MalformedRow { line: 2, .. })));
    }

    #[test]
    fn test_failed_import_keeps_earlier_rows() {
        let (dir, store) = setup();
        let good = write_report(dir.path(), "good.csv", HEADER, &sample_lines());
        import_file(&store, &good).unwrap();

        let bad = write_report(dir.path(), "bad.csv", HEADER, &[
            trip_line("33567793", "9", "2024-06-05", "10:00:00"),
            trip_line("oops", "9", "2024-06-05", "10:00:00"),
        ]);
        assert!(import_file(&store, &bad).is_err());

        assert_eq!(store.count_trips().unwrap(), 2);
        let row = store.find_trip(33567793).unwrap().unwrap();
        assert_eq!(row.get_text("FileName"), Some("good.csv"));
    }

    #[test]
    fn test_two_reports_feed_stats() {
        let (dir, store) = setup();
        let april = write_report(dir.path(), "april.csv", HEADER, &[trip_line("1", "1", "2024-04-01", "12:00:00")]);
        let may = write_report(dir.path(), "may.csv", HEADER, &[trip_line("2", "1", "2024-05-01", "23:00:00")]);
        import_file(&store, &april).unwrap();
        import_file(&store, &may).unwrap();

        let stats = crate::stats(&store, store.table());
        assert_eq!(stats.row_count, 2);
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.min_checkout_datetime.as_deref(), Some("2024-04-01 12:00:00"));
        assert_eq!(stats.max_checkout_datetime.as_deref(), Some("2024-05-01 23:00:00"));
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("", ColumnKind::Real), Some(Value::Text(String::new())));
        assert_eq!(normalize_value("  ", ColumnKind::Text), Some(Value::Text(String::new())));
        assert_eq!(normalize_value(".0", ColumnKind::Real), Some(Value::Real(0.0)));
        assert_eq!(normalize_value("TRUE", ColumnKind::Text), Some(Value::Integer(1)));
        assert_eq!(normalize_value("false", ColumnKind::Real), Some(Value::Integer(0)));
        assert_eq!(normalize_value("Y", ColumnKind::Text), Some(Value::Text("Y".to_string())));
        assert_eq!(normalize_value("abc", ColumnKind::Real), None);
        assert_eq!(normalize_value("NaN", ColumnKind::Real), None);
        assert_eq!(normalize_value("-inf", ColumnKind::Real), None);
        assert_eq!(normalize_value("NaN", ColumnKind::Text), Some(Value::Text("NaN".to_string())));
    }

    #[test]
    fn test_join_datetime() {
        assert_eq!(join_datetime("2024-04-01", "12:00:00"), "2024-04-01 12:00:00");
        assert_eq!(join_datetime("", ""), " ");
    }
}
