//! Uniform row access
//!
//! Every generic query hands back `Row`s: an ordered association of column
//! name to SQLite value. Lookups go by name, so callers keep working when
//! the table grows a column or a query reorders its projection.

use rusqlite::types::Value;

/// One result row, keyed by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Build a row from explicit name/value pairs
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Capture a rusqlite row, pairing each value with its column name
    pub fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let stmt = row.as_ref();
        let mut columns = Vec::with_capacity(stmt.column_count());
        for idx in 0..stmt.column_count() {
            let name = stmt.column_name(idx)?.to_string();
            let value: Value = row.get(idx)?;
            columns.push((name, value));
        }
        Ok(Self { columns })
    }

    /// Look up a value by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Text value of a column; `None` for NULL, missing, or non-text values
    pub fn get_text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer value of a column
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Real value of a column; integers widen
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Column names in projection order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_lookup_by_name_ignores_order() {
        let conn = Connection::open_in_memory().unwrap();
        let row = conn
            .query_row("SELECT 2.5 AS Distance, 'Y' AS Flag, 7 AS TripId, NULL AS Gone", [], Row::from_sql)
            .unwrap();

        assert_eq!(row.len(), 4);
        assert_eq!(row.get_i64("TripId"), Some(7));
        assert_eq!(row.get_text("Flag"), Some("Y"));
        assert_eq!(row.get_f64("Distance"), Some(2.5));
        assert_eq!(row.get("Gone"), Some(&Value::Null));
        assert!(row.get("Missing").is_none());
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["Distance", "Flag", "TripId", "Gone"]);
    }

    #[test]
    fn test_typed_getters_reject_other_types() {
        let row = Row::new(vec![("TripId".to_string(), Value::Text("abc".to_string()))]);
        assert_eq!(row.get_i64("TripId"), None);
        assert_eq!(row.get_f64("TripId"), None);
        assert_eq!(row.get_text("TripId"), Some("abc"));
        assert!(row.contains("TripId"));
    }
}
