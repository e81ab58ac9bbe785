use tabled::{settings::Style, Table, Tabled};
use crate::stats::Stats;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Render trip statistics as a two-column table
pub fn stats_table(stats: &Stats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Rows", &stats.row_count.to_string());
    builder.add_row("Files", &stats.file_count.to_string());
    builder.add_row("First checkout", stats.min_checkout_datetime.as_deref().unwrap_or("-"));
    builder.add_row("Last checkout", stats.max_checkout_datetime.as_deref().unwrap_or("-"));
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_renders_nothing() {
        assert_eq!(TableBuilder::new().build(), "");
    }

    #[test]
    fn test_stats_table_shows_absent_dates() {
        let table = stats_table(&Stats::default());
        assert!(table.contains("Rows"));
        assert!(table.contains("Last checkout"));
        assert!(table.contains('-'));
    }
}
