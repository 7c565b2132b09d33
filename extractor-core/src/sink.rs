use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExtractorError;
use crate::flatten::Row;

/// Buffered CSV output table with an elastic schema.
///
/// Rows are buffered and the column set grows as new fields appear; the
/// schema is only finalized at [`TableSink::close`], which writes the CSV
/// (header plus data rows, blank cells for columns a row lacks) and a
/// sidecar `<table>.csv.manifest` recording the final column set and the
/// incremental-load flag.
pub struct TableSink {
    path: PathBuf,
    incremental: bool,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl TableSink {
    pub fn new(dir: &Path, name: &str, incremental: bool) -> Self {
        Self {
            path: dir.join(format!("{name}.csv")),
            incremental,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Pre-register columns so a table that receives no rows still closes
    /// with a known schema.
    pub fn seed_columns(&mut self, columns: &[&str]) {
        for column in columns {
            self.note_column(column);
        }
    }

    pub fn write_row(&mut self, row: Row) {
        for key in row.keys() {
            self.note_column(key);
        }
        self.rows.push(row);
    }

    pub fn write_rows(&mut self, rows: Vec<Row>) {
        for row in rows {
            self.write_row(row);
        }
    }

    fn note_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    /// Finalize the schema and flush everything to disk.
    pub fn close(self) -> Result<(), ExtractorError> {
        let mut writer = csv::Writer::from_path(&self.path)?;

        if !self.columns.is_empty() {
            writer.write_record(&self.columns)?;
            for row in &self.rows {
                let record: Vec<String> =
                    self.columns.iter().map(|column| cell_to_string(row.get(column))).collect();
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;

        let manifest = json!({
            "columns": self.columns,
            "incremental": self.incremental,
        });
        let manifest_path = self.path.with_extension("csv.manifest");
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

        Ok(())
    }
}

fn cell_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
