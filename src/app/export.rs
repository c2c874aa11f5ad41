//! Export functionality for grid rows

use crate::app::{ExportScope, Session};
use crate::db::{normalize_for_display, Record};
use crate::error::{CrudError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::path::PathBuf;

/// Serialize rows as CSV.
///
/// Header is the column names joined by commas; every value is double-quoted
/// with embedded quotes doubled, null and missing values become `""`.
pub fn to_csv(columns: &[&str], rows: &[&Record]) -> Result<String> {
    let mut header = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header.write_record(columns)?;
    let buf = header
        .into_inner()
        .map_err(|e| CrudError::Io(e.into_error()))?;

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buf);
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| row.get(*c).map(normalize_for_display).unwrap_or_default())
            .collect();
        wtr.write_record(&record)?;
    }
    let buf = wtr.into_inner().map_err(|e| CrudError::Io(e.into_error()))?;
    String::from_utf8(buf).map_err(|e| CrudError::Validation(e.to_string()))
}

/// Serialize rows as a JSON array of objects holding display text
pub fn to_json(columns: &[&str], rows: &[&Record]) -> Result<String> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    let text = row.get(*c).map(normalize_for_display).unwrap_or_default();
                    (c.to_string(), serde_json::Value::String(text))
                })
                .collect()
        })
        .collect();
    Ok(serde_json::to_string_pretty(&objects)?)
}

impl Session {
    /// Export grid rows to `{table}_data.csv` in the export directory
    pub fn export_csv(&mut self, scope: ExportScope) -> Result<PathBuf> {
        let table = self.export_table()?;
        let columns = self.grid.data_columns();
        let rows = self.grid.rows_for(scope);
        let content = to_csv(&columns, &rows)?;
        let count = rows.len();
        self.write_export(&format!("{}_data.csv", table), &content, count)
    }

    /// Export grid rows to `{table}_data.json` in the export directory
    pub fn export_json(&mut self, scope: ExportScope) -> Result<PathBuf> {
        let table = self.export_table()?;
        let columns = self.grid.data_columns();
        let rows = self.grid.rows_for(scope);
        let content = to_json(&columns, &rows)?;
        let count = rows.len();
        self.write_export(&format!("{}_data.json", table), &content, count)
    }

    fn export_table(&mut self) -> Result<String> {
        let table = self.selected_table.clone().ok_or_else(|| {
            CrudError::Validation("no table selected".to_string())
        })?;
        if self.grid.rows.is_empty() {
            let err = CrudError::Validation("no rows to export".to_string());
            self.error = Some(err.to_string());
            return Err(err);
        }
        Ok(table)
    }

    fn write_export(&mut self, filename: &str, content: &str, count: usize) -> Result<PathBuf> {
        let dir = self.config.export_dir();
        let path = dir.join(filename);
        let written = std::fs::create_dir_all(&dir).and_then(|_| std::fs::write(&path, content));
        match written {
            Ok(()) => {
                tracing::info!(path = %path.display(), rows = count, "export written");
                self.message = Some(format!("Exported {} row(s) to {}", count, path.display()));
                Ok(path)
            }
            Err(e) => {
                self.error = Some(format!("Export failed: {}", e));
                Err(e.into())
            }
        }
    }
}
