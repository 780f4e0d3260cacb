use crate::data::datatable::DataTable;
use anyhow::{anyhow, Result};
use chrono::Local;
use serde_json::{Map, Value};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column holding the row label in exported files
pub const LABEL_COLUMN: &str = "label";

/// Header for the label column: [`LABEL_COLUMN`], underscore-prefixed until
/// it no longer clashes with a data column.
pub fn label_header(table: &DataTable) -> String {
    let mut header = LABEL_COLUMN.to_string();
    while table.get_column(&header).is_some() {
        header.insert(0, '_');
    }
    header
}

/// Writes result tables to CSV and JSON files
pub struct DataExporter;

impl DataExporter {
    /// Export to CSV. The first column is the row label.
    pub fn write_csv(table: &DataTable, path: &Path) -> Result<String> {
        if table.row_count() == 0 {
            return Err(anyhow!("No data to export"));
        }

        let mut wtr = csv::Writer::from_path(path)?;

        let mut headers = vec![label_header(table)];
        headers.extend(table.column_names());
        wtr.write_record(&headers)?;

        for row in table.to_string_table() {
            wtr.write_record(&row)?;
        }
        wtr.flush()?;

        info!("Exported {} rows to {:?}", table.row_count(), path);
        Ok(format!(
            "Exported {} rows to CSV file: {}",
            table.row_count(),
            path.display()
        ))
    }

    /// Export to a pretty-printed JSON array of objects
    pub fn write_json(table: &DataTable, path: &Path) -> Result<String> {
        if table.row_count() == 0 {
            return Err(anyhow!("No data to export"));
        }

        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &Self::to_json_values(table))?;

        info!("Exported {} rows to {:?}", table.row_count(), path);
        Ok(format!(
            "Exported {} rows to JSON file: {}",
            table.row_count(),
            path.display()
        ))
    }

    /// One JSON object per row, label first, cells in column order
    pub fn to_json_values(table: &DataTable) -> Vec<Value> {
        let label_key = label_header(table);
        table
            .rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                obj.insert(label_key.clone(), Value::String(row.label.clone()));
                for (column, value) in table.columns.iter().zip(&row.values) {
                    obj.insert(column.name.clone(), value.to_json());
                }
                Value::Object(obj)
            })
            .collect()
    }

    /// `<prefix>_<YYYYmmdd_HHMMSS>.<extension>` in the current directory
    pub fn timestamped_filename(prefix: &str, extension: &str) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("{}_{}.{}", prefix, timestamp, extension))
    }
}
