use crate::record::NormalizedRecord;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Represents the data type of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Json,
    Null,
    Mixed, // For columns with mixed types
}

impl DataType {
    /// Merge two types (for columns with mixed types)
    pub fn merge(&self, other: &DataType) -> DataType {
        if self == other {
            return self.clone();
        }

        match (self, other) {
            (DataType::Null, t) | (t, DataType::Null) => t.clone(),
            (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => {
                DataType::Float
            }
            _ => DataType::Mixed,
        }
    }
}

/// Column metadata and definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataColumn {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub unique_values: Option<usize>,
    pub null_count: usize,
}

impl DataColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Null,
            nullable: true,
            unique_values: None,
            null_count: 0,
        }
    }

}

/// A single cell value in the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(String), // Kept as the API sent it
    Json(String),     // Arrays and nested objects, serialized
    Null,
}

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::String(_) => DataType::String,
            DataValue::Integer(_) => DataType::Integer,
            DataValue::Float(_) => DataType::Float,
            DataValue::Boolean(_) => DataType::Boolean,
            DataValue::DateTime(_) => DataType::DateTime,
            DataValue::Json(_) => DataType::Json,
            DataValue::Null => DataType::Null,
        }
    }

    /// Back to JSON, for exporters
    pub fn to_json(&self) -> JsonValue {
        match self {
            DataValue::String(s) | DataValue::DateTime(s) => JsonValue::String(s.clone()),
            DataValue::Integer(i) => JsonValue::from(*i),
            DataValue::Float(f) => JsonValue::from(*f),
            DataValue::Boolean(b) => JsonValue::Bool(*b),
            DataValue::Json(raw) => {
                serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.clone()))
            }
            DataValue::Null => JsonValue::Null,
        }
    }
}

impl From<&JsonValue> for DataValue {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => DataValue::Null,
            JsonValue::Bool(b) => DataValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DataValue::Integer(i)
                } else if n.is_u64() {
                    // above i64::MAX; an f64 would drop digits
                    DataValue::String(n.to_string())
                } else if let Some(f) = n.as_f64() {
                    DataValue::Float(f)
                } else {
                    DataValue::String(n.to_string())
                }
            }
            JsonValue::String(s) => {
                if looks_like_datetime(s) {
                    DataValue::DateTime(s.clone())
                } else {
                    DataValue::String(s.clone())
                }
            }
            JsonValue::Array(_) | JsonValue::Object(_) => DataValue::Json(json.to_string()),
        }
    }
}

fn looks_like_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::String(s) => write!(f, "{}", s),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::DateTime(dt) => write!(f, "{}", dt),
            DataValue::Json(raw) => write!(f, "{}", raw),
            DataValue::Null => write!(f, ""),
        }
    }
}

/// A row of data in the table, labelled by the record's identity string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRow {
    pub label: String,
    pub values: Vec<DataValue>,
}

impl DataRow {
    pub fn new(label: impl Into<String>, values: Vec<DataValue>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    pub fn get(&self, index: usize) -> Option<&DataValue> {
        self.values.get(index)
    }
}

/// Merged result of a paginated fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTable {
    pub name: String,
    pub columns: Vec<DataColumn>,
    pub rows: Vec<DataRow>,
    pub metadata: HashMap<String, String>,
}

impl DataTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Build a table with a fixed column set from normalized records.
    ///
    /// Fields a record lacks become `Null`; fields not in `columns` are
    /// dropped. Every record becomes exactly one row, duplicate labels
    /// included.
    pub fn from_records(
        name: impl Into<String>,
        columns: &[String],
        records: Vec<NormalizedRecord>,
    ) -> Self {
        let mut table = DataTable::new(name);
        for column in columns {
            table.add_column(DataColumn::new(column.clone()));
        }

        table.rows.reserve(records.len());
        for record in records {
            let values = columns
                .iter()
                .map(|c| record.fields.get(c).map(DataValue::from).unwrap_or(DataValue::Null))
                .collect();
            table.rows.push(DataRow::new(record.label, values));
        }

        table.infer_column_types();

        debug!(
            "Created DataTable '{}' with {} columns and {} rows",
            table.name,
            table.column_count(),
            table.row_count()
        );

        table
    }

    pub fn add_column(&mut self, column: DataColumn) -> &mut Self {
        self.columns.push(column);
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&DataColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names as a vector
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Row labels in row order
    pub fn labels(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.label.as_str()).collect()
    }

    /// Indices of every row carrying `label`
    pub fn rows_labelled(&self, label: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.label == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Infer and update column types based on data
    pub fn infer_column_types(&mut self) {
        for (col_idx, column) in self.columns.iter_mut().enumerate() {
            let mut inferred_type = DataType::Null;
            let mut null_count = 0;
            let mut unique_values = HashSet::new();

            for row in &self.rows {
                if let Some(value) = row.get(col_idx) {
                    if value.is_null() {
                        null_count += 1;
                    } else {
                        inferred_type = inferred_type.merge(&value.data_type());
                        unique_values.insert(value.to_string());
                    }
                }
            }

            column.data_type = inferred_type;
            column.null_count = null_count;
            column.nullable = null_count > 0;
            column.unique_values = Some(unique_values.len());
        }
    }

    /// Get a value at specific row and column
    pub fn get_value(&self, row: usize, col: usize) -> Option<&DataValue> {
        self.rows.get(row)?.get(col)
    }

    /// Get a value by row index and column name
    pub fn get_value_by_name(&self, row: usize, col_name: &str) -> Option<&DataValue> {
        let col_idx = self.get_column_index(col_name)?;
        self.get_value(row, col_idx)
    }

    /// Convert to a vector of string vectors, label first
    pub fn to_string_table(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                std::iter::once(row.label.clone())
                    .chain(row.values.iter().map(|v| v.to_string()))
                    .collect()
            })
            .collect()
    }

    /// Generate a debug dump string for display
    pub fn debug_dump(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("DataTable: {}\n", self.name));
        output.push_str(&format!(
            "Rows: {} | Columns: {}\n",
            self.row_count(),
            self.column_count()
        ));

        if !self.metadata.is_empty() {
            output.push_str("Metadata:\n");
            let mut keys: Vec<_> = self.metadata.keys().collect();
            keys.sort();
            for key in keys {
                output.push_str(&format!("  {}: {}\n", key, self.metadata[key]));
            }
        }

        output.push_str("\nColumns:\n");
        for column in &self.columns {
            output.push_str(&format!("  {} ({:?})", column.name, column.data_type));
            if column.nullable {
                output.push_str(&format!(" - nullable, {} nulls", column.null_count));
            }
            if let Some(unique) = column.unique_values {
                output.push_str(&format!(", {} unique", unique));
            }
            output.push('\n');
        }

        if self.row_count() > 0 {
            let sample_size = 5.min(self.row_count());
            output.push_str(&format!("\nFirst {} rows:\n", sample_size));

            for row in self.rows.iter().take(sample_size) {
                output.push_str(&format!("  [{}]: ", row.label));
                for (col_idx, value) in row.values.iter().enumerate() {
                    if col_idx > 0 {
                        output.push_str(", ");
                    }
                    output.push_str(&value.to_string());
                }
                output.push('\n');
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(label: &str, fields: JsonValue) -> NormalizedRecord {
        NormalizedRecord {
            label: label.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_json_value_conversion() {
        assert_eq!(DataValue::from(&json!(12)), DataValue::Integer(12));
        assert_eq!(DataValue::from(&json!(1.5)), DataValue::Float(1.5));
        assert_eq!(DataValue::from(&json!(true)), DataValue::Boolean(true));
        assert_eq!(DataValue::from(&json!(null)), DataValue::Null);
        assert_eq!(
            DataValue::from(&json!("2020-05-01")),
            DataValue::DateTime("2020-05-01".to_string())
        );
        assert_eq!(
            DataValue::from(&json!("2019-12-11T01:25:38Z")),
            DataValue::DateTime("2019-12-11T01:25:38Z".to_string())
        );
        // Dashes alone don't make a date
        assert_eq!(
            DataValue::from(&json!("madly-rad-labs")),
            DataValue::String("madly-rad-labs".to_string())
        );
        assert_eq!(
            DataValue::from(&json!(["a", "b"])),
            DataValue::Json("[\"a\",\"b\"]".to_string())
        );
    }

    #[test]
    fn test_from_records_fixed_columns() {
        let columns = vec!["city".to_string(), "employees".to_string()];
        let records = vec![
            record("Acme", json!({"city": "Austin", "employees": 10})),
            record("Globex", json!({"city": "Springfield"})),
            record("Initech", json!({"city": "Dallas", "employees": 2.5, "extra": "x"})),
        ];

        let table = DataTable::from_records("organizations", &columns, records);

        assert_eq!(table.column_names(), columns);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.labels(), vec!["Acme", "Globex", "Initech"]);
        assert_eq!(table.get_value_by_name(1, "employees"), Some(&DataValue::Null));
        assert!(table.get_column("extra").is_none());

        let employees = table.get_column("employees").unwrap();
        assert_eq!(employees.data_type, DataType::Float);
        assert_eq!(employees.null_count, 1);
        assert!(employees.nullable);
    }

    #[test]
    fn test_duplicate_labels_are_kept() {
        let columns = vec!["city".to_string()];
        let records = vec![
            record("Acme", json!({"city": "Austin"})),
            record("Acme", json!({"city": "Boston"})),
        ];

        let table = DataTable::from_records("organizations", &columns, records);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows_labelled("Acme"), vec![0, 1]);
    }

    #[test]
    fn test_large_unsigned_numbers_keep_every_digit() {
        let value = DataValue::from(&json!(18_446_744_073_709_551_615u64));
        assert_eq!(value, DataValue::String("18446744073709551615".to_string()));

        let just_over = DataValue::from(&json!(9_223_372_036_854_775_809u64));
        assert_eq!(just_over.to_string(), "9223372036854775809");

        assert_eq!(DataValue::from(&json!(i64::MAX)), DataValue::Integer(i64::MAX));
        assert_eq!(DataValue::from(&json!(-3)), DataValue::Integer(-3));
        assert_eq!(DataValue::from(&json!(2.5)), DataValue::Float(2.5));
    }

    #[test]
    fn test_string_table_and_dump() {
        let columns = vec!["city".to_string()];
        let mut table =
            DataTable::from_records("orgs", &columns, vec![record("Acme", json!({"city": "Austin"}))]);
        table
            .metadata
            .insert("entity".to_string(), "organizations".to_string());

        assert_eq!(
            table.to_string_table(),
            vec![vec!["Acme".to_string(), "Austin".to_string()]]
        );

        let dump = table.debug_dump();
        assert!(dump.contains("Rows: 1 | Columns: 1"));
        assert!(dump.contains("entity: organizations"));
        assert!(dump.contains("[Acme]: Austin"));
    }

    #[test]
    fn test_to_json_round_trip_of_nested() {
        let value = DataValue::from(&json!({"value": 5}));
        assert_eq!(value.to_json(), json!({"value": 5}));
        assert_eq!(DataValue::Null.to_json(), JsonValue::Null);
    }
}
