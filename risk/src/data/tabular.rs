//! Named numeric columns read from CSV or JSON
//!
//! JSON documents may be either an array of records
//! (`[{"Close": 1.0}, ...]`) or an object of columns
//! (`{"Close": [1.0, ...]}`). Missing values (`null`, empty cells) are
//! kept as `None` and dropped when a column is read.

use crate::error::{ProviderError, Result, VarError};
use crate::returns::{simple_returns, ReturnSeries};
use indexmap::IndexMap;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Column used to derive returns when no return column is present
pub const CLOSE_COLUMN: &str = "Close";

/// Columnar table of optional numbers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularData {
    columns: IndexMap<String, Vec<Option<f64>>>,
}

impl TabularData {
    pub fn from_columns(columns: IndexMap<String, Vec<Option<f64>>>) -> Self {
        Self { columns }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let reader = csv::Reader::from_path(path.as_ref()).map_err(ProviderError::from)?;
        Self::read_csv(reader)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        Self::read_csv(csv::Reader::from_reader(reader))
    }

    fn read_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers = reader.headers().map_err(ProviderError::from)?.clone();
        let mut raw: IndexMap<String, Vec<String>> = headers
            .iter()
            .map(|h| (h.trim().to_string(), Vec::new()))
            .collect();

        for record in reader.records() {
            let record = record.map_err(ProviderError::from)?;
            for (column, cell) in raw.values_mut().zip(record.iter()) {
                column.push(cell.trim().to_string());
            }
        }

        // Non-numeric columns (dates, symbols) are kept out of the table
        let columns = raw
            .into_iter()
            .filter_map(|(name, cells)| parse_cells(&cells).map(|values| (name, values)))
            .collect();

        Ok(Self { columns })
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self> {
        let mut columns: IndexMap<String, Vec<Option<f64>>> = IndexMap::new();

        match value {
            Value::Array(records) => {
                for (row, record) in records.iter().enumerate() {
                    let fields = record.as_object().ok_or_else(|| json_error("record", "expected an object"))?;
                    for (name, field) in fields {
                        let cell = json_number(field, name)?;
                        let column = columns
                            .entry(name.clone())
                            .or_insert_with(|| vec![None; row]);
                        column.push(cell);
                    }
                    for column in columns.values_mut() {
                        column.resize(row + 1, None);
                    }
                }
            }
            Value::Object(fields) => {
                for (name, field) in fields {
                    let cells = field
                        .as_array()
                        .ok_or_else(|| json_error(name, "expected an array of numbers"))?;
                    let values = cells
                        .iter()
                        .map(|cell| json_number(cell, name))
                        .collect::<Result<Vec<_>>>()?;
                    columns.insert(name.clone(), values);
                }
            }
            _ => return Err(json_error("document", "expected an array of records or an object of columns")),
        }

        Ok(Self { columns })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Values of `name` with missing entries dropped
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| ProviderError::MissingColumn(name.to_string()))?;
        Ok(column.iter().flatten().copied().collect())
    }

    /// Returns from `column`, or simple returns of the `Close` column when
    /// `column` is absent
    pub fn returns_or_close(&self, column: &str) -> Result<ReturnSeries> {
        if self.has_column(column) {
            return Ok(ReturnSeries::new(self.column(column)?));
        }
        if self.has_column(CLOSE_COLUMN) {
            tracing::debug!(column, "deriving returns from close prices");
            return simple_returns(&self.column(CLOSE_COLUMN)?);
        }
        Err(VarError::InvalidParameter(format!(
            "Column '{}' not found and no '{}' column to calculate returns",
            column, CLOSE_COLUMN
        )))
    }
}

/// All cells numeric or empty, otherwise None
fn parse_cells(cells: &[String]) -> Option<Vec<Option<f64>>> {
    cells
        .iter()
        .map(|cell| {
            if cell.is_empty() {
                Some(None)
            } else {
                cell.parse::<f64>().ok().map(Some)
            }
        })
        .collect()
}

fn json_number(value: &Value, column: &str) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        _ => Err(json_error(column, "expected a number or null")),
    }
}

fn json_error(context: &str, message: &str) -> VarError {
    ProviderError::Parse {
        context: context.to_string(),
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_csv_columns() {
        let csv = "Date,Close,Volume\n2024-01-02,100,10\n2024-01-03,,12\n2024-01-04,110,9\n";
        let table = TabularData::from_csv_reader(csv.as_bytes()).unwrap();

        assert!(!table.has_column("Date"));
        assert_eq!(table.column("Close").unwrap(), vec![100.0, 110.0]);
        assert_eq!(table.column("Volume").unwrap().len(), 3);
    }

    #[test]
    fn test_returns_from_close() {
        let csv = "Close\n100\n110\n99\n";
        let table = TabularData::from_csv_reader(csv.as_bytes()).unwrap();
        let returns = table.returns_or_close("Returns").unwrap();
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_explicit_return_column_wins() {
        let json = r#"{"Returns": [0.01, null, -0.02], "Close": [1.0, 2.0, 3.0]}"#;
        let table = TabularData::from_json_str(json).unwrap();
        let returns = table.returns_or_close("Returns").unwrap();
        assert_eq!(returns.into_inner(), vec![0.01, -0.02]);
    }

    #[test]
    fn test_json_records() {
        let json = r#"[{"Close": 100.0}, {"Close": 105.0, "Open": 101.0}, {"Close": null}]"#;
        let table = TabularData::from_json_str(json).unwrap();
        assert_eq!(table.column("Close").unwrap(), vec![100.0, 105.0]);
        assert_eq!(table.column("Open").unwrap(), vec![101.0]);
    }

    #[test]
    fn test_missing_columns() {
        let table = TabularData::from_json_str(r#"{"Open": [1.0, 2.0]}"#).unwrap();
        let err = table.returns_or_close("Returns").unwrap_err();
        assert!(err.to_string().contains("no 'Close' column"));
        assert!(matches!(
            table.column("Close"),
            Err(VarError::Provider(ProviderError::MissingColumn(_)))
        ));
    }

    #[test]
    fn test_non_numeric_json_is_parse_error() {
        let err = TabularData::from_json_str(r#"{"Close": ["a"]}"#).unwrap_err();
        assert!(matches!(err, VarError::Provider(ProviderError::Parse { .. })));
    }

    #[test]
    fn test_from_files() {
        let mut csv_file = tempfile::NamedTempFile::new().unwrap();
        csv_file.write_all(b"Close\n1\n2\n").unwrap();
        assert!(TabularData::from_csv_path(csv_file.path()).unwrap().has_column("Close"));

        let mut json_file = tempfile::NamedTempFile::new().unwrap();
        json_file.write_all(br#"{"Close": [1, 2]}"#).unwrap();
        let table = TabularData::from_json_path(json_file.path()).unwrap();
        assert_eq!(table.column("Close").unwrap(), vec![1.0, 2.0]);
    }
}
