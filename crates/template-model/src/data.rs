//! Tabular records and variable-to-column mappings.
//!
//! How a table is obtained (spreadsheet, CSV, remote sheet) is up to the
//! caller; this module only defines the shape and a JSON loader.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::normalize_variable_name;
use crate::store::TemplateError;

/// One record: column name to cell value.
pub type DataRow = BTreeMap<String, String>;

/// Ordered columns plus rows of string cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<DataRow>,
}

impl DataTable {
    pub fn new(columns: Vec<String>, rows: Vec<DataRow>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Parse a table from JSON.
    ///
    /// Accepts either `{"columns": [...], "rows": [{...}]}` or a bare array of
    /// row objects, in which case columns are collected from the rows in key
    /// order. Numbers and booleans become strings; `null` cells are
    /// treated as missing.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawTable {
            WithColumns {
                #[serde(default)]
                columns: Vec<String>,
                rows: Vec<BTreeMap<String, serde_json::Value>>,
            },
            Rows(Vec<serde_json::Map<String, serde_json::Value>>),
        }

        let (mut columns, rows) = match serde_json::from_str::<RawTable>(json)? {
            RawTable::WithColumns { columns, rows } => (
                columns,
                rows.into_iter()
                    .map(|row| row.into_iter().collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
            ),
            RawTable::Rows(rows) => (
                Vec::new(),
                rows.into_iter()
                    .map(|row| row.into_iter().collect::<Vec<_>>())
                    .collect(),
            ),
        };

        let mut table_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = DataRow::new();
            for (column, value) in row {
                if !columns.contains(&column) {
                    columns.push(column.clone());
                }
                let cell = match value {
                    serde_json::Value::Null => continue,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                cells.insert(column, cell);
            }
            table_rows.push(cells);
        }

        Ok(Self {
            columns,
            rows: table_rows,
        })
    }

    /// Load a JSON table from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TemplateError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&content).map_err(|e| TemplateError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Declared variable name to data column.
///
/// Variables without an entry keep their tokens unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableMapping(BTreeMap<String, String>);

impl VariableMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, variable: impl Into<String>, column: impl Into<String>) {
        self.0.insert(variable.into(), column.into());
    }

    pub fn unset(&mut self, variable: &str) {
        self.0.remove(variable);
    }

    pub fn column_for(&self, variable: &str) -> Option<&str> {
        self.0.get(variable).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a `variable=Column Name` assignment.
    pub fn parse_assignment(assignment: &str) -> Option<(String, String)> {
        let (variable, column) = assignment.split_once('=')?;
        let variable = variable.trim();
        let column = column.trim();
        if variable.is_empty() || column.is_empty() {
            return None;
        }
        Some((variable.to_string(), column.to_string()))
    }

    /// Guess a mapping by matching normalised variable and column names.
    ///
    /// An exact match wins; otherwise the first column whose normalised name
    /// contains the variable name is used.
    pub fn auto(variables: &[String], columns: &[String]) -> Self {
        let normalized: Vec<(String, &String)> = columns
            .iter()
            .map(|c| (normalize_variable_name(c), c))
            .collect();

        let mut mapping = Self::new();
        for variable in variables {
            let exact = normalized.iter().find(|(n, _)| n == variable);
            let partial = || normalized.iter().find(|(n, _)| n.contains(variable.as_str()));
            if let Some((_, column)) = exact.or_else(partial) {
                mapping.set(variable.clone(), (*column).clone());
            }
        }
        mapping
    }
}

impl<V: Into<String>, C: Into<String>> FromIterator<(V, C)> for VariableMapping {
    fn from_iter<I: IntoIterator<Item = (V, C)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (variable, column) in iter {
            mapping.set(variable, column);
        }
        mapping
    }
}
