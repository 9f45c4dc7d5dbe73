//! In-memory table model for query results.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a table is addressed by a column it does not have,
/// or a numeric operation meets a non-numeric cell.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column not found: {0}")]
    UnknownColumn(String),
    #[error("column {column} holds a non-numeric value: {value}")]
    NonNumeric { column: String, value: String },
}

/// A single cell of a result set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Value {
    /// Numeric view of the cell. Booleans count as 0/1, text and null have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Text(_) | Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Label used to match a cell against a category name given by the caller
    pub fn label(&self) -> String {
        self.to_string()
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

// Total order used for grouping and sorting: null < bool < number < text.
// Integers and floats compare numerically.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (a, b) if a.rank() == 2 && b.rank() == 2 => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            // Debug keeps the trailing ".0" on whole floats
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// A labeled 2-D table: column names plus rows of cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table. Rows shorter than the header are padded with nulls.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    /// Iterate the cells of one column
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, TableError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Distinct non-null values of a column in first-seen order
    pub fn unique(&self, name: &str) -> Result<Vec<Value>, TableError> {
        let mut seen: Vec<Value> = Vec::new();
        for value in self.column(name)? {
            if !value.is_null() && !seen.contains(value) {
                seen.push(value.clone());
            }
        }
        Ok(seen)
    }

    /// Distinct category labels of a column in first-seen order.
    ///
    /// Categories are matched by label, so cells that print alike, such as
    /// `Text("1")` and `Int(1)` in a loosely typed SQLite column, form one
    /// category.
    pub fn labels(&self, name: &str) -> Result<Vec<String>, TableError> {
        Ok(dedup_labels(self.unique(name)?.iter()))
    }

    /// Numeric values of `value` on rows where `var` matches `category`.
    /// Null cells are skipped.
    pub fn numeric_where(
        &self,
        var: &str,
        category: &str,
        value: &str,
    ) -> Result<Vec<f64>, TableError> {
        let var_idx = self.column_index(var)?;
        let value_idx = self.column_index(value)?;
        let mut out = Vec::new();
        for row in self.rows.iter().filter(|row| row[var_idx].label() == category) {
            let cell = &row[value_idx];
            if cell.is_null() {
                continue;
            }
            let v = numeric_cell(value, cell)?;
            out.push(v);
        }
        Ok(out)
    }

    /// Whether a column holds at least one number and nothing but numbers
    /// and nulls
    pub fn is_numeric(&self, name: &str) -> bool {
        let Ok(cells) = self.column(name) else {
            return false;
        };
        let mut any = false;
        for cell in cells {
            match cell {
                Value::Int(_) | Value::Float(_) => any = true,
                Value::Null => {}
                _ => return false,
            }
        }
        any
    }

    /// First `n` rows as a printable preview
    pub fn head(&self, n: usize) -> TablePreview<'_> {
        TablePreview {
            table: self,
            rows: n.min(self.rows.len()),
        }
    }
}

/// Labels of `values` in order, keeping the first of each repeated label
pub(crate) fn dedup_labels<'v>(values: impl Iterator<Item = &'v Value>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in values.map(Value::label) {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

pub(crate) fn numeric_cell(column: &str, cell: &Value) -> Result<f64, TableError> {
    match cell {
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(cell.as_f64().unwrap_or(f64::NAN)),
        other => Err(TableError::NonNumeric {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Row-indexed, right-aligned rendering of the leading rows of a table
pub struct TablePreview<'a> {
    table: &'a Table,
    rows: usize,
}

impl fmt::Display for TablePreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self.table.rows[..self.rows]
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();

        let index_width = self.rows.saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .table
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (name, width) in self.table.columns.iter().zip(&widths) {
            write!(f, "  {name:>width$}")?;
        }
        for (i, row) in cells.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{i:<index_width$}")?;
            for (cell, width) in row.iter().zip(&widths) {
                write!(f, "  {cell:>width$}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_table() -> Table {
    let rows = [
        ("ctrl", 1.0),
        ("ctrl", 2.0),
        ("ctrl", 3.0),
        ("drug", 4.0),
        ("drug", 6.0),
        ("drug", 5.0),
        ("vehicle", 2.5),
        ("vehicle", 3.5),
    ];
    Table::new(
        vec!["group".to_string(), "score".to_string()],
        rows.iter()
            .map(|(g, s)| vec![Value::from(*g), Value::from(*s)])
            .collect(),
    )
}
