//! In-memory table model.
//!
//! A [`Table`] is an ordered list of uniquely named [`Column`]s of equal length.
//! Row identity is position. Tables are values: every operation takes `&Table`
//! and builds a new one, so an intermediate table can be kept around for rollback
//! or preview without copying defensively.
//!
//! ```
//! use sheetflow::table::{Table, Value};
//!
//! let table = Table::from_rows(
//!     &["id", "age"],
//!     vec![
//!         vec![Value::from(1), Value::from(25)],
//!         vec![Value::from(2), Value::from(40)],
//!     ],
//! )?;
//! assert_eq!(table.row_count(), 2);
//! # Ok::<(), sheetflow::table::TableError>(())
//! ```

pub mod schema;
pub mod value;

pub use schema::{Field, Schema, ValueType};
pub use value::Value;

use std::fmt;

/// Errors raised when a table would violate its invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Two columns share a name.
    DuplicateColumn(String),

    /// A column (or row) does not match the table's row count.
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A referenced column does not exist.
    ColumnNotFound(String),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateColumn(name) => write!(f, "column '{name}' already exists"),
            Self::LengthMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "column '{column}' has {found} values, expected {expected}"
            ),
            Self::ColumnNotFound(name) => write!(f, "column '{name}' not found"),
        }
    }
}

impl std::error::Error for TableError {}

/// A named sequence of cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_type(&self) -> ValueType {
        ValueType::infer(&self.values)
    }

    #[must_use]
    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: self.values,
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Immutable tabular value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table, checking that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let rows = columns.first().map_or(0, Column::len);
        for (idx, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: rows,
                    found: column.len(),
                });
            }
            if columns
                .iter()
                .take(idx)
                .any(|other| other.name == column.name)
            {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Builds a table from row-major data.
    pub fn from_rows(names: &[&str], rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut columns: Vec<Vec<Value>> = names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(TableError::LengthMismatch {
                    column: format!("row {row_idx}"),
                    expected: names.len(),
                    found: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        Self::new(
            names
                .iter()
                .zip(columns)
                .map(|(name, values)| Column::new(*name, values))
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`Table::column`] but with an error for the caller to propagate.
    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_owned()))
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column)?.get(row)
    }

    /// Cells of one row, in column order.
    pub fn row(&self, row: usize) -> Option<Vec<&Value>> {
        if row >= self.rows {
            return None;
        }
        self.columns.iter().map(|c| c.get(row)).collect()
    }

    pub fn schema(&self) -> Schema {
        self.columns
            .iter()
            .map(|c| Field::new(c.name.clone(), c.value_type()))
            .collect()
    }

    /// First `limit` rows.
    #[must_use]
    pub fn head(&self, limit: usize) -> Self {
        let rows = self.rows.min(limit);
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values.iter().take(rows).cloned().collect()))
                .collect(),
            rows,
        }
    }

    /// Keeps the rows at `indices`, in the given order. Out-of-range indices are ignored.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let indices: Vec<usize> = indices.iter().copied().filter(|&i| i < self.rows).collect();
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| {
                    Column::new(
                        c.name.clone(),
                        indices.iter().filter_map(|&i| c.get(i).cloned()).collect(),
                    )
                })
                .collect(),
            rows: indices.len(),
        }
    }

    /// Appends a column. Fails when the name is taken or the length is wrong.
    pub fn with_column(&self, column: Column) -> Result<Self, TableError> {
        if self.contains_column(&column.name) {
            return Err(TableError::DuplicateColumn(column.name));
        }
        let mut columns = self.columns.clone();
        columns.push(column);
        Self::new(columns)
    }

    /// Swaps the values of an existing column, keeping its position.
    pub fn replace_column(&self, column: Column) -> Result<Self, TableError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name == column.name)
            .ok_or_else(|| TableError::ColumnNotFound(column.name.clone()))?;
        let mut columns = self.columns.clone();
        if let Some(slot) = columns.get_mut(idx) {
            *slot = column;
        }
        Self::new(columns)
    }

    #[must_use]
    pub fn without_columns(&self, names: &[String]) -> Self {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name))
            .cloned()
            .collect();
        let rows = if columns.is_empty() { 0 } else { self.rows };
        Self { columns, rows }
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            &["id", "name"],
            vec![
                vec![Value::from(1), Value::from("Alice")],
                vec![Value::from(2), Value::from("Bob")],
                vec![Value::from(3), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = Table::new(vec![
            Column::new("a", vec![Value::Null]),
            Column::new("a", vec![Value::Null]),
        ]);
        assert_eq!(result, Err(TableError::DuplicateColumn("a".to_owned())));
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let result = Table::new(vec![
            Column::new("a", vec![Value::Null]),
            Column::new("b", vec![]),
        ]);
        assert!(matches!(result, Err(TableError::LengthMismatch { .. })));
    }

    #[test]
    fn test_schema_inference() {
        let schema = sample().schema();
        assert_eq!(schema.value_type("id"), Some(ValueType::Number));
        assert_eq!(schema.value_type("name"), Some(ValueType::Text));
    }

    #[test]
    fn test_select_rows_and_head() {
        let table = sample();
        let picked = table.select_rows(&[2, 0, 99]);
        assert_eq!(picked.row_count(), 2);
        assert_eq!(picked.value(0, "id"), Some(&Value::from(3)));

        let head = table.head(1);
        assert_eq!(head.row_count(), 1);
        assert_eq!(head.column_count(), 2);
        assert_eq!(table.head(10), table);
    }

    #[test]
    fn test_with_column_collision() {
        let table = sample();
        let err = table
            .with_column(Column::new("name", vec![Value::Null; 3]))
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("name".to_owned()));

        let extended = table
            .with_column(Column::new("flag", vec![Value::from(true); 3]))
            .unwrap();
        assert_eq!(extended.column_names(), vec!["id", "name", "flag"]);
        // The source table is untouched.
        assert_eq!(table.column_count(), 2);
    }
}
