//! The operation contract and the built-in operations.
//!
//! Every transformation implements [`Operation`]:
//!
//! - [`Operation::validate`] checks parameters against a [`Schema`] (column names and
//!   inferred types) without reading data,
//! - [`Operation::apply`] builds a new [`Table`] from a concrete one, or fails with an
//!   [`ApplicationError`].
//!
//! Operations hold only their parameters, so applying the same operation to the same
//! table always gives the same result.
//!
//! # Operations
//!
//! - **Rows**: [`RemoveDuplicates`], [`FilterRows`]
//! - **Values**: [`ReplaceValues`], [`NormalizeText`], [`ConvertDateFormat`]
//! - **Columns**: [`MergeColumns`], [`DropColumns`], [`RenameColumns`]
//! - **Arithmetic**: [`ColumnArithmetic`] (add/subtract/multiply/divide), [`PercentageChange`]
//! - **Reduction**: [`Aggregate`]
//! - **Derived values**: [`ConditionalCalculation`]
//!
//! Operations are normally built through the [`Catalog`](crate::catalog::Catalog), which
//! checks parameter sets before any operation exists.

pub mod aggregate;
pub mod arithmetic;
pub mod columns;
pub mod condition;
pub mod conditional;
pub mod dates;
pub mod rows;
pub mod values;

pub use aggregate::{Aggregate, AggregateFunction};
pub use arithmetic::{ArithmeticKind, ColumnArithmetic, PercentageChange};
pub use columns::{DropColumns, MergeColumns, RenameColumns};
pub use condition::{Condition, Operator};
pub use conditional::{ColumnRef, ConditionalCalculation, Operand};
pub use dates::ConvertDateFormat;
pub use rows::{FilterRows, Keep, RemoveDuplicates};
pub use values::{NormalizeText, ReplaceValues, TextMethod};

use crate::error::{ApplicationError, ValidationError};
use crate::table::{Schema, Table, ValueType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Parameter set of an operation: a JSON object.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// A per-cell anomaly that did not stop the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    /// Zero-based row index in the operation's input table.
    pub row: usize,
    pub column: String,
    pub message: String,
}

impl RowWarning {
    pub fn new(row: usize, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            column: column.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, column '{}': {}", self.row, self.column, self.message)
    }
}

/// Successful outcome of [`Operation::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub table: Table,
    /// Short diagnostic, e.g. "2 duplicate rows removed".
    pub message: String,
    pub warnings: Vec<RowWarning>,
}

impl Applied {
    pub fn new(table: Table, message: impl Into<String>) -> Self {
        Self {
            table,
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<RowWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// A named, parameterized, validated transformation from table to table.
pub trait Operation: fmt::Debug + Send + Sync {
    /// Catalog name of this operation.
    fn name(&self) -> &'static str;

    /// Parameters in the shape the catalog accepts.
    fn parameters(&self) -> Params;

    /// One-line human summary.
    fn describe(&self) -> String;

    /// Structural checks against a schema. Empty means valid.
    fn validate(&self, schema: &Schema) -> Vec<ValidationError>;

    /// Schema this step produces from `schema`, assuming it validated.
    fn output_schema(&self, schema: &Schema) -> Schema;

    /// Produces a new table. The input is never modified.
    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError>;
}

/// Deserializes a parameter set into an operation's parameter struct.
pub(crate) fn decode<T: DeserializeOwned>(params: &Params) -> Result<T, Vec<String>> {
    serde_json::from_value(serde_json::Value::Object(params.clone())).map_err(|e| vec![e.to_string()])
}

/// Serializes an operation's parameter struct back into a parameter set.
pub(crate) fn encode<T: Serialize>(value: &T) -> Params {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Params::new(),
    }
}

/// "1 row", "3 rows".
pub(crate) fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Records an error when `column` is missing, returning its type otherwise.
pub(crate) fn check_column(
    operation: &str,
    schema: &Schema,
    column: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<ValueType> {
    let ty = schema.value_type(column);
    if ty.is_none() {
        errors.push(ValidationError::missing_column(operation, column));
    }
    ty
}

/// Records an error when `column` is missing or not numeric.
pub(crate) fn check_numeric_column(
    operation: &str,
    schema: &Schema,
    column: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(ty) = check_column(operation, schema, column, errors)
        && !ty.is_numeric()
    {
        errors.push(ValidationError::column(
            operation,
            column,
            format!("column '{column}' must be numeric, found {ty}"),
        ));
    }
}

/// Rejects a column name that would collide with an existing column.
pub(crate) fn ensure_new_column(
    operation: &str,
    table: &Table,
    name: &str,
) -> Result<(), ApplicationError> {
    if table.contains_column(name) {
        return Err(ApplicationError::new(
            operation,
            format!("column '{name}' already exists"),
        ));
    }
    Ok(())
}
