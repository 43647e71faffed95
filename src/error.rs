//! Error types for sheetflow.
//!
//! The engine reports three kinds of problems, each as an explicit value rather
//! than by unwinding:
//!
//! - [`ValidationError`]: a structural problem found from the schema alone (unknown
//!   column, operator incompatible with a column's type). Raised before `apply`.
//! - [`ApplicationError`]: a problem found while processing actual values (for
//!   example a new column colliding with an existing one). Stops the pipeline.
//! - [`CatalogError`]: an unknown operation name or a malformed parameter set,
//!   raised before any operation object exists.
//!
//! Row-level anomalies are not errors at all; see
//! [`RowWarning`](crate::operations::RowWarning).
//!
//! [`SheetflowError`] wraps everything else the crate touches (I/O, `Polars`,
//! configuration) for the adapters around the engine:
//!
//! ```no_run
//! use sheetflow::error::{Result, ResultExt as _};
//! use std::fs;
//!
//! fn read_spec(path: &str) -> Result<String> {
//!     fs::read_to_string(path).context("Failed to read pipeline spec")
//! }
//! ```

use crate::table::TableError;
use serde::Serialize;
use std::fmt;

/// A structural problem with a step, detected without reading row data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Zero-based pipeline step, when the error came from a pipeline.
    pub step: Option<usize>,
    pub operation: String,
    pub column: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: None,
            operation: operation.into(),
            column: None,
            message: message.into(),
        }
    }

    /// Error about a specific column.
    pub fn column(
        operation: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::new(operation, message)
        }
    }

    /// Error for a column that is not in the schema.
    pub fn missing_column(operation: impl Into<String>, column: &str) -> Self {
        Self::column(
            operation,
            column,
            format!("column '{column}' does not exist"),
        )
    }

    #[must_use]
    pub fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(idx) = self.step {
            write!(f, "Step {} ({}): {}", idx + 1, self.operation, self.message)
        } else {
            write!(f, "{}: {}", self.operation, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A runtime failure while applying an operation to concrete values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationError {
    pub operation: String,
    pub message: String,
}

impl ApplicationError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Wraps a table invariant violation raised while building the output.
    pub fn from_table(operation: impl Into<String>, err: &TableError) -> Self {
        Self::new(operation, err.to_string())
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for ApplicationError {}

/// Failure to construct an operation (or pipeline) from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No operation is registered under this name.
    UnknownOperation { name: String },

    /// The parameter set does not match the operation's declared schema.
    InvalidParameters {
        operation: String,
        problems: Vec<String>,
    },

    /// A pipeline spec document has a version this build does not understand.
    UnsupportedVersion {
        found: String,
        expected: &'static str,
    },

    /// A pipeline spec step could not be constructed.
    Step {
        index: usize,
        source: Box<CatalogError>,
    },
}

impl CatalogError {
    pub fn invalid(operation: impl Into<String>, problems: Vec<String>) -> Self {
        Self::InvalidParameters {
            operation: operation.into(),
            problems,
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOperation { name } => write!(f, "Unknown operation: {name}"),
            Self::InvalidParameters {
                operation,
                problems,
            } => write!(
                f,
                "Invalid parameters for {operation}: {}",
                problems.join("; ")
            ),
            Self::UnsupportedVersion { found, expected } => write!(
                f,
                "Unsupported pipeline spec version '{found}', expected '{expected}'"
            ),
            Self::Step { index, source } => write!(f, "Step {}: {source}", index + 1),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Step { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Error type for the adapters around the engine.
#[derive(Debug)]
pub enum SheetflowError {
    /// I/O errors (file operations)
    Io(std::io::Error),

    /// Data frame errors raised by `Polars`
    DataProcessing(String),

    /// Table invariant violations
    Table(TableError),

    /// Operation construction errors
    Catalog(CatalogError),

    /// Configuration and spec document errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for SheetflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Table(e) => write!(f, "Table error: {e}"),
            Self::Catalog(e) => write!(f, "Catalog error: {e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SheetflowError {}

impl From<std::io::Error> for SheetflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for SheetflowError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for SheetflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for SheetflowError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<TableError> for SheetflowError {
    fn from(err: TableError) -> Self {
        Self::Table(err)
    }
}

impl From<CatalogError> for SheetflowError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

/// Result type alias for sheetflow adapters.
pub type Result<T> = std::result::Result<T, SheetflowError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SheetflowError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: SheetflowError = e.into();
            SheetflowError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: SheetflowError = e.into();
            SheetflowError::Other(format!("{}: {}", f(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SheetflowError::DataProcessing("column not found".to_owned());
        assert_eq!(err.to_string(), "Data processing error: column not found");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::missing_column("filter_rows", "age").at_step(1);
        assert_eq!(
            err.to_string(),
            "Step 2 (filter_rows): column 'age' does not exist"
        );
        assert_eq!(err.column.as_deref(), Some("age"));
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::Step {
            index: 0,
            source: Box::new(CatalogError::UnknownOperation {
                name: "explode".to_owned(),
            }),
        };
        assert_eq!(err.to_string(), "Step 1: Unknown operation: explode");
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.csv",
        ));

        let result: Result<()> = result.context("Failed to read file");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read file")
        );
    }
}
