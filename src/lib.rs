//! # sheetflow
//!
//! A catalog of tabular transformation operations and a pipeline engine that
//! previews or commits them.
//!
//! ## Quick Start
//!
//! ```
//! use sheetflow::operations::{ColumnArithmetic, Condition, FilterRows, Operator};
//! use sheetflow::pipeline::{Pipeline, RunStatus};
//! use sheetflow::table::{Table, Value};
//!
//! let table = Table::from_rows(
//!     &["price", "cost"],
//!     vec![
//!         vec![Value::from(10), Value::from(2)],
//!         vec![Value::from(5), Value::from(0)],
//!         vec![Value::from(5), Value::from(1)],
//!     ],
//! )?;
//!
//! let pipeline = Pipeline::default()
//!     .then(ColumnArithmetic::divide("price", "cost", "ratio"))
//!     .then(FilterRows::new(Condition::new("price", Operator::GreaterThan, 6)));
//!
//! let report = pipeline.run(&table);
//! assert_eq!(report.status(), RunStatus::PartialFailure); // division by zero in row 1
//! assert_eq!(report.table().row_count(), 1);
//! # Ok::<(), sheetflow::table::TableError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`table`]: the in-memory [`Table`](table::Table), its cells and schema
//! - [`operations`]: the [`Operation`](operations::Operation) contract and built-in operations
//! - [`catalog`]: name-based registry that builds operations from JSON parameters
//! - [`pipeline`]: ordered chains with run, preview, rollback and reports
//! - [`frame`]: polars `DataFrame` and CSV adapters
//! - [`config`], [`logging`], [`error`]: ambient plumbing

#![warn(clippy::all, rust_2018_idioms)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod operations;
pub mod pipeline;
pub mod table;
