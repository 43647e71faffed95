//! Pipelines: ordered chains of operations with run, preview and rollback.
//!
//! # Overview
//!
//! A [`Pipeline`] owns a list of boxed [`Operation`](crate::operations::Operation)s.
//! [`Pipeline::run`] validates each step against the schema of the table it is about
//! to receive, applies it, and records a [`StepLog`]. The first failing step stops the
//! run and the [`RunReport`] keeps the last table a step produced successfully, so a
//! failed run never loses earlier work.
//!
//! Pipelines are persisted as [`PipelineSpec`] JSON documents and rebuilt through the
//! [`Catalog`](crate::catalog::Catalog).
//!
//! # Example
//!
//! ```
//! use sheetflow::catalog::Catalog;
//! use sheetflow::pipeline::{PipelineSpec, RunStatus};
//! use sheetflow::table::{Table, Value};
//!
//! let spec = PipelineSpec::from_json(r#"{
//!     "version": "1",
//!     "name": "dedupe",
//!     "steps": [{"op": "remove_duplicates", "params": {"columns": ["id"]}}]
//! }"#)?;
//! let pipeline = Catalog::standard().build_pipeline(&spec)?;
//!
//! let table = Table::from_rows(
//!     &["id", "age"],
//!     vec![
//!         vec![Value::from(1), Value::from(25)],
//!         vec![Value::from(2), Value::from(40)],
//!         vec![Value::from(1), Value::from(25)],
//!     ],
//! )?;
//! let report = pipeline.run(&table);
//! assert_eq!(report.status(), RunStatus::Success);
//! assert_eq!(report.steps()[0].message, "1 duplicate row removed");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod executor;
pub mod report;
pub mod spec;
pub mod validation;

pub use executor::Pipeline;
pub use report::{RunReport, RunStatus, StepError, StepLog};
pub use spec::{PipelineSpec, SPEC_VERSION, StepSpec};
pub use validation::check_pipeline;
