//! Run reports.
//!
//! A [`RunReport`] is created once per [`Pipeline::run`](super::Pipeline::run) or
//! [`Pipeline::preview`](super::Pipeline::preview) call and never changes after it is
//! returned.

use crate::error::{ApplicationError, ValidationError};
use crate::operations::RowWarning;
use crate::table::Table;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step ran and no row warnings were recorded.
    Success,
    /// Every step ran, with at least one row warning.
    PartialFailure,
    /// A step failed validation or application; later steps did not run.
    Failure,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::PartialFailure => "partial failure",
            Self::Failure => "failure",
        })
    }
}

/// Why a step stopped the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    Validation { errors: Vec<ValidationError> },
    Application { error: ApplicationError },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { errors } => {
                let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
                write!(f, "validation failed: {}", messages.join("; "))
            }
            Self::Application { error } => write!(f, "{}", error.message),
        }
    }
}

/// Log entry for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepLog {
    /// Zero-based position in the pipeline
    pub index: usize,
    pub operation: String,
    pub description: String,
    pub rows_before: usize,
    pub columns_before: usize,
    /// Equal to the `before` counts when the step failed
    pub rows_after: usize,
    pub columns_after: usize,
    pub message: String,
    pub warnings: Vec<RowWarning>,
    /// Warnings beyond the configured per-step cap, counted but not kept
    pub warnings_suppressed: usize,
    pub error: Option<StepError>,
}

impl StepLog {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Total warnings raised by the step, including suppressed ones.
    pub fn warning_count(&self) -> usize {
        self.warnings.len() + self.warnings_suppressed
    }
}

impl fmt::Display for StepLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} ({}): ", self.index + 1, self.operation)?;
        match &self.error {
            Some(error) => write!(f, "FAILED, {error}"),
            None => {
                write!(
                    f,
                    "{} [{} → {} rows, {} → {} columns]",
                    self.message,
                    self.rows_before,
                    self.rows_after,
                    self.columns_before,
                    self.columns_after
                )?;
                match self.warning_count() {
                    0 => Ok(()),
                    1 => write!(f, ", 1 warning"),
                    n => write!(f, ", {n} warnings"),
                }
            }
        }
    }
}

/// Outcome of a pipeline invocation.
///
/// Equality ignores [`RunReport::duration`], so two runs of the same pipeline on the
/// same table compare equal.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    status: RunStatus,
    #[serde(skip)]
    table: Table,
    steps: Vec<StepLog>,
    rows_before: usize,
    columns_before: usize,
    /// Row count of the final table before any preview truncation
    total_rows: usize,
    preview_limit: Option<usize>,
    #[serde(skip)]
    duration: Duration,
}

impl PartialEq for RunReport {
    fn eq(&self, other: &Self) -> bool {
        let Self {
            status,
            table,
            steps,
            rows_before,
            columns_before,
            total_rows,
            preview_limit,
            duration: _,
        } = self;
        *status == other.status
            && *table == other.table
            && *steps == other.steps
            && *rows_before == other.rows_before
            && *columns_before == other.columns_before
            && *total_rows == other.total_rows
            && *preview_limit == other.preview_limit
    }
}

impl Eq for RunReport {}

impl RunReport {
    pub(crate) fn new(
        input: &Table,
        table: Table,
        steps: Vec<StepLog>,
        duration: Duration,
    ) -> Self {
        let status = if steps.iter().any(|s| !s.succeeded()) {
            RunStatus::Failure
        } else if steps.iter().any(|s| s.warning_count() > 0) {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        };
        Self {
            status,
            total_rows: table.row_count(),
            table,
            steps,
            rows_before: input.row_count(),
            columns_before: input.column_count(),
            preview_limit: None,
            duration,
        }
    }

    /// Truncates the table to its first `limit` rows.
    pub(crate) fn truncated(mut self, limit: usize) -> Self {
        self.table = self.table.head(limit);
        self.preview_limit = Some(limit);
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// The finished table, unless a step failed.
    pub fn output(&self) -> Option<&Table> {
        (self.status != RunStatus::Failure).then_some(&self.table)
    }

    /// Best-known table: the output, or after a failure, the last table a step
    /// produced successfully (the input when the first step failed).
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn steps(&self) -> &[StepLog] {
        &self.steps
    }

    /// The entry of the step that stopped the run.
    pub fn failed_step(&self) -> Option<&StepLog> {
        self.steps.iter().find(|s| !s.succeeded())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RowWarning> {
        self.steps.iter().flat_map(|s| &s.warnings)
    }

    pub fn warning_count(&self) -> usize {
        self.steps.iter().map(StepLog::warning_count).sum()
    }

    pub fn rows_before(&self) -> usize {
        self.rows_before
    }

    pub fn columns_before(&self) -> usize {
        self.columns_before
    }

    /// Row count of the final table, ignoring any preview truncation.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn preview_limit(&self) -> Option<usize> {
        self.preview_limit
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Steps that completed.
    pub fn steps_applied(&self) -> usize {
        self.steps.iter().filter(|s| s.succeeded()).count()
    }

    /// Create a summary message
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Pipeline {}: {} of {} steps applied, {} → {} rows, {} → {} columns",
            self.status,
            self.steps_applied(),
            self.steps.len(),
            self.rows_before,
            self.total_rows,
            self.columns_before,
            self.table.column_count(),
        );
        match self.warning_count() {
            0 => {}
            1 => summary.push_str(", 1 warning"),
            n => summary.push_str(&format!(", {n} warnings")),
        }
        if let Some(failed) = self.failed_step()
            && let Some(error) = &failed.error
        {
            summary.push_str(&format!(
                "; step {} ({}) failed: {error}",
                failed.index + 1,
                failed.operation
            ));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn log(index: usize, warnings: usize, error: Option<StepError>) -> StepLog {
        StepLog {
            index,
            operation: "demo".to_owned(),
            description: "Demo".to_owned(),
            rows_before: 2,
            columns_before: 1,
            rows_after: 2,
            columns_after: 1,
            message: "did nothing".to_owned(),
            warnings: (0..warnings)
                .map(|row| RowWarning::new(row, "a", "odd value"))
                .collect(),
            warnings_suppressed: 0,
            error,
        }
    }

    fn table() -> Table {
        Table::from_rows(&["a"], vec![vec![Value::from(1)], vec![Value::from(2)]]).unwrap()
    }

    #[test]
    fn test_status_derivation() {
        let ok = RunReport::new(&table(), table(), vec![log(0, 0, None)], Duration::ZERO);
        assert_eq!(ok.status(), RunStatus::Success);
        assert!(ok.output().is_some());

        let partial = RunReport::new(&table(), table(), vec![log(0, 2, None)], Duration::ZERO);
        assert_eq!(partial.status(), RunStatus::PartialFailure);
        assert_eq!(partial.warnings().count(), 2);

        let failed = RunReport::new(
            &table(),
            table(),
            vec![
                log(0, 0, None),
                log(
                    1,
                    0,
                    Some(StepError::Application {
                        error: ApplicationError::new("demo", "boom"),
                    }),
                ),
            ],
            Duration::ZERO,
        );
        assert_eq!(failed.status(), RunStatus::Failure);
        assert!(failed.output().is_none());
        assert_eq!(failed.table(), &table());
        assert_eq!(failed.failed_step().map(|s| s.index), Some(1));
        assert!(failed.summary().contains("step 2 (demo) failed: boom"));
    }

    #[test]
    fn test_truncation_keeps_total() {
        let report =
            RunReport::new(&table(), table(), vec![log(0, 0, None)], Duration::ZERO).truncated(1);
        assert_eq!(report.table().row_count(), 1);
        assert_eq!(report.total_rows(), 2);
        assert_eq!(report.preview_limit(), Some(1));
    }

    #[test]
    fn test_equality_ignores_duration() {
        let fast = RunReport::new(&table(), table(), vec![log(0, 1, None)], Duration::ZERO);
        let slow = RunReport::new(
            &table(),
            table(),
            vec![log(0, 1, None)],
            Duration::from_millis(250),
        );
        assert_eq!(fast, slow);
        assert_ne!(fast, slow.clone().truncated(1));
    }

    #[test]
    fn test_step_log_display() {
        assert_eq!(
            log(0, 1, None).to_string(),
            "Step 1 (demo): did nothing [2 → 2 rows, 1 → 1 columns], 1 warning"
        );
    }

    #[test]
    fn test_report_serializes_without_table() {
        let report = RunReport::new(&table(), table(), vec![log(0, 0, None)], Duration::ZERO);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("table").is_none());
        assert_eq!(json["steps"][0]["operation"], "demo");
    }
}
