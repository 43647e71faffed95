//! Pipeline execution engine.
//!
//! Runs steps in order against an input table. Each step is validated against the
//! schema of the table it is about to receive, then applied. The first failing step
//! ends the run; the report keeps the last table that was produced successfully.

use super::report::{RunReport, StepError, StepLog};
use super::spec::{PipelineSpec, StepSpec};
use super::validation::check_pipeline;
use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::operations::Operation;
use crate::table::{Schema, Table};
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// An ordered, reusable chain of operations.
#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Operation>>,
    config: EngineConfig,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Operation>>) -> Self {
        Self {
            steps,
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Appends a step.
    pub fn push(&mut self, step: impl Operation + 'static) {
        self.steps.push(Box::new(step));
    }

    #[must_use]
    pub fn then(mut self, step: impl Operation + 'static) -> Self {
        self.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Box<dyn Operation>] {
        &self.steps
    }

    /// Validates the whole chain against `schema` without reading data.
    pub fn check(&self, schema: &Schema) -> Vec<ValidationError> {
        check_pipeline(&self.steps, schema)
    }

    /// Captures this pipeline as a spec document.
    pub fn to_spec(&self, name: impl Into<String>) -> PipelineSpec {
        PipelineSpec::new(
            name,
            self.steps
                .iter()
                .map(|step| StepSpec::new(step.name(), step.parameters()))
                .collect(),
        )
    }

    /// Runs every step against `input`. The input is never modified.
    pub fn run(&self, input: &Table) -> RunReport {
        let start = Instant::now();
        info!(
            steps = self.steps.len(),
            rows = input.row_count(),
            columns = input.column_count(),
            "Running pipeline"
        );

        let mut current = Cow::Borrowed(input);
        let mut logs = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let (log, output) = self.run_step(index, step.as_ref(), &current);
            logs.push(log);
            let Some(table) = output else {
                break;
            };
            current = Cow::Owned(table);
        }

        let report = RunReport::new(input, current.into_owned(), logs, start.elapsed());
        info!(
            status = %report.status(),
            duration_ms = report.duration().as_millis(),
            "{}",
            report.summary()
        );
        report
    }

    /// Like [`Pipeline::run`], keeping only the first `limit` rows of the result.
    pub fn preview(&self, input: &Table, limit: usize) -> RunReport {
        self.run(input).truncated(limit)
    }

    /// [`Pipeline::preview`] with the configured row limit.
    pub fn preview_default(&self, input: &Table) -> RunReport {
        self.preview(input, self.config.preview_row_limit)
    }

    fn run_step(
        &self,
        index: usize,
        step: &dyn Operation,
        table: &Table,
    ) -> (StepLog, Option<Table>) {
        let mut log = StepLog {
            index,
            operation: step.name().to_owned(),
            description: step.describe(),
            rows_before: table.row_count(),
            columns_before: table.column_count(),
            rows_after: table.row_count(),
            columns_after: table.column_count(),
            message: String::new(),
            warnings: Vec::new(),
            warnings_suppressed: 0,
            error: None,
        };
        debug!(step = index + 1, operation = step.name(), "{}", log.description);

        let errors: Vec<ValidationError> = step
            .validate(&table.schema())
            .into_iter()
            .map(|e| e.at_step(index))
            .collect();
        if !errors.is_empty() {
            for e in &errors {
                error!("{e}");
            }
            log.message = "validation failed".to_owned();
            log.error = Some(StepError::Validation { errors });
            return (log, None);
        }

        match step.apply(table) {
            Ok(applied) => {
                let mut warnings = applied.warnings;
                let cap = self.config.max_warnings_per_step;
                if warnings.len() > cap {
                    log.warnings_suppressed = warnings.len() - cap;
                    warnings.truncate(cap);
                }
                for warning in &warnings {
                    warn!(step = index + 1, operation = step.name(), "{warning}");
                }
                if log.warnings_suppressed > 0 {
                    warn!(
                        step = index + 1,
                        operation = step.name(),
                        "{} more warnings suppressed",
                        log.warnings_suppressed
                    );
                }
                log.warnings = warnings;
                log.rows_after = applied.table.row_count();
                log.columns_after = applied.table.column_count();
                log.message = applied.message;
                debug!(step = index + 1, "{}", log.message);
                (log, Some(applied.table))
            }
            Err(e) => {
                error!(step = index + 1, "{e}");
                log.message = "application failed".to_owned();
                log.error = Some(StepError::Application { error: e });
                (log, None)
            }
        }
    }
}
