//! Operations that reshape the column set.

use super::{Applied, Operation, Params, check_column, decode, encode, ensure_new_column, plural};
use crate::catalog::{OperationSchema, ParamKind, ParamSpec};
use crate::error::{ApplicationError, ValidationError};
use crate::table::{Column, Field, Schema, Table, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_merged_name() -> String {
    "Merged".to_owned()
}

fn default_separator() -> String {
    " ".to_owned()
}

/// Joins the text of several columns into a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeColumns {
    pub columns: Vec<String>,
    #[serde(default = "default_merged_name")]
    pub new_column: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Remove the source columns after merging.
    #[serde(default)]
    pub drop_sources: bool,
}

impl MergeColumns {
    pub const NAME: &'static str = "merge_columns";

    pub fn new(columns: Vec<String>, new_column: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            columns,
            new_column: new_column.into(),
            separator: separator.into(),
            drop_sources: false,
        }
    }

    #[must_use]
    pub fn dropping_sources(mut self) -> Self {
        self.drop_sources = true;
        self
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Join two or more columns into a new text column",
            vec![
                ParamSpec::required("columns", ParamKind::Columns, "Columns to join, in order"),
                ParamSpec::optional(
                    "new_column",
                    ParamKind::Text,
                    "Name of the merged column (default: Merged)",
                ),
                ParamSpec::optional(
                    "separator",
                    ParamKind::Text,
                    "Text placed between values (default: a space)",
                ),
                ParamSpec::optional(
                    "drop_sources",
                    ParamKind::Bool,
                    "Remove the joined columns afterwards (default: false)",
                ),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        let op: Self = decode(params)?;
        let mut problems = Vec::new();
        if op.columns.len() < 2 {
            problems.push("'columns' must name at least two columns".to_owned());
        }
        if op.new_column.is_empty() {
            problems.push("'new_column' must not be empty".to_owned());
        }
        if problems.is_empty() {
            Ok(op)
        } else {
            Err(problems)
        }
    }
}

impl Operation for MergeColumns {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!(
            "Merge {} into '{}'",
            self.columns.join(", "),
            self.new_column
        )
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.columns.len() < 2 {
            errors.push(ValidationError::new(
                Self::NAME,
                "at least two columns are required",
            ));
        }
        for column in &self.columns {
            check_column(Self::NAME, schema, column, &mut errors);
        }
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        let base = if self.drop_sources {
            schema.clone().without(&self.columns)
        } else {
            schema.clone()
        };
        base.with_field(&self.new_column, ValueType::Text)
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let sources = self
            .columns
            .iter()
            .map(|name| table.require(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        // Dropping a source frees its name for the merged column.
        if !(self.drop_sources && self.columns.contains(&self.new_column)) {
            ensure_new_column(Self::NAME, table, &self.new_column)?;
        }

        let merged = (0..table.row_count())
            .map(|row| {
                let parts: Vec<String> = sources
                    .iter()
                    .map(|c| c.get(row).map(ToString::to_string).unwrap_or_default())
                    .collect();
                Value::Text(parts.join(self.separator.as_str()))
            })
            .collect();

        let base = if self.drop_sources {
            table.without_columns(&self.columns)
        } else {
            table.clone()
        };
        let table = base
            .with_column(Column::new(self.new_column.as_str(), merged))
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        Ok(Applied::new(
            table,
            format!(
                "merged {} into '{}'",
                plural(self.columns.len(), "column"),
                self.new_column
            ),
        ))
    }
}

/// Removes columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropColumns {
    pub columns: Vec<String>,
}

impl DropColumns {
    pub const NAME: &'static str = "drop_columns";

    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Remove columns from the table",
            vec![ParamSpec::required(
                "columns",
                ParamKind::Columns,
                "Columns to remove",
            )],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        decode(params)
    }
}

impl Operation for DropColumns {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!("Drop {}", self.columns.join(", "))
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for column in &self.columns {
            check_column(Self::NAME, schema, column, &mut errors);
        }
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        schema.clone().without(&self.columns)
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        if let Some(missing) = self.columns.iter().find(|c| !table.contains_column(c)) {
            return Err(ApplicationError::new(
                Self::NAME,
                format!("column '{missing}' not found"),
            ));
        }
        let dropped = table.column_count();
        let table = table.without_columns(&self.columns);
        let dropped = dropped - table.column_count();
        Ok(Applied::new(
            table,
            format!("dropped {}", plural(dropped, "column")),
        ))
    }
}

/// Renames columns in place, keeping their position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameColumns {
    /// Old name to new name.
    pub mapping: BTreeMap<String, String>,
}

impl RenameColumns {
    pub const NAME: &'static str = "rename_columns";

    pub fn new(mapping: BTreeMap<String, String>) -> Self {
        Self { mapping }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Rename columns",
            vec![ParamSpec::required(
                "mapping",
                ParamKind::Mapping,
                "Object of current name to new name",
            )],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        let op: Self = decode(params)?;
        let mut problems = Vec::new();
        if op.mapping.is_empty() {
            problems.push("'mapping' must rename at least one column".to_owned());
        }
        if op.mapping.values().any(String::is_empty) {
            problems.push("'mapping' new names must not be empty".to_owned());
        }
        if problems.is_empty() {
            Ok(op)
        } else {
            Err(problems)
        }
    }

    fn target(&self, name: &str) -> String {
        self.mapping
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_owned())
    }
}

impl Operation for RenameColumns {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        let pairs: Vec<String> = self
            .mapping
            .iter()
            .map(|(from, to)| format!("{from} -> {to}"))
            .collect();
        format!("Rename {}", pairs.join(", "))
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for column in self.mapping.keys() {
            check_column(Self::NAME, schema, column, &mut errors);
        }
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        schema
            .fields()
            .iter()
            .map(|f| Field::new(self.target(&f.name), f.value_type))
            .collect()
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        if let Some(missing) = self.mapping.keys().find(|c| !table.contains_column(c)) {
            return Err(ApplicationError::new(
                Self::NAME,
                format!("column '{missing}' not found"),
            ));
        }
        let columns = table
            .columns()
            .iter()
            .map(|c| c.clone().renamed(self.target(c.name())))
            .collect();
        let renamed = Table::new(columns).map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        Ok(Applied::new(
            renamed,
            format!("renamed {}", plural(self.mapping.len(), "column")),
        ))
    }
}
