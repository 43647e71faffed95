//! Per-row if/else into a new column.

use super::condition::Condition;
use super::{Applied, Operation, Params, check_column, decode, encode, ensure_new_column};
use crate::catalog::{OperationSchema, ParamKind, ParamSpec};
use crate::error::{ApplicationError, ValidationError};
use crate::table::{Column, Schema, Table, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal, or the same row's value from another column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Column(ColumnRef),
    Literal(serde_json::Value),
}

/// `{"column": name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnRef {
    pub column: String,
}

impl Operand {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(ColumnRef {
            column: name.into(),
        })
    }

    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal(value.into())
    }

    fn value_type(&self, schema: &Schema) -> ValueType {
        match self {
            Self::Column(r) => schema.value_type(&r.column).unwrap_or(ValueType::Empty),
            Self::Literal(json) => Value::from_json(json)
                .as_ref()
                .and_then(ValueType::of)
                .unwrap_or(ValueType::Empty),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(r) => write!(f, "[{}]", r.column),
            Self::Literal(json) => write!(f, "{json}"),
        }
    }
}

/// Resolved form of an [`Operand`] for one table.
enum Source<'a> {
    Column(&'a Column),
    Literal(Value),
}

impl Source<'_> {
    fn at(&self, row: usize) -> Value {
        match self {
            Self::Column(c) => c.get(row).cloned().unwrap_or_default(),
            Self::Literal(v) => v.clone(),
        }
    }
}

/// `result_name = condition ? true_value : false_value`, row by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalCalculation {
    pub condition: Condition,
    pub true_value: Operand,
    pub false_value: Operand,
    pub result_name: String,
}

impl ConditionalCalculation {
    pub const NAME: &'static str = "conditional_calculation";

    pub fn new(
        condition: Condition,
        true_value: Operand,
        false_value: Operand,
        result_name: impl Into<String>,
    ) -> Self {
        Self {
            condition,
            true_value,
            false_value,
            result_name: result_name.into(),
        }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Write one of two values into a new column depending on a condition",
            vec![
                ParamSpec::required("condition", ParamKind::Condition, "Row test"),
                ParamSpec::required(
                    "true_value",
                    ParamKind::Operand,
                    "Value when the condition holds",
                ),
                ParamSpec::required(
                    "false_value",
                    ParamKind::Operand,
                    "Value when it does not",
                ),
                ParamSpec::required("result_name", ParamKind::Text, "Name of the new column"),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        let op: Self = decode(params)?;
        let mut problems = op.condition.check_parameters();
        for (name, operand) in [("true_value", &op.true_value), ("false_value", &op.false_value)] {
            if let Operand::Literal(json) = operand
                && Value::from_json(json).is_none()
            {
                problems.push(format!("'{name}' must be a scalar value or {{\"column\": name}}"));
            }
        }
        if op.result_name.is_empty() {
            problems.push("'result_name' must not be empty".to_owned());
        }
        if problems.is_empty() {
            Ok(op)
        } else {
            Err(problems)
        }
    }
}

fn resolve<'a>(table: &'a Table, operand: &Operand) -> Result<Source<'a>, ApplicationError> {
    match operand {
        Operand::Column(r) => table
            .require(&r.column)
            .map(Source::Column)
            .map_err(|e| ApplicationError::from_table(ConditionalCalculation::NAME, &e)),
        Operand::Literal(json) => Ok(Source::Literal(
            Value::from_json(json).unwrap_or_default(),
        )),
    }
}

impl Operation for ConditionalCalculation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!(
            "{} = if {} then {} else {}",
            self.result_name, self.condition, self.true_value, self.false_value
        )
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = self.condition.validate(Self::NAME, schema);
        for operand in [&self.true_value, &self.false_value] {
            if let Operand::Column(r) = operand {
                check_column(Self::NAME, schema, &r.column, &mut errors);
            }
        }
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        let ty = self
            .true_value
            .value_type(schema)
            .union(self.false_value.value_type(schema));
        schema.clone().with_field(&self.result_name, ty)
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let tested = table
            .require(&self.condition.column)
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        ensure_new_column(Self::NAME, table, &self.result_name)?;
        let when_true = resolve(table, &self.true_value)?;
        let when_false = resolve(table, &self.false_value)?;
        let matcher = self.condition.matcher();

        let mut matched = 0;
        let values = tested
            .values()
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                if matcher.matches(cell) {
                    matched += 1;
                    when_true.at(row)
                } else {
                    when_false.at(row)
                }
            })
            .collect();

        let table = table
            .with_column(Column::new(self.result_name.as_str(), values))
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        let rows = table.row_count();
        Ok(Applied::new(
            table,
            format!("condition held for {matched} of {rows} rows"),
        ))
    }
}
