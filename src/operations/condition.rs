//! Row predicates shared by [`FilterRows`](super::FilterRows) and
//! [`ConditionalCalculation`](super::ConditionalCalculation).

use crate::error::ValidationError;
use crate::table::value::parse_date_literal;
use crate::table::{Schema, Value, ValueType};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==", alias = "equals", alias = "eq")]
    Equals,
    #[serde(rename = "!=", alias = "not_equals", alias = "not-equals", alias = "ne")]
    NotEquals,
    #[serde(rename = ">", alias = "greater_than", alias = "greater-than", alias = "gt")]
    GreaterThan,
    #[serde(rename = "<", alias = "less_than", alias = "less-than", alias = "lt")]
    LessThan,
    #[serde(
        rename = ">=",
        alias = "greater_or_equal",
        alias = "greater-or-equal",
        alias = "ge"
    )]
    GreaterOrEqual,
    #[serde(
        rename = "<=",
        alias = "less_or_equal",
        alias = "less-or-equal",
        alias = "le"
    )]
    LessOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not_contains", alias = "not-contains")]
    NotContains,
    #[serde(rename = "in")]
    In,
}

impl Operator {
    /// Every spelling accepted in a parameter set.
    pub const NAMES: &'static [&'static str] = &[
        "==",
        "equals",
        "eq",
        "!=",
        "not_equals",
        "not-equals",
        "ne",
        ">",
        "greater_than",
        "greater-than",
        "gt",
        "<",
        "less_than",
        "less-than",
        "lt",
        ">=",
        "greater_or_equal",
        "greater-or-equal",
        "ge",
        "<=",
        "less_or_equal",
        "less-or-equal",
        "le",
        "contains",
        "not_contains",
        "not-contains",
        "in",
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::In => "in",
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::LessThan | Self::GreaterOrEqual | Self::LessOrEqual
        )
    }

    pub fn is_textual(self) -> bool {
        matches!(self, Self::Contains | Self::NotContains)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `column operator value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: serde_json::Value,
}

impl Condition {
    pub fn new(
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Checks the literal's shape independent of any table.
    pub fn check_parameters(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match (&self.operator, &self.value) {
            (Operator::In, serde_json::Value::Array(items)) => {
                if items.iter().any(|v| Value::from_json(v).is_none()) {
                    problems.push("'in' list may only hold scalar values".to_owned());
                }
            }
            (Operator::In, _) => problems.push("'in' needs a list value".to_owned()),
            (op, value) if Value::from_json(value).is_none() => {
                problems.push(format!("'{op}' needs a scalar value"));
            }
            (op, value) if op.is_ordering() && !(value.is_number() || value.is_string()) => {
                problems.push(format!("'{op}' needs a number or a date value"));
            }
            (op, value) if op.is_textual() && !(value.is_number() || value.is_string()) => {
                problems.push(format!("'{op}' needs a text or number value"));
            }
            _ => {}
        }
        problems
    }

    /// Checks that the column exists and that the operator fits its type.
    pub fn validate(&self, operation: &str, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let Some(ty) = schema.value_type(&self.column) else {
            errors.push(ValidationError::missing_column(operation, &self.column));
            return errors;
        };
        let column = &self.column;
        let op = self.operator;

        if op.is_ordering() {
            match ty {
                ValueType::Empty => {}
                ValueType::Number if self.value.is_number() => {}
                ValueType::Number => errors.push(ValidationError::column(
                    operation,
                    column,
                    format!("operator '{op}' on numeric column '{column}' needs a numeric value"),
                )),
                ValueType::Date
                    if self
                        .value
                        .as_str()
                        .and_then(parse_date_literal)
                        .is_some() => {}
                ValueType::Date => errors.push(ValidationError::column(
                    operation,
                    column,
                    format!("operator '{op}' on date column '{column}' needs a YYYY-MM-DD value"),
                )),
                other => errors.push(ValidationError::column(
                    operation,
                    column,
                    format!("operator '{op}' requires a numeric column, '{column}' is {other}"),
                )),
            }
        } else if op.is_textual() && !ty.is_text_coercible() {
            errors.push(ValidationError::column(
                operation,
                column,
                format!("operator '{op}' requires a text column, '{column}' is {ty}"),
            ));
        }

        errors
    }

    /// Prepares the literal once for repeated row evaluation.
    pub fn matcher(&self) -> Matcher {
        let scalar = Value::from_json(&self.value).unwrap_or_default();
        let date = self.value.as_str().and_then(parse_date_literal);
        let list = self
            .value
            .as_array()
            .map(|items| items.iter().filter_map(Value::from_json).collect())
            .unwrap_or_default();
        Matcher {
            operator: self.operator,
            text: scalar.to_string(),
            scalar,
            date,
            list,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator, self.value)
    }
}

/// A [`Condition`]'s literal, decoded for evaluation.
#[derive(Debug, Clone)]
pub struct Matcher {
    operator: Operator,
    scalar: Value,
    text: String,
    date: Option<NaiveDateTime>,
    list: Vec<Value>,
}

impl Matcher {
    pub fn matches(&self, cell: &Value) -> bool {
        match self.operator {
            Operator::Equals => !cell.is_null() && self.equals(cell),
            Operator::NotEquals => !self.equals(cell),
            Operator::GreaterThan => self.order(cell).is_some_and(Ordering::is_gt),
            Operator::LessThan => self.order(cell).is_some_and(Ordering::is_lt),
            Operator::GreaterOrEqual => self.order(cell).is_some_and(Ordering::is_ge),
            Operator::LessOrEqual => self.order(cell).is_some_and(Ordering::is_le),
            Operator::Contains => cell.to_string().contains(&self.text),
            Operator::NotContains => !cell.to_string().contains(&self.text),
            Operator::In => !cell.is_null() && self.list.contains(cell),
        }
    }

    fn equals(&self, cell: &Value) -> bool {
        *cell == self.scalar || (self.date.is_some() && self.date == cell.as_datetime())
    }

    fn order(&self, cell: &Value) -> Option<Ordering> {
        match (cell.as_datetime(), self.date) {
            (Some(at), Some(literal)) => Some(at.cmp(&literal)),
            _ => cell.compare(&self.scalar),
        }
    }
}
