//! Column reduction, optionally per group.

use super::{Applied, Operation, Params, check_column, decode, encode, plural};
use crate::catalog::{OperationSchema, ParamKind, ParamSpec};
use crate::error::{ApplicationError, ValidationError};
use crate::table::{Column, Field, Schema, Table, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    /// Number of non-null cells. Works on any column type.
    Count,
}

impl AggregateFunction {
    pub const NAMES: &'static [&'static str] = &["sum", "mean", "median", "min", "max", "count"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }

    pub fn needs_numbers(self) -> bool {
        self != Self::Count
    }

    /// Reduces the non-`NaN` numbers of a group. `None` when there is nothing to reduce.
    fn reduce(self, mut values: Vec<f64>) -> Option<f64> {
        match self {
            Self::Sum => Some(values.iter().sum()),
            Self::Count => Some(values.len() as f64),
            _ if values.is_empty() => None,
            Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => values.into_iter().reduce(f64::min),
            Self::Max => values.into_iter().reduce(f64::max),
            Self::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                let upper = *values.get(mid)?;
                if values.len() % 2 == 0 {
                    Some((*values.get(mid - 1)? + upper) / 2.0)
                } else {
                    Some(upper)
                }
            }
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduces `column` with `function`, one output row per `group_by` key.
///
/// Without `group_by` the output is a single row. Groups appear in the order their key
/// first occurs; rows whose key is null belong to no group. Null and `NaN` cells are
/// skipped. The result column is named `<column>_<function>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub column: String,
    pub function: AggregateFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl Aggregate {
    pub const NAME: &'static str = "aggregate";

    pub fn new(column: impl Into<String>, function: AggregateFunction) -> Self {
        Self {
            column: column.into(),
            function,
            group_by: None,
        }
    }

    #[must_use]
    pub fn grouped_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Reduce a column to a summary value, optionally per group",
            vec![
                ParamSpec::required("column", ParamKind::Column, "Column to reduce"),
                ParamSpec::required(
                    "function",
                    ParamKind::Choice {
                        options: AggregateFunction::NAMES,
                    },
                    "sum, mean, median, min, max or count",
                ),
                ParamSpec::optional("group_by", ParamKind::Column, "Column holding group keys"),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        decode(params)
    }

    pub fn result_name(&self) -> String {
        format!("{}_{}", self.column, self.function)
    }

    fn numbers(&self, column: &Column, rows: &[usize]) -> Result<Vec<f64>, ApplicationError> {
        let mut out = Vec::with_capacity(rows.len());
        for &row in rows {
            match column.get(row) {
                None | Some(Value::Null) => {}
                Some(Value::Number(n)) if n.is_nan() => {}
                Some(Value::Number(n)) => out.push(*n),
                // Count only needs a placeholder per non-null cell.
                Some(_) if !self.function.needs_numbers() => out.push(0.0),
                Some(other) => {
                    return Err(ApplicationError::new(
                        Self::NAME,
                        format!(
                            "row {row}: cannot {} non-numeric value '{other}' in '{}'",
                            self.function, self.column
                        ),
                    ));
                }
            }
        }
        Ok(out)
    }
}

impl Operation for Aggregate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        match &self.group_by {
            Some(group) => format!("{} of {} by {group}", self.function, self.column),
            None => format!("{} of {}", self.function, self.column),
        }
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Some(ty) = check_column(Self::NAME, schema, &self.column, &mut errors)
            && self.function.needs_numbers()
            && !ty.is_numeric()
        {
            errors.push(ValidationError::column(
                Self::NAME,
                &self.column,
                format!(
                    "{} requires a numeric column, '{}' is {ty}",
                    self.function, self.column
                ),
            ));
        }
        if let Some(group) = &self.group_by {
            check_column(Self::NAME, schema, group, &mut errors);
        }
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        let result = Field::new(self.result_name(), ValueType::Number);
        match &self.group_by {
            Some(group) => Schema::new(vec![
                Field::new(
                    group.as_str(),
                    schema.value_type(group).unwrap_or(ValueType::Empty),
                ),
                result,
            ]),
            None => Schema::new(vec![result]),
        }
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let source = table
            .require(&self.column)
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        let result_name = self.result_name();

        let Some(group) = &self.group_by else {
            let rows: Vec<usize> = (0..table.row_count()).collect();
            let value = self.function.reduce(self.numbers(source, &rows)?);
            let table = Table::new(vec![Column::new(result_name, vec![Value::from(value)])])
                .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
            return Ok(Applied::new(
                table,
                format!("aggregated {}", plural(rows.len(), "row")),
            ));
        };

        let keys = table
            .require(group)
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        let mut order: Vec<&Value> = Vec::new();
        let mut members: HashMap<&Value, Vec<usize>> = HashMap::new();
        for (row, key) in keys.values().iter().enumerate() {
            if key.is_null() {
                continue;
            }
            members
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(row);
        }

        let mut results = Vec::with_capacity(order.len());
        for key in &order {
            let rows = members.get(key).map(Vec::as_slice).unwrap_or_default();
            results.push(Value::from(self.function.reduce(self.numbers(source, rows)?)));
        }

        let table = Table::new(vec![
            Column::new(group.as_str(), order.into_iter().cloned().collect()),
            Column::new(result_name, results),
        ])
        .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        let groups = table.row_count();
        Ok(Applied::new(
            table,
            format!(
                "aggregated {} into {}",
                plural(keys.len(), "row"),
                plural(groups, "group")
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::{numbers, people, texts};
    use serde_json::json;

    #[test]
    fn test_ungrouped_sum() {
        let applied = Aggregate::new("age", AggregateFunction::Sum)
            .apply(&people())
            .unwrap();
        assert_eq!(applied.table.row_count(), 1);
        assert_eq!(applied.table.column_names(), vec!["age_sum"]);
        assert_eq!(numbers(&applied.table, "age_sum"), vec![212.0]);
    }

    #[test]
    fn test_grouped_mean_keeps_first_appearance_order() {
        let applied = Aggregate::new("age", AggregateFunction::Mean)
            .grouped_by("city")
            .apply(&people())
            .unwrap();
        assert_eq!(
            texts(&applied.table, "city"),
            vec!["NYC", "LA", "Chicago", "Boston"]
        );
        assert_eq!(
            numbers(&applied.table, "age_mean"),
            vec![30.0, 30.0, 28.0, 32.0]
        );
        assert_eq!(applied.message, "aggregated 7 rows into 4 groups");
    }

    #[test]
    fn test_median_min_max() {
        let table = people();
        let median = Aggregate::new("age", AggregateFunction::Median).apply(&table).unwrap();
        assert_eq!(numbers(&median.table, "age_median"), vec![30.0]);
        let min = Aggregate::new("age", AggregateFunction::Min).apply(&table).unwrap();
        assert_eq!(numbers(&min.table, "age_min"), vec![25.0]);
        let max = Aggregate::new("age", AggregateFunction::Max).apply(&table).unwrap();
        assert_eq!(numbers(&max.table, "age_max"), vec![35.0]);
    }

    #[test]
    fn test_skips_nulls_and_nan() {
        let table = Table::from_rows(
            &["score"],
            vec![
                vec![Value::from(4)],
                vec![Value::Null],
                vec![Value::Number(f64::NAN)],
                vec![Value::from(6)],
            ],
        )
        .unwrap();
        let mean = Aggregate::new("score", AggregateFunction::Mean).apply(&table).unwrap();
        assert_eq!(numbers(&mean.table, "score_mean"), vec![5.0]);
        let count = Aggregate::new("score", AggregateFunction::Count).apply(&table).unwrap();
        assert_eq!(numbers(&count.table, "score_count"), vec![2.0]);
    }

    #[test]
    fn test_empty_group_mean_is_null() {
        let table = Table::from_rows(&["score"], vec![vec![Value::Null]]).unwrap();
        let applied = Aggregate::new("score", AggregateFunction::Mean).apply(&table).unwrap();
        assert_eq!(applied.table.value(0, "score_mean"), Some(&Value::Null));
    }

    #[test]
    fn test_count_accepts_text() {
        let op = Aggregate::new("name", AggregateFunction::Count).grouped_by("city");
        assert!(op.validate(&people().schema()).is_empty());
        let applied = op.apply(&people()).unwrap();
        assert_eq!(numbers(&applied.table, "name_count"), vec![2.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_sum_rejects_text() {
        let errors = Aggregate::new("name", AggregateFunction::Sum).validate(&people().schema());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_output_schema() {
        let op = Aggregate::new("age", AggregateFunction::Max).grouped_by("city");
        let schema = op.output_schema(&people().schema());
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["city", "age_max"]);
        assert_eq!(schema.value_type("city"), Some(ValueType::Text));
    }

    #[test]
    fn test_unknown_function() {
        let params = json!({"column": "age", "function": "mode"});
        assert!(Aggregate::from_parameters(params.as_object().unwrap()).is_err());
    }
}
