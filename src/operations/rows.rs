//! Operations that drop rows: [`RemoveDuplicates`] and [`FilterRows`].
//!
//! Both keep surviving rows in their original relative order.

use super::condition::Condition;
use super::{Applied, Operation, Params, check_column, decode, encode, plural};
use crate::catalog::{OperationSchema, ParamKind, ParamSpec};
use crate::error::{ApplicationError, ValidationError};
use crate::table::{Schema, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which member of a duplicate group survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keep {
    #[default]
    First,
    Last,
    /// Drop every row that has a duplicate.
    None,
}

/// Drops rows that repeat across a column subset (all columns by default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveDuplicates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub keep: Keep,
}

impl RemoveDuplicates {
    pub const NAME: &'static str = "remove_duplicates";

    pub fn new(columns: Option<Vec<String>>, keep: Keep) -> Self {
        Self { columns, keep }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Drop rows that are exact duplicates across the chosen columns",
            vec![
                ParamSpec::optional(
                    "columns",
                    ParamKind::Columns,
                    "Columns that define a duplicate (default: all columns)",
                ),
                ParamSpec::optional(
                    "keep",
                    ParamKind::Choice {
                        options: &["first", "last", "none"],
                    },
                    "Occurrence to keep (default: first)",
                ),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        decode(params)
    }

    /// Indices of surviving rows, ascending.
    fn surviving_rows(&self, table: &Table) -> Vec<usize> {
        let key_columns: Vec<_> = match &self.columns {
            Some(names) => names.iter().filter_map(|n| table.column(n)).collect(),
            None => table.columns().iter().collect(),
        };
        let key = |row: usize| -> Vec<&Value> {
            key_columns.iter().filter_map(|c| c.get(row)).collect()
        };
        let rows = table.row_count();

        match self.keep {
            Keep::First => {
                let mut seen = HashSet::with_capacity(rows);
                (0..rows).filter(|&row| seen.insert(key(row))).collect()
            }
            Keep::Last => {
                let mut seen = HashSet::with_capacity(rows);
                let mut kept: Vec<usize> =
                    (0..rows).rev().filter(|&row| seen.insert(key(row))).collect();
                kept.reverse();
                kept
            }
            Keep::None => {
                let mut counts: HashMap<Vec<&Value>, usize> = HashMap::with_capacity(rows);
                for row in 0..rows {
                    *counts.entry(key(row)).or_default() += 1;
                }
                (0..rows)
                    .filter(|&row| counts.get(&key(row)).copied() == Some(1))
                    .collect()
            }
        }
    }
}

impl Operation for RemoveDuplicates {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        match &self.columns {
            Some(cols) => format!("Remove duplicates by {}", cols.join(", ")),
            None => "Remove duplicate rows".to_owned(),
        }
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for column in self.columns.iter().flatten() {
            check_column(Self::NAME, schema, column, &mut errors);
        }
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        schema.clone()
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        if let Some(missing) = self
            .columns
            .iter()
            .flatten()
            .find(|c| !table.contains_column(c))
        {
            return Err(ApplicationError::new(
                Self::NAME,
                format!("column '{missing}' not found"),
            ));
        }

        let kept = self.surviving_rows(table);
        let removed = table.row_count() - kept.len();
        Ok(Applied::new(
            table.select_rows(&kept),
            format!("{} removed", plural(removed, "duplicate row")),
        ))
    }
}

/// Keeps the rows that satisfy a [`Condition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRows {
    pub condition: Condition,
}

impl FilterRows {
    pub const NAME: &'static str = "filter_rows";

    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Keep only rows that satisfy a condition",
            vec![ParamSpec::required(
                "condition",
                ParamKind::Condition,
                "Column, operator and comparison value",
            )],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        let op: Self = decode(params)?;
        let problems = op.condition.check_parameters();
        if problems.is_empty() {
            Ok(op)
        } else {
            Err(problems)
        }
    }
}

impl Operation for FilterRows {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!("Filter rows where {}", self.condition)
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        self.condition.validate(Self::NAME, schema)
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        schema.clone()
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let column = table
            .require(&self.condition.column)
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        let matcher = self.condition.matcher();

        let kept: Vec<usize> = column
            .values()
            .iter()
            .enumerate()
            .filter(|(_, cell)| matcher.matches(cell))
            .map(|(row, _)| row)
            .collect();

        Ok(Applied::new(
            table.select_rows(&kept),
            format!("kept {} of {}", kept.len(), plural(table.row_count(), "row")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::condition::Operator;
    use crate::operations::test_support::{people, texts};
    use serde_json::json;

    #[test]
    fn test_remove_all_duplicates() {
        let applied = RemoveDuplicates::new(None, Keep::First)
            .apply(&people())
            .unwrap();
        assert_eq!(applied.table.row_count(), 5);
        assert_eq!(applied.message, "2 duplicate rows removed");
    }

    #[test]
    fn test_remove_duplicates_by_column() {
        let table = Table::from_rows(
            &["id", "age"],
            vec![
                vec![Value::from(1), Value::from(25)],
                vec![Value::from(2), Value::from(40)],
                vec![Value::from(1), Value::from(25)],
            ],
        )
        .unwrap();
        let applied = RemoveDuplicates::new(Some(vec!["id".to_owned()]), Keep::First)
            .apply(&table)
            .unwrap();

        let expected = Table::from_rows(
            &["id", "age"],
            vec![
                vec![Value::from(1), Value::from(25)],
                vec![Value::from(2), Value::from(40)],
            ],
        )
        .unwrap();
        assert_eq!(applied.table, expected);
        assert_eq!(applied.message, "1 duplicate row removed");
    }

    #[test]
    fn test_keep_last_preserves_order() {
        let table = Table::from_rows(
            &["key", "seq"],
            vec![
                vec![Value::from("a"), Value::from(0)],
                vec![Value::from("b"), Value::from(1)],
                vec![Value::from("a"), Value::from(2)],
                vec![Value::from("c"), Value::from(3)],
            ],
        )
        .unwrap();
        let applied = RemoveDuplicates::new(Some(vec!["key".to_owned()]), Keep::Last)
            .apply(&table)
            .unwrap();
        assert_eq!(texts(&applied.table, "seq"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_keep_none_drops_whole_groups() {
        let applied = RemoveDuplicates::new(None, Keep::None)
            .apply(&people())
            .unwrap();
        assert_eq!(
            texts(&applied.table, "name"),
            vec!["Alice", "Charlie", "David"]
        );
    }

    #[test]
    fn test_remove_duplicates_is_idempotent() {
        let op = RemoveDuplicates::new(Some(vec!["city".to_owned()]), Keep::First);
        let once = op.apply(&people()).unwrap().table;
        let twice = op.apply(&once).unwrap();
        assert_eq!(once, twice.table);
        assert_eq!(twice.message, "0 duplicate rows removed");
    }

    #[test]
    fn test_empty_table() {
        let applied = RemoveDuplicates::new(None, Keep::First)
            .apply(&Table::default())
            .unwrap();
        assert_eq!(applied.table.row_count(), 0);
    }

    #[test]
    fn test_remove_duplicates_validates_columns() {
        let op = RemoveDuplicates::new(Some(vec!["missing".to_owned()]), Keep::First);
        assert_eq!(op.validate(&people().schema()).len(), 1);
    }

    #[test]
    fn test_filter_equals() {
        let op = FilterRows::new(Condition::new("age", Operator::Equals, 30));
        let applied = op.apply(&people()).unwrap();
        assert_eq!(texts(&applied.table, "name"), vec!["Bob", "Bob"]);
    }

    #[test]
    fn test_filter_preserves_order() {
        let op = FilterRows::new(Condition::new("age", Operator::GreaterThan, 28));
        let applied = op.apply(&people()).unwrap();
        assert_eq!(
            texts(&applied.table, "id"),
            vec!["2", "2", "3", "5", "5"]
        );
        assert_eq!(applied.message, "kept 5 of 7 rows");
    }

    #[test]
    fn test_filter_contains_and_in() {
        let contains = FilterRows::new(Condition::new("city", Operator::Contains, "York"));
        assert_eq!(contains.apply(&people()).unwrap().table.row_count(), 0);

        let within = FilterRows::new(Condition::new(
            "name",
            Operator::In,
            json!(["Alice", "Bob", "Charlie"]),
        ));
        assert_eq!(within.apply(&people()).unwrap().table.row_count(), 4);
    }

    #[test]
    fn test_filter_rejects_in_without_list() {
        let params = json!({"condition": {"column": "name", "operator": "in", "value": "Bob"}});
        let result = FilterRows::from_parameters(params.as_object().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_numeric_operator_on_text_fails_validation() {
        let op = FilterRows::new(Condition::new("name", Operator::GreaterThan, 3));
        let errors = op.validate(&people().schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column.as_deref(), Some("name"));
    }
}
