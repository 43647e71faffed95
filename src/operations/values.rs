//! Cell rewrites within a single column.

use super::{Applied, Operation, Params, check_column, decode, encode, plural};
use crate::catalog::{OperationSchema, ParamKind, ParamSpec};
use crate::error::{ApplicationError, ValidationError};
use crate::table::{Column, Schema, Table, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Replaces every cell exactly equal to `old_value` with `new_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceValues {
    pub column: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
}

impl ReplaceValues {
    pub const NAME: &'static str = "replace_values";

    pub fn new(
        column: impl Into<String>,
        old_value: impl Into<serde_json::Value>,
        new_value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            column: column.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Replace cells equal to a value with another value",
            vec![
                ParamSpec::required("column", ParamKind::Column, "Column to rewrite"),
                ParamSpec::required("old_value", ParamKind::Scalar, "Value to look for"),
                ParamSpec::required("new_value", ParamKind::Scalar, "Replacement value"),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        let op: Self = decode(params)?;
        let mut problems = Vec::new();
        if Value::from_json(&op.old_value).is_none() {
            problems.push("'old_value' must be a scalar value".to_owned());
        }
        if Value::from_json(&op.new_value).is_none() {
            problems.push("'new_value' must be a scalar value".to_owned());
        }
        if problems.is_empty() {
            Ok(op)
        } else {
            Err(problems)
        }
    }
}

impl Operation for ReplaceValues {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!(
            "Replace {} with {} in '{}'",
            self.old_value, self.new_value, self.column
        )
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_column(Self::NAME, schema, &self.column, &mut errors);
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        let current = schema.value_type(&self.column).unwrap_or(ValueType::Empty);
        let replacement = Value::from_json(&self.new_value)
            .as_ref()
            .and_then(ValueType::of)
            .unwrap_or(ValueType::Empty);
        schema
            .clone()
            .with_field(&self.column, current.union(replacement))
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let source = table
            .require(&self.column)
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        let old = Value::from_json(&self.old_value).unwrap_or_default();
        let new = Value::from_json(&self.new_value).unwrap_or_default();

        let mut replaced = 0;
        let values = source
            .values()
            .iter()
            .map(|cell| {
                if *cell == old {
                    replaced += 1;
                    new.clone()
                } else {
                    cell.clone()
                }
            })
            .collect();

        let table = table
            .replace_column(Column::new(self.column.as_str(), values))
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        Ok(Applied::new(
            table,
            format!("replaced {}", plural(replaced, "value")),
        ))
    }
}

/// Text transformation applied by [`NormalizeText`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMethod {
    #[default]
    Lower,
    Upper,
    /// Uppercase the first letter of every word, lowercase the rest.
    Title,
    /// Strip leading and trailing whitespace.
    Trim,
    /// Uppercase the first character, lowercase the rest.
    Capitalize,
}

impl TextMethod {
    pub const NAMES: &'static [&'static str] = &["lower", "upper", "title", "trim", "capitalize"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Title => "title",
            Self::Trim => "trim",
            Self::Capitalize => "capitalize",
        }
    }

    pub fn transform(self, text: &str) -> String {
        match self {
            Self::Lower => text.to_lowercase(),
            Self::Upper => text.to_uppercase(),
            Self::Title => title_case(text),
            Self::Trim => text.trim().to_owned(),
            Self::Capitalize => {
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl fmt::Display for TextMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A letter following a non-letter starts a new word.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Rewrites every non-null cell of `column` as normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeText {
    pub column: String,
    #[serde(default)]
    pub method: TextMethod,
}

impl NormalizeText {
    pub const NAME: &'static str = "normalize_text";

    pub fn new(column: impl Into<String>, method: TextMethod) -> Self {
        Self {
            column: column.into(),
            method,
        }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Change the case of, or trim, the text in a column",
            vec![
                ParamSpec::required("column", ParamKind::Column, "Column to normalize"),
                ParamSpec::optional(
                    "method",
                    ParamKind::Choice {
                        options: TextMethod::NAMES,
                    },
                    "lower, upper, title, trim or capitalize (default: lower)",
                ),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        decode(params)
    }
}

impl Operation for NormalizeText {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!("Normalize '{}' ({})", self.column, self.method)
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_column(Self::NAME, schema, &self.column, &mut errors);
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        match schema.value_type(&self.column) {
            Some(ValueType::Empty) | None => schema.clone(),
            Some(_) => schema.clone().with_field(&self.column, ValueType::Text),
        }
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let source = table
            .require(&self.column)
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;

        let mut changed = 0;
        let values = source
            .values()
            .iter()
            .map(|cell| {
                if cell.is_null() {
                    return Value::Null;
                }
                let text = self.method.transform(&cell.to_string());
                if cell.as_str() != Some(text.as_str()) {
                    changed += 1;
                }
                Value::Text(text)
            })
            .collect();

        let table = table
            .replace_column(Column::new(self.column.as_str(), values))
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        Ok(Applied::new(
            table,
            format!("normalized {}", plural(changed, "value")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::{people, texts};
    use serde_json::json;

    #[test]
    fn test_replace_exact_match_only() {
        let applied = ReplaceValues::new("city", "NYC", "New York City")
            .apply(&people())
            .unwrap();
        assert_eq!(
            texts(&applied.table, "city"),
            vec!["New York City", "LA", "LA", "New York City", "Chicago", "Boston", "Boston"]
        );
        assert_eq!(applied.message, "replaced 2 values");

        let partial = ReplaceValues::new("city", "NY", "x").apply(&people()).unwrap();
        assert_eq!(partial.table, people());
    }

    #[test]
    fn test_replace_number_with_null() {
        let applied = ReplaceValues::new("age", 30, serde_json::Value::Null)
            .apply(&people())
            .unwrap();
        let ages = applied.table.column("age").unwrap();
        assert!(ages.get(1).unwrap().is_null());
        assert_eq!(ages.get(0), Some(&Value::from(25)));
    }

    #[test]
    fn test_replace_rejects_list() {
        let params = json!({"column": "city", "old_value": ["a"], "new_value": "b"});
        assert!(ReplaceValues::from_parameters(params.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_replace_output_schema() {
        let schema = people().schema();
        let op = ReplaceValues::new("age", 30, "thirty");
        assert_eq!(
            op.output_schema(&schema).value_type("age"),
            Some(ValueType::Mixed)
        );
    }

    #[test]
    fn test_text_methods() {
        assert_eq!(TextMethod::Lower.transform("HeLLo"), "hello");
        assert_eq!(TextMethod::Upper.transform("hello"), "HELLO");
        assert_eq!(TextMethod::Title.transform("hello wORLD o'neil"), "Hello World O'Neil");
        assert_eq!(TextMethod::Trim.transform("  padded \t"), "padded");
        assert_eq!(TextMethod::Capitalize.transform("hELLO world"), "Hello world");
        assert_eq!(TextMethod::Capitalize.transform(""), "");
    }

    #[test]
    fn test_normalize_keeps_nulls_and_coerces_numbers() {
        let table = Table::from_rows(
            &["code"],
            vec![vec![Value::from("ab")], vec![Value::Null], vec![Value::from(12)]],
        )
        .unwrap();
        let applied = NormalizeText::new("code", TextMethod::Upper)
            .apply(&table)
            .unwrap();
        let cells = applied.table.column("code").unwrap().values().to_vec();
        assert_eq!(
            cells,
            vec![Value::from("AB"), Value::Null, Value::from("12")]
        );
    }

    #[test]
    fn test_normalize_rejects_unknown_method() {
        let params = json!({"column": "name", "method": "snake"});
        assert!(NormalizeText::from_parameters(params.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_normalize_missing_column() {
        let errors = NormalizeText::new("nickname", TextMethod::Lower).validate(&people().schema());
        assert_eq!(errors.len(), 1);
        assert!(NormalizeText::new("nickname", TextMethod::Lower)
            .apply(&people())
            .is_err());
    }
}
