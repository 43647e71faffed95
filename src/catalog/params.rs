//! Declared parameter schemas.
//!
//! Each operation publishes an [`OperationSchema`]. The catalog checks a parameter
//! set against it (missing keys, unexpected keys, JSON types, enum choices) before the
//! operation's own constructor runs, and UIs render parameter forms from it.

use crate::operations::Params;
use serde::Serialize;
use serde_json::Value as Json;

/// Shape of a single parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    /// Name of one column.
    Column,
    /// Non-empty list of column names.
    Columns,
    /// Free text.
    Text,
    Number,
    Bool,
    /// JSON scalar literal (null, bool, number, or string).
    Scalar,
    /// One of a fixed set of strings.
    Choice { options: &'static [&'static str] },
    /// `{ "column": ..., "operator": ..., "value": ... }`
    Condition,
    /// Scalar literal or `{ "column": name }`.
    Operand,
    /// Object of old name to new name.
    Mapping,
}

impl ParamKind {
    /// Describes why `value` does not fit, if it does not.
    fn check(&self, name: &str, value: &Json) -> Option<String> {
        let ok = match self {
            Self::Column | Self::Text => value.is_string(),
            Self::Columns => value
                .as_array()
                .is_some_and(|items| !items.is_empty() && items.iter().all(Json::is_string)),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Scalar => is_scalar(value),
            Self::Choice { options } => {
                return match value.as_str() {
                    Some(choice) if options.contains(&choice) => None,
                    Some(choice) => Some(format!(
                        "'{name}' must be one of [{}], got '{choice}'",
                        options.join(", ")
                    )),
                    None => Some(format!("'{name}' must be a string")),
                };
            }
            Self::Condition => {
                return check_condition(name, value);
            }
            Self::Operand => {
                is_scalar(value)
                    || value.as_object().is_some_and(|obj| {
                        obj.len() == 1 && obj.get("column").is_some_and(Json::is_string)
                    })
            }
            Self::Mapping => value
                .as_object()
                .is_some_and(|obj| obj.values().all(Json::is_string)),
        };

        if ok {
            None
        } else {
            Some(format!("'{name}' must be {}", self.expected()))
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::Column => "a column name",
            Self::Columns => "a non-empty list of column names",
            Self::Text => "a string",
            Self::Number => "a number",
            Self::Bool => "a boolean",
            Self::Scalar => "a scalar value",
            Self::Choice { .. } => "one of the listed choices",
            Self::Condition => "a condition object",
            Self::Operand => "a scalar value or {\"column\": name}",
            Self::Mapping => "an object mapping column names to new names",
        }
    }
}

fn is_scalar(value: &Json) -> bool {
    !matches!(value, Json::Array(_) | Json::Object(_))
}

fn check_condition(name: &str, value: &Json) -> Option<String> {
    let Some(obj) = value.as_object() else {
        return Some(format!("'{name}' must be a condition object"));
    };
    let mut problems = Vec::new();
    if !obj.get("column").is_some_and(Json::is_string) {
        problems.push("a 'column' string");
    }
    match obj.get("operator").and_then(Json::as_str) {
        Some(op) if crate::operations::Operator::NAMES.contains(&op) => {}
        _ => problems.push("a known 'operator'"),
    }
    if !obj.contains_key("value") {
        problems.push("a 'value'");
    }
    if let Some(extra) = obj
        .keys()
        .find(|k| !matches!(k.as_str(), "column" | "operator" | "value"))
    {
        return Some(format!("'{name}' has unexpected key '{extra}'"));
    }
    if problems.is_empty() {
        None
    } else {
        Some(format!("'{name}' needs {}", problems.join(", ")))
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// Everything a catalog consumer needs to render and check an operation's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl OperationSchema {
    pub fn new(name: &'static str, description: &'static str, params: Vec<ParamSpec>) -> Self {
        Self {
            name,
            description,
            params,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Lists every way `params` departs from this schema. Empty means it conforms.
    ///
    /// An explicit `null` for an optional parameter counts as absent.
    pub fn check(&self, params: &Params) -> Vec<String> {
        let mut problems = Vec::new();

        for spec in &self.params {
            match params.get(spec.name) {
                None => {
                    if spec.required {
                        problems.push(format!("missing required parameter '{}'", spec.name));
                    }
                }
                Some(Json::Null) if !spec.required && spec.kind != ParamKind::Scalar => {}
                Some(value) => problems.extend(spec.kind.check(spec.name, value)),
            }
        }

        for key in params.keys() {
            if self.param(key).is_none() {
                problems.push(format!("unexpected parameter '{key}'"));
            }
        }

        problems
    }
}
