//! Date parsing and re-rendering.

use super::{Applied, Operation, Params, RowWarning, check_column, decode, encode};
use crate::catalog::{OperationSchema, ParamKind, ParamSpec};
use crate::error::{ApplicationError, ValidationError};
use crate::table::value::DATE_FORMAT;
use crate::table::{Column, Schema, Table, Value, ValueType};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// `from_format` value that tries [`AUTO_DATETIME_FORMATS`] and [`AUTO_DATE_FORMATS`].
pub const AUTO: &str = "auto";

const AUTO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const AUTO_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn default_from_format() -> String {
    AUTO.to_owned()
}

fn default_to_format() -> String {
    DATE_FORMAT.to_owned()
}

/// Returns a problem description when `format` has an unknown specifier.
fn check_format(param: &str, format: &str) -> Option<String> {
    if format.is_empty() {
        return Some(format!("'{param}' must not be empty"));
    }
    StrftimeItems::new(format)
        .any(|item| matches!(item, Item::Error))
        .then(|| format!("'{param}' is not a valid date format: '{format}'"))
}

/// Returns a problem description when `format` cannot render a timestamp without a
/// time zone (`%z`, `%Z` and friends).
fn check_renderable(param: &str, format: &str) -> Option<String> {
    let sample = NaiveDate::from_ymd_opt(2000, 1, 31)?.and_time(NaiveTime::MIN);
    let mut out = String::new();
    write!(out, "{}", sample.format(format))
        .is_err()
        .then(|| format!("'{param}' cannot render dates without a time zone: '{format}'"))
}

/// Parses the cells of `column` and renders them with `to_format`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertDateFormat {
    pub column: String,
    #[serde(default = "default_from_format")]
    pub from_format: String,
    #[serde(default = "default_to_format")]
    pub to_format: String,
}

impl ConvertDateFormat {
    pub const NAME: &'static str = "convert_date_format";

    pub fn new(
        column: impl Into<String>,
        from_format: impl Into<String>,
        to_format: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            from_format: from_format.into(),
            to_format: to_format.into(),
        }
    }

    /// Auto-detecting parse, ISO output.
    pub fn auto(column: impl Into<String>) -> Self {
        Self::new(column, AUTO, DATE_FORMAT)
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Parse dates in a column and rewrite them in another format",
            vec![
                ParamSpec::required("column", ParamKind::Column, "Column holding dates"),
                ParamSpec::optional(
                    "from_format",
                    ParamKind::Text,
                    "strftime pattern of the input, or 'auto' (default)",
                ),
                ParamSpec::optional(
                    "to_format",
                    ParamKind::Text,
                    "strftime pattern of the output (default: %Y-%m-%d)",
                ),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        let op: Self = decode(params)?;
        let problems = op.format_problems();
        if problems.is_empty() {
            Ok(op)
        } else {
            Err(problems)
        }
    }

    fn format_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.from_format != AUTO {
            problems.extend(check_format("from_format", &self.from_format));
        }
        match check_format("to_format", &self.to_format) {
            Some(problem) => problems.push(problem),
            None => problems.extend(check_renderable("to_format", &self.to_format)),
        }
        problems
    }

    fn parse_text(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if self.from_format == AUTO {
            AUTO_DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .or_else(|| {
                    AUTO_DATE_FORMATS
                        .iter()
                        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                        .map(|d| d.and_time(NaiveTime::MIN))
                })
                .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_local()))
                .or_else(|| DateTime::parse_from_rfc2822(text).ok().map(|dt| dt.naive_local()))
        } else {
            NaiveDateTime::parse_from_str(text, &self.from_format)
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(text, &self.from_format)
                        .ok()
                        .map(|d| d.and_time(NaiveTime::MIN))
                })
        }
    }

    fn render(&self, at: NaiveDateTime) -> Result<String, ApplicationError> {
        let mut out = String::new();
        write!(out, "{}", at.format(&self.to_format)).map_err(|_| {
            ApplicationError::new(
                Self::NAME,
                format!("cannot render dates with format '{}'", self.to_format),
            )
        })?;
        Ok(out)
    }
}

impl Operation for ConvertDateFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!(
            "Convert dates in '{}' from {} to {}",
            self.column, self.from_format, self.to_format
        )
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = self
            .format_problems()
            .into_iter()
            .map(|problem| ValidationError::new(Self::NAME, problem))
            .collect();
        if let Some(ty) = check_column(Self::NAME, schema, &self.column, &mut errors)
            && matches!(ty, ValueType::Boolean | ValueType::Number)
        {
            errors.push(ValidationError::column(
                Self::NAME,
                &self.column,
                format!("column '{}' is {ty} and cannot hold dates", self.column),
            ));
        }
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        schema.clone().with_field(&self.column, ValueType::Text)
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let source = table
            .require(&self.column)
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;

        let mut warnings = Vec::new();
        let mut converted = 0;
        let mut values = Vec::with_capacity(source.len());
        for (row, cell) in source.values().iter().enumerate() {
            let parsed = match cell {
                Value::Null => {
                    values.push(Value::Null);
                    continue;
                }
                Value::Text(text) => self.parse_text(text),
                other => other.as_datetime(),
            };
            match parsed {
                Some(at) => {
                    values.push(Value::Text(self.render(at)?));
                    converted += 1;
                }
                None => {
                    warnings.push(RowWarning::new(
                        row,
                        self.column.as_str(),
                        format!("could not parse '{cell}' as a date"),
                    ));
                    values.push(cell.clone());
                }
            }
        }

        let non_null = source.values().iter().filter(|v| !v.is_null()).count();
        let table = table
            .replace_column(Column::new(self.column.as_str(), values))
            .map_err(|e| ApplicationError::from_table(Self::NAME, &e))?;
        Ok(
            Applied::new(table, format!("converted {converted} of {non_null} dates"))
                .with_warnings(warnings),
        )
    }
}
