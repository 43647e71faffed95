//! Column names plus inferred value types.
//!
//! Operations validate against a [`Schema`] without touching row data, so the
//! pipeline can reject a structurally broken step before it runs.

use super::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred type of a column, folded over its non-null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// No non-null cells. Compatible with every requirement.
    Empty,
    Boolean,
    Number,
    Text,
    /// Dates and timestamps.
    Date,
    /// More than one kind of non-null cell.
    Mixed,
}

impl ValueType {
    /// Type of a single cell, `None` for missing values.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Boolean),
            Value::Number(_) => Some(Self::Number),
            Value::Text(_) => Some(Self::Text),
            Value::Date(_) | Value::DateTime(_) => Some(Self::Date),
        }
    }

    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut inferred = Self::Empty;
        for ty in values.into_iter().filter_map(Self::of) {
            inferred = match inferred {
                Self::Empty => ty,
                current if current == ty => current,
                _ => return Self::Mixed,
            };
        }
        inferred
    }

    /// Type of a column holding cells of both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (Self::Empty, ty) | (ty, Self::Empty) => ty,
            (a, b) if a == b => a,
            _ => Self::Mixed,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Empty)
    }

    /// Types that support `<`, `>`, `<=`, `>=`.
    pub fn is_ordered(self) -> bool {
        matches!(self, Self::Number | Self::Date | Self::Empty)
    }

    /// Types that `contains` / `not-contains` accept.
    pub fn is_text_coercible(self) -> bool {
        matches!(self, Self::Text | Self::Number | Self::Mixed | Self::Empty)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Boolean => "boolean",
            Self::Number => "numeric",
            Self::Text => "text",
            Self::Date => "date",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value_type: ValueType,
}

impl Field {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

/// Ordered field list describing a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Sets the type of `name`, appending the field if it is new.
    #[must_use]
    pub fn with_field(mut self, name: &str, value_type: ValueType) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value_type = value_type;
        } else {
            self.fields.push(Field::new(name, value_type));
        }
        self
    }

    #[must_use]
    pub fn without(mut self, names: &[String]) -> Self {
        self.fields.retain(|f| !names.contains(&f.name));
        self
    }

    #[must_use]
    pub fn renamed(mut self, from: &str, to: &str) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == from) {
            to.clone_into(&mut field.name);
        }
        self
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
