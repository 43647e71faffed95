//! Element-wise arithmetic between two numeric columns.
//!
//! A null operand yields a null result. Anomalies that have no finite answer (division
//! by zero, percentage change from zero) write `NaN` into the cell and record a
//! [`RowWarning`] instead of failing the step.

use super::{
    Applied, Operation, Params, RowWarning, check_numeric_column, decode, encode,
    ensure_new_column, plural,
};
use crate::catalog::{OperationSchema, ParamKind, ParamSpec};
use crate::error::{ApplicationError, ValidationError};
use crate::table::{Column, Schema, Table, Value, ValueType};
use serde::{Deserialize, Serialize};

/// Which of the four column operations to perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArithmeticKind {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticKind {
    pub const ALL: [Self; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    /// Catalog name of the operation.
    pub fn operation_name(self) -> &'static str {
        match self {
            Self::Add => "add_columns",
            Self::Subtract => "subtract_columns",
            Self::Multiply => "multiply_columns",
            Self::Divide => "divide_columns",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Add => "Add two numeric columns into a new column",
            Self::Subtract => "Subtract one numeric column from another into a new column",
            Self::Multiply => "Multiply two numeric columns into a new column",
            Self::Divide => "Divide one numeric column by another into a new column",
        }
    }

    /// `None` when the result is undefined.
    fn eval(self, left: f64, right: f64) -> Option<f64> {
        match self {
            Self::Add => Some(left + right),
            Self::Subtract => Some(left - right),
            Self::Multiply => Some(left * right),
            Self::Divide if right == 0.0 => None,
            Self::Divide => Some(left / right),
        }
    }
}

/// `result_name = left <op> right`, row by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnArithmetic {
    #[serde(skip)]
    pub kind: ArithmeticKind,
    pub left: String,
    pub right: String,
    pub result_name: String,
}

impl ColumnArithmetic {
    pub fn new(
        kind: ArithmeticKind,
        left: impl Into<String>,
        right: impl Into<String>,
        result_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            left: left.into(),
            right: right.into(),
            result_name: result_name.into(),
        }
    }

    pub fn add(left: &str, right: &str, result_name: &str) -> Self {
        Self::new(ArithmeticKind::Add, left, right, result_name)
    }

    pub fn subtract(left: &str, right: &str, result_name: &str) -> Self {
        Self::new(ArithmeticKind::Subtract, left, right, result_name)
    }

    pub fn multiply(left: &str, right: &str, result_name: &str) -> Self {
        Self::new(ArithmeticKind::Multiply, left, right, result_name)
    }

    pub fn divide(left: &str, right: &str, result_name: &str) -> Self {
        Self::new(ArithmeticKind::Divide, left, right, result_name)
    }

    pub fn schema(kind: ArithmeticKind) -> OperationSchema {
        OperationSchema::new(
            kind.operation_name(),
            kind.description(),
            vec![
                ParamSpec::required("left", ParamKind::Column, "Left-hand numeric column"),
                ParamSpec::required("right", ParamKind::Column, "Right-hand numeric column"),
                ParamSpec::required("result_name", ParamKind::Text, "Name of the new column"),
            ],
        )
    }

    pub fn from_parameters(kind: ArithmeticKind, params: &Params) -> Result<Self, Vec<String>> {
        let decoded: Self = decode(params)?;
        let op = Self { kind, ..decoded };
        if op.result_name.is_empty() {
            return Err(vec!["'result_name' must not be empty".to_owned()]);
        }
        Ok(op)
    }
}

impl Operation for ColumnArithmetic {
    fn name(&self) -> &'static str {
        self.kind.operation_name()
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!(
            "{} = {} {} {}",
            self.result_name,
            self.left,
            self.kind.symbol(),
            self.right
        )
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_numeric_column(self.name(), schema, &self.left, &mut errors);
        check_numeric_column(self.name(), schema, &self.right, &mut errors);
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        schema.clone().with_field(&self.result_name, ValueType::Number)
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let name = self.name();
        let undefined = match self.kind {
            ArithmeticKind::Divide => "division by zero",
            _ => "undefined result",
        };
        let (values, warnings) = combine(
            name,
            table,
            (self.left.as_str(), self.right.as_str()),
            &self.result_name,
            |left, right| self.kind.eval(left, right).ok_or(undefined),
        )?;
        write_result(name, table, &self.result_name, values, warnings)
    }
}

/// `result_name = (new - old) / old * 100`, row by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentageChange {
    pub old_column: String,
    pub new_column: String,
    pub result_name: String,
}

impl PercentageChange {
    pub const NAME: &'static str = "percentage_change";

    pub fn new(
        old_column: impl Into<String>,
        new_column: impl Into<String>,
        result_name: impl Into<String>,
    ) -> Self {
        Self {
            old_column: old_column.into(),
            new_column: new_column.into(),
            result_name: result_name.into(),
        }
    }

    pub fn schema() -> OperationSchema {
        OperationSchema::new(
            Self::NAME,
            "Percentage change from one numeric column to another",
            vec![
                ParamSpec::required("old_column", ParamKind::Column, "Baseline values"),
                ParamSpec::required("new_column", ParamKind::Column, "Changed values"),
                ParamSpec::required("result_name", ParamKind::Text, "Name of the new column"),
            ],
        )
    }

    pub fn from_parameters(params: &Params) -> Result<Self, Vec<String>> {
        let op: Self = decode(params)?;
        if op.result_name.is_empty() {
            return Err(vec!["'result_name' must not be empty".to_owned()]);
        }
        Ok(op)
    }
}

impl Operation for PercentageChange {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> Params {
        encode(self)
    }

    fn describe(&self) -> String {
        format!(
            "{} = % change from {} to {}",
            self.result_name, self.old_column, self.new_column
        )
    }

    fn validate(&self, schema: &Schema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_numeric_column(Self::NAME, schema, &self.old_column, &mut errors);
        check_numeric_column(Self::NAME, schema, &self.new_column, &mut errors);
        errors
    }

    fn output_schema(&self, schema: &Schema) -> Schema {
        schema.clone().with_field(&self.result_name, ValueType::Number)
    }

    fn apply(&self, table: &Table) -> Result<Applied, ApplicationError> {
        let (values, warnings) = combine(
            Self::NAME,
            table,
            (self.old_column.as_str(), self.new_column.as_str()),
            &self.result_name,
            |old, new| {
                if old == 0.0 {
                    Err("percentage change from zero")
                } else {
                    Ok((new - old) / old * 100.0)
                }
            },
        )?;
        write_result(Self::NAME, table, &self.result_name, values, warnings)
    }
}

/// Applies `f` to each row of two numeric columns.
fn combine(
    operation: &str,
    table: &Table,
    (left, right): (&str, &str),
    result_name: &str,
    f: impl Fn(f64, f64) -> Result<f64, &'static str>,
) -> Result<(Vec<Value>, Vec<RowWarning>), ApplicationError> {
    let lhs = table
        .require(left)
        .map_err(|e| ApplicationError::from_table(operation, &e))?;
    let rhs = table
        .require(right)
        .map_err(|e| ApplicationError::from_table(operation, &e))?;
    ensure_new_column(operation, table, result_name)?;

    let mut warnings = Vec::new();
    let mut values = Vec::with_capacity(table.row_count());
    for (row, (a, b)) in lhs.values().iter().zip(rhs.values()).enumerate() {
        let value = match (a, b) {
            (Value::Null, _) | (_, Value::Null) => Value::Null,
            (Value::Number(a), Value::Number(b)) => match f(*a, *b) {
                Ok(n) => Value::Number(n),
                Err(reason) => {
                    warnings.push(RowWarning::new(row, result_name, reason));
                    Value::Number(f64::NAN)
                }
            },
            (a, b) => {
                let culprit = if a.as_number().is_none() { (left, a) } else { (right, b) };
                return Err(ApplicationError::new(
                    operation,
                    format!(
                        "row {row}: column '{}' holds non-numeric value '{}'",
                        culprit.0, culprit.1
                    ),
                ));
            }
        };
        values.push(value);
    }
    Ok((values, warnings))
}

fn write_result(
    operation: &str,
    table: &Table,
    result_name: &str,
    values: Vec<Value>,
    warnings: Vec<RowWarning>,
) -> Result<Applied, ApplicationError> {
    let count = values.len();
    let table = table
        .with_column(Column::new(result_name, values))
        .map_err(|e| ApplicationError::from_table(operation, &e))?;
    Ok(
        Applied::new(table, format!("wrote {} to '{result_name}'", plural(count, "value")))
            .with_warnings(warnings),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::numbers;
    use serde_json::json;

    fn prices(price: [i32; 3], cost: [i32; 3]) -> Table {
        Table::from_rows(
            &["price", "cost"],
            price
                .iter()
                .zip(cost)
                .map(|(&p, c)| vec![Value::from(p), Value::from(c)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_divide() {
        let applied = ColumnArithmetic::divide("price", "cost", "ratio")
            .apply(&prices([10, 0, 5], [2, 3, 1]))
            .unwrap();
        assert_eq!(numbers(&applied.table, "ratio"), vec![5.0, 0.0, 5.0]);
        assert!(applied.warnings.is_empty());
    }

    #[test]
    fn test_divide_by_zero_yields_nan_and_warning() {
        let applied = ColumnArithmetic::divide("price", "cost", "ratio")
            .apply(&prices([10, 5, 5], [2, 0, 1]))
            .unwrap();
        let ratio = numbers(&applied.table, "ratio");
        assert_eq!(ratio[0], 5.0);
        assert!(ratio[1].is_nan());
        assert_eq!(ratio[2], 5.0);
        assert_eq!(applied.warnings.len(), 1);
        assert_eq!(applied.warnings[0].row, 1);
        assert_eq!(applied.warnings[0].message, "division by zero");
    }

    #[test]
    fn test_other_kinds() {
        let table = prices([10, 0, 5], [2, 3, 1]);
        let sum = ColumnArithmetic::add("price", "cost", "sum").apply(&table).unwrap();
        assert_eq!(numbers(&sum.table, "sum"), vec![12.0, 3.0, 6.0]);
        let diff = ColumnArithmetic::subtract("price", "cost", "diff").apply(&table).unwrap();
        assert_eq!(numbers(&diff.table, "diff"), vec![8.0, -3.0, 4.0]);
        let product = ColumnArithmetic::multiply("price", "cost", "product")
            .apply(&table)
            .unwrap();
        assert_eq!(numbers(&product.table, "product"), vec![20.0, 0.0, 5.0]);
    }

    #[test]
    fn test_null_operand_gives_null() {
        let table = Table::from_rows(
            &["a", "b"],
            vec![vec![Value::Null, Value::from(1)], vec![Value::from(2), Value::from(3)]],
        )
        .unwrap();
        let applied = ColumnArithmetic::add("a", "b", "c").apply(&table).unwrap();
        let cells = applied.table.column("c").unwrap().values().to_vec();
        assert_eq!(cells, vec![Value::Null, Value::from(5)]);
    }

    #[test]
    fn test_result_collision() {
        let err = ColumnArithmetic::add("price", "cost", "cost")
            .apply(&prices([1, 2, 3], [1, 2, 3]))
            .unwrap_err();
        assert_eq!(err.operation, "add_columns");
    }

    #[test]
    fn test_validate_requires_numeric_columns() {
        let table = Table::from_rows(
            &["price", "label"],
            vec![vec![Value::from(1), Value::from("x")]],
        )
        .unwrap();
        let errors = ColumnArithmetic::multiply("price", "label", "out").validate(&table.schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column.as_deref(), Some("label"));
    }

    #[test]
    fn test_parameters_exclude_kind() {
        let op = ColumnArithmetic::divide("price", "cost", "ratio");
        let params = op.parameters();
        assert_eq!(
            serde_json::Value::Object(params.clone()),
            json!({"left": "price", "right": "cost", "result_name": "ratio"})
        );
        let rebuilt = ColumnArithmetic::from_parameters(ArithmeticKind::Divide, &params).unwrap();
        assert_eq!(rebuilt, op);
    }

    #[test]
    fn test_percentage_change() {
        let table = prices([110, 5, 50], [100, 0, 100]);
        let applied = PercentageChange::new("cost", "price", "change")
            .apply(&table)
            .unwrap();
        let change = numbers(&applied.table, "change");
        assert!((change[0] - 10.0).abs() < 1e-9);
        assert!(change[1].is_nan());
        assert!((change[2] + 50.0).abs() < 1e-9);
        assert_eq!(applied.warnings.len(), 1);
    }
}
