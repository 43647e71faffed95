//! Bridge between [`Table`] and polars `DataFrame`s, plus CSV file adapters.
//!
//! The engine never sees polars types. Integer and float columns become
//! [`Value::Number`]; `Date` and `Datetime` columns keep their temporal type; any
//! other dtype is carried as its display text.

use crate::error::{Result, ResultExt as _};
use crate::table::{Column as TableColumn, Table, Value, ValueType};
use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime};
use polars::prelude::{
    AnyValue, Column, CsvReadOptions, CsvWriter, DataFrame, DataType, NamedFrom as _,
    SerReader as _, SerWriter as _, Series, TimeUnit,
};
use std::path::Path;
use tracing::debug;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Largest magnitude written back as an integer column.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Table {
    /// Converts a polars frame, cell by cell.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let values = (0..series.len())
                .map(|idx| series.get(idx).map(|av| to_value(&av)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            columns.push(TableColumn::new(column.name().as_str(), values));
        }
        Ok(Self::new(columns)?)
    }

    /// Builds a polars frame, one series per column typed by its inferred
    /// [`ValueType`]. Mixed columns are written as text.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns = self
            .columns()
            .iter()
            .map(to_series)
            .map(|series| series.map(Column::from))
            .collect::<Result<Vec<_>>>()?;
        Ok(DataFrame::new(columns)?)
    }
}

fn to_value(av: &AnyValue<'_>) -> Value {
    match av {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::text(*s),
        AnyValue::StringOwned(s) => Value::text(s.as_str()),
        AnyValue::Int32(n) => Value::Number(f64::from(*n)),
        AnyValue::Int64(n) => Value::Number(*n as f64),
        AnyValue::UInt32(n) => Value::Number(f64::from(*n)),
        AnyValue::UInt64(n) => Value::Number(*n as f64),
        AnyValue::Float32(n) => Value::Number(f64::from(*n)),
        AnyValue::Float64(n) => Value::Number(*n),
        AnyValue::Date(days) => date_from_days(*days).map_or(Value::Null, Value::Date),
        AnyValue::Datetime(ts, unit, _) => {
            datetime_from_timestamp(*ts, *unit).map_or(Value::Null, Value::DateTime)
        }
        other => Value::text(other.to_string()),
    }
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

fn datetime_from_timestamp(ts: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(ts)?,
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(ts)?,
        TimeUnit::Nanoseconds => DateTime::from_timestamp_nanos(ts),
    };
    Some(dt.naive_utc())
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER
}

fn to_series(column: &TableColumn) -> Result<Series> {
    let name = column.name();
    let values = column.values();
    let series = match column.value_type() {
        ValueType::Boolean => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        ValueType::Number => {
            let numbers: Vec<Option<f64>> = values.iter().map(Value::as_number).collect();
            if numbers.iter().flatten().all(|n| is_integral(*n)) {
                Series::new(
                    name.into(),
                    numbers
                        .iter()
                        .map(|n| n.map(|n| n as i64))
                        .collect::<Vec<_>>(),
                )
            } else {
                Series::new(name.into(), numbers)
            }
        }
        ValueType::Date if values.iter().all(|v| matches!(v, Value::Date(_) | Value::Null)) => {
            let days: Vec<Option<i32>> = values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some(d.num_days_from_ce() - EPOCH_DAYS_FROM_CE),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), days)
                .cast(&DataType::Date)
                .with_context(|| format!("Failed to build date column '{name}'"))?
        }
        ValueType::Date => {
            let millis: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.as_datetime().map(|dt| dt.and_utc().timestamp_millis()))
                .collect();
            Series::new(name.into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .with_context(|| format!("Failed to build datetime column '{name}'"))?
        }
        ValueType::Empty | ValueType::Text | ValueType::Mixed => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect::<Vec<_>>(),
        ),
    };
    Ok(series)
}

/// Reads a CSV file with a header row.
pub fn read_csv(path: &Path) -> Result<Table> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    debug!(rows = df.height(), columns = df.width(), "Read {}", path.display());
    Table::from_dataframe(&df)
}

/// Writes `table` as CSV with a header row, replacing any existing file.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut df = table.to_dataframe()?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    debug!(rows = df.height(), "Wrote {}", path.display());
    Ok(())
}
