//! End-to-end properties of pipeline runs through the public API.

use sheetflow::operations::{
    Aggregate, AggregateFunction, ColumnArithmetic, Condition, ConvertDateFormat, FilterRows,
    Keep, MergeColumns, NormalizeText, Operator, RemoveDuplicates, TextMethod,
};
use sheetflow::pipeline::{Pipeline, RunStatus, StepError};
use sheetflow::table::{Table, Value};

fn people() -> Table {
    Table::from_rows(
        &["id", "name", "age", "city"],
        [
            (1, "Alice", 25, "NYC"),
            (2, "Bob", 30, "LA"),
            (2, "Bob", 30, "LA"),
            (3, "Charlie", 35, "NYC"),
            (4, "David", 28, "Chicago"),
            (5, "Eve", 32, "Boston"),
            (5, "Eve", 32, "Boston"),
        ]
        .into_iter()
        .map(|(id, name, age, city)| {
            vec![
                Value::from(id),
                Value::from(name),
                Value::from(age),
                Value::from(city),
            ]
        })
        .collect(),
    )
    .unwrap()
}

fn column(table: &Table, name: &str) -> Vec<Value> {
    table.column(name).unwrap().values().to_vec()
}

#[test]
fn test_runs_are_deterministic() {
    let pipeline = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .then(NormalizeText::new("name", TextMethod::Upper))
        .then(ColumnArithmetic::divide("age", "id", "ratio"))
        .then(Aggregate::new("ratio", AggregateFunction::Mean).grouped_by("city"));
    let input = people();

    let first = pipeline.run(&input);
    let second = pipeline.run(&input);

    assert_eq!(first.status(), second.status());
    assert_eq!(first.table(), second.table());
    assert_eq!(first.steps(), second.steps());
    assert_eq!(first, second);
    assert_eq!(input, people(), "input must not be modified");
}

#[test]
fn test_previews_are_repeatable_and_leave_input_alone() {
    let pipeline = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .then(ColumnArithmetic::divide("age", "id", "ratio"));
    let input = people();

    let first = pipeline.preview(&input, 2);
    let second = pipeline.preview(&input, 2);

    assert_eq!(first.table(), second.table());
    assert_eq!(first.steps(), second.steps());
    assert_eq!(first, second);
    assert_eq!(first.table().row_count(), 2);
    assert_eq!(first.total_rows(), 5);
    assert_eq!(input, people(), "preview must not modify the input");

    let full = pipeline.run(&input);
    assert_eq!(full.table().head(2), *first.table());
}

#[test]
fn test_remove_duplicates_is_idempotent() {
    let once = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .run(&people());
    let twice = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .then(RemoveDuplicates::new(None, Keep::First))
        .run(&people());

    assert_eq!(once.table(), twice.table());
    assert_eq!(twice.steps()[1].message, "0 duplicate rows removed");
}

#[test]
fn test_filter_preserves_relative_order() {
    let report = Pipeline::default()
        .then(FilterRows::new(Condition::new("age", Operator::GreaterOrEqual, 30)))
        .run(&people());
    let ids: Vec<Value> = column(report.table(), "id");
    assert_eq!(
        ids,
        [2, 2, 3, 5, 5].map(Value::from).to_vec(),
        "kept rows stay in input order"
    );
}

#[test]
fn test_numeric_operator_on_text_fails_before_apply() {
    let report = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .then(ColumnArithmetic::add("name", "age", "total"))
        .then(NormalizeText::new("city", TextMethod::Lower))
        .run(&people());

    assert_eq!(report.status(), RunStatus::Failure);
    assert_eq!(report.steps().len(), 2);
    let Some(StepError::Validation { errors }) = &report.steps()[1].error else {
        panic!("expected a validation failure");
    };
    assert_eq!(errors[0].column.as_deref(), Some("name"));
    assert!(!report.table().contains_column("total"));
    assert_eq!(report.table().row_count(), 5);
}

#[test]
fn test_partial_failure_is_isolated_to_bad_row() {
    let mut rows: Vec<Vec<Value>> = (0..100)
        .map(|i| {
            let date = if i == 37 {
                Value::from("not a date")
            } else {
                Value::text(format!("2024-01-{:02}", i % 28 + 1))
            };
            let region = if i % 2 == 0 { "north" } else { "south" };
            vec![Value::from(i), date, Value::from(region), Value::from(i)]
        })
        .collect();
    rows.push(rows[0].clone());
    rows.push(rows[1].clone());
    let table = Table::from_rows(&["id", "when", "region", "amount"], rows).unwrap();

    let report = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .then(ConvertDateFormat::new("when", "auto", "%d/%m/%Y"))
        .then(Aggregate::new("amount", AggregateFunction::Sum).grouped_by("region"))
        .run(&table);

    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(report.steps_applied(), 3);
    assert_eq!(report.warning_count(), 1);
    let warning = report.warnings().next().unwrap();
    assert_eq!(warning.row, 37);
    assert_eq!(warning.column, "when");
    assert_eq!(report.steps()[0].message, "2 duplicate rows removed");
    assert_eq!(report.steps()[1].message, "converted 99 of 100 dates");

    let output = report.output().unwrap();
    assert_eq!(column(output, "region"), vec![Value::from("north"), Value::from("south")]);
    assert_eq!(
        column(output, "amount_sum"),
        vec![Value::from(2450), Value::from(2500)]
    );
}

#[test]
fn test_failed_step_rolls_back_to_previous_output() {
    let deduped = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .run(&people());

    let report = Pipeline::default()
        .then(RemoveDuplicates::new(None, Keep::First))
        .then(MergeColumns::new(
            vec!["name".to_owned(), "city".to_owned()],
            "age",
            " ",
        ))
        .then(NormalizeText::new("name", TextMethod::Upper))
        .run(&people());

    assert_eq!(report.status(), RunStatus::Failure);
    assert_eq!(report.table(), deduped.table());
    assert_eq!(
        report.steps().iter().filter(|s| s.error.is_some()).count(),
        1
    );
    assert!(matches!(
        report.failed_step().and_then(|s| s.error.as_ref()),
        Some(StepError::Application { .. })
    ));
    assert!(report.summary().contains("step 2 (merge_columns) failed"));
}

#[test]
fn test_divide_scenarios() {
    let clean = Table::from_rows(
        &["price", "cost"],
        vec![
            vec![Value::from(10), Value::from(2)],
            vec![Value::from(0), Value::from(3)],
            vec![Value::from(5), Value::from(1)],
        ],
    )
    .unwrap();
    let pipeline = Pipeline::default().then(ColumnArithmetic::divide("price", "cost", "ratio"));

    let report = pipeline.run(&clean);
    assert_eq!(report.status(), RunStatus::Success);
    assert_eq!(
        column(report.table(), "ratio"),
        [5, 0, 5].map(Value::from).to_vec()
    );

    let with_zero = Table::from_rows(
        &["price", "cost"],
        vec![
            vec![Value::from(10), Value::from(2)],
            vec![Value::from(5), Value::from(0)],
            vec![Value::from(5), Value::from(1)],
        ],
    )
    .unwrap();
    let report = pipeline.run(&with_zero);
    assert_eq!(report.status(), RunStatus::PartialFailure);
    assert_eq!(
        column(report.table(), "ratio"),
        vec![Value::from(5), Value::from(f64::NAN), Value::from(5)]
    );
    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].row, 1);
}

#[test]
fn test_preview_limits_rows_but_reports_total() {
    let pipeline = Pipeline::default().then(FilterRows::new(Condition::new(
        "city",
        Operator::NotEquals,
        "Chicago",
    )));
    let report = pipeline.preview(&people(), 2);
    assert_eq!(report.table().row_count(), 2);
    assert_eq!(report.total_rows(), 6);
    assert_eq!(report.preview_limit(), Some(2));
    assert_eq!(report.steps()[0].rows_after, 6);
}
