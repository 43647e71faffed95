//! Static pipeline validation.
//!
//! Checks a whole chain against an input schema before any data is read, by threading
//! each step's [`Operation::output_schema`] into the next step's
//! [`Operation::validate`].

use crate::error::ValidationError;
use crate::operations::Operation;
use crate::table::Schema;

/// Validates every step against the schema it would receive.
///
/// Errors from all steps are collected; a failing step still passes its best-effort
/// output schema on, so later problems are reported in the same pass.
pub fn check_pipeline(steps: &[Box<dyn Operation>], input: &Schema) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut schema = input.clone();

    for (idx, step) in steps.iter().enumerate() {
        errors.extend(step.validate(&schema).into_iter().map(|e| e.at_step(idx)));
        schema = step.output_schema(&schema);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::test_support::people;
    use crate::operations::{
        Aggregate, AggregateFunction, ColumnArithmetic, DropColumns, FilterRows, Operator,
        RenameColumns,
    };
    use crate::operations::Condition;
    use std::collections::BTreeMap;

    fn boxed(op: impl Operation + 'static) -> Box<dyn Operation> {
        Box::new(op)
    }

    #[test]
    fn test_valid_chain() {
        let steps = vec![
            boxed(ColumnArithmetic::multiply("age", "id", "score")),
            boxed(FilterRows::new(Condition::new("score", Operator::GreaterThan, 50))),
            boxed(Aggregate::new("score", AggregateFunction::Sum).grouped_by("city")),
        ];
        assert!(check_pipeline(&steps, &people().schema()).is_empty());
    }

    #[test]
    fn test_schema_threads_through_renames_and_drops() {
        let steps = vec![
            boxed(RenameColumns::new(BTreeMap::from([(
                "age".to_owned(),
                "years".to_owned(),
            )]))),
            boxed(DropColumns::new(vec!["city".to_owned()])),
            boxed(FilterRows::new(Condition::new("age", Operator::GreaterThan, 30))),
            boxed(FilterRows::new(Condition::new("city", Operator::Equals, "LA"))),
        ];
        let errors = check_pipeline(&steps, &people().schema());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].step, Some(2));
        assert_eq!(errors[1].step, Some(3));
        assert_eq!(
            errors[0].to_string(),
            "Step 3 (filter_rows): column 'age' does not exist"
        );
    }

    #[test]
    fn test_aggregate_replaces_schema() {
        let steps = vec![
            boxed(Aggregate::new("age", AggregateFunction::Mean).grouped_by("city")),
            boxed(FilterRows::new(Condition::new("name", Operator::Equals, "Bob"))),
        ];
        let errors = check_pipeline(&steps, &people().schema());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].column.as_deref(), Some("name"));
    }
}
