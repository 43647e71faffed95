//! Operation catalog: name to constructor dispatch.
//!
//! A [`Catalog`] maps operation names to their [`OperationSchema`] and a constructor.
//! Parameter sets are checked against the schema before the constructor runs, so a
//! malformed step is rejected before any operation object exists.
//!
//! There is no process-wide registry. Build one with [`Catalog::standard`], extend it
//! with [`Catalog::register`] if needed, then share it by reference.
//!
//! ```
//! use sheetflow::catalog::Catalog;
//! use serde_json::json;
//!
//! let catalog = Catalog::standard();
//! let params = json!({"column": "name", "method": "upper"});
//! let op = catalog.construct("normalize_text", params.as_object().unwrap())?;
//! assert_eq!(op.name(), "normalize_text");
//! # Ok::<(), sheetflow::error::CatalogError>(())
//! ```

pub mod params;

pub use params::{OperationSchema, ParamKind, ParamSpec};

use crate::error::CatalogError;
use crate::operations::{
    Aggregate, ArithmeticKind, ColumnArithmetic, ConditionalCalculation, ConvertDateFormat,
    DropColumns, FilterRows, MergeColumns, NormalizeText, Operation, Params, PercentageChange,
    RemoveDuplicates, RenameColumns, ReplaceValues,
};
use crate::pipeline::{Pipeline, PipelineSpec, SPEC_VERSION};
use std::collections::BTreeMap;
use tracing::debug;

/// Builds an operation from a parameter set that already matches its schema.
pub type Constructor = fn(&Params) -> Result<Box<dyn Operation>, Vec<String>>;

#[derive(Debug, Clone)]
struct Entry {
    schema: OperationSchema,
    constructor: Constructor,
}

/// Registry of the operations a pipeline may use.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<&'static str, Entry>,
}

fn boxed<T: Operation + 'static>(
    op: Result<T, Vec<String>>,
) -> Result<Box<dyn Operation>, Vec<String>> {
    op.map(|op| Box::new(op) as Box<dyn Operation>)
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in operation.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.register(RemoveDuplicates::schema(), |p| {
            boxed(RemoveDuplicates::from_parameters(p))
        });
        catalog.register(FilterRows::schema(), |p| boxed(FilterRows::from_parameters(p)));
        catalog.register(ReplaceValues::schema(), |p| {
            boxed(ReplaceValues::from_parameters(p))
        });
        catalog.register(MergeColumns::schema(), |p| {
            boxed(MergeColumns::from_parameters(p))
        });
        catalog.register(NormalizeText::schema(), |p| {
            boxed(NormalizeText::from_parameters(p))
        });
        catalog.register(ConvertDateFormat::schema(), |p| {
            boxed(ConvertDateFormat::from_parameters(p))
        });
        catalog.register(ColumnArithmetic::schema(ArithmeticKind::Add), |p| {
            boxed(ColumnArithmetic::from_parameters(ArithmeticKind::Add, p))
        });
        catalog.register(ColumnArithmetic::schema(ArithmeticKind::Subtract), |p| {
            boxed(ColumnArithmetic::from_parameters(ArithmeticKind::Subtract, p))
        });
        catalog.register(ColumnArithmetic::schema(ArithmeticKind::Multiply), |p| {
            boxed(ColumnArithmetic::from_parameters(ArithmeticKind::Multiply, p))
        });
        catalog.register(ColumnArithmetic::schema(ArithmeticKind::Divide), |p| {
            boxed(ColumnArithmetic::from_parameters(ArithmeticKind::Divide, p))
        });
        catalog.register(PercentageChange::schema(), |p| {
            boxed(PercentageChange::from_parameters(p))
        });
        catalog.register(Aggregate::schema(), |p| boxed(Aggregate::from_parameters(p)));
        catalog.register(ConditionalCalculation::schema(), |p| {
            boxed(ConditionalCalculation::from_parameters(p))
        });
        catalog.register(DropColumns::schema(), |p| boxed(DropColumns::from_parameters(p)));
        catalog.register(RenameColumns::schema(), |p| {
            boxed(RenameColumns::from_parameters(p))
        });
        catalog
    }

    /// Adds (or replaces) the operation named by `schema.name`.
    pub fn register(&mut self, schema: OperationSchema, constructor: Constructor) {
        self.entries.insert(
            schema.name,
            Entry {
                schema,
                constructor,
            },
        );
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Registered schemas, sorted by name.
    pub fn schemas(&self) -> Vec<&OperationSchema> {
        self.entries.values().map(|e| &e.schema).collect()
    }

    pub fn schema(&self, name: &str) -> Option<&OperationSchema> {
        self.entries.get(name).map(|e| &e.schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks `params` against the schema of `name` and builds the operation.
    pub fn construct(&self, name: &str, params: &Params) -> Result<Box<dyn Operation>, CatalogError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CatalogError::UnknownOperation {
                name: name.to_owned(),
            })?;

        let problems = entry.schema.check(params);
        if !problems.is_empty() {
            return Err(CatalogError::invalid(name, problems));
        }

        // Optional parameters given as null fall back to their defaults.
        let params: Params = params
            .iter()
            .filter(|(key, value)| {
                !(value.is_null()
                    && entry
                        .schema
                        .param(key)
                        .is_some_and(|p| !p.required && p.kind != ParamKind::Scalar))
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let op = (entry.constructor)(&params).map_err(|problems| CatalogError::invalid(name, problems))?;
        debug!(operation = name, "Constructed {}", op.describe());
        Ok(op)
    }

    /// Builds every step of `spec`. The error names the first failing step.
    pub fn build_pipeline(&self, spec: &PipelineSpec) -> Result<Pipeline, CatalogError> {
        if spec.version != SPEC_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: spec.version.clone(),
                expected: SPEC_VERSION,
            });
        }
        let steps = spec
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                self.construct(&step.op, &step.params)
                    .map_err(|source| CatalogError::Step {
                        index,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Pipeline::new(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StepSpec;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_standard_catalog_names() {
        let catalog = Catalog::standard();
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names.len(), 15);
        assert!(names.windows(2).all(|w| w[0] < w[1]));
        for name in ["remove_duplicates", "divide_columns", "conditional_calculation"] {
            assert!(catalog.contains(name), "{name}");
        }
    }

    #[test]
    fn test_unknown_operation() {
        let err = Catalog::standard()
            .construct("explode", &Params::new())
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownOperation {
                name: "explode".to_owned()
            }
        );
    }

    #[test]
    fn test_invalid_parameters_before_construction() {
        let err = Catalog::standard()
            .construct("merge_columns", &params(json!({"columns": ["only_one"]})))
            .unwrap_err();
        let CatalogError::InvalidParameters { operation, problems } = err else {
            panic!("expected InvalidParameters");
        };
        assert_eq!(operation, "merge_columns");
        assert!(problems[0].contains("at least two"));

        let err = Catalog::standard()
            .construct("aggregate", &params(json!({"column": "age", "function": "mode", "x": 1})))
            .unwrap_err();
        let CatalogError::InvalidParameters { problems, .. } = err else {
            panic!("expected InvalidParameters");
        };
        assert_eq!(problems.len(), 2, "{problems:?}");
    }

    #[test]
    fn test_text_operators_reject_null_value() {
        for operator in ["contains", "not_contains"] {
            let err = Catalog::standard()
                .construct(
                    "filter_rows",
                    &params(json!({"condition": {"column": "name", "operator": operator, "value": null}})),
                )
                .unwrap_err();
            let CatalogError::InvalidParameters { problems, .. } = err else {
                panic!("expected InvalidParameters for {operator}");
            };
            assert!(problems[0].contains("text or number"), "{problems:?}");
        }
        assert!(
            Catalog::standard()
                .construct(
                    "filter_rows",
                    &params(json!({"condition": {"column": "name", "operator": "contains", "value": "li"}})),
                )
                .is_ok()
        );
    }

    #[test]
    fn test_null_optional_means_default() {
        let op = Catalog::standard()
            .construct(
                "remove_duplicates",
                &params(json!({"columns": null, "keep": null})),
            )
            .unwrap();
        assert_eq!(op.parameters(), params(json!({"keep": "first"})));
    }

    #[test]
    fn test_parameters_round_trip() {
        let catalog = Catalog::standard();
        let original = params(json!({
            "condition": {"column": "age", "operator": ">=", "value": 30},
            "true_value": {"column": "name"},
            "false_value": "n/a",
            "result_name": "label"
        }));
        let op = catalog.construct("conditional_calculation", &original).unwrap();
        let rebuilt = catalog.construct(op.name(), &op.parameters()).unwrap();
        assert_eq!(rebuilt.parameters(), original);
    }

    #[test]
    fn test_build_pipeline_reports_step() {
        let spec = PipelineSpec::new(
            "demo",
            vec![
                StepSpec::new("remove_duplicates", Params::new()),
                StepSpec::new("divide_columns", params(json!({"left": "a"}))),
            ],
        );
        let err = Catalog::standard().build_pipeline(&spec).unwrap_err();
        assert!(matches!(err, CatalogError::Step { index: 1, .. }));
        assert!(err.to_string().starts_with("Step 2:"));
    }

    #[test]
    fn test_build_pipeline_rejects_version() {
        let mut spec = PipelineSpec::new("demo", Vec::new());
        spec.version = "0".to_owned();
        assert!(matches!(
            Catalog::standard().build_pipeline(&spec),
            Err(CatalogError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_schemas_serialize() {
        let catalog = Catalog::standard();
        let json = serde_json::to_value(catalog.schemas()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), catalog.len());
        assert_eq!(json[0]["name"], "add_columns");
    }
}
