//! Validation of caller-supplied arguments against an [`InputSchema`].

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{Constraint, FieldType, InputSchema};

/// Reasons a raw input was rejected.
///
/// Messages are phrased so they can be handed back to a language model as the
/// tool output without further formatting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The input was not a JSON object.
    #[error("arguments must be a JSON object, got {actual}")]
    NotAnObject {
        /// JSON type of the supplied value.
        actual: &'static str,
    },

    /// A required field was absent or `null`.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A value could not be coerced to the declared type.
    #[error("field `{field}` expected {expected} but got {actual}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Declared type.
        expected: FieldType,
        /// JSON type actually supplied.
        actual: &'static str,
    },

    /// A coerced value broke a schema constraint.
    #[error("field `{field}` violates constraint {constraint}")]
    ConstraintViolation {
        /// Field name.
        field: String,
        /// The constraint that failed.
        constraint: Constraint,
    },
}

impl ValidationError {
    /// Name of the offending field, when the error concerns one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAnObject { .. } => None,
            Self::MissingField { field }
            | Self::TypeMismatch { field, .. }
            | Self::ConstraintViolation { field, .. } => Some(field),
        }
    }
}

/// Arguments that passed schema validation.
///
/// Only declared fields are present, each coerced to its declared type.
/// There is no public constructor: the only way to obtain one is
/// [`InputSchema::validate`].
///
/// ```compile_fail
/// let _ = capability_primitives::ValidatedInput::default();
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedInput {
    fields: Map<String, Value>,
}

impl ValidatedInput {
    /// Returns the raw value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a string field.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns an integer field.
    #[must_use]
    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Returns a numeric field.
    #[must_use]
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Returns a boolean field.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Returns `true` when the field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Converts into a JSON object value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl InputSchema {
    /// Validates `raw` field by field in declaration order.
    ///
    /// `null` is treated as an empty object. Undeclared fields are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedInput, ValidationError> {
        let empty = Map::new();
        let supplied = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ValidationError::NotAnObject {
                    actual: json_type(other),
                });
            }
        };

        let mut fields = Map::new();
        for spec in self.fields() {
            let name = spec.name();
            let Some(value) = supplied.get(name).filter(|value| !value.is_null()) else {
                if spec.is_required() {
                    return Err(ValidationError::MissingField { field: name.into() });
                }
                if let Some(default) = spec.declared_default() {
                    fields.insert(name.to_owned(), default.clone());
                }
                continue;
            };

            let coerced =
                spec.field_type()
                    .coerce(value)
                    .ok_or_else(|| ValidationError::TypeMismatch {
                        field: name.into(),
                        expected: spec.field_type(),
                        actual: json_type(value),
                    })?;

            if let Some(constraint) = spec.first_violation(&coerced) {
                return Err(ValidationError::ConstraintViolation {
                    field: name.into(),
                    constraint: constraint.clone(),
                });
            }

            fields.insert(name.to_owned(), coerced);
        }

        Ok(ValidatedInput { fields })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::FieldSpec;

    fn schema() -> InputSchema {
        InputSchema::builder()
            .field(FieldSpec::string("query").required().min_length(1))
            .field(
                FieldSpec::integer("max_results")
                    .minimum(10.0)
                    .maximum(100.0)
                    .default_value(10),
            )
            .field(FieldSpec::boolean("dry_run"))
            .build()
            .expect("schema")
    }

    #[test]
    fn extra_fields_are_stripped() {
        let validated = schema()
            .validate(&json!({ "query": "hello", "session": "abc", "debug": true }))
            .expect("valid");

        assert_eq!(validated.str("query"), Some("hello"));
        assert!(!validated.contains("session"));
        assert!(!validated.contains("debug"));
        assert_eq!(validated.into_value(), json!({ "query": "hello", "max_results": 10 }));
    }

    #[test]
    fn integers_above_i64_are_type_mismatches() {
        for raw in [json!(9_223_372_036_854_775_808_u64), json!("9223372036854775808")] {
            let err = schema()
                .validate(&json!({ "query": "hi", "max_results": raw }))
                .expect_err("out of range");
            assert!(matches!(
                err,
                ValidationError::TypeMismatch { ref field, expected: FieldType::Integer, .. }
                    if field == "max_results"
            ));
        }
    }

    #[test]
    fn missing_required_field() {
        let err = schema().validate(&json!({})).expect_err("missing");
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "query".into()
            }
        );

        let err = schema()
            .validate(&json!({ "query": null }))
            .expect_err("null counts as missing");
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn type_mismatch_reports_both_types() {
        let err = schema()
            .validate(&json!({ "query": 12 }))
            .expect_err("number for string");
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                field: "query".into(),
                expected: FieldType::String,
                actual: "integer",
            }
        );
        assert_eq!(err.to_string(), "field `query` expected string but got integer");
    }

    #[test]
    fn constraint_violation_names_constraint() {
        let err = schema()
            .validate(&json!({ "query": "" }))
            .expect_err("empty query");
        match err {
            ValidationError::ConstraintViolation { field, constraint } => {
                assert_eq!(field, "query");
                assert_eq!(constraint.to_string(), "min_length=1");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = schema()
            .validate(&json!({ "query": "x", "max_results": 500 }))
            .expect_err("above maximum");
        assert!(matches!(
            err,
            ValidationError::ConstraintViolation { constraint: Constraint::Maximum(_), .. }
        ));
    }

    #[test]
    fn lax_coercion_applies() {
        let validated = schema()
            .validate(&json!({ "query": "x", "max_results": "25", "dry_run": "true" }))
            .expect("coerced");
        assert_eq!(validated.i64("max_results"), Some(25));
        assert_eq!(validated.bool("dry_run"), Some(true));
    }

    #[test]
    fn non_object_input_rejected() {
        let err = schema().validate(&json!(["query"])).expect_err("array");
        assert_eq!(err, ValidationError::NotAnObject { actual: "array" });
        assert_eq!(err.field(), None);
    }

    #[test]
    fn null_input_treated_as_empty() {
        let validated = InputSchema::empty().validate(&Value::Null).expect("empty");
        assert!(validated.is_empty());
    }
}
