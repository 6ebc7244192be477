//! Typed input schemas for capabilities.
//!
//! A schema is an ordered set of [`FieldSpec`]s. It is checked for internal
//! consistency when built, so a descriptor carrying a schema can never fail at
//! call time because of a malformed schema.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

const I64_UPPER_EXCLUSIVE: f64 = 9_223_372_036_854_775_808.0;

/// Primitive type accepted for a schema field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Finite floating point number.
    Number,
    /// `true` or `false`.
    Boolean,
}

impl FieldType {
    /// Name used in JSON-Schema output and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }

    /// Coerces a JSON value to this type, returning `None` when impossible.
    pub(crate) fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::String, Value::String(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Number, Value::Number(_)) => Some(value.clone()),
            (Self::Integer, Value::Number(number)) => {
                if let Some(int) = number.as_i64() {
                    return Some(Value::from(int));
                }
                let float = number.as_f64()?;
                // 2^63 is exactly representable while i64::MAX is not, so the
                // upper bound must be exclusive.
                #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
                let whole = (float.fract() == 0.0
                    && float >= i64::MIN as f64
                    && float < I64_UPPER_EXCLUSIVE)
                    .then_some(float as i64)?;
                Some(Value::from(whole))
            }
            (Self::Integer, Value::String(text)) => {
                text.trim().parse::<i64>().ok().map(Value::from)
            }
            (Self::Number, Value::String(text)) => {
                let parsed = text.trim().parse::<f64>().ok()?;
                serde_json::Number::from_f64(parsed).map(Value::Number)
            }
            (Self::Boolean, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint applied to a field after type coercion.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Constraint {
    /// Minimum number of characters in a string.
    MinLength(usize),
    /// Maximum number of characters in a string.
    MaxLength(usize),
    /// Inclusive lower bound for numeric fields.
    Minimum(f64),
    /// Inclusive upper bound for numeric fields.
    Maximum(f64),
    /// String must equal one of the listed values.
    OneOf(Vec<String>),
}

impl Constraint {
    fn applies_to(&self, field_type: FieldType) -> bool {
        match self {
            Self::MinLength(_) | Self::MaxLength(_) | Self::OneOf(_) => {
                field_type == FieldType::String
            }
            Self::Minimum(_) | Self::Maximum(_) => field_type.is_numeric(),
        }
    }

    /// Returns `true` when the (already coerced) value satisfies the constraint.
    pub(crate) fn is_satisfied_by(&self, value: &Value) -> bool {
        match self {
            Self::MinLength(min) => value
                .as_str()
                .is_some_and(|text| text.chars().count() >= *min),
            Self::MaxLength(max) => value
                .as_str()
                .is_some_and(|text| text.chars().count() <= *max),
            Self::Minimum(min) => value.as_f64().is_some_and(|number| number >= *min),
            Self::Maximum(max) => value.as_f64().is_some_and(|number| number <= *max),
            Self::OneOf(options) => value
                .as_str()
                .is_some_and(|text| options.iter().any(|option| option == text)),
        }
    }

    fn write_json_schema(&self, target: &mut Map<String, Value>) {
        let (key, value) = match self {
            Self::MinLength(min) => ("minLength", json!(min)),
            Self::MaxLength(max) => ("maxLength", json!(max)),
            Self::Minimum(min) => ("minimum", json!(min)),
            Self::Maximum(max) => ("maximum", json!(max)),
            Self::OneOf(options) => ("enum", json!(options)),
        };
        target.insert(key.to_owned(), value);
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength(min) => write!(f, "min_length={min}"),
            Self::MaxLength(max) => write!(f, "max_length={max}"),
            Self::Minimum(min) => write!(f, "minimum={min}"),
            Self::Maximum(max) => write!(f, "maximum={max}"),
            Self::OneOf(options) => write!(f, "one_of=[{}]", options.join("|")),
        }
    }
}

/// Declaration of a single input field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<Constraint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

impl FieldSpec {
    /// Declares an optional field of the supplied type.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
            constraints: Vec::new(),
            default: None,
        }
    }

    /// Declares an optional string field.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Declares an optional integer field.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// Declares an optional floating point field.
    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Declares an optional boolean field.
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the description shown to orchestrators.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Shorthand for [`Constraint::MinLength`].
    #[must_use]
    pub fn min_length(self, min: usize) -> Self {
        self.constraint(Constraint::MinLength(min))
    }

    /// Shorthand for [`Constraint::MaxLength`].
    #[must_use]
    pub fn max_length(self, max: usize) -> Self {
        self.constraint(Constraint::MaxLength(max))
    }

    /// Shorthand for [`Constraint::Minimum`].
    #[must_use]
    pub fn minimum(self, min: f64) -> Self {
        self.constraint(Constraint::Minimum(min))
    }

    /// Shorthand for [`Constraint::Maximum`].
    #[must_use]
    pub fn maximum(self, max: f64) -> Self {
        self.constraint(Constraint::Maximum(max))
    }

    /// Value used when an optional field is absent.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared primitive type.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Whether the field must be supplied.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Optional description.
    #[must_use]
    pub fn field_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Constraints in declaration order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Default applied when the field is absent.
    #[must_use]
    pub fn declared_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub(crate) fn first_violation(&self, value: &Value) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|constraint| !constraint.is_satisfied_by(value))
    }

    fn check(mut self) -> Result<Self> {
        let name = self.name.clone();
        if name.trim().is_empty() {
            return Err(Error::schema("field name cannot be empty"));
        }

        for constraint in &self.constraints {
            if !constraint.applies_to(self.field_type) {
                return Err(Error::schema(format!(
                    "constraint {constraint} cannot apply to {} field `{name}`",
                    self.field_type
                )));
            }
        }

        for constraint in &self.constraints {
            if let Constraint::Minimum(bound) | Constraint::Maximum(bound) = constraint {
                if !bound.is_finite() {
                    return Err(Error::schema(format!(
                        "field `{name}` has a non-finite bound in {constraint}"
                    )));
                }
            }
        }

        let bound = |pick: fn(&Constraint) -> Option<f64>| {
            self.constraints.iter().filter_map(pick).next()
        };
        #[allow(clippy::cast_precision_loss)]
        let min_len = bound(|c| match c {
            Constraint::MinLength(n) => Some(*n as f64),
            _ => None,
        });
        #[allow(clippy::cast_precision_loss)]
        let max_len = bound(|c| match c {
            Constraint::MaxLength(n) => Some(*n as f64),
            _ => None,
        });
        let min = bound(|c| match c {
            Constraint::Minimum(n) => Some(*n),
            _ => None,
        });
        let max = bound(|c| match c {
            Constraint::Maximum(n) => Some(*n),
            _ => None,
        });
        for (lower, upper) in [(min_len, max_len), (min, max)] {
            if let (Some(lower), Some(upper)) = (lower, upper) {
                if lower > upper {
                    return Err(Error::schema(format!(
                        "field `{name}` has a lower bound above its upper bound"
                    )));
                }
            }
        }

        if let Some(default) = self.default.take() {
            if self.required {
                return Err(Error::schema(format!(
                    "required field `{name}` cannot declare a default"
                )));
            }
            let coerced = self.field_type.coerce(&default).ok_or_else(|| {
                Error::schema(format!(
                    "default for `{name}` is not a valid {}",
                    self.field_type
                ))
            })?;
            if let Some(constraint) = self.first_violation(&coerced) {
                return Err(Error::schema(format!(
                    "default for `{name}` violates {constraint}"
                )));
            }
            self.default = Some(coerced);
        }

        Ok(self)
    }

    fn to_json_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".into(), json!(self.field_type.as_str()));
        if let Some(description) = &self.description {
            property.insert("description".into(), json!(description));
        }
        if let Some(default) = &self.default {
            property.insert("default".into(), default.clone());
        }
        for constraint in &self.constraints {
            constraint.write_json_schema(&mut property);
        }
        Value::Object(property)
    }
}

/// Ordered, internally consistent set of input fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    /// Starts building a schema.
    #[must_use]
    pub fn builder() -> InputSchemaBuilder {
        InputSchemaBuilder { fields: Vec::new() }
    }

    /// Schema that accepts no fields; any supplied fields are dropped.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Renders the schema as a JSON-Schema object for LLM tool catalogs.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(FieldSpec::name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Builder for [`InputSchema`].
#[derive(Debug)]
pub struct InputSchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl InputSchemaBuilder {
    /// Appends a field declaration.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Finalises the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSchema`] for empty or duplicate field names,
    /// constraints that do not fit the field type, inverted bounds, or
    /// defaults that are invalid or attached to required fields.
    pub fn build(self) -> Result<InputSchema> {
        let mut seen = BTreeSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let field = field.check()?;
            if !seen.insert(field.name.clone()) {
                return Err(Error::schema(format!(
                    "field `{}` declared more than once",
                    field.name
                )));
            }
            fields.push(field);
        }
        Ok(InputSchema { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_schema() -> InputSchema {
        InputSchema::builder()
            .field(
                FieldSpec::string("query")
                    .required()
                    .description("The text for the tweet.")
                    .min_length(1)
                    .max_length(280),
            )
            .field(
                FieldSpec::integer("max_results")
                    .minimum(10.0)
                    .maximum(100.0)
                    .default_value(10),
            )
            .build()
            .expect("schema")
    }

    #[test]
    fn constraint_display_matches_wire_form() {
        assert_eq!(Constraint::MinLength(1).to_string(), "min_length=1");
        assert_eq!(Constraint::Maximum(100.0).to_string(), "maximum=100");
        assert_eq!(
            Constraint::OneOf(vec!["a".into(), "b".into()]).to_string(),
            "one_of=[a|b]"
        );
    }

    #[test]
    fn json_schema_rendering() {
        let rendered = query_schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["query"]));
        assert_eq!(rendered["properties"]["query"]["minLength"], 1);
        assert_eq!(rendered["properties"]["query"]["maxLength"], 280);
        assert_eq!(rendered["properties"]["max_results"]["default"], 10);
        assert_eq!(rendered["properties"]["max_results"]["type"], "integer");
    }

    #[test]
    fn duplicate_fields_rejected() {
        let err = InputSchema::builder()
            .field(FieldSpec::string("query"))
            .field(FieldSpec::integer("query"))
            .build()
            .expect_err("duplicate");
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn mismatched_constraint_rejected() {
        let err = InputSchema::builder()
            .field(FieldSpec::integer("count").min_length(2))
            .build()
            .expect_err("min_length on integer");
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let err = InputSchema::builder()
            .field(FieldSpec::string("q").min_length(5).max_length(2))
            .build()
            .expect_err("inverted");
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn defaults_are_checked() {
        let err = InputSchema::builder()
            .field(FieldSpec::integer("n").maximum(5.0).default_value(9))
            .build()
            .expect_err("default above maximum");
        assert!(matches!(err, Error::InvalidSchema { .. }));

        let err = InputSchema::builder()
            .field(FieldSpec::string("q").required().default_value("x"))
            .build()
            .expect_err("required with default");
        assert!(matches!(err, Error::InvalidSchema { .. }));

        let schema = InputSchema::builder()
            .field(FieldSpec::integer("n").default_value("7"))
            .build()
            .expect("string default is coerced");
        assert_eq!(schema.field("n").and_then(FieldSpec::declared_default), Some(&json!(7)));
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(FieldType::Integer.coerce(&json!(3)), Some(json!(3)));
        assert_eq!(FieldType::Integer.coerce(&json!(3.0)), Some(json!(3)));
        assert_eq!(FieldType::Integer.coerce(&json!(" 42 ")), Some(json!(42)));
        assert_eq!(FieldType::Integer.coerce(&json!(3.5)), None);
        assert_eq!(FieldType::Integer.coerce(&json!(true)), None);
    }

    #[test]
    fn integer_coercion_rejects_values_beyond_i64() {
        assert_eq!(
            FieldType::Integer.coerce(&json!(i64::MAX)),
            Some(json!(i64::MAX))
        );
        assert_eq!(FieldType::Integer.coerce(&json!(9_223_372_036_854_775_808_u64)), None);
        assert_eq!(FieldType::Integer.coerce(&json!(u64::MAX)), None);
        assert_eq!(FieldType::Integer.coerce(&json!(-9_223_372_036_854_775_808.0)), Some(json!(i64::MIN)));
        assert_eq!(FieldType::Integer.coerce(&json!(1e19)), None);
    }

    #[test]
    fn non_finite_bounds_are_rejected() {
        for spec in [
            FieldSpec::number("ratio").minimum(f64::NAN),
            FieldSpec::number("ratio").maximum(f64::INFINITY),
            FieldSpec::integer("count").minimum(f64::NEG_INFINITY),
        ] {
            let err = InputSchema::builder()
                .field(spec)
                .build()
                .expect_err("non-finite bound");
            assert!(matches!(err, Error::InvalidSchema { .. }));
        }
    }

    #[test]
    fn string_is_not_coerced_from_numbers() {
        assert_eq!(FieldType::String.coerce(&json!(5)), None);
        assert_eq!(FieldType::Boolean.coerce(&json!("TRUE")), Some(json!(true)));
        assert_eq!(FieldType::Number.coerce(&json!("1.5")), Some(json!(1.5)));
        assert_eq!(FieldType::Number.coerce(&json!("NaN")), None);
    }
}
