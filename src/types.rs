//! Core instance-type model.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The runtime type of a JSON instance value.
///
/// `Integer` is a refinement of `Number`: a keyword declared for `number`
/// accepts integer instances, while one declared for `integer` rejects
/// non-integral numbers. The containment is one-directional and is applied
/// explicitly in [`TypeSet::admits`] and [`InstanceType::matches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl InstanceType {
    /// Parse a type name as it appears in a `type` keyword.
    ///
    /// Returns `None` for unknown names (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "null" => Some(InstanceType::Null),
            "boolean" => Some(InstanceType::Boolean),
            "integer" => Some(InstanceType::Integer),
            "number" => Some(InstanceType::Number),
            "string" => Some(InstanceType::String),
            "array" => Some(InstanceType::Array),
            "object" => Some(InstanceType::Object),
            _ => None,
        }
    }

    /// The lowercase keyword-form name of this type.
    pub fn name(&self) -> &'static str {
        match self {
            InstanceType::Null => "null",
            InstanceType::Boolean => "boolean",
            InstanceType::Integer => "integer",
            InstanceType::Number => "number",
            InstanceType::String => "string",
            InstanceType::Array => "array",
            InstanceType::Object => "object",
        }
    }

    /// Classify a JSON number, distinguishing integral values.
    pub fn of_number(n: &Number) -> Self {
        if n.is_i64() || n.is_u64() {
            return InstanceType::Integer;
        }
        match n.as_f64() {
            Some(f) if f.fract() == 0.0 => InstanceType::Integer,
            _ => InstanceType::Number,
        }
    }

    /// Whether an instance of type `self` satisfies a declaration of
    /// `declared`. Integer instances satisfy a `number` declaration.
    pub fn matches(&self, declared: InstanceType) -> bool {
        *self == declared || (*self == InstanceType::Integer && declared == InstanceType::Number)
    }
}

/// The set of instance types named by a `type` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSet(Vec<InstanceType>);

impl TypeSet {
    /// A set holding a single type.
    pub fn single(ty: InstanceType) -> Self {
        TypeSet(vec![ty])
    }

    /// A set from a list of types, order preserved for diagnostics.
    pub fn of(types: Vec<InstanceType>) -> Self {
        TypeSet(types)
    }

    /// Whether an instance of `ty` is admitted by this set, applying the
    /// integer-within-number containment.
    pub fn admits(&self, ty: InstanceType) -> bool {
        self.0.iter().any(|declared| ty.matches(*declared))
    }

    /// The declared type names, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(InstanceType::name).collect()
    }
}
