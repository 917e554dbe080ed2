use serde_json::{Map, Number, Value};

use super::{Fields, is_operator_key};

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::Number((*n).into()),
            Literal::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    pub fn from_number(n: &Number) -> Self {
        match n.as_i64() {
            Some(i) => Literal::Int(i),
            None => Literal::Float(n.as_f64().unwrap_or(0.0)),
        }
    }
}

/// Operator object payload: `{"$gt": 5, "$lte": 9}`.
///
/// Opaque to the projector; never descended into.
pub type OperatorObject = Map<String, Value>;

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// String, number, bool or null.
    Literal(Literal),
    /// Map whose every key starts with `$`.
    Operator(OperatorObject),
    /// Array literal, kept as-is.
    Sequence(Vec<Value>),
    /// Nested document of predicates.
    Object(Fields),
}

impl Predicate {
    /// Convert a decoded JSON value.
    ///
    /// A non-empty object whose keys are all operator tags becomes an
    /// [`Predicate::Operator`]; any other object is descended into.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                if !map.is_empty() && map.keys().all(|k| is_operator_key(k)) {
                    Predicate::Operator(map)
                } else {
                    Predicate::Object(Self::fields_from_map(map))
                }
            }
            Value::Array(items) => Predicate::Sequence(items),
            Value::Null => Predicate::Literal(Literal::Null),
            Value::Bool(b) => Predicate::Literal(Literal::Bool(b)),
            Value::Number(n) => Predicate::Literal(Literal::from_number(&n)),
            Value::String(s) => Predicate::Literal(Literal::String(s)),
        }
    }

    /// Build the root filter object.
    ///
    /// The root is always an object, even for `{"$or": [...]}`.
    pub fn root(map: Map<String, Value>) -> Self {
        Predicate::Object(Self::fields_from_map(map))
    }

    fn fields_from_map(map: Map<String, Value>) -> Fields {
        map.into_iter()
            .map(|(k, v)| (k, Predicate::from_json(v)))
            .collect()
    }

    pub fn to_json(&self) -> Value {
        match self {
            Predicate::Literal(lit) => lit.to_json(),
            Predicate::Operator(map) => Value::Object(map.clone()),
            Predicate::Sequence(items) => Value::Array(items.clone()),
            Predicate::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Predicate::Literal(Literal::String(s.into()))
    }

    pub fn int(n: i64) -> Self {
        Predicate::Literal(Literal::Int(n))
    }

    pub fn empty_object() -> Self {
        Predicate::Object(Fields::new())
    }

    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            Predicate::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Predicate::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// `null`, `""`, `[]` or `{}`. Zero and `false` are not empty.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Predicate::Literal(Literal::Null) => true,
            Predicate::Literal(Literal::String(s)) => s.is_empty(),
            Predicate::Literal(_) => false,
            Predicate::Operator(map) => map.is_empty(),
            Predicate::Sequence(items) => items.is_empty(),
            Predicate::Object(fields) => fields.is_empty(),
        }
    }
}
