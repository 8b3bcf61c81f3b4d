//! Dynamic value domain used during evaluation.
//!
//! Every component evaluation produces a [`Value`], and the evaluation
//! context variables are a tree of them. Equality is structural: two values
//! compare equal only when both the shape and the contents match.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A numeric value, integer or floating point. The two do not compare
/// equal even when numerically equivalent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    /// The number as a list index, when it is a non-negative integer.
    pub fn as_index(&self) -> Option<u64> {
        match self {
            Number::Integer(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    /// Ordered field map. Both object literals and encoded config structs
    /// produce this variant.
    Object(BTreeMap<String, Value>),
    /// Opaque native handle. Capsules flow through the evaluator to a
    /// consumer but cannot be encoded back into the variable tree.
    Capsule(Capsule),
}

impl Value {
    /// Convenience constructor for an object value.
    pub fn object(fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Object(fields.into_iter().collect())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Name of the value's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Capsule(_) => "capsule",
        }
    }
}

/// An opaque typed handle participating in the value domain.
///
/// Capsules compare equal only when they are the same handle (pointer
/// identity), matching the "types and contents" rule for a type whose
/// contents are not structurally inspectable.
#[derive(Clone)]
pub struct Capsule {
    type_name: &'static str,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Capsule {
    pub fn new<T: Any + Send + Sync>(type_name: &'static str, value: T) -> Self {
        Self {
            type_name,
            handle: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }
}

impl PartialEq for Capsule {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.handle, &other.handle)
    }
}

impl fmt::Debug for Capsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capsule")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Errors from typed value conversion.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    /// The type has no representation in the encodable value domain.
    #[error("cannot encode {0} into the value domain")]
    Unencodable(&'static str),

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing required attribute {0:?}")]
    MissingField(String),

    #[error("unsupported attribute {0:?}")]
    UnknownField(String),

    /// A conversion error scoped to a named field.
    #[error("attribute {name:?}: {source}")]
    Field {
        name: String,
        #[source]
        source: Box<ValueError>,
    },
}

impl ValueError {
    /// Attach field context to an error.
    pub fn in_field(self, name: &str) -> ValueError {
        ValueError::Field {
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// The field name the error is scoped to, if any.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            ValueError::Field { name, .. } => Some(name),
            ValueError::MissingField(name) | ValueError::UnknownField(name) => Some(name),
            _ => None,
        }
    }
}
