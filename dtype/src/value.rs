//! Literal values held by constant nodes.

use std::hash::{Hash, Hasher};
use std::mem::discriminant;

use crate::{HasPrimitiveType, PrimitiveType};

/// Literal value of one primitive type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Float(f32),
    Double(f64),
    Int(i32),
    Bool(bool),
    String(String),
}

impl Value {
    pub const fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Float(_) => PrimitiveType::Float,
            Self::Double(_) => PrimitiveType::Double,
            Self::Int(_) => PrimitiveType::Int,
            Self::Bool(_) => PrimitiveType::Bool,
            Self::String(_) => PrimitiveType::String,
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(f64::from(*v)),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    /// Bit-exact comparison, the equality used for pattern matching and deduplication.
    pub fn bit_eq(&self, other: &Self) -> bool {
        ValueHash(self.clone()) == ValueHash(other.clone())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v:?}f"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                let value = Value::$variant(v);
                debug_assert_eq!(value.primitive_type(), <$ty as HasPrimitiveType>::PRIMITIVE);
                value
            }
        })*
    };
}

impl_value_from! {
    f32 => Float,
    f64 => Double,
    i32 => Int,
    bool => Bool,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Wrapper giving [`Value`] bit-exact `Eq` and `Hash`.
///
/// Floats compare by their bit pattern, so `0.0` and `-0.0` are distinct and
/// `NaN` equals itself.
#[derive(Debug, Clone)]
pub struct ValueHash(pub Value);

impl PartialEq for ValueHash {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ValueHash {}

impl Hash for ValueHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Int(v) => v.hash(state),
            Value::Bool(v) => v.hash(state),
            Value::String(v) => v.hash(state),
        }
    }
}
