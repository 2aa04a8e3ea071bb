//! Primitive types, data types and literal values for the sona program graph.
//!
//! Every output port in the program graph carries a [`DataType`]: the
//! [`PrimitiveType`] of the value it produces, the upsample factor it is
//! computed at, and whether it is an array. Constant nodes hold a [`Value`].

pub mod ext;
pub mod value;


pub use ext::HasPrimitiveType;
pub use value::{Value, ValueHash};

/// Base value types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumIter, strum::EnumCount, strum::VariantArray)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveType {
    Float,
    Double,
    Int,
    Bool,
    String,
}

impl PrimitiveType {
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Float | Self::Double | Self::Int)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

/// Type of a value flowing through an output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataType {
    pub primitive: PrimitiveType,
    /// Rate multiplier relative to the base sample rate. Always at least 1.
    pub upsample_factor: u32,
    pub is_array: bool,
}

impl DataType {
    /// Scalar type at the base sample rate.
    pub const fn scalar(primitive: PrimitiveType) -> Self {
        Self { primitive, upsample_factor: 1, is_array: false }
    }

    /// Array type at the base sample rate.
    pub const fn array(primitive: PrimitiveType) -> Self {
        Self { primitive, upsample_factor: 1, is_array: true }
    }

    pub const fn with_upsample_factor(self, upsample_factor: u32) -> Self {
        assert!(upsample_factor > 0, "upsample factor must be positive");
        Self { upsample_factor, ..self }
    }

    pub const fn as_array(self) -> Self {
        Self { is_array: true, ..self }
    }

    /// Type of a single element of this (possibly array) type.
    pub const fn element(self) -> Self {
        Self { is_array: false, ..self }
    }
}

impl From<PrimitiveType> for DataType {
    fn from(primitive: PrimitiveType) -> Self {
        Self::scalar(primitive)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.primitive)?;
        if self.upsample_factor != 1 {
            write!(f, "@{}x", self.upsample_factor)?;
        }
        if self.is_array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
