use super::*;

pub trait HasPrimitiveType {
    const PRIMITIVE: PrimitiveType;
}

macro_rules! impl_primitive_ext {
    ($($ty:ty => $primitive:expr),* $(,)?) => {
        $(impl HasPrimitiveType for $ty { const PRIMITIVE: PrimitiveType = $primitive; })*
    };
}

impl_primitive_ext! {
    f32 => PrimitiveType::Float,
    f64 => PrimitiveType::Double,
    i32 => PrimitiveType::Int,
    bool => PrimitiveType::Bool,
    String => PrimitiveType::String,
}
