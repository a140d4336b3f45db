//! Composite codecs (spec.md §4.G): each closes over its child codec(s),
//! resolved once at construction time by the registry, and recurses through
//! the shared `Codec` trait rather than a hand-rolled dispatch per shape.

mod array;
mod dynamic;
mod json;
mod low_cardinality;
mod map;
mod nullable;
mod tuple;
mod variant;

pub use array::ArrayCodec;
pub use dynamic::DynamicCodec;
pub use json::JsonCodec;
pub use low_cardinality::LowCardinalityCodec;
pub use map::MapCodec;
pub use nullable::NullableCodec;
pub use tuple::TupleCodec;
pub use variant::VariantCodec;
