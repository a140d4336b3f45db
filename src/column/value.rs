//! The virtual row-level value type produced by `Column::get` (spec.md §4.D).

use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::grammar::EnumMember;

/// One decoded cell. Composite variants materialize eagerly into `Value`
/// (an O(1)-per-child, not O(1)-overall, cost for deep nesting) which is
/// the tradeoff the virtual row view of spec.md §4.D/§4.J accepts in
/// exchange for a caller-facing type that owns no column internals.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(ethnum::I256),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(ethnum::U256),
    Float32(f32),
    Float64(f64),
    String(Bytes),
    FixedString(Bytes),
    /// Days since 1970-01-01 (fits both `Date`'s u16 range and `Date32`'s i32 range).
    Date(i32),
    /// Seconds since epoch.
    DateTime(u32),
    DateTime64 {
        ticks: i64,
        precision: u8,
    },
    Uuid(uuid::Uuid),
    IPv4(Ipv4Addr),
    IPv6(Ipv6Addr),
    Decimal {
        unscaled: ethnum::I256,
        scale: u16,
    },
    Enum {
        name: String,
        value: i32,
    },
    Array(Vec<Value>),
    /// Key/value pairs in wire order; a hash-style render (duplicate keys
    /// dropped, last write wins) is applied by `MapColumn` per its render
    /// hint before reaching here (spec.md §3, §4.G).
    Map(Vec<(Value, Value)>),
    Tuple(Vec<Value>),
    NamedTuple(Vec<(String, Value)>),
    Variant {
        type_index: usize,
        value: Box<Value>,
    },
    Dynamic {
        type_name: String,
        value: Box<Value>,
    },
    /// Only paths whose per-row value is non-null are present (spec.md §3).
    Json(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Looks up an enum member by name, used by the Enum8/16 codec to
    /// validate names on encode and resolve names on decode.
    pub fn find_enum_member<'a>(members: &'a [EnumMember], name: &str) -> Option<&'a EnumMember> {
        members.iter().find(|m| m.name == name)
    }
}
