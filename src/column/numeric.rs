//! Typed-numeric column storage (spec.md §3): a raw buffer of primitives,
//! shared and immutable once decoded. Every "primitive-shaped" logical type
//! — ints, floats, bool, date/datetime, UUID, IPv4/IPv6, decimal, enum —
//! stores its rows in one of these width-specific buffers and reinterprets
//! them through `ScalarType` at `get()` time.

use ethnum::{I256, U256};
use uuid::Uuid;

use crate::column::value::Value;
use crate::grammar::{DecimalWidth, EnumWidth, ScalarType};

#[derive(Debug, Clone, PartialEq)]
pub enum NumericBuffer {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    I128(Vec<i128>),
    I256(Vec<I256>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    U128(Vec<u128>),
    U256(Vec<U256>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// UUID and IPv6 rows: 16 raw bytes each.
    Bytes16(Vec<[u8; 16]>),
}

impl NumericBuffer {
    pub fn len(&self) -> usize {
        match self {
            NumericBuffer::I8(v) => v.len(),
            NumericBuffer::I16(v) => v.len(),
            NumericBuffer::I32(v) => v.len(),
            NumericBuffer::I64(v) => v.len(),
            NumericBuffer::I128(v) => v.len(),
            NumericBuffer::I256(v) => v.len(),
            NumericBuffer::U8(v) => v.len(),
            NumericBuffer::U16(v) => v.len(),
            NumericBuffer::U32(v) => v.len(),
            NumericBuffer::U64(v) => v.len(),
            NumericBuffer::U128(v) => v.len(),
            NumericBuffer::U256(v) => v.len(),
            NumericBuffer::F32(v) => v.len(),
            NumericBuffer::F64(v) => v.len(),
            NumericBuffer::Bytes16(v) => v.len(),
        }
    }

    pub fn slice_clone(&self, start: usize, end: usize) -> NumericBuffer {
        match self {
            NumericBuffer::I8(v) => NumericBuffer::I8(v[start..end].to_vec()),
            NumericBuffer::I16(v) => NumericBuffer::I16(v[start..end].to_vec()),
            NumericBuffer::I32(v) => NumericBuffer::I32(v[start..end].to_vec()),
            NumericBuffer::I64(v) => NumericBuffer::I64(v[start..end].to_vec()),
            NumericBuffer::I128(v) => NumericBuffer::I128(v[start..end].to_vec()),
            NumericBuffer::I256(v) => NumericBuffer::I256(v[start..end].to_vec()),
            NumericBuffer::U8(v) => NumericBuffer::U8(v[start..end].to_vec()),
            NumericBuffer::U16(v) => NumericBuffer::U16(v[start..end].to_vec()),
            NumericBuffer::U32(v) => NumericBuffer::U32(v[start..end].to_vec()),
            NumericBuffer::U64(v) => NumericBuffer::U64(v[start..end].to_vec()),
            NumericBuffer::U128(v) => NumericBuffer::U128(v[start..end].to_vec()),
            NumericBuffer::U256(v) => NumericBuffer::U256(v[start..end].to_vec()),
            NumericBuffer::F32(v) => NumericBuffer::F32(v[start..end].to_vec()),
            NumericBuffer::F64(v) => NumericBuffer::F64(v[start..end].to_vec()),
            NumericBuffer::Bytes16(v) => NumericBuffer::Bytes16(v[start..end].to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub scalar_type: ScalarType,
    pub buffer: NumericBuffer,
    /// Renders `Enum8`/`Enum16` rows as their raw integer instead of
    /// resolving member names, per the decode-time `enum_as_number` option
    /// (spec.md §6). Irrelevant to every other scalar type.
    pub enum_as_number: bool,
}

impl NumericColumn {
    pub fn new(scalar_type: ScalarType, buffer: NumericBuffer) -> Self {
        Self { scalar_type, buffer, enum_as_number: false }
    }

    pub fn with_enum_as_number(mut self, value: bool) -> Self {
        self.enum_as_number = value;
        self
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slice(&self, start: usize, end: usize) -> NumericColumn {
        NumericColumn {
            scalar_type: self.scalar_type.clone(),
            buffer: self.buffer.slice_clone(start, end),
            enum_as_number: self.enum_as_number,
        }
    }

    pub fn get(&self, i: usize) -> Value {
        match (&self.scalar_type, &self.buffer) {
            (ScalarType::Int8, NumericBuffer::I8(v)) => Value::Int8(v[i]),
            (ScalarType::Int16, NumericBuffer::I16(v)) => Value::Int16(v[i]),
            (ScalarType::Int32, NumericBuffer::I32(v)) => Value::Int32(v[i]),
            (ScalarType::Int64, NumericBuffer::I64(v)) => Value::Int64(v[i]),
            (ScalarType::Int128, NumericBuffer::I128(v)) => Value::Int128(v[i]),
            (ScalarType::Int256, NumericBuffer::I256(v)) => Value::Int256(v[i]),
            (ScalarType::UInt8, NumericBuffer::U8(v)) => Value::UInt8(v[i]),
            (ScalarType::UInt16, NumericBuffer::U16(v)) => Value::UInt16(v[i]),
            (ScalarType::UInt32, NumericBuffer::U32(v)) => Value::UInt32(v[i]),
            (ScalarType::UInt64, NumericBuffer::U64(v)) => Value::UInt64(v[i]),
            (ScalarType::UInt128, NumericBuffer::U128(v)) => Value::UInt128(v[i]),
            (ScalarType::UInt256, NumericBuffer::U256(v)) => Value::UInt256(v[i]),
            (ScalarType::Float32, NumericBuffer::F32(v)) => Value::Float32(v[i]),
            (ScalarType::Float64, NumericBuffer::F64(v)) => Value::Float64(v[i]),
            (ScalarType::Bool, NumericBuffer::U8(v)) => Value::Bool(v[i] != 0),
            (ScalarType::Date, NumericBuffer::U16(v)) => Value::Date(v[i] as i32),
            (ScalarType::Date32, NumericBuffer::I32(v)) => Value::Date(v[i]),
            (ScalarType::DateTime, NumericBuffer::U32(v)) => Value::DateTime(v[i]),
            (ScalarType::DateTime64 { precision, .. }, NumericBuffer::I64(v)) => {
                Value::DateTime64 { ticks: v[i], precision: *precision }
            }
            (ScalarType::Uuid, NumericBuffer::Bytes16(v)) => {
                Value::Uuid(uuid_from_wire_bytes(&v[i]))
            }
            (ScalarType::IPv4, NumericBuffer::U32(v)) => {
                // byte 0 on the wire is the *last* octet (spec.md §4.F).
                Value::IPv4(std::net::Ipv4Addr::from(v[i].swap_bytes()))
            }
            (ScalarType::IPv6, NumericBuffer::Bytes16(v)) => {
                Value::IPv6(std::net::Ipv6Addr::from(v[i]))
            }
            (ScalarType::Decimal { scale, width, .. }, buf) => {
                let unscaled = decimal_unscaled(buf, i, *width);
                Value::Decimal { unscaled, scale: *scale }
            }
            (ScalarType::Enum { width: EnumWidth::Bits8, members }, NumericBuffer::I8(v)) => {
                enum_value(v[i] as i32, members, self.enum_as_number)
            }
            (ScalarType::Enum { width: EnumWidth::Bits16, members }, NumericBuffer::I16(v)) => {
                enum_value(v[i] as i32, members, self.enum_as_number)
            }
            _ => unreachable!("scalar type / buffer width mismatch"),
        }
    }
}

fn enum_value(raw: i32, members: &[crate::grammar::EnumMember], as_number: bool) -> Value {
    if as_number {
        return Value::Enum { name: String::new(), value: raw };
    }
    match members.iter().find(|m| m.value == raw) {
        Some(m) => Value::Enum { name: m.name.clone(), value: m.value },
        // Undeclared value: surface it raw even when names were requested,
        // since there is no name to resolve it to.
        None => Value::Enum { name: String::new(), value: raw },
    }
}

fn decimal_unscaled(buf: &NumericBuffer, i: usize, width: DecimalWidth) -> I256 {
    match (width, buf) {
        (DecimalWidth::Bits32, NumericBuffer::I32(v)) => I256::from(v[i]),
        (DecimalWidth::Bits64, NumericBuffer::I64(v)) => I256::from(v[i]),
        (DecimalWidth::Bits128, NumericBuffer::I128(v)) => I256::from(v[i]),
        (DecimalWidth::Bits256, NumericBuffer::I256(v)) => v[i],
        _ => unreachable!("decimal width / buffer mismatch"),
    }
}

/// UUID wire layout: `[low-64 reversed][high-64 reversed]` relative to the
/// canonical hex form (spec.md §4.F).
pub fn uuid_from_wire_bytes(bytes: &[u8; 16]) -> Uuid {
    let mut hi = [0u8; 8];
    let mut lo = [0u8; 8];
    hi.copy_from_slice(&bytes[0..8]);
    lo.copy_from_slice(&bytes[8..16]);
    hi.reverse();
    lo.reverse();
    let mut canonical = [0u8; 16];
    canonical[0..8].copy_from_slice(&hi);
    canonical[8..16].copy_from_slice(&lo);
    Uuid::from_bytes(canonical)
}

pub fn uuid_to_wire_bytes(uuid: &Uuid) -> [u8; 16] {
    let canonical = uuid.into_bytes();
    let mut hi = [0u8; 8];
    let mut lo = [0u8; 8];
    hi.copy_from_slice(&canonical[0..8]);
    lo.copy_from_slice(&canonical[8..16]);
    hi.reverse();
    lo.reverse();
    let mut wire = [0u8; 16];
    wire[0..8].copy_from_slice(&hi);
    wire[8..16].copy_from_slice(&lo);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_wire_roundtrip() {
        let id = Uuid::parse_str("12345678-1234-5678-1234-567812345678").unwrap();
        let wire = uuid_to_wire_bytes(&id);
        let back = uuid_from_wire_bytes(&wire);
        assert_eq!(id, back);
    }
}
