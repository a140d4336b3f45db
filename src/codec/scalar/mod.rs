//! Scalar codecs (spec.md §4.F): one `ScalarCodec` struct dispatching over
//! `ScalarType` rather than one struct per primitive, since every scalar
//! shares the same shape (fixed-width little-endian rows, or length-prefixed
//! bytes for `String`) and the dispatch is a single match either way.

use std::net::Ipv4Addr;

use bytes::Bytes;

use crate::column::{Column, NumericBuffer, NumericColumn, StringColumn, Value};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::{DecimalWidth, EnumWidth, ScalarType};
use crate::io::{ReadBuffer, WriteBuffer};

use super::{Codec, PrefixState};

#[derive(Debug, Clone)]
pub struct ScalarCodec {
    pub scalar_type: ScalarType,
}

impl ScalarCodec {
    pub fn new(scalar_type: ScalarType) -> Self {
        Self { scalar_type }
    }

    fn fixed_width(&self) -> Option<usize> {
        match &self.scalar_type {
            ScalarType::Int8 | ScalarType::UInt8 | ScalarType::Bool => Some(1),
            ScalarType::Int16 | ScalarType::UInt16 | ScalarType::Date => Some(2),
            ScalarType::Int32
            | ScalarType::UInt32
            | ScalarType::Float32
            | ScalarType::Date32
            | ScalarType::DateTime
            | ScalarType::IPv4 => Some(4),
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 | ScalarType::DateTime64 { .. } => Some(8),
            ScalarType::Int128 | ScalarType::UInt128 | ScalarType::Uuid | ScalarType::IPv6 => Some(16),
            ScalarType::Int256 | ScalarType::UInt256 => Some(32),
            ScalarType::Decimal { width, .. } => Some(width.byte_width()),
            ScalarType::Enum { width: EnumWidth::Bits8, .. } => Some(1),
            ScalarType::Enum { width: EnumWidth::Bits16, .. } => Some(2),
            ScalarType::FixedString(n) => Some(*n as usize),
            ScalarType::String | ScalarType::Unknown(_) => None,
        }
    }
}

impl Codec for ScalarCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        match self.fixed_width() {
            Some(w) => rows * w as u64,
            // strings: assume a handful of bytes plus a one-byte length varint
            None => rows * 9,
        }
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        match &self.scalar_type {
            ScalarType::String => {
                let Column::String(s) = column else { return Err(type_mismatch(&self.scalar_type)) };
                for row in &s.rows {
                    writer.write_string(row);
                }
            }
            ScalarType::FixedString(n) => {
                let Column::String(s) = column else { return Err(type_mismatch(&self.scalar_type)) };
                for row in &s.rows {
                    let mut buf = vec![0u8; *n as usize];
                    let take = row.len().min(*n as usize);
                    buf[..take].copy_from_slice(&row[..take]);
                    writer.write(&buf);
                }
            }
            ScalarType::Unknown(_) => {
                let Column::String(s) = column else { return Err(type_mismatch(&self.scalar_type)) };
                for row in &s.rows {
                    writer.write_string(row);
                }
            }
            _ => {
                let Column::Numeric(n) = column else { return Err(type_mismatch(&self.scalar_type)) };
                encode_numeric(writer, n);
            }
        }
        Ok(())
    }

    fn decode_payload(
        &self,
        reader: &mut ReadBuffer<'_>,
        row_count: u64,
        opts: &DecodeOptions,
        _prefix: &PrefixState,
    ) -> CodecResult<Column> {
        let rows = row_count as usize;
        match &self.scalar_type {
            ScalarType::String => {
                let mut out = Vec::with_capacity(rows);
                for _ in 0..rows {
                    out.push(Bytes::copy_from_slice(reader.read_string_bytes()?));
                }
                Ok(Column::String(StringColumn::new(out)))
            }
            ScalarType::FixedString(n) => {
                let mut out = Vec::with_capacity(rows);
                for _ in 0..rows {
                    out.push(Bytes::copy_from_slice(reader.read_bytes(*n as usize)?));
                }
                Ok(Column::String(StringColumn::fixed(out, *n)))
            }
            ScalarType::Unknown(_) => {
                let mut out = Vec::with_capacity(rows);
                for _ in 0..rows {
                    out.push(Bytes::copy_from_slice(reader.read_string_bytes()?));
                }
                Ok(Column::String(StringColumn::new(out)))
            }
            scalar => {
                let buffer = decode_numeric_buffer(reader, scalar, rows)?;
                let column = NumericColumn::new(self.scalar_type.clone(), buffer).with_enum_as_number(opts.enum_as_number);
                Ok(Column::Numeric(column))
            }
        }
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        match &self.scalar_type {
            ScalarType::String | ScalarType::Unknown(_) => {
                let mut rows = Vec::with_capacity(values.len());
                for v in values {
                    rows.push(string_bytes_of(v)?);
                }
                Ok(Column::String(StringColumn::new(rows)))
            }
            ScalarType::FixedString(n) => {
                let mut rows = Vec::with_capacity(values.len());
                for v in values {
                    let b = string_bytes_of(v)?;
                    if b.len() > *n as usize {
                        return Err(CodecError::range(
                            format!("fixed string of {} bytes exceeds width {n}", b.len()),
                            ErrorContext::new().with_type(self.scalar_type.to_string()),
                        ));
                    }
                    rows.push(b);
                }
                Ok(Column::String(StringColumn::fixed(rows, *n)))
            }
            scalar => Ok(Column::Numeric(NumericColumn::new(scalar.clone(), numeric_buffer_of(scalar, values)?))),
        }
    }

    fn zero_value(&self) -> Value {
        match &self.scalar_type {
            ScalarType::Bool => Value::Bool(false),
            ScalarType::Int8 => Value::Int8(0),
            ScalarType::Int16 => Value::Int16(0),
            ScalarType::Int32 => Value::Int32(0),
            ScalarType::Int64 => Value::Int64(0),
            ScalarType::Int128 => Value::Int128(0),
            ScalarType::Int256 => Value::Int256(ethnum::I256::ZERO),
            ScalarType::UInt8 => Value::UInt8(0),
            ScalarType::UInt16 => Value::UInt16(0),
            ScalarType::UInt32 => Value::UInt32(0),
            ScalarType::UInt64 => Value::UInt64(0),
            ScalarType::UInt128 => Value::UInt128(0),
            ScalarType::UInt256 => Value::UInt256(ethnum::U256::ZERO),
            ScalarType::Float32 => Value::Float32(0.0),
            ScalarType::Float64 => Value::Float64(0.0),
            ScalarType::String | ScalarType::Unknown(_) => Value::String(Bytes::new()),
            ScalarType::FixedString(n) => Value::FixedString(Bytes::from(vec![0u8; *n as usize])),
            ScalarType::Date | ScalarType::Date32 => Value::Date(0),
            ScalarType::DateTime => Value::DateTime(0),
            ScalarType::DateTime64 { precision, .. } => Value::DateTime64 { ticks: 0, precision: *precision },
            ScalarType::Uuid => Value::Uuid(uuid::Uuid::nil()),
            ScalarType::IPv4 => Value::IPv4(Ipv4Addr::UNSPECIFIED),
            ScalarType::IPv6 => Value::IPv6(std::net::Ipv6Addr::UNSPECIFIED),
            ScalarType::Decimal { scale, .. } => Value::Decimal { unscaled: ethnum::I256::ZERO, scale: *scale },
            ScalarType::Enum { members, .. } => match members.first() {
                Some(m) => Value::Enum { name: m.name.clone(), value: m.value },
                None => Value::Enum { name: String::new(), value: 0 },
            },
        }
    }
}

fn type_mismatch(scalar: &ScalarType) -> CodecError {
    CodecError::invalid(
        format!("column storage does not match scalar type {scalar}"),
        ErrorContext::new().with_type(scalar.to_string()),
    )
}

fn encode_numeric(writer: &mut WriteBuffer, column: &NumericColumn) {
    match &column.buffer {
        NumericBuffer::I8(v) => v.iter().for_each(|&x| writer.write_i8(x)),
        NumericBuffer::I16(v) => v.iter().for_each(|&x| writer.write_i16_le(x)),
        NumericBuffer::I32(v) => v.iter().for_each(|&x| writer.write_i32_le(x)),
        NumericBuffer::I64(v) => v.iter().for_each(|&x| writer.write_i64_le(x)),
        NumericBuffer::I128(v) => v.iter().for_each(|&x| writer.write_i128_le(x)),
        NumericBuffer::I256(v) => v.iter().for_each(|&x| writer.write_i256_le(x)),
        NumericBuffer::U8(v) => v.iter().for_each(|&x| writer.write_u8(x)),
        NumericBuffer::U16(v) => v.iter().for_each(|&x| writer.write_u16_le(x)),
        NumericBuffer::U32(v) => v.iter().for_each(|&x| writer.write_u32_le(x)),
        NumericBuffer::U64(v) => v.iter().for_each(|&x| writer.write_u64_le(x)),
        NumericBuffer::U128(v) => v.iter().for_each(|&x| writer.write_u128_le(x)),
        NumericBuffer::U256(v) => v.iter().for_each(|&x| writer.write_u256_le(x)),
        NumericBuffer::F32(v) => v.iter().for_each(|&x| writer.write_f32_le(x)),
        NumericBuffer::F64(v) => v.iter().for_each(|&x| writer.write_f64_le(x)),
        NumericBuffer::Bytes16(v) => v.iter().for_each(|x| writer.write(x)),
    }
}

fn decode_numeric_buffer(reader: &mut ReadBuffer<'_>, scalar: &ScalarType, rows: usize) -> CodecResult<NumericBuffer> {
    Ok(match scalar {
        ScalarType::Bool => NumericBuffer::U8(reader.read_typed_array(rows)?),
        ScalarType::Int8 => NumericBuffer::I8(reader.read_typed_array(rows)?),
        ScalarType::Int16 => NumericBuffer::I16(reader.read_typed_array(rows)?),
        ScalarType::Int32 => NumericBuffer::I32(reader.read_typed_array(rows)?),
        ScalarType::Int64 => NumericBuffer::I64(reader.read_typed_array(rows)?),
        ScalarType::Int128 => NumericBuffer::I128(reader.read_typed_array(rows)?),
        ScalarType::Int256 => {
            let mut out = Vec::with_capacity(rows);
            for _ in 0..rows {
                out.push(reader.read_i256_le()?);
            }
            NumericBuffer::I256(out)
        }
        ScalarType::UInt8 => NumericBuffer::U8(reader.read_typed_array(rows)?),
        ScalarType::UInt16 => NumericBuffer::U16(reader.read_typed_array(rows)?),
        ScalarType::UInt32 => NumericBuffer::U32(reader.read_typed_array(rows)?),
        ScalarType::UInt64 => NumericBuffer::U64(reader.read_typed_array(rows)?),
        ScalarType::UInt128 => NumericBuffer::U128(reader.read_typed_array(rows)?),
        ScalarType::UInt256 => {
            let mut out = Vec::with_capacity(rows);
            for _ in 0..rows {
                out.push(reader.read_u256_le()?);
            }
            NumericBuffer::U256(out)
        }
        ScalarType::Float32 => NumericBuffer::F32(reader.read_typed_array(rows)?),
        ScalarType::Float64 => NumericBuffer::F64(reader.read_typed_array(rows)?),
        ScalarType::Date => NumericBuffer::U16(reader.read_typed_array(rows)?),
        ScalarType::Date32 => NumericBuffer::I32(reader.read_typed_array(rows)?),
        ScalarType::DateTime => NumericBuffer::U32(reader.read_typed_array(rows)?),
        ScalarType::DateTime64 { .. } => NumericBuffer::I64(reader.read_typed_array(rows)?),
        ScalarType::Uuid | ScalarType::IPv6 => {
            let mut out = Vec::with_capacity(rows);
            for _ in 0..rows {
                let bytes: [u8; 16] = reader.read_bytes(16)?.try_into().unwrap();
                out.push(bytes);
            }
            NumericBuffer::Bytes16(out)
        }
        ScalarType::IPv4 => NumericBuffer::U32(reader.read_typed_array(rows)?),
        ScalarType::Decimal { width, .. } => match width {
            DecimalWidth::Bits32 => NumericBuffer::I32(reader.read_typed_array(rows)?),
            DecimalWidth::Bits64 => NumericBuffer::I64(reader.read_typed_array(rows)?),
            DecimalWidth::Bits128 => NumericBuffer::I128(reader.read_typed_array(rows)?),
            DecimalWidth::Bits256 => {
                let mut out = Vec::with_capacity(rows);
                for _ in 0..rows {
                    out.push(reader.read_i256_le()?);
                }
                NumericBuffer::I256(out)
            }
        },
        ScalarType::Enum { width: EnumWidth::Bits8, .. } => NumericBuffer::I8(reader.read_typed_array(rows)?),
        ScalarType::Enum { width: EnumWidth::Bits16, .. } => NumericBuffer::I16(reader.read_typed_array(rows)?),
        ScalarType::String | ScalarType::FixedString(_) | ScalarType::Unknown(_) => {
            unreachable!("string-shaped types are handled by the caller")
        }
    })
}

fn string_bytes_of(v: &Value) -> CodecResult<Bytes> {
    match v {
        Value::String(b) | Value::FixedString(b) => Ok(b.clone()),
        other => Err(CodecError::coercion(
            format!("expected a string value, got {other:?}"),
            ErrorContext::new(),
        )),
    }
}

/// Coerces a `Bool` row from any of the shapes spec.md §4.F documents:
/// an actual boolean, a case-insensitive "true"/"false" string, or the
/// integer 0/1.
fn coerce_bool(v: &Value) -> CodecResult<u8> {
    match v {
        Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
        Value::String(s) | Value::FixedString(s) => match std::str::from_utf8(s) {
            Ok(s) if s.eq_ignore_ascii_case("true") => Ok(1),
            Ok(s) if s.eq_ignore_ascii_case("false") => Ok(0),
            _ => Err(CodecError::coercion(
                format!("expected Bool, got string {v:?}"),
                ErrorContext::new().with_type("Bool".to_string()),
            )),
        },
        Value::Int8(0) | Value::Int16(0) | Value::Int32(0) | Value::Int64(0) | Value::UInt8(0) | Value::UInt16(0)
        | Value::UInt32(0) | Value::UInt64(0) => Ok(0),
        Value::Int8(1) | Value::Int16(1) | Value::Int32(1) | Value::Int64(1) | Value::UInt8(1) | Value::UInt16(1)
        | Value::UInt32(1) | Value::UInt64(1) => Ok(1),
        other => Err(CodecError::coercion(format!("expected Bool, got {other:?}"), ErrorContext::new().with_type("Bool".to_string()))),
    }
}

fn numeric_buffer_of(scalar: &ScalarType, values: &[Value]) -> CodecResult<NumericBuffer> {
    macro_rules! collect {
        ($variant:ident, $pat:pat => $expr:expr) => {{
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    $pat => out.push($expr),
                    other => {
                        return Err(CodecError::coercion(
                            format!("expected {scalar}, got {other:?}"),
                            ErrorContext::new().with_type(scalar.to_string()),
                        ))
                    }
                }
            }
            NumericBuffer::$variant(out)
        }};
    }

    Ok(match scalar {
        ScalarType::Bool => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                out.push(coerce_bool(v)?);
            }
            NumericBuffer::U8(out)
        }
        ScalarType::Int8 => collect!(I8, Value::Int8(x) => *x),
        ScalarType::Int16 => collect!(I16, Value::Int16(x) => *x),
        ScalarType::Int32 => collect!(I32, Value::Int32(x) => *x),
        ScalarType::Int64 => collect!(I64, Value::Int64(x) => *x),
        ScalarType::Int128 => collect!(I128, Value::Int128(x) => *x),
        ScalarType::Int256 => collect!(I256, Value::Int256(x) => *x),
        ScalarType::UInt8 => collect!(U8, Value::UInt8(x) => *x),
        ScalarType::UInt16 => collect!(U16, Value::UInt16(x) => *x),
        ScalarType::UInt32 => collect!(U32, Value::UInt32(x) => *x),
        ScalarType::UInt64 => collect!(U64, Value::UInt64(x) => *x),
        ScalarType::UInt128 => collect!(U128, Value::UInt128(x) => *x),
        ScalarType::UInt256 => collect!(U256, Value::UInt256(x) => *x),
        ScalarType::Float32 => collect!(F32, Value::Float32(x) => *x),
        ScalarType::Float64 => collect!(F64, Value::Float64(x) => *x),
        ScalarType::Date | ScalarType::Date32 => collect!(I32, Value::Date(x) => *x),
        ScalarType::DateTime => collect!(U32, Value::DateTime(x) => *x),
        ScalarType::DateTime64 { .. } => {
            collect!(I64, Value::DateTime64 { ticks, .. } => *ticks)
        }
        ScalarType::Uuid => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    Value::Uuid(id) => out.push(crate::column::numeric::uuid_to_wire_bytes(id)),
                    other => {
                        return Err(CodecError::coercion(format!("expected UUID, got {other:?}"), ErrorContext::new()))
                    }
                }
            }
            NumericBuffer::Bytes16(out)
        }
        ScalarType::IPv4 => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    Value::IPv4(ip) => out.push(u32::from(*ip).swap_bytes()),
                    other => {
                        return Err(CodecError::coercion(format!("expected IPv4, got {other:?}"), ErrorContext::new()))
                    }
                }
            }
            NumericBuffer::U32(out)
        }
        ScalarType::IPv6 => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    Value::IPv6(ip) => out.push(ip.octets()),
                    other => {
                        return Err(CodecError::coercion(format!("expected IPv6, got {other:?}"), ErrorContext::new()))
                    }
                }
            }
            NumericBuffer::Bytes16(out)
        }
        ScalarType::Decimal { width, .. } => {
            let mut unscaled = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    Value::Decimal { unscaled: u, .. } => unscaled.push(*u),
                    other => {
                        return Err(CodecError::coercion(format!("expected Decimal, got {other:?}"), ErrorContext::new()))
                    }
                }
            }
            match width {
                DecimalWidth::Bits32 => NumericBuffer::I32(unscaled.iter().map(|v| v.as_i32()).collect()),
                DecimalWidth::Bits64 => NumericBuffer::I64(unscaled.iter().map(|v| v.as_i64()).collect()),
                DecimalWidth::Bits128 => NumericBuffer::I128(unscaled.iter().map(|v| v.as_i128()).collect()),
                DecimalWidth::Bits256 => NumericBuffer::I256(unscaled),
            }
        }
        ScalarType::Enum { width, members } => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                let value = match v {
                    Value::Enum { name, value } if !name.is_empty() => {
                        match Value::find_enum_member(members, name) {
                            Some(m) => m.value,
                            None => {
                                return Err(CodecError::enum_violation(
                                    format!("undeclared enum member {name:?}"),
                                    ErrorContext::new(),
                                ))
                            }
                        }
                    }
                    Value::Enum { value, .. } => *value,
                    other => {
                        return Err(CodecError::coercion(format!("expected Enum, got {other:?}"), ErrorContext::new()))
                    }
                };
                out.push(value);
            }
            match width {
                EnumWidth::Bits8 => NumericBuffer::I8(out.iter().map(|&v| v as i8).collect()),
                EnumWidth::Bits16 => NumericBuffer::I16(out.iter().map(|&v| v as i16).collect()),
            }
        }
        ScalarType::String | ScalarType::FixedString(_) | ScalarType::Unknown(_) => {
            unreachable!("string-shaped types are handled by the caller")
        }
    })
}
