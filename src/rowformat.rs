//! The row-oriented auxiliary wire format (spec.md §6): simpler than the
//! columnar format of §4.G/§4.H, included for completeness. Frames are
//! `varint colCount`, `String name × colCount`, and — only in the
//! `WithNamesAndTypes` flavor — `String type × colCount`; what follows is a
//! sequence of rows, each the concatenation of per-column scalar codecs with
//! no columnar offset arrays: Arrays carry their own length varint, Nullable
//! a one-byte flag, and JSON/Dynamic a per-row type code, exactly as §6
//! describes. This format reuses §4.F's scalar wire contracts but not the
//! §4.G composite framing (no shared offsets array, no dictionary, no
//! discriminator-grouped columns) — every row is self-contained.

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use ethnum::I256;

use crate::column::numeric::{uuid_from_wire_bytes, uuid_to_wire_bytes};
use crate::column::Value;
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::{parse_type, DecimalWidth, EnumWidth, ScalarType, TypeExpr};
use crate::io::{ReadBuffer, WriteBuffer};

/// Selects whether the header carries a type string per column, mirroring
/// the distinct `RowBinary` / `RowBinaryWithNamesAndTypes` flavors spec.md §6
/// calls out. `Names` requires the caller to already know each column's type
/// (the wire carries names only), since there is otherwise nothing to parse
/// values against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormatFlavor {
    Names,
    NamesAndTypes,
}

/// One row-oriented block: parallel column name/type pairs plus the decoded
/// rows, each row holding one `Value` per column in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFormatBlock {
    pub columns: Vec<(String, TypeExpr)>,
    pub rows: Vec<Vec<Value>>,
}

/// Encodes the column header (and, for `NamesAndTypes`, each column's type
/// string) followed by every row in `block.rows`.
pub fn encode_row_block(writer: &mut WriteBuffer, block: &RowFormatBlock, flavor: RowFormatFlavor) -> CodecResult<()> {
    writer.write_varint(block.columns.len() as u64);
    for (name, _) in &block.columns {
        writer.write_string(name.as_bytes());
    }
    if flavor == RowFormatFlavor::NamesAndTypes {
        for (_, ty) in &block.columns {
            writer.write_string(ty.to_string().as_bytes());
        }
    }
    for row in &block.rows {
        if row.len() != block.columns.len() {
            return Err(CodecError::invalid(
                format!("row has {} values but schema has {} columns", row.len(), block.columns.len()),
                ErrorContext::new(),
            ));
        }
        for (value, (_, ty)) in row.iter().zip(&block.columns) {
            encode_value(writer, ty, value)?;
        }
    }
    Ok(())
}

/// Decodes a header and every row up to end-of-buffer. For `Names`, the
/// wire carries no type strings, so the caller-supplied `column_types` (in
/// declared column order) are used to parse values; for `NamesAndTypes` the
/// wire's own type strings are parsed and `column_types` is ignored (pass
/// `&[]`).
pub fn decode_row_block(
    reader: &mut ReadBuffer<'_>,
    flavor: RowFormatFlavor,
    column_types: &[TypeExpr],
    opts: &DecodeOptions,
) -> CodecResult<RowFormatBlock> {
    let col_count = reader.read_varint()? as usize;
    let mut names = Vec::with_capacity(col_count);
    for _ in 0..col_count {
        names.push(reader.read_string()?.to_string());
    }
    let types: Vec<TypeExpr> = match flavor {
        RowFormatFlavor::NamesAndTypes => {
            let mut types = Vec::with_capacity(col_count);
            for _ in 0..col_count {
                types.push(parse_type(reader.read_string()?)?);
            }
            types
        }
        RowFormatFlavor::Names => {
            if column_types.len() != col_count {
                return Err(CodecError::invalid(
                    format!("expected {col_count} column types for the Names flavor, got {}", column_types.len()),
                    ErrorContext::new(),
                ));
            }
            column_types.to_vec()
        }
    };
    let columns: Vec<(String, TypeExpr)> = names.into_iter().zip(types.iter().cloned()).collect();

    let mut rows = Vec::new();
    while !reader.is_empty() {
        let checkpoint = reader.checkpoint();
        let mut row = Vec::with_capacity(col_count);
        let mut underflowed = false;
        for ty in &types {
            match decode_value(reader, ty, opts) {
                Ok(v) => row.push(v),
                Err(e) if e.is_underflow() => {
                    underflowed = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if underflowed {
            reader.restore(checkpoint);
            break;
        }
        rows.push(row);
    }
    Ok(RowFormatBlock { columns, rows })
}

fn encode_value(writer: &mut WriteBuffer, ty: &TypeExpr, value: &Value) -> CodecResult<()> {
    match ty.desugared() {
        TypeExpr::Scalar(scalar) => encode_scalar(writer, &scalar, value),
        TypeExpr::LowCardinality(inner) => encode_value(writer, &inner, value),
        TypeExpr::Nullable(inner) => {
            if value.is_null() {
                writer.write_u8(1);
            } else {
                writer.write_u8(0);
                encode_value(writer, &inner, value)?;
            }
            Ok(())
        }
        TypeExpr::Array(inner) => {
            let Value::Array(items) = value else { return Err(coercion(ty, value)) };
            writer.write_varint(items.len() as u64);
            for item in items {
                encode_value(writer, &inner, item)?;
            }
            Ok(())
        }
        TypeExpr::Map(k, v) => {
            let Value::Map(pairs) = value else { return Err(coercion(ty, value)) };
            writer.write_varint(pairs.len() as u64);
            for (key, val) in pairs {
                encode_value(writer, &k, key)?;
                encode_value(writer, &v, val)?;
            }
            Ok(())
        }
        TypeExpr::Tuple(elems) => {
            let values = tuple_values(value, &elems)?;
            for (elem, v) in elems.iter().zip(values.iter()) {
                encode_value(writer, &elem.ty, v)?;
            }
            Ok(())
        }
        TypeExpr::Nested(_) => unreachable!("desugared() removes Nested"),
        TypeExpr::Variant(types) => match value {
            Value::Null => {
                writer.write_u8(0xFF);
                Ok(())
            }
            Value::Variant { type_index, value } => {
                if *type_index >= types.len() {
                    return Err(CodecError::range(
                        format!("variant discriminator {type_index} out of range for {} alternatives", types.len()),
                        ErrorContext::new().with_type(ty.to_string()),
                    ));
                }
                writer.write_u8(*type_index as u8);
                encode_value(writer, &types[*type_index], value)
            }
            other => Err(coercion(ty, other)),
        },
        TypeExpr::Dynamic { .. } => match value {
            Value::Null => {
                writer.write_u8(1);
                Ok(())
            }
            Value::Dynamic { type_name, value } => {
                writer.write_u8(0);
                writer.write_string(type_name.as_bytes());
                let inner_ty = parse_type(type_name)?;
                encode_value(writer, &inner_ty, value)
            }
            other => Err(coercion(ty, other)),
        },
        TypeExpr::Json { .. } => {
            let Value::Json(fields) = value else { return Err(coercion(ty, value)) };
            writer.write_varint(fields.len() as u64);
            for (path, v) in fields {
                writer.write_string(path.as_bytes());
                match v {
                    Value::Dynamic { type_name, value } => {
                        writer.write_string(type_name.as_bytes());
                        let inner_ty = parse_type(type_name)?;
                        encode_value(writer, &inner_ty, value)?;
                    }
                    other => return Err(coercion(ty, other)),
                }
            }
            Ok(())
        }
    }
}

fn decode_value(reader: &mut ReadBuffer<'_>, ty: &TypeExpr, opts: &DecodeOptions) -> CodecResult<Value> {
    match ty.desugared() {
        TypeExpr::Scalar(scalar) => decode_scalar(reader, &scalar, opts),
        TypeExpr::LowCardinality(inner) => decode_value(reader, &inner, opts),
        TypeExpr::Nullable(inner) => {
            if reader.read_u8()? != 0 {
                Ok(Value::Null)
            } else {
                decode_value(reader, &inner, opts)
            }
        }
        TypeExpr::Array(inner) => {
            let len = reader.read_varint()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(reader, &inner, opts)?);
            }
            Ok(Value::Array(items))
        }
        TypeExpr::Map(k, v) => {
            let len = reader.read_varint()? as usize;
            let mut pairs = Vec::with_capacity(len);
            for _ in 0..len {
                let key = decode_value(reader, &k, opts)?;
                let val = decode_value(reader, &v, opts)?;
                pairs.push((key, val));
            }
            Ok(Value::Map(pairs))
        }
        TypeExpr::Tuple(elems) => {
            let named = elems.iter().any(|e| e.name.is_some());
            if named {
                let mut out = Vec::with_capacity(elems.len());
                for e in &elems {
                    let v = decode_value(reader, &e.ty, opts)?;
                    out.push((e.name.clone().unwrap_or_default(), v));
                }
                Ok(Value::NamedTuple(out))
            } else {
                let mut out = Vec::with_capacity(elems.len());
                for e in &elems {
                    out.push(decode_value(reader, &e.ty, opts)?);
                }
                Ok(Value::Tuple(out))
            }
        }
        TypeExpr::Nested(_) => unreachable!("desugared() removes Nested"),
        TypeExpr::Variant(types) => {
            let disc = reader.read_u8()?;
            if disc == 0xFF {
                Ok(Value::Null)
            } else {
                let idx = disc as usize;
                let child_ty = types.get(idx).ok_or_else(|| {
                    CodecError::invalid(
                        format!("variant discriminator {disc} out of range for {} alternatives", types.len()),
                        ErrorContext::new().with_type(ty.to_string()),
                    )
                })?;
                let value = decode_value(reader, child_ty, opts)?;
                Ok(Value::Variant { type_index: idx, value: Box::new(value) })
            }
        }
        TypeExpr::Dynamic { .. } => {
            if reader.read_u8()? != 0 {
                Ok(Value::Null)
            } else {
                let type_name = reader.read_string()?.to_string();
                let inner_ty = parse_type(&type_name)?;
                let value = decode_value(reader, &inner_ty, opts)?;
                Ok(Value::Dynamic { type_name, value: Box::new(value) })
            }
        }
        TypeExpr::Json { .. } => {
            let count = reader.read_varint()? as usize;
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                let path = reader.read_string()?.to_string();
                let type_name = reader.read_string()?.to_string();
                let inner_ty = parse_type(&type_name)?;
                let value = decode_value(reader, &inner_ty, opts)?;
                fields.push((path, Value::Dynamic { type_name, value: Box::new(value) }));
            }
            Ok(Value::Json(fields))
        }
    }
}

fn tuple_values(value: &Value, elems: &[crate::grammar::TupleElement]) -> CodecResult<Vec<Value>> {
    match value {
        Value::Tuple(vals) => Ok(vals.clone()),
        Value::NamedTuple(pairs) => {
            let mut out = Vec::with_capacity(elems.len());
            for elem in elems {
                let name = elem.name.as_deref().unwrap_or_default();
                match pairs.iter().find(|(n, _)| n == name) {
                    Some((_, v)) => out.push(v.clone()),
                    None => {
                        return Err(CodecError::coercion(
                            format!("named tuple is missing field {name:?}"),
                            ErrorContext::new(),
                        ))
                    }
                }
            }
            Ok(out)
        }
        other => Err(CodecError::coercion(format!("expected a tuple value, got {other:?}"), ErrorContext::new())),
    }
}

fn coercion(ty: &TypeExpr, value: &Value) -> CodecError {
    CodecError::coercion(format!("expected {ty}, got {value:?}"), ErrorContext::new().with_type(ty.to_string()))
}

fn encode_scalar(writer: &mut WriteBuffer, scalar: &ScalarType, value: &Value) -> CodecResult<()> {
    match (scalar, value) {
        (ScalarType::Bool, Value::Bool(b)) => writer.write_u8(if *b { 1 } else { 0 }),
        (ScalarType::Int8, Value::Int8(v)) => writer.write_i8(*v),
        (ScalarType::Int16, Value::Int16(v)) => writer.write_i16_le(*v),
        (ScalarType::Int32, Value::Int32(v)) => writer.write_i32_le(*v),
        (ScalarType::Int64, Value::Int64(v)) => writer.write_i64_le(*v),
        (ScalarType::Int128, Value::Int128(v)) => writer.write_i128_le(*v),
        (ScalarType::Int256, Value::Int256(v)) => writer.write_i256_le(*v),
        (ScalarType::UInt8, Value::UInt8(v)) => writer.write_u8(*v),
        (ScalarType::UInt16, Value::UInt16(v)) => writer.write_u16_le(*v),
        (ScalarType::UInt32, Value::UInt32(v)) => writer.write_u32_le(*v),
        (ScalarType::UInt64, Value::UInt64(v)) => writer.write_u64_le(*v),
        (ScalarType::UInt128, Value::UInt128(v)) => writer.write_u128_le(*v),
        (ScalarType::UInt256, Value::UInt256(v)) => writer.write_u256_le(*v),
        (ScalarType::Float32, Value::Float32(v)) => writer.write_f32_le(*v),
        (ScalarType::Float64, Value::Float64(v)) => writer.write_f64_le(*v),
        (ScalarType::String, Value::String(b)) => writer.write_string(b),
        (ScalarType::Unknown(_), Value::String(b)) => writer.write_string(b),
        (ScalarType::FixedString(n), Value::FixedString(b)) => {
            if b.len() > *n as usize {
                return Err(CodecError::range(
                    format!("fixed string of {} bytes exceeds width {n}", b.len()),
                    ErrorContext::new().with_type(scalar.to_string()),
                ));
            }
            let mut buf = vec![0u8; *n as usize];
            buf[..b.len()].copy_from_slice(b);
            writer.write(&buf);
        }
        (ScalarType::Date, Value::Date(d)) | (ScalarType::Date32, Value::Date(d)) => match scalar {
            ScalarType::Date => writer.write_u16_le(*d as u16),
            _ => writer.write_i32_le(*d),
        },
        (ScalarType::DateTime, Value::DateTime(s)) => writer.write_u32_le(*s),
        (ScalarType::DateTime64 { .. }, Value::DateTime64 { ticks, .. }) => writer.write_i64_le(*ticks),
        (ScalarType::Uuid, Value::Uuid(u)) => writer.write(&uuid_to_wire_bytes(u)),
        (ScalarType::IPv4, Value::IPv4(ip)) => writer.write_u32_le(u32::from(*ip).swap_bytes()),
        (ScalarType::IPv6, Value::IPv6(ip)) => writer.write(&ip.octets()),
        (ScalarType::Decimal { width, .. }, Value::Decimal { unscaled, .. }) => match width {
            DecimalWidth::Bits32 => writer.write_i32_le(unscaled.as_i32()),
            DecimalWidth::Bits64 => writer.write_i64_le(unscaled.as_i64()),
            DecimalWidth::Bits128 => writer.write_i128_le(unscaled.as_i128()),
            DecimalWidth::Bits256 => writer.write_i256_le(*unscaled),
        },
        (ScalarType::Enum { width, members }, Value::Enum { name, value: raw }) => {
            let resolved = if !name.is_empty() {
                match Value::find_enum_member(members, name) {
                    Some(m) => m.value,
                    None => {
                        return Err(CodecError::enum_violation(
                            format!("undeclared enum member {name:?}"),
                            ErrorContext::new().with_type(scalar.to_string()),
                        ))
                    }
                }
            } else {
                *raw
            };
            match width {
                EnumWidth::Bits8 => writer.write_i8(resolved as i8),
                EnumWidth::Bits16 => writer.write_i16_le(resolved as i16),
            }
        }
        (scalar, other) => return Err(coercion_scalar(scalar, other)),
    }
    Ok(())
}

fn decode_scalar(reader: &mut ReadBuffer<'_>, scalar: &ScalarType, opts: &DecodeOptions) -> CodecResult<Value> {
    Ok(match scalar {
        ScalarType::Bool => Value::Bool(reader.read_u8()? != 0),
        ScalarType::Int8 => Value::Int8(reader.read_i8()?),
        ScalarType::Int16 => Value::Int16(reader.read_i16_le()?),
        ScalarType::Int32 => Value::Int32(reader.read_i32_le()?),
        ScalarType::Int64 => Value::Int64(reader.read_i64_le()?),
        ScalarType::Int128 => Value::Int128(reader.read_i128_le()?),
        ScalarType::Int256 => Value::Int256(reader.read_i256_le()?),
        ScalarType::UInt8 => Value::UInt8(reader.read_u8()?),
        ScalarType::UInt16 => Value::UInt16(reader.read_u16_le()?),
        ScalarType::UInt32 => Value::UInt32(reader.read_u32_le()?),
        ScalarType::UInt64 => Value::UInt64(reader.read_u64_le()?),
        ScalarType::UInt128 => Value::UInt128(reader.read_u128_le()?),
        ScalarType::UInt256 => Value::UInt256(reader.read_u256_le()?),
        ScalarType::Float32 => Value::Float32(reader.read_f32_le()?),
        ScalarType::Float64 => Value::Float64(reader.read_f64_le()?),
        ScalarType::String | ScalarType::Unknown(_) => Value::String(Bytes::copy_from_slice(reader.read_string_bytes()?)),
        ScalarType::FixedString(n) => Value::FixedString(Bytes::copy_from_slice(reader.read_bytes(*n as usize)?)),
        ScalarType::Date => Value::Date(reader.read_u16_le()? as i32),
        ScalarType::Date32 => Value::Date(reader.read_i32_le()?),
        ScalarType::DateTime => Value::DateTime(reader.read_u32_le()?),
        ScalarType::DateTime64 { precision, .. } => Value::DateTime64 { ticks: reader.read_i64_le()?, precision: *precision },
        ScalarType::Uuid => {
            let bytes: [u8; 16] = reader.read_bytes(16)?.try_into().unwrap();
            Value::Uuid(uuid_from_wire_bytes(&bytes))
        }
        ScalarType::IPv4 => Value::IPv4(Ipv4Addr::from(reader.read_u32_le()?.swap_bytes())),
        ScalarType::IPv6 => {
            let bytes: [u8; 16] = reader.read_bytes(16)?.try_into().unwrap();
            Value::IPv6(Ipv6Addr::from(bytes))
        }
        ScalarType::Decimal { scale, width, .. } => {
            let unscaled = match width {
                DecimalWidth::Bits32 => I256::from(reader.read_i32_le()?),
                DecimalWidth::Bits64 => I256::from(reader.read_i64_le()?),
                DecimalWidth::Bits128 => I256::from(reader.read_i128_le()?),
                DecimalWidth::Bits256 => reader.read_i256_le()?,
            };
            Value::Decimal { unscaled, scale: *scale }
        }
        ScalarType::Enum { width, members } => {
            let raw = match width {
                EnumWidth::Bits8 => reader.read_i8()? as i32,
                EnumWidth::Bits16 => reader.read_i16_le()? as i32,
            };
            if opts.enum_as_number {
                Value::Enum { name: String::new(), value: raw }
            } else {
                match members.iter().find(|m| m.value == raw) {
                    Some(m) => Value::Enum { name: m.name.clone(), value: m.value },
                    None => Value::Enum { name: String::new(), value: raw },
                }
            }
        }
    })
}

fn coercion_scalar(scalar: &ScalarType, value: &Value) -> CodecError {
    CodecError::coercion(
        format!("expected {scalar}, got {value:?}"),
        ErrorContext::new().with_type(scalar.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_type;

    fn roundtrip(ty_str: &str, value: Value) -> Value {
        let ty = parse_type(ty_str).unwrap();
        let mut writer = WriteBuffer::new();
        encode_value(&mut writer, &ty, &value).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ReadBuffer::new(&bytes);
        decode_value(&mut reader, &ty, &DecodeOptions::new()).unwrap()
    }

    #[test]
    fn scalar_row_roundtrip() {
        assert_eq!(roundtrip("UInt32", Value::UInt32(42)), Value::UInt32(42));
        assert_eq!(roundtrip("String", Value::String(Bytes::from("hi"))), Value::String(Bytes::from("hi")));
    }

    #[test]
    fn nullable_row_roundtrip() {
        assert_eq!(roundtrip("Nullable(Int32)", Value::Null), Value::Null);
        assert_eq!(roundtrip("Nullable(Int32)", Value::Int32(7)), Value::Int32(7));
    }

    #[test]
    fn array_row_roundtrip_no_offsets() {
        let value = Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        assert_eq!(roundtrip("Array(Int32)", value.clone()), value);
        assert_eq!(roundtrip("Array(Int32)", Value::Array(vec![])), Value::Array(vec![]));
    }

    #[test]
    fn tuple_row_roundtrip_unnamed() {
        let value = Value::Tuple(vec![Value::Int32(1), Value::String(Bytes::from("a"))]);
        assert_eq!(roundtrip("Tuple(Int32, String)", value.clone()), value);
    }

    #[test]
    fn variant_row_roundtrip_with_null() {
        let v = Value::Variant { type_index: 1, value: Box::new(Value::UInt64(9)) };
        assert_eq!(roundtrip("Variant(String, UInt64)", v.clone()), v);
        assert_eq!(roundtrip("Variant(String, UInt64)", Value::Null), Value::Null);
    }

    #[test]
    fn dynamic_row_roundtrip_carries_type_inline() {
        let v = Value::Dynamic { type_name: "Int32".to_string(), value: Box::new(Value::Int32(5)) };
        assert_eq!(roundtrip("Dynamic", v.clone()), v);
        assert_eq!(roundtrip("Dynamic", Value::Null), Value::Null);
    }

    #[test]
    fn json_row_roundtrip_only_present_paths() {
        let v = Value::Json(vec![(
            "a.b".to_string(),
            Value::Dynamic { type_name: "String".to_string(), value: Box::new(Value::String(Bytes::from("x"))) },
        )]);
        assert_eq!(roundtrip("JSON", v.clone()), v);
    }

    #[test]
    fn block_roundtrip_with_names_and_types() {
        let block = RowFormatBlock {
            columns: vec![
                ("id".to_string(), parse_type("UInt32").unwrap()),
                ("name".to_string(), parse_type("String").unwrap()),
            ],
            rows: vec![
                vec![Value::UInt32(1), Value::String(Bytes::from("alice"))],
                vec![Value::UInt32(2), Value::String(Bytes::from("bob"))],
            ],
        };
        let mut writer = WriteBuffer::new();
        encode_row_block(&mut writer, &block, RowFormatFlavor::NamesAndTypes).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ReadBuffer::new(&bytes);
        let decoded = decode_row_block(&mut reader, RowFormatFlavor::NamesAndTypes, &[], &DecodeOptions::new()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn block_roundtrip_names_only_requires_caller_supplied_types() {
        let types = vec![parse_type("UInt32").unwrap()];
        let block = RowFormatBlock {
            columns: vec![("id".to_string(), types[0].clone())],
            rows: vec![vec![Value::UInt32(7)]],
        };
        let mut writer = WriteBuffer::new();
        encode_row_block(&mut writer, &block, RowFormatFlavor::Names).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ReadBuffer::new(&bytes);
        let decoded = decode_row_block(&mut reader, RowFormatFlavor::Names, &types, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded, block);
    }
}
