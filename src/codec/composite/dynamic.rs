//! Dynamic codec (spec.md §4.G): unlike `Variant`, the set of types is
//! discovered at encode time from the data itself and written as part of
//! the column's own prefix, so decode has to resolve child codecs on the
//! fly instead of from the declared grammar.

use std::sync::Arc;

use crate::column::dynamic::discriminator_width;
use crate::column::{Column, DynamicColumn, Value};
use crate::codec::registry::build_codec;
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::{parse_type, TypeExpr};
use crate::io::{ReadBuffer, WriteBuffer};

use crate::codec::{Codec, PrefixState};

const DYNAMIC_PREFIX_VERSION: u64 = 3;

#[derive(Debug)]
pub struct DynamicCodec {
    #[allow(dead_code)]
    max_types: Option<u64>,
}

impl DynamicCodec {
    pub fn new(max_types: Option<u64>) -> Self {
        Self { max_types }
    }
}

impl Codec for DynamicCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        rows * 4 + 64
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Dynamic(d) = column else { return Err(mismatch()) };
        writer.write_u64_le(DYNAMIC_PREFIX_VERSION);
        writer.write_varint(d.types.len() as u64);
        for (ty, group) in d.types.iter().zip(&d.groups) {
            writer.write_string(ty.to_string().as_bytes());
            let codec = build_codec(ty)?;
            codec.write_prefix(writer, group)?;
        }
        Ok(())
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<PrefixState> {
        let version = reader.read_u64_le()?;
        if version != DYNAMIC_PREFIX_VERSION {
            return Err(CodecError::invalid(
                format!("unsupported Dynamic prefix version {version}"),
                ErrorContext::new().with_type("Dynamic".to_string()),
            ));
        }
        let count = reader.read_varint()? as usize;
        let mut types = Vec::with_capacity(count);
        for _ in 0..count {
            let type_string = reader.read_string()?;
            let ty = parse_type(type_string)?;
            let codec = build_codec(&ty)?;
            let child_prefix = codec.read_prefix(reader, opts)?;
            types.push((ty, codec, child_prefix));
        }
        Ok(PrefixState::DynamicTypes(types))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Dynamic(d) = column else { return Err(mismatch()) };
        let width = discriminator_width(d.types.len());
        for &disc in &d.discriminators {
            match width {
                1 => writer.write_u8(disc as u8),
                2 => writer.write_u16_le(disc as u16),
                _ => writer.write_u32_le(disc),
            }
        }
        for (ty, group) in d.types.iter().zip(&d.groups) {
            let codec = build_codec(ty)?;
            codec.encode_payload(writer, group)?;
        }
        Ok(())
    }

    fn decode_payload(
        &self,
        reader: &mut ReadBuffer<'_>,
        row_count: u64,
        opts: &DecodeOptions,
        prefix: &PrefixState,
    ) -> CodecResult<Column> {
        let PrefixState::DynamicTypes(types_with_codecs) = prefix else { return Err(mismatch()) };
        let types: Vec<TypeExpr> = types_with_codecs.iter().map(|(t, _, _)| t.clone()).collect();
        let width = discriminator_width(types.len());
        let mut discriminators = Vec::with_capacity(row_count as usize);
        for _ in 0..row_count {
            let d = match width {
                1 => reader.read_u8()? as u32,
                2 => reader.read_u16_le()? as u32,
                _ => reader.read_u32_le()?,
            };
            discriminators.push(d);
        }
        let null_marker = types.len() as u32;
        let mut counts = vec![0u64; types.len()];
        for &d in &discriminators {
            if d != null_marker {
                counts[d as usize] += 1;
            }
        }
        let mut groups = Vec::with_capacity(types.len());
        for (i, (_, codec, child_prefix)) in types_with_codecs.iter().enumerate() {
            let g = codec.decode_payload(reader, counts[i], opts, child_prefix)?;
            groups.push(Arc::new(g));
        }
        Ok(Column::Dynamic(DynamicColumn::new(types, discriminators, groups)))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut types: Vec<TypeExpr> = Vec::new();
        let mut discriminators = Vec::with_capacity(values.len());
        let mut per_type_values: Vec<Vec<Value>> = Vec::new();
        for v in values {
            match v {
                Value::Null => discriminators.push(u32::MAX),
                Value::Dynamic { type_name, value } => {
                    let ty = parse_type(type_name)?;
                    let idx = match types.iter().position(|t| t == &ty) {
                        Some(i) => i,
                        None => {
                            types.push(ty);
                            per_type_values.push(Vec::new());
                            types.len() - 1
                        }
                    };
                    discriminators.push(idx as u32);
                    per_type_values[idx].push((**value).clone());
                }
                other => return Err(CodecError::coercion(format!("expected Dynamic, got {other:?}"), ErrorContext::new())),
            }
        }
        // Null rows are recorded as u32::MAX above since the final type count
        // (and therefore the null discriminator DynamicColumn assigns) isn't
        // known until every row has been scanned; remap now that it is.
        let null_marker = types.len() as u32;
        for d in &mut discriminators {
            if *d == u32::MAX {
                *d = null_marker;
            }
        }
        let mut groups = Vec::with_capacity(types.len());
        for (ty, vals) in types.iter().zip(&per_type_values) {
            let codec = build_codec(ty)?;
            groups.push(Arc::new(codec.from_values(vals)?));
        }
        Ok(Column::Dynamic(DynamicColumn::new(types, discriminators, groups)))
    }

    fn zero_value(&self) -> Value {
        Value::Null
    }
}

fn mismatch() -> CodecError {
    CodecError::invalid("column storage does not match type Dynamic", ErrorContext::new().with_type("Dynamic".to_string()))
}
