//! Map(K, V) codec (spec.md §4.G): framed identically to `Array(Tuple(K,
//! V))` — offsets, then the flattened key column, then the flattened value
//! column.

use std::sync::Arc;

use crate::column::{Column, MapColumn, MapRenderMode, Value};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::TypeExpr;
use crate::io::{ReadBuffer, WriteBuffer};

use crate::codec::{Codec, PrefixState};

#[derive(Debug)]
pub struct MapCodec {
    key_codec: Arc<dyn Codec>,
    key_type: TypeExpr,
    value_codec: Arc<dyn Codec>,
    value_type: TypeExpr,
}

impl MapCodec {
    pub fn new(key_codec: Arc<dyn Codec>, key_type: TypeExpr, value_codec: Arc<dyn Codec>, value_type: TypeExpr) -> Self {
        Self { key_codec, key_type, value_codec, value_type }
    }

    fn type_expr(&self) -> TypeExpr {
        TypeExpr::Map(Box::new(self.key_type.clone()), Box::new(self.value_type.clone()))
    }
}

impl Codec for MapCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        rows * 8 + self.key_codec.estimate_size(rows) + self.value_codec.estimate_size(rows)
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Map(m) = column else { return Err(mismatch(&self.type_expr())) };
        self.key_codec.write_prefix(writer, &m.keys)?;
        self.value_codec.write_prefix(writer, &m.values)
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<PrefixState> {
        Ok(PrefixState::Multi(vec![
            self.key_codec.read_prefix(reader, opts)?,
            self.value_codec.read_prefix(reader, opts)?,
        ]))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Map(m) = column else { return Err(mismatch(&self.type_expr())) };
        for &offset in &m.offsets {
            writer.write_u64_le(offset);
        }
        self.key_codec.encode_payload(writer, &m.keys)?;
        self.value_codec.encode_payload(writer, &m.values)
    }

    fn decode_payload(
        &self,
        reader: &mut ReadBuffer<'_>,
        row_count: u64,
        opts: &DecodeOptions,
        prefix: &PrefixState,
    ) -> CodecResult<Column> {
        let (key_prefix, value_prefix) = match prefix {
            PrefixState::Multi(v) if v.len() == 2 => (&v[0], &v[1]),
            _ => (&PrefixState::None, &PrefixState::None),
        };
        let mut offsets = Vec::with_capacity(row_count as usize);
        let mut prev = 0u64;
        for _ in 0..row_count {
            let offset = reader.read_u64_le()?;
            if offset < prev {
                return Err(non_monotonic_offset(&self.type_expr(), prev, offset));
            }
            prev = offset;
            offsets.push(offset);
        }
        let total = offsets.last().copied().unwrap_or(0);
        let keys = self.key_codec.decode_payload(reader, total, opts, key_prefix)?;
        let values = self.value_codec.decode_payload(reader, total, opts, value_prefix)?;
        let render = if opts.map_as_array { MapRenderMode::Ordered } else { MapRenderMode::Hashed };
        Ok(Column::Map(MapColumn::new(offsets, Arc::new(keys), Arc::new(values), render)))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut offsets = Vec::with_capacity(values.len());
        let mut flat_keys = Vec::new();
        let mut flat_values = Vec::new();
        let mut running = 0u64;
        for v in values {
            let Value::Map(pairs) = v else { return Err(coercion(&self.type_expr(), v)) };
            running += pairs.len() as u64;
            offsets.push(running);
            for (k, val) in pairs {
                flat_keys.push(k.clone());
                flat_values.push(val.clone());
            }
        }
        let keys = self.key_codec.from_values(&flat_keys)?;
        let vals = self.value_codec.from_values(&flat_values)?;
        Ok(Column::Map(MapColumn::new(offsets, Arc::new(keys), Arc::new(vals), MapRenderMode::Ordered)))
    }

    fn zero_value(&self) -> Value {
        Value::Map(Vec::new())
    }
}

fn mismatch(ty: &TypeExpr) -> CodecError {
    CodecError::invalid(
        format!("column storage does not match type {ty}"),
        ErrorContext::new().with_type(ty.to_string()),
    )
}

fn coercion(ty: &TypeExpr, v: &Value) -> CodecError {
    CodecError::coercion(format!("expected {ty}, got {v:?}"), ErrorContext::new())
}

fn non_monotonic_offset(ty: &TypeExpr, prev: u64, offset: u64) -> CodecError {
    CodecError::invalid(
        format!("Map offsets must be non-decreasing, got {offset} after {prev}"),
        ErrorContext::new().with_type(ty.to_string()),
    )
}
