//! Array(T) codec (spec.md §4.G): a `u64` offset per row followed by the
//! flattened inner column.

use std::sync::Arc;

use crate::column::{ArrayColumn, Column, Value};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::TypeExpr;
use crate::io::{ReadBuffer, WriteBuffer};

use crate::codec::{Codec, PrefixState};

#[derive(Debug)]
pub struct ArrayCodec {
    inner_codec: Arc<dyn Codec>,
    inner_type: TypeExpr,
}

impl ArrayCodec {
    pub fn new(inner_codec: Arc<dyn Codec>, inner_type: TypeExpr) -> Self {
        Self { inner_codec, inner_type }
    }
}

impl Codec for ArrayCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        rows * 8 + self.inner_codec.estimate_size(rows)
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Array(a) = column else { return Err(mismatch(&self.inner_type)) };
        self.inner_codec.write_prefix(writer, &a.inner)
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<PrefixState> {
        Ok(PrefixState::Single(Box::new(self.inner_codec.read_prefix(reader, opts)?)))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Array(a) = column else { return Err(mismatch(&self.inner_type)) };
        for &offset in &a.offsets {
            writer.write_u64_le(offset);
        }
        self.inner_codec.encode_payload(writer, &a.inner)
    }

    fn decode_payload(
        &self,
        reader: &mut ReadBuffer<'_>,
        row_count: u64,
        opts: &DecodeOptions,
        prefix: &PrefixState,
    ) -> CodecResult<Column> {
        let inner_prefix = match prefix {
            PrefixState::Single(p) => p.as_ref(),
            _ => &PrefixState::None,
        };
        let mut offsets = Vec::with_capacity(row_count as usize);
        let mut prev = 0u64;
        for _ in 0..row_count {
            let offset = reader.read_u64_le()?;
            if offset < prev {
                return Err(non_monotonic_offset(&self.inner_type, prev, offset));
            }
            prev = offset;
            offsets.push(offset);
        }
        let total = offsets.last().copied().unwrap_or(0);
        let inner = self.inner_codec.decode_payload(reader, total, opts, inner_prefix)?;
        Ok(Column::Array(ArrayColumn::new(offsets, Arc::new(inner))))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut offsets = Vec::with_capacity(values.len());
        let mut flattened = Vec::new();
        let mut running = 0u64;
        for v in values {
            let Value::Array(items) = v else { return Err(coercion(&self.inner_type, v)) };
            running += items.len() as u64;
            offsets.push(running);
            flattened.extend(items.iter().cloned());
        }
        let inner = self.inner_codec.from_values(&flattened)?;
        Ok(Column::Array(ArrayColumn::new(offsets, Arc::new(inner))))
    }

    fn zero_value(&self) -> Value {
        Value::Array(Vec::new())
    }
}

fn mismatch(ty: &TypeExpr) -> CodecError {
    CodecError::invalid(
        format!("column storage does not match type Array({ty})"),
        ErrorContext::new().with_type(format!("Array({ty})")),
    )
}

fn coercion(inner_type: &TypeExpr, v: &Value) -> CodecError {
    CodecError::coercion(
        format!("expected Array({inner_type}), got {v:?}"),
        ErrorContext::new(),
    )
}

fn non_monotonic_offset(inner_type: &TypeExpr, prev: u64, offset: u64) -> CodecError {
    CodecError::invalid(
        format!("Array offsets must be non-decreasing, got {offset} after {prev}"),
        ErrorContext::new().with_type(format!("Array({inner_type})")),
    )
}
