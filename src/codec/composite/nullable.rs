//! Nullable(T) codec (spec.md §4.G, invariant 1): a row-count of null flags
//! followed by the inner column, which is physically present at every row
//! (including null ones, which carry a placeholder value on the wire).

use std::sync::Arc;

use crate::column::{Column, NullableColumn, Value};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::TypeExpr;
use crate::io::{ReadBuffer, WriteBuffer};

use crate::codec::{Codec, PrefixState};

#[derive(Debug)]
pub struct NullableCodec {
    inner_codec: Arc<dyn Codec>,
    inner_type: TypeExpr,
}

impl NullableCodec {
    pub fn new(inner_codec: Arc<dyn Codec>, inner_type: TypeExpr) -> Self {
        Self { inner_codec, inner_type }
    }
}

impl Codec for NullableCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        rows + self.inner_codec.estimate_size(rows)
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Nullable(n) = column else { return Err(mismatch(&self.inner_type)) };
        self.inner_codec.write_prefix(writer, &n.inner)
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<PrefixState> {
        Ok(PrefixState::Single(Box::new(self.inner_codec.read_prefix(reader, opts)?)))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Nullable(n) = column else { return Err(mismatch(&self.inner_type)) };
        for &flag in &n.nulls {
            writer.write_u8(flag);
        }
        self.inner_codec.encode_payload(writer, &n.inner)
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
        let mut nulls = Vec::with_capacity(row_count as usize);
        for _ in 0..row_count {
            nulls.push(reader.read_u8()?);
        }
        let inner = self.inner_codec.decode_payload(reader, row_count, opts, inner_prefix)?;
        Ok(Column::Nullable(NullableColumn::new(nulls, Arc::new(inner))))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut nulls = Vec::with_capacity(values.len());
        let mut inner_values = Vec::with_capacity(values.len());
        for v in values {
            if v.is_null() {
                nulls.push(1u8);
                inner_values.push(self.inner_codec.zero_value());
            } else {
                nulls.push(0u8);
                inner_values.push(v.clone());
            }
        }
        let inner = self.inner_codec.from_values(&inner_values)?;
        Ok(Column::Nullable(NullableColumn::new(nulls, Arc::new(inner))))
    }

    fn zero_value(&self) -> Value {
        Value::Null
    }
}

fn mismatch(ty: &TypeExpr) -> CodecError {
    CodecError::invalid(
        format!("column storage does not match type Nullable({ty})"),
        ErrorContext::new().with_type(format!("Nullable({ty})")),
    )
}
