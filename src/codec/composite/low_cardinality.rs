//! LowCardinality(T) codec (spec.md §4.G): a one-row version marker as the
//! column prefix, then a per-block header (index width, dictionary size,
//! dictionary, row count, index array) as the payload. An empty column
//! (zero rows reaching this codec, e.g. a fully-empty flattened `Array`
//! inner) writes nothing at all.

use std::sync::Arc;

use crate::column::{Column, IndexBuffer, LowCardinalityColumn, Value};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::TypeExpr;
use crate::io::{ReadBuffer, WriteBuffer};

use crate::codec::{Codec, PrefixState};

const DICTIONARY_VERSION: u64 = 1;

/// Per-block header bit 9: "has additional keys" — always set for wire
/// traffic since the dictionary is always inline (spec.md §4.G).
const HAS_ADDITIONAL_KEYS_FLAG: u64 = 1 << 9;
const INDEX_WIDTH_MASK: u64 = 0b11;

#[derive(Debug)]
pub struct LowCardinalityCodec {
    dict_codec: Arc<dyn Codec>,
    dict_type: TypeExpr,
    inner_nullable: bool,
}

impl LowCardinalityCodec {
    pub fn new(dict_codec: Arc<dyn Codec>, dict_type: TypeExpr, inner_nullable: bool) -> Self {
        Self { dict_codec, dict_type, inner_nullable }
    }

    fn type_expr(&self) -> TypeExpr {
        let inner = if self.inner_nullable {
            TypeExpr::Nullable(Box::new(self.dict_type.clone()))
        } else {
            self.dict_type.clone()
        };
        TypeExpr::LowCardinality(Box::new(inner))
    }
}

impl Codec for LowCardinalityCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        24 + rows * 8
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, _column: &Column) -> CodecResult<()> {
        writer.write_u64_le(DICTIONARY_VERSION);
        Ok(())
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, _opts: &DecodeOptions) -> CodecResult<PrefixState> {
        let version = reader.read_u64_le()?;
        if version != DICTIONARY_VERSION {
            return Err(CodecError::invalid(
                format!("unsupported LowCardinality dictionary version {version}"),
                ErrorContext::new().with_type(self.type_expr().to_string()),
            ));
        }
        Ok(PrefixState::LowCardinalityVersion(version))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::LowCardinality(lc) = column else { return Err(mismatch(&self.type_expr())) };
        if lc.indices.is_empty() {
            return Ok(());
        }
        let dict_size = lc.dictionary.len();
        let width = IndexBuffer::width_for(dict_size as usize);
        let flags = width as u64 | HAS_ADDITIONAL_KEYS_FLAG;
        writer.write_u64_le(flags);
        writer.write_u64_le(dict_size);
        self.dict_codec.write_prefix(writer, &lc.dictionary)?;
        self.dict_codec.encode_payload(writer, &lc.dictionary)?;
        writer.write_u64_le(lc.indices.len() as u64);
        write_indices(writer, &lc.indices);
        Ok(())
    }

    fn decode_payload(
        &self,
        reader: &mut ReadBuffer<'_>,
        row_count: u64,
        opts: &DecodeOptions,
        _prefix: &PrefixState,
    ) -> CodecResult<Column> {
        if row_count == 0 {
            let dictionary = self.dict_codec.from_values(&[])?;
            return Ok(Column::LowCardinality(LowCardinalityColumn::new(
                Arc::new(dictionary),
                IndexBuffer::U8(Vec::new()),
                self.inner_nullable,
            )));
        }
        let flags = reader.read_u64_le()?;
        let width = flags & INDEX_WIDTH_MASK;
        let dict_size = reader.read_u64_le()?;
        let dict_prefix = self.dict_codec.read_prefix(reader, opts)?;
        let dictionary = self.dict_codec.decode_payload(reader, dict_size, opts, &dict_prefix)?;
        let n = reader.read_u64_le()? as usize;
        let indices = read_indices(reader, width, n)?;
        Ok(Column::LowCardinality(LowCardinalityColumn::new(Arc::new(dictionary), indices, self.inner_nullable)))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut dict_values: Vec<Value> = Vec::new();
        if self.inner_nullable {
            dict_values.push(self.dict_codec.zero_value());
        }
        let mut indices_raw = Vec::with_capacity(values.len());
        for v in values {
            if self.inner_nullable && v.is_null() {
                indices_raw.push(0u64);
                continue;
            }
            let pos = dict_values.iter().position(|d| d == v);
            let idx = match pos {
                Some(p) => p as u64,
                None => {
                    dict_values.push(v.clone());
                    (dict_values.len() - 1) as u64
                }
            };
            indices_raw.push(idx);
        }
        let dictionary = self.dict_codec.from_values(&dict_values)?;
        let width = IndexBuffer::width_for(dict_values.len());
        let indices = pack_indices(width, &indices_raw);
        Ok(Column::LowCardinality(LowCardinalityColumn::new(Arc::new(dictionary), indices, self.inner_nullable)))
    }

    fn zero_value(&self) -> Value {
        if self.inner_nullable {
            Value::Null
        } else {
            self.dict_codec.zero_value()
        }
    }
}

fn write_indices(writer: &mut WriteBuffer, indices: &IndexBuffer) {
    match indices {
        IndexBuffer::U8(v) => v.iter().for_each(|&x| writer.write_u8(x)),
        IndexBuffer::U16(v) => v.iter().for_each(|&x| writer.write_u16_le(x)),
        IndexBuffer::U32(v) => v.iter().for_each(|&x| writer.write_u32_le(x)),
        IndexBuffer::U64(v) => v.iter().for_each(|&x| writer.write_u64_le(x)),
    }
}

fn read_indices(reader: &mut ReadBuffer<'_>, width: u64, n: usize) -> CodecResult<IndexBuffer> {
    Ok(match width {
        0 => IndexBuffer::U8(reader.read_typed_array(n)?),
        1 => IndexBuffer::U16(reader.read_typed_array(n)?),
        2 => IndexBuffer::U32(reader.read_typed_array(n)?),
        3 => IndexBuffer::U64(reader.read_typed_array(n)?),
        other => {
            return Err(CodecError::invalid(
                format!("unsupported LowCardinality index width code {other}"),
                ErrorContext::new(),
            ))
        }
    })
}

fn pack_indices(width: u8, raw: &[u64]) -> IndexBuffer {
    match width {
        0 => IndexBuffer::U8(raw.iter().map(|&v| v as u8).collect()),
        1 => IndexBuffer::U16(raw.iter().map(|&v| v as u16).collect()),
        2 => IndexBuffer::U32(raw.iter().map(|&v| v as u32).collect()),
        _ => IndexBuffer::U64(raw.to_vec()),
    }
}

fn mismatch(ty: &TypeExpr) -> CodecError {
    CodecError::invalid(format!("column storage does not match type {ty}"), ErrorContext::new().with_type(ty.to_string()))
}
