//! Columnar block framing (spec.md §4.H): an optional block-info header
//! gated by protocol revision, a column count and row count, then one
//! name/type/(serialization-kind)/data quadruple per column.

use tracing::debug;

use crate::codec::{Codec, CodecRegistry};
use crate::column::Column;
use crate::config::{DecodeOptions, EncodeOptions, ProtocolFeature};
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::{parse_type, TypeExpr};
use crate::io::{ReadBuffer, WriteBuffer};

/// One columnar block: parallel column name/type/data triples, all the same
/// row count.
#[derive(Debug, Clone)]
pub struct Block {
    pub columns: Vec<(String, TypeExpr, Column)>,
}

impl Block {
    pub fn new(columns: Vec<(String, TypeExpr, Column)>) -> Self {
        Self { columns }
    }

    pub fn num_rows(&self) -> u64 {
        self.columns.first().map(|(_, _, c)| c.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _, _)| n.as_str()).collect()
    }
}

/// Only the "default" per-column serialization is ever emitted on encode;
/// decode additionally accepts the sparse kind (spec.md §4.G "Sparse
/// serialization (decode-only path)"). Any other kind byte is a clean
/// `InvalidWireFormat`, not silent corruption.
const SERIALIZATION_KIND_DEFAULT: u8 = 0;
const CUSTOM_SERIALIZATION_KIND_SPARSE: u8 = 0;

/// Terminator bit on the last gap varint of a sparse column's gap stream
/// (spec.md §4.G).
const SPARSE_END_FLAG: u64 = 1 << 62;

pub fn encode_block(writer: &mut WriteBuffer, block: &Block, opts: &EncodeOptions) -> CodecResult<()> {
    if ProtocolFeature::supports_block_info(opts.client_version) {
        write_block_info(writer);
    }
    let num_rows = block.num_rows();
    writer.write_varint(block.columns.len() as u64);
    writer.write_varint(num_rows);
    let registry = CodecRegistry::global();
    for (name, ty, column) in &block.columns {
        writer.write_string(name.as_bytes());
        writer.write_string(ty.to_string().as_bytes());
        if ProtocolFeature::supports_custom_serialization(opts.client_version) {
            writer.write_u8(SERIALIZATION_KIND_DEFAULT);
        }
        if num_rows > 0 {
            let codec = registry.get_for_type(ty)?;
            codec.encode(writer, column)?;
        }
    }
    Ok(())
}

/// Encodes a schema-only block: names and types, zero rows, no prefix or
/// payload bytes per column (spec.md §4.H).
pub fn encode_schema_only(writer: &mut WriteBuffer, columns: &[(String, TypeExpr)], opts: &EncodeOptions) -> CodecResult<()> {
    if ProtocolFeature::supports_block_info(opts.client_version) {
        write_block_info(writer);
    }
    writer.write_varint(columns.len() as u64);
    writer.write_varint(0);
    for (name, ty) in columns {
        writer.write_string(name.as_bytes());
        writer.write_string(ty.to_string().as_bytes());
        if ProtocolFeature::supports_custom_serialization(opts.client_version) {
            writer.write_u8(SERIALIZATION_KIND_DEFAULT);
        }
    }
    Ok(())
}

pub fn decode_block(reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<Block> {
    if ProtocolFeature::supports_block_info(opts.client_version) {
        read_block_info(reader)?;
    }
    let num_cols = reader.read_varint()? as usize;
    let num_rows = reader.read_varint()?;
    if opts.debug {
        debug!(num_cols, num_rows, "decoding block");
    }
    let registry = CodecRegistry::global();
    let mut columns = Vec::with_capacity(num_cols);
    for _ in 0..num_cols {
        let name = reader.read_string()?.to_string();
        let type_string = reader.read_string()?.to_string();
        let ty = parse_type(&type_string)?;
        let mut sparse = false;
        if ProtocolFeature::supports_custom_serialization(opts.client_version) {
            let has_custom = reader.read_u8()?;
            if has_custom == 1 {
                let kind = reader.read_u8()?;
                if kind != CUSTOM_SERIALIZATION_KIND_SPARSE {
                    return Err(CodecError::invalid(
                        format!("unsupported column serialization kind {kind}"),
                        ErrorContext::new().with_column(name).with_type(type_string),
                    ));
                }
                sparse = true;
            } else if has_custom != SERIALIZATION_KIND_DEFAULT {
                return Err(CodecError::invalid(
                    format!("unsupported column serialization flag {has_custom}"),
                    ErrorContext::new().with_column(name).with_type(type_string),
                ));
            }
        }
        let codec = registry.get_for_type(&ty)?;
        let column = if num_rows > 0 {
            if sparse {
                decode_sparse_column(reader, codec.as_ref(), opts, num_rows)?
            } else {
                codec.decode(reader, num_rows, opts)?
            }
        } else {
            codec.from_values(&[])?
        };
        columns.push((name, ty, column));
    }
    Ok(Block::new(columns))
}

/// Decodes a sparse-serialized column (spec.md §4.G): a gap-coded stream of
/// non-default row positions followed by the dense payload of just those
/// rows, reconstructed into a full `row_count`-length column with the
/// codec's `zero_value()` filling every gap.
fn decode_sparse_column(reader: &mut ReadBuffer<'_>, codec: &dyn Codec, opts: &DecodeOptions, row_count: u64) -> CodecResult<Column> {
    let prefix = codec.read_prefix(reader, opts)?;
    let positions = read_sparse_gaps(reader, row_count)?;
    let dense = codec.decode_payload(reader, positions.len() as u64, opts, &prefix)?;
    let mut values = vec![codec.zero_value(); row_count as usize];
    for (dense_idx, &pos) in positions.iter().enumerate() {
        values[pos as usize] = dense.get(dense_idx);
    }
    codec.from_values(&values)
}

/// Reads the gap stream and returns the (ascending, in-range) row indices of
/// every non-default value. Each gap is the distance from the row just past
/// the previous non-default row; the final gap carries `SPARSE_END_FLAG`. A
/// final position that lands at or past `row_count` is a pure terminator —
/// "no more non-default rows" — and is not itself a row.
fn read_sparse_gaps(reader: &mut ReadBuffer<'_>, row_count: u64) -> CodecResult<Vec<u64>> {
    let mut positions = Vec::new();
    let mut cursor = 0u64;
    loop {
        let raw = reader.read_varint()?;
        let is_last = raw & SPARSE_END_FLAG != 0;
        let gap = raw & !SPARSE_END_FLAG;
        let position = cursor + gap;
        if position < row_count {
            positions.push(position);
        }
        cursor = position + 1;
        if is_last {
            break;
        }
    }
    Ok(positions)
}

fn write_block_info(writer: &mut WriteBuffer) {
    writer.write_varint(1);
    writer.write_u8(0); // is_overflows
    writer.write_varint(2);
    writer.write_i32_le(-1); // bucket_num
    writer.write_varint(0); // end of block-info fields
}

fn read_block_info(reader: &mut ReadBuffer<'_>) -> CodecResult<()> {
    loop {
        match reader.read_varint()? {
            0 => return Ok(()),
            1 => {
                reader.read_u8()?;
            }
            2 => {
                reader.read_i32_le()?;
            }
            other => {
                return Err(CodecError::invalid(
                    format!("unknown block-info field {other}"),
                    ErrorContext::new(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{NumericBuffer, NumericColumn, Value};
    use crate::grammar::ScalarType;

    #[test]
    fn roundtrips_a_simple_block() {
        let column = Column::Numeric(NumericColumn::new(ScalarType::Int32, NumericBuffer::I32(vec![1, 2, 3])));
        let block = Block::new(vec![("n".to_string(), TypeExpr::Scalar(ScalarType::Int32), column)]);
        let mut writer = WriteBuffer::new();
        encode_block(&mut writer, &block, &EncodeOptions::new()).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ReadBuffer::new(&bytes);
        let decoded = decode_block(&mut reader, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded.num_rows(), 3);
        assert_eq!(decoded.column_names(), vec!["n"]);
    }

    #[test]
    fn schema_only_block_has_no_column_payload() {
        let mut writer = WriteBuffer::new();
        encode_schema_only(&mut writer, &[("n".to_string(), TypeExpr::Scalar(ScalarType::Int32))], &EncodeOptions::new()).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ReadBuffer::new(&bytes);
        let decoded = decode_block(&mut reader, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded.num_rows(), 0);
        assert_eq!(decoded.column_names(), vec!["n"]);
    }

    /// Hand-crafts a block whose sole column is sparse-serialized (spec.md
    /// §4.G "Sparse serialization (decode-only path)") with non-default
    /// values at rows 1 and 3 of 5, and checks the decoder reconstructs the
    /// full dense column with zeros filling the gaps.
    #[test]
    fn decodes_a_sparse_serialized_column() {
        let opts = DecodeOptions::new().with_client_version(ProtocolFeature::CUSTOM_SERIALIZATION_REVISION);
        let mut writer = WriteBuffer::new();
        write_block_info(&mut writer);
        writer.write_varint(1); // numCols
        writer.write_varint(5); // numRows
        writer.write_string(b"n");
        writer.write_string(b"Int32");
        writer.write_u8(1); // has custom serialization
        writer.write_u8(CUSTOM_SERIALIZATION_KIND_SPARSE);
        // gap stream: non-default rows at 1 and 3 out of 5.
        writer.write_varint(1); // position 0 + 1 = 1
        writer.write_varint(1 | SPARSE_END_FLAG); // position 2 + 1 = 3, last
        // dense payload: the two non-default Int32 values.
        writer.write_i32_le(10);
        writer.write_i32_le(20);

        let bytes = writer.into_bytes();
        let mut reader = ReadBuffer::new(&bytes);
        let decoded = decode_block(&mut reader, &opts).unwrap();
        assert_eq!(decoded.num_rows(), 5);
        let values: Vec<i32> = (0..5)
            .map(|i| match decoded.columns[0].2.get(i) {
                Value::Int32(v) => v,
                other => panic!("expected Int32, got {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![0, 10, 0, 20, 0]);
    }
}
