//! Row-oriented view over a decoded block (spec.md §4.J): the same columnar
//! storage, read through a per-row interface for callers that want to
//! iterate rows rather than columns.

use bytes::Bytes;

use crate::block::Block;
use crate::column::Value;

/// Rendering options for the row view's `to_object`/`to_array`/`row(i)`
/// conversions. Kept separate from `DecodeOptions` since these affect only
/// how already-decoded values are presented, not how bytes are parsed.
#[derive(Debug, Clone, Default)]
pub struct RowFormatOptions {
    /// Render 64-bit-and-wider integers and decimals as decimal strings
    /// instead of native numeric values, for callers whose target
    /// representation can't hold full 64-bit (or wider) precision losslessly.
    pub big_int_as_string: bool,
}

/// A read-only row-level view over one decoded `Block`.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    block: &'a Block,
}

impl<'a> RowView<'a> {
    pub fn new(block: &'a Block) -> Self {
        Self { block }
    }

    pub fn length(&self) -> u64 {
        self.block.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.block.num_columns()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.block.column_names()
    }

    pub fn get_column(&self, name: &str) -> Option<&'a crate::column::Column> {
        self.block.columns.iter().find(|(n, _, _)| n == name).map(|(_, _, c)| c)
    }

    pub fn get_column_at(&self, index: usize) -> Option<&'a crate::column::Column> {
        self.block.columns.get(index).map(|(_, _, c)| c)
    }

    pub fn get_at(&self, row: usize, col: usize) -> Option<Value> {
        self.get_column_at(col).map(|c| c.get(row))
    }

    /// A lazy per-row proxy: cheap to construct, materializes values only
    /// when asked.
    pub fn row(&self, index: usize) -> RowProxy<'a> {
        RowProxy { block: self.block, index }
    }

    pub fn to_array(&self, opts: &RowFormatOptions) -> Vec<Vec<Value>> {
        (0..self.length() as usize).map(|i| self.row(i).to_array(opts)).collect()
    }

    pub fn to_object(&self, opts: &RowFormatOptions) -> Vec<Vec<(String, Value)>> {
        (0..self.length() as usize).map(|i| self.row(i).to_object(opts)).collect()
    }
}

/// A single row, addressed lazily against its parent block.
#[derive(Debug, Clone, Copy)]
pub struct RowProxy<'a> {
    block: &'a Block,
    index: usize,
}

impl<'a> RowProxy<'a> {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.block.columns.iter().find(|(n, _, _)| n == name).map(|(_, _, c)| c.get(self.index))
    }

    pub fn get_at(&self, col: usize) -> Option<Value> {
        self.block.columns.get(col).map(|(_, _, c)| c.get(self.index))
    }

    pub fn to_array(&self, opts: &RowFormatOptions) -> Vec<Value> {
        self.block.columns.iter().map(|(_, _, c)| render(c.get(self.index), opts)).collect()
    }

    pub fn to_object(&self, opts: &RowFormatOptions) -> Vec<(String, Value)> {
        self.block
            .columns
            .iter()
            .map(|(name, _, c)| (name.clone(), render(c.get(self.index), opts)))
            .collect()
    }
}

fn render(value: Value, opts: &RowFormatOptions) -> Value {
    if !opts.big_int_as_string {
        return value;
    }
    match value {
        Value::Int64(v) => Value::String(Bytes::from(v.to_string())),
        Value::UInt64(v) => Value::String(Bytes::from(v.to_string())),
        Value::Int128(v) => Value::String(Bytes::from(v.to_string())),
        Value::UInt128(v) => Value::String(Bytes::from(v.to_string())),
        Value::Int256(v) => Value::String(Bytes::from(v.to_string())),
        Value::UInt256(v) => Value::String(Bytes::from(v.to_string())),
        Value::Decimal { unscaled, scale } => Value::String(Bytes::from(format_decimal(unscaled, scale))),
        other => other,
    }
}

fn format_decimal(unscaled: ethnum::I256, scale: u16) -> String {
    let negative = unscaled < 0;
    let magnitude = if negative { (-unscaled).to_string() } else { unscaled.to_string() };
    let scale = scale as usize;
    let padded = if magnitude.len() <= scale { "0".repeat(scale - magnitude.len() + 1) + &magnitude } else { magnitude };
    let split = padded.len() - scale;
    let (int_part, frac_part) = padded.split_at(split);
    let sign = if negative { "-" } else { "" };
    if scale == 0 {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}.{frac_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, NumericBuffer, NumericColumn};
    use crate::grammar::ScalarType;

    fn sample_block() -> Block {
        let a = Column::Numeric(NumericColumn::new(ScalarType::Int32, NumericBuffer::I32(vec![1, 2])));
        let b = Column::Numeric(NumericColumn::new(ScalarType::Int64, NumericBuffer::I64(vec![100, 200])));
        Block::new(vec![
            ("a".to_string(), crate::grammar::TypeExpr::Scalar(ScalarType::Int32), a),
            ("b".to_string(), crate::grammar::TypeExpr::Scalar(ScalarType::Int64), b),
        ])
    }

    #[test]
    fn row_proxy_reads_by_name_and_index() {
        let block = sample_block();
        let view = RowView::new(&block);
        let row = view.row(1);
        assert_eq!(row.get("a"), Some(Value::Int32(2)));
        assert_eq!(row.get_at(1), Some(Value::Int64(200)));
    }

    #[test]
    fn big_int_as_string_stringifies_wide_integers() {
        let block = sample_block();
        let view = RowView::new(&block);
        let opts = RowFormatOptions { big_int_as_string: true };
        let row = view.row(0).to_object(&opts);
        assert_eq!(row[0].1, Value::Int32(1));
        assert_eq!(row[1].1, Value::String(Bytes::from("100")));
    }

    #[test]
    fn format_decimal_places_point_at_scale() {
        assert_eq!(format_decimal(ethnum::I256::from(12345i64), 2), "123.45");
        assert_eq!(format_decimal(ethnum::I256::from(5i64), 3), "0.005");
        assert_eq!(format_decimal(ethnum::I256::from(-150i64), 2), "-1.50");
    }
}
