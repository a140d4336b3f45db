//! String column storage: an ordered sequence of opaque byte runs (spec.md §3).

use bytes::Bytes;

use crate::column::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct StringColumn {
    /// Each row is a zero-copy slice into the original decode buffer when
    /// decoded, or an owned allocation when built via `from_values`.
    pub rows: Vec<Bytes>,
    pub fixed_width: Option<u32>,
}

impl StringColumn {
    pub fn new(rows: Vec<Bytes>) -> Self {
        Self { rows, fixed_width: None }
    }

    pub fn fixed(rows: Vec<Bytes>, width: u32) -> Self {
        Self { rows, fixed_width: Some(width) }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, i: usize) -> Value {
        if self.fixed_width.is_some() {
            Value::FixedString(self.rows[i].clone())
        } else {
            Value::String(self.rows[i].clone())
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> StringColumn {
        StringColumn {
            rows: self.rows[start..end].to_vec(),
            fixed_width: self.fixed_width,
        }
    }
}
