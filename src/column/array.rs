//! Array(T) column storage (spec.md §3, §4.G).

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::Column;

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayColumn {
    /// `offsets[i]` is the exclusive end of row `i` in `inner`; `offsets[-1]`
    /// is implicitly 0. Length equals the row count.
    pub offsets: Vec<u64>,
    pub inner: Arc<Column>,
}

impl ArrayColumn {
    pub fn new(offsets: Vec<u64>, inner: Arc<Column>) -> Self {
        Self { offsets, inner }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn row_start(&self, i: usize) -> u64 {
        if i == 0 {
            0
        } else {
            self.offsets[i - 1]
        }
    }

    pub fn row_end(&self, i: usize) -> u64 {
        self.offsets[i]
    }

    pub fn get(&self, i: usize) -> Value {
        let start = self.row_start(i) as usize;
        let end = self.row_end(i) as usize;
        Value::Array((start..end).map(|j| self.inner.get(j)).collect())
    }

    pub fn slice(&self, start: usize, end: usize) -> ArrayColumn {
        let base = self.row_start(start);
        let new_offsets = self.offsets[start..end].iter().map(|o| o - base).collect();
        let inner_start = base as usize;
        let inner_end = if start == end { inner_start } else { self.row_end(end - 1) as usize };
        ArrayColumn {
            offsets: new_offsets,
            inner: Arc::new(self.inner.slice(inner_start, inner_end)),
        }
    }
}
