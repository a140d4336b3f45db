//! Nullable(T) column storage (spec.md §3, invariant 1).

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::Column;

#[derive(Debug, Clone, PartialEq)]
pub struct NullableColumn {
    /// One byte per row; 1 means null. Parallel to `inner`, same length.
    pub nulls: Vec<u8>,
    pub inner: Arc<Column>,
}

impl NullableColumn {
    pub fn new(nulls: Vec<u8>, inner: Arc<Column>) -> Self {
        debug_assert_eq!(nulls.len(), inner.len());
        Self { nulls, inner }
    }

    pub fn len(&self) -> usize {
        self.nulls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nulls.is_empty()
    }

    pub fn is_null(&self, i: usize) -> bool {
        self.nulls[i] != 0
    }

    pub fn get(&self, i: usize) -> Value {
        if self.is_null(i) {
            Value::Null
        } else {
            self.inner.get(i)
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> NullableColumn {
        NullableColumn {
            nulls: self.nulls[start..end].to_vec(),
            inner: Arc::new(self.inner.slice(start, end)),
        }
    }
}
