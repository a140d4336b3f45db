//! LowCardinality(T) column storage (spec.md §3, §4.G): a dictionary of
//! unique `T` values plus a per-row index array.

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::Column;

#[derive(Debug, Clone, PartialEq)]
pub enum IndexBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl IndexBuffer {
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U8(v) => v.len(),
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
            IndexBuffer::U64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> u64 {
        match self {
            IndexBuffer::U8(v) => v[i] as u64,
            IndexBuffer::U16(v) => v[i] as u64,
            IndexBuffer::U32(v) => v[i] as u64,
            IndexBuffer::U64(v) => v[i],
        }
    }

    /// Smallest width (0=u8, 1=u16, 2=u32, 3=u64) able to address `dict_size`
    /// distinct entries, matching the flags bits 0-1 of spec.md §4.G.
    pub fn width_for(dict_size: usize) -> u8 {
        if dict_size <= u8::MAX as usize + 1 {
            0
        } else if dict_size <= u16::MAX as usize + 1 {
            1
        } else if dict_size <= u32::MAX as usize + 1 {
            2
        } else {
            3
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> IndexBuffer {
        match self {
            IndexBuffer::U8(v) => IndexBuffer::U8(v[start..end].to_vec()),
            IndexBuffer::U16(v) => IndexBuffer::U16(v[start..end].to_vec()),
            IndexBuffer::U32(v) => IndexBuffer::U32(v[start..end].to_vec()),
            IndexBuffer::U64(v) => IndexBuffer::U64(v[start..end].to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LowCardinalityColumn {
    /// Holds unwrapped `T` when the logical inner type is `Nullable(T)`
    /// (spec.md §3, invariant 4); index 0 then means null unconditionally.
    pub dictionary: Arc<Column>,
    pub indices: IndexBuffer,
    pub inner_nullable: bool,
}

impl LowCardinalityColumn {
    pub fn new(dictionary: Arc<Column>, indices: IndexBuffer, inner_nullable: bool) -> Self {
        Self { dictionary, indices, inner_nullable }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, i: usize) -> Value {
        let idx = self.indices.get(i) as usize;
        if self.inner_nullable && idx == 0 {
            Value::Null
        } else {
            self.dictionary.get(idx)
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> LowCardinalityColumn {
        LowCardinalityColumn {
            dictionary: self.dictionary.clone(),
            indices: self.indices.slice(start, end),
            inner_nullable: self.inner_nullable,
        }
    }
}
