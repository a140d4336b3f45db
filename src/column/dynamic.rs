//! Dynamic column storage (spec.md §3, §4.G): like Variant, but the set of
//! possible types is discovered at decode/encode time rather than fixed by
//! the type string.

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::variant::compute_group_indices;
use crate::column::Column;
use crate::grammar::TypeExpr;

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicColumn {
    pub types: Vec<TypeExpr>,
    /// In-memory discriminators are always `u32`; the wire width (the
    /// smallest of u8/u16/u32 that fits `types.len() + 1` values) is a
    /// serialization-time detail handled by the codec.
    pub discriminators: Vec<u32>,
    pub groups: Vec<Arc<Column>>,
    row_to_group_index: Vec<u32>,
}

impl DynamicColumn {
    pub fn new(types: Vec<TypeExpr>, discriminators: Vec<u32>, groups: Vec<Arc<Column>>) -> Self {
        let null_marker = types.len() as u32;
        let row_to_group_index = compute_group_indices_u32(&discriminators, null_marker);
        Self { types, discriminators, groups, row_to_group_index }
    }

    pub fn null_discriminator(&self) -> u32 {
        self.types.len() as u32
    }

    pub fn len(&self) -> usize {
        self.discriminators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discriminators.is_empty()
    }

    pub fn get(&self, i: usize) -> Value {
        let d = self.discriminators[i];
        if d == self.null_discriminator() {
            Value::Null
        } else {
            let group_idx = self.row_to_group_index[i] as usize;
            Value::Dynamic {
                type_name: self.types[d as usize].to_string(),
                value: Box::new(self.groups[d as usize].get(group_idx)),
            }
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> DynamicColumn {
        let discriminators = self.discriminators[start..end].to_vec();
        let null_marker = self.null_discriminator();
        let mut group_counts = vec![0usize; self.groups.len()];
        for &d in &discriminators {
            if d != null_marker {
                group_counts[d as usize] += 1;
            }
        }
        let mut group_cursors = vec![0usize; self.groups.len()];
        for &d in &self.discriminators[..start] {
            if d != null_marker {
                group_cursors[d as usize] += 1;
            }
        }
        let groups = self
            .groups
            .iter()
            .enumerate()
            .map(|(g, col)| {
                let from = group_cursors[g];
                let to = from + group_counts[g];
                Arc::new(col.slice(from, to))
            })
            .collect();
        DynamicColumn::new(self.types.clone(), discriminators, groups)
    }
}

fn compute_group_indices_u32(discriminators: &[u32], null_marker: u32) -> Vec<u32> {
    let mut counters: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();
    discriminators
        .iter()
        .map(|&d| {
            if d == null_marker {
                0
            } else {
                let c = counters.entry(d).or_insert(0);
                let idx = *c;
                *c += 1;
                idx
            }
        })
        .collect()
}

/// Number of bytes needed to store discriminators for `type_count` discovered
/// types plus one null marker (spec.md §4.G: "width chosen per type count").
pub fn discriminator_width(type_count: usize) -> usize {
    let n = type_count as u64 + 1;
    if n <= u8::MAX as u64 + 1 {
        1
    } else if n <= u16::MAX as u64 + 1 {
        2
    } else {
        4
    }
}
