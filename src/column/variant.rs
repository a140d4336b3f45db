//! Variant(T1, ..., Tn) column storage (spec.md §3, §4.G).

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::Column;
use crate::grammar::TypeExpr;

pub const VARIANT_NULL_DISCRIMINATOR: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq)]
pub struct VariantColumn {
    pub discriminators: Vec<u8>,
    pub group_types: Vec<TypeExpr>,
    pub groups: Vec<Arc<Column>>,
    /// Precomputed per-row index into its group (spec.md §4.D): makes
    /// `get(i)` O(1) instead of rescanning prior discriminators.
    row_to_group_index: Vec<u32>,
}

impl VariantColumn {
    pub fn new(discriminators: Vec<u8>, group_types: Vec<TypeExpr>, groups: Vec<Arc<Column>>) -> Self {
        let row_to_group_index = compute_group_indices(&discriminators, VARIANT_NULL_DISCRIMINATOR);
        Self { discriminators, group_types, groups, row_to_group_index }
    }

    pub fn len(&self) -> usize {
        self.discriminators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discriminators.is_empty()
    }

    pub fn get(&self, i: usize) -> Value {
        let d = self.discriminators[i];
        if d == VARIANT_NULL_DISCRIMINATOR {
            Value::Null
        } else {
            let group_idx = self.row_to_group_index[i] as usize;
            Value::Variant {
                type_index: d as usize,
                value: Box::new(self.groups[d as usize].get(group_idx)),
            }
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> VariantColumn {
        let discriminators = self.discriminators[start..end].to_vec();
        // Groups are rebuilt from the sliced discriminators rather than
        // reused verbatim (spec.md §4.D: "slice operations preserve
        // variant shape by rebuilding groups from sliced discriminators").
        let mut group_counts = vec![0usize; self.groups.len()];
        for &d in &discriminators {
            if d != VARIANT_NULL_DISCRIMINATOR {
                group_counts[d as usize] += 1;
            }
        }
        let mut group_cursors = vec![0usize; self.groups.len()];
        for i in 0..start {
            let d = self.discriminators[i];
            if d != VARIANT_NULL_DISCRIMINATOR {
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
        VariantColumn::new(discriminators, self.group_types.clone(), groups)
    }
}

/// Shared by Variant and Dynamic: for each row, the index of that row within
/// its group (rows sharing a discriminator keep their original relative
/// order per spec.md §3).
pub fn compute_group_indices(discriminators: &[u8], null_marker: u8) -> Vec<u32> {
    let mut counters: std::collections::HashMap<u8, u32> = std::collections::HashMap::new();
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
