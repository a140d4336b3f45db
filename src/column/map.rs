//! Map(K, V) column storage (spec.md §3, §4.G): framed identically to
//! `Array(Tuple(K, V))`.

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::Column;

/// Whether rows surface as ordered key/value pairs (preserving duplicate
/// keys) or as a hash-style mapping (duplicate keys collapse, last wins).
/// Selected at decode time from the `map_as_array` option (spec.md §6):
/// `true` gives `Ordered`, the default (`false`) gives `Hashed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapRenderMode {
    Ordered,
    Hashed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapColumn {
    pub offsets: Vec<u64>,
    pub keys: Arc<Column>,
    pub values: Arc<Column>,
    pub render: MapRenderMode,
}

impl MapColumn {
    pub fn new(offsets: Vec<u64>, keys: Arc<Column>, values: Arc<Column>, render: MapRenderMode) -> Self {
        Self { offsets, keys, values, render }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    fn row_start(&self, i: usize) -> u64 {
        if i == 0 {
            0
        } else {
            self.offsets[i - 1]
        }
    }

    pub fn get(&self, i: usize) -> Value {
        let start = self.row_start(i) as usize;
        let end = self.offsets[i] as usize;
        let pairs: Vec<(Value, Value)> = (start..end)
            .map(|j| (self.keys.get(j), self.values.get(j)))
            .collect();
        match self.render {
            MapRenderMode::Ordered => Value::Map(pairs),
            MapRenderMode::Hashed => {
                let mut deduped: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    if let Some(slot) = deduped.iter_mut().find(|(ek, _)| *ek == k) {
                        slot.1 = v;
                    } else {
                        deduped.push((k, v));
                    }
                }
                Value::Map(deduped)
            }
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> MapColumn {
        let base = self.row_start(start);
        let new_offsets = self.offsets[start..end].iter().map(|o| o - base).collect();
        let inner_start = base as usize;
        let inner_end = if start == end { inner_start } else { self.offsets[end - 1] as usize };
        MapColumn {
            offsets: new_offsets,
            keys: Arc::new(self.keys.slice(inner_start, inner_end)),
            values: Arc::new(self.values.slice(inner_start, inner_end)),
            render: self.render,
        }
    }
}
