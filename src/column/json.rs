//! JSON column storage (spec.md §3, §4.G): a sorted list of path names plus
//! a Dynamic column per path.

use crate::column::dynamic::DynamicColumn;
use crate::column::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct JsonColumn {
    /// Sorted path names, parallel to `per_path`.
    pub paths: Vec<String>,
    pub per_path: Vec<DynamicColumn>,
}

impl JsonColumn {
    pub fn new(paths: Vec<String>, per_path: Vec<DynamicColumn>) -> Self {
        debug_assert_eq!(paths.len(), per_path.len());
        Self { paths, per_path }
    }

    pub fn len(&self) -> usize {
        self.per_path.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row reconstruction emits only paths whose per-row value is non-null
    /// (spec.md §3).
    pub fn get(&self, i: usize) -> Value {
        let mut fields = Vec::new();
        for (path, col) in self.paths.iter().zip(&self.per_path) {
            let v = col.get(i);
            if !v.is_null() {
                fields.push((path.clone(), v));
            }
        }
        Value::Json(fields)
    }

    pub fn slice(&self, start: usize, end: usize) -> JsonColumn {
        JsonColumn {
            paths: self.paths.clone(),
            per_path: self.per_path.iter().map(|c| c.slice(start, end)).collect(),
        }
    }
}
