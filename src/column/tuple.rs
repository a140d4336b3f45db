//! Tuple column storage (spec.md §3, §4.G): an ordered list of equal-length
//! child columns, each optionally named.

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::Column;

#[derive(Debug, Clone, PartialEq)]
pub struct TupleColumn {
    pub names: Vec<Option<String>>,
    pub elements: Vec<Arc<Column>>,
}

impl TupleColumn {
    pub fn new(names: Vec<Option<String>>, elements: Vec<Arc<Column>>) -> Self {
        debug_assert_eq!(names.len(), elements.len());
        Self { names, elements }
    }

    pub fn is_named(&self) -> bool {
        self.names.iter().any(|n| n.is_some())
    }

    pub fn len(&self) -> usize {
        self.elements.first().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Value {
        if self.is_named() {
            Value::NamedTuple(
                self.names
                    .iter()
                    .zip(&self.elements)
                    .map(|(n, c)| (n.clone().unwrap_or_default(), c.get(i)))
                    .collect(),
            )
        } else {
            Value::Tuple(self.elements.iter().map(|c| c.get(i)).collect())
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> TupleColumn {
        TupleColumn {
            names: self.names.clone(),
            elements: self
                .elements
                .iter()
                .map(|c| Arc::new(c.slice(start, end)))
                .collect(),
        }
    }
}
