//! The columnar in-memory data model (spec.md §3, §4.D): a closed sum type
//! over physical storage representations, with a uniform virtual-row
//! interface (`len`, `get`, `type_expr`, `iter`) layered on top.

pub mod array;
pub mod dynamic;
pub mod json;
pub mod low_cardinality;
pub mod map;
pub mod nullable;
pub mod numeric;
pub mod string;
pub mod tuple;
pub mod value;
pub mod variant;

pub use array::ArrayColumn;
pub use dynamic::DynamicColumn;
pub use json::JsonColumn;
pub use low_cardinality::{IndexBuffer, LowCardinalityColumn};
pub use map::{MapColumn, MapRenderMode};
pub use nullable::NullableColumn;
pub use numeric::{NumericBuffer, NumericColumn};
pub use string::StringColumn;
pub use tuple::TupleColumn;
pub use value::Value;
pub use variant::VariantColumn;

use crate::grammar::{ScalarType, TupleElement, TypeExpr};

/// The closed column-variant enum of spec.md §4.D's "Column variants as a
/// closed sum" design note. Each variant's `get`/`len` are delegated to the
/// concrete struct so the dispatch cost is one match, not a vtable.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(NumericColumn),
    String(StringColumn),
    Nullable(NullableColumn),
    Array(ArrayColumn),
    Map(MapColumn),
    Tuple(TupleColumn),
    LowCardinality(LowCardinalityColumn),
    Variant(VariantColumn),
    Dynamic(DynamicColumn),
    Json(JsonColumn),
}

impl Column {
    pub fn len(&self) -> u64 {
        (match self {
            Column::Numeric(c) => c.len(),
            Column::String(c) => c.len(),
            Column::Nullable(c) => c.len(),
            Column::Array(c) => c.len(),
            Column::Map(c) => c.len(),
            Column::Tuple(c) => c.len(),
            Column::LowCardinality(c) => c.len(),
            Column::Variant(c) => c.len(),
            Column::Dynamic(c) => c.len(),
            Column::Json(c) => c.len(),
        }) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Value {
        match self {
            Column::Numeric(c) => c.get(i),
            Column::String(c) => c.get(i),
            Column::Nullable(c) => c.get(i),
            Column::Array(c) => c.get(i),
            Column::Map(c) => c.get(i),
            Column::Tuple(c) => c.get(i),
            Column::LowCardinality(c) => c.get(i),
            Column::Variant(c) => c.get(i),
            Column::Dynamic(c) => c.get(i),
            Column::Json(c) => c.get(i),
        }
    }

    pub fn iter(&self) -> ColumnIter<'_> {
        ColumnIter { column: self, idx: 0, len: self.len() as usize }
    }

    /// `type_expr` is reconstructed from the physical representation rather
    /// than stored redundantly, keeping a single source of truth (the data
    /// itself) for what the column's shape implies.
    pub fn type_expr(&self) -> TypeExpr {
        match self {
            Column::Numeric(c) => TypeExpr::Scalar(c.scalar_type.clone()),
            Column::String(c) => match c.fixed_width {
                Some(w) => TypeExpr::Scalar(ScalarType::FixedString(w)),
                None => TypeExpr::Scalar(ScalarType::String),
            },
            Column::Nullable(c) => TypeExpr::Nullable(Box::new(c.inner.type_expr())),
            Column::Array(c) => TypeExpr::Array(Box::new(c.inner.type_expr())),
            Column::Map(c) => TypeExpr::Map(Box::new(c.keys.type_expr()), Box::new(c.values.type_expr())),
            Column::Tuple(c) => TypeExpr::Tuple(
                c.names
                    .iter()
                    .zip(&c.elements)
                    .map(|(n, e)| TupleElement { name: n.clone(), ty: e.type_expr() })
                    .collect(),
            ),
            Column::LowCardinality(c) => {
                let inner_ty = c.dictionary.type_expr();
                let inner_ty = if c.inner_nullable {
                    TypeExpr::Nullable(Box::new(inner_ty))
                } else {
                    inner_ty
                };
                TypeExpr::LowCardinality(Box::new(inner_ty))
            }
            Column::Variant(c) => TypeExpr::Variant(c.group_types.clone()),
            Column::Dynamic(c) => TypeExpr::Dynamic { max_types: Some(c.types.len() as u64) },
            Column::Json(c) => TypeExpr::Json {
                paths: c
                    .paths
                    .iter()
                    .zip(&c.per_path)
                    .map(|(p, col)| crate::grammar::JsonPath {
                        path: p.clone(),
                        ty: TypeExpr::Dynamic { max_types: Some(col.types.len() as u64) },
                    })
                    .collect(),
                max_dynamic_paths: None,
            },
        }
    }

    /// Returns a new column covering rows `[start, end)`. Internals may be
    /// shared with the parent (copy-on-slice is not required, spec.md §5).
    pub fn slice(&self, start: usize, end: usize) -> Column {
        match self {
            Column::Numeric(c) => Column::Numeric(c.slice(start, end)),
            Column::String(c) => Column::String(c.slice(start, end)),
            Column::Nullable(c) => Column::Nullable(c.slice(start, end)),
            Column::Array(c) => Column::Array(c.slice(start, end)),
            Column::Map(c) => Column::Map(c.slice(start, end)),
            Column::Tuple(c) => Column::Tuple(c.slice(start, end)),
            Column::LowCardinality(c) => Column::LowCardinality(c.slice(start, end)),
            Column::Variant(c) => Column::Variant(c.slice(start, end)),
            Column::Dynamic(c) => Column::Dynamic(c.slice(start, end)),
            Column::Json(c) => Column::Json(c.slice(start, end)),
        }
    }
}

pub struct ColumnIter<'a> {
    column: &'a Column,
    idx: usize,
    len: usize,
}

impl Iterator for ColumnIter<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.idx >= self.len {
            return None;
        }
        let v = self.column.get(self.idx);
        self.idx += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ColumnIter<'_> {}
