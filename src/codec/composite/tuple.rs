//! Tuple codec (spec.md §4.G): every child's prefix in element order,
//! followed by every child's payload in element order. No separator, since
//! row counts are identical across elements by construction.

use std::sync::Arc;

use crate::column::{Column, TupleColumn, Value};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::{TupleElement, TypeExpr};
use crate::io::{ReadBuffer, WriteBuffer};

use crate::codec::{Codec, PrefixState};

#[derive(Debug)]
pub struct TupleCodec {
    children: Vec<(Option<String>, Arc<dyn Codec>, TypeExpr)>,
}

impl TupleCodec {
    pub fn new(children: Vec<(Option<String>, Arc<dyn Codec>, TypeExpr)>) -> Self {
        Self { children }
    }

    fn type_expr(&self) -> TypeExpr {
        TypeExpr::Tuple(
            self.children
                .iter()
                .map(|(name, _, ty)| TupleElement { name: name.clone(), ty: ty.clone() })
                .collect(),
        )
    }

    fn is_named(&self) -> bool {
        self.children.iter().any(|(n, _, _)| n.is_some())
    }
}

impl Codec for TupleCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        self.children.iter().map(|(_, c, _)| c.estimate_size(rows)).sum()
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Tuple(t) = column else { return Err(mismatch(&self.type_expr())) };
        for ((_, codec, _), elem) in self.children.iter().zip(&t.elements) {
            codec.write_prefix(writer, elem)?;
        }
        Ok(())
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<PrefixState> {
        let mut prefixes = Vec::with_capacity(self.children.len());
        for (_, codec, _) in &self.children {
            prefixes.push(codec.read_prefix(reader, opts)?);
        }
        Ok(PrefixState::Multi(prefixes))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Tuple(t) = column else { return Err(mismatch(&self.type_expr())) };
        for ((_, codec, _), elem) in self.children.iter().zip(&t.elements) {
            codec.encode_payload(writer, elem)?;
        }
        Ok(())
    }

    fn decode_payload(
        &self,
        reader: &mut ReadBuffer<'_>,
        row_count: u64,
        opts: &DecodeOptions,
        prefix: &PrefixState,
    ) -> CodecResult<Column> {
        let empty = Vec::new();
        let prefixes = match prefix {
            PrefixState::Multi(v) => v,
            _ => &empty,
        };
        let mut elements = Vec::with_capacity(self.children.len());
        for (i, (_, codec, _)) in self.children.iter().enumerate() {
            let child_prefix = prefixes.get(i).unwrap_or(&PrefixState::None);
            let elem = codec.decode_payload(reader, row_count, opts, child_prefix)?;
            elements.push(Arc::new(elem));
        }
        let names = self.children.iter().map(|(n, _, _)| n.clone()).collect();
        Ok(Column::Tuple(TupleColumn::new(names, elements)))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut per_child: Vec<Vec<Value>> = vec![Vec::with_capacity(values.len()); self.children.len()];
        for v in values {
            let row: Vec<Value> = match v {
                Value::Tuple(items) => items.clone(),
                Value::NamedTuple(items) => items.iter().map(|(_, v)| v.clone()).collect(),
                other => return Err(coercion(&self.type_expr(), other)),
            };
            if row.len() != self.children.len() {
                return Err(CodecError::coercion(
                    format!("expected {} tuple elements, got {}", self.children.len(), row.len()),
                    ErrorContext::new().with_type(self.type_expr().to_string()),
                ));
            }
            for (slot, value) in per_child.iter_mut().zip(row) {
                slot.push(value);
            }
        }
        let mut elements = Vec::with_capacity(self.children.len());
        for ((_, codec, _), child_values) in self.children.iter().zip(&per_child) {
            elements.push(Arc::new(codec.from_values(child_values)?));
        }
        let names = self.children.iter().map(|(n, _, _)| n.clone()).collect();
        Ok(Column::Tuple(TupleColumn::new(names, elements)))
    }

    fn zero_value(&self) -> Value {
        let values: Vec<Value> = self.children.iter().map(|(_, c, _)| c.zero_value()).collect();
        if self.is_named() {
            Value::NamedTuple(
                self.children
                    .iter()
                    .zip(values)
                    .map(|((n, _, _), v)| (n.clone().unwrap_or_default(), v))
                    .collect(),
            )
        } else {
            Value::Tuple(values)
        }
    }
}

fn mismatch(ty: &TypeExpr) -> CodecError {
    CodecError::invalid(format!("column storage does not match type {ty}"), ErrorContext::new().with_type(ty.to_string()))
}

fn coercion(ty: &TypeExpr, v: &Value) -> CodecError {
    CodecError::coercion(format!("expected {ty}, got {v:?}"), ErrorContext::new())
}
