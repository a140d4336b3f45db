//! Variant(T1, ..., Tn) codec (spec.md §4.G): a one-byte discriminator per
//! row (`0xFF` = null), followed by each declared type's group payload in
//! declaration order, regardless of whether a given group ended up empty.

use std::sync::Arc;

use crate::column::value::Value;
use crate::column::variant::VARIANT_NULL_DISCRIMINATOR;
use crate::column::{Column, VariantColumn};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::TypeExpr;
use crate::io::{ReadBuffer, WriteBuffer};

use crate::codec::{Codec, PrefixState};

/// The only mode spec.md §4.G documents for wire traffic.
const VARIANT_MODE_FLAG: u64 = 0;

#[derive(Debug)]
pub struct VariantCodec {
    children: Vec<(Arc<dyn Codec>, TypeExpr)>,
}

impl VariantCodec {
    pub fn new(children: Vec<(Arc<dyn Codec>, TypeExpr)>) -> Self {
        Self { children }
    }

    fn type_expr(&self) -> TypeExpr {
        TypeExpr::Variant(self.children.iter().map(|(_, t)| t.clone()).collect())
    }
}

impl Codec for VariantCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        8 + rows + self.children.iter().map(|(c, _)| c.estimate_size(rows)).sum::<u64>()
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Variant(v) = column else { return Err(mismatch(&self.type_expr())) };
        writer.write_u64_le(VARIANT_MODE_FLAG);
        for ((codec, _), group) in self.children.iter().zip(&v.groups) {
            codec.write_prefix(writer, group)?;
        }
        Ok(())
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<PrefixState> {
        let mode = reader.read_u64_le()?;
        if mode != VARIANT_MODE_FLAG {
            return Err(CodecError::invalid(
                format!("unsupported Variant mode flag {mode}"),
                ErrorContext::new().with_type(self.type_expr().to_string()),
            ));
        }
        let mut prefixes = Vec::with_capacity(self.children.len());
        for (codec, _) in &self.children {
            prefixes.push(codec.read_prefix(reader, opts)?);
        }
        Ok(PrefixState::Multi(prefixes))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Variant(v) = column else { return Err(mismatch(&self.type_expr())) };
        for &d in &v.discriminators {
            writer.write_u8(d);
        }
        for ((codec, _), group) in self.children.iter().zip(&v.groups) {
            codec.encode_payload(writer, group)?;
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
        let mut discriminators = Vec::with_capacity(row_count as usize);
        for _ in 0..row_count {
            discriminators.push(reader.read_u8()?);
        }
        let mut counts = vec![0u64; self.children.len()];
        for &d in &discriminators {
            if d != VARIANT_NULL_DISCRIMINATOR {
                counts[d as usize] += 1;
            }
        }
        let mut groups = Vec::with_capacity(self.children.len());
        for (i, (codec, _)) in self.children.iter().enumerate() {
            let child_prefix = prefixes.get(i).unwrap_or(&PrefixState::None);
            let g = codec.decode_payload(reader, counts[i], opts, child_prefix)?;
            groups.push(Arc::new(g));
        }
        let group_types = self.children.iter().map(|(_, t)| t.clone()).collect();
        Ok(Column::Variant(VariantColumn::new(discriminators, group_types, groups)))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut discriminators = Vec::with_capacity(values.len());
        let mut per_child: Vec<Vec<Value>> = vec![Vec::new(); self.children.len()];
        for v in values {
            match v {
                Value::Null => discriminators.push(VARIANT_NULL_DISCRIMINATOR),
                Value::Variant { type_index, value } => {
                    if *type_index >= self.children.len() {
                        return Err(CodecError::coercion(
                            format!("variant type index {type_index} out of range"),
                            ErrorContext::new().with_type(self.type_expr().to_string()),
                        ));
                    }
                    discriminators.push(*type_index as u8);
                    per_child[*type_index].push((**value).clone());
                }
                other => {
                    return Err(CodecError::coercion(
                        format!("expected {}, got {other:?}", self.type_expr()),
                        ErrorContext::new(),
                    ))
                }
            }
        }
        let mut groups = Vec::with_capacity(self.children.len());
        for ((codec, _), child_values) in self.children.iter().zip(&per_child) {
            groups.push(Arc::new(codec.from_values(child_values)?));
        }
        let group_types = self.children.iter().map(|(_, t)| t.clone()).collect();
        Ok(Column::Variant(VariantColumn::new(discriminators, group_types, groups)))
    }

    fn zero_value(&self) -> Value {
        Value::Null
    }
}

fn mismatch(ty: &TypeExpr) -> CodecError {
    CodecError::invalid(format!("column storage does not match type {ty}"), ErrorContext::new().with_type(ty.to_string()))
}
