//! Codec registry and the `Codec` capability surface (spec.md §4.E).

mod composite;
mod registry;
mod scalar;

pub use registry::CodecRegistry;

use std::sync::Arc;

use crate::column::{Column, Value};
use crate::error::CodecResult;
use crate::grammar::TypeExpr;
use crate::config::DecodeOptions;
use crate::io::{ReadBuffer, WriteBuffer};

/// What a composite codec's `read_prefix` hands back to its own
/// `decode_payload`, or to a parent composite that needs to thread a
/// child's discovered shape through (e.g. `Array(Dynamic)`'s flattened
/// inner column). Most codecs carry no prefix state at all.
#[derive(Debug, Clone)]
pub enum PrefixState {
    None,
    /// LowCardinality's one-row version marker (spec.md §4.G).
    LowCardinalityVersion(u64),
    /// Dynamic's discovered type list, each paired with its resolved codec
    /// and that codec's own prefix state (spec.md §4.G).
    DynamicTypes(Vec<(TypeExpr, Arc<dyn Codec>, PrefixState)>),
    /// JSON's sorted path list, each with its own Dynamic prefix.
    JsonPaths(Vec<(String, Vec<(TypeExpr, Arc<dyn Codec>, PrefixState)>)>),
    /// A single child's prefix, forwarded by `Array`/`Nullable`.
    Single(Box<PrefixState>),
    /// One prefix per child, forwarded by `Map`/`Tuple`/`Variant`.
    Multi(Vec<PrefixState>),
}

/// Capability surface of spec.md §4.E / design note "capability-based codec
/// dispatch": a small required surface instead of a deep inheritance tree.
/// Composite codecs hold `Arc<dyn Codec>` children obtained from the
/// registry, recursing into the grammar tree.
pub trait Codec: std::fmt::Debug + Send + Sync {
    /// Conservative upper bound on encoded size for `rows` rows, used to
    /// pre-size writers; composites sum their children's estimates.
    fn estimate_size(&self, rows: u64) -> u64;

    fn write_prefix(&self, _writer: &mut WriteBuffer, _column: &Column) -> CodecResult<()> {
        Ok(())
    }

    fn read_prefix(&self, _reader: &mut ReadBuffer<'_>, _opts: &DecodeOptions) -> CodecResult<PrefixState> {
        Ok(PrefixState::None)
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()>;

    fn decode_payload(
        &self,
        reader: &mut ReadBuffer<'_>,
        row_count: u64,
        opts: &DecodeOptions,
        prefix: &PrefixState,
    ) -> CodecResult<Column>;

    fn from_values(&self, values: &[Value]) -> CodecResult<Column>;

    fn zero_value(&self) -> Value;

    /// Convenience: prefix then payload, for callers (the block codec) that
    /// don't need to interleave other bytes in between.
    fn encode(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        self.write_prefix(writer, column)?;
        self.encode_payload(writer, column)
    }

    fn decode(&self, reader: &mut ReadBuffer<'_>, row_count: u64, opts: &DecodeOptions) -> CodecResult<Column> {
        let prefix = self.read_prefix(reader, opts)?;
        self.decode_payload(reader, row_count, opts, &prefix)
    }
}
