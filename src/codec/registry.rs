//! Process-wide codec cache keyed by canonical type string (spec.md §4.E).

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use super::composite::{
    ArrayCodec, DynamicCodec, JsonCodec, LowCardinalityCodec, MapCodec, NullableCodec, TupleCodec,
    VariantCodec,
};
use super::scalar::ScalarCodec;
use super::Codec;
use crate::error::CodecResult;
use crate::grammar::{parse_type, TypeExpr};

/// Builds (and caches) `Arc<dyn Codec>` instances from a `TypeExpr`. Cheap to
/// clone — it's a thin handle over a shared `RwLock<HashMap<..>>` — so
/// callers can hold one per decode/encode session, or use `global()` for the
/// process-wide instance spec.md §4.E describes.
///
/// A cache miss races harmlessly: two concurrent builders for the same type
/// string both succeed and the second insert simply overwrites the first,
/// last-writer-wins, which is the behavior spec.md §4.E explicitly allows.
#[derive(Clone)]
pub struct CodecRegistry {
    cache: Arc<RwLock<HashMap<String, Arc<dyn Codec>>>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry").finish_non_exhaustive()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self { cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// The process-wide instance. Most callers should prefer this over
    /// constructing their own, unless test isolation requires a fresh cache.
    pub fn global() -> &'static CodecRegistry {
        static GLOBAL: OnceLock<CodecRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CodecRegistry::new)
    }

    /// Parses `type_string` and builds (or fetches) its codec.
    pub fn get(&self, type_string: &str) -> CodecResult<Arc<dyn Codec>> {
        if let Some(hit) = self.cache.read().unwrap().get(type_string) {
            return Ok(hit.clone());
        }
        let type_expr = parse_type(type_string)?;
        let codec = build_codec(&type_expr)?;
        self.cache.write().unwrap().insert(type_string.to_string(), codec.clone());
        Ok(codec)
    }

    /// Builds a codec directly from an already-parsed type, bypassing the
    /// string cache (used internally by composite codecs recursing into
    /// their children, and by `from_values`-style callers that already hold
    /// a `TypeExpr`).
    pub fn get_for_type(&self, type_expr: &TypeExpr) -> CodecResult<Arc<dyn Codec>> {
        let key = type_expr.to_string();
        self.get(&key)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively builds a codec for a (desugared) type expression.
pub fn build_codec(type_expr: &TypeExpr) -> CodecResult<Arc<dyn Codec>> {
    let type_expr = type_expr.desugared();
    let codec: Arc<dyn Codec> = match &type_expr {
        TypeExpr::Scalar(s) => Arc::new(ScalarCodec::new(s.clone())),
        TypeExpr::Array(inner) => Arc::new(ArrayCodec::new(build_codec(inner)?, (**inner).clone())),
        TypeExpr::Nullable(inner) => Arc::new(NullableCodec::new(build_codec(inner)?, (**inner).clone())),
        TypeExpr::LowCardinality(inner) => {
            let (unwrapped, inner_nullable) = match inner.as_ref() {
                TypeExpr::Nullable(t) => ((**t).clone(), true),
                other => (other.clone(), false),
            };
            Arc::new(LowCardinalityCodec::new(build_codec(&unwrapped)?, unwrapped, inner_nullable))
        }
        TypeExpr::Map(k, v) => {
            Arc::new(MapCodec::new(build_codec(k)?, (**k).clone(), build_codec(v)?, (**v).clone()))
        }
        TypeExpr::Tuple(elems) => {
            let mut children = Vec::with_capacity(elems.len());
            for e in elems {
                children.push((e.name.clone(), build_codec(&e.ty)?, e.ty.clone()));
            }
            Arc::new(TupleCodec::new(children))
        }
        TypeExpr::Nested(_) => unreachable!("desugared() removes Nested"),
        TypeExpr::Variant(types) => {
            let mut children = Vec::with_capacity(types.len());
            for t in types {
                children.push((build_codec(t)?, t.clone()));
            }
            Arc::new(VariantCodec::new(children))
        }
        TypeExpr::Dynamic { max_types } => Arc::new(DynamicCodec::new(*max_types)),
        TypeExpr::Json { paths, max_dynamic_paths } => {
            Arc::new(JsonCodec::new(paths.clone(), *max_dynamic_paths))
        }
    };
    Ok(codec)
}
