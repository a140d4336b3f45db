//! JSON codec (spec.md §4.G): a sorted path list as the prefix, then one
//! Dynamic payload per path. Explicit grammar-level path types are a
//! validation hint; storage is uniformly Dynamic per path either way.

use crate::column::{Column, JsonColumn, Value};
use crate::config::DecodeOptions;
use crate::error::{CodecError, CodecResult, ErrorContext};
use crate::grammar::JsonPath;
use crate::io::{ReadBuffer, WriteBuffer};

use super::DynamicCodec;
use crate::codec::{Codec, PrefixState};

const JSON_PREFIX_VERSION: u64 = 1;

#[derive(Debug)]
pub struct JsonCodec {
    #[allow(dead_code)]
    declared_paths: Vec<JsonPath>,
    max_dynamic_paths: Option<u64>,
}

impl JsonCodec {
    pub fn new(declared_paths: Vec<JsonPath>, max_dynamic_paths: Option<u64>) -> Self {
        Self { declared_paths, max_dynamic_paths }
    }

    fn dynamic_codec(&self) -> DynamicCodec {
        DynamicCodec::new(self.max_dynamic_paths)
    }
}

impl Codec for JsonCodec {
    fn estimate_size(&self, rows: u64) -> u64 {
        rows * 8 + 64
    }

    fn write_prefix(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Json(j) = column else { return Err(mismatch()) };
        writer.write_u64_le(JSON_PREFIX_VERSION);
        writer.write_varint(j.paths.len() as u64);
        let dyn_codec = self.dynamic_codec();
        for (path, col) in j.paths.iter().zip(&j.per_path) {
            writer.write_string(path.as_bytes());
            dyn_codec.write_prefix(writer, &Column::Dynamic(col.clone()))?;
        }
        Ok(())
    }

    fn read_prefix(&self, reader: &mut ReadBuffer<'_>, opts: &DecodeOptions) -> CodecResult<PrefixState> {
        let version = reader.read_u64_le()?;
        if version != JSON_PREFIX_VERSION {
            return Err(CodecError::invalid(
                format!("unsupported JSON prefix version {version}"),
                ErrorContext::new().with_type("JSON".to_string()),
            ));
        }
        let count = reader.read_varint()? as usize;
        let dyn_codec = self.dynamic_codec();
        let mut paths = Vec::with_capacity(count);
        for _ in 0..count {
            let path = reader.read_string()?.to_string();
            let PrefixState::DynamicTypes(types) = dyn_codec.read_prefix(reader, opts)? else {
                unreachable!("DynamicCodec::read_prefix always returns DynamicTypes")
            };
            paths.push((path, types));
        }
        Ok(PrefixState::JsonPaths(paths))
    }

    fn encode_payload(&self, writer: &mut WriteBuffer, column: &Column) -> CodecResult<()> {
        let Column::Json(j) = column else { return Err(mismatch()) };
        let dyn_codec = self.dynamic_codec();
        for col in &j.per_path {
            dyn_codec.encode_payload(writer, &Column::Dynamic(col.clone()))?;
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
        let PrefixState::JsonPaths(paths) = prefix else { return Err(mismatch()) };
        let dyn_codec = self.dynamic_codec();
        let mut names = Vec::with_capacity(paths.len());
        let mut per_path = Vec::with_capacity(paths.len());
        for (path, types) in paths {
            names.push(path.clone());
            let col = dyn_codec.decode_payload(reader, row_count, opts, &PrefixState::DynamicTypes(types.clone()))?;
            let Column::Dynamic(d) = col else { unreachable!("DynamicCodec::decode_payload always returns Dynamic") };
            per_path.push(d);
        }
        Ok(Column::Json(JsonColumn::new(names, per_path)))
    }

    fn from_values(&self, values: &[Value]) -> CodecResult<Column> {
        let mut names: Vec<String> = Vec::new();
        for v in values {
            let Value::Json(fields) = v else { return Err(CodecError::coercion(format!("expected JSON, got {v:?}"), ErrorContext::new())) };
            for (path, _) in fields {
                if !names.contains(path) {
                    names.push(path.clone());
                }
            }
        }
        names.sort();
        let dyn_codec = self.dynamic_codec();
        let mut per_path = Vec::with_capacity(names.len());
        for name in &names {
            let mut per_row = Vec::with_capacity(values.len());
            for v in values {
                let Value::Json(fields) = v else { unreachable!() };
                let found = fields.iter().find(|(p, _)| p == name).map(|(_, v)| v.clone());
                per_row.push(found.unwrap_or(Value::Null));
            }
            let Column::Dynamic(d) = dyn_codec.from_values(&per_row)? else { unreachable!() };
            per_path.push(d);
        }
        Ok(Column::Json(JsonColumn::new(names, per_path)))
    }

    fn zero_value(&self) -> Value {
        Value::Json(Vec::new())
    }
}

fn mismatch() -> CodecError {
    CodecError::invalid("column storage does not match type JSON", ErrorContext::new().with_type("JSON".to_string()))
}
