//! End-to-end columnar block scenarios (spec.md §8, scenarios 1-5): build a
//! block from `Value`s through the registry, encode it, decode it back, and
//! check the row-level view the caller actually sees.

use bytes::Bytes;
use pretty_assertions::assert_eq;

use native_codec::{
    block::{decode_block, encode_block, Block},
    config::{DecodeOptions, EncodeOptions},
    error::CodecError,
    grammar::{parse_type, ScalarType, TypeExpr},
    io::{ReadBuffer, WriteBuffer},
    Codec, CodecRegistry, RowView, Value,
};

fn build_column(type_string: &str, values: Vec<Value>) -> (TypeExpr, native_codec::Column) {
    let ty = parse_type(type_string).unwrap();
    let codec = CodecRegistry::global().get_for_type(&ty).unwrap();
    (ty, codec.from_values(&values).unwrap())
}

fn roundtrip(block: &Block, opts_enc: &EncodeOptions, opts_dec: &DecodeOptions) -> Block {
    let mut writer = WriteBuffer::new();
    encode_block(&mut writer, block, opts_enc).unwrap();
    let bytes: Bytes = writer.into_bytes();
    let mut reader = ReadBuffer::new(&bytes);
    decode_block(&mut reader, opts_dec).unwrap()
}

/// Scenario 1: a simple block of plain scalar columns.
#[test]
fn simple_block_of_scalars_roundtrips() {
    let (ty_id, col_id) = build_column("UInt32", vec![Value::UInt32(1), Value::UInt32(2), Value::UInt32(3)]);
    let (ty_name, col_name) = build_column(
        "String",
        vec![
            Value::String(Bytes::from("alice")),
            Value::String(Bytes::from("bob")),
            Value::String(Bytes::from("carol")),
        ],
    );
    let block = Block::new(vec![("id".to_string(), ty_id, col_id), ("name".to_string(), ty_name, col_name)]);

    let decoded = roundtrip(&block, &EncodeOptions::new(), &DecodeOptions::new());
    let view = RowView::new(&decoded);
    assert_eq!(view.length(), 3);
    assert_eq!(view.row(0).get("id"), Some(Value::UInt32(1)));
    assert_eq!(view.row(2).get("name"), Some(Value::String(Bytes::from("carol"))));
}

/// Scenario 2: offset semantics for an Array column, including an empty
/// leading array and a repeated trailing empty array.
#[test]
fn array_offsets_cover_empty_and_repeated_rows() {
    let rows = vec![
        Value::Array(vec![]),
        Value::Array(vec![Value::Int32(1), Value::Int32(2)]),
        Value::Array(vec![Value::Int32(3)]),
        Value::Array(vec![]),
    ];
    let (ty, col) = build_column("Array(Int32)", rows.clone());
    let block = Block::new(vec![("xs".to_string(), ty, col)]);

    let decoded = roundtrip(&block, &EncodeOptions::new(), &DecodeOptions::new());
    let view = RowView::new(&decoded);
    for i in 0..4 {
        assert_eq!(view.get_at(i, 0), Some(rows[i].clone()));
    }
}

/// Scenario 3: Nullable(LowCardinality(String)) mixes a null-flag row with
/// dictionary-deduplicated values.
#[test]
fn nullable_low_cardinality_round_trips_with_nulls() {
    let rows = vec![
        Value::String(Bytes::from("red")),
        Value::Null,
        Value::String(Bytes::from("red")),
        Value::String(Bytes::from("blue")),
        Value::Null,
    ];
    let (ty, col) = build_column("LowCardinality(Nullable(String))", rows.clone());
    let block = Block::new(vec![("color".to_string(), ty, col)]);

    let decoded = roundtrip(&block, &EncodeOptions::new(), &DecodeOptions::new());
    let view = RowView::new(&decoded);
    for i in 0..rows.len() {
        assert_eq!(view.get_at(i, 0), Some(rows[i].clone()));
    }
}

/// Scenario 4: Variant(Int32, String) with interleaved nulls, each row
/// landing in the right declaration-order group.
#[test]
fn variant_with_nulls_preserves_row_order_and_type() {
    let rows = vec![
        Value::Variant { type_index: 0, value: Box::new(Value::Int32(7)) },
        Value::Null,
        Value::Variant { type_index: 1, value: Box::new(Value::String(Bytes::from("hi"))) },
        Value::Variant { type_index: 0, value: Box::new(Value::Int32(-3)) },
    ];
    let (ty, col) = build_column("Variant(Int32, String)", rows.clone());
    let block = Block::new(vec![("v".to_string(), ty, col)]);

    let decoded = roundtrip(&block, &EncodeOptions::new(), &DecodeOptions::new());
    let view = RowView::new(&decoded);
    for i in 0..rows.len() {
        assert_eq!(view.get_at(i, 0), Some(rows[i].clone()));
    }
}

/// Scenario 5: DateTime64 precision edge - nanosecond precision ticks near
/// i64::MAX/MIN still round-trip exactly.
#[test]
fn datetime64_precision_edge_values_round_trip() {
    let rows = vec![
        Value::DateTime64 { ticks: 0, precision: 9 },
        Value::DateTime64 { ticks: i64::MAX, precision: 9 },
        Value::DateTime64 { ticks: i64::MIN, precision: 9 },
        Value::DateTime64 { ticks: -1, precision: 9 },
    ];
    let (ty, col) = build_column("DateTime64(9)", rows.clone());
    let block = Block::new(vec![("ts".to_string(), ty, col)]);

    let decoded = roundtrip(&block, &EncodeOptions::new(), &DecodeOptions::new());
    let view = RowView::new(&decoded);
    for i in 0..rows.len() {
        assert_eq!(view.get_at(i, 0), Some(rows[i].clone()));
    }
}

/// Schema-only (zero-row) blocks carry names/types but no per-column prefix
/// or payload bytes at all (spec.md §4.H).
#[test]
fn schema_only_block_round_trips_with_zero_rows() {
    let mut writer = WriteBuffer::new();
    native_codec::block::encode_schema_only(
        &mut writer,
        &[("id".to_string(), TypeExpr::Scalar(ScalarType::UInt32))],
        &EncodeOptions::new(),
    )
    .unwrap();
    let bytes = writer.into_bytes();
    let mut reader = ReadBuffer::new(&bytes);
    let decoded = decode_block(&mut reader, &DecodeOptions::new()).unwrap();
    assert_eq!(decoded.num_rows(), 0);
    assert_eq!(decoded.column_names(), vec!["id"]);
}

/// Dynamic: a leading null followed by rows that discover new types must
/// still decode as null, not collide with whichever type ends up at index 0
/// once every row has been scanned.
#[test]
fn dynamic_with_leading_null_round_trips_through_type_discovery() {
    let rows = vec![
        Value::Null,
        Value::Dynamic { type_name: "Int32".to_string(), value: Box::new(Value::Int32(5)) },
        Value::Dynamic { type_name: "String".to_string(), value: Box::new(Value::String(Bytes::from("x"))) },
    ];
    let (ty, col) = build_column("Dynamic", rows.clone());
    let block = Block::new(vec![("d".to_string(), ty, col)]);

    let decoded = roundtrip(&block, &EncodeOptions::new(), &DecodeOptions::new());
    let view = RowView::new(&decoded);
    for i in 0..rows.len() {
        assert_eq!(view.get_at(i, 0), Some(rows[i].clone()));
    }
}

/// spec.md §7: a non-monotonic Array offset sequence is a fatal
/// `InvalidWireFormat`, not a silently-empty row.
#[test]
fn array_decode_rejects_non_monotonic_offsets() {
    let ty = parse_type("Array(Int32)").unwrap();
    let codec = CodecRegistry::global().get_for_type(&ty).unwrap();
    let prefix = codec.read_prefix(&mut ReadBuffer::new(&[]), &DecodeOptions::new()).unwrap();

    let mut writer = WriteBuffer::new();
    writer.write_u64_le(5);
    writer.write_u64_le(2);
    for v in 0..5 {
        writer.write_i32_le(v);
    }
    let bytes = writer.into_bytes();
    let mut reader = ReadBuffer::new(&bytes);
    let err = codec.decode_payload(&mut reader, 2, &DecodeOptions::new(), &prefix).unwrap_err();
    assert!(matches!(err, CodecError::InvalidWireFormat { .. }), "expected InvalidWireFormat, got {err:?}");
}

/// Same non-monotonicity check for Map offsets (spec.md §7).
#[test]
fn map_decode_rejects_non_monotonic_offsets() {
    let ty = parse_type("Map(String, Int32)").unwrap();
    let codec = CodecRegistry::global().get_for_type(&ty).unwrap();
    let prefix = codec.read_prefix(&mut ReadBuffer::new(&[]), &DecodeOptions::new()).unwrap();

    let mut writer = WriteBuffer::new();
    writer.write_u64_le(3);
    writer.write_u64_le(1);
    let bytes = writer.into_bytes();
    let mut reader = ReadBuffer::new(&bytes);
    let err = codec.decode_payload(&mut reader, 2, &DecodeOptions::new(), &prefix).unwrap_err();
    assert!(matches!(err, CodecError::InvalidWireFormat { .. }), "expected InvalidWireFormat, got {err:?}");
}

/// spec.md §4.F: Bool rows coerce from case-insensitive "true"/"false"
/// strings and 0/1 integers, not just actual booleans.
#[test]
fn bool_column_coerces_strings_and_integers() {
    let rows = vec![
        Value::Bool(true),
        Value::String(Bytes::from("FALSE")),
        Value::String(Bytes::from("True")),
        Value::UInt8(0),
        Value::UInt8(1),
    ];
    let (ty, col) = build_column("Bool", rows);
    let block = Block::new(vec![("b".to_string(), ty, col)]);

    let decoded = roundtrip(&block, &EncodeOptions::new(), &DecodeOptions::new());
    let view = RowView::new(&decoded);
    assert_eq!(view.get_at(0, 0), Some(Value::Bool(true)));
    assert_eq!(view.get_at(1, 0), Some(Value::Bool(false)));
    assert_eq!(view.get_at(2, 0), Some(Value::Bool(true)));
    assert_eq!(view.get_at(3, 0), Some(Value::Bool(false)));
    assert_eq!(view.get_at(4, 0), Some(Value::Bool(true)));
}

/// spec.md §3: JSON path names are sorted regardless of the order fields
/// first appeared in across rows.
#[test]
fn json_column_sorts_paths_built_out_of_order() {
    let rows = vec![
        Value::Json(vec![("zeta".to_string(), Value::Int32(1)), ("alpha".to_string(), Value::Int32(2))]),
        Value::Json(vec![("mid".to_string(), Value::Int32(3))]),
    ];
    let ty = parse_type("JSON").unwrap();
    let codec = CodecRegistry::global().get_for_type(&ty).unwrap();
    let col = codec.from_values(&rows).unwrap();
    let native_codec::Column::Json(j) = &col else { panic!("expected JSON column") };
    assert_eq!(j.paths, vec!["alpha".to_string(), "mid".to_string(), "zeta".to_string()]);
}

/// A block-info header gated on/off by client_version (spec.md §4.H, §6):
/// the same bytes a pre-BLOCK_INFO_REVISION client never writes still
/// decode cleanly under an options set that doesn't expect one either.
#[test]
fn block_info_header_is_gated_by_client_version() {
    use native_codec::config::ProtocolFeature;

    let (ty, col) = build_column("Int32", vec![Value::Int32(1)]);
    let block = Block::new(vec![("n".to_string(), ty, col)]);

    let old = EncodeOptions::new().with_client_version(ProtocolFeature::BLOCK_INFO_REVISION - 1);
    let decoded = roundtrip(&block, &old, &DecodeOptions::new().with_client_version(ProtocolFeature::BLOCK_INFO_REVISION - 1));
    assert_eq!(decoded.num_rows(), 1);

    let new = EncodeOptions::new().with_client_version(ProtocolFeature::CUSTOM_SERIALIZATION_REVISION);
    let decoded = roundtrip(
        &block,
        &new,
        &DecodeOptions::new().with_client_version(ProtocolFeature::CUSTOM_SERIALIZATION_REVISION),
    );
    assert_eq!(decoded.num_rows(), 1);
}
