//! Property-based checks for the §8 testable properties that are
//! statements over arbitrary inputs rather than fixed examples: universal
//! round-trip, offset monotonicity, LowCardinality dictionary dedup, and
//! Variant placement. Enum round-trip and the decode-time rendering
//! options (`enum_as_number`, `map_as_array`) are checked with concrete
//! examples since they're option-selected behavior, not properties over
//! arbitrary input shape.

use bytes::Bytes;
use proptest::prelude::*;

use native_codec::block::{decode_block, encode_block, Block};
use native_codec::config::{DecodeOptions, EncodeOptions};
use native_codec::grammar::{parse_type, EnumMember, EnumWidth, ScalarType, TypeExpr};
use native_codec::io::{ReadBuffer, WriteBuffer};
use native_codec::{Codec, CodecRegistry, RowView, Value};

fn column_for(ty: &TypeExpr, values: &[Value]) -> native_codec::Column {
    CodecRegistry::global().get_for_type(ty).unwrap().from_values(values).unwrap()
}

fn round_trip_block(block: &Block, dec: &DecodeOptions) -> Block {
    let mut writer = WriteBuffer::new();
    encode_block(&mut writer, block, &EncodeOptions::new()).unwrap();
    let bytes = writer.into_bytes();
    let mut reader = ReadBuffer::new(&bytes);
    decode_block(&mut reader, dec).unwrap()
}

proptest! {
    /// Universal round-trip for a handful of primitive scalar types: any
    /// row set decodes back to itself.
    #[test]
    fn int32_round_trips(values in prop::collection::vec(any::<i32>(), 0..64)) {
        let ty = parse_type("Int32").unwrap();
        let col = column_for(&ty, &values.iter().map(|&v| Value::Int32(v)).collect::<Vec<_>>());
        let block = Block::new(vec![("v".to_string(), ty, col)]);
        let decoded = round_trip_block(&block, &DecodeOptions::new());
        let view = RowView::new(&decoded);
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(view.get_at(i, 0), Some(Value::Int32(v)));
        }
    }

    #[test]
    fn string_round_trips(values in prop::collection::vec(".*", 0..32)) {
        let ty = parse_type("String").unwrap();
        let vs: Vec<Value> = values.iter().map(|s| Value::String(Bytes::from(s.clone()))).collect();
        let col = column_for(&ty, &vs);
        let block = Block::new(vec![("v".to_string(), ty, col)]);
        let decoded = round_trip_block(&block, &DecodeOptions::new());
        let view = RowView::new(&decoded);
        for (i, v) in vs.iter().enumerate() {
            prop_assert_eq!(view.get_at(i, 0), Some(v.clone()));
        }
    }

    /// Offset monotonicity: decoded Array offsets are non-decreasing and
    /// the last offset equals the total flattened child length.
    #[test]
    fn array_offsets_are_monotonic(lens in prop::collection::vec(0usize..8, 2..16)) {
        let rows: Vec<Value> = lens.iter().map(|&n| Value::Array((0..n as i32).map(Value::Int32).collect())).collect();
        let ty = parse_type("Array(Int32)").unwrap();
        let col = column_for(&ty, &rows);
        let block = Block::new(vec![("xs".to_string(), ty, col)]);
        let decoded = round_trip_block(&block, &DecodeOptions::new());
        let native_codec::Column::Array(arr) = &decoded.columns[0].2 else { panic!("expected Array column") };
        let mut prev = 0u64;
        for &offset in &arr.offsets {
            prop_assert!(offset >= prev);
            prev = offset;
        }
        let total: usize = lens.iter().sum();
        prop_assert_eq!(*arr.offsets.last().unwrap(), total as u64);
    }

    /// LowCardinality dictionary: no duplicate dictionary entries after
    /// encode, and decoded values reproduce the input exactly including
    /// null positions.
    #[test]
    fn low_cardinality_dictionary_has_no_duplicates(
        values in prop::collection::vec(prop::option::of("[a-c]"), 1..32)
    ) {
        let rows: Vec<Value> = values.iter().map(|o| match o {
            Some(s) => Value::String(Bytes::from(s.clone())),
            None => Value::Null,
        }).collect();
        let ty = parse_type("LowCardinality(Nullable(String))").unwrap();
        let col = column_for(&ty, &rows);
        let block = Block::new(vec![("lc".to_string(), ty, col)]);
        let decoded = round_trip_block(&block, &DecodeOptions::new());

        let native_codec::Column::LowCardinality(lc) = &decoded.columns[0].2 else { panic!("expected LowCardinality column") };
        let mut seen = std::collections::HashSet::new();
        for i in 0..lc.dictionary.len() as usize {
            prop_assert!(seen.insert(lc.dictionary.get(i)));
        }
        let view = RowView::new(&decoded);
        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(view.get_at(i, 0), Some(row.clone()));
        }
    }

    /// Variant placement: decoded discriminators match the input's, and
    /// each row's materialized value matches the corresponding input.
    #[test]
    fn variant_rows_land_in_declared_group_order(
        picks in prop::collection::vec(prop::sample::select(vec![0u8, 1, 2]), 1..32)
    ) {
        let rows: Vec<Value> = picks.iter().map(|&d| match d {
            0 => Value::Null,
            1 => Value::Variant { type_index: 0, value: Box::new(Value::Int32(1)) },
            _ => Value::Variant { type_index: 1, value: Box::new(Value::String(Bytes::from("x"))) },
        }).collect();
        let ty = parse_type("Variant(Int32, String)").unwrap();
        let col = column_for(&ty, &rows);
        let block = Block::new(vec![("v".to_string(), ty, col)]);
        let decoded = round_trip_block(&block, &DecodeOptions::new());
        let view = RowView::new(&decoded);
        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(view.get_at(i, 0), Some(row.clone()));
        }
    }
}

fn traffic_light_enum() -> TypeExpr {
    TypeExpr::Scalar(ScalarType::Enum {
        width: EnumWidth::Bits8,
        members: vec![
            EnumMember { name: "red".to_string(), value: 0 },
            EnumMember { name: "green".to_string(), value: 1 },
            EnumMember { name: "blue".to_string(), value: 2 },
        ],
    })
}

/// Enum round-trip: encode-by-name then decode-as-name yields the input
/// names; decode-as-number yields the input integer values.
#[test]
fn enum_round_trip_by_name_and_by_number() {
    let ty = traffic_light_enum();
    let rows = vec![
        Value::Enum { name: "green".to_string(), value: 1 },
        Value::Enum { name: "red".to_string(), value: 0 },
        Value::Enum { name: "blue".to_string(), value: 2 },
    ];
    let col = column_for(&ty, &rows);
    let block = Block::new(vec![("e".to_string(), ty, col)]);

    let decoded = round_trip_block(&block, &DecodeOptions::new());
    let view = RowView::new(&decoded);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(view.get_at(i, 0), Some(row.clone()));
    }

    let decoded_numeric = round_trip_block(&block, &DecodeOptions::new().with_enum_as_number(true));
    let view = RowView::new(&decoded_numeric);
    assert_eq!(view.get_at(0, 0), Some(Value::Enum { name: String::new(), value: 1 }));
    assert_eq!(view.get_at(1, 0), Some(Value::Enum { name: String::new(), value: 0 }));
    assert_eq!(view.get_at(2, 0), Some(Value::Enum { name: String::new(), value: 2 }));
}

/// `map_as_array` selects ordered (duplicate-preserving) vs. hash-style
/// (last-write-wins) rendering of decoded Map rows (spec.md §6).
#[test]
fn map_as_array_selects_ordered_vs_hashed_rendering() {
    let ty = parse_type("Map(String, Int32)").unwrap();
    let rows = vec![Value::Map(vec![
        (Value::String(Bytes::from("a")), Value::Int32(1)),
        (Value::String(Bytes::from("a")), Value::Int32(2)),
        (Value::String(Bytes::from("b")), Value::Int32(3)),
    ])];
    let col = column_for(&ty, &rows);
    let block = Block::new(vec![("m".to_string(), ty, col)]);

    let ordered = round_trip_block(&block, &DecodeOptions::new().with_map_as_array(true));
    let view = RowView::new(&ordered);
    assert_eq!(view.get_at(0, 0), Some(rows[0].clone()));

    let hashed = round_trip_block(&block, &DecodeOptions::new());
    let view = RowView::new(&hashed);
    assert_eq!(
        view.get_at(0, 0),
        Some(Value::Map(vec![
            (Value::String(Bytes::from("a")), Value::Int32(2)),
            (Value::String(Bytes::from("b")), Value::Int32(3)),
        ]))
    );
}
