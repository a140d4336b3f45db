//! Row-oriented auxiliary format round trips (spec.md §6): every row is
//! self-contained, with no shared offsets, dictionary, or discriminator
//! grouping across rows.

use pretty_assertions::assert_eq;

use native_codec::config::DecodeOptions;
use native_codec::grammar::parse_type;
use native_codec::io::{ReadBuffer, WriteBuffer};
use native_codec::rowformat::{decode_row_block, encode_row_block, RowFormatBlock, RowFormatFlavor};
use native_codec::Value;

fn roundtrip_names_and_types(block: &RowFormatBlock) -> RowFormatBlock {
    let mut writer = WriteBuffer::new();
    encode_row_block(&mut writer, block, RowFormatFlavor::NamesAndTypes).unwrap();
    let bytes = writer.into_bytes();
    let mut reader = ReadBuffer::new(&bytes);
    decode_row_block(&mut reader, RowFormatFlavor::NamesAndTypes, &[], &DecodeOptions::new()).unwrap()
}

#[test]
fn scalar_rows_round_trip_with_inline_types() {
    let columns = vec![
        ("id".to_string(), parse_type("UInt32").unwrap()),
        ("name".to_string(), parse_type("String").unwrap()),
    ];
    let rows = vec![
        vec![Value::UInt32(1), Value::String(bytes::Bytes::from("a"))],
        vec![Value::UInt32(2), Value::String(bytes::Bytes::from("b"))],
    ];
    let block = RowFormatBlock { columns, rows: rows.clone() };
    let decoded = roundtrip_names_and_types(&block);
    assert_eq!(decoded.rows, rows);
}

/// The `Names`-only flavor carries no type strings on the wire, so the
/// caller must supply the column types up front to decode.
#[test]
fn names_only_flavor_requires_caller_supplied_types() {
    let types = vec![parse_type("Int32").unwrap()];
    let columns = vec![("n".to_string(), types[0].clone())];
    let rows = vec![vec![Value::Int32(42)]];
    let block = RowFormatBlock { columns, rows: rows.clone() };

    let mut writer = WriteBuffer::new();
    encode_row_block(&mut writer, &block, RowFormatFlavor::Names).unwrap();
    let bytes = writer.into_bytes();
    let mut reader = ReadBuffer::new(&bytes);
    let decoded = decode_row_block(&mut reader, RowFormatFlavor::Names, &types, &DecodeOptions::new()).unwrap();
    assert_eq!(decoded.rows, rows);
}

#[test]
fn array_and_nullable_rows_round_trip_without_shared_offsets() {
    let columns = vec![
        ("tags".to_string(), parse_type("Array(String)").unwrap()),
        ("maybe".to_string(), parse_type("Nullable(Int32)").unwrap()),
    ];
    let rows = vec![
        vec![Value::Array(vec![]), Value::Null],
        vec![
            Value::Array(vec![bytes::Bytes::from("x"), bytes::Bytes::from("y")].into_iter().map(Value::String).collect()),
            Value::Int32(-5),
        ],
    ];
    let block = RowFormatBlock { columns, rows: rows.clone() };
    let decoded = roundtrip_names_and_types(&block);
    assert_eq!(decoded.rows, rows);
}

#[test]
fn variant_and_dynamic_rows_carry_their_own_type_tag() {
    let columns = vec![
        ("v".to_string(), parse_type("Variant(Int32, String)").unwrap()),
        ("d".to_string(), parse_type("Dynamic").unwrap()),
    ];
    let rows = vec![
        vec![
            Value::Variant { type_index: 1, value: Box::new(Value::String(bytes::Bytes::from("hi"))) },
            Value::Dynamic { type_name: "Int32".to_string(), value: Box::new(Value::Int32(9)) },
        ],
        vec![Value::Null, Value::Null],
    ];
    let block = RowFormatBlock { columns, rows: rows.clone() };
    let decoded = roundtrip_names_and_types(&block);
    assert_eq!(decoded.rows, rows);
}
