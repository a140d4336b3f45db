//! Streaming underflow/resume (spec.md §8 scenario 6, §4.I): a block split
//! arbitrarily across chunk boundaries decodes identically to the
//! un-chunked bytes, and a trailing partial block is dropped rather than
//! erroring.

use bytes::Bytes;
use pretty_assertions::assert_eq;

use native_codec::block::{encode_block, Block};
use native_codec::config::{DecodeOptions, EncodeOptions};
use native_codec::grammar::parse_type;
use native_codec::io::WriteBuffer;
use native_codec::{decode_stream, encode_stream, Codec, CodecRegistry, Value};

fn sample_blocks() -> Vec<Block> {
    let ty = parse_type("Int32").unwrap();
    let codec = CodecRegistry::global().get_for_type(&ty).unwrap();
    let a = codec.from_values(&[Value::Int32(1), Value::Int32(2), Value::Int32(3)]).unwrap();
    let b = codec.from_values(&[Value::Int32(10), Value::Int32(20)]).unwrap();
    vec![
        Block::new(vec![("n".to_string(), ty.clone(), a)]),
        Block::new(vec![("n".to_string(), ty, b)]),
    ]
}

#[tokio::test]
async fn splitting_bytes_across_many_small_chunks_resumes_cleanly() {
    let blocks = sample_blocks();
    let mut writer = WriteBuffer::new();
    for block in &blocks {
        encode_block(&mut writer, block, &EncodeOptions::new()).unwrap();
    }
    let bytes = writer.into_bytes();

    for chunk_size in [1usize, 3, 7, 64] {
        let chunks: Vec<Bytes> = bytes.chunks(chunk_size).map(Bytes::copy_from_slice).collect();
        let source = tokio_stream::iter(chunks);
        let decoded = decode_stream(source, DecodeOptions::new()).await.unwrap();
        assert_eq!(decoded.len(), 2, "chunk_size={chunk_size}");
        assert_eq!(decoded[0].num_rows(), 3);
        assert_eq!(decoded[1].num_rows(), 2);
    }
}

#[tokio::test]
async fn encode_stream_then_decode_stream_preserves_block_boundaries() {
    let blocks = sample_blocks();
    let mut encoded = encode_stream(blocks, EncodeOptions::new());
    let mut chunks = Vec::new();
    while let Some(chunk) = futures::StreamExt::next(&mut encoded).await {
        chunks.push(chunk.unwrap());
    }
    let source = tokio_stream::iter(chunks);
    let decoded = decode_stream(source, DecodeOptions::new()).await.unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].num_rows(), 3);
    assert_eq!(decoded[1].num_rows(), 2);
}

#[tokio::test]
async fn a_truncated_final_block_is_dropped_not_reported_as_an_error() {
    let blocks = sample_blocks();
    let mut writer = WriteBuffer::new();
    encode_block(&mut writer, &blocks[0], &EncodeOptions::new()).unwrap();
    encode_block(&mut writer, &blocks[1], &EncodeOptions::new()).unwrap();
    let mut bytes = writer.into_bytes().to_vec();
    bytes.truncate(bytes.len() - 2);

    let source = tokio_stream::iter(vec![Bytes::from(bytes)]);
    let decoded = decode_stream(source, DecodeOptions::new()).await.unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].num_rows(), 3);
}
