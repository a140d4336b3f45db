//! Append-only chunk accumulator for the streaming driver (spec.md §4.B).

use bytes::{Buf, Bytes, BytesMut};

/// Default minimum capacity before the buffer starts compacting eagerly.
pub const DEFAULT_MIN_BUFFER: usize = 2 * 1024 * 1024;

/// Holds the unconsumed suffix of a byte stream across chunk arrivals.
///
/// `view()` always returns a contiguous slice: appended chunks are copied
/// into one growable `BytesMut`, and `consume(n)` advances a head offset
/// that is only physically compacted (via `BytesMut::advance` +
/// occasional `reserve`) once it would otherwise force doubling the
/// allocation, per spec.md §4.B.
#[derive(Debug)]
pub struct StreamBuffer {
    buf: BytesMut,
    min_buffer: usize,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::with_min_buffer(DEFAULT_MIN_BUFFER)
    }

    pub fn with_min_buffer(min_buffer: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(min_buffer),
            min_buffer,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append a chunk. Chunks may arrive with arbitrary, even pathological
    /// (1-byte) boundaries; this simply extends the contiguous buffer.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Borrow the buffered bytes as one contiguous slice.
    pub fn view(&self) -> &[u8] {
        &self.buf
    }

    /// Copy the buffered bytes into a stable, independently-owned allocation.
    /// Callers that retain zero-copy typed-array references past the next
    /// `append`/`consume` must snapshot via this method first (spec.md §4.B).
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    /// Drop the first `n` bytes. Amortized O(1): `BytesMut::advance` just
    /// moves an internal cursor; we only eagerly reclaim space once the
    /// consumed head exceeds `min_buffer` or doing so avoids doubling the
    /// backing allocation on the next `append`.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.buf.len(), "consume beyond buffered length");
        self.buf.advance(n);
        if self.buf.capacity() - self.buf.len() > self.min_buffer.max(self.buf.len()) {
            let mut compacted = BytesMut::with_capacity(self.buf.len().max(self.min_buffer));
            compacted.extend_from_slice(&self.buf);
            self.buf = compacted;
        }
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_is_contiguous_across_discontiguous_appends() {
        let mut sb = StreamBuffer::new();
        sb.append(&[1]);
        sb.append(&[2, 3]);
        sb.append(&[4, 5, 6]);
        assert_eq!(sb.view(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn consume_drops_prefix() {
        let mut sb = StreamBuffer::new();
        sb.append(&[1, 2, 3, 4]);
        sb.consume(2);
        assert_eq!(sb.view(), &[3, 4]);
    }

    #[test]
    fn pathological_one_byte_chunks() {
        let mut sb = StreamBuffer::new();
        for b in 0u8..50 {
            sb.append(&[b]);
        }
        assert_eq!(sb.len(), 50);
        sb.consume(10);
        assert_eq!(sb.view()[0], 10);
    }
}
