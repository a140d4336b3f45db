//! Random-access read buffer over a contiguous byte slice (spec.md §4.A).

use crate::error::{CodecError, CodecResult, ErrorContext};

/// A cursor over a borrowed byte slice. Every read either succeeds and
/// advances the cursor, or fails with `CodecError::BufferUnderflow` and
/// leaves the cursor untouched — callers never need to roll back a partial
/// multi-byte read themselves.
#[derive(Debug, Clone, Copy)]
pub struct ReadBuffer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Cursor snapshot; restoring it undoes any reads performed since.
    pub fn checkpoint(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    fn need(&self, n: usize) -> CodecResult<()> {
        if self.remaining() < n {
            return Err(CodecError::underflow(
                n - self.remaining(),
                ErrorContext::new().with_offset(self.pos as u64),
            ));
        }
        Ok(())
    }

    /// Borrow `n` bytes without copying. Fails (without advancing) on underflow.
    pub fn read_bytes(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        self.need(n)?;
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Peek without advancing the cursor.
    pub fn peek_bytes(&self, n: usize) -> CodecResult<&'a [u8]> {
        self.need(n)?;
        Ok(&self.bytes[self.pos..self.pos + n])
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> CodecResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Unsigned LEB128. Fails without consuming any bytes if the buffer runs
    /// dry mid-sequence (the caller's checkpoint/restore covers this since we
    /// never partially commit `self.pos` past a failing read).
    pub fn read_varint(&mut self) -> CodecResult<u64> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            if shift >= 64 {
                self.pos = start;
                return Err(CodecError::invalid(
                    "varint too long",
                    ErrorContext::new().with_offset(start as u64),
                ));
            }
            let byte = match self.read_u8() {
                Ok(b) => b,
                Err(e) => {
                    self.pos = start;
                    return Err(e);
                }
            };
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(result)
    }

    /// `varint(len) || bytes`, UTF-8 validated.
    pub fn read_string(&mut self) -> CodecResult<&'a str> {
        let start = self.pos;
        let len = self.read_varint()? as usize;
        let bytes = match self.read_bytes(len) {
            Ok(b) => b,
            Err(e) => {
                self.pos = start;
                return Err(e);
            }
        };
        std::str::from_utf8(bytes).map_err(|_| {
            CodecError::invalid(
                "string is not valid utf-8",
                ErrorContext::new().with_offset(start as u64),
            )
        })
    }

    /// Raw length-prefixed bytes, without UTF-8 validation (used for the
    /// String wire type, which spec.md §4.F notes is not UTF-8-enforced).
    pub fn read_string_bytes(&mut self) -> CodecResult<&'a [u8]> {
        let start = self.pos;
        let len = self.read_varint()? as usize;
        self.read_bytes(len).map_err(|e| {
            self.pos = start;
            e
        })
    }

    /// Reinterpret the next `count` elements of a fixed-width primitive type
    /// as a borrowed slice when the cursor is aligned for `T`, otherwise copy.
    /// Either result is conformant per spec.md §4.A.
    pub fn read_typed_array<T: bytemuck_lite::Pod>(&mut self, count: usize) -> CodecResult<Vec<T>> {
        let width = std::mem::size_of::<T>();
        let bytes = self.read_bytes(count * width)?;
        let mut out = Vec::with_capacity(count);
        for chunk in bytes.chunks_exact(width) {
            out.push(T::from_le_bytes_slice(chunk));
        }
        Ok(out)
    }
}

/// A tiny local stand-in for the part of `bytemuck`'s `Pod` trait this crate
/// needs (little-endian decode of fixed-width primitives from a byte slice),
/// so typed-array reads stay generic over the scalar codecs in `codec::scalar`.
pub mod bytemuck_lite {
    pub trait Pod: Sized + Copy {
        fn from_le_bytes_slice(bytes: &[u8]) -> Self;
    }

    macro_rules! impl_pod_int {
        ($($t:ty),*) => {
            $(impl Pod for $t {
                fn from_le_bytes_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }
            })*
        };
    }

    impl_pod_int!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, f32, f64);
}

impl<'a> ReadBuffer<'a> {
    pub fn read_u16_le(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }
    pub fn read_i16_le(&mut self) -> CodecResult<i16> {
        Ok(i16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }
    pub fn read_u32_le(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }
    pub fn read_i32_le(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }
    pub fn read_u64_le(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }
    pub fn read_i64_le(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }
    pub fn read_u128_le(&mut self) -> CodecResult<u128> {
        Ok(u128::from_le_bytes(self.read_bytes(16)?.try_into().unwrap()))
    }
    pub fn read_i128_le(&mut self) -> CodecResult<i128> {
        Ok(i128::from_le_bytes(self.read_bytes(16)?.try_into().unwrap()))
    }
    pub fn read_i256_le(&mut self) -> CodecResult<ethnum::I256> {
        let bytes = self.read_bytes(32)?;
        Ok(ethnum::I256::from_le_bytes(bytes.try_into().unwrap()))
    }
    pub fn read_u256_le(&mut self) -> CodecResult<ethnum::U256> {
        let bytes = self.read_bytes(32)?;
        Ok(ethnum::U256::from_le_bytes(bytes.try_into().unwrap()))
    }
    pub fn read_f32_le(&mut self) -> CodecResult<f32> {
        Ok(f32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }
    pub fn read_f64_le(&mut self) -> CodecResult<f64> {
        Ok(f64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::write_buffer::WriteBuffer;

    #[test]
    fn underflow_does_not_move_cursor() {
        let bytes = [1u8, 2, 3];
        let mut r = ReadBuffer::new(&bytes);
        let before = r.checkpoint();
        assert!(r.read_u64_le().is_err());
        assert_eq!(r.checkpoint(), before);
    }

    #[test]
    fn varint_matches_write_buffer() {
        let mut w = WriteBuffer::new();
        w.write_varint(300);
        let bytes = w.into_bytes();
        let mut r = ReadBuffer::new(&bytes);
        assert_eq!(r.read_varint().unwrap(), 300);
    }

    #[test]
    fn string_roundtrip() {
        let mut w = WriteBuffer::new();
        w.write_string(b"hello");
        let bytes = w.into_bytes();
        let mut r = ReadBuffer::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "hello");
    }
}
