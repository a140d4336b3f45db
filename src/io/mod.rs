//! Buffer I/O primitives (spec.md §4.A, §4.B).

mod read_buffer;
mod stream_buffer;
mod write_buffer;

pub use read_buffer::ReadBuffer;
pub use stream_buffer::{StreamBuffer, DEFAULT_MIN_BUFFER};
pub use write_buffer::WriteBuffer;
