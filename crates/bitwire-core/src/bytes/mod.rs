//! Byte-based backend: the production wire format.
//!
//! `bits` moves raw MSB-first bits, `half` and `encoding` hold the value
//! codecs, and `reader`/`writer` implement the cursor contracts on top.

mod bits;
mod encoding;
pub(crate) mod half;
mod reader;
mod writer;

pub use reader::{ByteReaderOptions, ReadBufferByteBased};
pub use writer::WriteBufferByteBased;
