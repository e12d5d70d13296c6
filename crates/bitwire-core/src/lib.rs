//! bitwire core library: a bit-precision, context-aware binary codec
//! framework.
//!
//! Field codecs talk to one of two cursor contracts, [`ReadBuffer`] and
//! [`WriteBuffer`]. Each message is a tree of named contexts holding named
//! scalars of arbitrary bit width, and every backend reproduces the same
//! logical tree:
//! - `bytes`: the production wire format, bit-addressed and byte-order aware.
//! - `json` / `xml`: structured documents carrying data type and bit length
//!   next to every value, readable back into the same tree.
//! - `boxed`: a write-only ASCII box diagram for debugging.
//!
//! Invariants:
//! - Bit lengths are validated before the cursor moves.
//! - Every pushed context is popped under the same name, in LIFO order.
//! - Write buffers never grow past their declared capacity.
//!
//! # Examples
//! ```
//! use bitwire_core::{
//!     ByteOrder, ReadBuffer, ReadBufferByteBased, WriteBuffer, WriteBufferByteBased,
//!     WriteBufferJsonBased,
//! };
//!
//! let mut rb = ReadBufferByteBased::with_byte_order(&[0x34, 0x12], ByteOrder::LittleEndian);
//! let id = rb.read_unsigned_short("id", 16, &[])?;
//! assert_eq!(id, 0x1234);
//!
//! let mut wb = WriteBufferByteBased::new(2);
//! wb.write_unsigned_short("id", 16, id, &[])?;
//! assert_eq!(wb.bytes(), &[0x12, 0x34]);
//!
//! let mut json = WriteBufferJsonBased::default();
//! json.push_context("frame", &[])?;
//! json.write_unsigned_short("id", 16, id, &[])?;
//! json.pop_context("frame", &[])?;
//! assert!(json.json_string()?.contains("\"id__plc4x_bitLength\": 16"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod args;
pub mod boxed;
pub mod buffer;
pub mod bytes;
mod error;
pub mod helpers;
pub mod json;
pub mod layout;
pub mod schema;
pub mod xml;

pub use args::ReaderWriterArg;
pub use boxed::{AsciiBox, BoxOptions, WriteBufferBoxBased};
pub use buffer::{
    ByteOrder, ByteOrderAware, LengthAware, PositionAware, ReadBuffer, ReadBufferExt,
    Serializable, WriteBuffer, WriteBufferExt,
};
pub use bytes::{ByteReaderOptions, ReadBufferByteBased, WriteBufferByteBased};
pub use error::{HelperError, ParseError, SerializationError};
pub use json::{JsonReadOptions, ReadBufferJsonBased, WriteBufferJsonBased};
pub use schema::{FieldSchema, FieldValue, MessageSchema, SchemaMessage};
pub use xml::{ReadBufferXmlBased, WriteBufferXmlBased, XmlReadOptions};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
