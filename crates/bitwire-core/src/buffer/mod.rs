//! Read/write cursor contracts shared by every backend.
//!
//! A field codec drives one buffer through `pull_context`/`push_context`,
//! a sequence of named scalar reads or writes, and the matching
//! `close_context`/`pop_context`. The byte-based backends move a bit cursor;
//! the structured backends (JSON, XML, box) build or walk a tree keyed by the
//! logical names and keep a bit count for `pos()`.
//!
//! Bit lengths of numeric scalars are `u8`, string widths are `u32`, and all
//! positions are expressed in bits.

mod context;
mod ext;

pub use context::{ContextEntry, ContextFrame, ContextStack, StackError};
pub use ext::{ReadBufferExt, WriteBufferExt};

use serde::{Deserialize, Serialize};

use crate::args::ReaderWriterArg;
use crate::error::{ParseError, SerializationError};
use crate::helpers;

/// Byte order of multi-byte scalars. Bit order within a byte is always
/// most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Current cursor position in bits.
pub trait PositionAware {
    fn pos(&self) -> usize;
}

/// Per-instance byte order.
pub trait ByteOrderAware {
    fn byte_order(&self) -> ByteOrder;
    fn set_byte_order(&mut self, byte_order: ByteOrder);
}

/// Decoding cursor.
///
/// Every read validates its bit length before touching the cursor and either
/// returns the decoded value or a [`ParseError`]; nothing is silently
/// truncated.
pub trait ReadBuffer: PositionAware + ByteOrderAware {
    /// Move the cursor to an absolute bit position.
    fn reset(&mut self, pos: usize) -> Result<(), ParseError>;

    /// Whether at least `num_bits` more bits can be read.
    fn has_more(&self, num_bits: usize) -> bool;

    fn pull_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), ParseError>;

    fn read_bit(&mut self, logical_name: &str, args: &[ReaderWriterArg])
    -> Result<bool, ParseError>;

    /// A raw 8-bit byte, never byte-order dependent.
    fn read_byte(&mut self, logical_name: &str, args: &[ReaderWriterArg])
    -> Result<u8, ParseError>;

    fn read_byte_array(
        &mut self,
        logical_name: &str,
        number_of_bytes: usize,
        args: &[ReaderWriterArg],
    ) -> Result<Vec<u8>, ParseError>;

    fn read_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u8, ParseError>;

    fn read_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u16, ParseError>;

    fn read_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u32, ParseError>;

    fn read_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u64, ParseError>;

    fn read_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u128, ParseError>;

    fn read_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<i8, ParseError>;

    fn read_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<i16, ParseError>;

    fn read_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<i32, ParseError>;

    fn read_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<i64, ParseError>;

    fn read_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<i128, ParseError>;

    /// 16 bits decode the half-float format, 32 bits IEEE single precision.
    fn read_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<f32, ParseError>;

    /// Only 64-bit IEEE double precision is supported.
    fn read_double(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<f64, ParseError>;

    fn read_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        args: &[ReaderWriterArg],
    ) -> Result<String, ParseError>;

    fn close_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), ParseError>;
}

/// Encoding cursor, the mirror of [`ReadBuffer`].
pub trait WriteBuffer: PositionAware + ByteOrderAware {
    fn push_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_bit(
        &mut self,
        logical_name: &str,
        value: bool,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_byte(
        &mut self,
        logical_name: &str,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_byte_array(
        &mut self,
        logical_name: &str,
        value: &[u8],
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_double(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn write_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        value: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;

    fn pop_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError>;
}

/// A message that knows its encoded size.
pub trait LengthAware {
    fn length_in_bits(&self) -> usize;

    fn length_in_bytes(&self) -> usize {
        helpers::ceil_div(self.length_in_bits(), 8)
    }
}

/// A message that can encode itself into any write backend.
pub trait Serializable {
    fn serialize(&self, write_buffer: &mut dyn WriteBuffer) -> Result<(), SerializationError>;
}
