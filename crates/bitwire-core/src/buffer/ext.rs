//! Unnamed convenience wrappers.
//!
//! Each method delegates to the named operation with an empty logical name
//! and no flags; keyed backends substitute the default name.

use super::{ReadBuffer, WriteBuffer};
use crate::error::{ParseError, SerializationError};

pub trait ReadBufferExt: ReadBuffer {
    fn bit(&mut self) -> Result<bool, ParseError> {
        self.read_bit("", &[])
    }

    fn byte(&mut self) -> Result<u8, ParseError> {
        self.read_byte("", &[])
    }

    fn bytes(&mut self, number_of_bytes: usize) -> Result<Vec<u8>, ParseError> {
        self.read_byte_array("", number_of_bytes, &[])
    }

    fn uint8(&mut self, bit_length: u8) -> Result<u8, ParseError> {
        self.read_unsigned_byte("", bit_length, &[])
    }

    fn uint16(&mut self, bit_length: u8) -> Result<u16, ParseError> {
        self.read_unsigned_short("", bit_length, &[])
    }

    fn uint32(&mut self, bit_length: u8) -> Result<u32, ParseError> {
        self.read_unsigned_int("", bit_length, &[])
    }

    fn uint64(&mut self, bit_length: u8) -> Result<u64, ParseError> {
        self.read_unsigned_long("", bit_length, &[])
    }

    fn int8(&mut self, bit_length: u8) -> Result<i8, ParseError> {
        self.read_signed_byte("", bit_length, &[])
    }

    fn int16(&mut self, bit_length: u8) -> Result<i16, ParseError> {
        self.read_short("", bit_length, &[])
    }

    fn int32(&mut self, bit_length: u8) -> Result<i32, ParseError> {
        self.read_int("", bit_length, &[])
    }

    fn int64(&mut self, bit_length: u8) -> Result<i64, ParseError> {
        self.read_long("", bit_length, &[])
    }

    fn float32(&mut self, bit_length: u8) -> Result<f32, ParseError> {
        self.read_float("", bit_length, &[])
    }

    fn float64(&mut self) -> Result<f64, ParseError> {
        self.read_double("", 64, &[])
    }

    fn string(&mut self, bit_length: u32, encoding: &str) -> Result<String, ParseError> {
        self.read_string("", bit_length, encoding, &[])
    }
}

impl<R: ReadBuffer + ?Sized> ReadBufferExt for R {}

pub trait WriteBufferExt: WriteBuffer {
    fn put_bit(&mut self, value: bool) -> Result<(), SerializationError> {
        self.write_bit("", value, &[])
    }

    fn put_byte(&mut self, value: u8) -> Result<(), SerializationError> {
        self.write_byte("", value, &[])
    }

    fn put_bytes(&mut self, value: &[u8]) -> Result<(), SerializationError> {
        self.write_byte_array("", value, &[])
    }

    fn put_uint8(&mut self, bit_length: u8, value: u8) -> Result<(), SerializationError> {
        self.write_unsigned_byte("", bit_length, value, &[])
    }

    fn put_uint16(&mut self, bit_length: u8, value: u16) -> Result<(), SerializationError> {
        self.write_unsigned_short("", bit_length, value, &[])
    }

    fn put_uint32(&mut self, bit_length: u8, value: u32) -> Result<(), SerializationError> {
        self.write_unsigned_int("", bit_length, value, &[])
    }

    fn put_uint64(&mut self, bit_length: u8, value: u64) -> Result<(), SerializationError> {
        self.write_unsigned_long("", bit_length, value, &[])
    }

    fn put_int8(&mut self, bit_length: u8, value: i8) -> Result<(), SerializationError> {
        self.write_signed_byte("", bit_length, value, &[])
    }

    fn put_int16(&mut self, bit_length: u8, value: i16) -> Result<(), SerializationError> {
        self.write_short("", bit_length, value, &[])
    }

    fn put_int32(&mut self, bit_length: u8, value: i32) -> Result<(), SerializationError> {
        self.write_int("", bit_length, value, &[])
    }

    fn put_int64(&mut self, bit_length: u8, value: i64) -> Result<(), SerializationError> {
        self.write_long("", bit_length, value, &[])
    }

    fn put_float32(&mut self, bit_length: u8, value: f32) -> Result<(), SerializationError> {
        self.write_float("", bit_length, value, &[])
    }

    fn put_float64(&mut self, value: f64) -> Result<(), SerializationError> {
        self.write_double("", 64, value, &[])
    }

    fn put_string(
        &mut self,
        bit_length: u32,
        encoding: &str,
        value: &str,
    ) -> Result<(), SerializationError> {
        self.write_string("", bit_length, encoding, value, &[])
    }
}

impl<W: WriteBuffer + ?Sized> WriteBufferExt for W {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        ReadBufferByteBased, ReadBufferJsonBased, WriteBufferByteBased, WriteBufferJsonBased,
    };

    #[test]
    fn byte_backend_round_trip() {
        let mut wb = WriteBufferByteBased::new(4);
        wb.put_bit(true).unwrap();
        wb.put_uint8(7, 0x12).unwrap();
        wb.put_uint16(16, 0xBEEF).unwrap();
        wb.put_int8(8, -3).unwrap();
        assert_eq!(wb.bytes(), &[0x92, 0xBE, 0xEF, 0xFD]);

        let bytes = wb.into_bytes();
        let mut rb = ReadBufferByteBased::new(&bytes);
        assert!(rb.bit().unwrap());
        assert_eq!(rb.uint8(7).unwrap(), 0x12);
        assert_eq!(rb.uint16(16).unwrap(), 0xBEEF);
        assert_eq!(rb.int8(8).unwrap(), -3);
    }

    #[test]
    fn keyed_backends_use_the_default_name() {
        let mut wb = WriteBufferJsonBased::new();
        wb.push_context("frame", &[]).unwrap();
        wb.put_uint16(12, 0xABC).unwrap();
        wb.pop_context("frame", &[]).unwrap();
        let document = wb.value().unwrap();
        assert_eq!(
            document,
            json!({
                "frame": {
                    "value": 0xABC,
                    "value__plc4x_dataType": "uint",
                    "value__plc4x_bitLength": 12
                }
            })
        );

        let mut rb = ReadBufferJsonBased::from_value(document).unwrap();
        rb.pull_context("frame", &[]).unwrap();
        assert_eq!(rb.uint16(12).unwrap(), 0xABC);
        rb.close_context("frame", &[]).unwrap();
    }
}
