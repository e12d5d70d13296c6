use serde::{Deserialize, Serialize};

use super::bits::BitCursor;
use super::encoding::NumericEncoding;
use super::half;
use crate::args::ReaderWriterArg;
use crate::buffer::{ByteOrder, ByteOrderAware, PositionAware, ReadBuffer};
use crate::error::ParseError;
use crate::layout::{self, StringEncoding, WidthLimit};

/// Behavior switches of [`ReadBufferByteBased`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteReaderOptions {
    /// Stop copying string characters at the first zero code unit (the full
    /// declared width is still consumed).
    pub soft_zero_termination: bool,
}

impl Default for ByteReaderOptions {
    fn default() -> Self {
        Self {
            soft_zero_termination: true,
        }
    }
}

/// Bit-precision read cursor over a borrowed byte buffer.
///
/// # Examples
/// ```
/// use bitwire_core::{ByteOrder, ReadBuffer, ReadBufferByteBased};
///
/// let mut rb = ReadBufferByteBased::with_byte_order(&[0x34, 0x12], ByteOrder::LittleEndian);
/// assert_eq!(rb.read_unsigned_short("id", 16, &[])?, 0x1234);
/// # Ok::<(), bitwire_core::ParseError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReadBufferByteBased<'a> {
    cursor: BitCursor<'a>,
    byte_order: ByteOrder,
    options: ByteReaderOptions,
}

impl<'a> ReadBufferByteBased<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_byte_order(data, ByteOrder::BigEndian)
    }

    pub fn with_byte_order(data: &'a [u8], byte_order: ByteOrder) -> Self {
        Self {
            cursor: BitCursor::new(data),
            byte_order,
            options: ByteReaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ByteReaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ByteReaderOptions {
        self.options
    }

    pub fn total_bytes(&self) -> usize {
        self.cursor.total_bytes()
    }

    /// The byte `offset` bytes past the cursor, without consuming it.
    pub fn peek_byte(&mut self, offset: usize) -> Result<u8, ParseError> {
        self.cursor.require(offset.saturating_add(1).saturating_mul(8))?;
        let start = self.cursor.pos();
        self.cursor.seek(start + offset * 8)?;
        let peeked = self.cursor.read_bits(8);
        self.cursor.seek(start)?;
        Ok(peeked? as u8)
    }

    fn read_raw(&mut self, limit: WidthLimit, bit_length: u8) -> Result<u64, ParseError> {
        limit.check_read(u32::from(bit_length))?;
        self.cursor.read_bits(u32::from(bit_length))
    }

    fn read_numeric_text(
        &mut self,
        logical_name: &str,
        encoding: NumericEncoding,
        bit_length: u8,
    ) -> Result<u64, ParseError> {
        let bit_length = u32::from(bit_length);
        if bit_length % encoding.digit_bits() != 0 {
            return Err(ParseError::UnsupportedWidth {
                type_name: encoding.name(),
                bit_length,
            });
        }
        self.cursor.require(bit_length as usize)?;
        let digits = bit_length / encoding.digit_bits();
        let mut raw = String::with_capacity(digits as usize);
        let mut valid = true;
        for _ in 0..digits {
            let unit = self.cursor.read_bits(encoding.digit_bits())? as u8;
            let digit = match encoding {
                NumericEncoding::Ascii => unit.checked_sub(b'0').filter(|d| *d <= 9),
                NumericEncoding::Bcd => Some(unit).filter(|d| *d <= 9),
            };
            match (encoding, digit) {
                (_, Some(digit)) => raw.push(char::from(b'0' + digit)),
                (NumericEncoding::Ascii, None) => {
                    valid = false;
                    raw.push(char::from(unit));
                }
                (NumericEncoding::Bcd, None) => {
                    valid = false;
                    raw.push_str(&format!("{unit:X}"));
                }
            }
        }
        let parsed = if valid { raw.parse::<u64>().ok() } else { None };
        parsed.ok_or_else(|| ParseError::InvalidDigits {
            name: logical_name.to_string(),
            encoding: encoding.name(),
            raw,
        })
    }

    fn read_unsigned(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u64, ParseError> {
        limit.check_read(u32::from(bit_length))?;
        match NumericEncoding::from_args(args) {
            Some(encoding) => self.read_numeric_text(logical_name, encoding, bit_length),
            None => self.cursor.read_bits(u32::from(bit_length)),
        }
    }

    fn read_signed(&mut self, limit: WidthLimit, bit_length: u8) -> Result<i64, ParseError> {
        let raw = self.read_raw(limit, bit_length)?;
        Ok(sign_extend(raw, u32::from(bit_length)))
    }

    /// Up to 128 raw bits, big-endian, as two 64-bit halves.
    fn read_wide(&mut self, bit_length: u32) -> Result<u128, ParseError> {
        self.cursor.require(bit_length as usize)?;
        let high_bits = bit_length.saturating_sub(64);
        let high = self.cursor.read_bits(high_bits)?;
        let low = self.cursor.read_bits(bit_length - high_bits)?;
        Ok((u128::from(high) << 64) | u128::from(low))
    }

    fn read_wide_little_endian(&mut self, bit_length: u32) -> Result<u128, ParseError> {
        if bit_length % 32 != 0 {
            return Err(ParseError::UnsupportedWidth {
                type_name: "little-endian big integer",
                bit_length,
            });
        }
        self.cursor.require(bit_length as usize)?;
        let mut value = 0u128;
        for chunk in 0..bit_length / 32 {
            let word = (self.cursor.read_bits(32)? as u32).swap_bytes();
            value |= u128::from(word) << (32 * chunk);
        }
        Ok(value)
    }

    fn read_big(&mut self, limit: WidthLimit, bit_length: u8) -> Result<u128, ParseError> {
        limit.check_read(u32::from(bit_length))?;
        match self.byte_order {
            ByteOrder::BigEndian => self.read_wide(u32::from(bit_length)),
            ByteOrder::LittleEndian => self.read_wide_little_endian(u32::from(bit_length)),
        }
    }

    fn read_units(&mut self, unit_bits: u32, count: usize) -> Result<Vec<u16>, ParseError> {
        self.cursor.require(unit_bits as usize * count)?;
        let mut units = Vec::with_capacity(count);
        let mut terminated = false;
        for _ in 0..count {
            let unit = self.cursor.read_bits(unit_bits)? as u16;
            if unit == 0 && self.options.soft_zero_termination {
                terminated = true;
            }
            if !terminated {
                units.push(unit);
            }
        }
        Ok(units)
    }
}

fn sign_extend(raw: u64, bit_length: u32) -> i64 {
    let shift = 64 - bit_length;
    ((raw << shift) as i64) >> shift
}

fn sign_extend_wide(raw: u128, bit_length: u32) -> i128 {
    let shift = 128 - bit_length;
    ((raw << shift) as i128) >> shift
}

fn narrow<T: TryFrom<u64>>(logical_name: &str, value: u64) -> Result<T, ParseError> {
    T::try_from(value).map_err(|_| ParseError::InvalidValue {
        name: logical_name.to_string(),
        message: format!("{value} does not fit the requested type"),
    })
}

fn decode_utf16(logical_name: &str, units: &[u16]) -> Result<String, ParseError> {
    String::from_utf16(units).map_err(|_| ParseError::InvalidValue {
        name: logical_name.to_string(),
        message: "invalid UTF-16 sequence".to_string(),
    })
}

impl PositionAware for ReadBufferByteBased<'_> {
    fn pos(&self) -> usize {
        self.cursor.pos()
    }
}

impl ByteOrderAware for ReadBufferByteBased<'_> {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }
}

impl ReadBuffer for ReadBufferByteBased<'_> {
    fn reset(&mut self, pos: usize) -> Result<(), ParseError> {
        self.cursor.seek(pos)
    }

    fn has_more(&self, num_bits: usize) -> bool {
        self.cursor.remaining() >= num_bits
    }

    fn pull_context(&mut self, _: &str, _: &[ReaderWriterArg]) -> Result<(), ParseError> {
        Ok(())
    }

    fn read_bit(&mut self, _: &str, _: &[ReaderWriterArg]) -> Result<bool, ParseError> {
        Ok(self.cursor.read_bits(1)? == 1)
    }

    fn read_byte(&mut self, _: &str, _: &[ReaderWriterArg]) -> Result<u8, ParseError> {
        Ok(self.cursor.read_bits(8)? as u8)
    }

    fn read_byte_array(
        &mut self,
        _: &str,
        number_of_bytes: usize,
        _: &[ReaderWriterArg],
    ) -> Result<Vec<u8>, ParseError> {
        self.cursor.require(number_of_bytes.saturating_mul(8))?;
        (0..number_of_bytes)
            .map(|_| self.cursor.read_bits(8).map(|byte| byte as u8))
            .collect()
    }

    fn read_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u8, ParseError> {
        let value = self.read_unsigned(logical_name, layout::UNSIGNED_BYTE, bit_length, args)?;
        narrow(logical_name, value)
    }

    fn read_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u16, ParseError> {
        let encoded = NumericEncoding::from_args(args).is_some();
        let value = self.read_unsigned(logical_name, layout::UNSIGNED_SHORT, bit_length, args)?;
        if encoded || self.byte_order == ByteOrder::BigEndian {
            return narrow(logical_name, value);
        }
        Ok(((value as u32).swap_bytes() >> 16) as u16)
    }

    fn read_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u32, ParseError> {
        let encoded = NumericEncoding::from_args(args).is_some();
        let value = self.read_unsigned(logical_name, layout::UNSIGNED_INT, bit_length, args)?;
        if encoded || self.byte_order == ByteOrder::BigEndian {
            return narrow(logical_name, value);
        }
        Ok((value.swap_bytes() >> 32) as u32)
    }

    fn read_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        args: &[ReaderWriterArg],
    ) -> Result<u64, ParseError> {
        let encoded = NumericEncoding::from_args(args).is_some();
        let value = self.read_unsigned(logical_name, layout::UNSIGNED_LONG, bit_length, args)?;
        if encoded || self.byte_order == ByteOrder::BigEndian {
            return Ok(value);
        }
        Ok(value.swap_bytes())
    }

    fn read_unsigned_big_integer(
        &mut self,
        _: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u128, ParseError> {
        self.read_big(layout::UNSIGNED_BIG_INTEGER, bit_length)
    }

    fn read_signed_byte(
        &mut self,
        _: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i8, ParseError> {
        Ok(self.read_signed(layout::SIGNED_BYTE, bit_length)? as i8)
    }

    fn read_short(
        &mut self,
        _: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i16, ParseError> {
        let value = self.read_signed(layout::SHORT, bit_length)? as i16;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => value,
            ByteOrder::LittleEndian => value.swap_bytes(),
        })
    }

    fn read_int(&mut self, _: &str, bit_length: u8, _: &[ReaderWriterArg]) -> Result<i32, ParseError> {
        let value = self.read_signed(layout::INT, bit_length)? as i32;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => value,
            ByteOrder::LittleEndian => value.swap_bytes(),
        })
    }

    fn read_long(&mut self, _: &str, bit_length: u8, _: &[ReaderWriterArg]) -> Result<i64, ParseError> {
        let value = self.read_signed(layout::LONG, bit_length)?;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => value,
            ByteOrder::LittleEndian => value.swap_bytes(),
        })
    }

    fn read_big_integer(
        &mut self,
        _: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i128, ParseError> {
        let raw = self.read_big(layout::BIG_INTEGER, bit_length)?;
        Ok(sign_extend_wide(raw, u32::from(bit_length)))
    }

    fn read_float(
        &mut self,
        _: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<f32, ParseError> {
        layout::FLOAT.check_read(bit_length)?;
        if u32::from(bit_length) == layout::HALF_FLOAT_BITS {
            return Ok(half::decode(self.cursor.read_bits(16)? as u16));
        }
        let raw = self.cursor.read_bits(layout::FLOAT_BITS)? as u32;
        Ok(f32::from_bits(match self.byte_order {
            ByteOrder::BigEndian => raw,
            ByteOrder::LittleEndian => raw.swap_bytes(),
        }))
    }

    fn read_double(
        &mut self,
        _: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<f64, ParseError> {
        layout::DOUBLE.check_read(bit_length)?;
        let raw = self.cursor.read_bits(64)?;
        Ok(f64::from_bits(match self.byte_order {
            ByteOrder::BigEndian => raw,
            ByteOrder::LittleEndian => raw.swap_bytes(),
        }))
    }

    fn read_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        _: &[ReaderWriterArg],
    ) -> Result<String, ParseError> {
        let encoding_kind = layout::string_encoding_for_read(encoding, bit_length)?;
        let unit_bits = encoding_kind.unit_bits();
        let units = self.read_units(unit_bits, (bit_length / unit_bits) as usize)?;
        match encoding_kind {
            StringEncoding::Ascii | StringEncoding::Utf8 => {
                let bytes: Vec<u8> = units.into_iter().map(|unit| unit as u8).collect();
                if encoding_kind == StringEncoding::Ascii && !bytes.is_ascii() {
                    return Err(ParseError::InvalidValue {
                        name: logical_name.to_string(),
                        message: "non-ASCII byte in ASCII string".to_string(),
                    });
                }
                String::from_utf8(bytes).map_err(|_| ParseError::InvalidValue {
                    name: logical_name.to_string(),
                    message: "invalid UTF-8 sequence".to_string(),
                })
            }
            StringEncoding::Utf16Be => decode_utf16(logical_name, &units),
            StringEncoding::Utf16Le => {
                let swapped: Vec<u16> = units.iter().map(|unit| unit.swap_bytes()).collect();
                decode_utf16(logical_name, &swapped)
            }
            StringEncoding::Utf16 => match units.first() {
                Some(0xFEFF) => decode_utf16(logical_name, &units[1..]),
                Some(0xFFFE) => {
                    let swapped: Vec<u16> =
                        units[1..].iter().map(|unit| unit.swap_bytes()).collect();
                    decode_utf16(logical_name, &swapped)
                }
                _ => decode_utf16(logical_name, &units),
            },
        }
    }

    fn close_context(&mut self, _: &str, _: &[ReaderWriterArg]) -> Result<(), ParseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_order_of_0x1234() {
        let mut rb = ReadBufferByteBased::new(&[0x12, 0x34]);
        assert_eq!(rb.read_unsigned_short("", 16, &[]).unwrap(), 0x1234);
        rb.reset(0).unwrap();
        rb.set_byte_order(ByteOrder::LittleEndian);
        assert_eq!(rb.read_unsigned_short("", 16, &[]).unwrap(), 0x3412);
    }

    #[test]
    fn little_endian_unsigned_widths() {
        let data = [0x78, 0x56, 0x34, 0x12, 0xEF, 0xCD, 0xAB, 0x90];
        let mut rb = ReadBufferByteBased::with_byte_order(&data, ByteOrder::LittleEndian);
        assert_eq!(rb.read_unsigned_int("", 32, &[]).unwrap(), 0x1234_5678);
        rb.reset(0).unwrap();
        assert_eq!(rb.read_unsigned_long("", 64, &[]).unwrap(), 0x90AB_CDEF_1234_5678);
    }

    #[test]
    fn signed_values_sign_extend() {
        let mut rb = ReadBufferByteBased::new(&[0b1110_0000, 0xFF, 0xFE]);
        assert_eq!(rb.read_signed_byte("", 3, &[]).unwrap(), -1);
        assert_eq!(rb.read_signed_byte("", 5, &[]).unwrap(), 0);
        assert_eq!(rb.read_short("", 16, &[]).unwrap(), -2);
    }

    #[test]
    fn little_endian_signed_swaps_native_width() {
        let mut rb = ReadBufferByteBased::with_byte_order(&[0xFE, 0xFF], ByteOrder::LittleEndian);
        assert_eq!(rb.read_short("", 16, &[]).unwrap(), -2);
    }

    #[test]
    fn invalid_bit_length_does_not_consume() {
        let mut rb = ReadBufferByteBased::new(&[0xFF; 4]);
        assert!(matches!(
            rb.read_unsigned_byte("", 9, &[]),
            Err(ParseError::InvalidBitLength { max: 8, .. })
        ));
        assert!(rb.read_unsigned_short("", 0, &[]).is_err());
        assert!(rb.read_unsigned_int("", 33, &[]).is_err());
        assert_eq!(rb.pos(), 0);
    }

    #[test]
    fn big_integer_widths() {
        let data = [0xFF; 16];
        let mut rb = ReadBufferByteBased::new(&data);
        assert_eq!(rb.read_unsigned_big_integer("", 128, &[]).unwrap(), u128::MAX);
        rb.reset(0).unwrap();
        assert_eq!(rb.read_big_integer("", 100, &[]).unwrap(), -1);
        assert!(rb.read_unsigned_big_integer("", 0, &[]).is_err());
    }

    #[test]
    fn little_endian_big_integer_needs_whole_words() {
        let data = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut rb = ReadBufferByteBased::with_byte_order(&data, ByteOrder::LittleEndian);
        assert_eq!(
            rb.read_unsigned_big_integer("", 64, &[]).unwrap(),
            (2u128 << 32) | 1
        );
        rb.reset(0).unwrap();
        assert!(matches!(
            rb.read_unsigned_big_integer("", 40, &[]),
            Err(ParseError::UnsupportedWidth { .. })
        ));
    }

    #[test]
    fn float_widths() {
        let mut data = 1.5f32.to_be_bytes().to_vec();
        data.extend_from_slice(&2.25f64.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x64]);
        let mut rb = ReadBufferByteBased::new(&data);
        assert_eq!(rb.read_float("", 32, &[]).unwrap(), 1.5);
        assert_eq!(rb.read_double("", 64, &[]).unwrap(), 2.25);
        assert_eq!(rb.read_float("", 16, &[]).unwrap(), 1.0);
        rb.reset(0).unwrap();
        assert!(rb.read_float("", 24, &[]).is_err());
        assert!(rb.read_double("", 32, &[]).is_err());
    }

    #[test]
    fn soft_zero_termination_consumes_full_width() {
        let data = b"hi\0zz!";
        let mut rb = ReadBufferByteBased::new(data);
        assert_eq!(rb.read_string("", 40, "UTF-8", &[]).unwrap(), "hi");
        assert_eq!(rb.pos(), 40);
        assert_eq!(rb.read_string("", 8, "ASCII", &[]).unwrap(), "!");
    }

    #[test]
    fn termination_can_be_disabled() {
        let data = b"a\0b";
        let mut rb = ReadBufferByteBased::new(data).with_options(ByteReaderOptions {
            soft_zero_termination: false,
        });
        assert_eq!(rb.read_string("", 24, "ASCII", &[]).unwrap(), "a\0b");
    }

    #[test]
    fn string_exhaustion_is_an_error() {
        let mut rb = ReadBufferByteBased::new(b"abc");
        assert!(matches!(
            rb.read_string("", 32, "ASCII", &[]),
            Err(ParseError::Exhausted { .. })
        ));
        assert_eq!(rb.pos(), 0);
    }

    #[test]
    fn utf16_variants() {
        let mut rb = ReadBufferByteBased::new(&[0x00, 0x41, 0x42, 0x00, 0xFF, 0xFE, 0x43, 0x00]);
        assert_eq!(rb.read_string("", 16, "UTF-16BE", &[]).unwrap(), "A");
        assert_eq!(rb.read_string("", 16, "UTF-16LE", &[]).unwrap(), "B");
        assert_eq!(rb.read_string("", 32, "UTF-16", &[]).unwrap(), "C");
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let mut rb = ReadBufferByteBased::new(b"abcd");
        assert!(matches!(
            rb.read_string("", 32, "KOI8", &[]),
            Err(ParseError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn ascii_numeric_field() {
        let mut rb = ReadBufferByteBased::new(b"42x1");
        let args = [ReaderWriterArg::encoding("ASCII")];
        assert_eq!(rb.read_unsigned_short("n", 16, &args).unwrap(), 42);
        assert!(matches!(
            rb.read_unsigned_short("n", 16, &args),
            Err(ParseError::InvalidDigits { .. })
        ));
    }

    #[test]
    fn bcd_numeric_field() {
        let mut rb = ReadBufferByteBased::new(&[0x12, 0x34, 0x9A]);
        let args = [ReaderWriterArg::encoding("BCD")];
        assert_eq!(rb.read_unsigned_short("n", 16, &args).unwrap(), 1234);
        assert!(rb.read_unsigned_byte("n", 8, &args).is_err());
    }

    #[test]
    fn peek_restores_position() {
        let mut rb = ReadBufferByteBased::new(&[1, 2, 3]);
        rb.read_byte("", &[]).unwrap();
        assert_eq!(rb.peek_byte(1).unwrap(), 3);
        assert!(rb.peek_byte(2).is_err());
        assert_eq!(rb.pos(), 8);
        assert!(rb.has_more(16));
        assert!(!rb.has_more(17));
        assert_eq!(rb.total_bytes(), 3);
    }

    #[test]
    fn reset_beyond_end_fails() {
        let mut rb = ReadBufferByteBased::new(&[0]);
        assert!(matches!(
            rb.reset(9),
            Err(ParseError::ResetOutOfRange { pos: 9, limit: 8 })
        ));
    }

    #[test]
    fn huge_lengths_report_exhaustion() {
        let mut rb = ReadBufferByteBased::new(&[0xAB]);
        assert_eq!(rb.peek_byte(0).unwrap(), 0xAB);
        assert!(matches!(rb.peek_byte(usize::MAX), Err(ParseError::Exhausted { .. })));
        assert!(matches!(
            rb.read_byte_array("", usize::MAX, &[]),
            Err(ParseError::Exhausted { .. })
        ));
        assert_eq!(rb.pos(), 0);
    }

    #[test]
    fn unsupported_float_widths_and_encodings() {
        let mut rb = ReadBufferByteBased::new(&[0; 8]);
        assert!(matches!(
            rb.read_float("", 24, &[]),
            Err(ParseError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            rb.read_double("", 32, &[]),
            Err(ParseError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            rb.read_string("", 8, "KOI8", &[]),
            Err(ParseError::UnsupportedEncoding { .. })
        ));
        assert_eq!(rb.pos(), 0);
    }
}
