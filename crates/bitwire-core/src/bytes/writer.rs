use super::bits::BitSink;
use super::encoding::{self, NumericEncoding};
use super::half;
use crate::args::ReaderWriterArg;
use crate::buffer::{ByteOrder, ByteOrderAware, PositionAware, WriteBuffer};
use crate::error::SerializationError;
use crate::layout::{self, StringEncoding, WidthLimit};

/// Bit-precision write cursor over a fixed-capacity byte buffer.
///
/// Little-endian writes apply the inverse of the read transform, so every
/// value the reader can produce at a given width is writable at that width.
///
/// # Examples
/// ```
/// use bitwire_core::{ByteOrder, WriteBuffer, WriteBufferByteBased};
///
/// let mut wb = WriteBufferByteBased::with_byte_order(2, ByteOrder::LittleEndian);
/// wb.write_unsigned_short("id", 16, 0x1234, &[])?;
/// assert_eq!(wb.bytes(), &[0x34, 0x12]);
/// # Ok::<(), bitwire_core::SerializationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WriteBufferByteBased {
    sink: BitSink,
    byte_order: ByteOrder,
}

impl WriteBufferByteBased {
    pub fn new(capacity_bytes: usize) -> Self {
        Self::with_byte_order(capacity_bytes, ByteOrder::BigEndian)
    }

    pub fn with_byte_order(capacity_bytes: usize, byte_order: ByteOrder) -> Self {
        Self {
            sink: BitSink::with_capacity(capacity_bytes),
            byte_order,
        }
    }

    /// Bytes written so far; a partially written final byte is included.
    pub fn bytes(&self) -> &[u8] {
        self.sink.written()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.sink.into_written()
    }

    pub fn capacity_bytes(&self) -> usize {
        self.sink.capacity_bits() / 8
    }

    fn write_checked(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
        value: u64,
    ) -> Result<(), SerializationError> {
        limit.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        self.sink.write_bits(u32::from(bit_length), value)
    }

    fn write_numeric_text(
        &mut self,
        logical_name: &str,
        encoding: NumericEncoding,
        bit_length: u8,
        value: u64,
    ) -> Result<(), SerializationError> {
        let bit_length = u32::from(bit_length);
        if bit_length % encoding.digit_bits() != 0 {
            return Err(SerializationError::UnsupportedWidth {
                type_name: encoding.name(),
                bit_length,
            });
        }
        let digits = bit_length / encoding.digit_bits();
        let max = encoding::max_for_digits(digits);
        if value > max {
            return Err(SerializationError::ValueTooLarge {
                name: logical_name.to_string(),
                value: value.to_string(),
                max: max.to_string(),
            });
        }
        self.sink.require(bit_length as usize)?;
        let text = format!("{value:0width$}", width = digits as usize);
        for digit in text.bytes() {
            let unit = match encoding {
                NumericEncoding::Ascii => digit,
                NumericEncoding::Bcd => digit - b'0',
            };
            self.sink.write_bits(encoding.digit_bits(), u64::from(unit))?;
        }
        Ok(())
    }

    /// Shared path of the unsigned writes. `swapped` is the little-endian
    /// form of the value, used when no numeric encoding applies.
    fn write_unsigned(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
        value: u64,
        swapped: u64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        limit.check_write(u32::from(bit_length))?;
        if let Some(encoding) = NumericEncoding::from_args(args) {
            return self.write_numeric_text(logical_name, encoding, bit_length, value);
        }
        let emitted = match self.byte_order {
            ByteOrder::BigEndian => value,
            ByteOrder::LittleEndian => swapped,
        };
        self.write_checked(logical_name, limit, bit_length, emitted)
    }

    /// Shared path of the signed writes. The value must fit the signed
    /// `bit_length` range; it is emitted as two's complement.
    fn write_signed(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
        value: i64,
    ) -> Result<(), SerializationError> {
        limit.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let bits = u32::from(bit_length);
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        self.sink.write_bits(bits, value as u64 & mask)
    }

    fn write_big(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_BIG_INTEGER.check_unsigned_write(logical_name, bit_length, value)?;
        let bits = u32::from(bit_length);
        if bits % 32 == 0 {
            self.sink.require(bits as usize)?;
            let words: Vec<u32> = (0..bits / 32)
                .map(|chunk| (value >> (32 * chunk)) as u32)
                .collect();
            match self.byte_order {
                ByteOrder::BigEndian => {
                    for word in words.iter().rev() {
                        self.sink.write_bits(32, u64::from(*word))?;
                    }
                }
                ByteOrder::LittleEndian => {
                    for word in &words {
                        self.sink.write_bits(32, u64::from(word.swap_bytes()))?;
                    }
                }
            }
            return Ok(());
        }
        if self.byte_order == ByteOrder::LittleEndian {
            return Err(SerializationError::UnsupportedWidth {
                type_name: "little-endian big integer",
                bit_length: bits,
            });
        }
        self.sink.require(bits as usize)?;
        let high_bits = bits.saturating_sub(64);
        self.sink.write_bits(high_bits, (value >> 64) as u64)?;
        self.sink.write_bits(bits - high_bits, value as u64)
    }

    fn write_units(
        &mut self,
        unit_bits: u32,
        width: usize,
        units: &[u16],
    ) -> Result<(), SerializationError> {
        self.sink.require(unit_bits as usize * width)?;
        for index in 0..width {
            let unit = units.get(index).copied().unwrap_or(0);
            self.sink.write_bits(unit_bits, u64::from(unit))?;
        }
        Ok(())
    }
}

/// The longest prefix of `value` that fits `max_bytes` without splitting a
/// character.
fn truncate_utf8(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

impl PositionAware for WriteBufferByteBased {
    fn pos(&self) -> usize {
        self.sink.pos()
    }
}

impl ByteOrderAware for WriteBufferByteBased {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }
}

impl WriteBuffer for WriteBufferByteBased {
    fn push_context(&mut self, _: &str, _: &[ReaderWriterArg]) -> Result<(), SerializationError> {
        Ok(())
    }

    fn write_bit(
        &mut self,
        _: &str,
        value: bool,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        self.sink.write_bits(1, u64::from(value))
    }

    fn write_byte(
        &mut self,
        _: &str,
        value: u8,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        self.sink.write_bits(8, u64::from(value))
    }

    fn write_byte_array(
        &mut self,
        _: &str,
        value: &[u8],
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        self.sink.require(value.len() * 8)?;
        for byte in value {
            self.sink.write_bits(8, u64::from(*byte))?;
        }
        Ok(())
    }

    fn write_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let value = u64::from(value);
        self.write_unsigned(logical_name, layout::UNSIGNED_BYTE, bit_length, value, value, args)
    }

    fn write_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let swapped = u64::from(value.swap_bytes());
        self.write_unsigned(
            logical_name,
            layout::UNSIGNED_SHORT,
            bit_length,
            u64::from(value),
            swapped,
            args,
        )
    }

    fn write_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let swapped = u64::from(value.swap_bytes());
        self.write_unsigned(
            logical_name,
            layout::UNSIGNED_INT,
            bit_length,
            u64::from(value),
            swapped,
            args,
        )
    }

    fn write_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        if NumericEncoding::from_args(args).is_none() && u32::from(bit_length) == 64 {
            return self.write_big(logical_name, bit_length, u128::from(value));
        }
        self.write_unsigned(
            logical_name,
            layout::UNSIGNED_LONG,
            bit_length,
            value,
            value.swap_bytes(),
            args,
        )
    }

    fn write_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_BIG_INTEGER.check_write(u32::from(bit_length))?;
        self.write_big(logical_name, bit_length, value)
    }

    fn write_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i8,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        self.write_signed(logical_name, layout::SIGNED_BYTE, bit_length, i64::from(value))
    }

    fn write_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i16,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let value = match self.byte_order {
            ByteOrder::BigEndian => value,
            ByteOrder::LittleEndian => value.swap_bytes(),
        };
        self.write_signed(logical_name, layout::SHORT, bit_length, i64::from(value))
    }

    fn write_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i32,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let value = match self.byte_order {
            ByteOrder::BigEndian => value,
            ByteOrder::LittleEndian => value.swap_bytes(),
        };
        self.write_signed(logical_name, layout::INT, bit_length, i64::from(value))
    }

    fn write_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i64,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let value = match self.byte_order {
            ByteOrder::BigEndian => value,
            ByteOrder::LittleEndian => value.swap_bytes(),
        };
        self.write_signed(logical_name, layout::LONG, bit_length, value)
    }

    fn write_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i128,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::BIG_INTEGER.check_signed_write(logical_name, bit_length, value)?;
        let bits = u32::from(bit_length);
        let mask = if bits == 128 { u128::MAX } else { (1u128 << bits) - 1 };
        self.write_big(logical_name, bit_length, value as u128 & mask)
    }

    fn write_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f32,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::FLOAT.check_write(bit_length)?;
        if u32::from(bit_length) == layout::HALF_FLOAT_BITS {
            let raw = half::encode_field(logical_name, value)?;
            return self.sink.write_bits(16, u64::from(raw));
        }
        let raw = match self.byte_order {
            ByteOrder::BigEndian => value.to_bits(),
            ByteOrder::LittleEndian => value.to_bits().swap_bytes(),
        };
        self.sink.write_bits(layout::FLOAT_BITS, u64::from(raw))
    }

    fn write_double(
        &mut self,
        _: &str,
        bit_length: u8,
        value: f64,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::DOUBLE.check_write(bit_length)?;
        let raw = match self.byte_order {
            ByteOrder::BigEndian => value.to_bits(),
            ByteOrder::LittleEndian => value.to_bits().swap_bytes(),
        };
        self.sink.write_bits(64, raw)
    }

    fn write_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        value: &str,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let encoding_kind = layout::string_encoding_for_write(encoding, bit_length)?;
        let unit_bits = encoding_kind.unit_bits();
        let width = (bit_length / unit_bits) as usize;
        let units: Vec<u16> = match encoding_kind {
            StringEncoding::Ascii => {
                if !value.is_ascii() {
                    return Err(SerializationError::InvalidValue {
                        name: logical_name.to_string(),
                        message: "non-ASCII character in ASCII string".to_string(),
                    });
                }
                value.bytes().map(u16::from).collect()
            }
            StringEncoding::Utf8 => truncate_utf8(value, width).bytes().map(u16::from).collect(),
            StringEncoding::Utf16 | StringEncoding::Utf16Be => value.encode_utf16().collect(),
            StringEncoding::Utf16Le => value.encode_utf16().map(u16::swap_bytes).collect(),
        };
        if units.len() > width {
            tracing::debug!(
                field = logical_name,
                length = units.len(),
                width,
                "string truncated to field width"
            );
        }
        self.write_units(unit_bits, width, &units)
    }

    fn pop_context(&mut self, _: &str, _: &[ReaderWriterArg]) -> Result<(), SerializationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness_of_0x1234() {
        let mut wb = WriteBufferByteBased::new(4);
        wb.write_unsigned_short("", 16, 0x1234, &[]).unwrap();
        wb.set_byte_order(ByteOrder::LittleEndian);
        wb.write_unsigned_short("", 16, 0x1234, &[]).unwrap();
        assert_eq!(wb.bytes(), &[0x12, 0x34, 0x34, 0x12]);
    }

    #[test]
    fn ascii_numeric_mode() {
        let args = [ReaderWriterArg::encoding("ASCII")];
        let mut wb = WriteBufferByteBased::new(2);
        wb.write_unsigned_short("n", 16, 42, &args).unwrap();
        assert_eq!(wb.bytes(), b"42");

        let mut wb = WriteBufferByteBased::new(2);
        let err = wb.write_unsigned_short("n", 16, 100, &args).unwrap_err();
        assert_eq!(err.to_string(), "value 100 of 'n' exceeds the max value of 99");
        assert_eq!(wb.pos(), 0);
    }

    #[test]
    fn bcd_numeric_mode() {
        let args = [ReaderWriterArg::encoding("BCD")];
        let mut wb = WriteBufferByteBased::new(2);
        wb.write_unsigned_short("n", 16, 907, &args).unwrap();
        assert_eq!(wb.bytes(), &[0x09, 0x07]);
    }

    #[test]
    fn values_must_fit_their_width() {
        let mut wb = WriteBufferByteBased::new(4);
        assert!(matches!(
            wb.write_unsigned_byte("", 3, 8, &[]),
            Err(SerializationError::ValueTooLarge { .. })
        ));
        assert!(wb.write_signed_byte("", 4, -9, &[]).is_err());
        wb.write_signed_byte("", 4, -8, &[]).unwrap();
        wb.write_unsigned_byte("", 4, 0xF, &[]).unwrap();
        assert_eq!(wb.bytes(), &[0x8F]);
    }

    #[test]
    fn invalid_bit_length_writes_nothing() {
        let mut wb = WriteBufferByteBased::new(8);
        assert!(matches!(
            wb.write_unsigned_short("", 17, 1, &[]),
            Err(SerializationError::InvalidBitLength { max: 16, .. })
        ));
        assert!(wb.write_long("", 0, 1, &[]).is_err());
        assert!(wb.write_float("", 8, 1.0, &[]).is_err());
        assert_eq!(wb.pos(), 0);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut wb = WriteBufferByteBased::new(1);
        wb.write_unsigned_byte("", 4, 1, &[]).unwrap();
        assert!(matches!(
            wb.write_unsigned_byte("", 8, 1, &[]),
            Err(SerializationError::Overflow { .. })
        ));
        assert!(wb.write_byte_array("", &[1, 2], &[]).is_err());
        assert_eq!(wb.pos(), 4);
    }

    #[test]
    fn long_is_split_into_words() {
        let mut wb = WriteBufferByteBased::with_byte_order(8, ByteOrder::LittleEndian);
        wb.write_unsigned_long("", 64, 0x0102_0304_0506_0708, &[]).unwrap();
        assert_eq!(wb.bytes(), &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn wide_big_integer_word_order() {
        let value = (1u128 << 64) | 2;
        let mut wb = WriteBufferByteBased::new(12);
        wb.write_unsigned_big_integer("", 96, value, &[]).unwrap();
        assert_eq!(wb.bytes(), &[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2]);
        let mut wb = WriteBufferByteBased::with_byte_order(12, ByteOrder::LittleEndian);
        wb.write_unsigned_big_integer("", 96, value, &[]).unwrap();
        assert_eq!(wb.bytes(), &[2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]);
        assert!(wb.write_unsigned_big_integer("", 40, 1, &[]).is_err());
    }

    #[test]
    fn strings_are_padded_and_truncated() {
        let mut wb = WriteBufferByteBased::new(8);
        wb.write_string("", 32, "UTF-8", "ab", &[]).unwrap();
        wb.write_string("", 32, "ASCII", "abcdef", &[]).unwrap();
        assert_eq!(wb.bytes(), b"ab\0\0abcd");
        assert!(wb.write_string("", 8, "ASCII", "x", &[]).is_err());
    }

    #[test]
    fn utf16_strings_write_every_unit() {
        let mut wb = WriteBufferByteBased::new(10);
        wb.write_string("", 48, "UTF-16LE", "hi", &[]).unwrap();
        wb.write_string("", 32, "UTF-16", "\u{1F600}", &[]).unwrap();
        assert_eq!(
            wb.bytes(),
            &[b'h', 0, b'i', 0, 0, 0, 0xD8, 0x3D, 0xDE, 0x00]
        );
    }

    #[test]
    fn string_width_and_encoding_checks() {
        let mut wb = WriteBufferByteBased::new(4);
        assert!(matches!(
            wb.write_string("", 12, "UTF-8", "a", &[]),
            Err(SerializationError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            wb.write_string("", 8, "EBCDIC", "a", &[]),
            Err(SerializationError::UnsupportedEncoding { .. })
        ));
        assert!(wb.write_string("", 8, "ASCII", "é", &[]).is_err());
    }

    #[test]
    fn half_float_is_written_big_endian() {
        let mut wb = WriteBufferByteBased::with_byte_order(2, ByteOrder::LittleEndian);
        wb.write_float("", 16, 1.0, &[]).unwrap();
        assert_eq!(wb.bytes(), &[0x00, 0x64]);
    }

    #[test]
    fn utf8_truncation_keeps_whole_characters() {
        let mut wb = WriteBufferByteBased::new(2);
        wb.write_string("", 16, "UTF-8", "a\u{e9}", &[]).unwrap();
        assert_eq!(wb.bytes(), b"a\0");
        assert_eq!(truncate_utf8("\u{e9}\u{e9}", 3), "\u{e9}");
    }

    #[test]
    fn float_width_and_range_checks() {
        let mut wb = WriteBufferByteBased::new(8);
        assert!(matches!(
            wb.write_float("", 24, 1.0, &[]),
            Err(SerializationError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            wb.write_double("", 32, 1.0, &[]),
            Err(SerializationError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            wb.write_float("temp", 16, 1.0e9, &[]),
            Err(SerializationError::ValueTooLarge { .. })
        ));
        assert_eq!(wb.pos(), 0);
    }
}
