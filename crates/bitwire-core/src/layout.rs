//! Width limits, value ranges and data type identifiers shared by every
//! backend.
//!
//! Limits are checked before any byte is read or written, so a rejected call
//! leaves the cursor untouched. The tree backends run the same checks as the
//! byte backend: a field that cannot be encoded on the wire cannot be
//! rendered as JSON, XML or a box either.

use crate::args;
use crate::error::{ParseError, SerializationError};

/// Inclusive bit-length range accepted by one scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthLimit {
    pub type_name: &'static str,
    pub max: u32,
}

impl WidthLimit {
    const fn new(type_name: &'static str, max: u32) -> Self {
        Self { type_name, max }
    }

    pub fn contains(&self, bit_length: u32) -> bool {
        (1..=self.max).contains(&bit_length)
    }

    pub fn check_read(&self, bit_length: u32) -> Result<(), ParseError> {
        if self.contains(bit_length) {
            return Ok(());
        }
        Err(ParseError::InvalidBitLength {
            type_name: self.type_name,
            bit_length,
            max: self.max,
        })
    }

    pub fn check_write(&self, bit_length: u32) -> Result<(), SerializationError> {
        if self.contains(bit_length) {
            return Ok(());
        }
        Err(SerializationError::InvalidBitLength {
            type_name: self.type_name,
            bit_length,
            max: self.max,
        })
    }

    /// Width check plus: `value` fits `bit_length` unsigned bits.
    pub fn check_unsigned_write(
        &self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
    ) -> Result<(), SerializationError> {
        let bits = u32::from(bit_length);
        self.check_write(bits)?;
        let max = unsigned_max(bits);
        if value > max {
            return Err(SerializationError::ValueTooLarge {
                name: args::sanitize_logical_name(logical_name).to_string(),
                value: value.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    /// Width check plus: `value` fits `bit_length` two's complement bits.
    pub fn check_signed_write(
        &self,
        logical_name: &str,
        bit_length: u8,
        value: i128,
    ) -> Result<(), SerializationError> {
        let bits = u32::from(bit_length);
        self.check_write(bits)?;
        let (min, max) = signed_range(bits);
        if !(min..=max).contains(&value) {
            return Err(SerializationError::ValueTooLarge {
                name: args::sanitize_logical_name(logical_name).to_string(),
                value: value.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    /// A value decoded from text must fit the declared unsigned width.
    pub fn check_unsigned_read(
        &self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
    ) -> Result<(), ParseError> {
        let bits = u32::from(bit_length);
        self.check_read(bits)?;
        if value > unsigned_max(bits) {
            return Err(out_of_range(logical_name, value, bits));
        }
        Ok(())
    }

    pub fn check_signed_read(
        &self,
        logical_name: &str,
        bit_length: u8,
        value: i128,
    ) -> Result<(), ParseError> {
        let bits = u32::from(bit_length);
        self.check_read(bits)?;
        let (min, max) = signed_range(bits);
        if !(min..=max).contains(&value) {
            return Err(out_of_range(logical_name, value, bits));
        }
        Ok(())
    }
}

fn unsigned_max(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// `bits` must be at least 1.
fn signed_range(bits: u32) -> (i128, i128) {
    if bits >= 128 {
        (i128::MIN, i128::MAX)
    } else {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    }
}

fn out_of_range(logical_name: &str, value: impl std::fmt::Display, bits: u32) -> ParseError {
    ParseError::InvalidValue {
        name: args::sanitize_logical_name(logical_name).to_string(),
        message: format!("{value} does not fit in {bits} bits"),
    }
}

/// The exact bit lengths accepted by one floating point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatWidths {
    pub type_name: &'static str,
    pub widths: &'static [u32],
}

impl FloatWidths {
    pub fn contains(&self, bit_length: u32) -> bool {
        self.widths.contains(&bit_length)
    }

    pub fn check_read(&self, bit_length: u8) -> Result<(), ParseError> {
        if self.contains(u32::from(bit_length)) {
            return Ok(());
        }
        Err(ParseError::UnsupportedWidth {
            type_name: self.type_name,
            bit_length: u32::from(bit_length),
        })
    }

    pub fn check_write(&self, bit_length: u8) -> Result<(), SerializationError> {
        if self.contains(u32::from(bit_length)) {
            return Ok(());
        }
        Err(SerializationError::UnsupportedWidth {
            type_name: self.type_name,
            bit_length: u32::from(bit_length),
        })
    }
}

pub const UNSIGNED_BYTE: WidthLimit = WidthLimit::new("unsigned byte", 8);
pub const UNSIGNED_SHORT: WidthLimit = WidthLimit::new("unsigned short", 16);
pub const UNSIGNED_INT: WidthLimit = WidthLimit::new("unsigned int", 32);
pub const UNSIGNED_LONG: WidthLimit = WidthLimit::new("unsigned long", 64);
pub const UNSIGNED_BIG_INTEGER: WidthLimit = WidthLimit::new("unsigned big integer", 128);
pub const SIGNED_BYTE: WidthLimit = WidthLimit::new("signed byte", 8);
pub const SHORT: WidthLimit = WidthLimit::new("signed short", 16);
pub const INT: WidthLimit = WidthLimit::new("signed int", 32);
pub const LONG: WidthLimit = WidthLimit::new("signed long", 64);
pub const BIG_INTEGER: WidthLimit = WidthLimit::new("signed big integer", 128);

pub const HALF_FLOAT_BITS: u32 = 16;
pub const FLOAT_BITS: u32 = 32;
pub const DOUBLE_BITS: u32 = 64;

/// 16-bit half floats and 32-bit IEEE singles.
pub const FLOAT: FloatWidths = FloatWidths {
    type_name: "float",
    widths: &[HALF_FLOAT_BITS, FLOAT_BITS],
};
pub const DOUBLE: FloatWidths = FloatWidths {
    type_name: "double",
    widths: &[DOUBLE_BITS],
};

/// Width check for a `float` field plus, at 16 bits, the half float range.
pub(crate) fn check_float_write(
    logical_name: &str,
    bit_length: u8,
    value: f32,
) -> Result<(), SerializationError> {
    FLOAT.check_write(bit_length)?;
    if u32::from(bit_length) == HALF_FLOAT_BITS {
        crate::bytes::half::encode_field(logical_name, value)?;
    }
    Ok(())
}

pub(crate) fn check_float_read(
    logical_name: &str,
    bit_length: u8,
    value: f32,
) -> Result<(), ParseError> {
    FLOAT.check_read(bit_length)?;
    if u32::from(bit_length) == HALF_FLOAT_BITS && crate::bytes::half::encode(value).is_none() {
        return Err(out_of_range(logical_name, value, HALF_FLOAT_BITS));
    }
    Ok(())
}

pub const STRING_TYPE_NAME: &str = "string";

/// Character encodings for fixed-width string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringEncoding {
    Ascii,
    Utf8,
    /// Big-endian unless the data starts with a byte order mark.
    Utf16,
    Utf16Le,
    Utf16Be,
}

impl StringEncoding {
    pub(crate) fn parse(encoding: &str) -> Option<Self> {
        match args::normalize_encoding(encoding).as_str() {
            "ASCII" | "USASCII" => Some(StringEncoding::Ascii),
            "UTF8" => Some(StringEncoding::Utf8),
            "UTF16" => Some(StringEncoding::Utf16),
            "UTF16LE" => Some(StringEncoding::Utf16Le),
            "UTF16BE" => Some(StringEncoding::Utf16Be),
            _ => None,
        }
    }

    pub(crate) fn unit_bits(self) -> u32 {
        match self {
            StringEncoding::Ascii | StringEncoding::Utf8 => 8,
            StringEncoding::Utf16 | StringEncoding::Utf16Le | StringEncoding::Utf16Be => 16,
        }
    }
}

/// The encoding of a string field, which must be known and divide the
/// field width into whole code units.
pub(crate) fn string_encoding_for_read(
    encoding: &str,
    bit_length: u32,
) -> Result<StringEncoding, ParseError> {
    let kind = StringEncoding::parse(encoding).ok_or_else(|| ParseError::UnsupportedEncoding {
        encoding: encoding.to_string(),
    })?;
    if bit_length % kind.unit_bits() != 0 {
        return Err(ParseError::UnsupportedWidth {
            type_name: STRING_TYPE_NAME,
            bit_length,
        });
    }
    Ok(kind)
}

pub(crate) fn string_encoding_for_write(
    encoding: &str,
    bit_length: u32,
) -> Result<StringEncoding, SerializationError> {
    let kind =
        StringEncoding::parse(encoding).ok_or_else(|| SerializationError::UnsupportedEncoding {
            encoding: encoding.to_string(),
        })?;
    if bit_length % kind.unit_bits() != 0 {
        return Err(SerializationError::UnsupportedWidth {
            type_name: STRING_TYPE_NAME,
            bit_length,
        });
    }
    Ok(kind)
}

/// Data type recorded next to every scalar by the structured backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bit,
    Byte,
    Uint,
    Int,
    Float,
    String,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Bit => "bit",
            DataType::Byte => "byte",
            DataType::Uint => "uint",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
        }
    }
}

/// `0x`-prefixed lowercase hex, the textual form of bytes in JSON and XML.
pub fn hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn parse_hex_string(value: &str) -> Option<Vec<u8>> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    hex::decode(digits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bits_is_rejected() {
        let err = UNSIGNED_SHORT.check_read(0).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidBitLength {
                bit_length: 0,
                max: 16,
                ..
            }
        ));
    }

    #[test]
    fn limits_are_inclusive() {
        assert!(SIGNED_BYTE.contains(8));
        assert!(!SIGNED_BYTE.contains(9));
        assert!(LONG.contains(64));
        assert!(UNSIGNED_BIG_INTEGER.contains(128));
        assert!(UNSIGNED_INT.check_write(33).is_err());
    }

    #[test]
    fn values_must_fit_the_declared_width() {
        UNSIGNED_BYTE.check_unsigned_write("n", 3, 7).unwrap();
        assert!(matches!(
            UNSIGNED_BYTE.check_unsigned_write("n", 3, 200),
            Err(SerializationError::ValueTooLarge { ref max, .. }) if max == "7"
        ));
        SIGNED_BYTE.check_signed_write("n", 4, -8).unwrap();
        assert!(SIGNED_BYTE.check_signed_write("n", 4, 8).is_err());
        BIG_INTEGER.check_signed_write("n", 128, i128::MIN).unwrap();
        UNSIGNED_BIG_INTEGER
            .check_unsigned_write("n", 128, u128::MAX)
            .unwrap();
        assert!(matches!(
            UNSIGNED_SHORT.check_unsigned_read("n", 12, 4096),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            SHORT.check_signed_read("n", 17, 0),
            Err(ParseError::InvalidBitLength { .. })
        ));
    }

    #[test]
    fn float_widths() {
        FLOAT.check_write(16).unwrap();
        FLOAT.check_read(32).unwrap();
        assert!(matches!(
            FLOAT.check_write(24),
            Err(SerializationError::UnsupportedWidth { bit_length: 24, .. })
        ));
        assert!(DOUBLE.check_read(32).is_err());
        DOUBLE.check_write(64).unwrap();
    }

    #[test]
    fn string_encodings_are_normalized() {
        assert_eq!(StringEncoding::parse("utf-8"), Some(StringEncoding::Utf8));
        assert_eq!(StringEncoding::parse("UTF-16LE"), Some(StringEncoding::Utf16Le));
        assert_eq!(StringEncoding::parse("ascii"), Some(StringEncoding::Ascii));
        assert_eq!(StringEncoding::parse("EBCDIC"), None);
    }

    #[test]
    fn string_fields_need_known_encoding_and_whole_units() {
        assert!(matches!(
            string_encoding_for_write("KOI8", 8),
            Err(SerializationError::UnsupportedEncoding { .. })
        ));
        assert!(matches!(
            string_encoding_for_read("UTF-16", 24),
            Err(ParseError::UnsupportedWidth { bit_length: 24, .. })
        ));
        assert_eq!(
            string_encoding_for_read("UTF-8", 24).unwrap(),
            StringEncoding::Utf8
        );
    }

    #[test]
    fn hex_strings() {
        assert_eq!(hex_string(&[0x0A, 0xFF]), "0x0aff");
        assert_eq!(parse_hex_string("0x0AFF"), Some(vec![0x0A, 0xFF]));
        assert_eq!(parse_hex_string("zz"), None);
    }
}
