//! Numeric digit encodings understood by the byte-based backend.

use crate::args::{self, ReaderWriterArg};

/// Textual encodings of unsigned integers, selected with an `Encoding` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumericEncoding {
    /// Zero-padded decimal digits, one byte per digit.
    Ascii,
    /// Packed decimal, one nibble per digit.
    Bcd,
}

impl NumericEncoding {
    /// The numeric encoding requested by `args`. Other identifiers leave the
    /// field binary.
    pub(crate) fn from_args(args: &[ReaderWriterArg]) -> Option<Self> {
        let encoding = args::extract_encoding(args)?;
        match args::normalize_encoding(encoding).as_str() {
            "ASCII" => Some(NumericEncoding::Ascii),
            "BCD" => Some(NumericEncoding::Bcd),
            _ => None,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            NumericEncoding::Ascii => "ASCII",
            NumericEncoding::Bcd => "BCD",
        }
    }

    pub(crate) fn digit_bits(self) -> u32 {
        match self {
            NumericEncoding::Ascii => 8,
            NumericEncoding::Bcd => 4,
        }
    }
}

/// Largest value representable with `digits` decimal digits, saturating.
pub(crate) fn max_for_digits(digits: u32) -> u64 {
    10u64
        .checked_pow(digits)
        .map(|limit| limit - 1)
        .unwrap_or(u64::MAX)
}
