//! 16-bit "half" float as used by building-automation field devices:
//! 1 sign bit, 4 exponent bits and an 11-bit two's complement fraction,
//! scaled by `0.01`.
//!
//! ```text
//! bit 15     14..11      10..0
//!  sign     exponent    fraction
//! value = 0.01 * fraction * 2^exponent
//! ```
//!
//! Exponent 15 is reserved: a zero fraction is infinity (signed), anything
//! else is NaN. Exponent 0 is read as `0.01 * fraction`.

use crate::args;
use crate::error::SerializationError;

const EXPONENT_MASK: u16 = 0x0F;
const FRACTION_MASK: u16 = 0x07FF;
const SIGN_EXTENSION: u16 = 0xF800;
const SPECIAL_EXPONENT: u16 = 15;
const MAX_NORMAL_EXPONENT: u16 = 14;
const FRACTION_MIN: i32 = -2048;
const FRACTION_MAX: i32 = 2047;
const SCALE: f64 = 0.01;

pub(crate) fn decode(raw: u16) -> f32 {
    let negative = raw & 0x8000 != 0;
    let exponent = (raw >> 11) & EXPONENT_MASK;
    let raw_fraction = raw & FRACTION_MASK;
    let fraction = if negative {
        (raw_fraction | SIGN_EXTENSION) as i16
    } else {
        raw_fraction as i16
    };
    match exponent {
        SPECIAL_EXPONENT if raw_fraction == 0 && negative => f32::NEG_INFINITY,
        SPECIAL_EXPONENT if raw_fraction == 0 => f32::INFINITY,
        SPECIAL_EXPONENT => f32::NAN,
        0 if fraction == 0 => 0.0,
        _ => (SCALE * f64::from(fraction) * f64::from(1u32 << exponent)) as f32,
    }
}

/// Encode with the smallest exponent that keeps the fraction in range.
/// Returns `None` when the value is too large for exponent 14.
pub(crate) fn encode(value: f32) -> Option<u16> {
    if value.is_nan() {
        return Some((SPECIAL_EXPONENT << 11) | 1);
    }
    if value.is_infinite() {
        let sign = if value.is_sign_negative() { 0x8000 } else { 0 };
        return Some(sign | (SPECIAL_EXPONENT << 11));
    }
    let scaled = f64::from(value) / SCALE;
    for exponent in 0..=MAX_NORMAL_EXPONENT {
        let fraction = (scaled / f64::from(1u32 << exponent)).round();
        if fraction < f64::from(FRACTION_MIN) || fraction > f64::from(FRACTION_MAX) {
            continue;
        }
        let fraction = fraction as i32 as i16 as u16;
        let sign = fraction & 0x8000;
        return Some(sign | (exponent << 11) | (fraction & FRACTION_MASK));
    }
    None
}

/// [`encode`] for a named field; out-of-range values fail with the largest
/// encodable magnitude.
pub(crate) fn encode_field(logical_name: &str, value: f32) -> Result<u16, SerializationError> {
    encode(value).ok_or_else(|| SerializationError::ValueTooLarge {
        name: args::sanitize_logical_name(logical_name).to_string(),
        value: value.to_string(),
        max: "335380.48".to_string(),
    })
}
