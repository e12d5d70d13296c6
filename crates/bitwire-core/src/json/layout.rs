//! Attribute keys of the JSON rendering.
//!
//! A scalar `name` is stored next to sibling keys describing it:
//!
//! ```text
//! "crc": 4660,
//! "crc__plc4x_dataType": "uint",
//! "crc__plc4x_bitLength": 16
//! ```

pub const ATTRIBUTE_PREFIX: &str = "__plc4x_";
pub const DATA_TYPE: &str = "dataType";
pub const BIT_LENGTH: &str = "bitLength";
pub const STRING_REPRESENTATION: &str = "stringRepresentation";
pub const ENCODING: &str = "encoding";

pub const NAN: &str = "NaN";
pub const INFINITY: &str = "Infinity";
pub const NEG_INFINITY: &str = "-Infinity";

pub fn attribute_key(logical_name: &str, attribute: &str) -> String {
    format!("{logical_name}{ATTRIBUTE_PREFIX}{attribute}")
}
