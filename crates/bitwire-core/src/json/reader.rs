use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::layout::{self, attribute_key};
use crate::args::{self, ReaderWriterArg};
use crate::buffer::{
    ByteOrder, ByteOrderAware, ContextEntry, ContextStack, PositionAware, ReadBuffer,
};
use crate::error::ParseError;
use crate::layout::{self as limits, DataType, FloatWidths, WidthLimit, parse_hex_string};

/// Behavior switches of [`ReadBufferJsonBased`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonReadOptions {
    /// Compare `dataType`/`bitLength` attributes and list-ness against the
    /// requested read.
    pub validate_attributes: bool,
}

impl Default for JsonReadOptions {
    fn default() -> Self {
        Self {
            validate_attributes: true,
        }
    }
}

/// Walks a JSON document produced by [`crate::WriteBufferJsonBased`].
///
/// The whole document is parsed at construction; reads consume keys from
/// the current context and list elements from the front of the current
/// queue.
///
/// # Examples
/// ```
/// use bitwire_core::{ReadBuffer, ReadBufferJsonBased};
///
/// let doc = r#"{"frame": {"id": 7, "id__plc4x_dataType": "uint", "id__plc4x_bitLength": 16}}"#;
/// let mut rb = ReadBufferJsonBased::new(doc.as_bytes())?;
/// rb.pull_context("frame", &[])?;
/// assert_eq!(rb.read_unsigned_short("id", 16, &[])?, 7);
/// rb.close_context("frame", &[])?;
/// # Ok::<(), bitwire_core::ParseError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReadBufferJsonBased {
    root: Map<String, Value>,
    stack: ContextStack<Value>,
    options: JsonReadOptions,
    pos: usize,
    byte_order: ByteOrder,
}

impl ReadBufferJsonBased {
    pub fn new<R: Read>(reader: R) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let Value::Object(root) = value else {
            return Err(ParseError::InvalidState(
                "JSON document root must be an object".to_string(),
            ));
        };
        Ok(Self {
            root,
            stack: ContextStack::new(),
            options: JsonReadOptions::default(),
            pos: 0,
            byte_order: ByteOrder::default(),
        })
    }

    pub fn with_options(mut self, options: JsonReadOptions) -> Self {
        self.options = options;
        self
    }

    fn take_element(&mut self, name: &str) -> Result<Map<String, Value>, ParseError> {
        let not_found = || ParseError::ElementNotFound {
            name: name.to_string(),
        };
        let frame = self.stack.peek_mut().ok_or_else(not_found)?;
        match &mut frame.entry {
            ContextEntry::Queue(queue) => match queue.pop_front() {
                Some(Value::Object(element)) => Ok(element),
                Some(other) => Err(ParseError::InvalidValue {
                    name: name.to_string(),
                    message: format!("list element is not an object: {other}"),
                }),
                None => Err(not_found()),
            },
            ContextEntry::Node(Value::Object(map)) => {
                let keys = [
                    name.to_string(),
                    attribute_key(name, layout::DATA_TYPE),
                    attribute_key(name, layout::BIT_LENGTH),
                    attribute_key(name, layout::STRING_REPRESENTATION),
                    attribute_key(name, layout::ENCODING),
                ];
                let mut element = Map::new();
                for key in keys {
                    if let Some(value) = map.remove(&key) {
                        element.insert(key, value);
                    }
                }
                Ok(element)
            }
            ContextEntry::Node(_) => Err(ParseError::InvalidState(format!(
                "context '{}' is not an object",
                frame.name
            ))),
        }
    }

    fn validate(
        &self,
        name: &str,
        element: &Map<String, Value>,
        data_type: DataType,
        bit_length: usize,
    ) -> Result<(), ParseError> {
        let type_key = attribute_key(name, layout::DATA_TYPE);
        let actual_type = element.get(&type_key).and_then(Value::as_str);
        if actual_type != Some(data_type.as_str()) {
            return Err(ParseError::AttributeMismatch {
                key: type_key,
                expected: data_type.as_str().to_string(),
                actual: actual_type.unwrap_or_default().to_string(),
            });
        }
        let length_key = attribute_key(name, layout::BIT_LENGTH);
        let actual_length = element.get(&length_key).and_then(Value::as_u64);
        if actual_length != Some(bit_length as u64) {
            return Err(ParseError::AttributeMismatch {
                key: length_key,
                expected: bit_length.to_string(),
                actual: actual_length.map(|v| v.to_string()).unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn read_value(
        &mut self,
        logical_name: &str,
        data_type: DataType,
        bit_length: usize,
    ) -> Result<Value, ParseError> {
        let name = args::sanitize_logical_name(logical_name);
        let mut element = self.take_element(name)?;
        if self.options.validate_attributes {
            self.validate(name, &element, data_type, bit_length)?;
        }
        let value = element
            .remove(name)
            .ok_or_else(|| ParseError::ElementNotFound {
                name: name.to_string(),
            })?;
        self.pos = self.pos.saturating_add(bit_length);
        Ok(value)
    }

    fn read_unsigned(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
    ) -> Result<u128, ParseError> {
        limit.check_read(u32::from(bit_length))?;
        let value = self.read_value(logical_name, DataType::Uint, usize::from(bit_length))?;
        let parsed = match &value {
            Value::Number(number) => number.as_u64().map(u128::from),
            Value::String(text) => text.parse::<u128>().ok(),
            _ => None,
        };
        let parsed = parsed.ok_or_else(|| invalid(logical_name, "unsigned integer", &value))?;
        limit.check_unsigned_read(logical_name, bit_length, parsed)?;
        Ok(parsed)
    }

    fn read_signed(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
    ) -> Result<i128, ParseError> {
        limit.check_read(u32::from(bit_length))?;
        let value = self.read_value(logical_name, DataType::Int, usize::from(bit_length))?;
        let parsed = match &value {
            Value::Number(number) => number.as_i64().map(i128::from),
            Value::String(text) => text.parse::<i128>().ok(),
            _ => None,
        };
        let parsed = parsed.ok_or_else(|| invalid(logical_name, "signed integer", &value))?;
        limit.check_signed_read(logical_name, bit_length, parsed)?;
        Ok(parsed)
    }

    fn read_floating(
        &mut self,
        logical_name: &str,
        widths: FloatWidths,
        bit_length: u8,
    ) -> Result<f64, ParseError> {
        widths.check_read(bit_length)?;
        let value = self.read_value(logical_name, DataType::Float, usize::from(bit_length))?;
        let parsed = match &value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => match text.as_str() {
                layout::NAN => Some(f64::NAN),
                layout::INFINITY => Some(f64::INFINITY),
                layout::NEG_INFINITY => Some(f64::NEG_INFINITY),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| invalid(logical_name, "float", &value))
    }
}

fn invalid(logical_name: &str, expected: &str, value: &Value) -> ParseError {
    ParseError::InvalidValue {
        name: args::sanitize_logical_name(logical_name).to_string(),
        message: format!("expected {expected}, got {value}"),
    }
}

fn narrow<T: TryFrom<V>, V: Copy + std::fmt::Display>(
    logical_name: &str,
    value: V,
) -> Result<T, ParseError> {
    T::try_from(value).map_err(|_| ParseError::InvalidValue {
        name: args::sanitize_logical_name(logical_name).to_string(),
        message: format!("{value} is out of range"),
    })
}

impl PositionAware for ReadBufferJsonBased {
    fn pos(&self) -> usize {
        self.pos
    }
}

impl ByteOrderAware for ReadBufferJsonBased {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }
}

impl ReadBuffer for ReadBufferJsonBased {
    fn reset(&mut self, _: usize) -> Result<(), ParseError> {
        Err(ParseError::Unsupported("reset"))
    }

    /// Whether the current context still holds unread entries; the bit
    /// count is not meaningful for a tree.
    fn has_more(&self, _: usize) -> bool {
        match self.stack.peek() {
            None => !self.root.is_empty(),
            Some(frame) => match &frame.entry {
                ContextEntry::Queue(queue) => !queue.is_empty(),
                ContextEntry::Node(Value::Object(map)) => !map.is_empty(),
                ContextEntry::Node(_) => false,
            },
        }
    }

    fn pull_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), ParseError> {
        let name = args::sanitize_logical_name(logical_name);
        let found = match self.stack.peek_mut() {
            None => self.root.remove(name),
            Some(frame) => match &mut frame.entry {
                ContextEntry::Queue(queue) => match queue.pop_front() {
                    Some(Value::Object(mut element)) => element.remove(name),
                    _ => None,
                },
                ContextEntry::Node(Value::Object(map)) => map.remove(name),
                ContextEntry::Node(_) => None,
            },
        };
        let value = found.ok_or_else(|| ParseError::ContextNotFound {
            name: name.to_string(),
        })?;
        let entry = match value {
            Value::Array(items) => ContextEntry::Queue(items.into()),
            object @ Value::Object(_) => ContextEntry::Node(object),
            other => return Err(invalid(name, "object or array", &other)),
        };
        if self.options.validate_attributes && args::is_render_as_list(args) != entry.is_queue() {
            return Err(ParseError::AttributeMismatch {
                key: format!("{name} list rendering"),
                expected: args::is_render_as_list(args).to_string(),
                actual: entry.is_queue().to_string(),
            });
        }
        self.stack.push(name, entry);
        Ok(())
    }

    fn read_bit(&mut self, logical_name: &str, _: &[ReaderWriterArg]) -> Result<bool, ParseError> {
        let value = self.read_value(logical_name, DataType::Bit, 1)?;
        value
            .as_bool()
            .ok_or_else(|| invalid(logical_name, "boolean", &value))
    }

    fn read_byte(&mut self, logical_name: &str, _: &[ReaderWriterArg]) -> Result<u8, ParseError> {
        let value = self.read_value(logical_name, DataType::Byte, 8)?;
        match value.as_str().and_then(parse_hex_string).as_deref() {
            Some([byte]) => Ok(*byte),
            _ => Err(invalid(logical_name, "single hex byte", &value)),
        }
    }

    fn read_byte_array(
        &mut self,
        logical_name: &str,
        number_of_bytes: usize,
        _: &[ReaderWriterArg],
    ) -> Result<Vec<u8>, ParseError> {
        let value = self.read_value(logical_name, DataType::Byte, number_of_bytes.saturating_mul(8))?;
        value
            .as_str()
            .and_then(parse_hex_string)
            .filter(|bytes| bytes.len() == number_of_bytes)
            .ok_or_else(|| invalid(logical_name, "hex byte string", &value))
    }

    fn read_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u8, ParseError> {
        let value = self.read_unsigned(logical_name, limits::UNSIGNED_BYTE, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u16, ParseError> {
        let value = self.read_unsigned(logical_name, limits::UNSIGNED_SHORT, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u32, ParseError> {
        let value = self.read_unsigned(logical_name, limits::UNSIGNED_INT, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u64, ParseError> {
        let value = self.read_unsigned(logical_name, limits::UNSIGNED_LONG, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u128, ParseError> {
        self.read_unsigned(logical_name, limits::UNSIGNED_BIG_INTEGER, bit_length)
    }

    fn read_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i8, ParseError> {
        let value = self.read_signed(logical_name, limits::SIGNED_BYTE, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i16, ParseError> {
        let value = self.read_signed(logical_name, limits::SHORT, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i32, ParseError> {
        let value = self.read_signed(logical_name, limits::INT, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i64, ParseError> {
        let value = self.read_signed(logical_name, limits::LONG, bit_length)?;
        narrow(logical_name, value)
    }

    fn read_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i128, ParseError> {
        self.read_signed(logical_name, limits::BIG_INTEGER, bit_length)
    }

    fn read_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<f32, ParseError> {
        let value = self.read_floating(logical_name, limits::FLOAT, bit_length)? as f32;
        limits::check_float_read(logical_name, bit_length, value)?;
        Ok(value)
    }

    fn read_double(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<f64, ParseError> {
        self.read_floating(logical_name, limits::DOUBLE, bit_length)
    }

    fn read_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        _: &[ReaderWriterArg],
    ) -> Result<String, ParseError> {
        limits::string_encoding_for_read(encoding, bit_length)?;
        let value = self.read_value(logical_name, DataType::String, bit_length as usize)?;
        match value {
            Value::String(text) => Ok(text),
            other => Err(invalid(logical_name, "string", &other)),
        }
    }

    fn close_context(
        &mut self,
        logical_name: &str,
        _: &[ReaderWriterArg],
    ) -> Result<(), ParseError> {
        self.stack.pop_named(args::sanitize_logical_name(logical_name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn reader(value: Value) -> ReadBufferJsonBased {
        ReadBufferJsonBased::from_value(value).unwrap()
    }

    #[test]
    fn reads_keyed_scalars() {
        let mut rb = reader(json!({
            "frame": {
                "flag": true, "flag__plc4x_dataType": "bit", "flag__plc4x_bitLength": 1,
                "raw": "0x0102", "raw__plc4x_dataType": "byte", "raw__plc4x_bitLength": 16,
                "t": 21.5, "t__plc4x_dataType": "float", "t__plc4x_bitLength": 32
            }
        }));
        rb.pull_context("frame", &[]).unwrap();
        assert!(rb.has_more(0));
        assert!(rb.read_bit("flag", &[]).unwrap());
        assert_eq!(rb.read_byte_array("raw", 2, &[]).unwrap(), vec![1, 2]);
        assert_eq!(rb.read_float("t", 32, &[]).unwrap(), 21.5);
        assert!(!rb.has_more(0));
        rb.close_context("frame", &[]).unwrap();
        assert_eq!(rb.pos(), 1 + 16 + 32);
    }

    #[test]
    fn list_context_pops_front_elements() {
        let mut rb = reader(json!({
            "items": [
                {"item": 1, "item__plc4x_dataType": "uint", "item__plc4x_bitLength": 8},
                {"item": 2, "item__plc4x_dataType": "uint", "item__plc4x_bitLength": 8}
            ]
        }));
        let list = [ReaderWriterArg::RenderAsList(true)];
        rb.pull_context("items", &list).unwrap();
        assert_eq!(rb.read_unsigned_byte("item", 8, &[]).unwrap(), 1);
        assert_eq!(rb.read_unsigned_byte("item", 8, &[]).unwrap(), 2);
        assert!(matches!(
            rb.read_unsigned_byte("item", 8, &[]),
            Err(ParseError::ElementNotFound { .. })
        ));
        rb.close_context("items", &list).unwrap();
    }

    #[test]
    fn strict_mode_checks_attributes() {
        let doc = json!({
            "frame": {"n": 3, "n__plc4x_dataType": "int", "n__plc4x_bitLength": 8}
        });
        let mut rb = reader(doc.clone());
        rb.pull_context("frame", &[]).unwrap();
        let err = rb.read_unsigned_byte("n", 8, &[]).unwrap_err();
        assert!(matches!(err, ParseError::AttributeMismatch { ref key, .. } if key == "n__plc4x_dataType"));

        let mut rb = reader(doc).with_options(JsonReadOptions {
            validate_attributes: false,
        });
        rb.pull_context("frame", &[]).unwrap();
        assert_eq!(rb.read_unsigned_byte("n", 8, &[]).unwrap(), 3);
    }

    #[test]
    fn bit_length_mismatch_is_reported() {
        let mut rb = reader(json!({
            "frame": {"n": 3, "n__plc4x_dataType": "uint", "n__plc4x_bitLength": 8}
        }));
        rb.pull_context("frame", &[]).unwrap();
        assert!(matches!(
            rb.read_unsigned_short("n", 16, &[]),
            Err(ParseError::AttributeMismatch { .. })
        ));
    }

    #[test]
    fn context_names_must_match() {
        let mut rb = reader(json!({"outer": {"inner": {}}}));
        assert!(matches!(
            rb.pull_context("missing", &[]),
            Err(ParseError::ContextNotFound { .. })
        ));
        rb.pull_context("outer", &[]).unwrap();
        rb.pull_context("inner", &[]).unwrap();
        assert!(matches!(
            rb.close_context("outer", &[]),
            Err(ParseError::ContextMismatch { .. })
        ));
        rb.close_context("inner", &[]).unwrap();
        rb.close_context("outer", &[]).unwrap();
    }

    #[test]
    fn reset_is_unsupported() {
        let mut rb = reader(json!({}));
        assert!(matches!(rb.reset(0), Err(ParseError::Unsupported(_))));
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert!(ReadBufferJsonBased::new("[1, 2]".as_bytes()).is_err());
        assert!(ReadBufferJsonBased::new("{".as_bytes()).is_err());
    }

    #[test]
    fn out_of_range_values_fail() {
        let mut rb = reader(json!({
            "f": {"n": 300, "n__plc4x_dataType": "uint", "n__plc4x_bitLength": 8}
        }));
        rb.pull_context("f", &[]).unwrap();
        assert!(matches!(
            rb.read_unsigned_byte("n", 8, &[]),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn lenient_reads_still_check_widths_and_values() {
        let lenient = JsonReadOptions {
            validate_attributes: false,
        };
        let mut rb = reader(json!({
            "f": {"n": 200, "d": -9, "r": 1.5, "s": "a", "t": 1.0e9, "b": 1}
        }))
        .with_options(lenient);
        rb.pull_context("f", &[]).unwrap();
        assert!(matches!(
            rb.read_unsigned_byte("n", 3, &[]),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            rb.read_short("d", 4, &[]),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            rb.read_float("r", 24, &[]),
            Err(ParseError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            rb.read_string("s", 8, "KOI8", &[]),
            Err(ParseError::UnsupportedEncoding { .. })
        ));
        assert!(matches!(
            rb.read_float("t", 16, &[]),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            rb.read_unsigned_short("b", 17, &[]),
            Err(ParseError::InvalidBitLength { max: 16, .. })
        ));
    }
}
