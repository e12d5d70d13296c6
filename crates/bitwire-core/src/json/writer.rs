use serde_json::{Map, Number, Value};

use super::layout::{self, attribute_key};
use crate::args::{self, ReaderWriterArg};
use crate::buffer::{
    ByteOrder, ByteOrderAware, ContextEntry, ContextStack, PositionAware, WriteBuffer,
};
use crate::error::SerializationError;
use crate::layout::{DataType, hex_string};

/// Renders a message as a JSON tree of named contexts.
///
/// Plain contexts become objects, list contexts become arrays in which every
/// scalar or child context is wrapped in its own single-key object.
///
/// # Examples
/// ```
/// use bitwire_core::{WriteBuffer, WriteBufferJsonBased};
///
/// let mut wb = WriteBufferJsonBased::new();
/// wb.push_context("frame", &[])?;
/// wb.write_unsigned_short("id", 16, 7, &[])?;
/// wb.pop_context("frame", &[])?;
/// let json = wb.json_string()?;
/// assert!(json.contains("\"id__plc4x_bitLength\": 16"));
/// # Ok::<(), bitwire_core::SerializationError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct WriteBufferJsonBased {
    stack: ContextStack<Value>,
    root: Map<String, Value>,
    pos: usize,
    byte_order: ByteOrder,
}

impl WriteBufferJsonBased {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished tree. Fails while contexts are still open.
    pub fn value(&self) -> Result<Value, SerializationError> {
        if !self.stack.is_empty() {
            return Err(SerializationError::UnclosedContexts {
                count: self.stack.len(),
                names: self.stack.path(),
            });
        }
        Ok(Value::Object(self.root.clone()))
    }

    /// Pretty-printed JSON document.
    pub fn json_string(&self) -> Result<String, SerializationError> {
        let value = self.value()?;
        let rendered = serde_json::to_string_pretty(&value)?;
        tracing::debug!(bytes = rendered.len(), bits = self.pos, "rendered JSON document");
        Ok(rendered)
    }

    fn write_leaf(
        &mut self,
        logical_name: &str,
        data_type: DataType,
        bit_length: usize,
        value: Value,
        encoding: Option<&str>,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let name = args::sanitize_logical_name(logical_name);
        let mut entries = vec![
            (name.to_string(), value),
            (
                attribute_key(name, layout::DATA_TYPE),
                Value::from(data_type.as_str()),
            ),
            (
                attribute_key(name, layout::BIT_LENGTH),
                Value::from(bit_length as u64),
            ),
        ];
        if let Some(representation) = args::extract_additional_string_representation(args) {
            entries.push((
                attribute_key(name, layout::STRING_REPRESENTATION),
                Value::from(representation),
            ));
        }
        if let Some(encoding) = encoding {
            entries.push((attribute_key(name, layout::ENCODING), Value::from(encoding)));
        }

        let frame = self
            .stack
            .peek_mut()
            .ok_or_else(|| SerializationError::NoOpenContext {
                name: name.to_string(),
            })?;
        match &mut frame.entry {
            ContextEntry::Queue(queue) => {
                queue.push_back(Value::Object(entries.into_iter().collect()));
            }
            ContextEntry::Node(Value::Object(map)) => map.extend(entries),
            ContextEntry::Node(_) => {
                return Err(SerializationError::InvalidValue {
                    name: frame.name.clone(),
                    message: "context is not an object".to_string(),
                });
            }
        }
        self.pos += bit_length;
        Ok(())
    }
}

fn float_value(value: f64) -> Value {
    match Number::from_f64(value) {
        Some(number) => Value::Number(number),
        None if value.is_nan() => Value::from(layout::NAN),
        None if value.is_sign_positive() => Value::from(layout::INFINITY),
        None => Value::from(layout::NEG_INFINITY),
    }
}

impl PositionAware for WriteBufferJsonBased {
    fn pos(&self) -> usize {
        self.pos
    }
}

impl ByteOrderAware for WriteBufferJsonBased {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }
}

impl WriteBuffer for WriteBufferJsonBased {
    fn push_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let name = args::sanitize_logical_name(logical_name);
        let entry = if args::is_render_as_list(args) {
            ContextEntry::Queue(Default::default())
        } else {
            ContextEntry::Node(Value::Object(Map::new()))
        };
        self.stack.push(name, entry);
        Ok(())
    }

    fn write_bit(
        &mut self,
        logical_name: &str,
        value: bool,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        self.write_leaf(logical_name, DataType::Bit, 1, Value::from(value), None, args)
    }

    fn write_byte(
        &mut self,
        logical_name: &str,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let rendered = Value::from(hex_string(&[value]));
        self.write_leaf(logical_name, DataType::Byte, 8, rendered, None, args)
    }

    fn write_byte_array(
        &mut self,
        logical_name: &str,
        value: &[u8],
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let rendered = Value::from(hex_string(value));
        self.write_leaf(logical_name, DataType::Byte, value.len() * 8, rendered, None, args)
    }

    fn write_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::UNSIGNED_BYTE.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Uint, usize::from(bit_length), value, None, args)
    }

    fn write_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::UNSIGNED_SHORT.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Uint, usize::from(bit_length), value, None, args)
    }

    fn write_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::UNSIGNED_INT.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Uint, usize::from(bit_length), value, None, args)
    }

    fn write_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::UNSIGNED_LONG.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Uint, usize::from(bit_length), value, None, args)
    }

    fn write_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::UNSIGNED_BIG_INTEGER.check_unsigned_write(logical_name, bit_length, value)?;
        let value = u64::try_from(value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value.to_string()));
        self.write_leaf(logical_name, DataType::Uint, usize::from(bit_length), value, None, args)
    }

    fn write_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::SIGNED_BYTE.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Int, usize::from(bit_length), value, None, args)
    }

    fn write_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::SHORT.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Int, usize::from(bit_length), value, None, args)
    }

    fn write_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::INT.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Int, usize::from(bit_length), value, None, args)
    }

    fn write_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::LONG.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let value = Value::from(value);
        self.write_leaf(logical_name, DataType::Int, usize::from(bit_length), value, None, args)
    }

    fn write_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::BIG_INTEGER.check_signed_write(logical_name, bit_length, value)?;
        let value = i64::try_from(value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value.to_string()));
        self.write_leaf(logical_name, DataType::Int, usize::from(bit_length), value, None, args)
    }

    fn write_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::check_float_write(logical_name, bit_length, value)?;
        let value = float_value(f64::from(value));
        self.write_leaf(logical_name, DataType::Float, usize::from(bit_length), value, None, args)
    }

    fn write_double(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::DOUBLE.check_write(bit_length)?;
        let value = float_value(value);
        self.write_leaf(logical_name, DataType::Float, usize::from(bit_length), value, None, args)
    }

    fn write_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        value: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        crate::layout::string_encoding_for_write(encoding, bit_length)?;
        self.write_leaf(
            logical_name,
            DataType::String,
            bit_length as usize,
            Value::from(value),
            Some(encoding),
            args,
        )
    }

    fn pop_context(
        &mut self,
        logical_name: &str,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let name = args::sanitize_logical_name(logical_name);
        let frame = self.stack.pop_named(name)?;
        let node = match frame.entry {
            ContextEntry::Node(node) => node,
            ContextEntry::Queue(items) => Value::Array(items.into_iter().collect()),
        };
        let Some(parent) = self.stack.peek_mut() else {
            self.root.insert(frame.name, node);
            return Ok(());
        };
        match &mut parent.entry {
            ContextEntry::Queue(queue) => {
                let mut wrapper = Map::new();
                wrapper.insert(frame.name, node);
                queue.push_back(Value::Object(wrapper));
            }
            ContextEntry::Node(Value::Object(map)) => {
                map.insert(frame.name, node);
            }
            ContextEntry::Node(_) => {
                return Err(SerializationError::InvalidValue {
                    name: parent.name.clone(),
                    message: "context is not an object".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scalars_carry_attributes() {
        let mut wb = WriteBufferJsonBased::new();
        wb.push_context("frame", &[]).unwrap();
        wb.write_bit("flag", true, &[]).unwrap();
        wb.write_byte("kind", 0x1F, &[ReaderWriterArg::additional("TAG")])
            .unwrap();
        wb.write_string("label", 24, "UTF-8", "abc", &[]).unwrap();
        wb.pop_context("frame", &[]).unwrap();

        assert_eq!(
            wb.value().unwrap(),
            json!({
                "frame": {
                    "flag": true,
                    "flag__plc4x_dataType": "bit",
                    "flag__plc4x_bitLength": 1,
                    "kind": "0x1f",
                    "kind__plc4x_dataType": "byte",
                    "kind__plc4x_bitLength": 8,
                    "kind__plc4x_stringRepresentation": "TAG",
                    "label": "abc",
                    "label__plc4x_dataType": "string",
                    "label__plc4x_bitLength": 24,
                    "label__plc4x_encoding": "UTF-8"
                }
            })
        );
        assert_eq!(wb.pos(), 1 + 8 + 24);
    }

    #[test]
    fn list_contexts_wrap_each_element() {
        let mut wb = WriteBufferJsonBased::new();
        wb.push_context("frame", &[]).unwrap();
        wb.push_context("items", &[ReaderWriterArg::RenderAsList(true)])
            .unwrap();
        wb.write_unsigned_byte("item", 8, 1, &[]).unwrap();
        wb.push_context("pair", &[]).unwrap();
        wb.write_signed_byte("", 4, -2, &[]).unwrap();
        wb.pop_context("pair", &[]).unwrap();
        wb.pop_context("items", &[]).unwrap();
        wb.pop_context("frame", &[]).unwrap();

        assert_eq!(
            wb.value().unwrap(),
            json!({
                "frame": {
                    "items": [
                        {
                            "item": 1,
                            "item__plc4x_dataType": "uint",
                            "item__plc4x_bitLength": 8
                        },
                        {
                            "pair": {
                                "value": -2,
                                "value__plc4x_dataType": "int",
                                "value__plc4x_bitLength": 4
                            }
                        }
                    ]
                }
            })
        );
    }

    #[test]
    fn context_balance_is_enforced() {
        let mut wb = WriteBufferJsonBased::new();
        assert!(matches!(
            wb.write_bit("orphan", true, &[]),
            Err(SerializationError::NoOpenContext { .. })
        ));
        wb.push_context("outer", &[]).unwrap();
        wb.push_context("inner", &[]).unwrap();
        assert!(matches!(
            wb.pop_context("outer", &[]),
            Err(SerializationError::ContextMismatch { .. })
        ));
        assert!(matches!(
            wb.json_string(),
            Err(SerializationError::UnclosedContexts { count: 2, .. })
        ));
    }

    #[test]
    fn wide_and_special_numbers() {
        let mut wb = WriteBufferJsonBased::new();
        wb.push_context("n", &[]).unwrap();
        wb.write_unsigned_big_integer("big", 128, u128::MAX, &[]).unwrap();
        wb.write_big_integer("small", 64, -5, &[]).unwrap();
        wb.write_double("nan", 64, f64::NAN, &[]).unwrap();
        wb.write_float("inf", 32, f32::NEG_INFINITY, &[]).unwrap();
        wb.pop_context("n", &[]).unwrap();
        let value = wb.value().unwrap();
        assert_eq!(value["n"]["big"], json!(u128::MAX.to_string()));
        assert_eq!(value["n"]["small"], json!(-5));
        assert_eq!(value["n"]["nan"], json!("NaN"));
        assert_eq!(value["n"]["inf"], json!("-Infinity"));
    }

    #[test]
    fn fields_that_cannot_be_encoded_are_rejected() {
        let mut wb = WriteBufferJsonBased::new();
        wb.push_context("frame", &[]).unwrap();
        assert!(matches!(
            wb.write_unsigned_byte("small", 3, 200, &[]),
            Err(SerializationError::ValueTooLarge { .. })
        ));
        assert!(matches!(
            wb.write_short("delta", 4, -9, &[]),
            Err(SerializationError::ValueTooLarge { .. })
        ));
        assert!(matches!(
            wb.write_float("ratio", 24, 1.5, &[]),
            Err(SerializationError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            wb.write_double("ratio", 32, 1.5, &[]),
            Err(SerializationError::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            wb.write_string("label", 8, "KOI8", "a", &[]),
            Err(SerializationError::UnsupportedEncoding { .. })
        ));
        wb.pop_context("frame", &[]).unwrap();
        assert_eq!(wb.value().unwrap(), serde_json::json!({ "frame": {} }));
    }
}
