use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::{BIT_LENGTH, DATA_TYPE, ENCODING, IS_LIST, STRING_REPRESENTATION, format_float};
use crate::args::{self, ReaderWriterArg};
use crate::buffer::{
    ByteOrder, ByteOrderAware, ContextEntry, ContextStack, PositionAware, WriteBuffer,
};
use crate::error::SerializationError;
use crate::layout::{self, DataType, hex_string};

/// Renders a message as indented XML, one element per context or scalar.
///
/// # Examples
/// ```
/// use bitwire_core::{WriteBuffer, WriteBufferXmlBased};
///
/// let mut wb = WriteBufferXmlBased::new();
/// wb.push_context("frame", &[])?;
/// wb.write_bit("flag", true, &[])?;
/// wb.pop_context("frame", &[])?;
/// assert_eq!(
///     wb.xml_string()?,
///     "<frame>\n  <flag dataType=\"bit\" bitLength=\"1\">true</flag>\n</frame>"
/// );
/// # Ok::<(), bitwire_core::SerializationError>(())
/// ```
pub struct WriteBufferXmlBased {
    writer: Writer<Vec<u8>>,
    stack: ContextStack<()>,
    pos: usize,
    byte_order: ByteOrder,
}

impl Default for WriteBufferXmlBased {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBufferXmlBased {
    pub fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
            stack: ContextStack::new(),
            pos: 0,
            byte_order: ByteOrder::default(),
        }
    }

    /// The rendered document. Fails while contexts are still open.
    pub fn xml_string(&self) -> Result<String, SerializationError> {
        if !self.stack.is_empty() {
            return Err(SerializationError::UnclosedContexts {
                count: self.stack.len(),
                names: self.stack.path(),
            });
        }
        let rendered = String::from_utf8(self.writer.get_ref().clone())
            .map_err(|err| SerializationError::Xml(err.to_string()))?;
        tracing::debug!(bytes = rendered.len(), bits = self.pos, "rendered XML document");
        Ok(rendered)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), SerializationError> {
        self.writer
            .write_event(event)
            .map_err(|err| SerializationError::Xml(err.to_string()))
    }

    fn write_leaf(
        &mut self,
        logical_name: &str,
        data_type: DataType,
        bit_length: usize,
        text: &str,
        encoding: Option<&str>,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let name = args::sanitize_logical_name(logical_name);
        let bit_length_text = bit_length.to_string();
        let mut start = BytesStart::new(name);
        start.push_attribute((DATA_TYPE, data_type.as_str()));
        start.push_attribute((BIT_LENGTH, bit_length_text.as_str()));
        if let Some(encoding) = encoding {
            start.push_attribute((ENCODING, encoding));
        }
        if let Some(representation) = args::extract_additional_string_representation(args) {
            start.push_attribute((STRING_REPRESENTATION, representation));
        }
        self.emit(Event::Start(start))?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.emit(Event::End(BytesEnd::new(name)))?;
        self.pos += bit_length;
        Ok(())
    }
}

impl PositionAware for WriteBufferXmlBased {
    fn pos(&self) -> usize {
        self.pos
    }
}

impl ByteOrderAware for WriteBufferXmlBased {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }
}

impl WriteBuffer for WriteBufferXmlBased {
    fn push_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let name = args::sanitize_logical_name(logical_name);
        let mut start = BytesStart::new(name);
        if args::is_render_as_list(args) {
            start.push_attribute((IS_LIST, "true"));
        }
        self.emit(Event::Start(start))?;
        self.stack.push(name, ContextEntry::Node(()));
        Ok(())
    }

    fn write_bit(
        &mut self,
        logical_name: &str,
        value: bool,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Bit, 1, &text, None, args)
    }

    fn write_byte(
        &mut self,
        logical_name: &str,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let text = hex_string(&[value]);
        self.write_leaf(logical_name, DataType::Byte, 8, &text, None, args)
    }

    fn write_byte_array(
        &mut self,
        logical_name: &str,
        value: &[u8],
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let text = hex_string(value);
        self.write_leaf(logical_name, DataType::Byte, value.len() * 8, &text, None, args)
    }

    fn write_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_BYTE.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Uint, bit_length.into(), &text, None, args)
    }

    fn write_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_SHORT.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Uint, bit_length.into(), &text, None, args)
    }

    fn write_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_INT.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Uint, bit_length.into(), &text, None, args)
    }

    fn write_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_LONG.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Uint, bit_length.into(), &text, None, args)
    }

    fn write_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_BIG_INTEGER.check_unsigned_write(logical_name, bit_length, value)?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Uint, bit_length.into(), &text, None, args)
    }

    fn write_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::SIGNED_BYTE.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Int, bit_length.into(), &text, None, args)
    }

    fn write_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::SHORT.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Int, bit_length.into(), &text, None, args)
    }

    fn write_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::INT.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Int, bit_length.into(), &text, None, args)
    }

    fn write_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::LONG.check_signed_write(logical_name, bit_length, i128::from(value))?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Int, bit_length.into(), &text, None, args)
    }

    fn write_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::BIG_INTEGER.check_signed_write(logical_name, bit_length, value)?;
        let text = value.to_string();
        self.write_leaf(logical_name, DataType::Int, bit_length.into(), &text, None, args)
    }

    fn write_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::check_float_write(logical_name, bit_length, value)?;
        let text = format_float(f64::from(value));
        self.write_leaf(logical_name, DataType::Float, bit_length.into(), &text, None, args)
    }

    fn write_double(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::DOUBLE.check_write(bit_length)?;
        let text = format_float(value);
        self.write_leaf(logical_name, DataType::Float, bit_length.into(), &text, None, args)
    }

    fn write_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        value: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::string_encoding_for_write(encoding, bit_length)?;
        self.write_leaf(
            logical_name,
            DataType::String,
            bit_length as usize,
            value,
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
        self.stack.pop_named(name)?;
        self.emit(Event::End(BytesEnd::new(name)))
    }
}
