use std::collections::VecDeque;
use std::io::Read;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use super::{BIT_LENGTH, DATA_TYPE, IS_LIST};
use crate::args::{self, ReaderWriterArg};
use crate::buffer::{
    ByteOrder, ByteOrderAware, ContextEntry, ContextStack, PositionAware, ReadBuffer,
};
use crate::error::ParseError;
use crate::layout::{self, DataType, WidthLimit, parse_hex_string};

/// Behavior switches of [`ReadBufferXmlBased`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlReadOptions {
    /// Compare `dataType`/`bitLength` attributes against the requested read.
    pub validate_attributes: bool,
    /// Require `isList="true"` on contexts pulled as lists.
    pub validate_list: bool,
}

impl Default for XmlReadOptions {
    fn default() -> Self {
        Self {
            validate_attributes: true,
            validate_list: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum XmlToken {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    End(String),
}

impl XmlToken {
    fn describe(&self) -> String {
        match self {
            XmlToken::Start { name, .. } => format!("<{name}>"),
            XmlToken::Text(text) => format!("text {text:?}"),
            XmlToken::End(name) => format!("</{name}>"),
        }
    }
}

/// Walks an XML document produced by [`crate::WriteBufferXmlBased`].
///
/// The document is tokenized at construction; every read then expects the
/// exact next start/text/end token. Whitespace around text is trimmed.
///
/// # Examples
/// ```
/// use bitwire_core::{ReadBuffer, ReadBufferXmlBased};
///
/// let doc = r#"<frame><id dataType="uint" bitLength="16">7</id></frame>"#;
/// let mut rb = ReadBufferXmlBased::new(doc.as_bytes())?;
/// rb.pull_context("frame", &[])?;
/// assert_eq!(rb.read_unsigned_short("id", 16, &[])?, 7);
/// rb.close_context("frame", &[])?;
/// # Ok::<(), bitwire_core::ParseError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReadBufferXmlBased {
    tokens: VecDeque<XmlToken>,
    stack: ContextStack<()>,
    options: XmlReadOptions,
    pos: usize,
    byte_order: ByteOrder,
}

impl ReadBufferXmlBased {
    pub fn new<R: Read>(mut reader: R) -> Result<Self, ParseError> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;
        Self::from_document(&document)
    }

    pub fn from_document(document: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(document)?;
        tracing::debug!(tokens = tokens.len(), "tokenized XML document");
        Ok(Self {
            tokens,
            stack: ContextStack::new(),
            options: XmlReadOptions::default(),
            pos: 0,
            byte_order: ByteOrder::default(),
        })
    }

    pub fn with_options(mut self, options: XmlReadOptions) -> Self {
        self.options = options;
        self
    }

    fn next_token(&mut self, expected: &str) -> Result<XmlToken, ParseError> {
        self.tokens
            .pop_front()
            .ok_or_else(|| ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: "end of document".to_string(),
            })
    }

    fn expect_start(&mut self, name: &str) -> Result<Vec<(String, String)>, ParseError> {
        let expected = format!("<{name}>");
        match self.next_token(&expected)? {
            XmlToken::Start {
                name: found,
                attributes,
            } if found == name => Ok(attributes),
            other => Err(ParseError::UnexpectedToken {
                expected,
                found: other.describe(),
            }),
        }
    }

    fn expect_end(&mut self, name: &str) -> Result<(), ParseError> {
        let expected = format!("</{name}>");
        match self.next_token(&expected)? {
            XmlToken::End(found) if found == name => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected,
                found: other.describe(),
            }),
        }
    }

    fn read_element(
        &mut self,
        logical_name: &str,
        data_type: DataType,
        bit_length: usize,
    ) -> Result<String, ParseError> {
        let name = args::sanitize_logical_name(logical_name);
        let attributes = self.expect_start(name)?;
        if self.options.validate_attributes {
            check_attribute(&attributes, DATA_TYPE, data_type.as_str())?;
            check_attribute(&attributes, BIT_LENGTH, &bit_length.to_string())?;
        }
        let text = match self.next_token(&format!("text of <{name}>"))? {
            XmlToken::Text(text) => {
                self.expect_end(name)?;
                text
            }
            XmlToken::End(found) if found == name => String::new(),
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: format!("text of <{name}>"),
                    found: other.describe(),
                });
            }
        };
        self.pos = self.pos.saturating_add(bit_length);
        Ok(text)
    }

    fn read_parsed<T: std::str::FromStr>(
        &mut self,
        logical_name: &str,
        data_type: DataType,
        bit_length: u8,
    ) -> Result<T, ParseError> {
        let text = self.read_element(logical_name, data_type, usize::from(bit_length))?;
        text.trim().parse::<T>().map_err(|_| ParseError::InvalidValue {
            name: args::sanitize_logical_name(logical_name).to_string(),
            message: format!("cannot parse {text:?} as {}", data_type.as_str()),
        })
    }

    fn read_unsigned<T: TryFrom<u128>>(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
    ) -> Result<T, ParseError> {
        limit.check_read(u32::from(bit_length))?;
        let value: u128 = self.read_parsed(logical_name, DataType::Uint, bit_length)?;
        limit.check_unsigned_read(logical_name, bit_length, value)?;
        T::try_from(value).map_err(|_| out_of_type(logical_name, value, limit))
    }

    fn read_signed<T: TryFrom<i128>>(
        &mut self,
        logical_name: &str,
        limit: WidthLimit,
        bit_length: u8,
    ) -> Result<T, ParseError> {
        limit.check_read(u32::from(bit_length))?;
        let value: i128 = self.read_parsed(logical_name, DataType::Int, bit_length)?;
        limit.check_signed_read(logical_name, bit_length, value)?;
        T::try_from(value).map_err(|_| out_of_type(logical_name, value, limit))
    }
}

fn out_of_type(logical_name: &str, value: impl std::fmt::Display, limit: WidthLimit) -> ParseError {
    ParseError::InvalidValue {
        name: args::sanitize_logical_name(logical_name).to_string(),
        message: format!("{value} is not a valid {}", limit.type_name),
    }
}

fn check_attribute(
    attributes: &[(String, String)],
    key: &str,
    expected: &str,
) -> Result<(), ParseError> {
    let actual = attributes
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str());
    if actual == Some(expected) {
        return Ok(());
    }
    Err(ParseError::AttributeMismatch {
        key: key.to_string(),
        expected: expected.to_string(),
        actual: actual.unwrap_or_default().to_string(),
    })
}

fn xml_error(err: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(err.to_string())
}

fn utf8(bytes: &[u8]) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(xml_error)
}

fn start_token(start: &BytesStart<'_>) -> Result<XmlToken, ParseError> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let key = utf8(attribute.key.as_ref())?;
        let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlToken::Start { name, attributes })
}

fn tokenize(document: &str) -> Result<VecDeque<XmlToken>, ParseError> {
    let mut reader = Reader::from_str(document);
    reader.trim_text(true);
    let mut tokens = VecDeque::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => tokens.push_back(start_token(&start)?),
            Event::Empty(start) => {
                let token = start_token(&start)?;
                let name = utf8(start.name().as_ref())?;
                tokens.push_back(token);
                tokens.push_back(XmlToken::End(name));
            }
            Event::End(end) => tokens.push_back(XmlToken::End(utf8(end.name().as_ref())?)),
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?.into_owned();
                tokens.push_back(XmlToken::Text(text));
            }
            Event::CData(data) => tokens.push_back(XmlToken::Text(utf8(&data.into_inner())?)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(tokens)
}

impl PositionAware for ReadBufferXmlBased {
    fn pos(&self) -> usize {
        self.pos
    }
}

impl ByteOrderAware for ReadBufferXmlBased {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }
}

impl ReadBuffer for ReadBufferXmlBased {
    fn reset(&mut self, _: usize) -> Result<(), ParseError> {
        Err(ParseError::Unsupported("reset"))
    }

    /// Whether any token is left; the bit count is not meaningful here.
    fn has_more(&self, _: usize) -> bool {
        !self.tokens.is_empty()
    }

    fn pull_context(
        &mut self,
        logical_name: &str,
        args: &[ReaderWriterArg],
    ) -> Result<(), ParseError> {
        let name = args::sanitize_logical_name(logical_name);
        let attributes = self.expect_start(name)?;
        if self.options.validate_list && args::is_render_as_list(args) {
            check_attribute(&attributes, IS_LIST, "true")?;
        }
        self.stack.push(name, ContextEntry::Node(()));
        Ok(())
    }

    fn read_bit(&mut self, logical_name: &str, _: &[ReaderWriterArg]) -> Result<bool, ParseError> {
        self.read_parsed(logical_name, DataType::Bit, 1)
    }

    fn read_byte(&mut self, logical_name: &str, _: &[ReaderWriterArg]) -> Result<u8, ParseError> {
        let text = self.read_element(logical_name, DataType::Byte, 8)?;
        match parse_hex_string(text.trim()).as_deref() {
            Some([byte]) => Ok(*byte),
            _ => Err(ParseError::InvalidValue {
                name: args::sanitize_logical_name(logical_name).to_string(),
                message: format!("expected a single hex byte, got {text:?}"),
            }),
        }
    }

    fn read_byte_array(
        &mut self,
        logical_name: &str,
        number_of_bytes: usize,
        _: &[ReaderWriterArg],
    ) -> Result<Vec<u8>, ParseError> {
        let text = self.read_element(logical_name, DataType::Byte, number_of_bytes.saturating_mul(8))?;
        parse_hex_string(text.trim())
            .filter(|bytes| bytes.len() == number_of_bytes)
            .ok_or_else(|| ParseError::InvalidValue {
                name: args::sanitize_logical_name(logical_name).to_string(),
                message: format!("expected {number_of_bytes} hex bytes, got {text:?}"),
            })
    }

    fn read_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u8, ParseError> {
        self.read_unsigned(logical_name, layout::UNSIGNED_BYTE, bit_length)
    }

    fn read_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u16, ParseError> {
        self.read_unsigned(logical_name, layout::UNSIGNED_SHORT, bit_length)
    }

    fn read_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u32, ParseError> {
        self.read_unsigned(logical_name, layout::UNSIGNED_INT, bit_length)
    }

    fn read_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u64, ParseError> {
        self.read_unsigned(logical_name, layout::UNSIGNED_LONG, bit_length)
    }

    fn read_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<u128, ParseError> {
        self.read_unsigned(logical_name, layout::UNSIGNED_BIG_INTEGER, bit_length)
    }

    fn read_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i8, ParseError> {
        self.read_signed(logical_name, layout::SIGNED_BYTE, bit_length)
    }

    fn read_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i16, ParseError> {
        self.read_signed(logical_name, layout::SHORT, bit_length)
    }

    fn read_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i32, ParseError> {
        self.read_signed(logical_name, layout::INT, bit_length)
    }

    fn read_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i64, ParseError> {
        self.read_signed(logical_name, layout::LONG, bit_length)
    }

    fn read_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<i128, ParseError> {
        self.read_signed(logical_name, layout::BIG_INTEGER, bit_length)
    }

    fn read_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<f32, ParseError> {
        layout::FLOAT.check_read(bit_length)?;
        let value: f64 = self.read_parsed(logical_name, DataType::Float, bit_length)?;
        let value = value as f32;
        layout::check_float_read(logical_name, bit_length, value)?;
        Ok(value)
    }

    fn read_double(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        _: &[ReaderWriterArg],
    ) -> Result<f64, ParseError> {
        layout::DOUBLE.check_read(bit_length)?;
        self.read_parsed(logical_name, DataType::Float, bit_length)
    }

    fn read_string(
        &mut self,
        logical_name: &str,
        bit_length: u32,
        encoding: &str,
        _: &[ReaderWriterArg],
    ) -> Result<String, ParseError> {
        layout::string_encoding_for_read(encoding, bit_length)?;
        self.read_element(logical_name, DataType::String, bit_length as usize)
    }

    fn close_context(
        &mut self,
        logical_name: &str,
        _: &[ReaderWriterArg],
    ) -> Result<(), ParseError> {
        let name = args::sanitize_logical_name(logical_name);
        self.stack.pop_named(name)?;
        self.expect_end(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<frame>
  <!-- sample -->
  <items isList="true">
    <item dataType="uint" bitLength="8">1</item>
    <item dataType="uint" bitLength="8">2</item>
  </items>
  <label dataType="string" bitLength="24" encoding="UTF-8">a&amp;b</label>
  <empty dataType="string" bitLength="0"/>
  <t dataType="float" bitLength="64">-Infinity</t>
</frame>"#;

    #[test]
    fn walks_a_document() {
        let mut rb = ReadBufferXmlBased::from_document(DOC).unwrap();
        let list = [ReaderWriterArg::RenderAsList(true)];
        rb.pull_context("frame", &[]).unwrap();
        rb.pull_context("items", &list).unwrap();
        assert_eq!(rb.read_unsigned_byte("item", 8, &[]).unwrap(), 1);
        assert_eq!(rb.read_unsigned_byte("item", 8, &[]).unwrap(), 2);
        rb.close_context("items", &list).unwrap();
        assert_eq!(rb.read_string("label", 24, "UTF-8", &[]).unwrap(), "a&b");
        assert_eq!(rb.read_string("empty", 0, "UTF-8", &[]).unwrap(), "");
        assert_eq!(rb.read_double("t", 64, &[]).unwrap(), f64::NEG_INFINITY);
        rb.close_context("frame", &[]).unwrap();
        assert!(!rb.has_more(0));
        assert_eq!(rb.pos(), 8 + 8 + 24 + 64);
    }

    #[test]
    fn wrong_element_name_fails() {
        let mut rb = ReadBufferXmlBased::from_document(DOC).unwrap();
        assert!(matches!(
            rb.pull_context("header", &[]),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn attribute_checks_can_be_relaxed() {
        let doc = r#"<f><n dataType="int" bitLength="4">3</n></f>"#;
        let mut rb = ReadBufferXmlBased::from_document(doc).unwrap();
        rb.pull_context("f", &[]).unwrap();
        assert!(matches!(
            rb.read_unsigned_byte("n", 4, &[]),
            Err(ParseError::AttributeMismatch { .. })
        ));

        let mut rb = ReadBufferXmlBased::from_document(doc)
            .unwrap()
            .with_options(XmlReadOptions {
                validate_attributes: false,
                validate_list: true,
            });
        rb.pull_context("f", &[]).unwrap();
        assert_eq!(rb.read_unsigned_byte("n", 4, &[]).unwrap(), 3);
    }

    #[test]
    fn list_attribute_is_validated() {
        let doc = "<items><item/></items>";
        let list = [ReaderWriterArg::RenderAsList(true)];
        let mut rb = ReadBufferXmlBased::from_document(doc).unwrap();
        assert!(rb.pull_context("items", &list).is_err());

        let mut rb = ReadBufferXmlBased::from_document(doc)
            .unwrap()
            .with_options(XmlReadOptions {
                validate_attributes: true,
                validate_list: false,
            });
        rb.pull_context("items", &list).unwrap();
    }

    #[test]
    fn closing_context_checks_name_and_token() {
        let mut rb = ReadBufferXmlBased::from_document("<a><b></b></a>").unwrap();
        rb.pull_context("a", &[]).unwrap();
        rb.pull_context("b", &[]).unwrap();
        assert!(matches!(
            rb.close_context("a", &[]),
            Err(ParseError::ContextMismatch { .. })
        ));
        rb.close_context("b", &[]).unwrap();
        rb.close_context("a", &[]).unwrap();
    }

    #[test]
    fn malformed_documents_fail_at_construction() {
        assert!(ReadBufferXmlBased::from_document("<a><b></a>").is_err());
    }

    #[test]
    fn relaxed_reads_still_check_widths_and_values() {
        let doc = r#"<f><n>200</n><d>-9</d><r>1.5</r><s>a</s><w>1</w></f>"#;
        let mut rb = ReadBufferXmlBased::from_document(doc)
            .unwrap()
            .with_options(XmlReadOptions {
                validate_attributes: false,
                validate_list: false,
            });
        rb.pull_context("f", &[]).unwrap();
        assert!(matches!(
            rb.read_unsigned_byte("n", 3, &[]),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            rb.read_signed_byte("d", 4, &[]),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            rb.read_float("r", 24, &[]),
            Err(ParseError::UnsupportedWidth { .. })
        ));
        rb.read_float("r", 32, &[]).unwrap();
        assert!(matches!(
            rb.read_string("s", 8, "KOI8", &[]),
            Err(ParseError::UnsupportedEncoding { .. })
        ));
        rb.read_string("s", 8, "ASCII", &[]).unwrap();
        assert!(matches!(
            rb.read_int("w", 33, &[]),
            Err(ParseError::InvalidBitLength { max: 32, .. })
        ));
    }
}
