//! Data-driven message layouts.
//!
//! A [`MessageSchema`] describes the field tree of one message;
//! [`parse_message`] and [`serialize_message`] drive any
//! [`crate::ReadBuffer`] or [`crate::WriteBuffer`] through it, so
//! the same layout decodes bytes, renders JSON/XML/boxes, and encodes a
//! decoded tree back into bytes.
//!
//! ```text
//! { "name": "frame", "fields": [
//!   { "type": "uint", "name": "id", "bits": 16 },
//!   { "type": "array", "name": "items", "count": 2,
//!     "element": { "type": "uint", "name": "item", "bits": 8 } }
//! ]}
//! ```

mod walk;

pub use walk::{parse_field, parse_message, serialize_field, serialize_message};

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::args::DEFAULT_STRING_ENCODING;
use crate::buffer::{LengthAware, Serializable, WriteBuffer};
use crate::error::SerializationError;

fn default_string_encoding() -> String {
    DEFAULT_STRING_ENCODING.to_string()
}

/// One field of a message layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSchema {
    Bit {
        name: String,
    },
    Uint {
        name: String,
        bits: u8,
        /// `ASCII` or `BCD` digits instead of plain binary.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encoding: Option<String>,
    },
    Int {
        name: String,
        bits: u8,
    },
    Float {
        name: String,
        bits: u8,
    },
    #[serde(rename = "string")]
    Text {
        name: String,
        bits: u32,
        #[serde(default = "default_string_encoding")]
        encoding: String,
    },
    Bytes {
        name: String,
        count: usize,
    },
    Group {
        name: String,
        fields: Vec<FieldSchema>,
    },
    Array {
        name: String,
        count: usize,
        element: Box<FieldSchema>,
    },
}

impl FieldSchema {
    pub fn name(&self) -> &str {
        match self {
            FieldSchema::Bit { name }
            | FieldSchema::Uint { name, .. }
            | FieldSchema::Int { name, .. }
            | FieldSchema::Float { name, .. }
            | FieldSchema::Text { name, .. }
            | FieldSchema::Bytes { name, .. }
            | FieldSchema::Group { name, .. }
            | FieldSchema::Array { name, .. } => name,
        }
    }
}

impl FieldSchema {
    /// Width in bits, `None` when it does not fit in a `usize`.
    pub fn checked_length_in_bits(&self) -> Option<usize> {
        match self {
            FieldSchema::Bit { .. } => Some(1),
            FieldSchema::Uint { bits, .. }
            | FieldSchema::Int { bits, .. }
            | FieldSchema::Float { bits, .. } => Some(usize::from(*bits)),
            FieldSchema::Text { bits, .. } => usize::try_from(*bits).ok(),
            FieldSchema::Bytes { count, .. } => count.checked_mul(8),
            FieldSchema::Group { fields, .. } => checked_total(fields),
            FieldSchema::Array { count, element, .. } => {
                count.checked_mul(element.checked_length_in_bits()?)
            }
        }
    }
}

fn checked_total(fields: &[FieldSchema]) -> Option<usize> {
    fields.iter().try_fold(0usize, |total, field| {
        total.checked_add(field.checked_length_in_bits()?)
    })
}

/// Saturates at `usize::MAX`; [`MessageSchema::from_json`] rejects such
/// layouts.
impl LengthAware for FieldSchema {
    fn length_in_bits(&self) -> usize {
        self.checked_length_in_bits().unwrap_or(usize::MAX)
    }
}

/// Top-level layout; the message itself is the outermost context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl MessageSchema {
    /// Parse a layout document. Layouts whose total width overflows a
    /// `usize` are rejected.
    pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
        let schema: Self = serde_json::from_str(document)?;
        if schema.checked_length_in_bits().is_none() {
            return Err(serde_json::Error::custom(format!(
                "layout '{}' is longer than {} bits",
                schema.name,
                usize::MAX
            )));
        }
        Ok(schema)
    }

    pub fn checked_length_in_bits(&self) -> Option<usize> {
        checked_total(&self.fields)
    }
}

impl LengthAware for MessageSchema {
    fn length_in_bits(&self) -> usize {
        self.checked_length_in_bits().unwrap_or(usize::MAX)
    }
}

/// A decoded value tree mirroring a [`FieldSchema`] tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bit(bool),
    UInt(u128),
    Int(i128),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Named children in layout order.
    Group(Vec<(String, FieldValue)>),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bit(_) => "bit",
            FieldValue::UInt(_) => "uint",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Group(_) => "group",
            FieldValue::List(_) => "array",
        }
    }

    /// Child of a group by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Group(children) => children
                .iter()
                .find(|(child, _)| child == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

/// A decoded message bound to its layout, ready to be written to any
/// backend.
#[derive(Debug, Clone, Copy)]
pub struct SchemaMessage<'a> {
    pub schema: &'a MessageSchema,
    pub value: &'a FieldValue,
}

impl<'a> SchemaMessage<'a> {
    pub fn new(schema: &'a MessageSchema, value: &'a FieldValue) -> Self {
        Self { schema, value }
    }
}

impl Serializable for SchemaMessage<'_> {
    fn serialize(&self, write_buffer: &mut dyn WriteBuffer) -> Result<(), SerializationError> {
        serialize_message(self.schema, self.value, write_buffer)
    }
}

impl LengthAware for SchemaMessage<'_> {
    fn length_in_bits(&self) -> usize {
        self.schema.length_in_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"{
        "name": "frame",
        "fields": [
            { "type": "bit", "name": "flag" },
            { "type": "uint", "name": "id", "bits": 15, "encoding": "BCD" },
            { "type": "string", "name": "label", "bits": 32 },
            { "type": "group", "name": "header", "fields": [
                { "type": "bytes", "name": "raw", "count": 3 }
            ]},
            { "type": "array", "name": "items", "count": 4,
              "element": { "type": "int", "name": "item", "bits": 4 } }
        ]
    }"#;

    #[test]
    fn parses_layout_documents() {
        let schema = MessageSchema::from_json(LAYOUT).unwrap();
        assert_eq!(schema.name, "frame");
        assert_eq!(schema.fields.len(), 5);
        assert_eq!(
            schema.fields[1],
            FieldSchema::Uint {
                name: "id".to_string(),
                bits: 15,
                encoding: Some("BCD".to_string()),
            }
        );
        match &schema.fields[2] {
            FieldSchema::Text { encoding, .. } => assert_eq!(encoding, "UTF-8"),
            other => panic!("unexpected field: {other:?}"),
        }
        assert_eq!(schema.fields[4].name(), "items");
    }

    #[test]
    fn lengths_add_up() {
        let schema = MessageSchema::from_json(LAYOUT).unwrap();
        assert_eq!(schema.length_in_bits(), 1 + 15 + 32 + 24 + 16);
        assert_eq!(schema.length_in_bytes(), 11);
    }

    #[test]
    fn unknown_field_types_are_rejected() {
        let err = MessageSchema::from_json(r#"{"name":"m","fields":[{"type":"blob","name":"x"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("blob"));
    }

    #[test]
    fn group_lookup() {
        let value = FieldValue::Group(vec![("a".to_string(), FieldValue::UInt(1))]);
        assert_eq!(value.get("a"), Some(&FieldValue::UInt(1)));
        assert_eq!(value.get("b"), None);
        assert_eq!(FieldValue::Bit(true).get("a"), None);
        assert_eq!(value.kind(), "group");
    }

    #[test]
    fn overflowing_layouts_are_rejected() {
        let huge_bytes = format!(
            r#"{{"name":"m","fields":[{{"type":"bytes","name":"raw","count":{}}}]}}"#,
            usize::MAX
        );
        let err = MessageSchema::from_json(&huge_bytes).unwrap_err();
        assert!(err.to_string().contains("longer than"));

        let huge_array = format!(
            r#"{{"name":"m","fields":[{{"type":"array","name":"a","count":{},
                "element":{{"type":"uint","name":"x","bits":16}}}}]}}"#,
            usize::MAX / 8
        );
        assert!(MessageSchema::from_json(&huge_array).is_err());

        let field = FieldSchema::Array {
            name: "a".to_string(),
            count: usize::MAX,
            element: Box::new(FieldSchema::Bit {
                name: "b".to_string(),
            }),
        };
        assert_eq!(field.checked_length_in_bits(), Some(usize::MAX));
        let wider = FieldSchema::Group {
            name: "g".to_string(),
            fields: vec![field.clone(), field],
        };
        assert_eq!(wider.checked_length_in_bits(), None);
        assert_eq!(wider.length_in_bits(), usize::MAX);
    }
}
