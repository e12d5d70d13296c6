use std::fmt::Display;

use super::{FieldSchema, FieldValue, MessageSchema};
use crate::args::ReaderWriterArg;
use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::error::{ParseError, SerializationError};
use crate::helpers;

const LIST: [ReaderWriterArg; 1] = [ReaderWriterArg::RenderAsList(true)];

/// Upper bound for reserving list storage up front; the declared count comes
/// from the layout, not from the input.
const PREALLOCATED_ITEMS: usize = 1024;

fn encoding_args(encoding: Option<&String>) -> Vec<ReaderWriterArg> {
    encoding
        .map(|encoding| vec![ReaderWriterArg::encoding(encoding.as_str())])
        .unwrap_or_default()
}

/// Decode one message: the message name is the outermost context.
pub fn parse_message(
    schema: &MessageSchema,
    read_buffer: &mut dyn ReadBuffer,
) -> Result<FieldValue, ParseError> {
    read_buffer.pull_context(&schema.name, &[])?;
    let value = parse_fields(&schema.fields, read_buffer)?;
    read_buffer.close_context(&schema.name, &[])?;
    tracing::debug!(message = %schema.name, bits = read_buffer.pos(), "parsed message");
    Ok(value)
}

fn parse_fields(
    fields: &[FieldSchema],
    read_buffer: &mut dyn ReadBuffer,
) -> Result<FieldValue, ParseError> {
    let mut children = Vec::with_capacity(fields.len());
    for field in fields {
        let value = parse_field(field, read_buffer)?;
        children.push((field.name().to_string(), value));
    }
    Ok(FieldValue::Group(children))
}

pub fn parse_field(
    field: &FieldSchema,
    read_buffer: &mut dyn ReadBuffer,
) -> Result<FieldValue, ParseError> {
    let value = match field {
        FieldSchema::Bit { name } => FieldValue::Bit(read_buffer.read_bit(name, &[])?),
        FieldSchema::Uint {
            name,
            bits,
            encoding,
        } => {
            let args = encoding_args(encoding.as_ref());
            let value = match bits {
                0..=8 => u128::from(read_buffer.read_unsigned_byte(name, *bits, &args)?),
                9..=16 => u128::from(read_buffer.read_unsigned_short(name, *bits, &args)?),
                17..=32 => u128::from(read_buffer.read_unsigned_int(name, *bits, &args)?),
                33..=64 => u128::from(read_buffer.read_unsigned_long(name, *bits, &args)?),
                _ => read_buffer.read_unsigned_big_integer(name, *bits, &args)?,
            };
            FieldValue::UInt(value)
        }
        FieldSchema::Int { name, bits } => {
            let value = match bits {
                0..=8 => i128::from(read_buffer.read_signed_byte(name, *bits, &[])?),
                9..=16 => i128::from(read_buffer.read_short(name, *bits, &[])?),
                17..=32 => i128::from(read_buffer.read_int(name, *bits, &[])?),
                33..=64 => i128::from(read_buffer.read_long(name, *bits, &[])?),
                _ => read_buffer.read_big_integer(name, *bits, &[])?,
            };
            FieldValue::Int(value)
        }
        FieldSchema::Float { name, bits: 64 } => {
            FieldValue::Float(read_buffer.read_double(name, 64, &[])?)
        }
        FieldSchema::Float { name, bits } => {
            FieldValue::Float(f64::from(read_buffer.read_float(name, *bits, &[])?))
        }
        FieldSchema::Text {
            name,
            bits,
            encoding,
        } => FieldValue::Text(read_buffer.read_string(name, *bits, encoding, &[])?),
        FieldSchema::Bytes { name, count } => {
            FieldValue::Bytes(read_buffer.read_byte_array(name, *count, &[])?)
        }
        FieldSchema::Group { name, fields } => {
            read_buffer.pull_context(name, &[])?;
            let value = parse_fields(fields, read_buffer)?;
            read_buffer.close_context(name, &[])?;
            value
        }
        FieldSchema::Array {
            name,
            count,
            element,
        } => {
            read_buffer.pull_context(name, &LIST)?;
            let mut items = Vec::with_capacity((*count).min(PREALLOCATED_ITEMS));
            for _ in 0..*count {
                items.push(parse_field(element, read_buffer)?);
            }
            read_buffer.close_context(name, &LIST)?;
            FieldValue::List(items)
        }
    };
    Ok(value)
}

/// Encode `value` following `schema`; the inverse of [`parse_message`].
pub fn serialize_message(
    schema: &MessageSchema,
    value: &FieldValue,
    write_buffer: &mut dyn WriteBuffer,
) -> Result<(), SerializationError> {
    write_buffer.push_context(&schema.name, &[])?;
    serialize_fields(&schema.name, &schema.fields, value, write_buffer)?;
    write_buffer.pop_context(&schema.name, &[])?;
    tracing::debug!(message = %schema.name, bits = write_buffer.pos(), "serialized message");
    Ok(())
}

fn serialize_fields(
    name: &str,
    fields: &[FieldSchema],
    value: &FieldValue,
    write_buffer: &mut dyn WriteBuffer,
) -> Result<(), SerializationError> {
    let FieldValue::Group(_) = value else {
        return Err(mismatch(name, "group", value));
    };
    for field in fields {
        let child = value
            .get(field.name())
            .ok_or_else(|| SerializationError::InvalidValue {
                name: field.name().to_string(),
                message: format!("missing from '{name}'"),
            })?;
        serialize_field(field, child, write_buffer)?;
    }
    Ok(())
}

fn mismatch(name: &str, expected: &str, actual: &FieldValue) -> SerializationError {
    SerializationError::InvalidValue {
        name: name.to_string(),
        message: format!("expected a {expected} value, got {}", actual.kind()),
    }
}

fn narrow<T, V>(name: &str, value: V) -> Result<T, SerializationError>
where
    T: TryFrom<V> + Bounded,
    V: Copy + Display,
{
    T::try_from(value).map_err(|_| SerializationError::ValueTooLarge {
        name: name.to_string(),
        value: value.to_string(),
        max: T::max_label(),
    })
}

/// Largest value of a scalar container, for error messages.
trait Bounded {
    fn max_label() -> String;
}

macro_rules! bounded {
    ($($ty:ty),*) => {
        $(impl Bounded for $ty {
            fn max_label() -> String {
                <$ty>::MAX.to_string()
            }
        })*
    };
}

bounded!(u8, u16, u32, u64, i8, i16, i32, i64);

pub fn serialize_field(
    field: &FieldSchema,
    value: &FieldValue,
    write_buffer: &mut dyn WriteBuffer,
) -> Result<(), SerializationError> {
    match (field, value) {
        (FieldSchema::Bit { name }, FieldValue::Bit(bit)) => write_buffer.write_bit(name, *bit, &[]),
        (
            FieldSchema::Uint {
                name,
                bits,
                encoding,
            },
            FieldValue::UInt(raw),
        ) => {
            let args = encoding_args(encoding.as_ref());
            let raw = *raw;
            match bits {
                0..=8 => write_buffer.write_unsigned_byte(name, *bits, narrow(name, raw)?, &args),
                9..=16 => write_buffer.write_unsigned_short(name, *bits, narrow(name, raw)?, &args),
                17..=32 => write_buffer.write_unsigned_int(name, *bits, narrow(name, raw)?, &args),
                33..=64 => write_buffer.write_unsigned_long(name, *bits, narrow(name, raw)?, &args),
                _ => write_buffer.write_unsigned_big_integer(name, *bits, raw, &args),
            }
        }
        (FieldSchema::Int { name, bits }, FieldValue::Int(raw)) => {
            let raw = *raw;
            match bits {
                0..=8 => write_buffer.write_signed_byte(name, *bits, narrow(name, raw)?, &[]),
                9..=16 => write_buffer.write_short(name, *bits, narrow(name, raw)?, &[]),
                17..=32 => write_buffer.write_int(name, *bits, narrow(name, raw)?, &[]),
                33..=64 => write_buffer.write_long(name, *bits, narrow(name, raw)?, &[]),
                _ => write_buffer.write_big_integer(name, *bits, raw, &[]),
            }
        }
        (FieldSchema::Float { name, bits: 64 }, FieldValue::Float(raw)) => {
            write_buffer.write_double(name, 64, *raw, &[])
        }
        (FieldSchema::Float { name, bits }, FieldValue::Float(raw)) => {
            write_buffer.write_float(name, *bits, *raw as f32, &[])
        }
        (
            FieldSchema::Text {
                name,
                bits,
                encoding,
            },
            FieldValue::Text(text),
        ) => write_buffer.write_string(name, *bits, encoding, text, &[]),
        (FieldSchema::Bytes { name, count }, FieldValue::Bytes(bytes)) => {
            if bytes.len() != *count {
                return Err(SerializationError::InvalidValue {
                    name: name.clone(),
                    message: format!("expected {count} bytes, got {}", bytes.len()),
                });
            }
            write_buffer.write_byte_array(name, bytes, &[])
        }
        (FieldSchema::Group { name, fields }, FieldValue::Group(_)) => {
            write_buffer.push_context(name, &[])?;
            serialize_fields(name, fields, value, write_buffer)?;
            write_buffer.pop_context(name, &[])
        }
        (
            FieldSchema::Array {
                name,
                count,
                element,
            },
            FieldValue::List(items),
        ) => {
            if helpers::count(items) != *count {
                return Err(SerializationError::InvalidValue {
                    name: name.clone(),
                    message: format!("expected {count} elements, got {}", items.len()),
                });
            }
            write_buffer.push_context(name, &LIST)?;
            for item in items {
                serialize_field(element, item, write_buffer)?;
            }
            write_buffer.pop_context(name, &LIST)
        }
        (field, value) => Err(mismatch(field.name(), field_kind(field), value)),
    }
}

fn field_kind(field: &FieldSchema) -> &'static str {
    match field {
        FieldSchema::Bit { .. } => "bit",
        FieldSchema::Uint { .. } => "uint",
        FieldSchema::Int { .. } => "int",
        FieldSchema::Float { .. } => "float",
        FieldSchema::Text { .. } => "string",
        FieldSchema::Bytes { .. } => "bytes",
        FieldSchema::Group { .. } => "group",
        FieldSchema::Array { .. } => "array",
    }
}
