use serde::{Deserialize, Serialize};

use super::ascii::{AsciiBox, AsciiBoxWriter, BOX_LINE_OVERHEAD};
use super::hex;
use crate::bytes::half;
use crate::args::{self, ReaderWriterArg};
use crate::buffer::{
    ByteOrder, ByteOrderAware, ContextEntry, ContextStack, PositionAware, WriteBuffer,
};
use crate::error::SerializationError;
use crate::layout;

/// Rendering switches of [`WriteBufferBoxBased`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxOptions {
    /// Target width of the outermost box in columns.
    pub desired_width: usize,
    /// Render a context with exactly one child as a single `parent/child` box.
    pub merge_single_boxes: bool,
    /// Drop boxes without content.
    pub omit_empty_boxes: bool,
    /// Put `pos/length` (bytes, `.bits` remainder) in the bottom border of
    /// every leaf box.
    pub print_pos_length_footer: bool,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            desired_width: 120,
            merge_single_boxes: false,
            omit_empty_boxes: false,
            print_pos_length_footer: false,
        }
    }
}

/// Where an open context starts, in rendered boxes and in bits.
#[derive(Debug, Clone, Copy)]
struct Marker {
    first_child: usize,
    start_pos: usize,
}

/// Write-only backend that renders a message as nested ASCII boxes.
///
/// # Examples
/// ```
/// use bitwire_core::{BoxOptions, WriteBuffer, WriteBufferBoxBased};
///
/// let mut wb = WriteBufferBoxBased::new(BoxOptions::default());
/// wb.push_context("frame", &[])?;
/// wb.write_unsigned_byte("id", 8, 0x2a, &[])?;
/// wb.pop_context("frame", &[])?;
/// let rendered = wb.get_box().map(ToString::to_string).unwrap_or_default();
/// assert!(rendered.contains("0x2a 42"));
/// # Ok::<(), bitwire_core::SerializationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WriteBufferBoxBased {
    boxes: Vec<AsciiBox>,
    open: ContextStack<Marker>,
    options: BoxOptions,
    current_width: usize,
    writer: AsciiBoxWriter,
    pos: usize,
    byte_order: ByteOrder,
}

impl Default for WriteBufferBoxBased {
    fn default() -> Self {
        Self::new(BoxOptions::default())
    }
}

impl WriteBufferBoxBased {
    pub fn new(options: BoxOptions) -> Self {
        Self {
            boxes: Vec::new(),
            open: ContextStack::new(),
            options,
            current_width: options.desired_width.saturating_sub(BOX_LINE_OVERHEAD),
            writer: AsciiBoxWriter,
            pos: 0,
            byte_order: ByteOrder::default(),
        }
    }

    pub fn options(&self) -> &BoxOptions {
        &self.options
    }

    /// The most recently completed top-level box, `None` when nothing was
    /// rendered.
    pub fn get_box(&self) -> Option<&AsciiBox> {
        if !self.open.is_empty() {
            return None;
        }
        self.boxes.last()
    }

    fn footer(&self, start_pos: usize, bit_length: usize) -> String {
        if !self.options.print_pos_length_footer {
            return String::new();
        }
        format!("{}/{}", bits_label(start_pos), bits_label(bit_length))
    }

    fn write_leaf(
        &mut self,
        logical_name: &str,
        bit_length: usize,
        text: String,
        args: &[ReaderWriterArg],
    ) {
        let data = match args::extract_additional_string_representation(args) {
            Some(representation) => format!("{text} {representation}"),
            None => text,
        };
        let footer = self.footer(self.pos, bit_length);
        let rendered = self
            .writer
            .box_string_with_footer(logical_name, &data, 0, &footer);
        self.boxes.push(rendered);
        self.pos = self.pos.saturating_add(bit_length);
    }

    /// `raw` is shown as its low `bit_length` bits, so negative values
    /// print as their on-wire two's complement.
    fn write_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        raw: u128,
        decimal: impl std::fmt::Display,
        args: &[ReaderWriterArg],
    ) {
        let raw = match bit_length {
            128.. => raw,
            bits => raw & ((1u128 << bits) - 1),
        };
        let digits = usize::from(bit_length).div_ceil(4).max(1);
        let text = format!("0x{raw:0digits$x} {decimal}");
        self.write_leaf(logical_name, usize::from(bit_length), text, args);
    }
}

/// `13` bits render as `1.5`: whole bytes, then the remaining bits.
fn bits_label(bits: usize) -> String {
    match bits % 8 {
        0 => (bits / 8).to_string(),
        remainder => format!("{}.{remainder}", bits / 8),
    }
}

impl PositionAware for WriteBufferBoxBased {
    fn pos(&self) -> usize {
        self.pos
    }
}

impl ByteOrderAware for WriteBufferBoxBased {
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }
}

impl WriteBuffer for WriteBufferBoxBased {
    fn push_context(
        &mut self,
        logical_name: &str,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        self.current_width = self.current_width.saturating_sub(BOX_LINE_OVERHEAD);
        self.open.push(
            logical_name,
            ContextEntry::Node(Marker {
                first_child: self.boxes.len(),
                start_pos: self.pos,
            }),
        );
        Ok(())
    }

    fn write_bit(
        &mut self,
        logical_name: &str,
        value: bool,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let text = format!("b{} {value}", u8::from(value));
        self.write_leaf(logical_name, 1, text, args);
        Ok(())
    }

    fn write_byte(
        &mut self,
        logical_name: &str,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let shown = if value.is_ascii_graphic() || value == b' ' {
            char::from(value)
        } else {
            '.'
        };
        self.write_leaf(logical_name, 8, format!("0x{value:02x} '{shown}'"), args);
        Ok(())
    }

    fn write_byte_array(
        &mut self,
        logical_name: &str,
        value: &[u8],
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        self.write_leaf(logical_name, value.len() * 8, hex::dump(value), args);
        Ok(())
    }

    fn write_unsigned_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_BYTE.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        self.write_integer(logical_name, bit_length, u128::from(value), value, args);
        Ok(())
    }

    fn write_unsigned_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_SHORT.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        self.write_integer(logical_name, bit_length, u128::from(value), value, args);
        Ok(())
    }

    fn write_unsigned_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_INT.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        self.write_integer(logical_name, bit_length, u128::from(value), value, args);
        Ok(())
    }

    fn write_unsigned_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_LONG.check_unsigned_write(logical_name, bit_length, u128::from(value))?;
        self.write_integer(logical_name, bit_length, u128::from(value), value, args);
        Ok(())
    }

    fn write_unsigned_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: u128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::UNSIGNED_BIG_INTEGER.check_unsigned_write(logical_name, bit_length, value)?;
        self.write_integer(logical_name, bit_length, value, value, args);
        Ok(())
    }

    fn write_signed_byte(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i8,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::SIGNED_BYTE.check_signed_write(logical_name, bit_length, i128::from(value))?;
        self.write_integer(logical_name, bit_length, i128::from(value) as u128, value, args);
        Ok(())
    }

    fn write_short(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i16,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::SHORT.check_signed_write(logical_name, bit_length, i128::from(value))?;
        self.write_integer(logical_name, bit_length, i128::from(value) as u128, value, args);
        Ok(())
    }

    fn write_int(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::INT.check_signed_write(logical_name, bit_length, i128::from(value))?;
        self.write_integer(logical_name, bit_length, i128::from(value) as u128, value, args);
        Ok(())
    }

    fn write_long(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::LONG.check_signed_write(logical_name, bit_length, i128::from(value))?;
        self.write_integer(logical_name, bit_length, i128::from(value) as u128, value, args);
        Ok(())
    }

    fn write_big_integer(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: i128,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::BIG_INTEGER.check_signed_write(logical_name, bit_length, value)?;
        self.write_integer(logical_name, bit_length, value as u128, value, args);
        Ok(())
    }

    fn write_float(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f32,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::check_float_write(logical_name, bit_length, value)?;
        let raw: u128 = if u32::from(bit_length) == layout::HALF_FLOAT_BITS {
            half::encode_field(logical_name, value)?.into()
        } else {
            value.to_bits().into()
        };
        self.write_integer(logical_name, bit_length, raw, value, args);
        Ok(())
    }

    fn write_double(
        &mut self,
        logical_name: &str,
        bit_length: u8,
        value: f64,
        args: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        layout::DOUBLE.check_write(bit_length)?;
        self.write_integer(logical_name, bit_length, value.to_bits().into(), value, args);
        Ok(())
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
        self.write_leaf(logical_name, bit_length as usize, value.to_string(), args);
        Ok(())
    }

    fn pop_context(
        &mut self,
        logical_name: &str,
        _: &[ReaderWriterArg],
    ) -> Result<(), SerializationError> {
        let frame = self.open.pop_named(logical_name)?;
        let ContextEntry::Node(marker) = frame.entry else {
            return Err(SerializationError::NoOpenContext {
                name: logical_name.to_string(),
            });
        };
        self.current_width += BOX_LINE_OVERHEAD;

        let mut children = self.boxes.split_off(marker.first_child);
        if self.options.omit_empty_boxes {
            children.retain(|child| !child.is_empty());
        }

        if self.options.merge_single_boxes && children.len() == 1 {
            if let Some(only_child) = children.pop() {
                let name = format!("{logical_name}/{}", only_child.name());
                let merged = self.writer.change_box_name(&only_child, &name);
                if !(self.options.omit_empty_boxes && merged.is_empty()) {
                    self.boxes.push(merged);
                }
            }
            return Ok(());
        }

        let aligned = self.writer.align_boxes(&children, self.current_width);
        let footer = self.footer(marker.start_pos, self.pos - marker.start_pos);
        let rendered = self
            .writer
            .box_box_with_footer(logical_name, &aligned, 0, &footer);
        if self.options.omit_empty_boxes && rendered.is_empty() {
            tracing::trace!(context = logical_name, "omitted empty box");
            return Ok(());
        }
        self.boxes.push(rendered);
        if self.open.is_empty() {
            tracing::debug!(bits = self.pos, "rendered box diagram");
        }
        Ok(())
    }
}
