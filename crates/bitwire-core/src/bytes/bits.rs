//! Raw MSB-first bit cursor and sink.
//!
//! Both move in bits and know nothing about types or byte order; at most 64
//! bits are moved per call.

use crate::error::{ParseError, SerializationError};

pub(crate) const MAX_CHUNK_BITS: u32 = 64;

/// Bit-granular reader over a borrowed byte slice.
///
/// # Examples
/// ```text
/// let mut cursor = BitCursor::new(&[0b1010_0000]);
/// assert_eq!(cursor.read_bits(3)?, 0b101);
/// assert_eq!(cursor.pos(), 3);
/// ```
#[derive(Debug, Clone)]
pub(crate) struct BitCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitCursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn limit(&self) -> usize {
        self.data.len() * 8
    }

    pub(crate) fn remaining(&self) -> usize {
        self.limit() - self.pos
    }

    pub(crate) fn total_bytes(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn seek(&mut self, pos: usize) -> Result<(), ParseError> {
        if pos > self.limit() {
            return Err(ParseError::ResetOutOfRange {
                pos,
                limit: self.limit(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn require(&self, num_bits: usize) -> Result<(), ParseError> {
        if self.remaining() < num_bits {
            return Err(ParseError::Exhausted {
                needed: num_bits,
                pos: self.pos,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Read `num_bits` (0..=64) as an unsigned big-endian value.
    pub(crate) fn read_bits(&mut self, num_bits: u32) -> Result<u64, ParseError> {
        debug_assert!(num_bits <= MAX_CHUNK_BITS);
        self.require(num_bits as usize)?;
        let mut value = 0u64;
        let mut remaining = num_bits;
        while remaining > 0 {
            let byte = self.data[self.pos / 8];
            let available = 8 - (self.pos % 8) as u32;
            let take = available.min(remaining);
            let mask = ((1u16 << take) - 1) as u8;
            let bits = (byte >> (available - take)) & mask;
            value = (value << take) | u64::from(bits);
            self.pos += take as usize;
            remaining -= take;
        }
        Ok(value)
    }
}

/// Bit-granular writer over a zero-filled buffer of fixed capacity.
#[derive(Debug, Clone)]
pub(crate) struct BitSink {
    data: Vec<u8>,
    pos: usize,
}

impl BitSink {
    pub(crate) fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            data: vec![0; capacity_bytes],
            pos: 0,
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn capacity_bits(&self) -> usize {
        self.data.len() * 8
    }

    pub(crate) fn require(&self, num_bits: usize) -> Result<(), SerializationError> {
        if self.pos.saturating_add(num_bits) > self.capacity_bits() {
            return Err(SerializationError::Overflow {
                requested: num_bits,
                pos: self.pos,
                capacity: self.capacity_bits(),
            });
        }
        Ok(())
    }

    /// Write the low `num_bits` (0..=64) of `value`, most significant first.
    pub(crate) fn write_bits(&mut self, num_bits: u32, value: u64) -> Result<(), SerializationError> {
        debug_assert!(num_bits <= MAX_CHUNK_BITS);
        self.require(num_bits as usize)?;
        let mut remaining = num_bits;
        while remaining > 0 {
            let available = 8 - (self.pos % 8) as u32;
            let take = available.min(remaining);
            let bits = ((value >> (remaining - take)) & ((1u64 << take) - 1)) as u8;
            let shift = available - take;
            let mask = (((1u16 << take) - 1) as u8) << shift;
            let slot = &mut self.data[self.pos / 8];
            *slot = (*slot & !mask) | (bits << shift);
            self.pos += take as usize;
            remaining -= take;
        }
        Ok(())
    }

    /// Bytes touched so far; a partially written last byte is included.
    pub(crate) fn written(&self) -> &[u8] {
        &self.data[..self.pos.div_ceil(8)]
    }

    pub(crate) fn into_written(mut self) -> Vec<u8> {
        self.data.truncate(self.pos.div_ceil(8));
        self.data
    }
}
