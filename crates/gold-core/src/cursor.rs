//! Bounds-checked reader over a byte slice and Bitcoin varint helpers.

use crate::error::DecodeError;

/// A read position over borrowed bytes.
///
/// Every read either returns the requested value and advances, or returns
/// [`DecodeError::BufferTooSmall`] and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    /// Current offset from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the input.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Move the position forward by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.read_slice(n).map(|_| ())
    }

    /// Borrow the next `n` bytes.
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::BufferTooSmall {
                needed: n,
                available: self.remaining(),
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Copy the next `N` bytes into a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a Bitcoin varint (CompactSize).
    ///
    /// Encodings wider than necessary are rejected so that re-encoding a
    /// decoded value reproduces the input bytes.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let result = self.read_varint_inner();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn read_varint_inner(&mut self) -> Result<u64, DecodeError> {
        let (value, min) = match self.read_u8()? {
            0xfd => (u64::from(self.read_u16_le()?), 0xfd),
            0xfe => (u64::from(self.read_u32_le()?), 0x1_0000),
            0xff => (self.read_u64_le()?, 0x1_0000_0000),
            n => return Ok(u64::from(n)),
        };
        if value < min {
            return Err(DecodeError::NonCanonicalVarInt);
        }
        Ok(value)
    }

    /// Read a varint length prefix followed by that many bytes.
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::BufferTooSmall {
            needed: usize::MAX,
            available: self.remaining(),
        });
        match len.and_then(|len| self.read_slice(len)) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }
}

/// Number of bytes the varint encoding of `value` occupies.
pub fn varint_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Append the varint encoding of `value` to `output`.
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}
