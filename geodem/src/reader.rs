//! Bounds-checked little-endian reads over an immutable byte slice.
//!
//! All offsets are absolute positions in the underlying buffer. Every
//! accessor fails with [`FormatError::Truncated`] instead of panicking when
//! the requested range does not fit.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FormatError, Result};

/// Read-only view over a byte buffer with typed little-endian accessors.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => Ok(&self.data[offset..end]),
            None => Err(FormatError::Truncated {
                offset,
                len,
                size: self.data.len(),
            }
            .into()),
        }
    }

    /// Lowercase hex rendering of `len` bytes at `offset`.
    pub fn hex(&self, offset: usize, len: usize) -> Result<String> {
        Ok(self
            .bytes(offset, len)?
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect())
    }

    /// Text of `len` bytes at `offset`, stopping at the first NUL.
    pub fn text(&self, offset: usize, len: usize) -> Result<String> {
        let raw = self.bytes(offset, len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    pub fn u16(&self, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes(offset, 2)?))
    }

    pub fn u32(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.bytes(offset, 4)?))
    }

    pub fn f64(&self, offset: usize) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.bytes(offset, 8)?))
    }

    /// `count` consecutive u16 values starting at `offset`.
    pub fn u16_array(&self, offset: usize, count: usize) -> Result<Vec<u16>> {
        let raw = self.bytes(offset, byte_len(offset, count, 2, self.len())?)?;
        let mut out = vec![0u16; count];
        LittleEndian::read_u16_into(raw, &mut out);
        Ok(out)
    }

    /// `count` consecutive u32 values starting at `offset`.
    pub fn u32_array(&self, offset: usize, count: usize) -> Result<Vec<u32>> {
        let raw = self.bytes(offset, byte_len(offset, count, 4, self.len())?)?;
        let mut out = vec![0u32; count];
        LittleEndian::read_u32_into(raw, &mut out);
        Ok(out)
    }

    /// `count` consecutive f64 values starting at `offset`.
    pub fn f64_array(&self, offset: usize, count: usize) -> Result<Vec<f64>> {
        let raw = self.bytes(offset, byte_len(offset, count, 8, self.len())?)?;
        let mut out = vec![0f64; count];
        LittleEndian::read_f64_into(raw, &mut out);
        Ok(out)
    }
}

/// `count * width` without overflow; an overflowing length can never fit.
fn byte_len(offset: usize, count: usize, width: usize, size: usize) -> Result<usize> {
    count.checked_mul(width).ok_or_else(|| {
        FormatError::Truncated {
            offset,
            len: usize::MAX,
            size,
        }
        .into()
    })
}
