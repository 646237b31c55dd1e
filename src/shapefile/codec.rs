//! Byte-order-switchable primitive decoding.
//!
//! Shapefile records interleave big-endian fields (record headers, offsets)
//! with little-endian fields (shape-type codes, coordinates), and the DBF
//! header is little-endian throughout. [`EndianCodec`] wraps a seekable byte
//! source and decodes fixed-width primitives in whichever order is currently
//! selected; the order can be switched at any point and affects only
//! subsequent reads.

use std::io::{Read, Seek, SeekFrom};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use super::error::{Result, ShapefileError};

/// Byte order for multi-byte primitive reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// A primitive reader over any seekable byte source.
///
/// End-of-stream during a read is a hard failure, never a partial value:
/// every read either returns a complete primitive or an error.
#[derive(Debug)]
pub struct EndianCodec<R> {
    source: R,
    order: ByteOrder,
}

impl<R: Read + Seek> EndianCodec<R> {
    /// Wraps a source, defaulting to big-endian (the shapefile header order).
    pub fn new(source: R) -> Self {
        Self { source, order: ByteOrder::Big }
    }

    /// Selects the byte order for subsequent multi-byte reads.
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.source.read_u8()?)
    }

    /// Reads one byte as an ASCII character.
    pub fn read_char(&mut self) -> Result<char> {
        Ok(self.source.read_u8()? as char)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(match self.order {
            ByteOrder::Big => self.source.read_i16::<BigEndian>()?,
            ByteOrder::Little => self.source.read_i16::<LittleEndian>()?,
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(match self.order {
            ByteOrder::Big => self.source.read_i32::<BigEndian>()?,
            ByteOrder::Little => self.source.read_i32::<LittleEndian>()?,
        })
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(match self.order {
            ByteOrder::Big => self.source.read_i64::<BigEndian>()?,
            ByteOrder::Little => self.source.read_i64::<LittleEndian>()?,
        })
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(match self.order {
            ByteOrder::Big => self.source.read_f32::<BigEndian>()?,
            ByteOrder::Little => self.source.read_f32::<LittleEndian>()?,
        })
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(match self.order {
            ByteOrder::Big => self.source.read_f64::<BigEndian>()?,
            ByteOrder::Little => self.source.read_f64::<LittleEndian>()?,
        })
    }

    /// Fills `buf` completely or fails.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.source.read_exact(buf)?;
        Ok(())
    }

    /// Advances exactly `n` bytes, failing if fewer remain in the source.
    ///
    /// Seeking past end-of-file succeeds silently on most platforms, so the
    /// target offset is validated against the source length first.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let here = self.source.stream_position()?;
        let end = self.source.seek(SeekFrom::End(0))?;
        let target = here.checked_add(n).ok_or_else(|| {
            ShapefileError::InvalidFormat(format!("Skip of {} bytes overflows offset {}", n, here))
        })?;
        if target > end {
            return Err(ShapefileError::Resource(format!(
                "Cannot skip {} bytes at offset {}: only {} remain",
                n,
                here,
                end - here
            )));
        }
        self.source.seek(SeekFrom::Start(target))?;
        Ok(())
    }

    /// Absolute offset of the next read.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.source.stream_position()?)
    }

    /// Seeks to an absolute offset.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.source.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}
