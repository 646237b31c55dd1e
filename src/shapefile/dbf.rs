//! dBase III attribute table (.dbf) parsing and row access.
//!
//! Header layout (all little-endian):
//! ```text
//! [1 byte]   Version, must be 0x03
//! [3 bytes]  Last-update date (ignored)
//! [4 bytes]  Record count (i32)
//! [2 bytes]  Header length H (i16)
//! [2 bytes]  Record length R (i16, includes the deletion flag)
//! [20 bytes] Reserved
//! [32 bytes each] Column descriptors, (H - 33) / 32 of them
//! ```
//!
//! Each descriptor: 11-byte name (NUL-padded), 1 type byte, 4 reserved,
//! 1 unsigned length byte, 15 trailing bytes (decimal count + reserved).
//! Rows begin at byte H; each row is one deletion-flag byte followed by
//! R - 1 bytes of fixed-width column data in declared order.

use std::sync::Mutex;
use encoding_rs::{Encoding, WINDOWS_1252};
use log::{debug, info, warn};

use super::codec::{ByteOrder, EndianCodec};
use super::error::{Result, ShapefileError};
use super::models::ColumnDescriptor;
use super::source::ByteSource;

const DBF_VERSION: u8 = 0x03;
const DESCRIPTOR_BYTES: u64 = 32;
const NAME_BYTES: usize = 11;

/// Row cache state. `rows` is populated at most once while `enabled` holds;
/// disabling clears it, there is no partial invalidation.
#[derive(Debug, Default)]
struct TableCache {
    enabled: bool,
    rows: Option<Vec<Vec<String>>>,
}

/// Random-access reader over one `.dbf` attribute table.
///
/// The header and column descriptors are parsed once at open; row reads open
/// a fresh source handle per call. Whole-table caching is on by default.
#[derive(Debug)]
pub struct AttributeTableReader<S: ByteSource> {
    source: S,
    columns: Vec<ColumnDescriptor>,
    record_count: u32,
    header_len: u16,
    record_len: u16,
    encoding: &'static Encoding,
    cache: Mutex<TableCache>,
}

impl<S: ByteSource> AttributeTableReader<S> {
    /// Parses the table header from the source.
    ///
    /// Attribute bytes are decoded as Windows-1252, the de-facto DBF text
    /// encoding; use [`AttributeTableReader::with_encoding`] to override.
    pub fn open(source: S) -> Result<Self> {
        Self::with_encoding(source, WINDOWS_1252)
    }

    pub fn with_encoding(source: S, encoding: &'static Encoding) -> Result<Self> {
        info!("Opening attribute table: {}", source.describe());
        let mut codec = EndianCodec::new(source.open()?);
        codec.set_order(ByteOrder::Little);

        let version = codec.read_u8()?;
        if version != DBF_VERSION {
            return Err(ShapefileError::InvalidFormat(format!(
                "Unsupported DBF version byte: {:#04x} (expected {:#04x})",
                version, DBF_VERSION
            )));
        }
        codec.skip(3)?; // last-update date
        let record_count = codec.read_i32()?;
        if record_count < 0 {
            return Err(ShapefileError::InvalidFormat(format!(
                "Negative DBF record count: {}",
                record_count
            )));
        }
        let header_len = codec.read_i16()?;
        let record_len = codec.read_i16()?;
        if header_len < 33 || record_len < 1 {
            return Err(ShapefileError::InvalidFormat(format!(
                "Implausible DBF header/record lengths: H={}, R={}",
                header_len, record_len
            )));
        }
        let column_count = (header_len as u64 - 33) / DESCRIPTOR_BYTES;

        let mut columns = Vec::with_capacity(column_count as usize);
        codec.seek_to(32)?;
        for _ in 0..column_count {
            columns.push(read_descriptor(&mut codec)?);
        }

        let data_width: usize = columns.iter().map(|c| c.byte_length).sum();
        if data_width + 1 != record_len as usize {
            warn!(
                "DBF column widths sum to {} but record length is {}; trailing bytes ignored",
                data_width + 1,
                record_len
            );
        }
        debug!(
            "Attribute table: {} rows, {} columns, H={}, R={}",
            record_count, column_count, header_len, record_len
        );

        Ok(Self {
            source,
            columns,
            record_count: record_count as u32,
            header_len: header_len as u16,
            record_len: record_len as u16,
            encoding,
            cache: Mutex::new(TableCache { enabled: true, rows: None }),
        })
    }

    pub fn column_descriptors(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Trimmed column names in declared order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Reads row `i` as one string per column, each exactly the column's
    /// declared byte length.
    pub fn row(&self, i: u32) -> Result<Vec<String>> {
        if i >= self.record_count {
            return Err(ShapefileError::OutOfBounds {
                item_type: "attribute rows",
                index: i as i64,
                count: self.record_count as u64,
            });
        }
        {
            let cache = self.cache.lock().map_err(|_| ShapefileError::LockPoisoned)?;
            if let (true, Some(rows)) = (cache.enabled, cache.rows.as_ref()) {
                return Ok(rows[i as usize].clone());
            }
        }
        let mut codec = EndianCodec::new(self.source.open()?);
        // +1 steps over the deletion-flag byte of row i
        codec.seek_to(self.header_len as u64 + 1 + i as u64 * self.record_len as u64)?;
        self.read_row_fields(&mut codec)
    }

    /// Reads the whole table in declared row order, populating the cache on
    /// first use when caching is enabled.
    pub fn rows(&self) -> Result<Vec<Vec<String>>> {
        let mut cache = self.cache.lock().map_err(|_| ShapefileError::LockPoisoned)?;
        if let (true, Some(rows)) = (cache.enabled, cache.rows.as_ref()) {
            return Ok(rows.clone());
        }
        let rows = self.read_all_rows()?;
        if cache.enabled {
            cache.rows = Some(rows.clone());
        }
        Ok(rows)
    }

    /// Indices of every row whose `column_name` field equals `value` exactly.
    ///
    /// Comparison is against the fixed-width string as stored, padding
    /// included.
    pub fn rows_matching(&self, value: &str, column_name: &str) -> Result<Vec<u32>> {
        let col = self
            .columns
            .iter()
            .position(|c| c.name == column_name)
            .ok_or_else(|| {
                ShapefileError::InvalidFormat(format!("No such column: {}", column_name))
            })?;
        let matches = self
            .rows()?
            .iter()
            .enumerate()
            .filter(|(_, row)| row[col] == value)
            .map(|(i, _)| i as u32)
            .collect();
        Ok(matches)
    }

    /// Toggles whole-table caching. Disabling clears the cache and forces a
    /// re-read on every subsequent call.
    pub fn set_caching(&self, enabled: bool) -> Result<()> {
        let mut cache = self.cache.lock().map_err(|_| ShapefileError::LockPoisoned)?;
        cache.enabled = enabled;
        if !enabled {
            cache.rows = None;
        }
        Ok(())
    }

    fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        let mut codec = EndianCodec::new(self.source.open()?);
        codec.seek_to(self.header_len as u64)?;
        let data_width: u64 = self.columns.iter().map(|c| c.byte_length as u64).sum();
        let slack = (self.record_len as u64).saturating_sub(data_width + 1);
        let mut rows = Vec::with_capacity(self.record_count as usize);
        for _ in 0..self.record_count {
            codec.skip(1)?; // deletion flag
            rows.push(self.read_row_fields(&mut codec)?);
            codec.skip(slack)?;
        }
        Ok(rows)
    }

    fn read_row_fields<R: std::io::Read + std::io::Seek>(
        &self,
        codec: &mut EndianCodec<R>,
    ) -> Result<Vec<String>> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut buf = Vec::new();
        for column in &self.columns {
            buf.resize(column.byte_length, 0);
            codec.read_exact(&mut buf)?;
            let (text, _, _) = self.encoding.decode(&buf);
            fields.push(text.into_owned());
        }
        Ok(fields)
    }
}

/// Reads one 32-byte column descriptor.
fn read_descriptor<R: std::io::Read + std::io::Seek>(
    codec: &mut EndianCodec<R>,
) -> Result<ColumnDescriptor> {
    let mut name_bytes = [0u8; NAME_BYTES];
    codec.read_exact(&mut name_bytes)?;
    // NUL padding and stray control bytes are dropped from the name
    let name: String = name_bytes
        .iter()
        .filter(|&&b| b > 0x1F)
        .map(|&b| b as char)
        .collect();
    codec.skip(1 + 4)?; // type byte + reserved
    let byte_length = codec.read_u8()? as usize;
    codec.skip(15)?; // decimal count + reserved
    Ok(ColumnDescriptor { name, byte_length })
}
