//! Seekable byte sources for the three side-car files.
//!
//! Every store operation opens a fresh handle, performs bounded seeks and
//! reads, and drops the handle before returning, so handle lifetime is
//! bounded to the call. [`ByteSource`] abstracts that open step; the
//! file-backed implementation is used in production and [`MemorySource`]
//! backs the synthetic fixtures in tests.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use super::error::{Result, ShapefileError};

/// A factory for fresh seekable read handles over one underlying resource.
pub trait ByteSource {
    type Handle: Read + Seek;

    /// Opens a new handle positioned at offset 0.
    fn open(&self) -> Result<Self::Handle>;

    /// Total resource size in bytes.
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Human-readable name for error messages.
    fn describe(&self) -> String;
}

/// A byte source backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    type Handle = File;

    fn open(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| {
            ShapefileError::Resource(format!("Cannot open {}: {}", self.path.display(), e))
        })
    }

    fn len(&self) -> Result<u64> {
        let meta = std::fs::metadata(&self.path).map_err(|e| {
            ShapefileError::Resource(format!("Cannot stat {}: {}", self.path.display(), e))
        })?;
        Ok(meta.len())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An in-memory byte source. Each `open` yields an independent cursor over
/// the shared buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: std::sync::Arc<[u8]>,
    name: String,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into(), name: name.into() }
    }
}

impl ByteSource for MemorySource {
    type Handle = Cursor<std::sync::Arc<[u8]>>;

    fn open(&self) -> Result<Self::Handle> {
        Ok(Cursor::new(self.bytes.clone()))
    }

    fn len(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
