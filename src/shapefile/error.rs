//! Custom error types for the shapefile-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum ShapefileError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The file is structurally invalid or does not conform to the shapefile
    /// or dBase III format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A record or shape index outside `[0, count)`.
    #[error("Index {index} out of bounds for {count} {item_type}")]
    OutOfBounds {
        item_type: &'static str,
        index: i64,
        count: u64,
    },

    /// A side-car file (.shp/.shx/.dbf) is unreachable or truncated.
    #[error("Resource unavailable: {0}")]
    Resource(String),

    /// The shape type is recognized but not decodable (MultiPatch, type 31).
    #[error("Unsupported shape type: {0} (MultiPatch decoding is not implemented)")]
    UnsupportedShapeType(i32),

    /// A record's decoded byte count does not match its declared content length.
    #[error("Size mismatch for {context}: expected {expected} bytes, but consumed {found} bytes")]
    SizeMismatch {
        context: &'static str,
        expected: u64,
        found: u64,
    },

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("A mutex lock was poisoned, indicating a panic in another thread holding the lock.")]
    LockPoisoned,
}

/// A convenience `Result` type alias using the crate's `ShapefileError` type.
pub type Result<T> = std::result::Result<T, ShapefileError>;
