//! # shapefile-reader
//!
//! A read-only reader for ESRI Shapefile triads (`.shp` geometry, `.shx`
//! index, `.dbf` attribute table). Decodes geometry records with
//! endian-sensitive primitive reads, per-shape-type dispatch, offset-based
//! random access, spatial-extent filtering, and an optional whole-table
//! cache.
//!
//! **Note:** MultiPatch (shape type 31) records are recognized but not
//! decodable; writing shapefiles is out of scope.
pub mod shapefile;

// Re-export the main types for convenience
pub use shapefile::{
    AttributeTableReader,
    BoundingBox,
    ByteOrder,
    ByteSource,
    ColumnDescriptor,
    CoordinateTransform,
    EndianCodec,
    FileSource,
    GeoRecord,
    Geometry,
    IdentityTransform,
    MemorySource,
    Result,
    ShapePoint,
    ShapeType,
    ShapefileError,
    ShapefileStore,
};
