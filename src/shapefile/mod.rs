//! Core shapefile reading module.

pub mod models;
pub mod error;
pub mod codec;
pub mod source;
pub mod transform;
mod geometry;
mod dbf;
mod store;

pub use codec::{ByteOrder, EndianCodec};
pub use dbf::AttributeTableReader;
pub use error::{Result, ShapefileError};
pub use geometry::{decode_record, decode_record_if_intersecting};
pub use models::{BoundingBox, ColumnDescriptor, GeoRecord, Geometry, ShapePoint, ShapeType};
pub use source::{ByteSource, FileSource, MemorySource};
pub use store::ShapefileStore;
pub use transform::{CoordinateTransform, IdentityTransform};
