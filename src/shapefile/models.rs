//! Core data structures for shapefile components.
//!
//! This module defines the fundamental types used throughout the library:
//! - Decoded geometry and joined geometry/attribute records
//! - Bounding boxes and query extents
//! - The shape-type code enumeration
//! - DBF column metadata

use super::error::{Result, ShapefileError};

/// A single decoded geometry.
///
/// One tagged union covers every decodable shape-type code: PolyLine and
/// Polygon (and their Z/M variants) both map to [`Geometry::Path`], since a
/// polygon ring is wire-identical to a closed polyline part. Z ordinates and
/// M measures are consumed from the stream but not retained.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Shape type 0. A placeholder record with no coordinate data.
    Null,
    /// Shape type 1 (and 11/21). A single coordinate pair.
    Point { x: f64, y: f64 },
    /// Shape type 8 (and 18/28). An unordered set of coordinate pairs.
    MultiPoint(Vec<ShapePoint>),
    /// Shape types 3/5 (and 13/15/23/25). Each subpath begins with a "move"
    /// point followed by one "line" point per remaining coordinate pair.
    Path(Vec<Vec<ShapePoint>>),
}

impl Geometry {
    /// Computes the axis-aligned bounding box over the stored coordinates.
    ///
    /// Returns `None` for [`Geometry::Null`] and for degenerate shapes with
    /// no points.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let grow = |acc: Option<BoundingBox>, p: &ShapePoint| {
            Some(match acc {
                Some(mut b) => {
                    b.expand(p.x, p.y);
                    b
                }
                None => BoundingBox::around(p.x, p.y),
            })
        };
        match self {
            Geometry::Null => None,
            Geometry::Point { x, y } => Some(BoundingBox::around(*x, *y)),
            Geometry::MultiPoint(points) => points.iter().fold(None, grow),
            Geometry::Path(subpaths) => subpaths.iter().flatten().fold(None, grow),
        }
    }
}

/// A single transformed coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapePoint {
    pub x: f64,
    pub y: f64,
}

/// A geometry joined with its attribute row, in declared column order.
///
/// Immutable once produced; owned by the caller or by the store's cache.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub geometry: Geometry,
    pub attributes: Vec<String>,
}

/// An axis-aligned rectangle used for extent-filtered queries and for the
/// per-record pre-check that skips non-overlapping records without decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    /// A degenerate box around a single coordinate.
    pub fn around(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Grows the box to include the given coordinate.
    pub fn expand(&mut self, x: f64, y: f64) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    /// True when the two rectangles share any area (edge contact counts).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x_min <= other.x_max
            && other.x_min <= self.x_max
            && self.y_min <= other.y_max
            && other.y_min <= self.y_max
    }

    /// True when the coordinate lies inside or on the boundary.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Shape-type codes from the `.shp` record header.
///
/// The wire value is a little-endian i32 at the start of each record's
/// content. MultiPatch (31) is recognized but rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
}

impl ShapeType {
    /// True for the Z/M variants that carry trailing ordinate/measure arrays.
    pub fn has_trailing_arrays(&self) -> bool {
        !matches!(
            self,
            ShapeType::Null
                | ShapeType::Point
                | ShapeType::PolyLine
                | ShapeType::Polygon
                | ShapeType::MultiPoint
        )
    }

    /// True for the single-coordinate types (no bounding box precedes the body).
    pub fn is_point(&self) -> bool {
        matches!(self, ShapeType::Point | ShapeType::PointZ | ShapeType::PointM)
    }
}

impl TryFrom<i32> for ShapeType {
    type Error = ShapefileError;
    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Null),
            1 => Ok(Self::Point),
            3 => Ok(Self::PolyLine),
            5 => Ok(Self::Polygon),
            8 => Ok(Self::MultiPoint),
            11 => Ok(Self::PointZ),
            13 => Ok(Self::PolyLineZ),
            15 => Ok(Self::PolygonZ),
            18 => Ok(Self::MultiPointZ),
            21 => Ok(Self::PointM),
            23 => Ok(Self::PolyLineM),
            25 => Ok(Self::PolygonM),
            28 => Ok(Self::MultiPointM),
            31 => Ok(Self::MultiPatch),
            other => Err(ShapefileError::InvalidFormat(format!(
                "Unknown shape type code: {}",
                other
            ))),
        }
    }
}

/// Metadata for one DBF column, fixed after the header parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Trimmed column name, at most 10 visible characters.
    pub name: String,
    /// Fixed byte width of this column in every row.
    pub byte_length: usize,
}
