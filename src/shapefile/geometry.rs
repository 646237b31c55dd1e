//! Per-record geometry decoding for the `.shp` file.
//!
//! Record layout:
//! ```text
//! [4 bytes] Record number   (big-endian i32, 1-based)
//! [4 bytes] Content length  (big-endian i32, in 16-bit words)
//! [4 bytes] Shape type code (little-endian i32)
//! [N bytes] Type-specific payload (little-endian throughout)
//! ```
//!
//! The content length counts from the shape-type code onward. Every decode
//! must consume exactly `content_length * 2` bytes before the next record
//! header; Z/M variants carry trailing ordinate/measure arrays that are not
//! retained and are skipped by exact byte count through [`trailing_skip`].

use std::io::{Read, Seek};
use log::trace;

use super::codec::{ByteOrder, EndianCodec};
use super::error::{Result, ShapefileError};
use super::models::{BoundingBox, Geometry, ShapePoint, ShapeType};
use super::transform::CoordinateTransform;

/// Bytes of a record's content consumed once the shape-type code is read.
const TYPE_CODE_BYTES: u64 = 4;
/// Bytes consumed once the 4-double bounding box has also been read.
const BBOX_BYTES: u64 = TYPE_CODE_BYTES + 4 * 8;

/// Decodes the record at the codec's current position.
///
/// On success the codec is positioned at the next record header.
pub fn decode_record<R, T>(codec: &mut EndianCodec<R>, transform: &T) -> Result<Geometry>
where
    R: Read + Seek,
    T: CoordinateTransform + ?Sized,
{
    decode_inner(codec, None, transform).map(|g| {
        g.unwrap_or(Geometry::Null) // unreachable: no filter means Some
    })
}

/// Decodes the record at the codec's current position unless its stored
/// bounding box misses `extent`, in which case the record body is skipped
/// without decoding and `None` is returned.
///
/// The pre-check compares the record's bounding box as stored in the file,
/// so `extent` is interpreted in file coordinates. Point records carry no
/// stored box and are decoded, then tested for containment.
pub fn decode_record_if_intersecting<R, T>(
    codec: &mut EndianCodec<R>,
    extent: &BoundingBox,
    transform: &T,
) -> Result<Option<Geometry>>
where
    R: Read + Seek,
    T: CoordinateTransform + ?Sized,
{
    decode_inner(codec, Some(extent), transform)
}

fn decode_inner<R, T>(
    codec: &mut EndianCodec<R>,
    extent: Option<&BoundingBox>,
    transform: &T,
) -> Result<Option<Geometry>>
where
    R: Read + Seek,
    T: CoordinateTransform + ?Sized,
{
    codec.set_order(ByteOrder::Big);
    let record_number = codec.read_i32()?;
    let content_words = codec.read_i32()?;
    if content_words < 0 {
        return Err(ShapefileError::InvalidFormat(format!(
            "Record {} declares negative content length {}",
            record_number, content_words
        )));
    }
    let content_start = codec.position()?;

    codec.set_order(ByteOrder::Little);
    let code = codec.read_i32()?;
    let shape_type = ShapeType::try_from(code)?;
    trace!(
        "Record {}: type {:?}, {} content words",
        record_number, shape_type, content_words
    );

    let geometry = match shape_type {
        ShapeType::Null => Some(Geometry::Null),
        ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => {
            let x = codec.read_f64()?;
            let y = codec.read_f64()?;
            let (tx, ty) = transform.transform(x, y);
            match extent {
                Some(query) if !query.contains(x, y) => None,
                _ => Some(Geometry::Point { x: tx, y: ty }),
            }
        }
        ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
            let stored_box = read_bounding_box(codec)?;
            if skip_if_disjoint(codec, extent, &stored_box, content_words, content_start)? {
                return Ok(None);
            }
            let num_points = read_count(codec, "numPoints")?;
            let mut points = Vec::with_capacity(num_points);
            for _ in 0..num_points {
                points.push(read_point(codec, transform)?);
            }
            Some(Geometry::MultiPoint(points))
        }
        ShapeType::PolyLine
        | ShapeType::Polygon
        | ShapeType::PolyLineZ
        | ShapeType::PolygonZ
        | ShapeType::PolyLineM
        | ShapeType::PolygonM => {
            let stored_box = read_bounding_box(codec)?;
            if skip_if_disjoint(codec, extent, &stored_box, content_words, content_start)? {
                return Ok(None);
            }
            Some(decode_path(codec, transform)?)
        }
        ShapeType::MultiPatch => {
            return Err(ShapefileError::UnsupportedShapeType(code));
        }
    };

    // Z ordinate and M measure arrays trail the body; consume them by exact
    // byte count so the codec lands on the next record header.
    let consumed = codec.position()? - content_start;
    if shape_type.has_trailing_arrays() {
        codec.skip(trailing_skip(content_words, consumed)?)?;
    }

    let consumed = codec.position()? - content_start;
    let declared = content_words as u64 * 2;
    if consumed != declared {
        return Err(ShapefileError::SizeMismatch {
            context: "shape record content",
            expected: declared,
            found: consumed,
        });
    }
    Ok(geometry)
}

/// The byte count separating the current decode position from the end of the
/// record's declared content.
///
/// This single subtraction is the alignment-critical step for Z/M variants:
/// an error here desynchronizes every subsequent record. A consumed count
/// past the declared length is a format violation, never a wraparound.
pub(crate) fn trailing_skip(content_words: i32, consumed: u64) -> Result<u64> {
    let declared = content_words as u64 * 2;
    declared
        .checked_sub(consumed)
        .ok_or(ShapefileError::SizeMismatch {
            context: "shape record trailing arrays",
            expected: declared,
            found: consumed,
        })
}

/// Reads the 4-double bounding box that precedes every multi-point body.
fn read_bounding_box<R: Read + Seek>(codec: &mut EndianCodec<R>) -> Result<BoundingBox> {
    let x_min = codec.read_f64()?;
    let y_min = codec.read_f64()?;
    let x_max = codec.read_f64()?;
    let y_max = codec.read_f64()?;
    Ok(BoundingBox::new(x_min, y_min, x_max, y_max))
}

/// When a query extent is present and misses the stored box, jumps to the end
/// of the record and reports `true`. The skip is the core performance lever
/// for filtered queries: rejected records cost one bounding-box read.
fn skip_if_disjoint<R: Read + Seek>(
    codec: &mut EndianCodec<R>,
    extent: Option<&BoundingBox>,
    stored_box: &BoundingBox,
    content_words: i32,
    content_start: u64,
) -> Result<bool> {
    match extent {
        Some(query) if !query.intersects(stored_box) => {
            let consumed = codec.position()? - content_start;
            debug_assert_eq!(consumed, BBOX_BYTES);
            codec.skip(trailing_skip(content_words, consumed)?)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Shared decode for every PolyLine/Polygon variant: part-start indices
/// partition the point array; each part's first pair is a subpath "move",
/// the rest are "line" segments.
fn decode_path<R, T>(codec: &mut EndianCodec<R>, transform: &T) -> Result<Geometry>
where
    R: Read + Seek,
    T: CoordinateTransform + ?Sized,
{
    let num_parts = read_count(codec, "numParts")?;
    let num_points = read_count(codec, "numPoints")?;

    let mut part_starts = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        let start = read_count(codec, "part start")?;
        if start > num_points {
            return Err(ShapefileError::InvalidFormat(format!(
                "Part start {} exceeds point count {}",
                start, num_points
            )));
        }
        part_starts.push(start);
    }

    let mut subpaths = Vec::with_capacity(num_parts);
    for (i, &begin) in part_starts.iter().enumerate() {
        let end = part_starts.get(i + 1).copied().unwrap_or(num_points);
        if end < begin {
            return Err(ShapefileError::InvalidFormat(format!(
                "Part {} runs backwards: [{}, {})",
                i, begin, end
            )));
        }
        let mut subpath = Vec::with_capacity(end - begin);
        for _ in begin..end {
            subpath.push(read_point(codec, transform)?);
        }
        // every subpath must have at least one point after its initial move
        if subpath.len() < 2 {
            return Err(ShapefileError::InvalidFormat(format!(
                "Part {} has no points after its initial move",
                i
            )));
        }
        subpaths.push(subpath);
    }
    Ok(Geometry::Path(subpaths))
}

fn read_point<R, T>(codec: &mut EndianCodec<R>, transform: &T) -> Result<ShapePoint>
where
    R: Read + Seek,
    T: CoordinateTransform + ?Sized,
{
    let x = codec.read_f64()?;
    let y = codec.read_f64()?;
    let (x, y) = transform.transform(x, y);
    Ok(ShapePoint { x, y })
}

fn read_count<R: Read + Seek>(codec: &mut EndianCodec<R>, field: &str) -> Result<usize> {
    let n = codec.read_i32()?;
    if n < 0 {
        return Err(ShapefileError::InvalidFormat(format!(
            "Negative {}: {}",
            field, n
        )));
    }
    Ok(n as usize)
}
