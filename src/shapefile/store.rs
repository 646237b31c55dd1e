//! The shapefile store: opens the `.shp/.shx/.dbf` triad and joins decoded
//! geometries with their attribute rows.
//!
//! Every read opens and closes its own source handle; the store keeps no
//! open file descriptors between calls. The optional whole-file cache is
//! populated at most once under a mutex and never exposes a half-populated
//! state: a failure mid-decode abandons the in-flight result only.

use std::path::Path;
use std::sync::Mutex;
use log::{debug, info};

use super::codec::{ByteOrder, EndianCodec};
use super::dbf::AttributeTableReader;
use super::error::{Result, ShapefileError};
use super::geometry;
use super::models::{BoundingBox, GeoRecord, Geometry, ShapeType};
use super::source::{ByteSource, FileSource};
use super::transform::CoordinateTransform;

/// Byte length of the fixed `.shp`/`.shx` file header.
const FILE_HEADER_BYTES: u64 = 100;
/// Bytes per `.shx` index entry: big-endian offset word + content length word.
const INDEX_ENTRY_BYTES: u64 = 8;
/// Magic file code at offset 0 of the `.shp` header.
const SHAPEFILE_MAGIC: i32 = 9994;

const EXTENSIONS: [&str; 3] = ["shp", "shx", "dbf"];

#[derive(Debug, Default)]
struct StoreCache {
    enabled: bool,
    records: Option<Vec<GeoRecord>>,
}

/// Read access to one shapefile triad.
///
/// Generic over the byte-source kind (files in production, in-memory buffers
/// in tests) and the injected coordinate transform.
#[derive(Debug)]
pub struct ShapefileStore<S: ByteSource, T: CoordinateTransform> {
    shp: S,
    shx: S,
    table: AttributeTableReader<S>,
    transform: T,
    num_shapes: u32,
    file_shape_type: ShapeType,
    file_extent: BoundingBox,
    cache: Mutex<StoreCache>,
}

impl<T: CoordinateTransform> ShapefileStore<FileSource, T> {
    /// Opens the triad sharing `base`'s file stem. A recognized trailing
    /// extension (`.shp`, `.shx`, `.dbf`, any case) is stripped first, so
    /// any one of the three file names selects the whole triad.
    pub fn open(base: impl AsRef<Path>, transform: T) -> Result<Self> {
        let base = base.as_ref();
        let stem = match base.extension().and_then(|e| e.to_str()) {
            Some(ext) if EXTENSIONS.iter().any(|k| ext.eq_ignore_ascii_case(k)) => {
                base.with_extension("")
            }
            _ => base.to_path_buf(),
        };
        let sidecar = |ext: &str| {
            let mut name = stem.clone().into_os_string();
            name.push(".");
            name.push(ext);
            FileSource::new(std::path::PathBuf::from(name))
        };
        Self::from_sources(sidecar("shp"), sidecar("shx"), sidecar("dbf"), transform)
    }
}

impl<S: ByteSource, T: CoordinateTransform> ShapefileStore<S, T> {
    /// Opens a store over explicit sources for the three side-car files.
    ///
    /// The shape count is derived from the `.shx` length; an unreachable or
    /// truncated `.shx` fails construction entirely.
    pub fn from_sources(shp: S, shx: S, dbf: S, transform: T) -> Result<Self> {
        info!("Opening shapefile store: {}", shp.describe());

        let shx_len = shx.len()?;
        if shx_len < FILE_HEADER_BYTES {
            return Err(ShapefileError::Resource(format!(
                "Index file {} is truncated: {} bytes, header needs {}",
                shx.describe(),
                shx_len,
                FILE_HEADER_BYTES
            )));
        }
        let num_shapes = (shx_len - FILE_HEADER_BYTES) / INDEX_ENTRY_BYTES;

        let (file_shape_type, file_extent) = parse_shp_header(&shp)?;
        let table = AttributeTableReader::open(dbf)?;
        // every shape record joins with the attribute row of the same index,
        // so a count disagreement makes the triad unusable as a whole
        if table.record_count() as u64 != num_shapes {
            return Err(ShapefileError::InvalidFormat(format!(
                "Triad is inconsistent: {} shapes in the index but {} attribute rows",
                num_shapes,
                table.record_count()
            )));
        }
        info!(
            "Shapefile open: {} shapes of type {:?}, {} attribute columns",
            num_shapes,
            file_shape_type,
            table.column_descriptors().len()
        );

        Ok(Self {
            shp,
            shx,
            table,
            transform,
            num_shapes: num_shapes as u32,
            file_shape_type,
            file_extent,
            cache: Mutex::new(StoreCache { enabled: true, records: None }),
        })
    }

    /// Number of shape records, derived from the `.shx` length at open.
    pub fn num_shapes(&self) -> u32 {
        self.num_shapes
    }

    /// Declared shape type from the `.shp` file header.
    pub fn file_shape_type(&self) -> ShapeType {
        self.file_shape_type
    }

    /// Whole-file bounding box from the `.shp` file header, in file
    /// coordinates.
    pub fn extent(&self) -> BoundingBox {
        self.file_extent
    }

    /// The attribute table, for column metadata and direct row access.
    pub fn attribute_table(&self) -> &AttributeTableReader<S> {
        &self.table
    }

    /// Fetches one record by index, using the `.shx` entry for the byte
    /// offset of its `.shp` record.
    pub fn shape(&self, index: i64) -> Result<GeoRecord> {
        if index < 0 || index >= self.num_shapes as i64 {
            return Err(ShapefileError::OutOfBounds {
                item_type: "shapes",
                index,
                count: self.num_shapes as u64,
            });
        }
        let index = index as u32;
        {
            let cache = self.cache.lock().map_err(|_| ShapefileError::LockPoisoned)?;
            if let (true, Some(records)) = (cache.enabled, cache.records.as_ref()) {
                return Ok(records[index as usize].clone());
            }
        }

        let mut shx = EndianCodec::new(self.shx.open()?);
        shx.seek_to(FILE_HEADER_BYTES + INDEX_ENTRY_BYTES * index as u64)?;
        let word_offset = shx.read_i32()?;
        if word_offset < 0 {
            return Err(ShapefileError::InvalidFormat(format!(
                "Negative record offset {} in index entry {}",
                word_offset, index
            )));
        }

        let mut shp = EndianCodec::new(self.shp.open()?);
        shp.seek_to(word_offset as u64 * 2)?;
        let geometry = geometry::decode_record(&mut shp, &self.transform)?;
        let attributes = self.table.row(index)?;
        Ok(GeoRecord { geometry, attributes })
    }

    /// Decodes the whole file sequentially, zipped with the full attribute
    /// table. Materializes into the cache when caching is enabled.
    pub fn shapes(&self) -> Result<Vec<GeoRecord>> {
        let mut cache = self.cache.lock().map_err(|_| ShapefileError::LockPoisoned)?;
        if let (true, Some(records)) = (cache.enabled, cache.records.as_ref()) {
            return Ok(records.clone());
        }

        let rows = self.table.rows()?;
        let mut shp = EndianCodec::new(self.shp.open()?);
        shp.seek_to(FILE_HEADER_BYTES)?;
        // row count equals num_shapes, validated at open
        let mut records = Vec::with_capacity(self.num_shapes as usize);
        for attributes in rows {
            let geometry = geometry::decode_record(&mut shp, &self.transform)?;
            records.push(GeoRecord { geometry, attributes });
        }
        debug!("Decoded {} records sequentially", records.len());

        if cache.enabled {
            cache.records = Some(records.clone());
        }
        Ok(records)
    }

    /// Records whose geometry overlaps `extent` (paths and multipoints) or
    /// lies inside it (points). Null shapes never match.
    ///
    /// Uncached, this streams the `.shp` once and skips non-overlapping
    /// records via the stored per-record bounding box without decoding them.
    /// `extent` is interpreted in file coordinates.
    pub fn shapes_in_extent(&self, extent: &BoundingBox) -> Result<Vec<GeoRecord>> {
        {
            let cache = self.cache.lock().map_err(|_| ShapefileError::LockPoisoned)?;
            if let (true, Some(records)) = (cache.enabled, cache.records.as_ref()) {
                let hits: Vec<GeoRecord> = records
                    .iter()
                    .filter(|r| geometry_matches_extent(&r.geometry, extent))
                    .cloned()
                    .collect();
                debug!("Extent query over cache: {} of {} records", hits.len(), records.len());
                return Ok(hits);
            }
        }

        let mut shp = EndianCodec::new(self.shp.open()?);
        shp.seek_to(FILE_HEADER_BYTES)?;
        let mut hits = Vec::new();
        for i in 0..self.num_shapes {
            let decoded =
                geometry::decode_record_if_intersecting(&mut shp, extent, &self.transform)?;
            match decoded {
                Some(Geometry::Null) | None => {}
                Some(geometry) => {
                    let attributes = self.table.row(i)?;
                    hits.push(GeoRecord { geometry, attributes });
                }
            }
        }
        debug!("Extent query streamed: {} of {} records", hits.len(), self.num_shapes);
        Ok(hits)
    }

    /// Records whose `column_name` attribute equals `value` exactly.
    ///
    /// Resolves matching row indices first, then fetches each record by
    /// index; each fetch opens its own stream handles.
    pub fn shapes_matching(&self, value: &str, column_name: &str) -> Result<Vec<GeoRecord>> {
        let indices = self.table.rows_matching(value, column_name)?;
        indices.into_iter().map(|i| self.shape(i as i64)).collect()
    }

    /// Toggles record caching for this store and its attribute table.
    /// Disabling clears both caches; re-enabling starts empty.
    pub fn set_caching(&self, enabled: bool) -> Result<()> {
        let mut cache = self.cache.lock().map_err(|_| ShapefileError::LockPoisoned)?;
        cache.enabled = enabled;
        if !enabled {
            cache.records = None;
        }
        self.table.set_caching(enabled)
    }
}

/// Cached-scan extent predicate: containment for points, bounding-box
/// overlap for everything else.
fn geometry_matches_extent(geometry: &Geometry, extent: &BoundingBox) -> bool {
    match geometry {
        Geometry::Null => false,
        Geometry::Point { x, y } => extent.contains(*x, *y),
        other => other
            .bounding_box()
            .map(|b| b.intersects(extent))
            .unwrap_or(false),
    }
}

/// Validates the `.shp` file header and extracts its declared shape type and
/// whole-file bounding box.
fn parse_shp_header<S: ByteSource>(shp: &S) -> Result<(ShapeType, BoundingBox)> {
    let mut codec = EndianCodec::new(shp.open()?);
    let magic = codec.read_i32()?;
    if magic != SHAPEFILE_MAGIC {
        return Err(ShapefileError::InvalidFormat(format!(
            "Bad shapefile magic in {}: {} (expected {})",
            shp.describe(),
            magic,
            SHAPEFILE_MAGIC
        )));
    }
    codec.seek_to(32)?;
    codec.set_order(ByteOrder::Little);
    let shape_type = ShapeType::try_from(codec.read_i32()?)?;
    let x_min = codec.read_f64()?;
    let y_min = codec.read_f64()?;
    let x_max = codec.read_f64()?;
    let y_max = codec.read_f64()?;
    Ok((shape_type, BoundingBox::new(x_min, y_min, x_max, y_max)))
}
