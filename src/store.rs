//! The geo-tile store: indexed, geo-referenced satellite imagery.
//!
//! `GeoTileStore` scans a directory of tile images, assigns each a stable
//! 0-based id in lexicographic filename order, and joins a companion CSV
//! metadata table (corner coordinates, keyed by filename stem). Iteration
//! always yields tiles in load order; the selector's tie-break depends on
//! that ordering being stable across runs.
//!
//! Lifecycle: `Unloaded` (paths and metadata only) → `Loaded` (pixels
//! decoded) → `Described` (features cached). Operations that need pixels or
//! features fail fast with a lifecycle error instead of silently no-oping.

use std::io;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::features::FeatureDetector;
use crate::tile::{GeoCoordinate, GeoTile};

/// Accepted tile/query image extensions (case-insensitive).
pub(crate) const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Required metadata columns, keyed by header name.
const COLUMN_FILENAME: &str = "Filename";
const COLUMN_TL_LAT: &str = "Top_left_lat";
const COLUMN_TL_LON: &str = "Top_left_lon";
const COLUMN_BR_LAT: &str = "Bottom_right_lat";
const COLUMN_BR_LON: &str = "Bottom_right_long";

/// Store lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Tiles indexed and metadata joined; pixel data not yet decoded.
    Unloaded,
    /// Pixel data decoded for every tile.
    Loaded,
    /// Features cached for every tile.
    Described,
}

/// One parsed metadata row.
#[derive(Debug, Clone)]
struct MetadataRow {
    name: String,
    top_left: GeoCoordinate,
    bottom_right: GeoCoordinate,
}

/// Owns the reference imagery and its geo-metadata for the pipeline's
/// lifetime. Read-only after load apart from `resize_all`/`describe_all`.
#[derive(Debug)]
pub struct GeoTileStore {
    directory: PathBuf,
    tiles: Vec<GeoTile>,
    state: StoreState,
}

impl GeoTileStore {
    /// Index a tile directory without decoding pixels.
    ///
    /// Scans for image files, assigns lexicographic ids, and joins the
    /// single metadata CSV. Fails with a configuration error when the
    /// directory is missing or empty, when zero or multiple CSV files are
    /// present, or when the metadata schema is malformed.
    pub fn scan<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.is_dir() {
            return Err(Error::Configuration(format!(
                "tile directory not found at {}",
                directory.display()
            )));
        }

        let mut image_paths: Vec<PathBuf> = std::fs::read_dir(&directory)?
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| has_extension_in(p, IMAGE_EXTENSIONS))
            .collect();
        image_paths.sort();

        if image_paths.is_empty() {
            return Err(Error::Configuration(format!(
                "no tile images in {}",
                directory.display()
            )));
        }

        let mut tiles = Vec::with_capacity(image_paths.len());
        for (id, path) in image_paths.into_iter().enumerate() {
            let name = filename_stem(&path);
            if tiles.iter().any(|t: &GeoTile| t.name == name) {
                return Err(Error::Configuration(format!(
                    "duplicate tile name `{name}` in {}",
                    directory.display()
                )));
            }
            tiles.push(GeoTile {
                id,
                name,
                path,
                top_left: None,
                bottom_right: None,
                image: image::GrayImage::new(0, 0),
                features: None,
            });
        }
        info!("indexed {} tiles from {}", tiles.len(), directory.display());

        let mut store = Self {
            directory,
            tiles,
            state: StoreState::Unloaded,
        };

        let metadata_path = store.find_metadata_file()?;
        info!("loading metadata from {}", metadata_path.display());
        let rows = parse_metadata(std::fs::File::open(&metadata_path)?)?;
        store.apply_metadata(&rows);

        Ok(store)
    }

    /// Index a tile directory and decode every tile image.
    pub fn load<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let mut store = Self::scan(directory)?;
        store.load_images()?;
        Ok(store)
    }

    /// Decode pixel data for every tile. Idempotent once loaded.
    pub fn load_images(&mut self) -> Result<()> {
        if self.state != StoreState::Unloaded {
            debug!("tile images already loaded");
            return Ok(());
        }
        for tile in &mut self.tiles {
            tile.image = image::open(&tile.path)?.to_luma8();
        }
        self.state = StoreState::Loaded;
        info!("loaded pixel data for {} tiles", self.tiles.len());
        Ok(())
    }

    /// Resize every tile so its longest edge equals `max_edge`, preserving
    /// aspect ratio. No-op for tiles already at size; invalidates nothing
    /// (callers re-describe afterwards if features were cached).
    pub fn resize_all(&mut self, max_edge: u32) -> Result<()> {
        if self.state == StoreState::Unloaded {
            return Err(Error::NotLoaded);
        }
        for tile in &mut self.tiles {
            let (w, h) = tile.image.dimensions();
            let (nw, nh) = fit_max_edge(w, h, max_edge);
            if (nw, nh) != (w, h) {
                tile.image = image::imageops::resize(&tile.image, nw, nh, FilterType::Triangle);
            }
        }
        debug!("resized {} tiles to max edge {}", self.tiles.len(), max_edge);
        Ok(())
    }

    /// Extract and cache features for every tile.
    pub fn describe_all(&mut self, detector: &dyn FeatureDetector) -> Result<()> {
        if self.state == StoreState::Unloaded {
            return Err(Error::NotLoaded);
        }
        info!(
            "describing {} tiles with {}",
            self.tiles.len(),
            detector.name()
        );
        for tile in &mut self.tiles {
            tile.features = Some(detector.detect_and_describe(&tile.image)?);
        }
        self.state = StoreState::Described;
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Source directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Lookup by stable integer id.
    pub fn get(&self, index: usize) -> Result<&GeoTile> {
        self.tiles.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.tiles.len(),
        })
    }

    /// Lookup by unique tile name.
    pub fn get_by_name(&self, name: &str) -> Result<&GeoTile> {
        self.tiles
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::NameNotFound(name.to_string()))
    }

    /// Iterate tiles in load order.
    pub fn iter(&self) -> impl Iterator<Item = &GeoTile> {
        self.tiles.iter()
    }

    /// All tiles in load order.
    pub fn tiles(&self) -> &[GeoTile] {
        &self.tiles
    }

    /// Reverse lookup: the first tile (in load order) whose bounds contain
    /// `coord`. Unlocated tiles never match.
    pub fn tile_containing(&self, coord: &GeoCoordinate) -> Option<&GeoTile> {
        self.tiles.iter().find(|t| t.contains(coord))
    }

    /// Exactly one CSV file must accompany the tile images.
    fn find_metadata_file(&self) -> Result<PathBuf> {
        let mut csv_files: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| has_extension_in(p, &["csv"]))
            .collect();
        csv_files.sort();

        match csv_files.len() {
            0 => Err(Error::Configuration(format!(
                "no metadata CSV file in {}",
                self.directory.display()
            ))),
            1 => Ok(csv_files.remove(0)),
            n => Err(Error::Configuration(format!(
                "{n} metadata CSV files in {}, expected exactly one",
                self.directory.display()
            ))),
        }
    }

    /// Join metadata rows onto tiles by filename stem.
    ///
    /// Zero matching rows leaves the tile unlocated (usable for matching,
    /// excluded from projection). Multiple rows keep the first.
    fn apply_metadata(&mut self, rows: &[MetadataRow]) {
        for tile in &mut self.tiles {
            let matching: Vec<&MetadataRow> =
                rows.iter().filter(|r| r.name == tile.name).collect();
            match matching.len() {
                0 => warn!("no metadata row for tile `{}`; tile is unlocated", tile.name),
                1 => {}
                n => warn!(
                    "{n} metadata rows for tile `{}`; keeping the first",
                    tile.name
                ),
            }
            if let Some(row) = matching.first() {
                tile.top_left = Some(row.top_left);
                tile.bottom_right = Some(row.bottom_right);
            }
        }
    }
}

/// Compute dimensions scaled so the longest edge equals `max_edge`.
pub(crate) fn fit_max_edge(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let long = width.max(height);
    if long == max_edge || long == 0 {
        return (width, height);
    }
    let scale = max_edge as f64 / long as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Filename stem up to the first dot, matching the metadata key convention.
pub(crate) fn filename_stem(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .split('.')
        .next()
        .unwrap_or(file_name.as_str())
        .to_string()
}

pub(crate) fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Parse the metadata table, validating schema and the tile rectangle
/// invariant (`top_left.lat > bottom_right.lat`,
/// `top_left.lon < bottom_right.lon`).
fn parse_metadata<R: io::Read>(reader: R) -> Result<Vec<MetadataRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            Error::Configuration(format!("metadata file is missing column `{name}`"))
        })
    };
    let col_name = column(COLUMN_FILENAME)?;
    let col_tl_lat = column(COLUMN_TL_LAT)?;
    let col_tl_lon = column(COLUMN_TL_LON)?;
    let col_br_lat = column(COLUMN_BR_LAT)?;
    let col_br_lon = column(COLUMN_BR_LON)?;

    let field = |record: &csv::StringRecord, col: usize| -> Result<f64> {
        let raw = record.get(col).unwrap_or("");
        raw.parse().map_err(|_| {
            Error::Configuration(format!("malformed metadata value `{raw}`"))
        })
    };

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let raw_name = record.get(col_name).unwrap_or("");
        let name = raw_name.split('.').next().unwrap_or(raw_name).to_string();
        let top_left = GeoCoordinate::new(
            field(&record, col_tl_lat)?,
            field(&record, col_tl_lon)?,
        );
        let bottom_right = GeoCoordinate::new(
            field(&record, col_br_lat)?,
            field(&record, col_br_lon)?,
        );
        if top_left.lat <= bottom_right.lat || top_left.lon >= bottom_right.lon {
            return Err(Error::Configuration(format!(
                "metadata row for `{name}` is not a north-up rectangle: \
                 top_left ({}, {}), bottom_right ({}, {})",
                top_left.lat, top_left.lon, bottom_right.lat, bottom_right.lon
            )));
        }
        rows.push(MetadataRow {
            name,
            top_left,
            bottom_right,
        });
    }
    Ok(rows)
}
