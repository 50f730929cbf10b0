//! Query images: the aerial photos to be localized.
//!
//! `QueryStreamer` indexes a batch of query images up front but decodes
//! pixels lazily, one query at a time — a single unreadable file then fails
//! only its own prediction instead of aborting the batch. Queries come
//! either from a plain directory scan or from a flight-log CSV that also
//! carries ground-truth GNSS coordinates for error reporting.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::camera_model::CameraModel;
use crate::error::{Error, Result};
use crate::store::{filename_stem, fit_max_edge, has_extension_in, IMAGE_EXTENSIONS};
use crate::tile::GeoCoordinate;
use crate::GrayImage;

/// One decoded query image, ready for preprocessing and matching.
#[derive(Debug, Clone)]
pub struct QueryImage {
    /// Filename stem.
    pub name: String,
    /// Source path.
    pub path: PathBuf,
    /// Decoded grayscale pixels.
    pub image: GrayImage,
    /// Ground-truth coordinate from the flight log, if available. Used only
    /// for error reporting, never by the localization core.
    pub ground_truth: Option<GeoCoordinate>,
}

impl QueryImage {
    /// Decode a query image from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let image = image::open(&path)?.to_luma8();
        Ok(Self {
            name: filename_stem(&path),
            path,
            image,
            ground_truth: None,
        })
    }
}

/// One indexed (not yet decoded) query.
#[derive(Debug, Clone)]
pub struct QueryEntry {
    pub name: String,
    pub path: PathBuf,
    pub ground_truth: Option<GeoCoordinate>,
}

/// An ordered batch of query images with lazy pixel loading.
#[derive(Debug)]
pub struct QueryStreamer {
    entries: Vec<QueryEntry>,
}

impl QueryStreamer {
    /// Index every image file in a directory, in lexicographic order.
    pub fn from_directory<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(Error::Configuration(format!(
                "query directory not found at {}",
                directory.display()
            )));
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(directory)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| has_extension_in(p, IMAGE_EXTENSIONS))
            .collect();
        paths.sort();

        let entries = paths
            .into_iter()
            .map(|path| QueryEntry {
                name: filename_stem(&path),
                path,
                ground_truth: None,
            })
            .collect();
        Ok(Self { entries })
    }

    /// Index queries from a flight-log CSV.
    ///
    /// Expected columns: filename, latitude, longitude, then altitude and
    /// gimbal/flight attitude angles. Only the ground-truth coordinate is
    /// retained; attitude is not consumed by the pipeline. Image paths are
    /// resolved relative to `image_dir`.
    pub fn from_flight_log<P: AsRef<Path>, Q: AsRef<Path>>(
        csv_path: P,
        image_dir: Q,
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(csv_path.as_ref())?;

        let mut entries = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let filename = record.get(0).unwrap_or("").to_string();
            if filename.is_empty() {
                continue;
            }
            let coord = parse_coordinate(record.get(1), record.get(2));
            if coord.is_none() {
                warn!("flight-log row for `{filename}` has no usable coordinate");
            }
            let path = image_dir.join(&filename);
            entries.push(QueryEntry {
                name: filename_stem(&path),
                path,
                ground_truth: coord,
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed entries in batch order.
    pub fn entries(&self) -> &[QueryEntry] {
        &self.entries
    }

    /// Decode the pixels for entry `index`.
    pub fn load(&self, index: usize) -> Result<QueryImage> {
        let entry = self.entries.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })?;
        let mut query = QueryImage::open(&entry.path)?;
        query.ground_truth = entry.ground_truth;
        Ok(query)
    }
}

fn parse_coordinate(lat: Option<&str>, lon: Option<&str>) -> Option<GeoCoordinate> {
    let lat: f64 = lat?.parse().ok()?;
    let lon: f64 = lon?.parse().ok()?;
    Some(GeoCoordinate::new(lat, lon))
}

/// Preprocesses query images before feature extraction.
///
/// The camera model is a preprocessing hint only: when present, a query
/// whose dimensions disagree with the declared sensor resolution is flagged
/// (it usually means the wrong camera profile is configured).
#[derive(Debug, Clone, Default)]
pub struct QueryProcessor {
    camera_model: Option<CameraModel>,
    max_edge: Option<u32>,
}

impl QueryProcessor {
    pub fn new(camera_model: Option<CameraModel>, max_edge: Option<u32>) -> Self {
        Self {
            camera_model,
            max_edge,
        }
    }

    /// Resize the query in place so its longest edge equals the configured
    /// target. No-op when no target is set or the image is already at size.
    pub fn process(&self, query: &mut QueryImage) {
        if let Some(cam) = &self.camera_model {
            let (w, h) = query.image.dimensions();
            if (w, h) != cam.resolution() {
                debug!(
                    "query `{}` is {}x{}, camera model declares {}x{}",
                    query.name, w, h, cam.resolution_width, cam.resolution_height
                );
            }
        }
        if let Some(max_edge) = self.max_edge {
            let (w, h) = query.image.dimensions();
            let (nw, nh) = fit_max_edge(w, h, max_edge);
            if (nw, nh) != (w, h) {
                query.image =
                    image::imageops::resize(&query.image, nw, nh, FilterType::Triangle);
            }
        }
    }
}
