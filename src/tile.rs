//! Geographic coordinates and geo-referenced satellite tiles.
//!
//! A [`GeoTile`] is a north-up satellite image with optional corner bounds:
//! `top_left` is the upper-left corner, `bottom_right` its diagonal
//! opposite. When both are present the tile is a geographic
//! rectangle with `top_left.lat > bottom_right.lat` and
//! `top_left.lon < bottom_right.lon`; the store enforces this at load time.

use std::path::PathBuf;

use image::GrayImage;

use crate::features::ImageFeatures;

/// Mean Earth radius in meters (IUGG R1).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS-84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub lat: f64,
    pub lon: f64,
}

impl GeoCoordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another coordinate in meters (haversine).
    pub fn haversine_m(&self, other: &GeoCoordinate) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// One geo-referenced satellite tile owned by the [`GeoTileStore`].
///
/// Tiles without a metadata row keep `top_left`/`bottom_right` as `None`:
/// they still participate in matching but cannot be projected to a
/// coordinate.
///
/// [`GeoTileStore`]: crate::store::GeoTileStore
#[derive(Debug, Clone)]
pub struct GeoTile {
    /// Stable 0-based index in lexicographic filename order.
    pub id: usize,
    /// Filename stem; unique within a store.
    pub name: String,
    /// Source image path.
    pub path: PathBuf,
    /// Upper-left corner, when geo-referenced.
    pub top_left: Option<GeoCoordinate>,
    /// Lower-right corner, when geo-referenced.
    pub bottom_right: Option<GeoCoordinate>,
    /// Decoded grayscale pixel data.
    pub image: GrayImage,
    /// Cached features from `describe_all()`.
    pub features: Option<ImageFeatures>,
}

impl GeoTile {
    /// Whether this tile carries corner bounds.
    pub fn is_located(&self) -> bool {
        self.top_left.is_some() && self.bottom_right.is_some()
    }

    /// Corner bounds as `(top_left, bottom_right)`, if geo-referenced.
    pub fn bounds(&self) -> Option<(GeoCoordinate, GeoCoordinate)> {
        match (self.top_left, self.bottom_right) {
            (Some(tl), Some(br)) => Some((tl, br)),
            _ => None,
        }
    }

    /// Current pixel dimensions as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Whether a coordinate lies inside this tile's rectangle.
    ///
    /// Unlocated tiles contain nothing.
    pub fn contains(&self, coord: &GeoCoordinate) -> bool {
        match self.bounds() {
            Some((tl, br)) => {
                br.lat <= coord.lat && coord.lat <= tl.lat
                    && tl.lon <= coord.lon && coord.lon <= br.lon
            }
            None => false,
        }
    }
}
