//! Geographic projection of a validated match center.
//!
//! Maps a normalized center `(cx, cy)` across a tile's corner bounds by
//! linear interpolation per axis: `cy` along latitude, `cx` along
//! longitude. The reference implementation takes the absolute value of the
//! center components before interpolating, absorbing tiny negative values
//! from upstream float error; that fallback is reproduced here but is not a
//! validity check — the evaluator's `[0, 1]` gate is the sole authority on
//! whether a center may be projected.

use crate::error::{Error, Result};
use crate::tile::{GeoCoordinate, GeoTile};

/// Project a normalized match center inside `tile` to a coordinate.
///
/// Fails with [`Error::MissingGeoreference`] when the tile has no corner
/// bounds (loaded without a metadata row).
pub fn project(tile: &GeoTile, center: (f64, f64)) -> Result<GeoCoordinate> {
    let (tl, br) = tile
        .bounds()
        .ok_or_else(|| Error::MissingGeoreference(tile.name.clone()))?;

    let (cx, cy) = center;
    let lat = tl.lat + cy.abs() * (br.lat - tl.lat);
    let lon = tl.lon + cx.abs() * (br.lon - tl.lon);
    Ok(GeoCoordinate::new(lat, lon))
}
