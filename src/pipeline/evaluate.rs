//! Match evaluation: score one (tile, query) pairing.
//!
//! Runs the matcher over the cached tile features and the query features,
//! thresholds the correspondence count, and reduces the tile-side matched
//! points to a normalized center. Pure apart from the matcher invocation.

use tracing::debug;

use crate::error::{Error, Result};
use crate::features::{FeatureMatcher, ImageFeatures};
use crate::tile::GeoTile;

use super::MatchResult;

/// Evaluate one tile against one query.
///
/// Returns an invalid result when the matcher reports fewer than
/// `min_matches` correspondences or when the normalized center falls
/// outside the tile extent. Matcher failures propagate; the orchestrator
/// converts them into a failed prediction for the whole query.
pub(crate) fn evaluate_tile(
    tile: &GeoTile,
    query_features: &ImageFeatures,
    matcher: &dyn FeatureMatcher,
    min_matches: usize,
) -> Result<MatchResult> {
    let tile_features = tile.features.as_ref().ok_or(Error::NotDescribed)?;

    let correspondences = matcher.match_features(tile_features, query_features)?;
    let count = correspondences.len();

    if count == 0 || count < min_matches {
        debug!(
            "tile `{}`: {count} correspondences, below threshold {min_matches}",
            tile.name
        );
        return Ok(MatchResult::invalid(tile.id, count));
    }

    // Centroid of the tile-side matched points, normalized by tile size so
    // (0,0) is the tile's top-left corner and (1,1) its bottom-right.
    let (width, height) = tile.size();
    let n = count as f64;
    let (sum_x, sum_y) = correspondences
        .tile_points
        .iter()
        .fold((0.0_f64, 0.0_f64), |(sx, sy), p| {
            (sx + p[0] as f64, sy + p[1] as f64)
        });
    let cx = sum_x / n / width as f64;
    let cy = sum_y / n / height as f64;

    // An out-of-extent center means the matched region does not actually
    // lie inside this tile; projecting it would be nonsense.
    let in_extent = (0.0..=1.0).contains(&cx) && (0.0..=1.0).contains(&cy);
    if !in_extent {
        debug!(
            "tile `{}`: center ({cx:.3}, {cy:.3}) outside tile extent, rejected",
            tile.name
        );
        return Ok(MatchResult::invalid(tile.id, count));
    }

    Ok(MatchResult {
        tile_id: tile.id,
        num_features: count,
        center: Some((cx, cy)),
        is_valid: true,
    })
}
