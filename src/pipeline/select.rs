//! Tile selection: pick the single best tile for a query.
//!
//! Every tile is evaluated (sequentially or on the rayon pool), then the
//! results are reduced in tile-id order: a candidate replaces the running
//! best only with a **strictly greater** valid feature count, so ties keep
//! the earlier tile and the choice is reproducible regardless of how the
//! evaluations were scheduled.

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::features::{FeatureMatcher, ImageFeatures};
use crate::store::GeoTileStore;

use super::evaluate::evaluate_tile;
use super::{MatchResult, PipelineConfig};

/// Evaluate all tiles and return the best valid result, or `None` when no
/// tile produced a valid evaluation.
pub(crate) fn select_best(
    store: &GeoTileStore,
    query_features: &ImageFeatures,
    matcher: &dyn FeatureMatcher,
    config: &PipelineConfig,
) -> Result<Option<MatchResult>> {
    // Collect every evaluation first; the reduction below is what fixes
    // determinism, not the evaluation order.
    let results: Vec<MatchResult> = if config.parallel {
        store
            .tiles()
            .par_iter()
            .map(|tile| evaluate_tile(tile, query_features, matcher, config.min_matches))
            .collect::<Result<Vec<_>>>()?
    } else {
        store
            .tiles()
            .iter()
            .map(|tile| evaluate_tile(tile, query_features, matcher, config.min_matches))
            .collect::<Result<Vec<_>>>()?
    };

    let best = reduce_best(&results);
    if let Some(b) = &best {
        debug!(
            "selected tile {} with {} correspondences",
            b.tile_id, b.num_features
        );
    }
    Ok(best)
}

/// Deterministic reduction: max valid feature count, earliest tile id on
/// ties. Invalid results never win.
pub(crate) fn reduce_best(results: &[MatchResult]) -> Option<MatchResult> {
    let mut sorted: Vec<&MatchResult> = results.iter().filter(|r| r.is_valid).collect();
    sorted.sort_by_key(|r| r.tile_id);

    let mut best: Option<MatchResult> = None;
    for result in sorted {
        match &best {
            Some(b) if result.num_features <= b.num_features => {}
            _ => best = Some(*result),
        }
    }
    best
}
