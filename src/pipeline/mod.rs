//! The localization pipeline: evaluate tiles, select the best, project the
//! match into geographic coordinates, drive batches of queries.
//!
//! Per query the state machine is
//! `PENDING → EVALUATING (one per tile) → {MATCHED | UNMATCHED} → DONE`;
//! evaluations are independent of one another, so the only ordering that
//! matters is the deterministic tie-break in the selector.

mod evaluate;
mod project;
mod run;
mod select;

pub use project::project;
pub use run::Pipeline;

use crate::tile::GeoCoordinate;

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters controlling a localization run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum correspondence count for a tile evaluation to be considered
    /// at all. Below this the evaluation is invalid.
    pub min_matches: usize,
    /// Longest-edge resize target applied to tiles before description.
    /// `None` keeps native resolution.
    pub resize_max_edge: Option<u32>,
    /// Evaluate tiles on the rayon thread pool. The selection outcome is
    /// identical either way; the reduction is deterministic.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_matches: 10,
            resize_max_edge: Some(800),
            parallel: true,
        }
    }
}

// ── Per-evaluation result ───────────────────────────────────────────────────

/// Outcome of evaluating one (tile, query) pairing.
///
/// `center` is the centroid of the tile-side matched points normalized by
/// the tile's pixel dimensions: `(0, 0)` is the tile's top-left corner,
/// `(1, 1)` its bottom-right. A result is valid only when the center lies
/// inside `[0, 1]²`; extrapolated correspondences can push it outside, and
/// such results must never be projected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Evaluated tile id.
    pub tile_id: usize,
    /// Correspondence count reported by the matcher.
    pub num_features: usize,
    /// Normalized match center, when computable.
    pub center: Option<(f64, f64)>,
    /// Whether this evaluation may participate in selection.
    pub is_valid: bool,
}

impl MatchResult {
    /// An invalid evaluation (below threshold or out-of-extent center).
    pub(crate) fn invalid(tile_id: usize, num_features: usize) -> Self {
        Self {
            tile_id,
            num_features,
            center: None,
            is_valid: false,
        }
    }
}

// ── Terminal per-query output ───────────────────────────────────────────────

/// Terminal status of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// A tile was selected and its center validated.
    Matched,
    /// No tile produced a valid evaluation.
    Unmatched,
    /// The query failed outright (unreadable image or matcher error).
    Failed,
}

/// The prediction emitted for one query image.
///
/// `is_match = true` with `predicted_coordinate = None` means the query was
/// visually matched to a tile that carries no georeference — distinct from
/// not being matched at all.
#[derive(Debug, Clone)]
pub struct GeoPrediction {
    /// Query name (filename stem).
    pub name: String,
    /// Whether a tile was visually matched.
    pub is_match: bool,
    /// Projected coordinate, when the matched tile is geo-referenced.
    pub predicted_coordinate: Option<GeoCoordinate>,
    /// Normalized match center inside the selected tile.
    pub center: Option<(f64, f64)>,
    /// Selected tile id.
    pub matched_tile: Option<usize>,
    /// Terminal status.
    pub status: MatchStatus,
}

impl GeoPrediction {
    /// An unmatched or failed prediction.
    pub(crate) fn unmatched(name: &str, status: MatchStatus) -> Self {
        Self {
            name: name.to_string(),
            is_match: false,
            predicted_coordinate: None,
            center: None,
            matched_tile: None,
            status,
        }
    }
}
