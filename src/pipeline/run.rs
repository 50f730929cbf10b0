//! The localization orchestrator: drive the pipeline over a batch of
//! queries.
//!
//! One `GeoPrediction` per query, emitted in input order. Per-query
//! failures (unreadable image, matcher error) are recorded in that query's
//! prediction and never abort the batch. Cancellation is cooperative: the
//! flag is checked between queries, the in-flight query always finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::features::{FeatureDetector, FeatureMatcher};
use crate::query::{QueryImage, QueryProcessor, QueryStreamer};
use crate::store::GeoTileStore;

use super::project::project;
use super::select::select_best;
use super::{GeoPrediction, MatchStatus, PipelineConfig};

/// Owns the tile store and the matching capabilities for a batch run.
///
/// Construction resizes and describes the store up front so every query
/// reuses the cached tile features; after that the store is read-only and
/// evaluations share it freely.
pub struct Pipeline {
    store: GeoTileStore,
    detector: Box<dyn FeatureDetector>,
    matcher: Box<dyn FeatureMatcher>,
    processor: QueryProcessor,
    config: PipelineConfig,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    /// Build a pipeline over a loaded store.
    ///
    /// Applies the configured resize to all tiles and caches their
    /// features. Fails fast if the store's pixel data is not loaded.
    pub fn new(
        mut store: GeoTileStore,
        detector: Box<dyn FeatureDetector>,
        matcher: Box<dyn FeatureMatcher>,
        processor: QueryProcessor,
        config: PipelineConfig,
    ) -> Result<Self> {
        if let Some(max_edge) = config.resize_max_edge {
            store.resize_all(max_edge)?;
        }
        store.describe_all(detector.as_ref())?;
        Ok(Self {
            store,
            detector,
            matcher,
            processor,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The tile store backing this pipeline.
    pub fn store(&self) -> &GeoTileStore {
        &self.store
    }

    /// Handle for requesting cooperative cancellation from another thread.
    /// Setting it abandons queries not yet started; the in-flight query
    /// still completes.
    pub fn cancellation_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Localize every query in the streamer, in input order.
    ///
    /// Returns one prediction per processed query. When cancellation is
    /// requested mid-batch, the output covers only the queries that started
    /// before the request.
    pub fn run(&self, queries: &QueryStreamer) -> Vec<GeoPrediction> {
        let total = queries.len();
        info!(
            "localizing {total} queries against {} tiles (matcher: {}, detector: {})",
            self.store.len(),
            self.matcher.name(),
            self.detector.name(),
        );

        let mut predictions = Vec::with_capacity(total);
        for (index, entry) in queries.entries().iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                info!(
                    "cancellation requested; abandoning {} remaining queries",
                    total - index
                );
                break;
            }

            let prediction = match queries.load(index) {
                Ok(mut query) => self.localize(&mut query).unwrap_or_else(|e| {
                    warn!("query `{}` failed: {e}", entry.name);
                    GeoPrediction::unmatched(&entry.name, MatchStatus::Failed)
                }),
                Err(e) => {
                    warn!("query `{}` could not be read: {e}", entry.name);
                    GeoPrediction::unmatched(&entry.name, MatchStatus::Failed)
                }
            };
            predictions.push(prediction);
        }
        predictions
    }

    /// Localize a single query image.
    ///
    /// Errors out on matcher failure; the batch driver converts that into a
    /// failed prediction so other queries are unaffected.
    pub fn localize(&self, query: &mut QueryImage) -> Result<GeoPrediction> {
        self.processor.process(query);
        let query_features = self.detector.detect_and_describe(&query.image)?;

        let best = select_best(
            &self.store,
            &query_features,
            self.matcher.as_ref(),
            &self.config,
        )?;

        let Some(best) = best else {
            info!("query `{}`: no tile matched", query.name);
            return Ok(GeoPrediction::unmatched(&query.name, MatchStatus::Unmatched));
        };

        // a valid result always carries a center in [0,1]^2
        let Some(center) = best.center else {
            return Ok(GeoPrediction::unmatched(&query.name, MatchStatus::Unmatched));
        };
        let tile = self.store.get(best.tile_id)?;

        let predicted_coordinate = match project(tile, center) {
            Ok(coord) => Some(coord),
            Err(Error::MissingGeoreference(name)) => {
                // Visually matched, but the tile carries no bounds: emit the
                // match without a coordinate.
                warn!("query `{}` matched unlocated tile `{name}`", query.name);
                None
            }
            Err(e) => return Err(e),
        };

        info!(
            "query `{}` matched tile `{}` with {} correspondences",
            query.name, tile.name, best.num_features
        );
        Ok(GeoPrediction {
            name: query.name.clone(),
            is_match: true,
            predicted_coordinate,
            center: Some(center),
            matched_tile: Some(best.tile_id),
            status: MatchStatus::Matched,
        })
    }
}
