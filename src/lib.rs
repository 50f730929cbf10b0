//! # satfix
//!
//! Visual localization of aerial imagery against **geo-referenced satellite
//! tiles** — a position fix when GNSS is unavailable or untrusted.
//!
//! Given a query image (e.g. from a drone camera) and a directory of
//! satellite tiles with known corner coordinates, `satfix`:
//!
//! 1. matches the query against every tile through a pluggable feature
//!    detector/matcher pair (in production a pretrained neural frontend),
//! 2. keeps the tile with the most valid correspondences,
//! 3. verifies that the matched region's normalized center falls inside the
//!    tile extent, and
//! 4. interpolates the center across the tile's corner bounds to produce a
//!    latitude/longitude estimate.
//!
//! ## Example
//!
//! ```no_run
//! use satfix::{
//!     GeoTileStore, Pipeline, PipelineConfig, QueryProcessor, QueryStreamer,
//! };
//! # fn detector() -> Box<dyn satfix::FeatureDetector> { unimplemented!() }
//! # fn matcher() -> Box<dyn satfix::FeatureMatcher> { unimplemented!() }
//!
//! let pipeline = Pipeline::new(
//!     GeoTileStore::load("dataset/georeference")?,
//!     detector(),
//!     matcher(),
//!     QueryProcessor::new(None, Some(800)),
//!     PipelineConfig::default(),
//! )?;
//!
//! let queries = QueryStreamer::from_directory("dataset/query")?;
//! for prediction in pipeline.run(&queries) {
//!     match prediction.predicted_coordinate {
//!         Some(coord) => println!("{}: {:.6}, {:.6}", prediction.name, coord.lat, coord.lon),
//!         None => println!("{}: no fix", prediction.name),
//!     }
//! }
//! # Ok::<(), satfix::Error>(())
//! ```
//!
//! The feature frontend is deliberately outside this crate: implement
//! [`FeatureDetector`] and [`FeatureMatcher`] over your backend of choice
//! and the pipeline code never changes.

pub mod camera_model;
mod error;
pub mod features;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod store;
pub mod tile;

pub use camera_model::CameraModel;
pub use error::{Error, Result};
pub use features::{Correspondences, FeatureDetector, FeatureMatcher, ImageFeatures};
pub use pipeline::{GeoPrediction, MatchResult, MatchStatus, Pipeline, PipelineConfig};
pub use query::{QueryImage, QueryProcessor, QueryStreamer};
pub use store::{GeoTileStore, StoreState};
pub use tile::{GeoCoordinate, GeoTile};

/// Pixel buffer type used throughout the pipeline (8-bit grayscale).
pub type GrayImage = image::GrayImage;
