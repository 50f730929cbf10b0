//! The feature-matching capability consumed by the pipeline.
//!
//! Detection, description, and matching are pluggable: production systems
//! back these traits with pretrained neural detectors/matchers, tests use
//! scripted stand-ins. The pipeline only depends on the contracts here.
//!
//! All pixel coordinates use image convention: origin at the top-left
//! corner, +X right, +Y down.

use image::GrayImage;

use crate::error::Result;

/// Keypoints and descriptors extracted from one image.
///
/// Descriptors are stored as one flat row-major block of
/// `keypoints.len() * descriptor_len` floats; backends with a different
/// natural layout convert on the way in.
#[derive(Debug, Clone, Default)]
pub struct ImageFeatures {
    /// Keypoint pixel positions `[x, y]`.
    pub keypoints: Vec<[f32; 2]>,
    /// Flat descriptor block.
    pub descriptors: Vec<f32>,
    /// Length of one descriptor.
    pub descriptor_len: usize,
}

impl ImageFeatures {
    /// Number of keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Descriptor slice for keypoint `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn descriptor(&self, i: usize) -> &[f32] {
        let start = i * self.descriptor_len;
        &self.descriptors[start..start + self.descriptor_len]
    }
}

/// Point correspondences between one tile and one query image.
///
/// `tile_points[i]` and `query_points[i]` form one matched pair. The lists
/// are parallel and equal-length; ordering carries no meaning. Ephemeral:
/// owned by the evaluation that produced them, never persisted.
#[derive(Debug, Clone, Default)]
pub struct Correspondences {
    /// Matched points in tile pixel coordinates.
    pub tile_points: Vec<[f32; 2]>,
    /// Matched points in query pixel coordinates.
    pub query_points: Vec<[f32; 2]>,
    /// Backend confidence score (mean match confidence or similar).
    pub confidence: f32,
}

impl Correspondences {
    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.tile_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tile_points.is_empty()
    }

    /// Append one matched pair.
    pub fn push(&mut self, tile_point: [f32; 2], query_point: [f32; 2]) {
        self.tile_points.push(tile_point);
        self.query_points.push(query_point);
    }
}

/// Keypoint detection and description over a single image.
///
/// Backends that detect and describe in one pass (most learned frontends)
/// override [`detect_and_describe`](FeatureDetector::detect_and_describe);
/// classical two-stage backends implement `detect` and `describe` and take
/// the default composition.
pub trait FeatureDetector: Send + Sync {
    /// Detect keypoint positions in an image.
    fn detect(&self, image: &GrayImage) -> Result<Vec<[f32; 2]>>;

    /// Describe previously detected keypoints.
    fn describe(&self, image: &GrayImage, keypoints: &[[f32; 2]]) -> Result<ImageFeatures>;

    /// Detect and describe in one call.
    fn detect_and_describe(&self, image: &GrayImage) -> Result<ImageFeatures> {
        let keypoints = self.detect(image)?;
        self.describe(image, &keypoints)
    }

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Matching of two described images into point correspondences.
///
/// Must be deterministic for identical inputs and fixed configuration; no
/// ordering guarantee is required on the returned pairs.
pub trait FeatureMatcher: Send + Sync {
    /// Match tile features against query features.
    fn match_features(
        &self,
        tile: &ImageFeatures,
        query: &ImageFeatures,
    ) -> Result<Correspondences>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
