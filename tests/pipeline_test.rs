//! End-to-end tests: build a synthetic tile directory with a metadata CSV,
//! run the full localization pipeline with a scripted brightness-keyed
//! feature frontend, and verify selection, projection, isolation, and
//! cancellation behavior.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use image::{GrayImage, Luma};
use satfix::{
    Correspondences, Error, FeatureDetector, FeatureMatcher, GeoTileStore, ImageFeatures,
    MatchStatus, Pipeline, PipelineConfig, QueryProcessor, QueryStreamer,
};

// ── Scripted feature frontend ───────────────────────────────────────────────
//
// Each image is "described" by a 5x5 keypoint grid whose single-element
// descriptor is the mean brightness. The matcher pairs up the grids when
// the two means agree within a tolerance, so a query finds exactly the
// tiles that share its brightness.

struct BrightnessDetector;

impl FeatureDetector for BrightnessDetector {
    fn detect(&self, image: &GrayImage) -> satfix::Result<Vec<[f32; 2]>> {
        let (w, h) = image.dimensions();
        let mut keypoints = Vec::with_capacity(25);
        for row in 0..5 {
            for col in 0..5 {
                keypoints.push([
                    (col as f32 + 0.5) * w as f32 / 5.0,
                    (row as f32 + 0.5) * h as f32 / 5.0,
                ]);
            }
        }
        Ok(keypoints)
    }

    fn describe(
        &self,
        image: &GrayImage,
        keypoints: &[[f32; 2]],
    ) -> satfix::Result<ImageFeatures> {
        let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
        let mean = sum as f32 / image.pixels().len().max(1) as f32;
        Ok(ImageFeatures {
            keypoints: keypoints.to_vec(),
            descriptors: vec![mean; keypoints.len()],
            descriptor_len: 1,
        })
    }

    fn name(&self) -> &str {
        "brightness-grid"
    }
}

struct BrightnessMatcher {
    tolerance: f32,
}

impl FeatureMatcher for BrightnessMatcher {
    fn match_features(
        &self,
        tile: &ImageFeatures,
        query: &ImageFeatures,
    ) -> satfix::Result<Correspondences> {
        let mut correspondences = Correspondences::default();
        if tile.is_empty() || query.is_empty() {
            return Ok(correspondences);
        }
        if (tile.descriptor(0)[0] - query.descriptor(0)[0]).abs() > self.tolerance {
            return Ok(correspondences);
        }
        for (t, q) in tile.keypoints.iter().zip(query.keypoints.iter()) {
            correspondences.push(*t, *q);
        }
        correspondences.confidence = 1.0;
        Ok(correspondences)
    }

    fn name(&self) -> &str {
        "brightness"
    }
}

/// Matcher whose backend is permanently down.
struct BrokenMatcher;

impl FeatureMatcher for BrokenMatcher {
    fn match_features(
        &self,
        _tile: &ImageFeatures,
        _query: &ImageFeatures,
    ) -> satfix::Result<Correspondences> {
        Err(Error::Matcher("backend unavailable".into()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

// ── Fixture helpers ─────────────────────────────────────────────────────────

fn fresh_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("satfix_e2e")
        .join(format!("{name}_{}", std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_tile(dir: &Path, name: &str, brightness: u8) {
    let img = GrayImage::from_pixel(64, 64, Luma([brightness]));
    img.save(dir.join(name)).unwrap();
}

/// Three tiles: a (bright 50), b (100), c (150, no metadata row).
fn write_tile_db(dir: &Path) {
    write_tile(dir, "tile_a.png", 50);
    write_tile(dir, "tile_b.png", 100);
    write_tile(dir, "tile_c.png", 150);
    std::fs::write(
        dir.join("map.csv"),
        "Filename,Top_left_lat,Top_left_lon,Bottom_right_lat,Bottom_right_long\n\
         tile_a.png,10.0,100.0,0.0,110.0\n\
         tile_b.png,0.0,100.0,-10.0,110.0\n",
    )
    .unwrap();
}

fn pipeline_over(dir: &Path) -> Pipeline {
    let store = GeoTileStore::load(dir).unwrap();
    Pipeline::new(
        store,
        Box::new(BrightnessDetector),
        Box::new(BrightnessMatcher { tolerance: 1.0 }),
        QueryProcessor::new(None, None),
        PipelineConfig {
            min_matches: 10,
            resize_max_edge: None,
            parallel: true,
        },
    )
    .unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[test]
fn full_pipeline_localizes_a_batch() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let tiles = fresh_dir("tiles_batch");
    write_tile_db(&tiles);

    let queries_dir = fresh_dir("queries_batch");
    // q0 is unreadable, q1 matches tile_b, q2 matches nothing,
    // q3 matches the unlocated tile_c
    std::fs::write(queries_dir.join("q0.png"), b"not an image")?;
    write_tile(&queries_dir, "q1.png", 100);
    write_tile(&queries_dir, "q2.png", 220);
    write_tile(&queries_dir, "q3.png", 150);

    let pipeline = pipeline_over(&tiles);
    let queries = QueryStreamer::from_directory(&queries_dir)?;
    let predictions = pipeline.run(&queries);

    // one prediction per query, in input order, despite the bad first query
    assert_eq!(predictions.len(), 4);
    let names: Vec<&str> = predictions.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["q0", "q1", "q2", "q3"]);

    // q0: unreadable image fails only itself
    assert_eq!(predictions[0].status, MatchStatus::Failed);
    assert!(!predictions[0].is_match);

    // q1: matched tile_b, center of its bounds
    let p = &predictions[1];
    assert_eq!(p.status, MatchStatus::Matched);
    assert_eq!(p.matched_tile, Some(1));
    let (cx, cy) = p.center.unwrap();
    assert!((cx - 0.5).abs() < 1e-6 && (cy - 0.5).abs() < 1e-6);
    let coord = p.predicted_coordinate.unwrap();
    assert!((coord.lat - -5.0).abs() < 1e-6);
    assert!((coord.lon - 105.0).abs() < 1e-6);

    // q2: no tile shares its brightness
    assert_eq!(predictions[2].status, MatchStatus::Unmatched);
    assert!(predictions[2].predicted_coordinate.is_none());

    // q3: visually matched but the tile has no georeference
    let p = &predictions[3];
    assert_eq!(p.status, MatchStatus::Matched);
    assert!(p.is_match);
    assert!(p.predicted_coordinate.is_none());
    assert_eq!(p.matched_tile, Some(2));
    Ok(())
}

#[test]
fn tie_break_is_deterministic_across_runs() {
    let tiles = fresh_dir("tiles_tie");
    // identical pixel content: every evaluation yields the same count
    write_tile(&tiles, "dup_a.png", 100);
    write_tile(&tiles, "dup_b.png", 100);
    std::fs::write(
        tiles.join("map.csv"),
        "Filename,Top_left_lat,Top_left_lon,Bottom_right_lat,Bottom_right_long\n\
         dup_a.png,10.0,100.0,0.0,110.0\n\
         dup_b.png,0.0,100.0,-10.0,110.0\n",
    )
    .unwrap();

    let queries_dir = fresh_dir("queries_tie");
    write_tile(&queries_dir, "q.png", 100);
    let queries = QueryStreamer::from_directory(&queries_dir).unwrap();

    let pipeline = pipeline_over(&tiles);
    for _ in 0..5 {
        let predictions = pipeline.run(&queries);
        assert_eq!(predictions[0].matched_tile, Some(0), "tie must keep tile 0");
    }
}

#[test]
fn matcher_failure_isolates_per_query() {
    let tiles = fresh_dir("tiles_broken");
    write_tile_db(&tiles);

    let queries_dir = fresh_dir("queries_broken");
    write_tile(&queries_dir, "q1.png", 100);
    write_tile(&queries_dir, "q2.png", 100);

    let store = GeoTileStore::load(&tiles).unwrap();
    let pipeline = Pipeline::new(
        store,
        Box::new(BrightnessDetector),
        Box::new(BrokenMatcher),
        QueryProcessor::new(None, None),
        PipelineConfig::default(),
    )
    .unwrap();

    let queries = QueryStreamer::from_directory(&queries_dir).unwrap();
    let predictions = pipeline.run(&queries);

    // the batch survives a broken matcher; every query gets a prediction
    assert_eq!(predictions.len(), 2);
    for p in &predictions {
        assert_eq!(p.status, MatchStatus::Failed);
        assert!(!p.is_match);
    }
}

#[test]
fn cancellation_abandons_remaining_queries() {
    let tiles = fresh_dir("tiles_cancel");
    write_tile_db(&tiles);

    let queries_dir = fresh_dir("queries_cancel");
    write_tile(&queries_dir, "q1.png", 100);
    write_tile(&queries_dir, "q2.png", 100);

    let pipeline = pipeline_over(&tiles);
    pipeline.cancellation_handle().store(true, Ordering::Relaxed);

    let queries = QueryStreamer::from_directory(&queries_dir).unwrap();
    let predictions = pipeline.run(&queries);
    assert!(predictions.is_empty());
}

#[test]
fn store_resize_and_describe_through_pipeline() -> anyhow::Result<()> {
    let tiles = fresh_dir("tiles_resize");
    write_tile_db(&tiles);

    let store = GeoTileStore::load(&tiles)?;
    let pipeline = Pipeline::new(
        store,
        Box::new(BrightnessDetector),
        Box::new(BrightnessMatcher { tolerance: 1.0 }),
        QueryProcessor::new(None, Some(32)),
        PipelineConfig {
            min_matches: 10,
            resize_max_edge: Some(32),
            parallel: false,
        },
    )?;

    for tile in pipeline.store().iter() {
        assert_eq!(tile.size(), (32, 32));
        assert!(tile.features.is_some());
    }

    // a 64x64 query is shrunk to the same working size and still matches
    let queries_dir = fresh_dir("queries_resize");
    write_tile(&queries_dir, "q.png", 100);
    let queries = QueryStreamer::from_directory(&queries_dir)?;
    let predictions = pipeline.run(&queries);
    assert_eq!(predictions[0].matched_tile, Some(1));
    Ok(())
}

#[test]
fn missing_metadata_csv_is_fatal() {
    let tiles = fresh_dir("tiles_nocsv");
    write_tile(&tiles, "tile_a.png", 50);

    match GeoTileStore::scan(&tiles) {
        Err(Error::Configuration(msg)) => assert!(msg.contains("metadata"), "{msg}"),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn multiple_metadata_csvs_are_fatal() {
    let tiles = fresh_dir("tiles_twocsv");
    write_tile(&tiles, "tile_a.png", 50);
    let header = "Filename,Top_left_lat,Top_left_lon,Bottom_right_lat,Bottom_right_long\n";
    std::fs::write(tiles.join("one.csv"), header).unwrap();
    std::fs::write(tiles.join("two.csv"), header).unwrap();

    assert!(matches!(
        GeoTileStore::scan(&tiles),
        Err(Error::Configuration(_))
    ));
}
