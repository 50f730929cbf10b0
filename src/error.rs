//! Crate-wide error taxonomy.
//!
//! Configuration problems abort a run; everything else is local to one
//! lookup, one tile evaluation, or one query and is recovered by the caller
//! (the orchestrator records per-query failures in that query's prediction).

use thiserror::Error;

/// Errors produced by the tile store and localization pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal setup problem: bad tile directory, missing/ambiguous metadata
    /// file, or malformed metadata schema. Aborts the whole run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Tile lookup by an out-of-range integer index.
    #[error("tile index {index} out of range (store holds {len} tiles)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Tile lookup by an unknown name.
    #[error("no tile named `{0}`")]
    NameNotFound(String),

    /// A visually matched tile has no corner bounds, so no coordinate can
    /// be projected. Per-query, recovered: the prediction keeps
    /// `is_match = true` with a null coordinate.
    #[error("tile `{0}` is not geo-referenced")]
    MissingGeoreference(String),

    /// The feature matcher backend failed. Per-query, recovered: the query
    /// is reported unmatched.
    #[error("feature matcher failed: {0}")]
    Matcher(String),

    /// An operation that requires loaded pixel data ran before `load()`.
    #[error("tile images are not loaded")]
    NotLoaded,

    /// An operation that requires cached tile features ran before
    /// `describe_all()`.
    #[error("tile features are not described; call describe_all() first")]
    NotDescribed,

    /// Image decode failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Metadata or flight-log CSV failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Filesystem failure while scanning or reading.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
