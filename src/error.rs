//! Error type shared by every stage of the pipeline.

use thiserror::Error;

/// Everything that can go wrong while turning a GPX document into a [`Track`](crate::Track).
#[derive(Error, Debug)]
pub enum TrackError {
    /// The input is not well-formed markup.
    #[error("malformed GPX document: {0}")]
    Format(String),
    /// A required element or attribute is missing or unparseable.
    #[error("invalid GPX structure: {0}")]
    Schema(String),
    /// The track holds no points, so nothing can be aggregated.
    #[error("track contains no points")]
    EmptyTrack,
    /// JSON export or import failed.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrackError>;
