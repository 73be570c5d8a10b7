//! # Track Analytics
//!
//! GPX activity ingestion and analytics.
//!
//! This library turns a recorded activity (a GPX document) into:
//! - An enriched point series (cumulative distance, elapsed time, speed, pause flag)
//! - A summary record (duration, moving time, speeds, elevation gain/loss, heart rate)
//! - A bounding box with its center, for an initial map viewport
//! - Speed-bucketed color segments shared by every renderer
//!
//! ## Features
//!
//! - **`parallel`** - Parse many independent documents concurrently with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use track_analytics::{parse_track, segments};
//!
//! let gpx = r#"<?xml version="1.0"?>
//! <gpx version="1.1" creator="example">
//!   <trk>
//!     <name>Evening run</name>
//!     <trkseg>
//!       <trkpt lat="48.8566" lon="2.3522"><ele>35</ele><time>2024-05-01T18:00:00Z</time></trkpt>
//!       <trkpt lat="48.8576" lon="2.3522"><ele>36</ele><time>2024-05-01T18:00:30Z</time></trkpt>
//!       <trkpt lat="48.8586" lon="2.3522"><ele>34</ele><time>2024-05-01T18:01:00Z</time></trkpt>
//!     </trkseg>
//!   </trk>
//! </gpx>"#;
//!
//! let track = parse_track(gpx).unwrap();
//! println!("{}: {:.0} m", track.name(), track.summary().total_distance);
//!
//! for segment in segments::segment_by_speed(track.points()) {
//!     println!("{} points in {}", segment.coordinates.len(), segment.color());
//! }
//! ```

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Result, TrackError};

// Great-circle distance and bounding boxes
pub mod geo_utils;

// GPX reading
pub mod parser;
pub use parser::{parse_document, ParsedDocument};

// Per-point derivation (distance, speed, pauses)
pub mod kinematics;
pub use kinematics::{derive, derive_with_config};

// Whole-track summary
pub mod stats;
pub use stats::{aggregate, TrackSummary};

// Speed buckets and gradient segments
pub mod segments;
pub use segments::{bucket_color, segment, segment_by_speed, speed_bucket, ColorSegment, SPEED_PALETTE};

// Kilometer markers
pub mod splits;
pub use splits::{kilometer_splits, KilometerSplit};

// JSON export and display helpers
pub mod export;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use track_analytics::GpsPoint;
/// let point = GpsPoint::new(45.8326, 6.8652); // Mont Blanc
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and inside the WGS84 range. The parser rejects trackpoints
    /// that fail this.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Bounding box of a track, plus the midpoint of its extrema.
///
/// The center is *not* a centroid: it is the middle of the box, which is what
/// a renderer wants for its initial viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub center: GpsPoint,
}

/// One trackpoint as read from the document, before any derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters; 0 when the document has no `<ele>`.
    pub elevation: f64,
    /// `None` when the timestamp is missing or unparseable (lenient policy only).
    pub time: Option<DateTime<Utc>>,
    /// Speed reported by the device, in meters per second.
    pub speed_mps: Option<f64>,
    pub heart_rate: Option<u32>,
    pub cadence: Option<f64>,
    pub power: Option<u32>,
}

impl RawPoint {
    /// A point with coordinates, elevation and time, and no sensor channels.
    pub fn new(latitude: f64, longitude: f64, elevation: f64, time: Option<DateTime<Utc>>) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            time,
            speed_mps: None,
            heart_rate: None,
            cadence: None,
            power: None,
        }
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A trackpoint with its derived kinematics.
///
/// Serialized with the field names used by the JSON export
/// (`index, lat, lon, ele, time, speed, heartRate, cadence, power, distance, timeDelta, isPause`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPoint {
    /// Position in the track (0-based)
    pub index: usize,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(rename = "ele")]
    pub elevation: f64,
    pub time: Option<DateTime<Utc>>,
    /// Supplied or derived speed in km/h
    pub speed: f64,
    pub heart_rate: Option<u32>,
    pub cadence: Option<f64>,
    pub power: Option<u32>,
    /// Cumulative distance from the first point, in meters
    pub distance: f64,
    /// Seconds since the previous point (0 for the first point)
    pub time_delta: f64,
    pub is_pause: bool,
}

impl EnrichedPoint {
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// How timestamps that are missing, unparseable or out of order are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimestampPolicy {
    /// Keep the point with no time. Deltas involving it are 0; backwards
    /// steps propagate as zero or negative deltas.
    #[default]
    Lenient,
    /// Fail the parse with [`TrackError::Schema`].
    Strict,
}

/// Configuration for track ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Speed below which a point may be a pause, in km/h.
    /// Default: 0.5
    pub pause_speed_kmh: f64,

    /// A slow point is only a pause if it follows a gap longer than this, in seconds.
    /// Default: 30.0
    pub pause_min_seconds: f64,

    /// Track name used when the document has none.
    /// Default: "Unnamed activity"
    pub default_name: String,

    /// Handling of missing or non-monotonic timestamps.
    /// Default: [`TimestampPolicy::Lenient`]
    pub timestamp_policy: TimestampPolicy,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            pause_speed_kmh: 0.5,
            pause_min_seconds: 30.0,
            default_name: "Unnamed activity".to_string(),
            timestamp_policy: TimestampPolicy::Lenient,
        }
    }
}

/// One parsed activity: metadata, enriched points, summary and bounds.
///
/// A `Track` is only built by parsing or by importing an export, and both
/// paths recompute the summary and bounds from the points. It is a read-only
/// snapshot afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    name: String,
    description: String,
    points: Vec<EnrichedPoint>,
    #[serde(rename = "stats")]
    summary: TrackSummary,
    bounds: Bounds,
}

impl Track {
    /// Assemble a track from derived points. Fails on an empty point list.
    pub(crate) fn from_parts(name: String, description: String, points: Vec<EnrichedPoint>) -> Result<Self> {
        let summary = aggregate(&points)?;
        let bounds = geo_utils::compute_bounds(&points).ok_or(TrackError::EmptyTrack)?;
        Ok(Self { name, description, points, summary, bounds })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn points(&self) -> &[EnrichedPoint] {
        &self.points
    }

    pub fn summary(&self) -> &TrackSummary {
        &self.summary
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Parse a GPX document into a [`Track`] with the default configuration.
///
/// # Errors
/// - [`TrackError::Format`] if the document is not well-formed
/// - [`TrackError::Schema`] if there is no track or a point lacks coordinates
/// - [`TrackError::EmptyTrack`] if the track has no points
///
/// # Example
/// ```
/// use track_analytics::{parse_track, TrackError};
///
/// let empty = r#"<gpx><trk><name>Nothing</name></trk></gpx>"#;
/// assert!(matches!(parse_track(empty), Err(TrackError::EmptyTrack)));
///
/// let no_track = r#"<gpx><wpt lat="1" lon="1"/></gpx>"#;
/// assert!(matches!(parse_track(no_track), Err(TrackError::Schema(_))));
/// ```
pub fn parse_track(document: &str) -> Result<Track> {
    parse_track_with_config(document, &TrackConfig::default())
}

/// Parse a GPX document into a [`Track`] with a custom configuration.
pub fn parse_track_with_config(document: &str, config: &TrackConfig) -> Result<Track> {
    let parsed = parse_document(document, config)?;
    let points = derive_with_config(parsed.points, config);
    let track = Track::from_parts(parsed.name, parsed.description, points)?;

    info!(
        "Parsed track '{}': {} points, {:.0}m, {} pauses",
        track.name,
        track.summary.point_count,
        track.summary.total_distance,
        track.summary.pause_count
    );

    Ok(track)
}

/// Parse independent documents in parallel.
///
/// Each document is parsed exactly as [`parse_track_with_config`] would;
/// results come back in input order.
#[cfg(feature = "parallel")]
pub fn parse_tracks_parallel(documents: &[&str], config: &TrackConfig) -> Vec<Result<Track>> {
    use rayon::prelude::*;

    documents
        .par_iter()
        .map(|doc| parse_track_with_config(doc, config))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
