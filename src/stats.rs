//! Whole-track summary statistics.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::kinematics::MPS_TO_KMH;
use crate::EnrichedPoint;

/// Summary of a track.
///
/// Speeds are km/h, distances and elevations meters, durations seconds.
/// Serialized with camelCase names (`startTime`, `movingTime`, `elevationGain`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Total elapsed time. Always `moving_time + pause_time`.
    pub duration: f64,
    /// Sum of time deltas over points not flagged as pauses
    pub moving_time: f64,
    pub pause_time: f64,
    pub pause_count: usize,
    pub total_distance: f64,
    /// Mean over points with a positive speed (0 if there are none)
    pub avg_speed: f64,
    pub max_speed: f64,
    /// Distance over moving time; `None` when moving time is not positive
    pub avg_moving_speed: Option<f64>,
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    /// Present only if some point carries a positive heart rate
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<u32>,
    pub point_count: usize,
}

/// Reduce an enriched point sequence into a [`TrackSummary`].
///
/// # Errors
/// [`TrackError::EmptyTrack`] when `points` is empty.
///
/// # Example
///
/// ```rust
/// use track_analytics::{aggregate, derive, RawPoint, TrackError};
///
/// let raw: Vec<RawPoint> = (0..10)
///     .map(|i| RawPoint::new(45.0, 6.0 + i as f64 * 0.001, 100.0 + i as f64 * 50.0 / 9.0, None))
///     .collect();
/// let summary = aggregate(&derive(raw)).unwrap();
/// assert!((summary.elevation_gain - 50.0).abs() < 1e-9);
/// assert_eq!(summary.elevation_loss, 0.0);
///
/// assert!(matches!(aggregate(&[]), Err(TrackError::EmptyTrack)));
/// ```
pub fn aggregate(points: &[EnrichedPoint]) -> Result<TrackSummary> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(TrackError::EmptyTrack),
    };

    let duration = match (first.time, last.time) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
        _ => points.iter().map(|p| p.time_delta).sum(),
    };

    let moving_time: f64 = points
        .iter()
        .filter(|p| !p.is_pause)
        .map(|p| p.time_delta)
        .sum();
    let pause_count = points.iter().filter(|p| p.is_pause).count();

    let total_distance = last.distance;

    let (speed_sum, speed_count, max_speed) = points
        .iter()
        .map(|p| p.speed)
        .filter(|s| *s > 0.0)
        .fold((0.0, 0usize, 0.0_f64), |(sum, n, max), s| (sum + s, n + 1, max.max(s)));
    let avg_speed = if speed_count > 0 {
        speed_sum / speed_count as f64
    } else {
        0.0
    };

    let avg_moving_speed = if moving_time > 0.0 {
        Some(total_distance / moving_time * MPS_TO_KMH)
    } else {
        None
    };

    let (min_elevation, max_elevation) = points
        .iter()
        .map(|p| p.elevation)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| (lo.min(e), hi.max(e)));

    let (elevation_gain, elevation_loss) = elevation_change(points);

    let heart_rates: Vec<u32> = points
        .iter()
        .filter_map(|p| p.heart_rate)
        .filter(|hr| *hr > 0)
        .collect();
    let avg_heart_rate = if heart_rates.is_empty() {
        None
    } else {
        Some(heart_rates.iter().map(|&hr| hr as f64).sum::<f64>() / heart_rates.len() as f64)
    };
    let max_heart_rate = heart_rates.iter().copied().max();

    debug!(
        "Aggregated {} points: {:.0}m in {:.0}s ({:.0}s moving)",
        points.len(),
        total_distance,
        duration,
        moving_time
    );

    Ok(TrackSummary {
        start_time: first.time,
        end_time: last.time,
        duration,
        moving_time,
        pause_time: duration - moving_time,
        pause_count,
        total_distance,
        avg_speed,
        max_speed,
        avg_moving_speed,
        min_elevation,
        max_elevation,
        elevation_gain,
        elevation_loss,
        avg_heart_rate,
        max_heart_rate,
        point_count: points.len(),
    })
}

/// Sum of positive and of negative successive elevation deltas, pauses included.
fn elevation_change(points: &[EnrichedPoint]) -> (f64, f64) {
    points
        .windows(2)
        .map(|w| w[1].elevation - w[0].elevation)
        .fold((0.0, 0.0), |(gain, loss), diff| {
            if diff > 0.0 {
                (gain + diff, loss)
            } else {
                (gain, loss - diff)
            }
        })
}
