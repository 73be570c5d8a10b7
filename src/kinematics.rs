//! Per-point kinematics.
//!
//! Derivation is a fold: every point depends only on the point before it,
//! which is carried forward in an immutable [`FoldState`]. [`step`] is the
//! single transition and can be tested on its own.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::geo_utils::distance;
use crate::{EnrichedPoint, RawPoint, TrackConfig};

/// Meters per second to kilometers per hour.
pub const MPS_TO_KMH: f64 = 3.6;

/// The previous fix, as needed to derive the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviousFix {
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub time: Option<DateTime<Utc>>,
    /// Cumulative distance at this fix, in meters
    pub distance: f64,
}

/// Accumulator of the derivation fold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FoldState {
    pub previous: Option<PreviousFix>,
}

impl FoldState {
    /// State before the first point.
    pub fn start() -> Self {
        Self::default()
    }
}

/// Derive enriched points with the default configuration.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use track_analytics::{derive, RawPoint};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
/// let t1 = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 10).unwrap();
/// let points = derive(vec![
///     RawPoint::new(0.0, 0.0, 0.0, Some(t0)),
///     RawPoint::new(0.01, 0.0, 0.0, Some(t1)),
/// ]);
///
/// assert_eq!(points[0].distance, 0.0);
/// assert!((points[1].distance - 1112.0).abs() < 1.0);
/// assert!((points[1].speed - 400.3).abs() < 0.1);
/// assert!(!points[1].is_pause);
/// ```
pub fn derive(raw_points: Vec<RawPoint>) -> Vec<EnrichedPoint> {
    derive_with_config(raw_points, &TrackConfig::default())
}

/// Derive enriched points, using `config` for the pause thresholds.
pub fn derive_with_config(raw_points: Vec<RawPoint>, config: &TrackConfig) -> Vec<EnrichedPoint> {
    let capacity = raw_points.len();
    let (_, points) = raw_points.into_iter().fold(
        (FoldState::start(), Vec::with_capacity(capacity)),
        |(state, mut out), raw| {
            let (next, point) = step(&state, raw, config);
            out.push(point);
            (next, out)
        },
    );

    debug!(
        "Derived {} points, {} pauses",
        points.len(),
        points.iter().filter(|p| p.is_pause).count()
    );

    points
}

/// Derive one point from the state left by its predecessor.
///
/// Returns the state for the next point together with the enriched point.
pub fn step(state: &FoldState, raw: RawPoint, config: &TrackConfig) -> (FoldState, EnrichedPoint) {
    let (index, segment, cumulative, time_delta) = match state.previous {
        None => (0, 0.0, 0.0, 0.0),
        Some(prev) => {
            let segment = distance(prev.latitude, prev.longitude, raw.latitude, raw.longitude);
            let delta = elapsed_seconds(prev.time, raw.time);
            if delta < 0.0 {
                warn!("Point {}: timestamp is {:.1}s before its predecessor", prev.index + 1, -delta);
            }
            (prev.index + 1, segment, prev.distance + segment, delta)
        }
    };

    let speed = match raw.speed_mps {
        Some(mps) => mps * MPS_TO_KMH,
        None if time_delta > 0.0 => segment / time_delta * MPS_TO_KMH,
        None => 0.0,
    };

    let is_pause = speed < config.pause_speed_kmh && time_delta > config.pause_min_seconds;

    let next = FoldState {
        previous: Some(PreviousFix {
            index,
            latitude: raw.latitude,
            longitude: raw.longitude,
            time: raw.time,
            distance: cumulative,
        }),
    };

    let point = EnrichedPoint {
        index,
        latitude: raw.latitude,
        longitude: raw.longitude,
        elevation: raw.elevation,
        time: raw.time,
        speed,
        heart_rate: raw.heart_rate,
        cadence: raw.cadence,
        power: raw.power,
        distance: cumulative,
        time_delta,
        is_pause,
    };

    (next, point)
}

/// Seconds from `from` to `to`; 0 when either timestamp is unknown.
fn elapsed_seconds(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> f64 {
    match (from, to) {
        (Some(a), Some(b)) => (b - a).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap() + Duration::seconds(seconds))
    }

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_first_point_is_origin() {
        let points = derive(vec![RawPoint::new(45.0, 6.0, 300.0, t(0))]);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.index, 0);
        assert_eq!(p.distance, 0.0);
        assert_eq!(p.time_delta, 0.0);
        assert_eq!(p.speed, 0.0);
        assert!(!p.is_pause);
    }

    #[test]
    fn test_two_points_ten_seconds_apart() {
        let points = derive(vec![
            RawPoint::new(0.0, 0.0, 50.0, t(0)),
            RawPoint::new(0.01, 0.0, 50.0, t(10)),
        ]);
        let p = &points[1];
        assert_eq!(p.time_delta, 10.0);
        assert!(approx_eq(p.distance, 1111.95, 0.1));
        assert!(approx_eq(p.speed, 1111.95 / 10.0 * 3.6, 0.05));
        assert!(!p.is_pause);
    }

    #[test]
    fn test_slow_long_gap_is_pause() {
        // Point 5 creeps about 1 m after a 40 s gap, i.e. ~0.1 km/h
        let mut raw: Vec<RawPoint> = (0..5)
            .map(|i| RawPoint::new(45.0 + i as f64 * 0.0001, 6.0, 0.0, t(i as i64 * 2)))
            .collect();
        raw.push(RawPoint::new(45.0 + 4.0 * 0.0001 + 0.00001, 6.0, 0.0, t(48)));
        raw.push(RawPoint::new(45.0 + 6.0 * 0.0001, 6.0, 0.0, t(50)));

        let points = derive(raw);
        assert_eq!(points[5].time_delta, 40.0);
        assert!(points[5].speed < 0.5);
        let pauses: Vec<usize> = points.iter().filter(|p| p.is_pause).map(|p| p.index).collect();
        assert_eq!(pauses, vec![5]);
    }

    #[test]
    fn test_supplied_speed_wins() {
        let mut second = RawPoint::new(0.01, 0.0, 0.0, t(10));
        second.speed_mps = Some(2.0);
        let points = derive(vec![RawPoint::new(0.0, 0.0, 0.0, t(0)), second]);
        assert!(approx_eq(points[1].speed, 7.2, 1e-9));
    }

    #[test]
    fn test_supplied_zero_speed_after_gap_is_pause() {
        let mut second = RawPoint::new(45.0, 6.0, 0.0, t(60));
        second.speed_mps = Some(0.0);
        let points = derive(vec![RawPoint::new(45.0, 6.0, 0.0, t(0)), second]);
        assert!(points[1].is_pause);
    }

    #[test]
    fn test_missing_timestamp_gives_zero_delta() {
        let points = derive(vec![
            RawPoint::new(45.0, 6.0, 0.0, t(0)),
            RawPoint::new(45.001, 6.0, 0.0, None),
            RawPoint::new(45.002, 6.0, 0.0, t(20)),
        ]);
        assert_eq!(points[1].time_delta, 0.0);
        assert_eq!(points[1].speed, 0.0);
        assert_eq!(points[2].time_delta, 0.0);
        assert!(points[2].distance > points[1].distance);
    }

    #[test]
    fn test_backwards_time_propagates_negative_delta() {
        let points = derive(vec![
            RawPoint::new(45.0, 6.0, 0.0, t(10)),
            RawPoint::new(45.001, 6.0, 0.0, t(5)),
        ]);
        assert_eq!(points[1].time_delta, -5.0);
        assert_eq!(points[1].speed, 0.0);
        assert!(!points[1].is_pause);
    }

    #[test]
    fn test_distance_is_monotonic_and_index_matches_position() {
        let raw: Vec<RawPoint> = (0..50)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.0005 } else { -0.0005 };
                RawPoint::new(45.0 + wobble, 6.0 + i as f64 * 0.0003, 0.0, t(i as i64))
            })
            .collect();
        let points = derive(raw);

        for (i, w) in points.windows(2).enumerate() {
            assert!(w[0].distance <= w[1].distance);
            assert_eq!(w[0].index, i);
            assert_eq!(w[1].index, i + 1);
        }
    }

    #[test]
    fn test_step_in_isolation() {
        let config = TrackConfig::default();
        let state = FoldState {
            previous: Some(PreviousFix {
                index: 7,
                latitude: 0.0,
                longitude: 0.0,
                time: t(0),
                distance: 500.0,
            }),
        };

        let (next, point) = step(&state, RawPoint::new(0.0, 0.0, 0.0, t(45)), &config);
        assert_eq!(point.index, 8);
        assert_eq!(point.distance, 500.0);
        assert_eq!(point.time_delta, 45.0);
        assert!(point.is_pause);

        let prev = next.previous.unwrap();
        assert_eq!(prev.index, 8);
        assert_eq!(prev.time, t(45));
    }

    #[test]
    fn test_empty_input() {
        assert!(derive(Vec::new()).is_empty());
    }
}
