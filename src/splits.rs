//! Kilometer markers along a track.

use serde::{Deserialize, Serialize};

use crate::{EnrichedPoint, GpsPoint};

const SPLIT_METERS: f64 = 1000.0;

/// The first point at or past a whole kilometer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KilometerSplit {
    /// Kilometer number, starting at 1
    pub kilometer: u32,
    pub index: usize,
    pub position: GpsPoint,
    /// Seconds since the first point, `None` if either timestamp is missing
    pub elapsed: Option<f64>,
    pub elevation: f64,
    pub speed: f64,
}

/// One marker per whole kilometer reached.
///
/// The walk checks each point once against the next target, so a single
/// long jump across several kilometers produces one marker and the target
/// only moves forward by 1000 m.
///
/// # Example
///
/// ```rust
/// use track_analytics::{derive, kilometer_splits, RawPoint};
///
/// // ~111 m between points, 25 points = ~2.7 km
/// let raw: Vec<RawPoint> = (0..25)
///     .map(|i| RawPoint::new(45.0 + i as f64 * 0.001, 6.0, 0.0, None))
///     .collect();
/// let splits = kilometer_splits(&derive(raw));
///
/// assert_eq!(splits.len(), 2);
/// assert_eq!(splits[0].kilometer, 1);
/// assert_eq!(splits[0].index, 9);
/// ```
pub fn kilometer_splits(points: &[EnrichedPoint]) -> Vec<KilometerSplit> {
    let start_time = points.first().and_then(|p| p.time);
    let mut next_target = SPLIT_METERS;
    let mut splits = Vec::new();

    for point in points {
        if point.distance < next_target {
            continue;
        }

        let elapsed = match (start_time, point.time) {
            (Some(start), Some(now)) => Some((now - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        };

        splits.push(KilometerSplit {
            kilometer: (next_target / SPLIT_METERS) as u32,
            index: point.index,
            position: point.position(),
            elapsed,
            elevation: point.elevation,
            speed: point.speed,
        });
        next_target += SPLIT_METERS;
    }

    splits
}
