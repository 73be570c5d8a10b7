//! Speed buckets and gradient segments.
//!
//! Every renderer colors the route by speed with the same six buckets.
//! The table and the segmentation live here so 2D and 3D views agree.
//!
//! | Bucket | Speed (km/h) | Color |
//! |--------|--------------|-------|
//! | 0 | < 5 | `#00ff00` |
//! | 1 | 5 – 10 | `#7fff00` |
//! | 2 | 10 – 15 | `#ffff00` |
//! | 3 | 15 – 20 | `#ff7f00` |
//! | 4 | 20 – 25 | `#ff3f00` |
//! | 5 | ≥ 25 | `#ff0000` |

use serde::{Deserialize, Serialize};

use crate::{EnrichedPoint, GpsPoint};

/// Lower bound (km/h) of buckets 1..=5. Bucket 0 is everything below 5 km/h.
pub const SPEED_THRESHOLDS: [f64; 5] = [5.0, 10.0, 15.0, 20.0, 25.0];

/// Bucket colors, green (slow) to red (fast).
pub const SPEED_PALETTE: [&str; 6] = ["#00ff00", "#7fff00", "#ffff00", "#ff7f00", "#ff3f00", "#ff0000"];

/// A contiguous run of coordinates in one speed bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSegment {
    pub bucket: usize,
    /// Speed (km/h) of the point that opened the segment
    pub speed: f64,
    pub coordinates: Vec<GpsPoint>,
}

impl ColorSegment {
    /// Palette color of this segment's bucket.
    pub fn color(&self) -> &'static str {
        bucket_color(self.bucket)
    }
}

/// Bucket index (0..=5) for a speed in km/h.
///
/// # Example
/// ```
/// use track_analytics::speed_bucket;
/// assert_eq!(speed_bucket(3.0), 0);
/// assert_eq!(speed_bucket(12.0), 2);
/// assert_eq!(speed_bucket(25.0), 5);
/// ```
pub fn speed_bucket(speed_kmh: f64) -> usize {
    SPEED_THRESHOLDS
        .iter()
        .take_while(|&&threshold| speed_kmh >= threshold)
        .count()
}

/// Color for a bucket; out-of-range buckets get the fastest color.
pub fn bucket_color(bucket: usize) -> &'static str {
    SPEED_PALETTE[bucket.min(SPEED_PALETTE.len() - 1)]
}

/// Segment a track with the default speed table.
pub fn segment_by_speed(points: &[EnrichedPoint]) -> Vec<ColorSegment> {
    segment(points, speed_bucket)
}

/// Partition `points` into runs sharing a bucket.
///
/// A new segment starts whenever the bucket changes. The point where it
/// changes ends the closing segment *and* starts the new one, so consecutive
/// segments share exactly one coordinate and the drawn line has no gaps.
///
/// # Example
///
/// ```rust
/// use track_analytics::{segment, EnrichedPoint};
///
/// fn at(index: usize, speed: f64) -> EnrichedPoint {
///     EnrichedPoint {
///         index, latitude: index as f64 * 0.001, longitude: 0.0, elevation: 0.0,
///         time: None, speed, heart_rate: None, cadence: None, power: None,
///         distance: 0.0, time_delta: 0.0, is_pause: false,
///     }
/// }
///
/// let points = vec![at(0, 3.0), at(1, 4.0), at(2, 12.0), at(3, 13.0)];
/// let segments = segment(&points, |speed| if speed < 10.0 { 0 } else { 1 });
///
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[0].coordinates.len(), 3); // points 0, 1 and 2
/// assert_eq!(segments[1].coordinates.len(), 2); // points 2 and 3
/// assert_eq!(segments[0].coordinates[2], segments[1].coordinates[0]);
/// ```
pub fn segment<F>(points: &[EnrichedPoint], bucket_of: F) -> Vec<ColorSegment>
where
    F: Fn(f64) -> usize,
{
    let mut segments: Vec<ColorSegment> = Vec::new();
    let Some(first) = points.first() else {
        return segments;
    };

    let mut current = ColorSegment {
        bucket: bucket_of(first.speed),
        speed: first.speed,
        coordinates: vec![first.position()],
    };

    for point in &points[1..] {
        let bucket = bucket_of(point.speed);
        let position = point.position();
        current.coordinates.push(position);

        if bucket != current.bucket {
            let next = ColorSegment {
                bucket,
                speed: point.speed,
                coordinates: vec![position],
            };
            segments.push(std::mem::replace(&mut current, next));
        }
    }

    segments.push(current);
    segments
}
