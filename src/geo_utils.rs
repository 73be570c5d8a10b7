//! # Geographic Utilities
//!
//! Geodesy and bounding-box helpers used by the kinematics and bounds stages.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance`] | Great-circle distance between two lat/lon pairs |
//! | [`haversine_distance`] | Same, for two [`GpsPoint`]s |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box and box center of a track |
//!
//! ## Example
//!
//! ```rust
//! use track_analytics::{GpsPoint, geo_utils};
//!
//! let track = vec![
//!     GpsPoint::new(45.9237, 6.8694),  // Chamonix
//!     GpsPoint::new(45.9300, 6.8750),
//!     GpsPoint::new(45.9400, 6.8800),
//! ];
//!
//! let length = geo_utils::polyline_length(&track);
//! println!("Track length: {:.0}m", length);
//!
//! let dist = geo_utils::haversine_distance(&track[0], &track[2]);
//! println!("Start to end: {:.0}m", dist);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere of radius 6,371,000 m.
//! Summed over GPS fixes a few meters apart this is well within receiver noise.
//!
//! Bounds are plain latitude/longitude extrema; tracks crossing the
//! antimeridian get a box spanning the whole globe in longitude.

use geo::{BoundingRect, MultiPoint, Point};

use crate::{Bounds, EnrichedPoint, GpsPoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in meters between two coordinates given in degrees.
///
/// Total and symmetric; identical coordinates give exactly 0, antipodal
/// ones half the circumference.
///
/// # Example
///
/// ```rust
/// use track_analytics::geo_utils;
///
/// // 0.01 degree of latitude at the equator is about 1.1 km
/// let d = geo_utils::distance(0.0, 0.0, 0.01, 0.0);
/// assert!((d - 1111.95).abs() < 0.1);
/// ```
#[inline]
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` past 1 for near-antipodal pairs
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// # Example
///
/// ```rust
/// use track_analytics::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    distance(p1.latitude, p1.longitude, p2.latitude, p2.longitude)
}

/// Calculate the total length of a polyline (GPS track) in meters.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a track.
///
/// North/south/east/west are the latitude/longitude extrema over all points;
/// the center is the midpoint of those extrema. Returns `None` for an empty
/// track.
///
/// # Example
///
/// ```rust
/// use track_analytics::{geo_utils, kinematics, RawPoint};
///
/// let raw = vec![
///     RawPoint::new(51.50, -0.13, 0.0, None),
///     RawPoint::new(51.51, -0.12, 0.0, None),
///     RawPoint::new(51.58, -0.125, 0.0, None),
/// ];
/// let points = kinematics::derive(raw);
///
/// let bounds = geo_utils::compute_bounds(&points).unwrap();
/// assert_eq!(bounds.south, 51.50);
/// assert_eq!(bounds.north, 51.58);
/// assert!((bounds.center.latitude - 51.54).abs() < 1e-9);
///
/// assert!(geo_utils::compute_bounds(&[]).is_none());
/// ```
pub fn compute_bounds(points: &[EnrichedPoint]) -> Option<Bounds> {
    let cloud: MultiPoint<f64> = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into();

    let rect = cloud.bounding_rect()?;
    let center = rect.center();

    Some(Bounds {
        north: rect.max().y,
        south: rect.min().y,
        east: rect.max().x,
        west: rect.min().x,
        center: GpsPoint::new(center.y, center.x),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
