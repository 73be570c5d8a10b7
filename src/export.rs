//! JSON export/import and small display helpers for exported tracks.
//!
//! The JSON layout is:
//!
//! ```text
//! { "name", "description",
//!   "points": [{ "index", "lat", "lon", "ele", "time", "speed", "heartRate",
//!                "cadence", "power", "distance", "timeDelta", "isPause" }],
//!   "stats":  { "startTime", "endTime", "duration", "movingTime", ... },
//!   "bounds": { "north", "south", "east", "west", "center": { "lat", "lon" } } }
//! ```
//!
//! Absent sensor channels are written as `null`, never as 0.

use serde::Deserialize;

use crate::error::Result;
use crate::stats::{aggregate, TrackSummary};
use crate::{EnrichedPoint, Track};

/// The parts of an export that are read back; `stats` and `bounds` are
/// always recomputed from the points.
#[derive(Deserialize)]
struct ExportedTrack {
    name: String,
    #[serde(default)]
    description: String,
    points: Vec<EnrichedPoint>,
}

impl Track {
    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON, as written to export files.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a track previously written by [`Track::to_json`].
    ///
    /// # Errors
    /// - [`TrackError::Json`](crate::TrackError::Json) if the text is not a track export
    /// - [`TrackError::EmptyTrack`](crate::TrackError::EmptyTrack) if it has no points
    pub fn from_json(json: &str) -> Result<Self> {
        let exported: ExportedTrack = serde_json::from_str(json)?;
        Track::from_parts(exported.name, exported.description, exported.points)
    }
}

/// Recompute the summary from a track's points.
///
/// For an imported export this must agree with the stored `stats`.
pub fn reaggregate(track: &Track) -> Result<TrackSummary> {
    aggregate(track.points())
}

/// File name for an export: non-alphanumeric characters become `_`.
///
/// # Example
/// ```
/// use track_analytics::export::export_file_name;
/// assert_eq!(export_file_name("Col du Galibier #2"), "Col_du_Galibier__2_export.json");
/// ```
pub fn export_file_name(track_name: &str) -> String {
    let stem: String = track_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_export.json", stem)
}

/// Format seconds as `1h 02m 03s`, `4m 05s` or `7s`.
///
/// # Example
/// ```
/// use track_analytics::export::format_duration;
/// assert_eq!(format_duration(3723.0), "1h 02m 03s");
/// assert_eq!(format_duration(245.9), "4m 05s");
/// assert_eq!(format_duration(7.0), "7s");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// First and last points of a track, for a compact table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPreview<'a> {
    pub head: &'a [EnrichedPoint],
    pub tail: &'a [EnrichedPoint],
    /// Points between `head` and `tail` that are not shown
    pub hidden: usize,
}

/// Show every point when there are at most `2 * edge`, otherwise the first
/// and last `edge` points.
pub fn preview(points: &[EnrichedPoint], edge: usize) -> PointPreview<'_> {
    if points.len() <= edge.saturating_mul(2) {
        return PointPreview {
            head: points,
            tail: &[],
            hidden: 0,
        };
    }

    PointPreview {
        head: &points[..edge],
        tail: &points[points.len() - edge..],
        hidden: points.len() - 2 * edge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_track, TrackError};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn sample_track() -> Track {
        let mut gpx = String::from(r#"<gpx><trk><name>Export me</name><desc>with "quotes"</desc><trkseg>"#);
        for i in 0..30 {
            let hr = if i % 3 == 0 {
                format!("<extensions><hr>{}</hr></extensions>", 110 + i)
            } else {
                String::new()
            };
            // One-minute gap before point 15
            let secs = if i >= 15 { i * 4 + 60 } else { i * 4 };
            gpx.push_str(&format!(
                r#"<trkpt lat="{}" lon="{}"><ele>{}</ele><time>2024-06-01T07:{:02}:{:02}Z</time>{}</trkpt>"#,
                45.0 + i as f64 * 0.0001,
                6.0 + (i % 4) as f64 * 0.00005,
                200.0 + ((i * 37) % 11) as f64,
                secs / 60,
                secs % 60,
                hr
            ));
        }
        gpx.push_str("</trkseg></trk></gpx>");
        parse_track(&gpx).unwrap()
    }

    #[test]
    fn test_json_field_names() {
        let track = sample_track();
        let value: serde_json::Value = serde_json::from_str(&track.to_json().unwrap()).unwrap();

        assert_eq!(value["name"], "Export me");
        assert_eq!(value["description"], "with \"quotes\"");

        let point = &value["points"][1];
        for key in [
            "index", "lat", "lon", "ele", "time", "speed", "heartRate", "cadence", "power", "distance",
            "timeDelta", "isPause",
        ] {
            assert!(point.get(key).is_some(), "missing point field {}", key);
        }
        assert!(point["heartRate"].is_null());
        assert_eq!(value["points"][0]["heartRate"], 110);

        for key in [
            "startTime", "endTime", "duration", "movingTime", "pauseTime", "pauseCount", "totalDistance",
            "avgSpeed", "maxSpeed", "avgMovingSpeed", "minElevation", "maxElevation", "elevationGain",
            "elevationLoss", "avgHeartRate", "maxHeartRate", "pointCount",
        ] {
            assert!(value["stats"].get(key).is_some(), "missing stats field {}", key);
        }

        for key in ["north", "south", "east", "west"] {
            assert!(value["bounds"][key].is_number());
        }
        assert!(value["bounds"]["center"]["lat"].is_number());
        assert!(value["bounds"]["center"]["lon"].is_number());
    }

    #[test]
    fn test_round_trip_reproduces_summary() {
        let track = sample_track();
        let imported = Track::from_json(&track.to_json_pretty().unwrap()).unwrap();

        assert_eq!(imported.name(), track.name());
        assert_eq!(imported.points().len(), track.points().len());

        let original = track.summary();
        let again = reaggregate(&imported).unwrap();

        assert_eq!(again.start_time, original.start_time);
        assert_eq!(again.end_time, original.end_time);
        assert_eq!(again.point_count, original.point_count);
        assert_eq!(again.pause_count, original.pause_count);
        assert_eq!(again.max_heart_rate, original.max_heart_rate);
        for (a, b) in [
            (again.duration, original.duration),
            (again.moving_time, original.moving_time),
            (again.pause_time, original.pause_time),
            (again.total_distance, original.total_distance),
            (again.avg_speed, original.avg_speed),
            (again.max_speed, original.max_speed),
            (again.elevation_gain, original.elevation_gain),
            (again.elevation_loss, original.elevation_loss),
            (again.min_elevation, original.min_elevation),
            (again.max_elevation, original.max_elevation),
            (again.avg_moving_speed.unwrap(), original.avg_moving_speed.unwrap()),
            (again.avg_heart_rate.unwrap(), original.avg_heart_rate.unwrap()),
        ] {
            assert!(approx_eq(a, b, 1e-6 * b.abs().max(1.0)), "{} != {}", a, b);
        }
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(Track::from_json("{\"name\": 3}"), Err(TrackError::Json(_))));
    }

    #[test]
    fn test_from_json_rejects_export_without_points() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_track().to_json().unwrap()).unwrap();
        value["points"] = serde_json::json!([]);
        let result = Track::from_json(&value.to_string());
        assert!(matches!(result, Err(TrackError::EmptyTrack)));
    }

    #[test]
    fn test_from_json_recomputes_stats_and_bounds() {
        let track = sample_track();
        let mut value: serde_json::Value = serde_json::from_str(&track.to_json().unwrap()).unwrap();
        let points = value["points"].as_array().unwrap()[..2].to_vec();
        value["points"] = serde_json::Value::Array(points);
        value["stats"]["totalDistance"] = serde_json::json!(-1.0);
        value["bounds"]["north"] = serde_json::json!(0.0);

        let imported = Track::from_json(&value.to_string()).unwrap();
        assert_eq!(imported.points().len(), 2);
        assert_eq!(imported.summary().point_count, 2);
        assert_eq!(imported.summary().total_distance, imported.points()[1].distance);
        assert_eq!(imported.bounds().north, imported.points()[1].latitude);
        assert_eq!(imported.summary(), &reaggregate(&imported).unwrap());
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("Morning Ride"), "Morning_Ride_export.json");
        assert_eq!(export_file_name("Sortie vélo"), "Sortie_v_lo_export.json");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(59.99), "59s");
        assert_eq!(format_duration(60.0), "1m 00s");
        assert_eq!(format_duration(3600.0), "1h 00m 00s");
        assert_eq!(format_duration(36_000.0 + 61.0), "10h 01m 01s");
        assert_eq!(format_duration(-5.0), "0s");
    }

    #[test]
    fn test_preview() {
        let track = sample_track();

        let short = preview(track.points(), 20);
        assert_eq!(short.head.len(), 30);
        assert!(short.tail.is_empty());
        assert_eq!(short.hidden, 0);

        let clipped = preview(track.points(), 10);
        assert_eq!(clipped.head.len(), 10);
        assert_eq!(clipped.tail.len(), 10);
        assert_eq!(clipped.hidden, 10);
        assert_eq!(clipped.head[0].index, 0);
        assert_eq!(clipped.tail[9].index, 29);
    }
}
