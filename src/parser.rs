//! # GPX Reader
//!
//! Streams a GPX document through `quick-xml` and collects the first track's
//! name, description and trackpoints in document order.
//!
//! Only the pieces the analytics pipeline needs are extracted:
//!
//! | Source | Field |
//! |--------|-------|
//! | `trk > name`, `trk > desc` | track name / description |
//! | `trkpt[lat, lon]` | coordinates (required, WGS84 range) |
//! | `trkpt > ele` | elevation, 0 when absent |
//! | `trkpt > time` | RFC 3339 timestamp |
//! | `trkpt > extensions // speed, hr, cad, power` | optional sensor channels |
//!
//! Extension channels are matched by local name, so vendor prefixes such as
//! `gpxtpx:hr` inside a `TrackPointExtension` are picked up as well.
//! Everything else is ignored.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TrackError};
use crate::{GpsPoint, RawPoint, TimestampPolicy, TrackConfig};

/// Name, description and raw points of the first track in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub name: String,
    pub description: String,
    /// Trackpoints in document order; a point's index is its position here.
    pub points: Vec<RawPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackState {
    NotSeen,
    Inside { depth: usize },
    Done,
}

/// An open element: qualified name (for end-tag matching), local name and
/// the text collected directly inside it so far.
struct OpenElement {
    qname: String,
    local: String,
    text: String,
}

/// Trackpoint under construction.
struct PointBuilder {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    time: Option<String>,
    speed_mps: Option<f64>,
    heart_rate: Option<u32>,
    cadence: Option<f64>,
    power: Option<u32>,
}

/// Parse a GPX document into its first track's raw points.
///
/// Fails with [`TrackError::Format`] when the text is not well-formed markup
/// and with [`TrackError::Schema`] when there is no `trk` element or a
/// trackpoint lacks usable coordinates. A track with zero points is *not* an
/// error here; emptiness is reported by the aggregation step.
///
/// # Example
///
/// ```rust
/// use track_analytics::{parser, TrackConfig};
///
/// let gpx = r#"<gpx><trk><name>Lunch run</name><trkseg>
///     <trkpt lat="45.0" lon="6.0"><ele>1000</ele><time>2024-05-01T12:00:00Z</time></trkpt>
/// </trkseg></trk></gpx>"#;
///
/// let doc = parser::parse_document(gpx, &TrackConfig::default()).unwrap();
/// assert_eq!(doc.name, "Lunch run");
/// assert_eq!(doc.points.len(), 1);
/// assert_eq!(doc.points[0].elevation, 1000.0);
/// ```
pub fn parse_document(document: &str, config: &TrackConfig) -> Result<ParsedDocument> {
    let mut reader = Reader::from_str(document);
    reader.trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut saw_root = false;
    let mut collector = TrackCollector::new(config);

    loop {
        let event = reader.read_event().map_err(|e| {
            TrackError::Format(format!("error at position {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                if stack.is_empty() {
                    if saw_root {
                        return Err(TrackError::Format("multiple root elements".to_string()));
                    }
                    saw_root = true;
                }

                let element = open_element(e)?;
                collector.open(&element, e, stack.len())?;

                if matches!(event, Event::Empty(_)) {
                    collector.close(&element, &stack, "")?;
                } else {
                    stack.push(element);
                }
            }
            Event::End(ref e) => {
                let qname = utf8(e.name().as_ref())?;
                let element = match stack.pop() {
                    Some(open) if open.qname == qname => open,
                    Some(open) => {
                        return Err(TrackError::Format(format!(
                            "expected </{}>, found </{}>",
                            open.qname, qname
                        )))
                    }
                    None => {
                        return Err(TrackError::Format(format!("unexpected </{}>", qname)))
                    }
                };
                collector.close(&element, &stack, element.text.trim())?;
            }
            Event::Text(ref t) => {
                let Some(open) = stack.last_mut() else {
                    return Err(TrackError::Format("text outside of the root element".to_string()));
                };
                let unescaped = t
                    .unescape()
                    .map_err(|e| TrackError::Format(e.to_string()))?;
                open.text.push_str(&unescaped);
            }
            Event::CData(t) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(TrackError::Format(format!("unclosed element <{}>", open.qname)));
    }
    if !saw_root {
        return Err(TrackError::Format("document has no root element".to_string()));
    }

    collector.finish()
}

/// Accumulates the first track while the reader walks the document.
struct TrackCollector<'a> {
    config: &'a TrackConfig,
    track: TrackState,
    name: Option<String>,
    description: Option<String>,
    current: Option<PointBuilder>,
    points: Vec<RawPoint>,
}

impl<'a> TrackCollector<'a> {
    fn new(config: &'a TrackConfig) -> Self {
        Self {
            config,
            track: TrackState::NotSeen,
            name: None,
            description: None,
            current: None,
            points: Vec::new(),
        }
    }

    fn open(&mut self, element: &OpenElement, e: &BytesStart, depth: usize) -> Result<()> {
        match self.track {
            TrackState::NotSeen if element.local == "trk" => {
                self.track = TrackState::Inside { depth };
            }
            TrackState::Inside { .. } if element.local == "trkpt" => {
                self.current = Some(start_point(e, self.points.len())?);
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, element: &OpenElement, parents: &[OpenElement], content: &str) -> Result<()> {
        let TrackState::Inside { depth } = self.track else {
            return Ok(());
        };
        let parent = parents.last().map(|p| p.local.as_str());

        match element.local.as_str() {
            "trk" if parents.len() == depth => {
                self.track = TrackState::Done;
            }
            "name" if parent == Some("trk") && self.name.is_none() => {
                self.name = Some(content.to_string());
            }
            "desc" if parent == Some("trk") && self.description.is_none() => {
                self.description = Some(content.to_string());
            }
            "trkpt" => {
                if let Some(builder) = self.current.take() {
                    let previous = self.points.last().and_then(|p| p.time);
                    let point = finish_point(builder, self.points.len(), previous, self.config)?;
                    self.points.push(point);
                }
            }
            local => {
                let index = self.points.len();
                if let Some(builder) = self.current.as_mut() {
                    read_point_child(builder, local, parents, content, index)?;
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<ParsedDocument> {
        if self.track == TrackState::NotSeen {
            return Err(TrackError::Schema("no <trk> element found".to_string()));
        }

        debug!("Parsed {} trackpoints", self.points.len());

        Ok(ParsedDocument {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| self.config.default_name.clone()),
            description: self.description.unwrap_or_default(),
            points: self.points,
        })
    }
}

/// Read the tag's name and check every attribute is well-formed and unique.
fn open_element(e: &BytesStart) -> Result<OpenElement> {
    for attr in e.attributes() {
        attr.map_err(|err| TrackError::Format(err.to_string()))?;
    }
    Ok(OpenElement {
        qname: utf8(e.name().as_ref())?,
        local: utf8(e.local_name().as_ref())?,
        text: String::new(),
    })
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| TrackError::Format(e.to_string()))
}

fn start_point(e: &BytesStart, index: usize) -> Result<PointBuilder> {
    let position = GpsPoint::new(coordinate(e, "lat", index)?, coordinate(e, "lon", index)?);
    if !position.is_valid() {
        return Err(TrackError::Schema(format!(
            "trackpoint {}: coordinates ({}, {}) out of range",
            index, position.latitude, position.longitude
        )));
    }

    Ok(PointBuilder {
        latitude: position.latitude,
        longitude: position.longitude,
        elevation: None,
        time: None,
        speed_mps: None,
        heart_rate: None,
        cadence: None,
        power: None,
    })
}

fn coordinate(e: &BytesStart, key: &str, index: usize) -> Result<f64> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TrackError::Format(err.to_string()))?;
        if attr.key.local_name().as_ref() != key.as_bytes() {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|err| TrackError::Format(err.to_string()))?;
        return match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(TrackError::Schema(format!(
                "trackpoint {}: invalid {} attribute '{}'",
                index, key, value
            ))),
        };
    }
    Err(TrackError::Schema(format!(
        "trackpoint {}: missing {} attribute",
        index, key
    )))
}

fn read_point_child(
    builder: &mut PointBuilder,
    local: &str,
    parents: &[OpenElement],
    content: &str,
    index: usize,
) -> Result<()> {
    if content.is_empty() {
        return Ok(());
    }

    let parent = parents.last().map(|p| p.local.as_str());

    if parent == Some("trkpt") {
        match local {
            "ele" => {
                let ele = content.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                    TrackError::Schema(format!("trackpoint {}: invalid elevation '{}'", index, content))
                })?;
                builder.elevation = Some(ele);
            }
            "time" => builder.time = Some(content.to_string()),
            _ => {}
        }
        return Ok(());
    }

    let in_extensions = parents
        .iter()
        .rev()
        .take_while(|p| p.local != "trkpt")
        .any(|p| p.local == "extensions");
    if !in_extensions {
        return Ok(());
    }

    match local {
        "speed" => builder.speed_mps = channel(content, index, local, parse_decimal),
        "hr" => builder.heart_rate = channel(content, index, local, parse_integer),
        "cad" => builder.cadence = channel(content, index, local, parse_decimal),
        "power" => builder.power = channel(content, index, local, parse_integer),
        _ => {}
    }
    Ok(())
}

fn channel<T>(content: &str, index: usize, label: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let value = parse(content);
    if value.is_none() {
        warn!("Trackpoint {}: ignoring unparseable <{}> value '{}'", index, label, content);
    }
    value
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer channel; decimal input is truncated toward zero.
fn parse_integer(text: &str) -> Option<u32> {
    text.parse::<u32>().ok().or_else(|| {
        parse_decimal(text)
            .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v.trunc() as u32)
    })
}

/// Parse a GPX timestamp. Values without an offset are read as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn finish_point(
    builder: PointBuilder,
    index: usize,
    previous_time: Option<DateTime<Utc>>,
    config: &TrackConfig,
) -> Result<RawPoint> {
    let time = match builder.time.as_deref() {
        Some(text) => {
            let parsed = parse_timestamp(text);
            if parsed.is_none() {
                if config.timestamp_policy == TimestampPolicy::Strict {
                    return Err(TrackError::Schema(format!(
                        "trackpoint {}: unparseable timestamp '{}'",
                        index, text
                    )));
                }
                warn!("Trackpoint {}: unparseable timestamp '{}'", index, text);
            }
            parsed
        }
        None => {
            if config.timestamp_policy == TimestampPolicy::Strict {
                return Err(TrackError::Schema(format!(
                    "trackpoint {}: missing timestamp",
                    index
                )));
            }
            warn!("Trackpoint {}: missing timestamp", index);
            None
        }
    };

    if config.timestamp_policy == TimestampPolicy::Strict {
        if let (Some(prev), Some(now)) = (previous_time, time) {
            if now < prev {
                return Err(TrackError::Schema(format!(
                    "trackpoint {}: timestamp {} precedes previous point",
                    index,
                    now.to_rfc3339()
                )));
            }
        }
    }

    Ok(RawPoint {
        latitude: builder.latitude,
        longitude: builder.longitude,
        elevation: builder.elevation.unwrap_or(0.0),
        time,
        speed_mps: builder.speed_mps,
        heart_rate: builder.heart_rate,
        cadence: builder.cadence,
        power: builder.power,
    })
}
