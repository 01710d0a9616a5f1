#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Request and reply types for the GreenIoT statistics service.
//!
//! A [`DataRequest`] is what goes over the wire (`TimeInterval`, `Region`,
//! `Dataset`, `Statistics`); a [`Query`] is the validated, mode-specific
//! value the widget builds before projecting it onto the wire shape.
//! Replies come back as a [`DataReplyContainer`] holding one [`DataReply`]
//! per requested point or per grid cell.

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Grid resolution hint, in meters, sent with every rectangle query.
pub const DEFAULT_RESOLUTION: u32 = 100;

/// A map-side coordinate as reported by the map surface (`lat`, `lng`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLng {
    /// Latitude in WGS84 degrees.
    pub lat: f64,
    /// Longitude in WGS84 degrees.
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate from a `[lat, lng]` tuple as stored by the
    /// point selection.
    #[must_use]
    pub const fn from_tuple(tuple: [f64; 2]) -> Self {
        Self {
            lat: tuple[0],
            lng: tuple[1],
        }
    }

    /// Returns the coordinate as a `[lat, lng]` tuple.
    #[must_use]
    pub const fn to_tuple(self) -> [f64; 2] {
        [self.lat, self.lng]
    }
}

/// One GPS coordinate as encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LongLat {
    /// Longitude in WGS84 degrees (east-west).
    pub longitude: f64,
    /// Latitude in WGS84 degrees (north-south).
    pub latitude: f64,
}

impl From<LatLng> for LongLat {
    fn from(value: LatLng) -> Self {
        Self {
            longitude: value.lng,
            latitude: value.lat,
        }
    }
}

impl From<LongLat> for LatLng {
    fn from(value: LongLat) -> Self {
        Self {
            lat: value.latitude,
            lng: value.longitude,
        }
    }
}

/// Error returned when a rectangle's north-east corner is not strictly
/// north and east of its south-west corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidRectangleError {
    /// The rejected north-east corner.
    pub north_east: LatLng,
    /// The rejected south-west corner.
    pub south_west: LatLng,
}

impl std::fmt::Display for InvalidRectangleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid rectangle: north-east ({}, {}) is not strictly north-east of south-west ({}, {})",
            self.north_east.lat, self.north_east.lng, self.south_west.lat, self.south_west.lng
        )
    }
}

impl std::error::Error for InvalidRectangleError {}

/// An axis-aligned rectangle in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    north_east: LatLng,
    south_west: LatLng,
}

impl Rectangle {
    /// Creates a rectangle from its north-east and south-west corners.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRectangleError`] unless `north_east` is strictly
    /// north and strictly east of `south_west`.
    pub fn new(north_east: LatLng, south_west: LatLng) -> Result<Self, InvalidRectangleError> {
        if north_east.lat > south_west.lat && north_east.lng > south_west.lng {
            Ok(Self {
                north_east,
                south_west,
            })
        } else {
            Err(InvalidRectangleError {
                north_east,
                south_west,
            })
        }
    }

    /// Creates a rectangle from any two opposite corners.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRectangleError`] if the corners share a latitude or
    /// a longitude (zero-area rectangle).
    pub fn from_corners(a: LatLng, b: LatLng) -> Result<Self, InvalidRectangleError> {
        Self::new(
            LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
            LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
        )
    }

    #[must_use]
    pub const fn north_east(&self) -> LatLng {
        self.north_east
    }

    #[must_use]
    pub const fn south_west(&self) -> LatLng {
        self.south_west
    }

    /// Corners in drawing order, starting and ending at the north-east
    /// corner.
    #[must_use]
    pub const fn ring(&self) -> [LatLng; 5] {
        let ne = self.north_east;
        let sw = self.south_west;
        [
            ne,
            LatLng::new(ne.lat, sw.lng),
            sw,
            LatLng::new(sw.lat, ne.lng),
            ne,
        ]
    }
}

/// Which kind of region the widget collects, read once from the `regType`
/// form field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum RegionMode {
    /// Individual points added by clicking the map.
    #[serde(rename = "pointRegion")]
    #[strum(serialize = "pointRegion")]
    Point,
    /// One rectangle drawn with the drawing tool.
    #[serde(rename = "rectRegion")]
    #[strum(serialize = "rectRegion")]
    Rect,
}

/// Client-side reducer applied to each reply's sample sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Aggregate {
    #[serde(rename = "cMean")]
    #[strum(serialize = "cMean")]
    Mean,
    #[serde(rename = "cStdDev")]
    #[strum(serialize = "cStdDev")]
    StdDev,
    #[serde(rename = "cMax")]
    #[strum(serialize = "cMax")]
    Max,
    #[serde(rename = "cMin")]
    #[strum(serialize = "cMin")]
    Min,
}

/// Server-side trend operation (`Statistics.Operation`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Operation {
    /// No trend curve; the service returns the raw interpolated samples.
    #[default]
    #[serde(rename = "cNone")]
    #[strum(serialize = "cNone")]
    None,
    #[serde(rename = "cMean")]
    #[strum(serialize = "cMean")]
    Mean,
    #[serde(rename = "cStdDev")]
    #[strum(serialize = "cStdDev")]
    StdDev,
    #[serde(rename = "cMax")]
    #[strum(serialize = "cMax")]
    Max,
    #[serde(rename = "cMin")]
    #[strum(serialize = "cMin")]
    Min,
}

impl From<Aggregate> for Operation {
    fn from(value: Aggregate) -> Self {
        match value {
            Aggregate::Mean => Self::Mean,
            Aggregate::StdDev => Self::StdDev,
            Aggregate::Max => Self::Max,
            Aggregate::Min => Self::Min,
        }
    }
}

/// Sampling interval (`Statistics.Interval`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Interval {
    /// Individual sensor readings. Only valid for sensor regions.
    #[serde(rename = "cRawValues")]
    #[strum(serialize = "cRawValues")]
    RawValues,
    /// One value per ten minutes.
    #[serde(rename = "cTenMinutes")]
    #[strum(serialize = "cTenMinutes")]
    TenMinutes,
    /// One value per hour.
    #[default]
    #[serde(rename = "cHour")]
    #[strum(serialize = "cHour")]
    Hour,
    /// One value per day of the week.
    #[serde(rename = "cDayOfWeek")]
    #[strum(serialize = "cDayOfWeek")]
    DayOfWeek,
    /// One value per week.
    #[serde(rename = "cWeek")]
    #[strum(serialize = "cWeek")]
    Week,
    /// One value per month.
    #[serde(rename = "cMonth")]
    #[strum(serialize = "cMonth")]
    Month,
    /// One value per year.
    #[serde(rename = "cYear")]
    #[strum(serialize = "cYear")]
    Year,
}

/// Time interval to retrieve data for. Both ends are passed through as
/// entered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeInterval {
    pub from: String,
    pub to: String,
}

/// Geographic region of a request, tagged by `Type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum Region {
    /// A set of points; replies carry the same positions back.
    #[serde(rename_all = "PascalCase")]
    PointRegion {
        /// Requested positions, in selection order.
        points: Vec<LongLat>,
    },
    /// A grid of points sampled over a rectangle.
    #[serde(rename_all = "PascalCase")]
    RectRegion {
        north_east: LongLat,
        south_west: LongLat,
        /// Approximate grid resolution in meters.
        resolution: u32,
    },
}

/// Post-processing requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statistics {
    pub operation: Operation,
    pub interval: Interval,
    pub get_accuracies: bool,
}

/// The JSON body POSTed to the statistics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataRequest {
    pub time_interval: TimeInterval,
    pub region: Region,
    pub dataset: String,
    pub statistics: Statistics,
}

/// A validated point-mode query.
#[derive(Debug, Clone, PartialEq)]
pub struct PointQuery {
    pub time_range: TimeInterval,
    /// Never empty.
    pub points: Vec<LongLat>,
    pub dataset: String,
    /// Reducer applied client-side when rendering the reply.
    pub operation: Aggregate,
    pub interval: Interval,
}

/// A validated rectangle-mode query. Replies are always meaned per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RectQuery {
    pub time_range: TimeInterval,
    pub rectangle: Rectangle,
    pub resolution: u32,
    pub dataset: String,
    pub interval: Interval,
}

/// One submit's worth of validated input.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Point(PointQuery),
    Rect(RectQuery),
}

impl Query {
    /// Region mode this query was built for.
    #[must_use]
    pub const fn mode(&self) -> RegionMode {
        match self {
            Self::Point(_) => RegionMode::Point,
            Self::Rect(_) => RegionMode::Rect,
        }
    }

    /// Projects the query onto the wire request shape.
    ///
    /// The service is always asked for raw samples (`cNone`); aggregation
    /// happens client-side once the reply arrives.
    #[must_use]
    pub fn to_request(&self) -> DataRequest {
        match self {
            Self::Point(q) => DataRequest {
                time_interval: q.time_range.clone(),
                region: Region::PointRegion {
                    points: q.points.clone(),
                },
                dataset: q.dataset.clone(),
                statistics: Statistics {
                    operation: Operation::None,
                    interval: q.interval,
                    get_accuracies: false,
                },
            },
            Self::Rect(q) => DataRequest {
                time_interval: q.time_range.clone(),
                region: Region::RectRegion {
                    north_east: q.rectangle.north_east().into(),
                    south_west: q.rectangle.south_west().into(),
                    resolution: q.resolution,
                },
                dataset: q.dataset.clone(),
                statistics: Statistics {
                    operation: Operation::None,
                    interval: q.interval,
                    get_accuracies: false,
                },
            },
        }
    }
}

/// Calculated data for one requested point or grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataReply {
    pub position: LongLat,
    /// Accuracy estimate for the data set, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Values per bin. Missing bins decode as `NaN`.
    #[serde(default, deserialize_with = "deserialize_samples")]
    pub data: Vec<f64>,
}

/// Status codes reported in [`DataReplyContainer::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Success,
    SyntaxError,
    InvalidRequest,
    RangeError,
    ServerError,
    /// A code this client does not know.
    Unknown(i32),
}

impl std::fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::SyntaxError => f.write_str("SyntaxError"),
            Self::InvalidRequest => f.write_str("InvalidRequest"),
            Self::RangeError => f.write_str("RangeError"),
            Self::ServerError => f.write_str("ServerError"),
            Self::Unknown(code) => write!(f, "Unknown({code})"),
        }
    }
}

impl ReplyStatus {
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::SyntaxError,
            2 => Self::InvalidRequest,
            3 => Self::RangeError,
            4 => Self::ServerError,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The full reply to one request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataReplyContainer {
    /// Absent in replies from services that only report data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Row-major for rectangle regions.
    #[serde(default)]
    pub replies: Vec<DataReply>,
}

impl DataReplyContainer {
    /// Status of the reply; a missing status counts as success.
    #[must_use]
    pub fn status(&self) -> ReplyStatus {
        self.status.map_or(ReplyStatus::Success, ReplyStatus::from_code)
    }
}

/// What the service reports about itself on a plain `GET`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InfoReply {
    pub organization_info: String,
    pub copy_right: String,
    /// Timestamp of the oldest available data.
    pub oldest: String,
    /// Timestamp of the newest available data, blank while recording.
    pub newest: String,
    /// Seconds past `newest` for which forecasts are produced.
    pub max_forecast: f64,
    pub south_west: LongLat,
    pub north_east: LongLat,
    pub datasets: Vec<String>,
    #[serde(rename = "DataURL")]
    pub data_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSample {
    Number(f64),
    Text(String),
}

fn deserialize_samples<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<RawSample>> = Vec::deserialize(deserializer)?;
    raw.into_iter()
        .map(|sample| match sample {
            None => Ok(f64::NAN),
            Some(RawSample::Number(n)) => Ok(n),
            Some(RawSample::Text(s)) => {
                let trimmed = s.trim();
                if trimmed.eq_ignore_ascii_case("nan") {
                    Ok(f64::NAN)
                } else {
                    trimmed.parse::<f64>().map_err(serde::de::Error::custom)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn uppsala_rect() -> Rectangle {
        Rectangle::new(LatLng::new(59.865, 17.656), LatLng::new(59.857, 17.620)).unwrap()
    }

    #[test]
    fn rectangle_requires_strict_north_east() {
        assert!(Rectangle::new(LatLng::new(59.0, 17.0), LatLng::new(59.0, 16.0)).is_err());
        assert!(Rectangle::new(LatLng::new(60.0, 16.0), LatLng::new(59.0, 17.0)).is_err());
        assert!(Rectangle::new(LatLng::new(60.0, 18.0), LatLng::new(59.0, 17.0)).is_ok());
    }

    #[test]
    fn rectangle_from_corners_normalizes() {
        let rect =
            Rectangle::from_corners(LatLng::new(59.857, 17.656), LatLng::new(59.865, 17.620))
                .unwrap();
        assert_eq!(rect, uppsala_rect());
    }

    #[test]
    fn lat_lng_projects_without_swapping() {
        let ll = LongLat::from(LatLng::from_tuple([59.86, 17.64]));
        assert!((ll.latitude - 59.86).abs() < f64::EPSILON);
        assert!((ll.longitude - 17.64).abs() < f64::EPSILON);
    }

    #[test]
    fn enums_use_service_spellings() {
        assert_eq!(Aggregate::from_str("cStdDev").unwrap(), Aggregate::StdDev);
        assert_eq!(Interval::from_str("cDayOfWeek").unwrap(), Interval::DayOfWeek);
        assert_eq!(RegionMode::from_str("rectRegion").unwrap(), RegionMode::Rect);
        assert!(Aggregate::from_str("none").is_err());
        assert_eq!(Operation::None.to_string(), "cNone");
    }

    #[test]
    fn point_request_serializes_wire_names() {
        let query = Query::Point(PointQuery {
            time_range: TimeInterval {
                from: "2017-01-01 00:00:00".to_string(),
                to: "2017-01-02 00:00:00".to_string(),
            },
            points: vec![LongLat {
                longitude: 17.64,
                latitude: 59.86,
            }],
            dataset: "CO2".to_string(),
            operation: Aggregate::Max,
            interval: Interval::Hour,
        });

        let json = serde_json::to_value(query.to_request()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "TimeInterval": { "From": "2017-01-01 00:00:00", "To": "2017-01-02 00:00:00" },
                "Region": {
                    "Type": "PointRegion",
                    "Points": [{ "Longitude": 17.64, "Latitude": 59.86 }]
                },
                "Dataset": "CO2",
                "Statistics": { "Operation": "cNone", "Interval": "cHour", "GetAccuracies": false }
            })
        );
    }

    #[test]
    fn rect_request_serializes_corners_and_resolution() {
        let query = Query::Rect(RectQuery {
            time_range: TimeInterval::default(),
            rectangle: uppsala_rect(),
            resolution: DEFAULT_RESOLUTION,
            dataset: "NOx".to_string(),
            interval: Interval::Week,
        });

        let json = serde_json::to_value(query.to_request()).unwrap();
        assert_eq!(json["Region"]["Type"], "RectRegion");
        assert_eq!(json["Region"]["NorthEast"]["Latitude"], 59.865);
        assert_eq!(json["Region"]["NorthEast"]["Longitude"], 17.656);
        assert_eq!(json["Region"]["SouthWest"]["Longitude"], 17.620);
        assert_eq!(json["Region"]["Resolution"], 100);
        assert_eq!(json["Statistics"]["Interval"], "cWeek");
    }

    #[test]
    fn reply_container_accepts_nan_bins() {
        let body = serde_json::json!({
            "Status": 0,
            "Message": "Success",
            "Replies": [{
                "Position": { "Latitude": 59.86, "Longitude": 17.64 },
                "Accuracy": 0.5,
                "Data": [1.0, "NAN", null, "2.5"]
            }]
        });

        let container: DataReplyContainer = serde_json::from_value(body).unwrap();
        assert!(container.status().is_success());
        let data = &container.replies[0].data;
        assert_eq!(data.len(), 4);
        assert!((data[0] - 1.0).abs() < f64::EPSILON);
        assert!(data[1].is_nan());
        assert!(data[2].is_nan());
        assert!((data[3] - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn reply_container_without_status_is_success() {
        let container: DataReplyContainer =
            serde_json::from_str(r#"{"Replies": []}"#).unwrap();
        assert_eq!(container.status(), ReplyStatus::Success);
        assert_eq!(ReplyStatus::from_code(3), ReplyStatus::RangeError);
        assert_eq!(ReplyStatus::from_code(9).to_string(), "Unknown(9)");
    }

    #[test]
    fn info_reply_reads_data_url() {
        let info: InfoReply = serde_json::from_value(serde_json::json!({
            "OrganizationInfo": "Uppsala University",
            "Datasets": ["CO2", "NOx"],
            "DataURL": "http://example.invalid/data"
        }))
        .unwrap();
        assert_eq!(info.data_url, "http://example.invalid/data");
        assert_eq!(info.datasets.len(), 2);
        assert!(info.newest.is_empty());
    }
}
