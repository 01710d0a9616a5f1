#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Form validation and query construction.
//!
//! [`build`] checks the form fields in a fixed order and stops at the first
//! problem, so the user always sees the earliest missing input. On success
//! it snapshots the current selection into a fresh [`Query`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use giot_vis_geometry::GeometrySelector;
use giot_vis_query_models::{
    Aggregate, DEFAULT_RESOLUTION, Interval, PointQuery, Query, RectQuery, RegionMode,
    TimeInterval,
};
use thiserror::Error;

/// Placeholder value of an unselected drop-down.
pub const UNSELECTED: &str = "none";

/// Date/time layouts accepted for the time range ordering check.
const TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Raw values of the page's input fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields {
    /// `fromDate`
    pub from_date: String,
    /// `toDate`
    pub to_date: String,
    /// `regType`: `pointRegion` or `rectRegion`.
    pub reg_type: String,
    /// `dataType`
    pub data_type: String,
    /// `operation`: `none` or one of `cMean`, `cStdDev`, `cMax`, `cMin`.
    pub operation: String,
    /// `interval`
    pub interval: String,
}

impl FormFields {
    /// An untouched form for the given region type.
    #[must_use]
    pub fn new(mode: RegionMode) -> Self {
        Self {
            from_date: String::new(),
            to_date: String::new(),
            reg_type: mode.to_string(),
            data_type: UNSELECTED.to_string(),
            operation: UNSELECTED.to_string(),
            interval: UNSELECTED.to_string(),
        }
    }

    /// Empties the dates and sets every drop-down back to `none`. The
    /// region type is left alone.
    pub fn reset(&mut self) {
        self.from_date.clear();
        self.to_date.clear();
        UNSELECTED.clone_into(&mut self.data_type);
        UNSELECTED.clone_into(&mut self.operation);
        UNSELECTED.clone_into(&mut self.interval);
    }
}

/// Why a submit was refused. The display text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a start date!")]
    MissingStartTime,

    #[error("Please enter an end date!")]
    MissingEndTime,

    #[error("Please select a data type!")]
    MissingDataset,

    #[error("Please select an operation!")]
    MissingOperation,

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Please select an interval!")]
    MissingInterval,

    #[error("Unknown interval '{0}'")]
    UnknownInterval(String),

    #[error("Please select points on the map!")]
    MissingPoints,

    #[error("Please draw a rectangular region on the map!")]
    MissingRectangle,

    /// The selection was made for the other region type.
    #[error("The selection on the map is for a {actual} query, not {expected}")]
    ModeMismatch {
        expected: RegionMode,
        actual: RegionMode,
    },

    #[error("Raw values are only available for sensor regions, please pick another interval!")]
    RawValuesUnsupported,

    #[error("The start date must not be after the end date!")]
    InvalidTimeRange,
}

/// Validates `form` and builds the query for `mode` from the current
/// selection.
///
/// Checks run in this order and the first failure wins: start time, end
/// time, dataset, operation (point mode only), interval, selection. The
/// interval kind and time range order are checked after that.
///
/// # Errors
///
/// Returns the first [`ValidationError`] that applies.
pub fn build(
    mode: RegionMode,
    form: &FormFields,
    geometry: &GeometrySelector,
) -> Result<Query, ValidationError> {
    let result = build_inner(mode, form, geometry);
    if let Err(e) = &result {
        log::warn!("Rejected {mode} submit: {e:?}");
    }
    result
}

fn build_inner(
    mode: RegionMode,
    form: &FormFields,
    geometry: &GeometrySelector,
) -> Result<Query, ValidationError> {
    let from = form.from_date.trim();
    if from.is_empty() {
        return Err(ValidationError::MissingStartTime);
    }

    let to = form.to_date.trim();
    if to.is_empty() {
        return Err(ValidationError::MissingEndTime);
    }

    let dataset = form.data_type.trim();
    if dataset.is_empty() || dataset == UNSELECTED {
        return Err(ValidationError::MissingDataset);
    }

    let operation: Option<Aggregate> = match mode {
        RegionMode::Point => Some(parse_selection(
            &form.operation,
            ValidationError::MissingOperation,
            ValidationError::UnknownOperation,
        )?),
        RegionMode::Rect => None,
    };

    let interval: Interval = parse_selection(
        &form.interval,
        ValidationError::MissingInterval,
        ValidationError::UnknownInterval,
    )?;

    if geometry.mode() != mode {
        return Err(ValidationError::ModeMismatch {
            expected: mode,
            actual: geometry.mode(),
        });
    }

    let time_range = TimeInterval {
        from: from.to_string(),
        to: to.to_string(),
    };

    let query = match (mode, operation) {
        (RegionMode::Point, Some(operation)) => {
            let points = geometry.long_lats();
            if points.is_empty() {
                return Err(ValidationError::MissingPoints);
            }
            Query::Point(PointQuery {
                time_range,
                points,
                dataset: dataset.to_string(),
                operation,
                interval,
            })
        }
        (RegionMode::Point, None) => return Err(ValidationError::MissingOperation),
        (RegionMode::Rect, _) => {
            let rectangle = *geometry
                .rectangle()
                .ok_or(ValidationError::MissingRectangle)?;
            Query::Rect(RectQuery {
                time_range,
                rectangle,
                resolution: DEFAULT_RESOLUTION,
                dataset: dataset.to_string(),
                interval,
            })
        }
    };

    if interval == Interval::RawValues {
        return Err(ValidationError::RawValuesUnsupported);
    }

    if let (Some(start), Some(end)) = (parse_time(from), parse_time(to)) {
        if start > end {
            return Err(ValidationError::InvalidTimeRange);
        }
    }

    Ok(query)
}

/// Parses a drop-down value, distinguishing "nothing picked" from "picked
/// something this client does not know".
fn parse_selection<T: FromStr>(
    raw: &str,
    missing: ValidationError,
    unknown: fn(String) -> ValidationError,
) -> Result<T, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == UNSELECTED {
        return Err(missing);
    }
    raw.parse::<T>().map_err(|_| unknown(raw.to_string()))
}

fn parse_time(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Parses a client-side reducer name (`cMean`, `cStdDev`, `cMax`, `cMin`).
///
/// # Errors
///
/// Returns [`ValidationError::MissingOperation`] for `none` or an empty
/// value and [`ValidationError::UnknownOperation`] for anything else that
/// is not a known reducer.
pub fn parse_aggregate(raw: &str) -> Result<Aggregate, ValidationError> {
    parse_selection(
        raw,
        ValidationError::MissingOperation,
        ValidationError::UnknownOperation,
    )
}
