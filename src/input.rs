//! Parsing of the user-supplied rectangles and date ranges into the shapes
//! the UP42 job parameters expect.
use crate::error::InputError;
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Closed rectangle ring of `[longitude, latitude]` points.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(transparent)]
pub struct Polygon([[f64; 2]; 5]);

impl Polygon {
    /// Builds the ring from two opposite corners given as `(lat, lon)`.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let (lat0, lon0) = a;
        let (lat1, lon1) = b;
        Self([
            [lon0, lat0],
            [lon1, lat0],
            [lon1, lat1],
            [lon0, lat1],
            [lon0, lat0],
        ])
    }

    /// GeoJSON geometry used for the `intersects` job parameter.
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [self.0],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}T00:00:00+00:00/{}T23:59:59+00:00",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Parses `"lat,lon:lat,lon"`.
pub fn parse_polygon(input: &str) -> Result<Polygon, InputError> {
    let bad = || InputError::Coordinates(input.to_string());

    let corners = input.split(':').collect::<Vec<_>>();
    let [a, b] = corners.as_slice() else {
        return Err(bad());
    };
    let a = parse_point(a).ok_or_else(bad)?;
    let b = parse_point(b).ok_or_else(bad)?;
    Ok(Polygon::from_corners(a, b))
}

fn parse_point(point: &str) -> Option<(f64, f64)> {
    let parts = point.split(',').collect::<Vec<_>>();
    let [lat, lon] = parts.as_slice() else {
        return None;
    };
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some((lat, lon))
}

/// Parses `"YYYY-MM-DD:YYYY-MM-DD"`. Start and end are not ordered.
pub fn parse_time_range(input: &str) -> Result<TimeRange, InputError> {
    let dates = input.split(':').collect::<Vec<_>>();
    let [start, end] = dates.as_slice() else {
        return Err(InputError::Timeframe(input.to_string()));
    };
    Ok(TimeRange {
        start: parse_date(start)?,
        end: parse_date(end)?,
    })
}

fn parse_date(date: &str) -> Result<NaiveDate, InputError> {
    static ISO_DATE: OnceLock<Regex> = OnceLock::new();
    let re = ISO_DATE
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Regex pattern should always compile"));

    if !re.is_match(date) {
        return Err(InputError::Date(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| InputError::Date(date.to_string()))
}

pub fn parse_polygons<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Polygon>, InputError> {
    inputs.iter().map(|s| parse_polygon(s.as_ref())).collect()
}

pub fn parse_time_ranges<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<TimeRange>, InputError> {
    inputs.iter().map(|s| parse_time_range(s.as_ref())).collect()
}
