// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance and user coordinate parsing.

use geo::Point;
use validator::Validate;

/// Mean Earth radius used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two optional coordinates.
///
/// Returns `f64::INFINITY` if any coordinate is missing, so a shop without a
/// location is simply never "close enough".
pub fn distance_km(
    lat1: Option<f64>,
    lon1: Option<f64>,
    lat2: Option<f64>,
    lon2: Option<f64>,
) -> f64 {
    match (lat1, lon1, lat2, lon2) {
        (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => {
            haversine_km(Point::new(lon1, lat1), Point::new(lon2, lat2))
        }
        _ => f64::INFINITY,
    }
}

/// Haversine distance in kilometers between two points (x = lon, y = lat).
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.y().to_radians().cos() * b.y().to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Round a distance for display (two decimals).
///
/// Non-finite distances have no meaningful display value and map to `None`.
pub fn round_km(distance: f64) -> Option<f64> {
    distance
        .is_finite()
        .then(|| (distance * 100.0).round() / 100.0)
}

/// A validated user position.
#[derive(Debug, Clone, Copy, PartialEq, Validate)]
pub struct Coordinates {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

impl Coordinates {
    /// Parse raw latitude/longitude text as submitted by a client.
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Result<Self, CoordinateError> {
        let coords = Self {
            lat: parse_component(lat)?,
            lon: parse_component(lon)?,
        };
        coords
            .validate()
            .map_err(|_| CoordinateError::OutOfRange)?;
        Ok(coords)
    }

    /// Parse an optional position: both parts absent means "no position".
    pub fn parse_optional(
        lat: Option<&str>,
        lon: Option<&str>,
    ) -> Result<Option<Self>, CoordinateError> {
        let present = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
        if !present(lat) && !present(lon) {
            return Ok(None);
        }
        Self::parse(lat, lon).map(Some)
    }

    /// Distance from this position to an optional location.
    pub fn distance_to(&self, lat: Option<f64>, lon: Option<f64>) -> f64 {
        distance_km(Some(self.lat), Some(self.lon), lat, lon)
    }
}

fn parse_component(raw: Option<&str>) -> Result<f64, CoordinateError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CoordinateError::Missing)?;
    let value: f64 = raw
        .parse()
        .map_err(|_| CoordinateError::NotANumber(raw.to_string()))?;
    if !value.is_finite() {
        return Err(CoordinateError::NotANumber(raw.to_string()));
    }
    Ok(value)
}

/// Errors from coordinate parsing.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CoordinateError {
    #[error("Coordinates are required")]
    Missing,

    #[error("Invalid coordinate value: {0}")]
    NotANumber(String),

    #[error("Coordinates out of range")]
    OutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DA_NANG: (f64, f64) = (16.0544, 108.2022);
    const HANOI: (f64, f64) = (21.0285, 105.8542);

    fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
        distance_km(Some(a.0), Some(a.1), Some(b.0), Some(b.1))
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(dist(DA_NANG, DA_NANG), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = dist(DA_NANG, HANOI);
        let ba = dist(HANOI, DA_NANG);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // Da Nang to Hanoi is roughly 610 km as the crow flies
        let d = dist(DA_NANG, HANOI);
        assert!(d > 600.0 && d < 625.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = dist((0.0, 0.0), (1.0, 0.0));
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_with_separation() {
        let mut last = 0.0;
        for step in 1..=20 {
            let d = dist((10.0, 100.0), (10.0 + step as f64 * 0.01, 100.0));
            assert!(d > last);
            last = d;
        }
    }

    #[test]
    fn test_missing_coordinate_is_infinite() {
        assert!(distance_km(None, Some(1.0), Some(1.0), Some(1.0)).is_infinite());
        assert!(distance_km(Some(1.0), Some(1.0), Some(1.0), None).is_infinite());
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(1.2549), Some(1.25));
        assert_eq!(round_km(0.0), Some(0.0));
        assert_eq!(round_km(f64::INFINITY), None);
    }

    #[test]
    fn test_parse_coordinates() {
        let c = Coordinates::parse(Some(" 16.05 "), Some("108.2")).unwrap();
        assert_eq!(c.lat, 16.05);
        assert_eq!(c.lon, 108.2);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            Coordinates::parse(Some("abc"), Some("1.0")),
            Err(CoordinateError::NotANumber("abc".to_string()))
        );
        assert_eq!(
            Coordinates::parse(Some("NaN"), Some("1.0")),
            Err(CoordinateError::NotANumber("NaN".to_string()))
        );
        assert_eq!(
            Coordinates::parse(None, Some("1.0")),
            Err(CoordinateError::Missing)
        );
        assert_eq!(
            Coordinates::parse(Some("91"), Some("1.0")),
            Err(CoordinateError::OutOfRange)
        );
        assert_eq!(
            Coordinates::parse(Some("10"), Some("-181")),
            Err(CoordinateError::OutOfRange)
        );
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(Coordinates::parse_optional(None, None), Ok(None));
        assert_eq!(Coordinates::parse_optional(Some(""), Some(" ")), Ok(None));
        assert!(Coordinates::parse_optional(Some("1"), None).is_err());
        assert!(Coordinates::parse_optional(Some("1"), Some("2"))
            .unwrap()
            .is_some());
    }
}
