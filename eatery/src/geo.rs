//! Parsing and unit handling for the geospatial endpoints.
//!
//! Invalid parameters are rejected with 400 before any query is built.

use std::str::FromStr;

use eatery_core::geo::GeoPoint;

use crate::error::ApiError;

const EARTH_RADIUS_KM: f64 = 6378.16;
const EARTH_RADIUS_MI: f64 = 3963.2;

const METERS_TO_KM: f64 = 0.001;
const METERS_TO_MI: f64 = 0.000621371;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Km,
    Mi,
}

impl DistanceUnit {
    /// Converts a distance in this unit to a central angle in radians.
    pub fn to_radians(&self, distance: f64) -> f64 {
        match self {
            DistanceUnit::Km => distance / EARTH_RADIUS_KM,
            DistanceUnit::Mi => distance / EARTH_RADIUS_MI,
        }
    }

    /// Factor turning meters into this unit.
    pub fn meters_multiplier(&self) -> f64 {
        match self {
            DistanceUnit::Km => METERS_TO_KM,
            DistanceUnit::Mi => METERS_TO_MI,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "km" => Ok(DistanceUnit::Km),
            "mi" => Ok(DistanceUnit::Mi),
            _ => Err(ApiError::BadRequest(
                "Please provide unit in the format km or mi.".to_string(),
            )),
        }
    }
}

/// Parses a `"lat,lng"` path segment into a point.
pub fn parse_lat_lng(raw: &str) -> Result<GeoPoint, ApiError> {
    let invalid = || {
        ApiError::BadRequest("Please provide latitude and longitude in the format lat,lng.".to_string())
    };

    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }

    Ok(GeoPoint::new(lng, lat))
}

pub fn parse_distance(raw: &str) -> Result<f64, ApiError> {
    raw.parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::BadRequest("Please provide a non-negative numeric distance.".to_string()))
}
