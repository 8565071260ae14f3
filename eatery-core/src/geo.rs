//! Geospatial primitives shared by queries, pipelines and backends.
//!
//! Points follow the GeoJSON convention used by the storage engine: coordinates
//! are ordered `[longitude, latitude]`.

use bson::{Bson, Document, doc};

/// Mean equatorial radius the storage engine uses for spherical GeoJSON
/// distances, in meters.
pub const ENGINE_EARTH_RADIUS_METERS: f64 = 6_378_100.0;

/// A point on the sphere, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Coordinates in storage order (`[lng, lat]`).
    pub fn coordinates(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Renders the point as a GeoJSON `Point` document.
    pub fn to_geojson(&self) -> Document {
        doc! {
            "type": "Point",
            "coordinates": [self.lng, self.lat],
        }
    }

    /// Reads a point back from a stored GeoJSON value.
    ///
    /// Accepts `{ coordinates: [lng, lat] }` documents and bare `[lng, lat]` arrays.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        let coordinates = match value {
            Bson::Document(doc) => doc.get_array("coordinates").ok()?,
            Bson::Array(array) => array,
            _ => return None,
        };

        match coordinates.as_slice() {
            [lng, lat] => Some(Self::new(number(lng)?, number(lat)?)),
            _ => None,
        }
    }

    /// Central angle between two points in radians (haversine formula).
    pub fn central_angle(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

        2.0 * h.sqrt().min(1.0).asin()
    }

    /// Distance to another point in meters, on the engine's sphere.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        self.central_angle(other) * ENGINE_EARTH_RADIUS_METERS
    }
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}
