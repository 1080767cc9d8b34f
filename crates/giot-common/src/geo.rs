//! WGS84 coordinates and distance helpers.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Length of one degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// One GPS coordinate in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LongLat {
    /// Longitude (east-west).
    pub longitude: f64,
    /// Latitude (north-south).
    pub latitude: f64,
}

impl LongLat {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Both components are finite and inside the WGS84 value ranges.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }

    /// Great-circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: &LongLat) -> f64 {
        haversine_distance(self.longitude, self.latitude, other.longitude, other.latitude)
    }

}

/// Length of one degree of longitude at the given latitude.
pub fn meters_per_degree_lon(latitude: f64) -> f64 {
    // Clamp near the poles to avoid division by zero
    METERS_PER_DEGREE_LAT * latitude.to_radians().cos().max(0.01)
}

/// Haversine distance between two points in meters.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}
