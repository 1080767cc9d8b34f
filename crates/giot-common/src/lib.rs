//! Common types and utilities shared across the GIoT sensor-data services.

pub mod bbox;
pub mod geo;
pub mod time;

pub use bbox::{BboxError, BoundingBox};
pub use geo::{
    haversine_distance, meters_per_degree_lon, LongLat, EARTH_RADIUS_M, METERS_PER_DEGREE_LAT,
};
pub use time::{format_iso8601, parse_iso8601, TimeParseError, TimeWindow};
