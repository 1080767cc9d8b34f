//! Common test fixtures for GIoT tests.
//!
//! Everything is placed in and around central Uppsala, which is also the
//! area of the sample coverage in `services/giot-query/config`.

use chrono::{DateTime, Duration, Utc};
use giot_common::{parse_iso8601, LongLat};
use sensor_store::{Placement, PositionFix, RawSample, SensorRecord};

/// Corners of the covered test area.
pub mod area {
    /// South-west corner (longitude, latitude).
    pub const SOUTH_WEST: (f64, f64) = (17.55, 59.80);

    /// North-east corner (longitude, latitude).
    pub const NORTH_EAST: (f64, f64) = (17.75, 59.90);

    /// Uppsala cathedral, well inside the area.
    pub const CATHEDRAL: (f64, f64) = (17.6339, 59.8581);

    /// Stockholm, outside the area.
    pub const STOCKHOLM: (f64, f64) = (18.0686, 59.3293);
}

/// Coverage document matching [`area`], data from 2010 to 2020 with one
/// day of forecast.
pub const COVERAGE_YAML: &str = r#"
organization_info: "Test Organization, Uppsala"
copy_right: "CC0"
oldest: "2010-01-01T00:00:00Z"
newest: "2020-12-31T00:00:00Z"
max_forecast_secs: 86400
south_west: { Longitude: 17.55, Latitude: 59.80 }
north_east: { Longitude: 17.75, Latitude: 59.90 }
datasets: ["NO2", "PM10", "Noise"]
data_url: "http://localhost:8090/data"
"#;

/// Build a `LongLat` from a `(longitude, latitude)` tuple.
pub fn lon_lat(p: (f64, f64)) -> LongLat {
    LongLat::new(p.0, p.1)
}

/// Parse a timestamp, panicking on malformed input.
pub fn ts(s: &str) -> DateTime<Utc> {
    parse_iso8601(s).unwrap_or_else(|e| panic!("bad fixture timestamp {}: {}", s, e))
}

/// A stationary sensor installed on 2010-01-01.
pub fn fixed_sensor(id: &str, dataset: &str, position: LongLat) -> SensorRecord {
    SensorRecord {
        unique_id: id.to_string(),
        dataset: dataset.to_string(),
        placement: Placement::Fixed { position },
        installation_date: ts("2010-01-01T00:00:00Z"),
        exstallation_date: None,
        calibration_dates: vec![ts("2012-01-15T00:00:00Z"), ts("2012-04-20T00:00:00Z")],
        manufacturer: "Acme Sensors".to_string(),
        model: "AQ-1".to_string(),
        serial: format!("SN-{}", id),
        sample_time_secs: 60.0,
    }
}

/// A vehicle mounted sensor following `track`.
pub fn moving_sensor(id: &str, dataset: &str, track: &[(&str, LongLat)]) -> SensorRecord {
    let track = track
        .iter()
        .map(|(time, position)| PositionFix {
            time: ts(time),
            position: *position,
        })
        .collect();
    SensorRecord {
        placement: Placement::Moving { track },
        model: "Mobile-2".to_string(),
        ..fixed_sensor(id, dataset, LongLat::default())
    }
}

/// Samples at the given `(timestamp, value)` pairs, all with `accuracy`.
pub fn samples(points: &[(&str, f64)], accuracy: f64) -> Vec<RawSample> {
    points
        .iter()
        .map(|(time, value)| RawSample::new(ts(time), *value, accuracy))
        .collect()
}

/// `values.len()` samples spaced `step` apart from `start`.
pub fn regular_samples(
    start: DateTime<Utc>,
    step: Duration,
    values: &[f64],
    accuracy: f64,
) -> Vec<RawSample> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| RawSample::new(start + step * i as i32, *v, accuracy))
        .collect()
}
