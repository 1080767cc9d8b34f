//! Sensor and sample types returned by the storage collaborators.

use chrono::{DateTime, Utc};
use giot_common::{LongLat, TimeWindow};
use serde::{Deserialize, Serialize};

/// One raw reading of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub time: DateTime<Utc>,
    pub value: f64,
    /// Confidence in the reading, 0 (worthless) to 1 (exact).
    pub accuracy: f64,
}

impl RawSample {
    pub fn new(time: DateTime<Utc>, value: f64, accuracy: f64) -> Self {
        Self {
            time,
            value,
            accuracy,
        }
    }
}

/// A timestamped position of a moving sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub time: DateTime<Utc>,
    pub position: LongLat,
}

/// Where a sensor is mounted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Installed at one location.
    Fixed { position: LongLat },
    /// Mounted on a vehicle; the track is ordered by time.
    Moving { track: Vec<PositionFix> },
}

/// Everything the storage layer knows about one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// System wide unique id.
    pub unique_id: String,
    /// Measurement type this sensor produces.
    pub dataset: String,
    pub placement: Placement,
    pub installation_date: DateTime<Utc>,
    /// Removal date; `None` while the sensor is active.
    #[serde(default)]
    pub exstallation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub calibration_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial: String,
    /// Sampling time in seconds.
    #[serde(default)]
    pub sample_time_secs: f64,
}

impl SensorRecord {
    pub fn is_moving(&self) -> bool {
        matches!(self.placement, Placement::Moving { .. })
    }

    /// Whether the sensor was installed at some point of `window`.
    pub fn is_active_during(&self, window: &TimeWindow) -> bool {
        if self.installation_date > window.end {
            return false;
        }
        match self.exstallation_date {
            Some(removed) => removed >= window.start,
            None => true,
        }
    }

    /// Position at time `t`: the latest fix at or before `t`, or the first
    /// fix when `t` precedes the track. `None` for an empty track.
    pub fn position_at(&self, t: DateTime<Utc>) -> Option<LongLat> {
        match &self.placement {
            Placement::Fixed { position } => Some(*position),
            Placement::Moving { track } => track
                .iter()
                .take_while(|fix| fix.time <= t)
                .last()
                .or_else(|| track.first())
                .map(|fix| fix.position),
        }
    }

    /// Positions the sensor occupied during `window`, starting with the
    /// position it had when the window opened.
    pub fn positions_during(&self, window: &TimeWindow) -> Vec<LongLat> {
        match &self.placement {
            Placement::Fixed { position } => vec![*position],
            Placement::Moving { track } => {
                let mut positions: Vec<LongLat> =
                    self.position_at(window.start).into_iter().collect();
                positions.extend(
                    track
                        .iter()
                        .filter(|fix| fix.time > window.start && fix.time <= window.end)
                        .map(|fix| fix.position),
                );
                positions
            }
        }
    }

    /// Whether the sensor changed position during `window`.
    pub fn moved_during(&self, window: &TimeWindow) -> bool {
        if !self.is_moving() {
            return false;
        }
        let positions = self.positions_during(window);
        positions
            .first()
            .is_some_and(|first| positions.iter().any(|p| p != first))
    }

    /// Newest calibration that falls inside `window`.
    pub fn newest_calibration_in(&self, window: &TimeWindow) -> Option<DateTime<Utc>> {
        self.calibration_dates
            .iter()
            .filter(|d| window.contains(d))
            .max()
            .copied()
    }
}
