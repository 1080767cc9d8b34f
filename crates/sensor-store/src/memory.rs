//! In-memory sensor store.
//!
//! Backs the query engine in tests and in the command line tool, where the
//! sensor park is loaded from a fixture file at startup and is read-only
//! afterwards.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use giot_common::{BoundingBox, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::{SampleFetcher, SensorLocator};
use crate::types::{Placement, RawSample, SensorRecord};

/// One sensor of a fixture file together with its readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorFixture {
    #[serde(flatten)]
    pub sensor: SensorRecord,
    #[serde(default)]
    pub samples: Vec<RawSample>,
}

/// Contents of a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub sensors: Vec<SensorFixture>,
}

impl StoreFixture {
    /// Read a fixture; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load_from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let fixture = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(fixture)
    }
}

/// Sensors and samples held in memory.
///
/// Sensors are returned in insertion order; samples of each sensor are kept
/// sorted by time.
#[derive(Debug, Default)]
pub struct MemorySensorStore {
    sensors: Vec<SensorRecord>,
    samples: HashMap<String, Vec<RawSample>>,
}

impl MemorySensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a parsed fixture.
    pub fn from_fixture(fixture: StoreFixture) -> StoreResult<Self> {
        let mut store = Self::new();
        for entry in fixture.sensors {
            let id = entry.sensor.unique_id.clone();
            store.insert_sensor(entry.sensor)?;
            store.add_samples(&id, entry.samples);
        }
        info!(
            sensors = store.sensors.len(),
            samples = store.sample_count(),
            "Loaded sensor fixture"
        );
        Ok(store)
    }

    /// Load a store from a YAML or JSON fixture file.
    pub fn load_from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_fixture(StoreFixture::load_from_file(path)?)
    }

    /// Register a sensor; a sensor with the same id is replaced in place.
    pub fn insert_sensor(&mut self, sensor: SensorRecord) -> StoreResult<()> {
        if sensor.unique_id.trim().is_empty() {
            return Err(StoreError::InvalidSensor("blank unique id".to_string()));
        }
        if let Placement::Moving { track } = &sensor.placement {
            if track.is_empty() {
                return Err(StoreError::InvalidSensor(format!(
                    "moving sensor {} has an empty track",
                    sensor.unique_id
                )));
            }
        }

        let mut sensor = sensor;
        if let Placement::Moving { track } = &mut sensor.placement {
            track.sort_by_key(|fix| fix.time);
        }

        match self
            .sensors
            .iter_mut()
            .find(|s| s.unique_id == sensor.unique_id)
        {
            Some(existing) => *existing = sensor,
            None => self.sensors.push(sensor),
        }
        Ok(())
    }

    /// Append readings of a sensor.
    pub fn add_samples(&mut self, unique_id: &str, samples: impl IntoIterator<Item = RawSample>) {
        let entry = self.samples.entry(unique_id.to_string()).or_default();
        entry.extend(samples);
        entry.sort_by_key(|s| s.time);
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl SensorLocator for MemorySensorStore {
    async fn locate(
        &self,
        bbox: &BoundingBox,
        window: &TimeWindow,
        dataset: &str,
    ) -> StoreResult<Vec<SensorRecord>> {
        let found: Vec<SensorRecord> = self
            .sensors
            .iter()
            .filter(|s| s.dataset == dataset && s.is_active_during(window))
            .filter(|s| s.positions_during(window).iter().any(|p| bbox.contains(p)))
            .cloned()
            .collect();

        debug!(dataset, count = found.len(), "Located sensors");
        Ok(found)
    }

    async fn find(&self, unique_id: &str) -> StoreResult<Option<SensorRecord>> {
        Ok(self
            .sensors
            .iter()
            .find(|s| s.unique_id == unique_id)
            .cloned())
    }
}

#[async_trait]
impl SampleFetcher for MemorySensorStore {
    async fn fetch(&self, unique_id: &str, window: &TimeWindow) -> StoreResult<Vec<RawSample>> {
        let Some(samples) = self.samples.get(unique_id) else {
            return Ok(Vec::new());
        };

        let start = samples.partition_point(|s| s.time < window.start);
        let end = samples.partition_point(|s| s.time <= window.end);
        Ok(samples[start..end].to_vec())
    }
}
