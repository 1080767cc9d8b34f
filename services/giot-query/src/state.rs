//! Application state for the query front end.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use giot_protocol::{DataReplyContainer, InfoReply};
use query_engine::{CoverageConfig, EngineConfig, QueryEngine};
use sensor_store::MemorySensorStore;

/// Loaded configuration and the engine built from it.
pub struct AppState {
    pub engine: QueryEngine,
}

impl AppState {
    /// Load coverage and sensor fixture from disk; engine tuning comes from
    /// the environment.
    pub fn load(coverage_path: impl AsRef<Path>, sensors_path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(EngineConfig::from_env(), coverage_path, sensors_path)
    }

    pub fn load_with(
        config: EngineConfig,
        coverage_path: impl AsRef<Path>,
        sensors_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let coverage_path = coverage_path.as_ref();
        let sensors_path = sensors_path.as_ref();

        let coverage = CoverageConfig::load_from_file(coverage_path)
            .with_context(|| format!("Failed to load coverage: {:?}", coverage_path))?;
        let store = MemorySensorStore::load_from_file(sensors_path)
            .with_context(|| format!("Failed to load sensors: {:?}", sensors_path))?;

        tracing::info!(
            sensors = store.sensor_count(),
            samples = store.sample_count(),
            "Sensor store ready"
        );

        let engine = QueryEngine::with_store(config, coverage, Arc::new(store))
            .context("Invalid engine configuration")?;
        Ok(Self { engine })
    }

    pub fn info(&self) -> InfoReply {
        self.engine.info()
    }

    /// Answer one JSON request.
    pub async fn query(&self, request_json: &str) -> DataReplyContainer {
        self.engine.handle_json(request_json).await
    }
}
