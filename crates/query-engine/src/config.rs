//! Configuration for the query engine.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use giot_common::{format_iso8601, BoundingBox, LongLat};
use giot_protocol::InfoReply;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Tuning knobs of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sensors farther than this from a query point do not contribute.
    pub search_radius_m: f64,

    /// Upper bound on concurrent raw sample fetches per request.
    pub max_concurrent_fetches: usize,

    /// Deadline for sensor lookup and sample fetching of one request.
    pub request_timeout_secs: u64,

    /// Largest grid a rectangle region may resolve to.
    pub max_grid_points: usize,

    /// Largest number of bins a linear time plan may contain.
    pub max_bins: usize,

    /// Native grid spacing of pre-gridded data; grid steps snap to
    /// `native * 2^k` when set.
    pub native_grid_m: Option<f64>,

    /// Weight `c` of a single sample in the accuracy estimate.
    pub sample_confidence: f64,

    /// How far from the requested instant a sample may lie and still
    /// count as the nearest one.
    pub instant_tolerance_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_radius_m: 1000.0,
            max_concurrent_fetches: 16,
            request_timeout_secs: 30,
            max_grid_points: 10_000,
            max_bins: 100_000,
            native_grid_m: None,
            sample_confidence: 0.5,
            instant_tolerance_secs: 3600,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GIOT_SEARCH_RADIUS_M") {
            if let Ok(radius) = val.parse() {
                config.search_radius_m = radius;
            }
        }

        if let Ok(val) = std::env::var("GIOT_MAX_CONCURRENT_FETCHES") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_fetches = n;
            }
        }

        if let Ok(val) = std::env::var("GIOT_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("GIOT_MAX_GRID_POINTS") {
            if let Ok(n) = val.parse() {
                config.max_grid_points = n;
            }
        }

        if let Ok(val) = std::env::var("GIOT_MAX_BINS") {
            if let Ok(n) = val.parse() {
                config.max_bins = n;
            }
        }

        if let Ok(val) = std::env::var("GIOT_NATIVE_GRID_M") {
            config.native_grid_m = val.parse().ok().filter(|m: &f64| *m > 0.0);
        }

        if let Ok(val) = std::env::var("GIOT_SAMPLE_CONFIDENCE") {
            if let Ok(c) = val.parse() {
                config.sample_confidence = c;
            }
        }

        if let Ok(val) = std::env::var("GIOT_INSTANT_TOLERANCE_SECS") {
            if let Ok(secs) = val.parse() {
                config.instant_tolerance_secs = secs;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.search_radius_m.is_finite() && self.search_radius_m > 0.0) {
            return Err("search_radius_m must be > 0".to_string());
        }

        if self.max_concurrent_fetches == 0 {
            return Err("max_concurrent_fetches must be > 0".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be > 0".to_string());
        }

        if self.max_grid_points == 0 || self.max_bins == 0 {
            return Err("max_grid_points and max_bins must be > 0".to_string());
        }

        if let Some(native) = self.native_grid_m {
            if !(native.is_finite() && native > 0.0) {
                return Err("native_grid_m must be > 0".to_string());
            }
        }

        if !(self.sample_confidence > 0.0 && self.sample_confidence <= 1.0) {
            return Err("sample_confidence must be in (0, 1]".to_string());
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn instant_tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.instant_tolerance_secs as i64)
    }
}

/// What the server can supply: where, when and which datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageConfig {
    pub organization_info: String,
    #[serde(default)]
    pub copy_right: String,
    /// Oldest available data.
    pub oldest: DateTime<Utc>,
    /// Newest available data; absent while recording is ongoing.
    #[serde(default)]
    pub newest: Option<DateTime<Utc>>,
    /// Seconds past `newest` that a request may reach.
    #[serde(default)]
    pub max_forecast_secs: f64,
    pub south_west: LongLat,
    pub north_east: LongLat,
    pub datasets: Vec<String>,
    #[serde(default)]
    pub data_url: String,
}

impl CoverageConfig {
    /// Load coverage from a YAML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let coverage: CoverageConfig = serde_yaml::from_str(&content)?;
        coverage.validate()?;

        tracing::info!(
            datasets = coverage.datasets.len(),
            path = %path.display(),
            "Loaded coverage configuration"
        );
        Ok(coverage)
    }

    pub fn validate(&self) -> Result<()> {
        self.bbox()?;
        if self.datasets.is_empty() {
            return Err(EngineError::Config("coverage lists no datasets".to_string()));
        }
        if let Some(newest) = self.newest {
            if newest < self.oldest {
                return Err(EngineError::Config("newest precedes oldest".to_string()));
            }
        }
        if !(self.max_forecast_secs.is_finite() && self.max_forecast_secs >= 0.0) {
            return Err(EngineError::Config(
                "max_forecast_secs must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Covered area.
    pub fn bbox(&self) -> Result<BoundingBox> {
        BoundingBox::from_corners(self.south_west, self.north_east)
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn has_dataset(&self, dataset: &str) -> bool {
        self.datasets.iter().any(|d| d == dataset)
    }

    /// Newest available data, `now` while recording is ongoing.
    pub fn newest_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.newest.unwrap_or(now)
    }

    /// Latest instant a request may reach.
    pub fn latest_allowed(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let forecast = chrono::Duration::milliseconds((self.max_forecast_secs * 1000.0) as i64);
        self.newest_or(now) + forecast
    }

    pub fn to_info(&self) -> InfoReply {
        InfoReply {
            organization_info: self.organization_info.clone(),
            copy_right: self.copy_right.clone(),
            oldest: format_iso8601(&self.oldest),
            newest: self.newest.as_ref().map(format_iso8601).unwrap_or_default(),
            max_forecast: self.max_forecast_secs,
            south_west: self.south_west,
            north_east: self.north_east,
            datasets: self.datasets.clone(),
            data_url: self.data_url.clone(),
        }
    }
}
