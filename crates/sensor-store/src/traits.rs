//! Collaborator interfaces consumed by the query engine.

use async_trait::async_trait;
use giot_common::{BoundingBox, TimeWindow};

use crate::error::StoreResult;
use crate::types::{RawSample, SensorRecord};

/// Finds sensors by region or identity.
#[async_trait]
pub trait SensorLocator: Send + Sync {
    /// Sensors producing `dataset` whose activity overlaps `window` and that
    /// were inside `bbox` during it.
    ///
    /// The order of the returned sensors is stable between calls.
    async fn locate(
        &self,
        bbox: &BoundingBox,
        window: &TimeWindow,
        dataset: &str,
    ) -> StoreResult<Vec<SensorRecord>>;

    /// Look a sensor up by its system wide unique id.
    async fn find(&self, unique_id: &str) -> StoreResult<Option<SensorRecord>>;
}

/// Retrieves raw readings of one sensor.
#[async_trait]
pub trait SampleFetcher: Send + Sync {
    /// All samples of `unique_id` inside `window`, ordered by time.
    ///
    /// An empty vector means no data; errors are storage failures only.
    async fn fetch(&self, unique_id: &str, window: &TimeWindow) -> StoreResult<Vec<RawSample>>;
}
