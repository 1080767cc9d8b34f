//! Store doubles for exercising failure paths.

use std::time::Duration;

use async_trait::async_trait;
use giot_common::{BoundingBox, TimeWindow};
use sensor_store::{
    MemorySensorStore, RawSample, SampleFetcher, SensorLocator, SensorRecord, StoreError,
    StoreResult,
};

/// Finds sensors through an inner store but fails every sample fetch, or
/// every call when `fail_locate` is set.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemorySensorStore,
    pub fail_locate: bool,
}

impl FailingStore {
    pub fn new(inner: MemorySensorStore) -> Self {
        Self {
            inner,
            fail_locate: false,
        }
    }

    /// A store whose locator fails as well.
    pub fn unavailable() -> Self {
        Self {
            inner: MemorySensorStore::new(),
            fail_locate: true,
        }
    }
}

#[async_trait]
impl SensorLocator for FailingStore {
    async fn locate(
        &self,
        bbox: &BoundingBox,
        window: &TimeWindow,
        dataset: &str,
    ) -> StoreResult<Vec<SensorRecord>> {
        if self.fail_locate {
            return Err(StoreError::Unavailable("locator offline".to_string()));
        }
        self.inner.locate(bbox, window, dataset).await
    }

    async fn find(&self, unique_id: &str) -> StoreResult<Option<SensorRecord>> {
        if self.fail_locate {
            return Err(StoreError::Unavailable("locator offline".to_string()));
        }
        self.inner.find(unique_id).await
    }
}

#[async_trait]
impl SampleFetcher for FailingStore {
    async fn fetch(&self, unique_id: &str, _window: &TimeWindow) -> StoreResult<Vec<RawSample>> {
        Err(StoreError::QueryFailed(format!(
            "samples of {} unavailable",
            unique_id
        )))
    }
}

/// Delegates to an inner store after sleeping `delay` on every fetch.
#[derive(Debug)]
pub struct SlowStore {
    pub inner: MemorySensorStore,
    pub delay: Duration,
}

impl SlowStore {
    pub fn new(inner: MemorySensorStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl SensorLocator for SlowStore {
    async fn locate(
        &self,
        bbox: &BoundingBox,
        window: &TimeWindow,
        dataset: &str,
    ) -> StoreResult<Vec<SensorRecord>> {
        self.inner.locate(bbox, window, dataset).await
    }

    async fn find(&self, unique_id: &str) -> StoreResult<Option<SensorRecord>> {
        self.inner.find(unique_id).await
    }
}

#[async_trait]
impl SampleFetcher for SlowStore {
    async fn fetch(&self, unique_id: &str, window: &TimeWindow) -> StoreResult<Vec<RawSample>> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(unique_id, window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{area, fixed_sensor, lon_lat, ts};

    fn window() -> TimeWindow {
        TimeWindow::new(ts("2012-04-23T00:00:00Z"), ts("2012-04-23T05:00:00Z"))
    }

    #[test]
    fn test_failing_store_locates_but_fails_fetch() {
        let mut inner = MemorySensorStore::new();
        inner
            .insert_sensor(fixed_sensor("S1", "NO2", lon_lat(area::CATHEDRAL)))
            .unwrap();
        let store = FailingStore::new(inner);

        assert!(tokio_test::block_on(store.find("S1")).unwrap().is_some());
        assert!(tokio_test::block_on(store.fetch("S1", &window())).is_err());
        assert!(tokio_test::block_on(FailingStore::unavailable().find("S1")).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_delays() {
        let store = SlowStore::new(MemorySensorStore::new(), Duration::from_secs(5));
        let started = tokio::time::Instant::now();
        let samples = store.fetch("S1", &window()).await.unwrap();
        assert!(samples.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
