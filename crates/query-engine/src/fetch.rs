//! Bounded concurrent retrieval of raw samples.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use giot_common::TimeWindow;
use sensor_store::{RawSample, SampleFetcher, SensorRecord, StoreResult};
use tracing::{debug, warn};

/// Fetch the samples of every sensor in `sensors`, at most `concurrency`
/// at a time.
///
/// The result is index aligned with `sensors` regardless of completion
/// order. The first storage error aborts the remaining fetches.
pub async fn fetch_all(
    fetcher: &dyn SampleFetcher,
    sensors: &[SensorRecord],
    window: &TimeWindow,
    concurrency: usize,
) -> StoreResult<Vec<Vec<RawSample>>> {
    let mut slots: Vec<Vec<RawSample>> = vec![Vec::new(); sensors.len()];
    if sensors.is_empty() {
        return Ok(slots);
    }

    let started = Instant::now();
    let mut fetches = stream::iter(sensors.iter().enumerate())
        .map(|(index, sensor)| async move {
            let result = fetcher.fetch(&sensor.unique_id, window).await;
            (index, result)
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((index, result)) = fetches.next().await {
        match result {
            Ok(samples) => slots[index] = samples,
            Err(e) => {
                warn!(
                    sensor = %sensors[index].unique_id,
                    error = %e,
                    "Sample fetch failed"
                );
                return Err(e);
            }
        }
    }

    let elapsed = started.elapsed();
    metrics::histogram!("giot_fetch_duration_seconds").record(elapsed.as_secs_f64());
    debug!(
        sensors = sensors.len(),
        samples = slots.iter().map(Vec::len).sum::<usize>(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Fetched raw samples"
    );
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use giot_common::LongLat;
    use sensor_store::{Placement, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers with one sample whose value is the sensor's index, slower for
    /// lower indices so completion order is reversed.
    struct ReversingFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SampleFetcher for ReversingFetcher {
        async fn fetch(&self, unique_id: &str, window: &TimeWindow) -> StoreResult<Vec<RawSample>> {
            let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(n, Ordering::SeqCst);

            let index: u64 = unique_id
                .parse()
                .map_err(|_| StoreError::QueryFailed(unique_id.to_string()))?;
            tokio::time::sleep(Duration::from_millis(40 - index * 5)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![RawSample::new(window.start, index as f64, 1.0)])
        }
    }

    fn sensor(id: &str) -> SensorRecord {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        SensorRecord {
            unique_id: id.to_string(),
            dataset: "NO2".to_string(),
            placement: Placement::Fixed {
                position: LongLat::new(17.6, 59.8),
            },
            installation_date: t0,
            exstallation_date: None,
            calibration_dates: Vec::new(),
            manufacturer: String::new(),
            model: String::new(),
            serial: String::new(),
            sample_time_secs: 60.0,
        }
    }

    fn window() -> TimeWindow {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        TimeWindow::new(t0, t0 + chrono::Duration::hours(1))
    }

    #[tokio::test]
    async fn test_slots_follow_input_order() {
        let fetcher = ReversingFetcher {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let sensors: Vec<_> = (0..6).map(|i| sensor(&i.to_string())).collect();

        let slots = fetch_all(&fetcher, &sensors, &window(), 3).await.unwrap();

        let values: Vec<f64> = slots.iter().map(|s| s[0].value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_error_aborts() {
        let fetcher = ReversingFetcher {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let sensors = vec![sensor("1"), sensor("not-a-number")];

        let result = fetch_all(&fetcher, &sensors, &window(), 2).await;
        assert!(matches!(result, Err(StoreError::QueryFailed(_))));
    }

    #[tokio::test]
    async fn test_no_sensors() {
        let fetcher = ReversingFetcher {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let slots = fetch_all(&fetcher, &[], &window(), 4).await.unwrap();
        assert!(slots.is_empty());
    }
}
