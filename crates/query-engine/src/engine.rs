//! Request execution.
//!
//! [`QueryEngine`] runs a [`DataRequest`] through validation, region
//! resolution, bin planning, sample fetching, aggregation and reply
//! assembly, and always answers with a [`DataReplyContainer`]: failures
//! become a status code and message with no replies.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use giot_common::BoundingBox;
use giot_protocol::{DataReply, DataReplyContainer, DataRequest, InfoReply, Interval, Operation};
use sensor_store::{RawSample, SampleFetcher, SensorLocator};
use tracing::{info, instrument, warn};

use crate::aggregate::{Aggregator, SensorSamples};
use crate::assemble::ReplyAssembler;
use crate::bins::{plan_bins, resolve_time, BinPlan, RequestTime};
use crate::config::{CoverageConfig, EngineConfig};
use crate::error::{EngineError, Result};
use crate::fetch::fetch_all;
use crate::region::{RegionPlan, RegionResolver, ResolvedRegion, Target};

/// Answers data requests from a sensor store.
pub struct QueryEngine {
    config: EngineConfig,
    coverage: CoverageConfig,
    coverage_bbox: BoundingBox,
    locator: Arc<dyn SensorLocator>,
    fetcher: Arc<dyn SampleFetcher>,
}

impl QueryEngine {
    /// Create an engine; fails on invalid configuration.
    pub fn new(
        config: EngineConfig,
        coverage: CoverageConfig,
        locator: Arc<dyn SensorLocator>,
        fetcher: Arc<dyn SampleFetcher>,
    ) -> Result<Self> {
        config.validate().map_err(EngineError::Config)?;
        coverage.validate()?;
        let coverage_bbox = coverage.bbox()?;

        Ok(Self {
            config,
            coverage,
            coverage_bbox,
            locator,
            fetcher,
        })
    }

    /// Create an engine over a store that implements both collaborators.
    pub fn with_store<S>(
        config: EngineConfig,
        coverage: CoverageConfig,
        store: Arc<S>,
    ) -> Result<Self>
    where
        S: SensorLocator + SampleFetcher + 'static,
    {
        let locator: Arc<dyn SensorLocator> = store.clone();
        let fetcher: Arc<dyn SampleFetcher> = store;
        Self::new(config, coverage, locator, fetcher)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Server capabilities.
    pub fn info(&self) -> InfoReply {
        self.coverage.to_info()
    }

    /// Decode and answer a JSON request. Undecodable input is a syntax error.
    pub async fn handle_json(&self, json: &str) -> DataReplyContainer {
        match DataRequest::from_json(json) {
            Ok(request) => self.handle(&request).await,
            Err(e) => {
                metrics::counter!("giot_requests_total", "region" => "unknown").increment(1);
                self.failure(EngineError::from(e))
            }
        }
    }

    /// Answer a request.
    #[instrument(
        skip(self, request),
        fields(
            dataset = %request.dataset,
            region = request.region.kind(),
            interval = %request.statistics.interval,
            operation = %request.statistics.operation,
        )
    )]
    pub async fn handle(&self, request: &DataRequest) -> DataReplyContainer {
        metrics::counter!("giot_requests_total", "region" => request.region.kind()).increment(1);

        match self.execute(request, Utc::now()).await {
            Ok(replies) => {
                info!(replies = replies.len(), "Request answered");
                DataReplyContainer::success(replies)
            }
            Err(e) => self.failure(e),
        }
    }

    fn failure(&self, error: EngineError) -> DataReplyContainer {
        let status = error.status();
        metrics::counter!("giot_request_errors_total", "status" => status.to_string())
            .increment(1);
        warn!(status = %status, error = %error, "Request failed");
        DataReplyContainer::failure(status, error.to_string())
    }

    async fn execute(&self, request: &DataRequest, now: DateTime<Utc>) -> Result<Vec<DataReply>> {
        // Everything up to the bin plan is validation and never touches storage.
        self.validate(request)?;
        let time = resolve_time(&request.time_interval, &self.coverage, now)?;
        let plan = plan_bins(time, &request.statistics, self.config.max_bins)?;
        let resolver = RegionResolver::new(self.coverage_bbox, &self.config);
        let region_plan = resolver.plan(&request.region)?;

        let timeout = self.config.request_timeout();
        let (region, samples) = tokio::time::timeout(
            timeout,
            self.gather(&resolver, region_plan, &time, &plan, &request.dataset),
        )
        .await
        .map_err(|_| EngineError::Timeout(timeout))??;

        Ok(self.build_replies(request, time, &plan, &region, &samples))
    }

    fn validate(&self, request: &DataRequest) -> Result<()> {
        if request.dataset.trim().is_empty() {
            return Err(EngineError::syntax("Dataset is empty"));
        }
        if !self.coverage.has_dataset(&request.dataset) {
            return Err(EngineError::out_of_range(format!(
                "unknown dataset {}",
                request.dataset
            )));
        }

        let stats = &request.statistics;
        if stats.get_accuracies && stats.operation == Operation::StdDev {
            return Err(EngineError::invalid(
                "accuracies cannot be requested together with cStdDev",
            ));
        }
        if stats.interval == Interval::RawValues && !request.region.is_sensor_based() {
            return Err(EngineError::invalid(format!(
                "cRawValues requires a sensor region, not {}",
                request.region.kind()
            )));
        }
        Ok(())
    }

    /// Sensor lookup and sample fetching, the part bounded by the timeout.
    async fn gather(
        &self,
        resolver: &RegionResolver<'_>,
        region_plan: RegionPlan,
        time: &RequestTime,
        plan: &BinPlan,
        dataset: &str,
    ) -> Result<(ResolvedRegion, Vec<Vec<RawSample>>)> {
        let fetch_window = plan.fetch_window(self.config.instant_tolerance());
        let locate_window = match time {
            RequestTime::Window(w) => *w,
            RequestTime::Instant(_) => fetch_window,
        };

        let region = resolver
            .resolve(region_plan, self.locator.as_ref(), &locate_window, dataset)
            .await?;
        let samples = fetch_all(
            self.fetcher.as_ref(),
            &region.sensors,
            &fetch_window,
            self.config.max_concurrent_fetches,
        )
        .await?;

        Ok((region, samples))
    }

    fn build_replies(
        &self,
        request: &DataRequest,
        time: RequestTime,
        plan: &BinPlan,
        region: &ResolvedRegion,
        samples: &[Vec<RawSample>],
    ) -> Vec<DataReply> {
        let aggregator = Aggregator::new(
            plan,
            request.statistics.get_accuracies,
            self.config.sample_confidence,
            self.config.search_radius_m,
        );
        let raw = matches!(plan, BinPlan::Raw { .. });
        let assembler = ReplyAssembler::new(time.window(), raw);

        let by_sensor: Vec<SensorSamples<'_>> = region
            .sensors
            .iter()
            .zip(samples)
            .map(|(sensor, samples)| SensorSamples { sensor, samples })
            .collect();

        region
            .targets
            .iter()
            .enumerate()
            .map(|(index, target)| {
                let series = match target {
                    Target::Point(point) => aggregator.point_series(point, &by_sensor),
                    // Sensor targets are the fetched sensors, in the same order.
                    Target::Sensor(_) => aggregator
                        .sensor_series(by_sensor.get(index).map_or(&[][..], |s| s.samples)),
                };
                assembler.reply(target, series)
            })
            .collect()
    }
}
