//! Query and aggregation engine for GIoT sensor data.
//!
//! Answers a [`DataRequest`](giot_protocol::DataRequest) with one reply per
//! resolved location or sensor, each a time binned data vector with an
//! accuracy estimate.
//!
//! # Architecture
//!
//! ```text
//! DataRequest
//!      │
//!      ├─► validation (dataset, statistics, region kind)
//!      ├─► bins::resolve_time + bins::plan_bins   ─► BinPlan
//!      ├─► RegionResolver::plan                   ─► RegionPlan
//!      │
//!      │   ┌──────────── request timeout ────────────┐
//!      ├─► │ RegionResolver::resolve  (SensorLocator) │
//!      ├─► │ fetch::fetch_all         (SampleFetcher) │
//!      │   └──────────────────────────────────────────┘
//!      │
//!      ├─► Aggregator (reduction, interpolation, accuracy)
//!      └─► ReplyAssembler ─► DataReplyContainer
//! ```
//!
//! # Example
//!
//! ```ignore
//! use query_engine::{CoverageConfig, EngineConfig, QueryEngine};
//! use sensor_store::MemorySensorStore;
//!
//! let store = Arc::new(MemorySensorStore::load_from_file("config/sensors.yaml")?);
//! let coverage = CoverageConfig::load_from_file("config/coverage.yaml")?;
//! let engine = QueryEngine::with_store(EngineConfig::from_env(), coverage, store)?;
//!
//! let reply = engine.handle_json(request_json).await;
//! println!("{}", reply.to_json()?);
//! ```

pub mod aggregate;
pub mod assemble;
pub mod bins;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod interpolation;
pub mod region;

pub use aggregate::{reduce, AccuracyAccumulator, Aggregator, Series};
pub use assemble::ReplyAssembler;
pub use bins::{plan_bins, resolve_time, BinLayout, BinPlan, RequestTime};
pub use config::{CoverageConfig, EngineConfig};
pub use engine::QueryEngine;
pub use error::{EngineError, Result};
pub use region::{RegionPlan, RegionResolver, ResolvedRegion, Target};
