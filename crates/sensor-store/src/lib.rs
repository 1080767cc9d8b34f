//! Storage collaborators for the GIoT query engine.
//!
//! Provides the two interfaces the engine consumes:
//! - [`SensorLocator`]: which sensors exist in a region and time window
//! - [`SampleFetcher`]: raw `(time, value, accuracy)` readings of one sensor
//!
//! plus [`MemorySensorStore`], an in-memory implementation that can be
//! loaded from a YAML or JSON fixture file.

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::{MemorySensorStore, SensorFixture, StoreFixture};
pub use traits::{SampleFetcher, SensorLocator};
pub use types::{Placement, PositionFix, RawSample, SensorRecord};
