//! GIoT sensor-data protocol
//!
//! Request and reply structures exchanged with a GIoT data server, together
//! with their JSON representation. Every polymorphic structure carries a
//! `"Type"` discriminant naming the concrete kind, e.g.
//! `{"Type": "RectRegion", ...}`.
//!
//! # Example
//!
//! ```rust
//! use giot_protocol::{DataRequest, Interval, Operation, RegionSpecification, Statistics};
//!
//! let request = DataRequest::new(RegionSpecification::sensor_id("S1"), "NO2")
//!     .with_time("2012-04-23T00:00:00Z", "2012-04-23T05:00:00Z")
//!     .with_statistics(Statistics::new(Interval::Hour, Operation::Max));
//!
//! let json = request.to_json().unwrap();
//! assert!(json.contains(r#""Type":"SensorIdRegion""#));
//! ```

pub mod errors;
pub mod info;
pub mod nan;
pub mod reply;
pub mod request;
pub mod status;

pub use errors::ProtocolError;
pub use info::InfoReply;
pub use reply::{
    DataReply, DataReplyContainer, MovingSensorReply, ReplyData, SensorDataReply, SensorMetadata,
};
pub use request::{
    DataRequest, Interval, Operation, PointRegion, RectRegion, RegionSpecification, SensorIdRegion,
    SensorRegion, Statistics, TimeSpecification,
};
pub use status::ReplyStatus;

pub use giot_common::LongLat;
