//! Reply structures: one reply per geographical position or sensor.

use giot_common::LongLat;
use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::status::ReplyStatus;

/// Data common to every reply kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplyData {
    /// The requested point, the actual grid point, or the sensor position.
    pub position: LongLat,
    /// Accuracy estimate for the data set.
    pub accuracy: f64,
    /// Values at each bin/time. Empty bins are NaN.
    #[serde(with = "crate::nan")]
    pub data: Vec<f64>,
}

/// Descriptive metadata of the sensor that produced a reply.
///
/// Dates are ISO 8601 strings; blank when not applicable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorMetadata {
    pub installation_date: String,
    /// Removal date; blank while the sensor is still active.
    pub exstallation_date: String,
    /// Newest calibration inside the requested time interval.
    pub calibration_date: String,
    pub data_set: String,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub unique_id: String,
    /// Sampling time in seconds.
    pub sample_time: f64,
}

/// Reply for a sensor of a `SensorRegion` or `SensorIdRegion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDataReply {
    #[serde(flatten)]
    pub reply: ReplyData,
    #[serde(flatten)]
    pub sensor: SensorMetadata,
}

/// Reply for a moving sensor when raw values are requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingSensorReply {
    #[serde(flatten)]
    pub reply: ReplyData,
    #[serde(flatten)]
    pub sensor: SensorMetadata,
    /// Sensor position at each sample, parallel to `data`.
    #[serde(rename = "Positions")]
    pub positions: Vec<LongLat>,
}

/// One reply of a [`DataReplyContainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum DataReply {
    /// Calculated data for a point of a `PointRegion` or `RectRegion`.
    DataReply(ReplyData),
    SensorDataReply(SensorDataReply),
    MovingSensorReply(MovingSensorReply),
}

impl DataReply {
    fn base(&self) -> &ReplyData {
        match self {
            DataReply::DataReply(r) => r,
            DataReply::SensorDataReply(r) => &r.reply,
            DataReply::MovingSensorReply(r) => &r.reply,
        }
    }

    pub fn position(&self) -> LongLat {
        self.base().position
    }

    pub fn accuracy(&self) -> f64 {
        self.base().accuracy
    }

    pub fn data(&self) -> &[f64] {
        &self.base().data
    }

    /// Sensor metadata, `None` for point/grid replies.
    pub fn sensor(&self) -> Option<&SensorMetadata> {
        match self {
            DataReply::DataReply(_) => None,
            DataReply::SensorDataReply(r) => Some(&r.sensor),
            DataReply::MovingSensorReply(r) => Some(&r.sensor),
        }
    }

    /// Per-sample positions of a moving sensor.
    pub fn positions(&self) -> Option<&[LongLat]> {
        match self {
            DataReply::MovingSensorReply(r) => Some(&r.positions),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataReply::DataReply(_) => "DataReply",
            DataReply::SensorDataReply(_) => "SensorDataReply",
            DataReply::MovingSensorReply(_) => "MovingSensorReply",
        }
    }
}

/// The total reply from one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataReplyContainer {
    pub status: ReplyStatus,
    /// Specific error message, or "Success".
    pub message: String,
    /// Replies in row major order (x coordinate varies fastest).
    pub replies: Vec<DataReply>,
}

impl DataReplyContainer {
    pub const SUCCESS_MESSAGE: &'static str = "Success";

    pub fn success(replies: Vec<DataReply>) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: Self::SUCCESS_MESSAGE.to_string(),
            replies,
        }
    }

    /// A failed request; never carries replies.
    pub fn failure(status: ReplyStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            replies: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn to_json_pretty(&self) -> Result<String, ProtocolError> {
        serde_json::to_string_pretty(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(ProtocolError::Decode)
    }
}
