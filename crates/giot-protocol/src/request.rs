//! Inquiry structures: what data a client asks for.

use giot_common::LongLat;
use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Time interval to retrieve data for, as ISO 8601 strings.
///
/// A blank `from` asks for a single sample; a blank `to` means the newest
/// available data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSpecification {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl TimeSpecification {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn from_is_blank(&self) -> bool {
        self.from.trim().is_empty()
    }

    pub fn to_is_blank(&self) -> bool {
        self.to.trim().is_empty()
    }
}

/// Geographic region a request covers.
///
/// The JSON form carries a `Type` field with the region's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum RegionSpecification {
    /// An explicit list of points.
    PointRegion(PointRegion),
    /// A grid of points covering a rectangle.
    RectRegion(RectRegion),
    /// All sensors, fixed or moving, inside a rectangle.
    SensorRegion(SensorRegion),
    /// One sensor addressed by its unique id.
    SensorIdRegion(SensorIdRegion),
}

impl RegionSpecification {
    pub fn points(points: Vec<LongLat>) -> Self {
        Self::PointRegion(PointRegion { points })
    }

    pub fn rect(south_west: LongLat, north_east: LongLat, resolution: f64) -> Self {
        Self::RectRegion(RectRegion {
            south_west,
            north_east,
            resolution,
        })
    }

    pub fn sensors(south_west: LongLat, north_east: LongLat) -> Self {
        Self::SensorRegion(SensorRegion {
            south_west,
            north_east,
        })
    }

    pub fn sensor_id(unique_id: impl Into<String>) -> Self {
        Self::SensorIdRegion(SensorIdRegion {
            unique_id: unique_id.into(),
        })
    }

    /// Name of the region kind as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PointRegion(_) => "PointRegion",
            Self::RectRegion(_) => "RectRegion",
            Self::SensorRegion(_) => "SensorRegion",
            Self::SensorIdRegion(_) => "SensorIdRegion",
        }
    }

    /// Whether replies for this region come from concrete sensors.
    pub fn is_sensor_based(&self) -> bool {
        matches!(self, Self::SensorRegion(_) | Self::SensorIdRegion(_))
    }
}

/// Points to retrieve data for. Replies carry the same coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PointRegion {
    pub points: Vec<LongLat>,
}

/// A grid of points over a rectangle.
///
/// Replies may use a grid spacing from half to twice the requested
/// resolution, and report the exact position of every grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RectRegion {
    pub south_west: LongLat,
    pub north_east: LongLat,
    /// Approximate grid resolution in meters.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_resolution() -> f64 {
    100.0
}

/// Data at the positions of the actual sensors inside a rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorRegion {
    pub south_west: LongLat,
    pub north_east: LongLat,
}

/// One sensor by the id returned from an earlier `SensorRegion` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorIdRegion {
    pub unique_id: String,
}

/// Sampling interval of the returned data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    /// Individual readings, only for sensor regions.
    #[serde(rename = "cRawValues")]
    RawValues,
    /// One value per 10 minutes.
    #[serde(rename = "cTenMinutes")]
    TenMinutes,
    /// One value per hour.
    #[default]
    #[serde(rename = "cHour")]
    Hour,
    /// One value per day.
    #[serde(rename = "cDayOfWeek")]
    DayOfWeek,
    /// One value per week.
    #[serde(rename = "cWeek")]
    Week,
    /// One value per month.
    #[serde(rename = "cMonth")]
    Month,
    /// One value per year.
    #[serde(rename = "cYear")]
    Year,
}

impl Interval {
    /// Number of bins in one period when an operation folds the data,
    /// `None` for intervals without a period.
    pub fn period_size(&self) -> Option<usize> {
        match self {
            Interval::TenMinutes => Some(168),
            Interval::Hour => Some(24),
            Interval::DayOfWeek => Some(7),
            Interval::Week => Some(53),
            Interval::Month => Some(12),
            Interval::RawValues | Interval::Year => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::RawValues => "cRawValues",
            Interval::TenMinutes => "cTenMinutes",
            Interval::Hour => "cHour",
            Interval::DayOfWeek => "cDayOfWeek",
            Interval::Week => "cWeek",
            Interval::Month => "cMonth",
            Interval::Year => "cYear",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reduction applied to the samples of each bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operation {
    /// No periodic folding; one value per interval step.
    #[default]
    #[serde(rename = "cNone")]
    None,
    #[serde(rename = "cMean")]
    Mean,
    #[serde(rename = "cStdDev")]
    StdDev,
    #[serde(rename = "cMax")]
    Max,
    #[serde(rename = "cMin")]
    Min,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::None => "cNone",
            Operation::Mean => "cMean",
            Operation::StdDev => "cStdDev",
            Operation::Max => "cMax",
            Operation::Min => "cMin",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing applied individually for each position or sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statistics {
    #[serde(default)]
    pub interval: Interval,
    #[serde(default)]
    pub operation: Operation,
    /// Return estimated accuracies instead of the data.
    #[serde(default)]
    pub get_accuracies: bool,
}

impl Statistics {
    pub fn new(interval: Interval, operation: Operation) -> Self {
        Self {
            interval,
            operation,
            get_accuracies: false,
        }
    }

    pub fn raw() -> Self {
        Self::new(Interval::RawValues, Operation::None)
    }

    pub fn with_accuracies(mut self) -> Self {
        self.get_accuracies = true;
        self
    }
}

/// A complete data request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataRequest {
    #[serde(default)]
    pub time_interval: TimeSpecification,
    pub region: RegionSpecification,
    /// Measurement type, e.g. "CO2", "NOx", "PM2.5".
    pub dataset: String,
    #[serde(default)]
    pub statistics: Statistics,
}

impl DataRequest {
    /// Create a request for the newest sample of a dataset in a region.
    pub fn new(region: RegionSpecification, dataset: impl Into<String>) -> Self {
        Self {
            time_interval: TimeSpecification::default(),
            region,
            dataset: dataset.into(),
            statistics: Statistics::default(),
        }
    }

    /// Set the time interval (builder pattern).
    pub fn with_time(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.time_interval = TimeSpecification::new(from, to);
        self
    }

    /// Set the statistics specification (builder pattern).
    pub fn with_statistics(mut self, statistics: Statistics) -> Self {
        self.statistics = statistics;
        self
    }

    /// Decode a request from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(ProtocolError::Decode)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}
