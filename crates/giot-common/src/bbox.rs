//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

use crate::geo::{meters_per_degree_lon, LongLat, METERS_PER_DEGREE_LAT};

/// A lon/lat bounding box in WGS84 degrees.
///
/// The box is closed: points on the edges are contained. A box may be
/// degenerate (zero width or height) when it encloses a single point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build a box from its south-west and north-east corners.
    ///
    /// The north-east corner must have the larger longitude and latitude.
    pub fn from_corners(south_west: LongLat, north_east: LongLat) -> Result<Self, BboxError> {
        if !south_west.is_valid() || !north_east.is_valid() {
            return Err(BboxError::InvalidCoordinate(format!(
                "{:?} / {:?}",
                south_west, north_east
            )));
        }
        if south_west.longitude > north_east.longitude || south_west.latitude > north_east.latitude
        {
            return Err(BboxError::Inverted {
                south_west,
                north_east,
            });
        }

        Ok(Self::new(
            south_west.longitude,
            south_west.latitude,
            north_east.longitude,
            north_east.latitude,
        ))
    }

    /// Smallest box enclosing all points, `None` for an empty slice.
    pub fn enclosing(points: &[LongLat]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.longitude, first.latitude, first.longitude, first.latitude);
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.longitude);
            bbox.min_y = bbox.min_y.min(p.latitude);
            bbox.max_x = bbox.max_x.max(p.longitude);
            bbox.max_y = bbox.max_y.max(p.latitude);
        }
        Some(bbox)
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Latitude of the box's horizontal center line.
    pub fn center_latitude(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    /// East-west extent in meters, measured along the center latitude.
    pub fn width_meters(&self) -> f64 {
        self.width() * meters_per_degree_lon(self.center_latitude())
    }

    /// North-south extent in meters.
    pub fn height_meters(&self) -> f64 {
        self.height() * METERS_PER_DEGREE_LAT
    }

    /// Check if this bbox intersects another (edges touching counts).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Check if a coordinate is contained within this bbox.
    pub fn contains(&self, point: &LongLat) -> bool {
        point.longitude >= self.min_x
            && point.longitude <= self.max_x
            && point.latitude >= self.min_y
            && point.latitude <= self.max_y
    }

    /// Grow the box by a metric margin on every side.
    pub fn expand_meters(&self, margin_m: f64) -> BoundingBox {
        // Use the latitude closest to a pole so the margin is never too small
        let widest_lat = self.min_y.abs().max(self.max_y.abs());
        let d_lon = margin_m / meters_per_degree_lon(widest_lat);
        let d_lat = margin_m / METERS_PER_DEGREE_LAT;

        BoundingBox {
            min_x: (self.min_x - d_lon).max(-180.0),
            min_y: (self.min_y - d_lat).max(-90.0),
            max_x: (self.max_x + d_lon).min(180.0),
            max_y: (self.max_y + d_lat).min(90.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxError {
    #[error("Invalid corner coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("South-west corner {south_west:?} is not south-west of {north_east:?}")]
    Inverted {
        south_west: LongLat,
        north_east: LongLat,
    },
}
