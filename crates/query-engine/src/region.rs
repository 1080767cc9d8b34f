//! Region resolution.
//!
//! Turns a [`RegionSpecification`] into the ordered list of targets replies
//! are produced for. Geometry is validated synchronously in
//! [`RegionResolver::plan`] so that malformed requests never reach storage;
//! sensor lookups happen in [`RegionResolver::resolve`].

use giot_common::{
    meters_per_degree_lon, BboxError, BoundingBox, LongLat, TimeWindow, METERS_PER_DEGREE_LAT,
};
use giot_protocol::RegionSpecification;
use sensor_store::{SensorLocator, SensorRecord};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Something a reply is produced for.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A location without identity; its value is interpolated.
    Point(LongLat),
    /// A concrete sensor.
    Sensor(SensorRecord),
}

/// Validated region, ready for sensor lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionPlan {
    /// Fixed points, in reply order.
    Points(Vec<LongLat>),
    /// Every sensor inside the (coverage clipped) box.
    SensorsIn(BoundingBox),
    /// One sensor by id.
    SensorId(String),
}

/// Targets of a request together with the sensors whose samples are needed.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRegion {
    pub targets: Vec<Target>,
    /// Sensors to fetch samples for. For sensor targets these are the
    /// targets themselves, for points the candidates near any point.
    pub sensors: Vec<SensorRecord>,
}

/// Resolves region specifications against the server coverage.
pub struct RegionResolver<'a> {
    coverage: BoundingBox,
    config: &'a EngineConfig,
}

impl<'a> RegionResolver<'a> {
    pub fn new(coverage: BoundingBox, config: &'a EngineConfig) -> Self {
        Self { coverage, config }
    }

    /// Validate `region` and compute its fixed points.
    pub fn plan(&self, region: &RegionSpecification) -> Result<RegionPlan> {
        match region {
            RegionSpecification::PointRegion(r) => {
                if r.points.is_empty() {
                    return Err(EngineError::syntax("PointRegion without points"));
                }
                for p in &r.points {
                    check_finite(p)?;
                    if !self.coverage.contains(p) {
                        return Err(EngineError::out_of_range(format!(
                            "point ({}, {}) is outside the covered area",
                            p.longitude, p.latitude
                        )));
                    }
                }
                Ok(RegionPlan::Points(r.points.clone()))
            }
            RegionSpecification::RectRegion(r) => {
                if !(r.resolution.is_finite() && r.resolution > 0.0) {
                    return Err(EngineError::invalid(format!(
                        "resolution must be positive, got {}",
                        r.resolution
                    )));
                }
                let bbox = self.clip(r.south_west, r.north_east)?;
                let step_m = snap_step(r.resolution, self.config.native_grid_m);
                let points = grid_points(&bbox, step_m, self.config.max_grid_points)?;
                debug!(points = points.len(), step_m, "Resolved rectangle grid");
                Ok(RegionPlan::Points(points))
            }
            RegionSpecification::SensorRegion(r) => {
                Ok(RegionPlan::SensorsIn(self.clip(r.south_west, r.north_east)?))
            }
            RegionSpecification::SensorIdRegion(r) => {
                if r.unique_id.trim().is_empty() {
                    return Err(EngineError::syntax("SensorIdRegion without UniqueId"));
                }
                Ok(RegionPlan::SensorId(r.unique_id.clone()))
            }
        }
    }

    /// Look up the sensors a plan needs.
    pub async fn resolve(
        &self,
        plan: RegionPlan,
        locator: &dyn SensorLocator,
        window: &TimeWindow,
        dataset: &str,
    ) -> Result<ResolvedRegion> {
        match plan {
            RegionPlan::Points(points) => {
                let sensors = match BoundingBox::enclosing(&points) {
                    Some(bbox) => {
                        let search = bbox.expand_meters(self.config.search_radius_m);
                        locator.locate(&search, window, dataset).await?
                    }
                    None => Vec::new(),
                };
                Ok(ResolvedRegion {
                    targets: points.into_iter().map(Target::Point).collect(),
                    sensors,
                })
            }
            RegionPlan::SensorsIn(bbox) => {
                let sensors = locator.locate(&bbox, window, dataset).await?;
                Ok(ResolvedRegion {
                    targets: sensors.iter().cloned().map(Target::Sensor).collect(),
                    sensors,
                })
            }
            RegionPlan::SensorId(id) => {
                let sensor = locator
                    .find(&id)
                    .await?
                    .ok_or_else(|| EngineError::invalid(format!("unknown sensor {}", id)))?;
                if sensor.dataset != dataset {
                    return Err(EngineError::invalid(format!(
                        "sensor {} measures {}, not {}",
                        id, sensor.dataset, dataset
                    )));
                }
                Ok(ResolvedRegion {
                    targets: vec![Target::Sensor(sensor.clone())],
                    sensors: vec![sensor],
                })
            }
        }
    }

    /// Validate rectangle corners and clip them to the coverage.
    fn clip(&self, south_west: LongLat, north_east: LongLat) -> Result<BoundingBox> {
        check_finite(&south_west)?;
        check_finite(&north_east)?;
        let bbox = BoundingBox::from_corners(south_west, north_east).map_err(|e| match e {
            // Corners beyond WGS84 cannot lie inside the covered area.
            BboxError::InvalidCoordinate(_) => EngineError::out_of_range(e.to_string()),
            BboxError::Inverted { .. } => EngineError::invalid(e.to_string()),
        })?;
        bbox.intersection(&self.coverage).ok_or_else(|| {
            EngineError::out_of_range("rectangle does not intersect the covered area")
        })
    }
}

fn check_finite(p: &LongLat) -> Result<()> {
    if p.longitude.is_finite() && p.latitude.is_finite() {
        Ok(())
    } else {
        Err(EngineError::syntax("coordinates must be finite numbers"))
    }
}

/// Grid step for a requested resolution `r`. With a native grid the step is
/// the power-of-two multiple of it closest to `r` on a log scale.
pub fn snap_step(r: f64, native_m: Option<f64>) -> f64 {
    match native_m {
        Some(native) if native > 0.0 => native * (r / native).log2().round().exp2(),
        _ => r,
    }
}

/// Points of a grid over `bbox` with `step_m` spacing, rows south to north
/// and columns west to east.
pub fn grid_points(bbox: &BoundingBox, step_m: f64, max_points: usize) -> Result<Vec<LongLat>> {
    // Counted in f64 so that a tiny step cannot overflow before the cap.
    let rows = (bbox.height_meters() / step_m + 1e-9).floor() + 1.0;
    let cols = (bbox.width_meters() / step_m + 1e-9).floor() + 1.0;
    let total = rows * cols;
    if !total.is_finite() || total > max_points as f64 {
        return Err(EngineError::out_of_range(format!(
            "grid of {:.0}x{:.0} points exceeds the limit of {}",
            cols, rows, max_points
        )));
    }

    let (rows, cols) = (rows as usize, cols as usize);
    let dlat = step_m / METERS_PER_DEGREE_LAT;
    let dlon = step_m / meters_per_degree_lon(bbox.center_latitude());
    let mut points = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let latitude = bbox.min_y + row as f64 * dlat;
        for col in 0..cols {
            points.push(LongLat::new(bbox.min_x + col as f64 * dlon, latitude));
        }
    }
    Ok(points)
}
