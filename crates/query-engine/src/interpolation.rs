//! Inverse distance weighting of nearby sensors onto a fixed point.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Distance below which a sensor counts as sitting on the query point.
pub const COLOCATED_M: f64 = 1e-3;

/// Exponent applied to distances when weighting.
pub const IDW_POWER: i32 = 2;

/// One sensor's value for a point and step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub value: f64,
    pub distance_m: f64,
}

/// Inverse distance weighted mean of `contributions`.
///
/// Co-located sensors win outright (their plain mean is returned).
/// Returns `None` when nothing contributes.
pub fn idw(contributions: &[Contribution]) -> Option<f64> {
    if contributions.is_empty() {
        return None;
    }

    let (exact_sum, exact_count) = contributions
        .iter()
        .filter(|c| c.distance_m < COLOCATED_M)
        .fold((0.0, 0usize), |(s, n), c| (s + c.value, n + 1));
    if exact_count > 0 {
        return Some(exact_sum / exact_count as f64);
    }

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for c in contributions {
        let w = 1.0 / c.distance_m.powi(IDW_POWER);
        weighted += w * c.value;
        total_weight += w;
    }
    Some(weighted / total_weight)
}

#[derive(Debug, Clone, Copy, Default)]
struct StepMean {
    sum: f64,
    distance_sum: f64,
    count: usize,
}

/// Resamples one sensor's readings to aligned steps as seen from one point.
///
/// Each step keeps the mean value and mean distance of the readings that
/// fell into it.
#[derive(Debug, Default)]
pub struct StepResampler {
    steps: BTreeMap<DateTime<Utc>, StepMean>,
}

impl StepResampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, step_start: DateTime<Utc>, value: f64, distance_m: f64) {
        let entry = self.steps.entry(step_start).or_default();
        entry.sum += value;
        entry.distance_sum += distance_m;
        entry.count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Per step contribution of this sensor.
    pub fn contributions(&self) -> impl Iterator<Item = (DateTime<Utc>, Contribution)> + '_ {
        self.steps.iter().map(|(start, m)| {
            let n = m.count as f64;
            (
                *start,
                Contribution {
                    value: m.sum / n,
                    distance_m: m.distance_sum / n,
                },
            )
        })
    }
}

/// Merge the resampled series of several sensors into one interpolated
/// value per step.
pub fn interpolate_steps(sensors: &[StepResampler]) -> BTreeMap<DateTime<Utc>, f64> {
    let mut per_step: BTreeMap<DateTime<Utc>, Vec<Contribution>> = BTreeMap::new();
    for sensor in sensors {
        for (start, contribution) in sensor.contributions() {
            per_step.entry(start).or_default().push(contribution);
        }
    }

    per_step
        .into_iter()
        .filter_map(|(start, contributions)| idw(&contributions).map(|v| (start, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_idw_weights_by_inverse_square() {
        let value = idw(&[
            Contribution {
                value: 10.0,
                distance_m: 100.0,
            },
            Contribution {
                value: 20.0,
                distance_m: 200.0,
            },
        ])
        .unwrap();
        // weights 1/100^2 and 1/200^2, i.e. 4:1
        assert!((value - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_colocated_sensor_wins() {
        let value = idw(&[
            Contribution {
                value: 7.0,
                distance_m: 0.0,
            },
            Contribution {
                value: 100.0,
                distance_m: 5.0,
            },
        ]);
        assert_eq!(value, Some(7.0));
        assert_eq!(idw(&[]), None);
    }

    #[test]
    fn test_resample_then_interpolate() {
        let h = |hour| Utc.with_ymd_and_hms(2020, 1, 1, hour, 0, 0).unwrap();

        let mut near = StepResampler::new();
        near.add(h(1), 4.0, 100.0);
        near.add(h(1), 6.0, 100.0);
        near.add(h(2), 8.0, 100.0);

        let mut far = StepResampler::new();
        far.add(h(1), 20.0, 200.0);

        let steps = interpolate_steps(&[near, far]);
        assert_eq!(steps.len(), 2);
        // step 1: near mean 5 (w 4), far 20 (w 1) -> 8
        assert!((steps[&h(1)] - 8.0).abs() < 1e-9);
        assert!((steps[&h(2)] - 8.0).abs() < 1e-9);
    }
}
