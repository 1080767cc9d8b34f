//! Reduction of raw samples into per-bin values and accuracy estimates.
//!
//! Every output cell carries a value (NaN when no sample reached it) and an
//! accuracy
//!
//! ```text
//! A = 1 - Π (1 - c · a_i · w_i)
//! ```
//!
//! over the samples that contributed, where `a_i` is the sample's own
//! accuracy, `w_i` its distance weight (1 for a sensor's own readings,
//! `1 - d/R` when interpolating at distance `d` within radius `R`) and `c`
//! the configured per-sample confidence. Each factor lies in `[0, 1]`, so
//! additional samples can only raise `A`.
//!
//! When accuracies are requested instead of values, the per-sample accuracy
//! becomes the data and `a_i` is taken as 1: the reply accuracy then only
//! reflects how many samples were used and how far away they were.

use chrono::{DateTime, Utc};
use giot_common::LongLat;
use giot_protocol::Operation;
use sensor_store::{RawSample, SensorRecord};

use crate::bins::{align_floor, BinPlan};
use crate::interpolation::{idw, interpolate_steps, Contribution, StepResampler};

/// Reduce `values` with `operation`, skipping NaN. Empty input gives NaN.
///
/// `Operation::None` averages, which is what a plain resampling step needs.
pub fn reduce(values: &[f64], operation: Operation) -> f64 {
    let mut valid = values.iter().copied().filter(|v| !v.is_nan()).peekable();
    if valid.peek().is_none() {
        return f64::NAN;
    }

    match operation {
        Operation::None | Operation::Mean => mean(valid),
        Operation::Max => valid.fold(f64::NEG_INFINITY, f64::max),
        Operation::Min => valid.fold(f64::INFINITY, f64::min),
        Operation::StdDev => {
            let collected: Vec<f64> = valid.collect();
            let m = mean(collected.iter().copied());
            let var = collected.iter().map(|v| (v - m).powi(2)).sum::<f64>()
                / collected.len() as f64;
            var.sqrt()
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Running `1 - Π(1 - x_i)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyAccumulator {
    untrusted: f64,
}

impl Default for AccuracyAccumulator {
    fn default() -> Self {
        Self { untrusted: 1.0 }
    }
}

impl AccuracyAccumulator {
    /// Account for one sample with confidence `c`, accuracy `a` and
    /// distance weight `w`.
    pub fn add(&mut self, c: f64, a: f64, w: f64) {
        let x = (c * a.clamp(0.0, 1.0) * w.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        if x.is_finite() {
            self.untrusted *= 1.0 - x;
        }
    }

    pub fn value(&self) -> f64 {
        1.0 - self.untrusted
    }
}

/// Values of one target plus per-cell accuracies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub data: Vec<f64>,
    pub cell_accuracy: Vec<f64>,
    /// Sample times, only filled for raw plans.
    pub times: Vec<DateTime<Utc>>,
}

impl Series {
    fn empty(bins: usize) -> Self {
        Self {
            data: vec![f64::NAN; bins],
            cell_accuracy: vec![0.0; bins],
            times: Vec::new(),
        }
    }

    /// Mean cell accuracy over non-empty cells, 0 when all are empty.
    pub fn reply_accuracy(&self) -> f64 {
        let (sum, count) = self
            .data
            .iter()
            .zip(&self.cell_accuracy)
            .filter(|(v, _)| !v.is_nan())
            .fold((0.0, 0usize), |(s, n), (_, a)| (s + a, n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Samples of one sensor, as fetched.
#[derive(Debug, Clone, Copy)]
pub struct SensorSamples<'a> {
    pub sensor: &'a SensorRecord,
    pub samples: &'a [RawSample],
}

/// Applies a bin plan to fetched samples.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    plan: &'a BinPlan,
    get_accuracies: bool,
    confidence: f64,
    radius_m: f64,
}

impl<'a> Aggregator<'a> {
    pub fn new(plan: &'a BinPlan, get_accuracies: bool, confidence: f64, radius_m: f64) -> Self {
        Self {
            plan,
            get_accuracies,
            confidence,
            radius_m,
        }
    }

    /// Data channel and accuracy factor of a sample.
    fn channel(&self, s: &RawSample) -> (f64, f64) {
        if self.get_accuracies {
            (s.accuracy, 1.0)
        } else {
            (s.value, s.accuracy)
        }
    }

    /// Series for a sensor target, computed from its own readings.
    pub fn sensor_series(&self, samples: &[RawSample]) -> Series {
        let c = self.confidence;
        match self.plan {
            BinPlan::Raw { .. } => {
                let mut series = Series::default();
                for s in samples {
                    let (v, a) = self.channel(s);
                    let mut acc = AccuracyAccumulator::default();
                    if !v.is_nan() {
                        acc.add(c, a, 1.0);
                    }
                    series.data.push(v);
                    series.cell_accuracy.push(acc.value());
                    series.times.push(s.time);
                }
                series
            }
            BinPlan::Instant { at } => {
                let mut series = Series::empty(1);
                let nearest = samples
                    .iter()
                    .filter(|s| !self.channel(s).0.is_nan())
                    .min_by_key(|s| (s.time - *at).num_milliseconds().abs());
                if let Some(s) = nearest {
                    let (v, a) = self.channel(s);
                    let mut acc = AccuracyAccumulator::default();
                    acc.add(c, a, 1.0);
                    series.data[0] = v;
                    series.cell_accuracy[0] = acc.value();
                }
                series
            }
            BinPlan::Binned { operation, .. } => {
                let bins = self.plan.bin_count().unwrap_or(0);
                let mut values: Vec<Vec<f64>> = vec![Vec::new(); bins];
                let mut acc = vec![AccuracyAccumulator::default(); bins];
                for s in samples {
                    let (v, a) = self.channel(s);
                    if v.is_nan() {
                        continue;
                    }
                    if let Some(bin) = self.plan.bin_of(s.time) {
                        values[bin].push(v);
                        acc[bin].add(c, a, 1.0);
                    }
                }
                Series {
                    data: values.iter().map(|v| reduce(v, *operation)).collect(),
                    cell_accuracy: acc.iter().map(AccuracyAccumulator::value).collect(),
                    times: Vec::new(),
                }
            }
        }
    }

    /// Distance from `point` to the sensor when `sample` was taken, if
    /// within the search radius.
    fn distance(&self, point: &LongLat, sensor: &SensorRecord, sample: &RawSample) -> Option<f64> {
        let position = sensor.position_at(sample.time)?;
        let d = point.distance_to(&position);
        (d <= self.radius_m).then_some(d)
    }

    fn weight(&self, distance_m: f64) -> f64 {
        1.0 - distance_m / self.radius_m
    }

    /// Series for a fixed point, interpolated from nearby sensors.
    pub fn point_series(&self, point: &LongLat, sensors: &[SensorSamples<'_>]) -> Series {
        let c = self.confidence;
        match self.plan {
            // Raw requests for points are rejected before fetching.
            BinPlan::Raw { .. } => Series::default(),
            BinPlan::Instant { at } => {
                let mut series = Series::empty(1);
                let mut acc = AccuracyAccumulator::default();
                let mut contributions = Vec::new();
                for entry in sensors {
                    let nearest = entry
                        .samples
                        .iter()
                        .filter(|s| !self.channel(s).0.is_nan())
                        .filter_map(|s| self.distance(point, entry.sensor, s).map(|d| (s, d)))
                        .min_by_key(|(s, _)| (s.time - *at).num_milliseconds().abs());
                    if let Some((s, d)) = nearest {
                        let (v, a) = self.channel(s);
                        contributions.push(Contribution {
                            value: v,
                            distance_m: d,
                        });
                        acc.add(c, a, self.weight(d));
                    }
                }
                if let Some(v) = idw(&contributions) {
                    series.data[0] = v;
                    series.cell_accuracy[0] = acc.value();
                }
                series
            }
            BinPlan::Binned {
                step, operation, ..
            } => {
                let bins = self.plan.bin_count().unwrap_or(0);
                let mut acc = vec![AccuracyAccumulator::default(); bins];
                let mut resampled = Vec::with_capacity(sensors.len());

                for entry in sensors {
                    let mut resampler = StepResampler::new();
                    for s in entry.samples {
                        let (v, a) = self.channel(s);
                        if v.is_nan() {
                            continue;
                        }
                        let Some(d) = self.distance(point, entry.sensor, s) else {
                            continue;
                        };
                        let Some(bin) = self.plan.bin_of(s.time) else {
                            continue;
                        };
                        let step_start = align_floor(s.time, *step);
                        resampler.add(step_start, v, d);
                        acc[bin].add(c, a, self.weight(d));
                    }
                    if !resampler.is_empty() {
                        resampled.push(resampler);
                    }
                }

                let mut values: Vec<Vec<f64>> = vec![Vec::new(); bins];
                for (step_start, v) in interpolate_steps(&resampled) {
                    if let Some(bin) = self.plan.bin_of_step(step_start) {
                        values[bin].push(v);
                    }
                }

                Series {
                    data: values.iter().map(|v| reduce(v, *operation)).collect(),
                    cell_accuracy: acc.iter().map(AccuracyAccumulator::value).collect(),
                    times: Vec::new(),
                }
            }
        }
    }
}
