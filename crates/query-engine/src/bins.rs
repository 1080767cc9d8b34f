//! Time bin planning.
//!
//! A request's time specification is first resolved to a concrete window
//! against the server's coverage, then turned into a [`BinPlan`] that tells
//! the aggregator which output slot a timestamp belongs to.
//!
//! Bins are aligned to calendar boundaries (ten minutes, hours, days, ISO
//! weeks starting on Monday, months, years) independently of where the
//! requested window starts; the window only selects which aligned bins are
//! touched.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Timelike, Utc};
use giot_common::{parse_iso8601, TimeWindow};
use giot_protocol::{Interval, Operation, Statistics, TimeSpecification};

use crate::config::CoverageConfig;
use crate::error::{EngineError, Result};

/// A time specification resolved against the coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTime {
    /// `[from, to]`, both inclusive.
    Window(TimeWindow),
    /// A single instant; each target reports its nearest sample.
    Instant(DateTime<Utc>),
}

impl RequestTime {
    /// Window to hand the sensor locator.
    pub fn window(&self) -> TimeWindow {
        match self {
            RequestTime::Window(w) => *w,
            RequestTime::Instant(t) => TimeWindow::instant(*t),
        }
    }
}

fn parse_field(name: &str, value: &str) -> Result<DateTime<Utc>> {
    parse_iso8601(value).map_err(|e| EngineError::syntax(format!("{}: {}", name, e)))
}

/// Resolve `spec` to a concrete window.
///
/// A blank `From` asks for the instant at `To`; a blank `To` means the
/// newest available data (or `now` while recording is ongoing).
pub fn resolve_time(
    spec: &TimeSpecification,
    coverage: &CoverageConfig,
    now: DateTime<Utc>,
) -> Result<RequestTime> {
    let newest = coverage.newest_or(now);
    let to = if spec.to_is_blank() {
        newest
    } else {
        parse_field("To", &spec.to)?
    };

    let time = if spec.from_is_blank() {
        RequestTime::Instant(to)
    } else {
        let from = parse_field("From", &spec.from)?;
        if from > to {
            return Err(EngineError::invalid(format!(
                "From {} is after To {}",
                spec.from,
                if spec.to_is_blank() { "(newest)" } else { spec.to.as_str() }
            )));
        }
        RequestTime::Window(TimeWindow::new(from, to))
    };

    let window = time.window();
    if window.start < coverage.oldest {
        return Err(EngineError::out_of_range(format!(
            "data starts at {}",
            giot_common::format_iso8601(&coverage.oldest)
        )));
    }
    let latest = coverage.latest_allowed(now);
    if window.end > latest {
        return Err(EngineError::out_of_range(format!(
            "data ends at {}",
            giot_common::format_iso8601(&latest)
        )));
    }

    Ok(time)
}

/// Start of the aligned step of `interval` containing `t`.
pub fn align_floor(t: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    let date = t.date_naive();
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    let aligned = match interval {
        Interval::RawValues => Some(t),
        Interval::TenMinutes => {
            date.and_hms_opt(t.hour(), t.minute() - t.minute() % 10, 0)
                .map(|n| n.and_utc())
        }
        Interval::Hour => date.and_hms_opt(t.hour(), 0, 0).map(|n| n.and_utc()),
        Interval::DayOfWeek => midnight(date),
        Interval::Week => {
            let back = Duration::days(date.weekday().num_days_from_monday() as i64);
            midnight(date - back)
        }
        Interval::Month => date.with_day(1).and_then(midnight),
        Interval::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).and_then(midnight),
    };
    aligned.unwrap_or(t)
}

/// Start of the step following the aligned step `start`.
pub fn next_step(start: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
    let next = match interval {
        Interval::RawValues => None,
        Interval::TenMinutes => start.checked_add_signed(Duration::minutes(10)),
        Interval::Hour => start.checked_add_signed(Duration::hours(1)),
        Interval::DayOfWeek => start.checked_add_signed(Duration::days(1)),
        Interval::Week => start.checked_add_signed(Duration::weeks(1)),
        Interval::Month => start.checked_add_months(Months::new(1)),
        Interval::Year => start.checked_add_months(Months::new(12)),
    };
    next.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Calendar slot of `t` when folding by `interval`.
///
/// Ten-minute slots run 0..144 within a day, hours 0..24, weekdays 0..7
/// starting on Monday, ISO weeks 0..53 and months 0..12.
pub fn slot_index(t: DateTime<Utc>, interval: Interval) -> Option<usize> {
    match interval {
        Interval::TenMinutes => Some((t.hour() * 6 + t.minute() / 10) as usize),
        Interval::Hour => Some(t.hour() as usize),
        Interval::DayOfWeek => Some(t.weekday().num_days_from_monday() as usize),
        Interval::Week => Some(t.iso_week().week0() as usize),
        Interval::Month => Some(t.month0() as usize),
        Interval::RawValues | Interval::Year => None,
    }
}

/// How timestamps map to output bins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinLayout {
    /// Consecutive aligned bins `[starts[i], starts[i+1])`, the last one
    /// ending at `end`.
    Linear {
        starts: Vec<DateTime<Utc>>,
        end: DateTime<Utc>,
    },
    /// Calendar slots folded over the whole window.
    Periodic { size: usize },
}

/// The plan the aggregator follows for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinPlan {
    /// Every sample in the window, unbinned.
    Raw { window: TimeWindow },
    /// One value per target: the sample nearest to `at`.
    Instant { at: DateTime<Utc> },
    /// Samples reduced per bin.
    Binned {
        window: TimeWindow,
        /// Base step samples are resampled to before interpolation.
        step: Interval,
        operation: Operation,
        layout: BinLayout,
    },
}

impl BinPlan {
    /// Number of output values per target, `None` for raw plans.
    pub fn bin_count(&self) -> Option<usize> {
        match self {
            BinPlan::Raw { .. } => None,
            BinPlan::Instant { .. } => Some(1),
            BinPlan::Binned { layout, .. } => Some(match layout {
                BinLayout::Linear { starts, .. } => starts.len(),
                BinLayout::Periodic { size } => *size,
            }),
        }
    }

    /// Output bin for a sample taken at `t`, `None` when it falls outside.
    pub fn bin_of(&self, t: DateTime<Utc>) -> Option<usize> {
        match self {
            BinPlan::Raw { .. } | BinPlan::Instant { .. } => None,
            BinPlan::Binned {
                window,
                step,
                layout,
                ..
            } => match layout {
                BinLayout::Linear { starts, end } => {
                    if t >= *end {
                        return None;
                    }
                    starts.partition_point(|s| *s <= t).checked_sub(1)
                }
                BinLayout::Periodic { size } => {
                    // Same closing-edge rule as the linear layout.
                    if !window.contains_half_open(&t) {
                        return None;
                    }
                    slot_index(t, *step).filter(|slot| slot < size)
                }
            },
        }
    }

    /// Output bin of an aligned resampling step starting at `step_start`.
    ///
    /// Steps are bucketed by their start, which may precede the window.
    pub fn bin_of_step(&self, step_start: DateTime<Utc>) -> Option<usize> {
        match self {
            BinPlan::Binned {
                step,
                layout: BinLayout::Periodic { size },
                ..
            } => slot_index(step_start, *step).filter(|slot| slot < size),
            _ => self.bin_of(step_start),
        }
    }

    /// Window samples are fetched for.
    pub fn fetch_window(&self, tolerance: Duration) -> TimeWindow {
        match self {
            BinPlan::Raw { window } | BinPlan::Binned { window, .. } => *window,
            BinPlan::Instant { at } => TimeWindow::instant(*at).widen(tolerance),
        }
    }
}

/// Build the plan for a resolved time and statistics.
pub fn plan_bins(time: RequestTime, statistics: &Statistics, max_bins: usize) -> Result<BinPlan> {
    let window = match time {
        RequestTime::Instant(at) => return Ok(BinPlan::Instant { at }),
        RequestTime::Window(window) => window,
    };

    let interval = statistics.interval;
    if interval == Interval::RawValues {
        return Ok(BinPlan::Raw { window });
    }

    let operation = statistics.operation;
    let layout = match (operation, interval.period_size()) {
        (op, Some(size)) if op != Operation::None => BinLayout::Periodic { size },
        _ => linear_layout(&window, interval, max_bins)?,
    };

    Ok(BinPlan::Binned {
        window,
        step: interval,
        operation,
        layout,
    })
}

/// Aligned bins touched by `window`. A bin that only shares the window's
/// closing instant is not included, except for zero-length windows.
fn linear_layout(window: &TimeWindow, interval: Interval, max_bins: usize) -> Result<BinLayout> {
    let mut starts = vec![align_floor(window.start, interval)];
    let mut next = next_step(starts[0], interval);
    while next < window.end {
        if starts.len() >= max_bins {
            return Err(EngineError::out_of_range(format!(
                "more than {} {} bins requested",
                max_bins, interval
            )));
        }
        starts.push(next);
        next = next_step(next, interval);
    }
    Ok(BinLayout::Linear { starts, end: next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use giot_common::LongLat;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn coverage() -> CoverageConfig {
        CoverageConfig {
            organization_info: "test".to_string(),
            copy_right: String::new(),
            oldest: at(2010, 1, 1, 0, 0),
            newest: Some(at(2020, 1, 1, 0, 0)),
            max_forecast_secs: 3600.0,
            south_west: LongLat::new(17.0, 59.0),
            north_east: LongLat::new(18.0, 60.0),
            datasets: vec!["NO2".to_string()],
            data_url: String::new(),
        }
    }

    fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> RequestTime {
        RequestTime::Window(TimeWindow::new(from, to))
    }

    #[test]
    fn test_periodic_sizes() {
        let w = window(at(2012, 4, 23, 0, 0), at(2012, 4, 23, 5, 0));
        for (interval, size) in [
            (Interval::TenMinutes, 168),
            (Interval::Hour, 24),
            (Interval::DayOfWeek, 7),
            (Interval::Week, 53),
            (Interval::Month, 12),
        ] {
            let plan = plan_bins(w, &Statistics::new(interval, Operation::Max), 1000).unwrap();
            assert_eq!(plan.bin_count(), Some(size), "{}", interval);
        }
    }

    #[test]
    fn test_hour_of_day_folding() {
        let w = window(at(2012, 4, 23, 0, 0), at(2012, 4, 25, 0, 0));
        let plan = plan_bins(w, &Statistics::new(Interval::Hour, Operation::Mean), 1000).unwrap();
        assert_eq!(plan.bin_of(at(2012, 4, 23, 1, 10)), Some(1));
        assert_eq!(plan.bin_of(at(2012, 4, 24, 1, 59)), Some(1));
        assert_eq!(plan.bin_of(at(2012, 4, 24, 23, 0)), Some(23));
        assert_eq!(plan.bin_of(at(2012, 4, 26, 1, 0)), None);
    }

    #[test]
    fn test_periodic_and_linear_share_closing_edge() {
        let w = window(at(2012, 4, 23, 1, 0), at(2012, 4, 23, 2, 0));
        let periodic =
            plan_bins(w, &Statistics::new(Interval::Hour, Operation::Mean), 1000).unwrap();
        let linear = plan_bins(w, &Statistics::new(Interval::Hour, Operation::None), 1000).unwrap();

        assert_eq!(periodic.bin_of(at(2012, 4, 23, 1, 0)), Some(1));
        assert_eq!(periodic.bin_of(at(2012, 4, 23, 2, 0)), None);
        assert_eq!(linear.bin_of(at(2012, 4, 23, 2, 0)), None);
    }

    #[test]
    fn test_slot_indices() {
        // 2012-04-23 is a Monday in ISO week 17
        let t = at(2012, 4, 23, 13, 47);
        assert_eq!(slot_index(t, Interval::TenMinutes), Some(82));
        assert_eq!(slot_index(t, Interval::DayOfWeek), Some(0));
        assert_eq!(slot_index(t, Interval::Week), Some(16));
        assert_eq!(slot_index(t, Interval::Month), Some(3));
        assert_eq!(slot_index(at(2012, 4, 29, 0, 0), Interval::DayOfWeek), Some(6));
    }

    #[test]
    fn test_linear_bins_aligned_independent_of_from() {
        let w = window(at(2012, 4, 23, 0, 25), at(2012, 4, 23, 3, 0));
        let plan = plan_bins(w, &Statistics::new(Interval::Hour, Operation::None), 1000).unwrap();
        match &plan {
            BinPlan::Binned {
                layout: BinLayout::Linear { starts, end },
                ..
            } => {
                assert_eq!(starts[0], at(2012, 4, 23, 0, 0));
                assert_eq!(starts.len(), 3);
                assert_eq!(*end, at(2012, 4, 23, 3, 0));
            }
            other => panic!("unexpected plan {:?}", other),
        }
        assert_eq!(plan.bin_of(at(2012, 4, 23, 0, 30)), Some(0));
        assert_eq!(plan.bin_of(at(2012, 4, 23, 2, 59)), Some(2));
    }

    #[test]
    fn test_week_and_month_alignment() {
        // Thursday
        let t = at(2020, 2, 13, 10, 0);
        assert_eq!(align_floor(t, Interval::Week), at(2020, 2, 10, 0, 0));
        assert_eq!(align_floor(t, Interval::Month), at(2020, 2, 1, 0, 0));
        assert_eq!(next_step(at(2020, 1, 1, 0, 0), Interval::Month), at(2020, 2, 1, 0, 0));
        assert_eq!(next_step(at(2020, 1, 1, 0, 0), Interval::Year), at(2021, 1, 1, 0, 0));
    }

    #[test]
    fn test_year_bins_per_calendar_year() {
        let w = window(at(2012, 6, 1, 0, 0), at(2014, 2, 1, 0, 0));
        let plan = plan_bins(w, &Statistics::new(Interval::Year, Operation::Max), 1000).unwrap();
        assert_eq!(plan.bin_count(), Some(3));
        assert_eq!(plan.bin_of(at(2013, 12, 31, 23, 0)), Some(1));
    }

    #[test]
    fn test_bin_cap() {
        let w = window(at(2012, 1, 1, 0, 0), at(2012, 2, 1, 0, 0));
        let err = plan_bins(w, &Statistics::new(Interval::TenMinutes, Operation::None), 100)
            .unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange(_)));
    }

    #[test]
    fn test_raw_plan_has_no_bins() {
        let w = window(at(2012, 1, 1, 0, 0), at(2012, 1, 2, 0, 0));
        let plan = plan_bins(w, &Statistics::raw(), 10).unwrap();
        assert_eq!(plan.bin_count(), None);
    }

    #[test]
    fn test_blank_from_is_instant() {
        let spec = TimeSpecification::new("", "2015-06-01T12:00:00Z");
        let time = resolve_time(&spec, &coverage(), Utc::now()).unwrap();
        assert_eq!(time, RequestTime::Instant(at(2015, 6, 1, 12, 0)));
    }

    #[test]
    fn test_blank_to_is_newest() {
        let spec = TimeSpecification::new("2019-12-31T00:00:00Z", "");
        let time = resolve_time(&spec, &coverage(), Utc::now()).unwrap();
        assert_eq!(time.window().end, at(2020, 1, 1, 0, 0));

        let both_blank = resolve_time(&TimeSpecification::default(), &coverage(), Utc::now());
        assert_eq!(both_blank.unwrap(), RequestTime::Instant(at(2020, 1, 1, 0, 0)));
    }

    #[test]
    fn test_time_errors() {
        let cov = coverage();
        let now = Utc::now();

        let inverted = TimeSpecification::new("2015-01-02", "2015-01-01");
        assert!(matches!(
            resolve_time(&inverted, &cov, now),
            Err(EngineError::InvalidRequest(_))
        ));

        let garbage = TimeSpecification::new("soon", "2015-01-01");
        assert!(matches!(
            resolve_time(&garbage, &cov, now),
            Err(EngineError::Syntax(_))
        ));

        let too_old = TimeSpecification::new("2009-12-31", "2015-01-01");
        assert!(matches!(
            resolve_time(&too_old, &cov, now),
            Err(EngineError::OutOfRange(_))
        ));

        // Within the one hour forecast extension
        let forecast = TimeSpecification::new("2019-12-31", "2020-01-01T00:59:00Z");
        assert!(resolve_time(&forecast, &cov, now).is_ok());

        let beyond = TimeSpecification::new("2019-12-31", "2020-01-01T01:01:00Z");
        assert!(matches!(
            resolve_time(&beyond, &cov, now),
            Err(EngineError::OutOfRange(_))
        ));
    }
}
