//! Shared test utilities for the GIoT workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Sensor, sample and coverage fixtures around Uppsala
//! - Store doubles that fail or stall, for server error paths
//! - Float assertion macros
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, FailingStore};
//! ```

pub mod fixtures;
pub mod stores;

pub use fixtures::*;
pub use stores::{FailingStore, SlowStore};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f64, 1.0_f64, 0.001_f64);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Asserts that two positions agree in longitude and latitude.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_position_approx_eq;
///
/// assert_position_approx_eq!(reply.position(), LongLat::new(17.63, 59.86), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_position_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        $crate::assert_approx_eq!(left.longitude, right.longitude, $epsilon);
        $crate::assert_approx_eq!(left.latitude, right.latitude, $epsilon);
    }};
}

/// Asserts a slice of bin values, where `NaN` in `expected` matches `NaN`.
#[macro_export]
macro_rules! assert_bins_eq {
    ($actual:expr, $expected:expr) => {{
        let actual: &[f64] = &$actual;
        let expected: &[f64] = &$expected;
        assert_eq!(actual.len(), expected.len(), "bin count differs");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "bin {}: expected NaN, got {}", i, a);
            } else {
                $crate::assert_approx_eq!(*a, *e, 1e-9);
            }
        }
    }};
}
