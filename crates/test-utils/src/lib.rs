//! Shared test utilities for the EO acquisition workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Mock catalog and raster collaborators with injectable latency and failures
//! - Catalog item and boundary fixtures
//! - Synthetic DN/QA generators
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
//! Then import in integration tests:
//!
//! ```ignore
//! use test_utils::{MockCatalog, MockRaster, fixtures};
//! ```

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use fixtures::*;
pub use generators::*;
pub use mocks::{MockCatalog, MockRaster};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(0.3501_f32, 0.35_f32, 0.001); // passes
/// assert_approx_eq!(0.4_f32, 0.35_f32, 0.001);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that two float arrays are bit-identical, NaN included.
#[macro_export]
macro_rules! assert_bits_eq {
    ($left:expr, $right:expr) => {{
        let left: Vec<u32> = $left.iter().map(|v: &f32| v.to_bits()).collect();
        let right: Vec<u32> = $right.iter().map(|v: &f32| v.to_bits()).collect();
        assert_eq!(left.len(), right.len(), "array lengths differ");
        assert!(left == right, "arrays are not bit-identical");
    }};
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.35_f32, 0.35_f64, 1e-6);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_bits_eq_with_nan() {
        let a = Array2::from_elem((2, 2), f32::NAN);
        let b = a.clone();
        assert_bits_eq!(a, b);
    }
}
