//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use telem_rs::{Series, TelemValue};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Read every sample of a numeric series as f64
pub fn values_f64<I: IntoIterator<Item = TelemValue>>(values: I) -> Vec<f64> {
    values
        .into_iter()
        .map(|v| v.as_f64().expect("numeric sample"))
        .collect()
}

/// Float32 series from a slice, placed at `alignment`
pub fn f32_series(values: &[f32], alignment: u64) -> Series {
    Series::from(values.to_vec()).with_alignment(alignment)
}
