//! Integration tests for multi-series collections
//!
//! These tests validate:
//! - Alignment-windowed iteration over contiguous and gapped layouts
//! - Type checking when series are pushed
//! - Distance and traversal in alignment space
//! - Concatenated reads matching the individual series

mod common;

use common::builders::SeriesBuilder;
use common::{f32_series, values_f64};
use proptest::prelude::*;
use telem_rs::{DataType, MultiSeries, Series, TelemError, TelemValue};

fn gapped() -> MultiSeries {
    MultiSeries::new(vec![
        f32_series(&[1.0, 2.0, 3.0], 2),
        f32_series(&[6.0, 7.0, 8.0, 9.0, 10.0], 8),
    ])
    .unwrap()
}

fn contiguous() -> MultiSeries {
    MultiSeries::new(vec![
        f32_series(&[1.0, 2.0, 3.0, 4.0, 5.0], 2),
        f32_series(&[6.0, 7.0, 8.0, 9.0, 10.0], 7),
    ])
    .unwrap()
}

// ==================== Windowed iteration ====================

#[test]
fn test_sub_alignment_iter_over_gap() {
    // alignments 2..5 and 8..13; nothing is stored at 5, 6 or 7
    let values = values_f64(gapped().sub_alignment_iter(3, 9));
    assert_eq!(values, vec![2.0, 3.0, 6.0]);
}

#[test]
fn test_sub_alignment_iter_contiguous() {
    let values = values_f64(contiguous().sub_alignment_iter(3, 9));
    assert_eq!(values, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
}

#[test]
fn test_sub_alignment_iter_first_series_covers_gap() {
    let multi = MultiSeries::new(vec![
        f32_series(&[1.0, 2.0, 3.0, 4.0, 5.0], 2),
        f32_series(&[6.0, 7.0, 8.0, 9.0, 10.0], 8),
    ])
    .unwrap();
    assert_eq!(
        values_f64(multi.sub_alignment_iter(3, 9)),
        vec![2.0, 3.0, 4.0, 5.0, 6.0]
    );
}

#[test]
fn test_span_iter_counts_samples_not_positions() {
    let values = values_f64(gapped().sub_alignment_span_iter(4, 3));
    assert_eq!(values, vec![3.0, 6.0, 7.0]);
}

// ==================== Construction ====================

#[test]
fn test_push_mismatched_type() {
    let mut multi = MultiSeries::new(vec![f32_series(&[1.0], 0)]).unwrap();
    let err = multi.push(Series::from(vec![1u8, 2])).unwrap_err();
    assert!(matches!(
        err,
        TelemError::TypeMismatch {
            expected: DataType::Float32,
            actual: DataType::Uint8
        }
    ));
    assert_eq!(multi.series().len(), 1);
}

#[test]
fn test_new_rejects_mixed_types() {
    let result = MultiSeries::try_from(vec![
        Series::from(vec![1i64]),
        Series::from(vec![1.0f64]),
    ]);
    assert!(result.is_err());
}

#[test]
fn test_push_multi_appends_in_order() {
    let mut first = MultiSeries::new(vec![f32_series(&[1.0], 0)]).unwrap();
    let second = MultiSeries::new(vec![f32_series(&[2.0], 1), f32_series(&[3.0], 2)]).unwrap();
    first.push_multi(second).unwrap();
    assert_eq!(values_f64(&first), vec![1.0, 2.0, 3.0]);
    assert_eq!(first.at(-1), Some(TelemValue::Number(3.0)));
}

// ==================== Alignment space ====================

#[test]
fn test_distance_and_traverse_agree() {
    let multi = gapped();
    let end = multi.traverse_alignment(2, 5);
    assert_eq!(end, 10);
    assert_eq!(multi.distance(2, end), 5);
    assert_eq!(multi.traverse_alignment(end, -5), 2);
}

#[test]
fn test_traverse_contiguous_series() {
    let multi = contiguous();
    assert_eq!(multi.traverse_alignment(2, 5), 7);
    assert_eq!(multi.traverse_alignment(2, 6), 8);
    assert_eq!(multi.distance(2, 12), 10);
}

#[test]
fn test_mixed_multiples() {
    let multi = MultiSeries::new(vec![
        SeriesBuilder::new(&[1.0, 2.0]).alignment(0).alignment_multiple(10).build(),
        SeriesBuilder::new(&[3.0, 4.0]).alignment(20).build(),
    ])
    .unwrap();
    assert_eq!(multi.alignment_bounds().lower, 0);
    assert_eq!(multi.alignment_bounds().upper, 22);
    assert_eq!(multi.at_alignment(10), Some(TelemValue::Number(2.0)));
    assert_eq!(multi.at_alignment(21), Some(TelemValue::Number(4.0)));
    assert_eq!(values_f64(multi.sub_alignment_iter(5, 21)), vec![2.0, 3.0]);
}

#[test]
fn test_strings_across_series() {
    let multi = MultiSeries::new(vec![
        Series::from_strings(["alpha", "beta"]).unwrap().with_alignment(0),
        Series::from_strings(["gamma"]).unwrap().with_alignment(5),
    ])
    .unwrap();
    assert_eq!(multi.at_alignment(5), Some(TelemValue::String("gamma".to_string())));
    assert_eq!(multi.to_strings(), vec!["alpha", "beta", "gamma"]);
    assert!(multi.bounds().is_err());
}

#[test]
fn test_alignment_near_u64_max() {
    let multi = MultiSeries::new(vec![
        f32_series(&[1.0, 2.0], u64::MAX - 10),
        f32_series(&[3.0, 4.0], u64::MAX - 1),
    ])
    .unwrap();

    assert_eq!(multi.alignment_bounds().upper, u64::MAX);
    assert_eq!(multi.at_alignment(u64::MAX - 1), Some(TelemValue::Number(3.0)));
    assert_eq!(multi.at_alignment(u64::MAX - 9), Some(TelemValue::Number(2.0)));
    assert_eq!(multi.distance(u64::MAX - 10, u64::MAX), 3);
    assert_eq!(multi.traverse_alignment(u64::MAX - 10, 100), u64::MAX);
    assert_eq!(multi.traverse_alignment(u64::MAX, -3), u64::MAX - 10);
    assert_eq!(
        values_f64(multi.sub_alignment_iter(u64::MAX - 9, u64::MAX)),
        vec![2.0, 3.0]
    );
    assert!(multi.to_string().starts_with("MultiSeries(type: float32, len: 4"));
}

// ==================== Properties ====================

proptest! {
    #[test]
    fn test_concatenation_matches_parts(
        parts in prop::collection::vec(prop::collection::vec(-100i32..100, 0..10), 1..6),
    ) {
        let mut alignment = 0u64;
        let mut series = Vec::new();
        for part in &parts {
            series.push(Series::from(part.clone()).with_alignment(alignment));
            // leave a gap after every part
            alignment += part.len() as u64 + 3;
        }
        let multi = MultiSeries::new(series).unwrap();
        let flat: Vec<f64> = parts.concat().into_iter().map(f64::from).collect();

        prop_assert_eq!(multi.len(), flat.len());
        prop_assert_eq!(values_f64(&multi), flat.clone());
        for (i, v) in flat.iter().enumerate() {
            prop_assert_eq!(multi.at(i as i64), Some(TelemValue::Number(*v)));
        }
        let bounds = multi.alignment_bounds();
        prop_assert_eq!(multi.distance(bounds.lower, bounds.upper), flat.len() as i64);
        prop_assert_eq!(multi.sub_alignment_iter(bounds.lower, bounds.upper).count(), flat.len());
    }

    #[test]
    fn test_alignment_window_matches_per_series_windows(
        layout in prop::collection::vec((0usize..8, 0u64..5, 1u64..4), 1..6),
        start in 0u64..120,
        width in 0u64..60,
        steps in 0u64..40,
    ) {
        let mut cursor = 0u64;
        let mut next_value = 0i32;
        let mut series = Vec::new();
        for (len, gap, multiple) in &layout {
            let alignment = cursor + gap;
            let values: Vec<i32> = (next_value..next_value + *len as i32).collect();
            next_value += *len as i32;
            cursor = alignment + *len as u64 * multiple;
            series.push(
                Series::from(values)
                    .with_alignment(alignment)
                    .with_alignment_multiple(*multiple),
            );
        }
        let multi = MultiSeries::new(series).unwrap();
        let end = start + width;

        let expected: Vec<f64> = multi
            .series()
            .iter()
            .flat_map(|s| values_f64(s.sub_alignment_iter(start, end)))
            .collect();
        prop_assert_eq!(values_f64(multi.sub_alignment_iter(start, end)), expected.clone());
        prop_assert_eq!(multi.distance(start, end), expected.len() as i64);
        prop_assert_eq!(multi.distance(end, start), -(expected.len() as i64));

        let upper = multi.alignment_bounds().upper;
        let lower = multi.alignment_bounds().lower;
        let ahead = multi.distance(start, upper).max(0) as u64;
        let reached = multi.traverse_alignment(start, steps as i64);
        prop_assert_eq!(multi.distance(start, reached).max(0) as u64, steps.min(ahead));

        let behind = multi.distance(lower, end).max(0) as u64;
        let back = multi.traverse_alignment(end, -(steps as i64));
        prop_assert_eq!(multi.distance(back, end).max(0) as u64, steps.min(behind));

        let span = multi.sub_alignment_span_iter(start, steps as usize).count() as u64;
        prop_assert_eq!(span, steps.min(ahead));
    }
}
