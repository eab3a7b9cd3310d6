//! Shared utilities for the preprocessing pipeline.
//!
//! This module contains helper functions used across multiple modules
//! to keep ordering and formatting rules in one place.

use crate::types::Cell;
use polars::prelude::*;
use std::cmp::Ordering;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Missing Value Markers
// =============================================================================

/// Text tokens commonly used to mark a missing value in exported data.
pub const MISSING_TOKENS: [&str; 9] = [
    "", "na", "n/a", "nan", "null", "none", "missing", "#n/a", "?",
];

/// Check if a string is one of `tokens`.
///
/// Comparison ignores surrounding whitespace and ASCII case.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_prep::utils::{MISSING_TOKENS, is_missing_token};
///
/// assert!(is_missing_token("N/A", &MISSING_TOKENS));
/// assert!(is_missing_token("  ", &MISSING_TOKENS));
/// assert!(!is_missing_token("42", &MISSING_TOKENS));
/// ```
pub fn is_missing_token<S: AsRef<str>>(s: &str, tokens: &[S]) -> bool {
    let s = s.trim();
    tokens
        .iter()
        .any(|token| token.as_ref().trim().eq_ignore_ascii_case(s))
}

// =============================================================================
// Cell Ordering and Formatting
// =============================================================================

/// Shortest round-trip decimal form of a number (`1.0` -> `"1"`).
///
/// `-0.0` formats as `"0"`, matching `-0.0 == 0.0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    n.to_string()
}

/// Total order over cells: numbers (by value), then text (bytewise), then
/// missing.
pub fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => x.total_cmp(y),
        (Cell::Number(_), _) => Ordering::Less,
        (_, Cell::Number(_)) => Ordering::Greater,
        (Cell::Text(x), Cell::Text(y)) => x.cmp(y),
        (Cell::Text(_), Cell::Missing) => Ordering::Less,
        (Cell::Missing, Cell::Text(_)) => Ordering::Greater,
        (Cell::Missing, Cell::Missing) => Ordering::Equal,
    }
}

/// Most frequent cell; ties go to the smallest cell under [`compare_cells`].
pub fn most_frequent(values: &[&Cell]) -> Option<Cell> {
    let mut sorted: Vec<&Cell> = values.to_vec();
    sorted.sort_by(|a, b| compare_cells(a, b));

    let mut best: Option<(&Cell, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let run = sorted[i..]
            .iter()
            .take_while(|c| compare_cells(c, &sorted[i]) == Ordering::Equal)
            .count();
        // Strictly greater keeps the earliest (smallest) value on ties.
        if best.is_none_or(|(_, count)| run > count) {
            best = Some((sorted[i], run));
        }
        i += run;
    }

    best.map(|(cell, _)| cell.clone())
}

/// Median of numeric values; the mean of the two middle values for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
