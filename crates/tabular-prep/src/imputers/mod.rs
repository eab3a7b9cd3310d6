//! Imputation module for handling missing values.
//!
//! This module provides:
//! - Statistical imputation (mean, median, most frequent, constant)
//! - Missing-value markers (absent cells, sentinels, tokens, predicates)

mod missing;
mod statistical;

pub use missing::{MissingMarker, MissingPredicate};
pub use statistical::{FittedImputer, ImputeStrategy, Imputer};
