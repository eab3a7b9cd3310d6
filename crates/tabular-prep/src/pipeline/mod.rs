//! Pipeline module.
//!
//! This module provides the preprocessing pipeline that chains imputation,
//! categorical encoding and label encoding.

mod builder;

pub use builder::{Pipeline, PipelineBuilder};
