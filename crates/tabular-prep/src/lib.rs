//! Tabular Preprocessing Library
//!
//! A small, deterministic preprocessing library for tabular datasets, built
//! with Rust and Polars.
//!
//! # Overview
//!
//! This library turns a raw table of mixed cells into a numeric feature
//! matrix ready for model training:
//!
//! - **Imputation**: Mean, median, most-frequent or constant fill values,
//!   learned per column
//! - **Categorical Encoding**: Integer label encoding or one-hot expansion
//!   with a stable, lexicographic category order
//! - **Label Encoding**: A separate encoder for the target column, with
//!   inverse mapping back to class names
//! - **Pipeline**: Column roles declared once, fit on training data, applied
//!   to any table of the same shape
//!
//! Every component follows the same life cycle: construct, `fit` to learn
//! parameters, then `transform` as many times as needed. Calling `transform`
//! before `fit` fails with [`PreprocessingError::NotFitted`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabular_prep::{ColumnSpec, Encoding, ImputeStrategy, Pipeline, PipelineConfig, Table};
//! use polars::prelude::*;
//!
//! // Load data
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("Data.csv".into()))?
//!     .finish()?;
//! let table = Table::from_dataframe(&df)?;
//!
//! // Country, Age, Salary, Purchased
//! let config = PipelineConfig::builder()
//!     .column(ColumnSpec::categorical(0, Encoding::OneHot))
//!     .column(ColumnSpec::numeric(1).impute(ImputeStrategy::Mean))
//!     .column(ColumnSpec::numeric(2).impute(ImputeStrategy::Mean))
//!     .column(ColumnSpec::label(3))
//!     .build()?;
//!
//! let mut pipeline = Pipeline::builder().config(config).build()?;
//! let processed = pipeline.fit_transform(&table)?;
//!
//! println!("Features: {:?}", processed.feature_names);
//! println!("Classes: {:?}", processed.summary.label_classes);
//! ```
//!
//! # Standalone Components
//!
//! ```rust,ignore
//! use tabular_prep::{CategoricalEncoder, ImputeStrategy, Imputer, LabelEncoder};
//!
//! let mut imputer = Imputer::new();
//! let imputed = imputer.fit_transform(&table, &[1, 2], ImputeStrategy::Mean)?;
//!
//! let mut encoder = CategoricalEncoder::new();
//! encoder.fit_one_hot(&imputed, 0)?;
//! let encoded = encoder.transform(&imputed)?;
//!
//! let mut labels = LabelEncoder::new();
//! let y = labels.fit_transform(&imputed, 3)?;
//! ```

pub mod config;
pub mod encoders;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ColumnRole, ColumnSpec, ConfigValidationError, PipelineConfig, PipelineConfigBuilder,
};
pub use encoders::{
    CategoricalEncoder, CategoryVocabulary, ColumnEncoding, Encoding, FittedEncoder,
    FittedLabelEncoder, LabelEncoder, UnseenCategoryPolicy,
};
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use imputers::{FittedImputer, ImputeStrategy, Imputer, MissingMarker, MissingPredicate};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use types::{Cell, ColumnFill, EncodedColumn, PreprocessingSummary, ProcessedTable, Table};
