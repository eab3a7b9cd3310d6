//! Custom error types for the preprocessing pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Every
//! failure is surfaced to the caller immediately: components never recover
//! silently and never return a partially transformed table.
//!
//! Errors are serializable as `{ code, message }` so that wrappers (the CLI's
//! `--json` mode, or any service embedding the library) can hand them to a
//! consumer without string matching.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the preprocessing pipeline.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// `transform` was called on a component that has not been fitted.
    #[error("{component} has not been fitted; call fit before transform")]
    NotFitted { component: &'static str },

    /// Imputation strategy could not be recognized or is unusable.
    #[error("Invalid imputation strategy: {0}")]
    InvalidStrategy(String),

    /// A learned fill value would itself count as missing (e.g. the mean of
    /// `+inf` and `-inf`).
    #[error("Column {column}: fill value '{value}' would itself be missing")]
    InvalidFillValue { column: usize, value: String },

    /// A column had no usable (non-missing) values to learn from.
    #[error("Column {column} has no non-missing values to fit on")]
    EmptyColumn { column: usize },

    /// A category seen at transform time was absent from the fitted vocabulary.
    #[error("Column {column}: category '{value}' was not seen during fit")]
    UnseenCategory { column: usize, value: String },

    /// A column index is outside the table.
    #[error("Column index {column} is out of range for a table with {width} columns")]
    ColumnIndex { column: usize, width: usize },

    /// The table does not have the shape the component was fitted on.
    #[error("Shape mismatch: expected {expected} columns, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    /// A table was constructed without any rows.
    #[error("Table must contain at least one row")]
    EmptyTable,

    /// A column was never assigned a role in the pipeline configuration.
    #[error("Column {0} is not classified; every column needs an explicit role")]
    UnclassifiedColumn(usize),

    /// A column was assigned more than one role.
    #[error("Column {0} is classified more than once")]
    DuplicateColumn(usize),

    /// A missing value reached a step that cannot accept it.
    #[error("Missing value in column {column}, row {row}")]
    MissingValue { column: usize, row: usize },

    /// A non-numeric value reached a step that requires numbers.
    #[error("Non-numeric value '{value}' in column {column}, row {row}")]
    NonNumeric {
        column: usize,
        row: usize,
        value: String,
    },

    /// A label code could not be mapped back to a class.
    #[error("Label code {0} has no matching class")]
    UnknownLabelCode(usize),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFitted { .. } => "NOT_FITTED",
            Self::InvalidStrategy(_) => "INVALID_STRATEGY",
            Self::InvalidFillValue { .. } => "INVALID_FILL_VALUE",
            Self::EmptyColumn { .. } => "EMPTY_COLUMN",
            Self::UnseenCategory { .. } => "UNSEEN_CATEGORY",
            Self::ColumnIndex { .. } => "COLUMN_INDEX",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::EmptyTable => "EMPTY_TABLE",
            Self::UnclassifiedColumn(_) => "UNCLASSIFIED_COLUMN",
            Self::DuplicateColumn(_) => "DUPLICATE_COLUMN",
            Self::MissingValue { .. } => "MISSING_VALUE",
            Self::NonNumeric { .. } => "NON_NUMERIC",
            Self::UnknownLabelCode(_) => "UNKNOWN_LABEL_CODE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means a component was used before `fit`.
    pub fn is_not_fitted(&self) -> bool {
        match self {
            Self::NotFitted { .. } => true,
            Self::WithContext { source, .. } => source.is_not_fitted(),
            _ => false,
        }
    }
}

impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}
