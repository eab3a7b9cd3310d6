//! Configuration types for the preprocessing pipeline.
//!
//! Every input column must be classified explicitly with a [`ColumnSpec`];
//! the pipeline never guesses a column's role and never coerces an
//! unclassified column. Configurations are built with the builder pattern or
//! loaded from JSON.

use crate::encoders::{Encoding, UnseenCategoryPolicy};
use crate::error::{PreprocessingError, Result};
use crate::imputers::{ImputeStrategy, MissingMarker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role of a column in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Numeric feature, passed through as a number.
    Numeric,
    /// Categorical feature, encoded with the given encoding.
    Categorical(Encoding),
    /// Target column. When `encode` is false the values must already be
    /// numeric and are passed through.
    Label { encode: bool },
    /// Excluded from the output.
    Ignored,
}

impl ColumnRole {
    fn name(&self) -> &'static str {
        match self {
            ColumnRole::Numeric => "numeric",
            ColumnRole::Categorical(_) => "categorical",
            ColumnRole::Label { .. } => "label",
            ColumnRole::Ignored => "ignored",
        }
    }
}

/// Classification of one input column.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_prep::{ColumnSpec, Encoding, ImputeStrategy};
///
/// let specs = vec![
///     ColumnSpec::categorical(0, Encoding::OneHot),
///     ColumnSpec::numeric(1).impute(ImputeStrategy::Mean),
///     ColumnSpec::numeric(2).impute(ImputeStrategy::Mean),
///     ColumnSpec::label(3),
/// ];
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Zero-based column index in the input table.
    pub column: usize,
    pub role: ColumnRole,
    /// Imputation strategy; only valid for numeric and categorical columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impute: Option<ImputeStrategy>,
    /// Per-column missing-value marker overriding the pipeline default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingMarker>,
}

impl ColumnSpec {
    pub fn new(column: usize, role: ColumnRole) -> Self {
        Self {
            column,
            role,
            impute: None,
            missing: None,
        }
    }

    pub fn numeric(column: usize) -> Self {
        Self::new(column, ColumnRole::Numeric)
    }

    pub fn categorical(column: usize, encoding: Encoding) -> Self {
        Self::new(column, ColumnRole::Categorical(encoding))
    }

    /// Label column that is label-encoded.
    pub fn label(column: usize) -> Self {
        Self::new(column, ColumnRole::Label { encode: true })
    }

    /// Label column whose numeric values are passed through.
    pub fn numeric_label(column: usize) -> Self {
        Self::new(column, ColumnRole::Label { encode: false })
    }

    pub fn ignored(column: usize) -> Self {
        Self::new(column, ColumnRole::Ignored)
    }

    /// Set the imputation strategy.
    pub fn impute(mut self, strategy: ImputeStrategy) -> Self {
        self.impute = Some(strategy);
        self
    }

    /// Set a per-column missing-value marker.
    pub fn missing_marker(mut self, marker: MissingMarker) -> Self {
        self.missing = Some(marker);
        self
    }

    /// Whether this column becomes part of the feature matrix.
    pub fn is_feature(&self) -> bool {
        matches!(self.role, ColumnRole::Numeric | ColumnRole::Categorical(_))
    }
}

/// Configuration for the preprocessing pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// One spec per input column.
    pub columns: Vec<ColumnSpec>,

    /// Policy for categories not seen during fit.
    /// Default: Reject
    #[serde(default)]
    pub unseen_category: UnseenCategoryPolicy,

    /// Missing-value marker for columns without their own.
    /// Default: Absent
    #[serde(default)]
    pub missing: MissingMarker,
}

impl PipelineConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = PipelineConfig::builder()
    ///     .column(ColumnSpec::categorical(0, Encoding::OneHot))
    ///     .column(ColumnSpec::numeric(1).impute(ImputeStrategy::Mean))
    ///     .column(ColumnSpec::label(2))
    ///     .build()?;
    /// ```
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config
            .validate()
            .map_err(|e| PreprocessingError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    ///
    /// Checks that do not need a table: duplicate columns, more than one
    /// label, and imputation settings on columns that are never imputed.
    /// Column ranges and full coverage are checked when the pipeline is fit.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        let mut seen = BTreeSet::new();
        let mut label: Option<usize> = None;

        for spec in &self.columns {
            if !seen.insert(spec.column) {
                return Err(ConfigValidationError::DuplicateColumn(spec.column));
            }

            if let ColumnRole::Label { .. } = spec.role {
                if let Some(first) = label {
                    return Err(ConfigValidationError::MultipleLabels(first, spec.column));
                }
                label = Some(spec.column);
            }

            if spec.impute.is_some() && !spec.is_feature() {
                return Err(ConfigValidationError::ImputeNotAllowed {
                    column: spec.column,
                    role: spec.role.name(),
                });
            }

            if spec.missing.is_some() && spec.impute.is_none() {
                return Err(ConfigValidationError::MarkerWithoutImputation(spec.column));
            }
        }

        Ok(())
    }

    /// The label column spec, if any.
    pub fn label(&self) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|spec| matches!(spec.role, ColumnRole::Label { .. }))
    }

    /// Spec for a column index, if classified.
    pub fn spec(&self, column: usize) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.column == column)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column {0} is classified more than once")]
    DuplicateColumn(usize),

    #[error("Only one label column is allowed, found columns {0} and {1}")]
    MultipleLabels(usize, usize),

    #[error("Column {column} is a {role} column and cannot be imputed")]
    ImputeNotAllowed { column: usize, role: &'static str },

    #[error("Column {0} has a missing-value marker but no imputation strategy")]
    MarkerWithoutImputation(usize),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    columns: Vec<ColumnSpec>,
    unseen_category: Option<UnseenCategoryPolicy>,
    missing: Option<MissingMarker>,
}

impl PipelineConfigBuilder {
    /// Add a column spec.
    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    /// Add several column specs.
    pub fn columns(mut self, specs: impl IntoIterator<Item = ColumnSpec>) -> Self {
        self.columns.extend(specs);
        self
    }

    /// Set the policy for categories not seen during fit.
    pub fn unseen_category(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.unseen_category = Some(policy);
        self
    }

    /// Set the default missing-value marker.
    pub fn missing_marker(mut self, marker: MissingMarker) -> Self {
        self.missing = Some(marker);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            columns: self.columns,
            unseen_category: self.unseen_category.unwrap_or_default(),
            missing: self.missing.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
