//! Target/label column encoding.
//!
//! Independent of feature encoding: the label column gets its own
//! fit/transform pair and can be decoded back into class names.

use crate::encoders::CategoryVocabulary;
use crate::error::{PreprocessingError, Result};
use crate::types::Table;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Encodes a single label column into class codes.
///
/// Classes are ordered lexicographically, so `["No", "Yes"]` always maps to
/// `{"No": 0, "Yes": 1}`.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    fitted: Option<FittedLabelEncoder>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the classes of `column`.
    pub fn fit(&mut self, table: &Table, column: usize) -> Result<&FittedLabelEncoder> {
        let classes = CategoryVocabulary::fit(table.column(column)?, column)?;
        debug!(column, classes = classes.len(), "fitted label column");

        Ok(self.fitted.insert(FittedLabelEncoder {
            column,
            width: table.width(),
            classes,
        }))
    }

    /// Encode the label column of `table`.
    pub fn transform(&self, table: &Table) -> Result<Vec<usize>> {
        self.require_fitted()?.transform(table)
    }

    /// Fit on `table` and encode it in one step.
    pub fn fit_transform(&mut self, table: &Table, column: usize) -> Result<Vec<usize>> {
        self.fit(table, column)?.transform(table)
    }

    /// Map codes back to class names.
    pub fn inverse_transform(&self, codes: &[usize]) -> Result<Vec<String>> {
        self.require_fitted()?.inverse_transform(codes)
    }

    /// Fitted classes in code order.
    pub fn classes(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.classes())
    }

    /// Learned parameters, if fitted.
    pub fn fitted(&self) -> Option<&FittedLabelEncoder> {
        self.fitted.as_ref()
    }

    fn require_fitted(&self) -> Result<&FittedLabelEncoder> {
        self.fitted.as_ref().ok_or(PreprocessingError::NotFitted {
            component: "LabelEncoder",
        })
    }
}

/// Immutable class vocabulary learned by [`LabelEncoder::fit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FittedLabelEncoder {
    column: usize,
    width: usize,
    classes: CategoryVocabulary,
}

static_assertions::assert_impl_all!(FittedLabelEncoder: Send, Sync);

impl FittedLabelEncoder {
    /// Index of the label column.
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn classes(&self) -> &[String] {
        self.classes.categories()
    }

    /// Code of a class name.
    pub fn code(&self, class: &str) -> Option<usize> {
        self.classes.code(class)
    }

    /// Encode the label column of `table`. Unseen classes are always rejected.
    pub fn transform(&self, table: &Table) -> Result<Vec<usize>> {
        table.check_width(self.width)?;

        table
            .column(self.column)?
            .enumerate()
            .map(|(row, cell)| {
                let key = cell.category_key().ok_or(PreprocessingError::MissingValue {
                    column: self.column,
                    row,
                })?;
                self.classes
                    .code(&key)
                    .ok_or(PreprocessingError::UnseenCategory {
                        column: self.column,
                        value: key,
                    })
            })
            .collect()
    }

    /// Map codes back to class names.
    pub fn inverse_transform(&self, codes: &[usize]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&code| {
                self.classes
                    .category(code)
                    .map(str::to_string)
                    .ok_or(PreprocessingError::UnknownLabelCode(code))
            })
            .collect()
    }
}
