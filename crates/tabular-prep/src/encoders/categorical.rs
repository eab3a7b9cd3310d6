//! Categorical feature encoding.
//!
//! Label-encoded columns are replaced in place by their integer code.
//! One-hot columns are replaced by one 0/1 column per category, inserted at
//! the original column's position in vocabulary order. Every other column
//! passes through unchanged and keeps its relative order.

use crate::encoders::CategoryVocabulary;
use crate::error::{PreprocessingError, Result};
use crate::types::{Cell, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How a categorical column is turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// One 0/1 column per category.
    #[default]
    OneHot,
    /// A single column holding the category code.
    Label,
}

/// What to do with a category that was not seen during fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnseenCategoryPolicy {
    /// Fail with [`PreprocessingError::UnseenCategory`].
    #[default]
    Reject,
    /// Emit an all-zero one-hot row. Label-encoded columns still reject,
    /// since no code can stand for an unknown category.
    Ignore,
}

/// Encoder for categorical feature columns.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_prep::{CategoricalEncoder, Encoding};
///
/// let mut encoder = CategoricalEncoder::new();
/// encoder.fit(&table, &[(0, Encoding::OneHot), (2, Encoding::Label)])?;
/// let encoded = encoder.transform(&table)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CategoricalEncoder {
    unseen: UnseenCategoryPolicy,
    fitted: Option<FittedEncoder>,
}

impl CategoricalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unseen-category policy applied by encoders fitted afterwards.
    pub fn with_unseen_policy(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.unseen = policy;
        self
    }

    /// Fit integer label encoding for a single column.
    pub fn fit_label_encode(&mut self, table: &Table, column: usize) -> Result<&FittedEncoder> {
        self.fit(table, &[(column, Encoding::Label)])
    }

    /// Fit one-hot encoding for a single column.
    pub fn fit_one_hot(&mut self, table: &Table, column: usize) -> Result<&FittedEncoder> {
        self.fit(table, &[(column, Encoding::OneHot)])
    }

    /// Fit an encoding per column.
    ///
    /// Replaces any previously fitted parameters. On error the previous
    /// parameters are left untouched.
    pub fn fit(&mut self, table: &Table, plan: &[(usize, Encoding)]) -> Result<&FittedEncoder> {
        let mut columns = BTreeMap::new();

        for &(column, encoding) in plan {
            if columns.contains_key(&column) {
                return Err(PreprocessingError::DuplicateColumn(column));
            }

            let vocabulary = CategoryVocabulary::fit(table.column(column)?, column)?;
            debug!(
                column,
                encoding = ?encoding,
                categories = vocabulary.len(),
                "fitted categorical column"
            );

            columns.insert(column, ColumnEncoding { encoding, vocabulary });
        }

        Ok(self.fitted.insert(FittedEncoder {
            width: table.width(),
            unseen: self.unseen,
            columns,
        }))
    }

    /// Apply the fitted encodings.
    pub fn transform(&self, table: &Table) -> Result<Table> {
        self.fitted()
            .ok_or(PreprocessingError::NotFitted {
                component: "CategoricalEncoder",
            })?
            .transform(table)
    }

    /// Fit on `table` and transform it in one step.
    pub fn fit_transform(&mut self, table: &Table, plan: &[(usize, Encoding)]) -> Result<Table> {
        self.fit(table, plan)?.transform(table)
    }

    /// Learned parameters, if fitted.
    pub fn fitted(&self) -> Option<&FittedEncoder> {
        self.fitted.as_ref()
    }
}

/// Encoding and vocabulary learned for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEncoding {
    pub encoding: Encoding,
    pub vocabulary: CategoryVocabulary,
}

impl ColumnEncoding {
    /// Number of output columns this column expands to.
    pub fn output_width(&self) -> usize {
        match self.encoding {
            Encoding::OneHot => self.vocabulary.len(),
            Encoding::Label => 1,
        }
    }
}

/// Immutable encoding parameters learned by [`CategoricalEncoder::fit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FittedEncoder {
    width: usize,
    unseen: UnseenCategoryPolicy,
    columns: BTreeMap<usize, ColumnEncoding>,
}

static_assertions::assert_impl_all!(FittedEncoder: Send, Sync);

impl FittedEncoder {
    /// Width of the table the parameters were fitted on.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn unseen_policy(&self) -> UnseenCategoryPolicy {
        self.unseen
    }

    /// Encoded columns in ascending order.
    pub fn columns(&self) -> impl Iterator<Item = (usize, &ColumnEncoding)> + '_ {
        self.columns.iter().map(|(&c, e)| (c, e))
    }

    pub fn column(&self, column: usize) -> Option<&ColumnEncoding> {
        self.columns.get(&column)
    }

    /// Ordered categories of an encoded column.
    pub fn categories(&self, column: usize) -> Option<&[String]> {
        self.columns.get(&column).map(|e| e.vocabulary.categories())
    }

    /// Width of the transformed table.
    pub fn output_width(&self) -> usize {
        self.width - self.columns.len()
            + self.columns.values().map(ColumnEncoding::output_width).sum::<usize>()
    }

    /// Output column names for input column `names`.
    ///
    /// One-hot columns are named `<column>=<category>`.
    pub fn feature_names(&self, names: &[String]) -> Result<Vec<String>> {
        if names.len() != self.width {
            return Err(PreprocessingError::ShapeMismatch {
                expected: self.width,
                found: names.len(),
            });
        }

        let mut out = Vec::with_capacity(self.output_width());
        for (j, name) in names.iter().enumerate() {
            match self.columns.get(&j) {
                Some(ColumnEncoding {
                    encoding: Encoding::OneHot,
                    vocabulary,
                }) => {
                    out.extend(
                        vocabulary
                            .categories()
                            .iter()
                            .map(|category| format!("{}={}", name, category)),
                    );
                }
                _ => out.push(name.clone()),
            }
        }
        Ok(out)
    }

    /// Return a new table with the fitted columns encoded.
    pub fn transform(&self, table: &Table) -> Result<Table> {
        table.check_width(self.width)?;

        let names = self.feature_names(table.names())?;
        let rows = table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| self.encode_row(i, row))
            .collect::<Result<Vec<_>>>()?;

        Ok(Table::from_parts(names, rows))
    }

    fn encode_row(&self, row_index: usize, row: &[Cell]) -> Result<Vec<Cell>> {
        let mut out = Vec::with_capacity(self.output_width());

        for (column, cell) in row.iter().enumerate() {
            let Some(encoder) = self.columns.get(&column) else {
                out.push(cell.clone());
                continue;
            };

            let key = cell.category_key().ok_or(PreprocessingError::MissingValue {
                column,
                row: row_index,
            })?;
            let code = encoder.vocabulary.code(&key);

            match (encoder.encoding, code) {
                (Encoding::Label, Some(code)) => out.push(Cell::Number(code as f64)),
                (Encoding::OneHot, Some(code)) => {
                    out.extend((0..encoder.vocabulary.len()).map(|k| {
                        Cell::Number(if k == code { 1.0 } else { 0.0 })
                    }));
                }
                (Encoding::OneHot, None) if self.unseen == UnseenCategoryPolicy::Ignore => {
                    out.extend((0..encoder.vocabulary.len()).map(|_| Cell::Number(0.0)));
                }
                (_, None) => {
                    return Err(PreprocessingError::UnseenCategory { column, value: key });
                }
            }
        }

        Ok(out)
    }
}
