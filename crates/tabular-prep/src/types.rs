//! Core data types: cells, input tables and processed output.

use crate::encoders::Encoding;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::imputers::ImputeStrategy;
use crate::utils::{format_number, is_numeric_dtype};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Cell
// ============================================================================

/// A single value in a [`Table`].
///
/// Serialized untagged: numbers as JSON numbers, text as strings and
/// `Missing` as `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    /// The absence-of-value token.
    #[default]
    Missing,
}

impl Cell {
    /// Numeric value, if this cell holds a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text value, if this cell holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for `Missing` and for NaN numbers.
    pub fn is_absent(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(_) => false,
        }
    }

    /// Key under which this cell is treated as a category.
    ///
    /// Numbers use their shortest round-trip decimal form, so `1.0` and `1`
    /// share the key `"1"`. Returns `None` for absent cells.
    pub fn category_key(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if !n.is_nan() => Some(format_number(*n)),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => f.write_str("<missing>"),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Missing, Into::into)
    }
}

// ============================================================================
// Table
// ============================================================================

/// An in-memory rectangular table of [`Cell`]s.
///
/// The column count is fixed at construction, every row has exactly that many
/// cells and there is at least one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    names: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table with generated column names (`column_0`, `column_1`, ...).
    pub fn new(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let names = (0..width).map(|i| format!("column_{}", i)).collect();
        Self::with_names(names, rows)
    }

    /// Build a table with explicit column names.
    pub fn with_names(names: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(PreprocessingError::EmptyTable);
        }

        let width = names.len();
        if let Some(row) = rows.iter().find(|row| row.len() != width) {
            return Err(PreprocessingError::ShapeMismatch {
                expected: width,
                found: row.len(),
            });
        }

        Ok(Self { names, rows })
    }

    /// Assemble a table whose shape is already known to be valid.
    pub(crate) fn from_parts(names: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(!rows.is_empty());
        debug_assert!(rows.iter().all(|row| row.len() == names.len()));
        Self { names, rows }
    }

    /// Convert a polars DataFrame into a table.
    ///
    /// Numeric columns become [`Cell::Number`], everything else is cast to
    /// string and becomes [`Cell::Text`]. Nulls become [`Cell::Missing`].
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let height = df.height();
        if height == 0 {
            return Err(PreprocessingError::EmptyTable);
        }

        let mut names = Vec::with_capacity(df.width());
        let mut rows: Vec<Vec<Cell>> = (0..height)
            .map(|_| Vec::with_capacity(df.width()))
            .collect();

        for column in df.get_columns() {
            names.push(column.name().to_string());
            let series = column.as_materialized_series();

            if is_numeric_dtype(series.dtype()) {
                let floats = series
                    .cast(&DataType::Float64)
                    .context(format!("Casting column '{}' to Float64", column.name()))?;
                for (row, value) in floats.f64()?.into_iter().enumerate() {
                    rows[row].push(Cell::from(value));
                }
            } else {
                let strings = series
                    .cast(&DataType::String)
                    .context(format!("Casting column '{}' to String", column.name()))?;
                for (row, value) in strings.str()?.into_iter().enumerate() {
                    rows[row].push(Cell::from(value));
                }
            }
        }

        Ok(Self { names, rows })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Cell at `(row, column)`, if in range.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Fail with [`PreprocessingError::ColumnIndex`] unless `column` is in range.
    pub fn check_column(&self, column: usize) -> Result<()> {
        if column >= self.width() {
            return Err(PreprocessingError::ColumnIndex {
                column,
                width: self.width(),
            });
        }
        Ok(())
    }

    /// Fail with [`PreprocessingError::ShapeMismatch`] unless the width matches.
    pub fn check_width(&self, expected: usize) -> Result<()> {
        if self.width() != expected {
            return Err(PreprocessingError::ShapeMismatch {
                expected,
                found: self.width(),
            });
        }
        Ok(())
    }

    /// Iterate over the cells of one column, top to bottom.
    pub fn column(&self, column: usize) -> Result<impl Iterator<Item = &Cell> + '_> {
        self.check_column(column)?;
        Ok(self.rows.iter().map(move |row| &row[column]))
    }

    /// New table containing only `columns`, in the given order.
    pub fn select(&self, columns: &[usize]) -> Result<Table> {
        for &column in columns {
            self.check_column(column)?;
        }

        let names = columns.iter().map(|&c| self.names[c].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| columns.iter().map(|&c| row[c].clone()).collect())
            .collect();

        Ok(Self::from_parts(names, rows))
    }
}

// ============================================================================
// Processed output
// ============================================================================

/// Numeric output of the pipeline: a feature matrix plus optional labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedTable {
    /// One name per feature column; one-hot columns are `<column>=<category>`.
    pub feature_names: Vec<String>,
    /// Row-major feature matrix.
    pub features: Vec<Vec<f64>>,
    pub label_name: Option<String>,
    /// Encoded (or numeric pass-through) label per row.
    pub labels: Option<Vec<f64>>,
    pub summary: PreprocessingSummary,
}

impl ProcessedTable {
    pub fn n_rows(&self) -> usize {
        self.features.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Values of one feature column, if in range.
    pub fn feature_column(&self, column: usize) -> Option<Vec<f64>> {
        if column >= self.n_features() {
            return None;
        }
        Some(self.features.iter().map(|row| row[column]).collect())
    }

    /// Convert to a polars DataFrame: feature columns, then the label column.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.n_features() + 1);

        for (j, name) in self.feature_names.iter().enumerate() {
            let values: Vec<f64> = self.features.iter().map(|row| row[j]).collect();
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        if let (Some(name), Some(labels)) = (&self.label_name, &self.labels) {
            columns.push(Series::new(name.as_str().into(), labels.clone()).into());
        }

        Ok(DataFrame::new(columns)?)
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Serializable record of what a fitted pipeline does to a table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PreprocessingSummary {
    pub rows: usize,
    pub input_columns: usize,
    pub output_columns: usize,
    /// Cells replaced by a fill value during this transform.
    pub imputed_cells: usize,
    pub fill_values: Vec<ColumnFill>,
    pub encoded_columns: Vec<EncodedColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_classes: Option<Vec<String>>,
}

/// Learned fill value for one imputed column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnFill {
    pub column: usize,
    pub name: String,
    pub strategy: ImputeStrategy,
    pub value: Cell,
}

/// Learned vocabulary for one encoded feature column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedColumn {
    pub column: usize,
    pub name: String,
    pub encoding: Encoding,
    pub categories: Vec<String>,
}
