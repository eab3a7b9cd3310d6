//! Statistical imputation.
//!
//! Provides mean, median, most-frequent and constant imputation with an
//! explicit fit/transform split: [`Imputer::fit`] learns one fill value per
//! column and stores it in an immutable [`FittedImputer`], which
//! [`Imputer::transform`] then applies to any table of the same width.

use crate::error::{PreprocessingError, Result};
use crate::imputers::MissingMarker;
use crate::types::{Cell, Table};
use crate::utils::{median, most_frequent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Strategy for computing a column's fill value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Arithmetic mean of the non-missing values.
    #[default]
    Mean,
    /// Median of the non-missing values.
    Median,
    /// Most common non-missing value (smallest value on ties).
    MostFrequent,
    /// A fixed value.
    Constant(Cell),
}

impl ImputeStrategy {
    /// Whether the strategy can only be computed over numbers.
    pub fn requires_numeric(&self) -> bool {
        matches!(self, ImputeStrategy::Mean | ImputeStrategy::Median)
    }
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeStrategy::Mean => f.write_str("mean"),
            ImputeStrategy::Median => f.write_str("median"),
            ImputeStrategy::MostFrequent => f.write_str("most_frequent"),
            ImputeStrategy::Constant(value) => write!(f, "constant={}", value),
        }
    }
}

/// Parses `mean`, `median`, `most_frequent` (or `mode`) and `constant=<value>`.
///
/// A constant value that parses as a number becomes [`Cell::Number`],
/// anything else [`Cell::Text`].
impl FromStr for ImputeStrategy {
    type Err = PreprocessingError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((name, value)) = s.split_once('=') {
            if name.trim().eq_ignore_ascii_case("constant") {
                let value = value.trim();
                let cell = value
                    .parse::<f64>()
                    .map(Cell::Number)
                    .unwrap_or_else(|_| Cell::from(value));
                return Ok(ImputeStrategy::Constant(cell));
            }
            return Err(PreprocessingError::InvalidStrategy(s.to_string()));
        }

        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(ImputeStrategy::Mean),
            "median" => Ok(ImputeStrategy::Median),
            "most_frequent" | "mode" => Ok(ImputeStrategy::MostFrequent),
            "constant" => Err(PreprocessingError::InvalidStrategy(
                "constant strategy needs a value, e.g. constant=0".to_string(),
            )),
            _ => Err(PreprocessingError::InvalidStrategy(s.to_string())),
        }
    }
}

/// Imputation component following the `Unfit -> Fit -> (Transform)*` cycle.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_prep::{Imputer, ImputeStrategy};
///
/// let mut imputer = Imputer::new();
/// imputer.fit(&table, &[1, 2], ImputeStrategy::Mean)?;
/// let filled = imputer.transform(&table)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Imputer {
    missing: MissingMarker,
    column_markers: BTreeMap<usize, MissingMarker>,
    fitted: Option<FittedImputer>,
}

impl Imputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the missing-value marker used for every column without an override.
    pub fn with_missing_marker(mut self, marker: MissingMarker) -> Self {
        self.missing = marker;
        self
    }

    /// Override the missing-value marker for a single column.
    pub fn with_column_marker(mut self, column: usize, marker: MissingMarker) -> Self {
        self.column_markers.insert(column, marker);
        self
    }

    /// Fit one strategy over several columns.
    pub fn fit(
        &mut self,
        table: &Table,
        columns: &[usize],
        strategy: ImputeStrategy,
    ) -> Result<&FittedImputer> {
        let plan: Vec<(usize, ImputeStrategy)> =
            columns.iter().map(|&c| (c, strategy.clone())).collect();
        self.fit_columns(table, &plan)
    }

    /// Fit a strategy per column.
    ///
    /// Replaces any previously fitted parameters. On error the previous
    /// parameters are left untouched.
    pub fn fit_columns(
        &mut self,
        table: &Table,
        plan: &[(usize, ImputeStrategy)],
    ) -> Result<&FittedImputer> {
        let mut columns = BTreeMap::new();

        for (column, strategy) in plan {
            let column = *column;
            table.check_column(column)?;
            if columns.contains_key(&column) {
                return Err(PreprocessingError::DuplicateColumn(column));
            }

            let marker = self.marker_for(column).clone();
            let fill = Self::compute_fill_value(table, column, strategy, &marker)?;
            debug!(column, strategy = %strategy, fill = %fill, "fitted imputation column");

            columns.insert(
                column,
                FittedColumn {
                    strategy: strategy.clone(),
                    fill,
                    marker,
                },
            );
        }

        Ok(self.fitted.insert(FittedImputer {
            width: table.width(),
            columns,
        }))
    }

    /// Replace missing cells of the fitted columns with their fill values.
    pub fn transform(&self, table: &Table) -> Result<Table> {
        self.fitted()
            .ok_or(PreprocessingError::NotFitted { component: "Imputer" })?
            .transform(table)
    }

    /// Fit on `table` and transform it in one step.
    pub fn fit_transform(
        &mut self,
        table: &Table,
        columns: &[usize],
        strategy: ImputeStrategy,
    ) -> Result<Table> {
        self.fit(table, columns, strategy)?.transform(table)
    }

    /// Learned parameters, if fitted.
    pub fn fitted(&self) -> Option<&FittedImputer> {
        self.fitted.as_ref()
    }

    fn marker_for(&self, column: usize) -> &MissingMarker {
        self.column_markers.get(&column).unwrap_or(&self.missing)
    }

    fn compute_fill_value(
        table: &Table,
        column: usize,
        strategy: &ImputeStrategy,
        marker: &MissingMarker,
    ) -> Result<Cell> {
        if let ImputeStrategy::Constant(value) = strategy
            && value.is_absent()
        {
            return Err(PreprocessingError::InvalidStrategy(
                "constant fill value cannot itself be missing".to_string(),
            ));
        }

        let present: Vec<(usize, &Cell)> = table
            .column(column)?
            .enumerate()
            .filter(|(_, cell)| !marker.is_missing(cell))
            .collect();

        if present.is_empty() {
            return Err(PreprocessingError::EmptyColumn { column });
        }

        let mut numbers = if strategy.requires_numeric() {
            present
                .iter()
                .map(|(row, cell)| {
                    cell.as_number().ok_or_else(|| PreprocessingError::NonNumeric {
                        column,
                        row: *row,
                        value: cell.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?
        } else {
            Vec::new()
        };

        let fill = match strategy {
            ImputeStrategy::Mean => {
                Cell::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
            ImputeStrategy::Median => Cell::from(median(&mut numbers)),
            ImputeStrategy::MostFrequent => {
                let cells: Vec<&Cell> = present.iter().map(|(_, cell)| *cell).collect();
                most_frequent(&cells).unwrap_or_default()
            }
            ImputeStrategy::Constant(value) => value.clone(),
        };

        // The fill must not be caught by the marker it replaces.
        if marker.is_missing(&fill) {
            return Err(match strategy {
                ImputeStrategy::Constant(value) => PreprocessingError::InvalidStrategy(format!(
                    "constant fill value {} is itself missing for column {}",
                    value, column
                )),
                _ => PreprocessingError::InvalidFillValue {
                    column,
                    value: fill.to_string(),
                },
            });
        }

        Ok(fill)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FittedColumn {
    strategy: ImputeStrategy,
    fill: Cell,
    marker: MissingMarker,
}

/// Immutable imputation parameters learned by [`Imputer::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedImputer {
    width: usize,
    columns: BTreeMap<usize, FittedColumn>,
}

static_assertions::assert_impl_all!(FittedImputer: Send, Sync);

impl FittedImputer {
    /// Width of the table the parameters were fitted on.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Fitted column indices in ascending order.
    pub fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.keys().copied()
    }

    pub fn fill_value(&self, column: usize) -> Option<&Cell> {
        self.columns.get(&column).map(|c| &c.fill)
    }

    pub fn strategy(&self, column: usize) -> Option<&ImputeStrategy> {
        self.columns.get(&column).map(|c| &c.strategy)
    }

    /// Number of cells `transform` would replace in `table`.
    pub fn count_missing(&self, table: &Table) -> Result<usize> {
        table.check_width(self.width)?;
        Ok(self
            .columns
            .iter()
            .map(|(&column, fitted)| {
                table
                    .rows()
                    .iter()
                    .filter(|row| fitted.marker.is_missing(&row[column]))
                    .count()
            })
            .sum())
    }

    /// Return a copy of `table` with missing cells in fitted columns filled.
    pub fn transform(&self, table: &Table) -> Result<Table> {
        table.check_width(self.width)?;

        let rows = table
            .rows()
            .iter()
            .map(|row| {
                let mut row = row.clone();
                for (&column, fitted) in &self.columns {
                    if fitted.marker.is_missing(&row[column]) {
                        row[column] = fitted.fill.clone();
                    }
                }
                row
            })
            .collect();

        Ok(Table::from_parts(table.names().to_vec(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: Vec<Vec<Cell>>) -> Table {
        Table::new(rows).unwrap()
    }

    fn numeric_column(values: &[Option<f64>]) -> Table {
        table(values.iter().map(|v| vec![Cell::from(*v)]).collect())
    }

    // ========================================================================
    // fit() tests
    // ========================================================================

    #[test]
    fn test_mean_fill_value_exact() {
        let t = numeric_column(&[Some(1.0), None, Some(3.0)]);
        let mut imputer = Imputer::new();

        let fitted = imputer.fit(&t, &[0], ImputeStrategy::Mean).unwrap();
        assert_eq!(fitted.fill_value(0), Some(&Cell::Number(2.0)));
    }

    #[test]
    fn test_median_fill_value() {
        let t = numeric_column(&[Some(1.0), None, Some(3.0), None, Some(5.0), Some(10.0)]);
        let mut imputer = Imputer::new();

        let fitted = imputer.fit(&t, &[0], ImputeStrategy::Median).unwrap();
        // Median of [1, 3, 5, 10] = 4
        assert_eq!(fitted.fill_value(0), Some(&Cell::Number(4.0)));
    }

    #[test]
    fn test_most_frequent_on_text() {
        let t = table(vec![
            vec![Cell::from("A")],
            vec![Cell::from("B")],
            vec![Cell::Missing],
            vec![Cell::from("A")],
        ]);
        let mut imputer = Imputer::new();

        let filled = imputer
            .fit_transform(&t, &[0], ImputeStrategy::MostFrequent)
            .unwrap();
        assert_eq!(filled.cell(2, 0), Some(&Cell::from("A")));
    }

    #[test]
    fn test_constant_fill_value() {
        let t = numeric_column(&[None, Some(7.0)]);
        let mut imputer = Imputer::new();

        let filled = imputer
            .fit_transform(&t, &[0], ImputeStrategy::Constant(Cell::from(0)))
            .unwrap();
        assert_eq!(filled.cell(0, 0), Some(&Cell::from(0)));
        assert_eq!(filled.cell(1, 0), Some(&Cell::from(7)));
    }

    #[test]
    fn test_constant_missing_value_is_invalid() {
        let t = numeric_column(&[None, Some(7.0)]);
        let mut imputer = Imputer::new();

        let result = imputer.fit(&t, &[0], ImputeStrategy::Constant(Cell::Missing));
        assert!(matches!(result, Err(PreprocessingError::InvalidStrategy(_))));
    }

    #[test]
    fn test_constant_equal_to_sentinel_is_invalid() {
        let t = numeric_column(&[Some(-999.0), Some(5.0)]);
        let mut imputer =
            Imputer::new().with_missing_marker(MissingMarker::Sentinel(Cell::from(-999)));

        let result = imputer.fit(&t, &[0], ImputeStrategy::Constant(Cell::from(-999)));
        assert!(matches!(result, Err(PreprocessingError::InvalidStrategy(_))));
        assert!(imputer.fitted().is_none());
    }

    #[test]
    fn test_constant_matching_token_marker_is_invalid() {
        let t = table(vec![vec![Cell::from("?")], vec![Cell::from("a")]]);
        let mut imputer =
            Imputer::new().with_missing_marker(MissingMarker::Tokens(vec!["?".to_string()]));

        let result = imputer.fit(&t, &[0], ImputeStrategy::Constant(Cell::from(" ? ")));
        assert!(matches!(result, Err(PreprocessingError::InvalidStrategy(_))));
    }

    #[test]
    fn test_nan_mean_is_invalid_fill() {
        let t = numeric_column(&[Some(f64::INFINITY), Some(f64::NEG_INFINITY), None]);
        let mut imputer = Imputer::new();

        let result = imputer.fit(&t, &[0], ImputeStrategy::Mean);
        assert!(matches!(
            result,
            Err(PreprocessingError::InvalidFillValue { column: 0, .. })
        ));
        let result = imputer.fit(&t, &[0], ImputeStrategy::Median);
        assert!(matches!(
            result,
            Err(PreprocessingError::InvalidFillValue { column: 0, .. })
        ));
    }

    #[test]
    fn test_fill_caught_by_predicate_is_invalid() {
        let t = numeric_column(&[Some(-1.0), Some(2.0), Some(4.0)]);
        let mut imputer = Imputer::new().with_missing_marker(MissingMarker::predicate(|c| {
            c.as_number().is_some_and(|n| n < 0.0 || n == 3.0)
        }));

        // Mean of [2, 4] is 3, which the predicate also treats as missing.
        let result = imputer.fit(&t, &[0], ImputeStrategy::Mean);
        assert!(matches!(
            result,
            Err(PreprocessingError::InvalidFillValue { column: 0, .. })
        ));
    }

    #[test]
    fn test_infinite_values_with_finite_mean() {
        let t = numeric_column(&[Some(f64::INFINITY), None, Some(1.0)]);
        let mut imputer = Imputer::new();

        let filled = imputer.fit_transform(&t, &[0], ImputeStrategy::Mean).unwrap();
        assert_eq!(filled.cell(1, 0), Some(&Cell::Number(f64::INFINITY)));
        assert_eq!(imputer.fitted().unwrap().count_missing(&filled).unwrap(), 0);
    }

    #[test]
    fn test_all_missing_column_is_empty() {
        let t = numeric_column(&[None, None]);
        let mut imputer = Imputer::new();

        let result = imputer.fit(&t, &[0], ImputeStrategy::Mean);
        assert!(matches!(result, Err(PreprocessingError::EmptyColumn { column: 0 })));
    }

    #[test]
    fn test_mean_over_text_is_non_numeric() {
        let t = table(vec![vec![Cell::from(1)], vec![Cell::from("oops")]]);
        let mut imputer = Imputer::new();

        let result = imputer.fit(&t, &[0], ImputeStrategy::Mean);
        assert!(matches!(
            result,
            Err(PreprocessingError::NonNumeric { column: 0, row: 1, .. })
        ));
    }

    #[test]
    fn test_column_out_of_range() {
        let t = numeric_column(&[Some(1.0)]);
        let mut imputer = Imputer::new();

        let result = imputer.fit(&t, &[4], ImputeStrategy::Mean);
        assert!(matches!(
            result,
            Err(PreprocessingError::ColumnIndex { column: 4, width: 1 })
        ));
    }

    #[test]
    fn test_duplicate_column_in_plan() {
        let t = numeric_column(&[Some(1.0)]);
        let mut imputer = Imputer::new();

        let result = imputer.fit_columns(
            &t,
            &[(0, ImputeStrategy::Mean), (0, ImputeStrategy::Median)],
        );
        assert!(matches!(result, Err(PreprocessingError::DuplicateColumn(0))));
    }

    #[test]
    fn test_refit_replaces_parameters() {
        let first = numeric_column(&[Some(1.0), None, Some(3.0)]);
        let second = numeric_column(&[Some(10.0), None, Some(30.0)]);
        let mut imputer = Imputer::new();

        imputer.fit(&first, &[0], ImputeStrategy::Mean).unwrap();
        imputer.fit(&second, &[0], ImputeStrategy::Mean).unwrap();

        let filled = imputer.transform(&first).unwrap();
        assert_eq!(filled.cell(1, 0), Some(&Cell::Number(20.0)));
    }

    #[test]
    fn test_failed_refit_keeps_previous_parameters() {
        let good = numeric_column(&[Some(1.0), None, Some(3.0)]);
        let empty = numeric_column(&[None, None, None]);
        let mut imputer = Imputer::new();

        imputer.fit(&good, &[0], ImputeStrategy::Mean).unwrap();
        assert!(imputer.fit(&empty, &[0], ImputeStrategy::Mean).is_err());
        assert_eq!(
            imputer.fitted().and_then(|f| f.fill_value(0)),
            Some(&Cell::Number(2.0))
        );
    }

    // ========================================================================
    // transform() tests
    // ========================================================================

    #[test]
    fn test_transform_before_fit() {
        let t = numeric_column(&[Some(1.0)]);
        let imputer = Imputer::new();

        let result = imputer.transform(&t);
        assert!(matches!(
            result,
            Err(PreprocessingError::NotFitted { component: "Imputer" })
        ));
    }

    #[test]
    fn test_transform_leaves_unfitted_columns() {
        let t = table(vec![
            vec![Cell::Missing, Cell::from(1)],
            vec![Cell::from("x"), Cell::Missing],
            vec![Cell::from("y"), Cell::from(3)],
        ]);
        let mut imputer = Imputer::new();

        let filled = imputer.fit_transform(&t, &[1], ImputeStrategy::Mean).unwrap();
        assert_eq!(filled.cell(0, 0), Some(&Cell::Missing));
        assert_eq!(filled.cell(1, 1), Some(&Cell::Number(2.0)));
        assert_eq!(filled.names(), t.names());
    }

    #[test]
    fn test_transform_no_missing_remains() {
        let t = numeric_column(&[None, Some(4.0), Some(f64::NAN), None, Some(8.0)]);
        let mut imputer = Imputer::new();

        let filled = imputer.fit_transform(&t, &[0], ImputeStrategy::Mean).unwrap();
        assert!(filled.column(0).unwrap().all(|c| !c.is_absent()));
        assert_eq!(filled.cell(2, 0), Some(&Cell::Number(6.0)));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let t = numeric_column(&[Some(1.0), None, Some(3.0)]);
        let mut imputer = Imputer::new();

        let once = imputer.fit_transform(&t, &[0], ImputeStrategy::Mean).unwrap();
        let twice = imputer.transform(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_transform_shape_mismatch() {
        let t = numeric_column(&[Some(1.0)]);
        let wider = table(vec![vec![Cell::from(1), Cell::from(2)]]);
        let mut imputer = Imputer::new();
        imputer.fit(&t, &[0], ImputeStrategy::Mean).unwrap();

        let result = imputer.transform(&wider);
        assert!(matches!(
            result,
            Err(PreprocessingError::ShapeMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_sentinel_marker_is_replaced() {
        let t = numeric_column(&[Some(-999.0), Some(2.0), Some(4.0)]);
        let mut imputer =
            Imputer::new().with_missing_marker(MissingMarker::Sentinel(Cell::from(-999)));

        let filled = imputer.fit_transform(&t, &[0], ImputeStrategy::Mean).unwrap();
        assert_eq!(filled.cell(0, 0), Some(&Cell::Number(3.0)));
    }

    #[test]
    fn test_column_marker_override() {
        let t = table(vec![
            vec![Cell::from("?"), Cell::from("?")],
            vec![Cell::from("a"), Cell::from("b")],
        ]);
        let mut imputer =
            Imputer::new().with_column_marker(1, MissingMarker::Tokens(vec!["?".to_string()]));

        let filled = imputer
            .fit_transform(&t, &[0, 1], ImputeStrategy::MostFrequent)
            .unwrap();
        // Column 0 uses the default marker, so "?" is a real value there.
        assert_eq!(filled.cell(0, 0), Some(&Cell::from("?")));
        assert_eq!(filled.cell(0, 1), Some(&Cell::from("b")));
    }

    #[test]
    fn test_count_missing() {
        let t = numeric_column(&[None, Some(1.0), None]);
        let mut imputer = Imputer::new();
        let fitted = imputer.fit(&t, &[0], ImputeStrategy::Mean).unwrap();

        assert_eq!(fitted.count_missing(&t).unwrap(), 2);
    }

    // ========================================================================
    // ImputeStrategy parsing
    // ========================================================================

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("mean".parse::<ImputeStrategy>().unwrap(), ImputeStrategy::Mean);
        assert_eq!("Median".parse::<ImputeStrategy>().unwrap(), ImputeStrategy::Median);
        assert_eq!(
            "mode".parse::<ImputeStrategy>().unwrap(),
            ImputeStrategy::MostFrequent
        );
        assert_eq!(
            "constant=0".parse::<ImputeStrategy>().unwrap(),
            ImputeStrategy::Constant(Cell::Number(0.0))
        );
        assert_eq!(
            "constant=Unknown".parse::<ImputeStrategy>().unwrap(),
            ImputeStrategy::Constant(Cell::from("Unknown"))
        );
    }

    #[test]
    fn test_strategy_from_str_invalid() {
        for input in ["average", "constant", "mean=3", ""] {
            let result = input.parse::<ImputeStrategy>();
            assert!(
                matches!(result, Err(PreprocessingError::InvalidStrategy(_))),
                "expected InvalidStrategy for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&ImputeStrategy::MostFrequent).unwrap();
        assert_eq!(json, r#""most_frequent""#);

        let strategy: ImputeStrategy = serde_json::from_str(r#"{"constant":"Unknown"}"#).unwrap();
        assert_eq!(strategy, ImputeStrategy::Constant(Cell::from("Unknown")));
    }
}
