//! Main preprocessing pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! composing imputation and categorical encoding into one fit/transform.

use crate::config::{ColumnRole, ConfigValidationError, PipelineConfig};
use crate::encoders::{CategoricalEncoder, Encoding, LabelEncoder};
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::imputers::{ImputeStrategy, Imputer};
use crate::types::{
    Cell, ColumnFill, EncodedColumn, PreprocessingSummary, ProcessedTable, Table,
};
use tracing::{debug, info};

/// The preprocessing pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline.
///
/// Control flow for both fit and transform:
/// raw table -> imputation -> feature projection -> categorical encoding,
/// with the label column encoded separately.
///
/// # Example
///
/// ```rust,ignore
/// use tabular_prep::{ColumnSpec, Encoding, ImputeStrategy, Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .column(ColumnSpec::categorical(0, Encoding::OneHot))
///     .column(ColumnSpec::numeric(1).impute(ImputeStrategy::Mean))
///     .column(ColumnSpec::numeric(2).impute(ImputeStrategy::Mean))
///     .column(ColumnSpec::label(3))
///     .build()?;
///
/// let mut pipeline = Pipeline::builder().config(config).build()?;
/// let processed = pipeline.fit_transform(&table)?;
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    imputer: Imputer,
    encoder: CategoricalEncoder,
    label_encoder: LabelEncoder,
    layout: Option<FittedLayout>,
}

/// Column bookkeeping captured at fit time.
#[derive(Debug, Clone, PartialEq)]
struct FittedLayout {
    width: usize,
    /// Original indices of feature columns, in table order.
    features: Vec<usize>,
    /// Original column index behind every output feature column.
    output_origin: Vec<usize>,
    label: Option<LabelColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LabelColumn {
    column: usize,
    encode: bool,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.layout.is_some()
    }

    pub fn imputer(&self) -> &Imputer {
        &self.imputer
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label_encoder
    }

    /// Learn imputation and encoding parameters from `table`.
    ///
    /// Every column of the table must be classified by the configuration.
    /// Replaces previously fitted parameters; on error the pipeline keeps
    /// its previous state.
    pub fn fit(&mut self, table: &Table) -> Result<()> {
        info!(
            "Fitting pipeline on {} rows x {} columns",
            table.height(),
            table.width()
        );
        self.check_classification(table)?;

        let mut imputer = self.new_imputer();
        let mut encoder = self.new_encoder();
        let mut label_encoder = LabelEncoder::new();

        // Step 1: imputation
        let plan: Vec<(usize, ImputeStrategy)> = self
            .config
            .columns
            .iter()
            .filter_map(|spec| spec.impute.clone().map(|s| (spec.column, s)))
            .collect();
        let imputed = imputer
            .fit_columns(table, &plan)
            .context("Fitting imputer")?
            .transform(table)?;

        // Step 2: categorical encoding over the feature projection
        let features = self.feature_columns();
        let projected = imputed.select(&features)?;
        let encoding_plan: Vec<(usize, Encoding)> = features
            .iter()
            .enumerate()
            .filter_map(|(pos, &column)| match self.config.spec(column).map(|s| s.role) {
                Some(ColumnRole::Categorical(encoding)) => Some((pos, encoding)),
                _ => None,
            })
            .collect();
        let fitted_encoder = encoder
            .fit(&projected, &encoding_plan)
            .map_err(|e| Self::remap_column(e, &features))
            .context("Fitting categorical encoder")?;

        let mut output_origin = Vec::with_capacity(fitted_encoder.output_width());
        for (pos, &column) in features.iter().enumerate() {
            let width = fitted_encoder.column(pos).map_or(1, |e| e.output_width());
            output_origin.extend(std::iter::repeat_n(column, width));
        }

        // Step 3: label encoding
        let label = self.config.label().map(|spec| LabelColumn {
            column: spec.column,
            encode: matches!(spec.role, ColumnRole::Label { encode: true }),
        });
        if let Some(LabelColumn { column, encode: true }) = label {
            label_encoder
                .fit(&imputed, column)
                .context("Fitting label encoder")?;
        }

        debug!(
            features = features.len(),
            outputs = output_origin.len(),
            imputed_columns = plan.len(),
            encoded_columns = encoding_plan.len(),
            "pipeline fitted"
        );

        self.imputer = imputer;
        self.encoder = encoder;
        self.label_encoder = label_encoder;
        self.layout = Some(FittedLayout {
            width: table.width(),
            features,
            output_origin,
            label,
        });
        Ok(())
    }

    /// Apply the fitted parameters to `table`.
    pub fn transform(&self, table: &Table) -> Result<ProcessedTable> {
        let layout = self
            .layout
            .as_ref()
            .ok_or(PreprocessingError::NotFitted {
                component: "Pipeline",
            })?;
        table.check_width(layout.width)?;

        let imputed_cells = match self.imputer.fitted() {
            Some(fitted) => fitted.count_missing(table)?,
            None => 0,
        };
        let imputed = self.imputer.transform(table)?;

        let projected = imputed.select(&layout.features)?;
        let encoded = self
            .encoder
            .transform(&projected)
            .map_err(|e| Self::remap_column(e, &layout.features))?;

        let features = encoded
            .rows()
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .map(|(j, cell)| Self::numeric_value(cell, layout.output_origin[j], row))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let labels = match layout.label {
            Some(LabelColumn { encode: true, .. }) => Some(
                self.label_encoder
                    .transform(&imputed)?
                    .into_iter()
                    .map(|code| code as f64)
                    .collect(),
            ),
            Some(LabelColumn {
                column,
                encode: false,
            }) => Some(
                imputed
                    .column(column)?
                    .enumerate()
                    .map(|(row, cell)| Self::numeric_value(cell, column, row))
                    .collect::<Result<Vec<f64>>>()?,
            ),
            None => None,
        };
        let label_name = layout.label.map(|l| table.names()[l.column].clone());

        let summary = self.summarize(layout, table, imputed_cells, encoded.width());
        debug!(
            rows = summary.rows,
            outputs = summary.output_columns,
            imputed_cells,
            "pipeline transform complete"
        );

        Ok(ProcessedTable {
            feature_names: encoded.names().to_vec(),
            features,
            label_name,
            labels,
            summary,
        })
    }

    /// Fit on `table` and transform it in one step.
    pub fn fit_transform(&mut self, table: &Table) -> Result<ProcessedTable> {
        self.fit(table)?;
        self.transform(table)
    }

    /// Output feature names for a table with the given column names.
    pub fn feature_names(&self, names: &[String]) -> Result<Vec<String>> {
        let layout = self
            .layout
            .as_ref()
            .ok_or(PreprocessingError::NotFitted {
                component: "Pipeline",
            })?;
        if names.len() != layout.width {
            return Err(PreprocessingError::ShapeMismatch {
                expected: layout.width,
                found: names.len(),
            });
        }

        let projected: Vec<String> = layout.features.iter().map(|&c| names[c].clone()).collect();
        self.encoder
            .fitted()
            .ok_or(PreprocessingError::NotFitted {
                component: "CategoricalEncoder",
            })?
            .feature_names(&projected)
    }

    fn check_classification(&self, table: &Table) -> Result<()> {
        for spec in &self.config.columns {
            table.check_column(spec.column)?;
        }
        for column in 0..table.width() {
            if self.config.spec(column).is_none() {
                return Err(PreprocessingError::UnclassifiedColumn(column));
            }
        }
        Ok(())
    }

    fn feature_columns(&self) -> Vec<usize> {
        let mut features: Vec<usize> = self
            .config
            .columns
            .iter()
            .filter(|spec| spec.is_feature())
            .map(|spec| spec.column)
            .collect();
        features.sort_unstable();
        features
    }

    fn new_imputer(&self) -> Imputer {
        self.config
            .columns
            .iter()
            .filter_map(|spec| spec.missing.clone().map(|m| (spec.column, m)))
            .fold(
                Imputer::new().with_missing_marker(self.config.missing.clone()),
                |imputer, (column, marker)| imputer.with_column_marker(column, marker),
            )
    }

    fn new_encoder(&self) -> CategoricalEncoder {
        CategoricalEncoder::new().with_unseen_policy(self.config.unseen_category)
    }

    /// Require a finite number in an output cell.
    fn numeric_value(cell: &Cell, column: usize, row: usize) -> Result<f64> {
        match cell {
            Cell::Number(n) if !n.is_nan() => Ok(*n),
            Cell::Text(s) => Err(PreprocessingError::NonNumeric {
                column,
                row,
                value: s.clone(),
            }),
            _ => Err(PreprocessingError::MissingValue { column, row }),
        }
    }

    /// Translate a column index of the feature projection back to the
    /// original table.
    fn remap_column(error: PreprocessingError, features: &[usize]) -> PreprocessingError {
        let original = |pos: usize| features.get(pos).copied().unwrap_or(pos);
        match error {
            PreprocessingError::EmptyColumn { column } => PreprocessingError::EmptyColumn {
                column: original(column),
            },
            PreprocessingError::UnseenCategory { column, value } => {
                PreprocessingError::UnseenCategory {
                    column: original(column),
                    value,
                }
            }
            PreprocessingError::MissingValue { column, row } => PreprocessingError::MissingValue {
                column: original(column),
                row,
            },
            other => other,
        }
    }

    fn summarize(
        &self,
        layout: &FittedLayout,
        table: &Table,
        imputed_cells: usize,
        output_columns: usize,
    ) -> PreprocessingSummary {
        let names = table.names();

        let fill_values = self
            .imputer
            .fitted()
            .map(|fitted| {
                fitted
                    .columns()
                    .filter_map(|column| {
                        Some(ColumnFill {
                            column,
                            name: names[column].clone(),
                            strategy: fitted.strategy(column)?.clone(),
                            value: fitted.fill_value(column)?.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let encoded_columns = self
            .encoder
            .fitted()
            .map(|fitted| {
                fitted
                    .columns()
                    .map(|(pos, encoding)| {
                        let column = layout.features[pos];
                        EncodedColumn {
                            column,
                            name: names[column].clone(),
                            encoding: encoding.encoding,
                            categories: encoding.vocabulary.categories().to_vec(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        PreprocessingSummary {
            rows: table.height(),
            input_columns: table.width(),
            output_columns,
            imputed_cells,
            fill_values,
            encoded_columns,
            label_classes: self.label_encoder.classes().map(<[String]>::to_vec),
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            imputer: Imputer::new(),
            encoder: CategoricalEncoder::new(),
            label_encoder: LabelEncoder::new(),
            layout: None,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnSpec;
    use crate::encoders::UnseenCategoryPolicy;
    use crate::imputers::MissingMarker;
    use pretty_assertions::assert_eq;

    fn sample_table() -> Table {
        Table::with_names(
            vec![
                "country".to_string(),
                "age".to_string(),
                "salary".to_string(),
                "purchased".to_string(),
            ],
            vec![
                vec![Cell::from("FR"), Cell::from(44), Cell::from(72000), Cell::from("No")],
                vec![Cell::from("ES"), Cell::from(27), Cell::Missing, Cell::from("Yes")],
                vec![Cell::from("DE"), Cell::Missing, Cell::from(54000), Cell::from("No")],
            ],
        )
        .unwrap()
    }

    fn sample_config() -> PipelineConfig {
        PipelineConfig::builder()
            .column(ColumnSpec::categorical(0, Encoding::OneHot))
            .column(ColumnSpec::numeric(1).impute(ImputeStrategy::Mean))
            .column(ColumnSpec::numeric(2).impute(ImputeStrategy::Mean))
            .column(ColumnSpec::label(3))
            .build()
            .unwrap()
    }

    fn pipeline(config: PipelineConfig) -> Pipeline {
        Pipeline::builder().config(config).build().unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.config().columns.is_empty());
        assert!(!pipeline.is_fitted());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = sample_config();
        config.columns.push(ColumnSpec::ignored(0));

        let result = Pipeline::builder().config(config).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateColumn(0)
        ));
    }

    #[test]
    fn test_fit_transform_sample() {
        let mut pipeline = pipeline(sample_config());
        let processed = pipeline.fit_transform(&sample_table()).unwrap();

        assert_eq!(
            processed.feature_names,
            vec!["country=DE", "country=ES", "country=FR", "age", "salary"]
        );
        assert_eq!(processed.features[0], vec![0.0, 0.0, 1.0, 44.0, 72000.0]);
        assert_eq!(processed.features[1], vec![0.0, 1.0, 0.0, 27.0, 63000.0]);
        assert_eq!(processed.features[2], vec![1.0, 0.0, 0.0, 35.5, 54000.0]);
        assert_eq!(processed.label_name.as_deref(), Some("purchased"));
        assert_eq!(processed.labels, Some(vec![0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_summary() {
        let mut pipeline = pipeline(sample_config());
        let summary = pipeline.fit_transform(&sample_table()).unwrap().summary;

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.input_columns, 4);
        assert_eq!(summary.output_columns, 5);
        assert_eq!(summary.imputed_cells, 2);
        assert_eq!(summary.fill_values.len(), 2);
        assert_eq!(summary.fill_values[0].name, "age");
        assert_eq!(summary.fill_values[0].value, Cell::Number(35.5));
        assert_eq!(summary.encoded_columns.len(), 1);
        assert_eq!(summary.encoded_columns[0].column, 0);
        assert_eq!(summary.encoded_columns[0].categories, vec!["DE", "ES", "FR"]);
        assert_eq!(
            summary.label_classes,
            Some(vec!["No".to_string(), "Yes".to_string()])
        );
    }

    #[test]
    fn test_transform_before_fit() {
        let pipeline = pipeline(sample_config());
        let result = pipeline.transform(&sample_table());

        assert!(matches!(
            result,
            Err(PreprocessingError::NotFitted { component: "Pipeline" })
        ));
        assert!(pipeline.feature_names(sample_table().names()).is_err());
    }

    #[test]
    fn test_unclassified_column() {
        let config = PipelineConfig::builder()
            .column(ColumnSpec::categorical(0, Encoding::OneHot))
            .column(ColumnSpec::numeric(1))
            .column(ColumnSpec::label(3))
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);

        assert!(matches!(
            pipeline.fit(&sample_table()),
            Err(PreprocessingError::UnclassifiedColumn(2))
        ));
        assert!(!pipeline.is_fitted());
    }

    #[test]
    fn test_spec_out_of_range() {
        let mut config = sample_config();
        config.columns.push(ColumnSpec::ignored(9));
        let mut pipeline = pipeline(config);

        assert!(matches!(
            pipeline.fit(&sample_table()),
            Err(PreprocessingError::ColumnIndex { column: 9, width: 4 })
        ));
    }

    #[test]
    fn test_numeric_column_with_text_is_rejected() {
        let config = PipelineConfig::builder()
            .column(ColumnSpec::numeric(0))
            .column(ColumnSpec::ignored(1))
            .column(ColumnSpec::ignored(2))
            .column(ColumnSpec::ignored(3))
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);

        assert!(matches!(
            pipeline.fit_transform(&sample_table()),
            Err(PreprocessingError::NonNumeric { column: 0, row: 0, .. })
        ));
    }

    #[test]
    fn test_missing_without_imputation_is_rejected() {
        let config = PipelineConfig::builder()
            .column(ColumnSpec::ignored(0))
            .column(ColumnSpec::numeric(1))
            .column(ColumnSpec::ignored(2))
            .column(ColumnSpec::ignored(3))
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);

        assert!(matches!(
            pipeline.fit_transform(&sample_table()),
            Err(PreprocessingError::MissingValue { column: 1, row: 2 })
        ));
    }

    #[test]
    fn test_unseen_category_reports_original_column() {
        let config = PipelineConfig::builder()
            .column(ColumnSpec::ignored(0))
            .column(ColumnSpec::categorical(1, Encoding::OneHot))
            .column(ColumnSpec::numeric(2))
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);
        let train = Table::new(vec![
            vec![Cell::from("r1"), Cell::from("a"), Cell::from(1)],
            vec![Cell::from("r2"), Cell::from("b"), Cell::from(2)],
        ])
        .unwrap();
        let test =
            Table::new(vec![vec![Cell::from("r3"), Cell::from("c"), Cell::from(3)]]).unwrap();

        pipeline.fit(&train).unwrap();
        match pipeline.transform(&test) {
            Err(PreprocessingError::UnseenCategory { column, value }) => {
                assert_eq!(column, 1);
                assert_eq!(value, "c");
            }
            other => panic!("expected UnseenCategory, got {:?}", other),
        }
    }

    #[test]
    fn test_unseen_category_ignore_policy() {
        let config = PipelineConfig::builder()
            .column(ColumnSpec::categorical(0, Encoding::OneHot))
            .unseen_category(UnseenCategoryPolicy::Ignore)
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);
        let train = Table::new(vec![vec![Cell::from("a")], vec![Cell::from("b")]]).unwrap();
        let test = Table::new(vec![vec![Cell::from("z")]]).unwrap();

        pipeline.fit(&train).unwrap();
        let processed = pipeline.transform(&test).unwrap();
        assert_eq!(processed.features, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn test_ignored_columns_and_numeric_label() {
        let config = PipelineConfig::builder()
            .column(ColumnSpec::ignored(0))
            .column(ColumnSpec::numeric(1))
            .column(ColumnSpec::numeric_label(2))
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);
        let table = Table::new(vec![
            vec![Cell::from("id-1"), Cell::from(1.5), Cell::from(10)],
            vec![Cell::from("id-2"), Cell::from(2.5), Cell::from(20)],
        ])
        .unwrap();

        let processed = pipeline.fit_transform(&table).unwrap();
        assert_eq!(processed.feature_names, vec!["column_1"]);
        assert_eq!(processed.features, vec![vec![1.5], vec![2.5]]);
        assert_eq!(processed.labels, Some(vec![10.0, 20.0]));
        assert_eq!(processed.summary.label_classes, None);
    }

    #[test]
    fn test_categorical_imputation_then_label_encoding() {
        let config = PipelineConfig::builder()
            .column(
                ColumnSpec::categorical(0, Encoding::Label)
                    .impute(ImputeStrategy::MostFrequent)
                    .missing_marker(MissingMarker::common_tokens()),
            )
            .build()
            .unwrap();
        let mut pipeline = pipeline(config);
        let table = Table::new(vec![
            vec![Cell::from("red")],
            vec![Cell::from("N/A")],
            vec![Cell::from("blue")],
            vec![Cell::from("red")],
        ])
        .unwrap();

        let processed = pipeline.fit_transform(&table).unwrap();
        // blue = 0, red = 1; the placeholder is filled with "red".
        assert_eq!(processed.features, vec![vec![1.0], vec![1.0], vec![0.0], vec![1.0]]);
        assert_eq!(processed.summary.imputed_cells, 1);
    }

    #[test]
    fn test_failed_refit_keeps_previous_state() {
        let mut pipeline = pipeline(sample_config());
        let table = sample_table();
        pipeline.fit(&table).unwrap();

        let narrow = Table::new(vec![vec![Cell::from("FR")]]).unwrap();
        assert!(pipeline.fit(&narrow).is_err());

        assert!(pipeline.is_fitted());
        assert!(pipeline.transform(&table).is_ok());
    }

    #[test]
    fn test_transform_shape_mismatch() {
        let mut pipeline = pipeline(sample_config());
        pipeline.fit(&sample_table()).unwrap();

        let narrow = Table::new(vec![vec![Cell::from("FR"), Cell::from(1)]]).unwrap();
        assert!(matches!(
            pipeline.transform(&narrow),
            Err(PreprocessingError::ShapeMismatch { expected: 4, found: 2 })
        ));
    }

    #[test]
    fn test_feature_names() {
        let mut pipeline = pipeline(sample_config());
        pipeline.fit(&sample_table()).unwrap();

        let names = pipeline.feature_names(sample_table().names()).unwrap();
        assert_eq!(names, vec!["country=DE", "country=ES", "country=FR", "age", "salary"]);
    }
}
