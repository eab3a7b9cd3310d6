//! CLI entry point for the tabular preprocessing pipeline.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tabular_prep::{
    ColumnSpec, Encoding, ImputeStrategy, MissingMarker, Pipeline, PipelineConfig,
    PreprocessingSummary, ProcessedTable, Table, UnseenCategoryPolicy,
};
use tracing::{debug, error, info};

/// CLI-compatible unseen category policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliUnseenPolicy {
    /// Fail on categories not seen during fit
    Reject,
    /// Emit an all-zero one-hot row for unseen categories
    Ignore,
}

impl From<CliUnseenPolicy> for UnseenCategoryPolicy {
    fn from(cli: CliUnseenPolicy) -> Self {
        match cli {
            CliUnseenPolicy::Reject => UnseenCategoryPolicy::Reject,
            CliUnseenPolicy::Ignore => UnseenCategoryPolicy::Ignore,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Tabular Data Preprocessing Pipeline",
    long_about = "Impute missing values and encode categorical columns of a CSV file.\n\n\
                  Columns are referenced by header name or zero-based index, and every\n\
                  column must be classified exactly once.\n\n\
                  EXAMPLES:\n  \
                  # Classic Country/Age/Salary/Purchased dataset\n  \
                  tabular-prep -i Data.csv --one-hot Country --numeric Age,Salary \\\n    \
                  --impute mean --label Purchased -o processed.csv\n\n  \
                  # Load the column classification from a JSON file\n  \
                  tabular-prep -i Data.csv --config pipeline.json --json"
)]
struct Args {
    /// Path to the CSV file to process
    #[arg(short, long)]
    input: PathBuf,

    /// JSON pipeline configuration
    ///
    /// Cannot be combined with the inline column flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Numeric feature columns
    #[arg(long, value_delimiter = ',')]
    numeric: Vec<String>,

    /// Imputation strategy for numeric columns
    ///
    /// One of mean, median, most_frequent, constant=<value>
    #[arg(long)]
    impute: Option<String>,

    /// Categorical columns to one-hot encode
    #[arg(long, value_delimiter = ',')]
    one_hot: Vec<String>,

    /// Categorical columns to label encode
    #[arg(long, value_delimiter = ',')]
    label_encode: Vec<String>,

    /// Imputation strategy for categorical columns
    #[arg(long)]
    categorical_impute: Option<String>,

    /// Target column
    #[arg(short, long)]
    label: Option<String>,

    /// Pass the target column through as a number instead of encoding it
    #[arg(long)]
    numeric_label: bool,

    /// Columns to leave out of the output
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Also treat placeholder strings ("NA", "n/a", "?", ...) as missing
    #[arg(long)]
    missing_tokens: bool,

    /// Policy for categories not seen during fit
    #[arg(long, value_enum, default_value = "reject")]
    unseen: CliUnseenPolicy,

    /// Write the processed table to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the summary and fitted vocabularies.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn has_inline_columns(&self) -> bool {
        !self.numeric.is_empty()
            || !self.one_hot.is_empty()
            || !self.label_encode.is_empty()
            || !self.ignore.is_empty()
            || self.label.is_some()
    }
}

/// JSON document printed with `--json`.
#[derive(Debug, Serialize)]
struct CliReport<'a> {
    input: String,
    output: Option<String>,
    feature_names: &'a [String],
    label_name: Option<&'a str>,
    summary: &'a PreprocessingSummary,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    info!("Loading dataset from: {}", args.input.display());
    let df = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", df.shape());

    let table = Table::from_dataframe(&df).context("Converting dataset")?;
    let config = build_config(&args, table.names())?;
    debug!(columns = config.columns.len(), "pipeline configuration ready");

    let mut pipeline = Pipeline::builder().config(config).build()?;

    let processed = match pipeline.fit_transform(&table) {
        Ok(processed) => processed,
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            } else {
                error!("Pipeline failed: {}", e);
            }
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    if let Some(ref output) = args.output {
        write_csv(&processed, output)?;
        info!("Processed table written to: {}", output.display());
    }

    if args.json {
        let report = CliReport {
            input: args.input.display().to_string(),
            output: args.output.as_ref().map(|p| p.display().to_string()),
            feature_names: &processed.feature_names,
            label_name: processed.label_name.as_deref(),
            summary: &processed.summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&processed, &args);
    Ok(())
}

/// Build the pipeline configuration from `--config` or the inline flags.
fn build_config(args: &Args, names: &[String]) -> Result<PipelineConfig> {
    if let Some(ref path) = args.config {
        if args.has_inline_columns() {
            bail!("--config cannot be combined with inline column flags");
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        return Ok(PipelineConfig::from_json(&json)?);
    }

    if !args.has_inline_columns() {
        bail!("No columns classified; pass --config or the inline column flags");
    }

    let numeric_impute = args
        .impute
        .as_deref()
        .map(str::parse::<ImputeStrategy>)
        .transpose()?;
    let categorical_impute = args
        .categorical_impute
        .as_deref()
        .map(str::parse::<ImputeStrategy>)
        .transpose()?;

    let mut specs = Vec::new();
    for column in resolve_columns(&args.numeric, names)? {
        let spec = ColumnSpec::numeric(column);
        specs.push(match numeric_impute {
            Some(ref strategy) => spec.impute(strategy.clone()),
            None => spec,
        });
    }

    let categorical = resolve_columns(&args.one_hot, names)?
        .into_iter()
        .map(|c| (c, Encoding::OneHot))
        .chain(
            resolve_columns(&args.label_encode, names)?
                .into_iter()
                .map(|c| (c, Encoding::Label)),
        );
    for (column, encoding) in categorical {
        let spec = ColumnSpec::categorical(column, encoding);
        specs.push(match categorical_impute {
            Some(ref strategy) => spec.impute(strategy.clone()),
            None => spec,
        });
    }

    if let Some(ref label) = args.label {
        let column = resolve_column(label, names)?;
        specs.push(if args.numeric_label {
            ColumnSpec::numeric_label(column)
        } else {
            ColumnSpec::label(column)
        });
    }

    specs.extend(
        resolve_columns(&args.ignore, names)?
            .into_iter()
            .map(ColumnSpec::ignored),
    );

    let mut builder = PipelineConfig::builder()
        .columns(specs)
        .unseen_category(args.unseen.into());
    if args.missing_tokens {
        builder = builder.missing_marker(MissingMarker::common_tokens());
    }

    Ok(builder.build()?)
}

/// Resolve a column reference: a header name first, then a zero-based index.
fn resolve_column(reference: &str, names: &[String]) -> Result<usize> {
    let reference = reference.trim();
    if let Some(index) = names.iter().position(|name| name == reference) {
        return Ok(index);
    }
    match reference.parse::<usize>() {
        Ok(index) if index < names.len() => Ok(index),
        _ => Err(anyhow!(
            "Unknown column '{}'. Available columns: {:?}",
            reference,
            names
        )),
    }
}

fn resolve_columns(references: &[String], names: &[String]) -> Result<Vec<usize>> {
    references
        .iter()
        .map(|reference| resolve_column(reference, names))
        .collect()
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))
}

fn write_csv(processed: &ProcessedTable, path: &Path) -> Result<()> {
    let mut df = processed.to_dataframe()?;
    let mut file = File::create(path)
        .with_context(|| format!("Creating output file {}", path.display()))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;
    Ok(())
}

/// Print a human-readable summary of the preprocessing results.
fn print_human_readable_summary(processed: &ProcessedTable, args: &Args) {
    let summary = &processed.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("PREPROCESSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input.display(),
        summary.rows,
        summary.input_columns
    );
    match args.output {
        Some(ref output) => println!(
            "Output: {} ({} rows x {} feature columns)",
            output.display(),
            processed.n_rows(),
            summary.output_columns
        ),
        None => println!(
            "Output: not written ({} rows x {} feature columns)",
            processed.n_rows(),
            summary.output_columns
        ),
    }
    println!();

    if !summary.fill_values.is_empty() {
        println!("Imputation ({} cells filled):", summary.imputed_cells);
        for fill in &summary.fill_values {
            println!("  - {} [{}]: {}", fill.name, fill.strategy, fill.value);
        }
        println!();
    }

    if !summary.encoded_columns.is_empty() {
        println!("Encoding:");
        for encoded in &summary.encoded_columns {
            println!(
                "  - {} [{:?}]: {}",
                encoded.name,
                encoded.encoding,
                encoded.categories.join(", ")
            );
        }
        println!();
    }

    if let Some(ref label) = processed.label_name {
        match summary.label_classes {
            Some(ref classes) => {
                let mapping: Vec<String> = classes
                    .iter()
                    .enumerate()
                    .map(|(code, class)| format!("{}={}", class, code))
                    .collect();
                println!("Label Column: {} ({})", label, mapping.join(", "));
            }
            None => println!("Label Column: {} (numeric)", label),
        }
        println!();
    }

    println!("Features: {}", processed.feature_names.join(", "));
    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
