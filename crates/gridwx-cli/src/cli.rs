use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

use gridwx_core::Thresholds;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Configuration file (defaults to $GRIDWX_CONFIG or the user config dir)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Worker threads for per-region feature computation ("auto" or a number)
    #[arg(long, global = true, default_value = "auto")]
    pub threads: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the raw load and weather feeds for a year into the cache
    Fetch {
        #[arg(long)]
        year: i32,
        /// Re-download files that are already cached
        #[arg(long)]
        force: bool,
        /// Cache directory (overrides [paths].cache_root)
        #[arg(long, value_hint = ValueHint::DirPath)]
        cache_dir: Option<PathBuf>,
    },
    /// Build the merged feature table for one or more years
    Process(ProcessArgs),
    /// Recompute every derived column of an existing table
    Refeature {
        /// Feature table (CSV or Parquet)
        #[arg(value_hint = ValueHint::FilePath)]
        table: PathBuf,
        /// Write here instead of rewriting the table in place
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Print per-region statistics and the largest load Z-scores
    Inspect {
        /// Feature table (CSV or Parquet)
        #[arg(value_hint = ValueHint::FilePath)]
        table: PathBuf,
        /// Number of top Z-score rows to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Derive a demonstration year from an existing table
    Synth {
        /// Base feature table (CSV or Parquet)
        #[arg(long, value_hint = ValueHint::FilePath)]
        base: PathBuf,
        /// Target year
        #[arg(long)]
        year: i32,
        /// Output table path (.parquet or .csv)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Years to process (comma separated, ranges like 2021-2023 allowed)
    #[arg(long)]
    pub years: String,
    /// Local load CSV instead of the cached download (single year only)
    #[arg(long, value_hint = ValueHint::FilePath, requires = "weather_archive")]
    pub load_file: Option<PathBuf>,
    /// Local weather ZIP instead of the cached download (single year only)
    #[arg(long, value_hint = ValueHint::FilePath, requires = "load_file")]
    pub weather_archive: Option<PathBuf>,
    /// Output table path (single year only; .parquet or .csv)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
    /// Output directory (overrides [paths].output_dir)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,
    /// Cache directory (overrides [paths].cache_root)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,
    /// Table format used when --out is not given
    #[arg(long, value_enum, default_value_t = TableFormat::Parquet)]
    pub format: TableFormat,
    /// Rebuild years whose output already exists and re-download inputs
    #[arg(long)]
    pub force: bool,
    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ThresholdArgs {
    /// Global Z-score cutoff for dropping hourly load outliers
    #[arg(long)]
    pub outlier_zscore: Option<f64>,
    /// Per-region Z-score cutoff for labelling anomalous days
    #[arg(long)]
    pub anomaly_zscore: Option<f64>,
}

impl ThresholdArgs {
    /// Flags win over the configured values.
    pub fn apply(&self, base: Thresholds) -> Thresholds {
        Thresholds {
            outlier_rejection_zscore: self
                .outlier_zscore
                .unwrap_or(base.outlier_rejection_zscore),
            anomaly_label_zscore: self.anomaly_zscore.unwrap_or(base.anomaly_label_zscore),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Parquet,
    Csv,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Parquet => "parquet",
            TableFormat::Csv => "csv",
        }
    }
}
