//! Per-run pipeline configuration.
//!
//! Everything a run needs is carried in [`PipelineConfig`] and handed to each
//! entry point; there is no global state. The nested tables deserialize from
//! the `gridwx.toml` sections of the same name with per-field defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GridWxError, GridWxResult};

pub const DEFAULT_OUTLIER_REJECTION_ZSCORE: f64 = 3.0;
pub const DEFAULT_ANOMALY_LABEL_ZSCORE: f64 = 2.5;

/// The two Z-score cutoffs used by the pipeline.
///
/// `outlier_rejection_zscore` is applied globally by the load cleaner;
/// `anomaly_label_zscore` is applied per region by the feature engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_outlier_rejection")]
    pub outlier_rejection_zscore: f64,
    #[serde(default = "default_anomaly_label")]
    pub anomaly_label_zscore: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            outlier_rejection_zscore: default_outlier_rejection(),
            anomaly_label_zscore: default_anomaly_label(),
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> GridWxResult<()> {
        for (name, value) in [
            ("outlier_rejection_zscore", self.outlier_rejection_zscore),
            ("anomaly_label_zscore", self.anomaly_label_zscore),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GridWxError::Config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn default_outlier_rejection() -> f64 {
    DEFAULT_OUTLIER_REJECTION_ZSCORE
}

fn default_anomaly_label() -> f64 {
    DEFAULT_ANOMALY_LABEL_ZSCORE
}

/// Layout of the per-station weather files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherLayout {
    /// Metadata lines before the header row
    #[serde(default = "default_preamble_lines")]
    pub preamble_lines: usize,
    /// Value the feed writes for a missing reading
    #[serde(default = "default_missing_sentinel")]
    pub missing_sentinel: f64,
}

impl Default for WeatherLayout {
    fn default() -> Self {
        Self {
            preamble_lines: default_preamble_lines(),
            missing_sentinel: default_missing_sentinel(),
        }
    }
}

fn default_preamble_lines() -> usize {
    8
}

fn default_missing_sentinel() -> f64 {
    -9999.0
}

/// Where and how raw feeds are downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// `{year}` is substituted
    #[serde(default = "default_load_url")]
    pub load_url: String,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    /// Attempts after the first one
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            load_url: default_load_url(),
            weather_url: default_weather_url(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchConfig {
    pub fn load_url_for(&self, year: i32) -> String {
        self.load_url.replace("{year}", &year.to_string())
    }

    pub fn weather_url_for(&self, year: i32) -> String {
        self.weather_url.replace("{year}", &year.to_string())
    }
}

fn default_load_url() -> String {
    "https://ons-aws-prod-opendata.s3.amazonaws.com/dataset/carga_energia_di/CARGA_ENERGIA_{year}.csv"
        .to_string()
}

fn default_weather_url() -> String {
    "https://portal.inmet.gov.br/uploads/dadoshistoricos/{year}.zip".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    120
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub year: i32,
    pub cache_root: PathBuf,
    pub output_dir: PathBuf,
    pub thresholds: Thresholds,
    pub weather: WeatherLayout,
    pub fetch: FetchConfig,
}

impl PipelineConfig {
    pub fn new(year: i32, cache_root: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Self {
        Self {
            year,
            cache_root: cache_root.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            thresholds: Thresholds::default(),
            weather: WeatherLayout::default(),
            fetch: FetchConfig::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// `<output_dir>/energy_weather_{year}.parquet`
    pub fn default_output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("energy_weather_{}.parquet", self.year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_stay_distinct() {
        let t = Thresholds::default();
        assert_eq!(t.outlier_rejection_zscore, 3.0);
        assert_eq!(t.anomaly_label_zscore, 2.5);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        let t = Thresholds {
            outlier_rejection_zscore: 0.0,
            ..Thresholds::default()
        };
        assert!(matches!(t.validate(), Err(GridWxError::Config(_))));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let t: Thresholds = toml::from_str("anomaly_label_zscore = 2.0").unwrap();
        assert_eq!(t.anomaly_label_zscore, 2.0);
        assert_eq!(t.outlier_rejection_zscore, 3.0);

        let w: WeatherLayout = toml::from_str("").unwrap();
        assert_eq!(w.preamble_lines, 8);
    }

    #[test]
    fn urls_substitute_year() {
        let fetch = FetchConfig::default();
        assert!(fetch.load_url_for(2024).ends_with("CARGA_ENERGIA_2024.csv"));
        assert!(fetch.weather_url_for(2023).ends_with("/2023.zip"));
    }

    #[test]
    fn default_output_path_names_year() {
        let cfg = PipelineConfig::new(2022, "/tmp/cache", "/tmp/out");
        assert_eq!(
            cfg.default_output_path(),
            PathBuf::from("/tmp/out/energy_weather_2022.parquet")
        );
    }
}
