//! `gridwx.toml` loading.
//!
//! Lookup order: `--config`, then `$GRIDWX_CONFIG`, then
//! `<config_dir>/gridwx/gridwx.toml`. When none exists the built-in defaults
//! are used.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gridwx_core::{FetchConfig, PipelineConfig, Thresholds, WeatherLayout};

pub const CONFIG_ENV: &str = "GRIDWX_CONFIG";
pub const CACHE_ENV: &str = "GRIDWX_CACHE_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridWxConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub weather: WeatherLayout,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Downloaded raw feeds
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,
    /// Processed feature tables
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            output_dir: default_output_dir(),
        }
    }
}

/// `$GRIDWX_CACHE_DIR`, else `<cache_dir>/gridwx/raw`, else `data/raw`.
pub fn default_cache_root() -> PathBuf {
    if let Ok(dir) = env::var(CACHE_ENV) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .map(|dir| dir.join("gridwx").join("raw"))
        .unwrap_or_else(|| PathBuf::from("data/raw"))
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

impl GridWxConfig {
    /// Per-year pipeline settings built from this file.
    pub fn pipeline(&self, year: i32) -> PipelineConfig {
        PipelineConfig {
            year,
            cache_root: self.paths.cache_root.clone(),
            output_dir: self.paths.output_dir.clone(),
            thresholds: self.thresholds,
            weather: self.weather.clone(),
            fetch: self.fetch.clone(),
        }
    }
}

/// The file that would be read, if any exists.
pub fn locate_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("gridwx").join("gridwx.toml"))
        .filter(|path| path.exists())
}

/// Load configuration. An explicitly named file must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<GridWxConfig> {
    match locate_config(explicit) {
        Some(path) => read_config(&path),
        None => Ok(GridWxConfig::default()),
    }
}

pub fn read_config(path: &Path) -> Result<GridWxConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: GridWxConfig = toml::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.thresholds.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gridwx.toml");
        fs::write(
            &path,
            "[paths]\noutput_dir = \"/srv/tables\"\n\n[thresholds]\nanomaly_label_zscore = 2.0\n",
        )
        .unwrap();

        let config = read_config(&path).unwrap();
        assert_eq!(config.paths.output_dir, PathBuf::from("/srv/tables"));
        assert_eq!(config.thresholds.anomaly_label_zscore, 2.0);
        assert_eq!(config.thresholds.outlier_rejection_zscore, 3.0);
        assert_eq!(config.weather.preamble_lines, 8);
        assert_eq!(config.fetch.retries, 3);

        let pipeline = config.pipeline(2023);
        assert_eq!(
            pipeline.default_output_path(),
            PathBuf::from("/srv/tables/energy_weather_2023.parquet")
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn invalid_threshold_in_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gridwx.toml");
        fs::write(&path, "[thresholds]\noutlier_rejection_zscore = -3.0\n").unwrap();
        assert!(read_config(&path).is_err());
    }
}
