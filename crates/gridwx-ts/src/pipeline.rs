//! End-to-end runs: raw feeds to a persisted feature table, and
//! re-featurizing an existing table.

use std::path::{Path, PathBuf};

use tracing::info;

use gridwx_core::{FeatureRow, GridWxResult, PipelineConfig, Thresholds, FEATURE_COLUMNS};
use gridwx_io::{read_load_csv, read_weather_archive, FeedCache, LoadReadReport, WeatherReadReport};

use crate::aggregate::{aggregate_weather, AggregateReport};
use crate::clean::{clean_load, CleanReport};
use crate::features::compute_features;
use crate::frame::{read_merged, write_features};
use crate::merge::{merge, MergeReport};

/// Local paths of one year's raw inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInputs {
    pub load_csv: PathBuf,
    pub weather_archive: PathBuf,
}

impl PipelineInputs {
    /// Download whatever is missing from the cache and return both paths.
    pub fn fetch(config: &PipelineConfig, force: bool) -> GridWxResult<Self> {
        let cache = FeedCache::new(&config.cache_root, config.fetch.clone()).with_force(force);
        Ok(Self {
            load_csv: cache.ensure_load_csv(config.year)?,
            weather_archive: cache.ensure_weather_archive(config.year)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub year: i32,
    pub load: LoadReadReport,
    pub weather: WeatherReadReport,
    pub clean: CleanReport,
    pub aggregate: AggregateReport,
    pub merge: MergeReport,
    pub rows: usize,
    pub anomalies: usize,
}

/// Read, clean, aggregate, merge and featurize one year.
pub fn build_features(
    config: &PipelineConfig,
    inputs: &PipelineInputs,
) -> GridWxResult<(Vec<FeatureRow>, PipelineReport)> {
    config.thresholds.validate()?;

    let (raw_load, load_report) = read_load_csv(&inputs.load_csv)?;
    let (observations, weather_report) =
        read_weather_archive(&inputs.weather_archive, config.year, &config.weather)?;

    let (load, clean_report) = clean_load(raw_load, &config.thresholds);
    let (daily_weather, aggregate_report) = aggregate_weather(observations);
    let (merged, merge_report) = merge(&load, daily_weather, config.year)?;
    let features = compute_features(merged, &config.thresholds);

    let report = PipelineReport {
        year: config.year,
        load: load_report,
        weather: weather_report,
        clean: clean_report,
        aggregate: aggregate_report,
        merge: merge_report,
        rows: features.len(),
        anomalies: features.iter().filter(|f| f.is_anomaly).count(),
    };
    Ok((features, report))
}

/// [`build_features`] and persist the table at `output`.
pub fn run_year(
    config: &PipelineConfig,
    inputs: &PipelineInputs,
    output: &Path,
) -> GridWxResult<PipelineReport> {
    let (features, report) = build_features(config, inputs)?;
    write_features(&features, output, "process")?;
    info!(
        year = config.year,
        rows = report.rows,
        anomalies = report.anomalies,
        output = %output.display(),
        "wrote feature table"
    );
    Ok(report)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefeatureReport {
    pub rows: usize,
    pub columns: usize,
    pub anomalies: usize,
}

/// Recompute every derived column of a persisted table.
///
/// The table is reduced to its base columns first, so the result always has
/// the declared schema and running it again changes nothing.
pub fn refeature(
    input: &Path,
    output: &Path,
    thresholds: &Thresholds,
) -> GridWxResult<RefeatureReport> {
    thresholds.validate()?;
    let merged = read_merged(input)?;
    let features = compute_features(merged, thresholds);
    write_features(&features, output, "refeature")?;

    let report = RefeatureReport {
        rows: features.len(),
        columns: FEATURE_COLUMNS.len(),
        anomalies: features.iter().filter(|f| f.is_anomaly).count(),
    };
    info!(
        rows = report.rows,
        anomalies = report.anomalies,
        output = %output.display(),
        "re-featurized table"
    );
    Ok(report)
}
