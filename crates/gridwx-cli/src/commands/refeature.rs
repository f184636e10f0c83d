use std::path::{Path, PathBuf};

use anyhow::Result;

use gridwx_cli::cli::ThresholdArgs;
use gridwx_cli::config::GridWxConfig;
use gridwx_cli::manifest::record_manifest;
use gridwx_ts::refeature;

pub fn handle(
    config: &GridWxConfig,
    table: &Path,
    out: Option<&PathBuf>,
    thresholds: &ThresholdArgs,
) -> Result<()> {
    let output = out.map(PathBuf::as_path).unwrap_or(table);
    let thresholds = thresholds.apply(config.thresholds);
    let report = refeature(table, output, &thresholds)?;
    println!(
        "Re-featurized {} rows ({} columns, {} anomalies) -> {}",
        report.rows,
        report.columns,
        report.anomalies,
        output.display()
    );

    let table_str = table.display().to_string();
    let outlier = thresholds.outlier_rejection_zscore.to_string();
    let anomaly = thresholds.anomaly_label_zscore.to_string();
    record_manifest(
        output,
        "refeature",
        &[
            ("table", table_str.as_str()),
            ("outlier_zscore", outlier.as_str()),
            ("anomaly_zscore", anomaly.as_str()),
        ],
        report.rows,
    )?;
    Ok(())
}
