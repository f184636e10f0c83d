use std::path::Path;

use anyhow::Result;

use gridwx_cli::cli::ThresholdArgs;
use gridwx_cli::config::GridWxConfig;
use gridwx_cli::manifest::record_manifest;
use gridwx_ts::{read_merged, synthesize_features, write_features};

pub fn handle(
    config: &GridWxConfig,
    base: &Path,
    year: i32,
    out: &Path,
    thresholds: &ThresholdArgs,
) -> Result<()> {
    let thresholds = thresholds.apply(config.thresholds);
    thresholds.validate()?;
    let merged = read_merged(base)?;
    let features = synthesize_features(&merged, year, &thresholds);
    write_features(&features, out, "synth")?;
    let anomalies = features.iter().filter(|f| f.is_anomaly).count();
    println!(
        "Synthesized {year}: {} rows ({anomalies} anomalies) -> {}",
        features.len(),
        out.display()
    );

    let base_str = base.display().to_string();
    let year_str = year.to_string();
    record_manifest(
        out,
        "synth",
        &[("base", base_str.as_str()), ("year", year_str.as_str())],
        features.len(),
    )?;
    Ok(())
}
