use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{error, info};

use gridwx_cli::cli::ProcessArgs;
use gridwx_cli::config::GridWxConfig;
use gridwx_cli::manifest::record_manifest;
use gridwx_core::PipelineConfig;
use gridwx_ts::{run_year, PipelineInputs, PipelineReport};

use crate::commands::util::parse_years;

enum Outcome {
    Built(PipelineReport),
    Skipped,
    Failed(String),
}

pub fn handle(config: &GridWxConfig, args: &ProcessArgs) -> Result<()> {
    let years = parse_years(&args.years)?;
    let local_inputs = args.load_file.is_some() || args.weather_archive.is_some();
    if years.len() > 1 && (local_inputs || args.out.is_some()) {
        bail!("--load-file, --weather-archive and --out need exactly one year");
    }
    let thresholds = args.thresholds.apply(config.thresholds);
    thresholds.validate()?;

    let mut outcomes = Vec::with_capacity(years.len());
    for year in years {
        let mut pipeline = config.pipeline(year).with_thresholds(thresholds);
        if let Some(dir) = &args.cache_dir {
            pipeline.cache_root = dir.clone();
        }
        if let Some(dir) = &args.output_dir {
            pipeline.output_dir = dir.clone();
        }
        let output = output_path(&pipeline, args);

        let outcome = if output.exists() && !args.force {
            info!(year, output = %output.display(), "output exists, skipping (use --force to rebuild)");
            Outcome::Skipped
        } else {
            match process_year(&pipeline, args, &output) {
                Ok(report) => Outcome::Built(report),
                Err(e) => {
                    error!("Processing {year} failed: {:?}", e);
                    Outcome::Failed(format!("{e:#}"))
                }
            }
        };
        outcomes.push((year, output, outcome));
    }

    println!();
    println!("Processed {} year(s):", outcomes.len());
    let mut failed = 0;
    for (year, output, outcome) in &outcomes {
        match outcome {
            Outcome::Built(report) => println!(
                "  {year}: ok, {} rows, {} anomalies -> {}",
                report.rows,
                report.anomalies,
                output.display()
            ),
            Outcome::Skipped => println!("  {year}: skipped, {} exists", output.display()),
            Outcome::Failed(message) => {
                failed += 1;
                println!("  {year}: FAILED: {message}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} year(s) failed", outcomes.len());
    }
    Ok(())
}

fn output_path(pipeline: &PipelineConfig, args: &ProcessArgs) -> PathBuf {
    match &args.out {
        Some(out) => out.clone(),
        None => pipeline
            .default_output_path()
            .with_extension(args.format.extension()),
    }
}

fn process_year(
    pipeline: &PipelineConfig,
    args: &ProcessArgs,
    output: &Path,
) -> Result<PipelineReport> {
    let inputs = match (&args.load_file, &args.weather_archive) {
        (Some(load_csv), Some(weather_archive)) => PipelineInputs {
            load_csv: load_csv.clone(),
            weather_archive: weather_archive.clone(),
        },
        _ => PipelineInputs::fetch(pipeline, args.force)?,
    };
    info!(
        year = pipeline.year,
        load = %inputs.load_csv.display(),
        weather = %inputs.weather_archive.display(),
        "processing year"
    );
    let report = run_year(pipeline, &inputs, output)?;
    info!(
        year = report.year,
        load_rows = report.load.rows_read,
        cleaned_out = report.clean.removed(),
        stations = report.weather.files_parsed,
        stations_failed = report.weather.files_failed,
        merged = report.merge.merged_rows,
        "year summary"
    );

    let year = pipeline.year.to_string();
    let load = inputs.load_csv.display().to_string();
    let weather = inputs.weather_archive.display().to_string();
    let outlier = pipeline.thresholds.outlier_rejection_zscore.to_string();
    let anomaly = pipeline.thresholds.anomaly_label_zscore.to_string();
    record_manifest(
        output,
        "process",
        &[
            ("year", year.as_str()),
            ("load_file", load.as_str()),
            ("weather_archive", weather.as_str()),
            ("outlier_zscore", outlier.as_str()),
            ("anomaly_zscore", anomaly.as_str()),
        ],
        report.rows,
    )?;
    Ok(report)
}
