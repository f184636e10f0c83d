//! Columnar persistence of feature tables.
//!
//! Rows convert to and from a polars `DataFrame` with the declared column
//! order. The file format follows the extension: `.parquet` (Snappy) or
//! `.csv`. Writes go to `<parent>/<stage>/<file>` first and are renamed into
//! place once complete.

use std::{
    ffi::OsStr,
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
#[cfg(feature = "parquet")]
use polars::prelude::{ParquetCompression, ParquetReader, ParquetWriter};

use gridwx_core::{
    FeatureRow, GridWxError, GridWxResult, MergedRecord, Region, Season, BASE_COLUMNS,
    FEATURE_COLUMNS,
};

const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn write_features(rows: &[FeatureRow], path: &Path, stage: &str) -> GridWxResult<()> {
    let mut df = features_to_frame(rows).map_err(frame_error)?;
    write_frame_staged(&mut df, path, stage).map_err(frame_error)
}

pub fn read_features(path: &Path) -> GridWxResult<Vec<FeatureRow>> {
    let df = read_frame(path).map_err(frame_error)?;
    features_from_frame(&df).map_err(frame_error)
}

/// Read only the merged base columns of a persisted table.
pub fn read_merged(path: &Path) -> GridWxResult<Vec<MergedRecord>> {
    let df = read_frame(path).map_err(frame_error)?;
    merged_from_frame(&df).map_err(frame_error)
}

fn frame_error(err: anyhow::Error) -> GridWxError {
    GridWxError::Frame(format!("{err:#}"))
}

pub fn features_to_frame(rows: &[FeatureRow]) -> Result<DataFrame> {
    let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.base.date)).collect();
    let regions: Vec<&str> = rows.iter().map(|r| r.base.region.label()).collect();
    let seasons: Vec<&str> = rows.iter().map(|r| r.season.label()).collect();
    let f = |get: fn(&FeatureRow) -> f64| rows.iter().map(get).collect::<Vec<f64>>();
    let opt = |get: fn(&FeatureRow) -> Option<f64>| rows.iter().map(get).collect::<Vec<_>>();
    let int = |get: fn(&FeatureRow) -> i32| rows.iter().map(get).collect::<Vec<i32>>();

    let date = Series::new("date", dates)
        .cast(&DataType::Date)
        .context("casting date column")?;

    let df = DataFrame::new(vec![
        date,
        Series::new("region", regions),
        Series::new("load_mw", f(|r| r.base.load_mw)),
        Series::new("temp_mean", f(|r| r.base.temp_mean)),
        Series::new("temp_min", f(|r| r.base.temp_min)),
        Series::new("temp_max", f(|r| r.base.temp_max)),
        Series::new("radiation_mean", f(|r| r.base.radiation_mean)),
        Series::new("precipitation_total", f(|r| r.base.precipitation_total)),
        Series::new("day_of_week", int(|r| r.day_of_week)),
        Series::new("month", int(|r| r.month)),
        Series::new("year", int(|r| r.year)),
        Series::new("season", seasons),
        Series::new("load_ma_7d", f(|r| r.load_ma_7d)),
        Series::new("load_ma_30d", f(|r| r.load_ma_30d)),
        Series::new("temp_ma_7d", f(|r| r.temp_ma_7d)),
        Series::new("temp_ma_30d", f(|r| r.temp_ma_30d)),
        Series::new("load_zscore", f(|r| r.load_zscore)),
        Series::new("is_anomaly", int(|r| r.is_anomaly as i32)),
        Series::new("load_lag_1d", opt(|r| r.load_lag_1d)),
        Series::new("load_lag_7d", opt(|r| r.load_lag_7d)),
        Series::new("temp_lag_1d", opt(|r| r.temp_lag_1d)),
        Series::new("temp_lag_7d", opt(|r| r.temp_lag_7d)),
        Series::new("load_x_temp", f(|r| r.load_x_temp)),
        Series::new("temp_x_dayofweek", f(|r| r.temp_x_dayofweek)),
        Series::new("load_mom", opt(|r| r.load_mom)),
    ])?;
    debug_assert_eq!(df.width(), FEATURE_COLUMNS.len());
    Ok(df)
}

/// Reduce a table to its base columns and parse them into merged rows.
pub fn merged_from_frame(df: &DataFrame) -> Result<Vec<MergedRecord>> {
    let base = df
        .clone()
        .lazy()
        .select(BASE_COLUMNS.iter().map(|c| col(c)).collect::<Vec<_>>())
        .collect()
        .context("selecting base columns")?;
    let cols = BaseColumns::read(&base)?;
    (0..base.height()).map(|idx| cols.record(idx)).collect()
}

pub fn features_from_frame(df: &DataFrame) -> Result<Vec<FeatureRow>> {
    for name in FEATURE_COLUMNS {
        if df.column(name).is_err() {
            bail!("table is missing column `{name}`");
        }
    }
    let base = BaseColumns::read(df)?;
    let day_of_week = column_i32(df, "day_of_week")?;
    let month = column_i32(df, "month")?;
    let year = column_i32(df, "year")?;
    let season = column_utf8(df, "season")?;
    let load_ma_7d = column_f64(df, "load_ma_7d")?;
    let load_ma_30d = column_f64(df, "load_ma_30d")?;
    let temp_ma_7d = column_f64(df, "temp_ma_7d")?;
    let temp_ma_30d = column_f64(df, "temp_ma_30d")?;
    let load_zscore = column_f64(df, "load_zscore")?;
    let is_anomaly = column_i32(df, "is_anomaly")?;
    let load_lag_1d = column_f64(df, "load_lag_1d")?;
    let load_lag_7d = column_f64(df, "load_lag_7d")?;
    let temp_lag_1d = column_f64(df, "temp_lag_1d")?;
    let temp_lag_7d = column_f64(df, "temp_lag_7d")?;
    let load_x_temp = column_f64(df, "load_x_temp")?;
    let temp_x_dayofweek = column_f64(df, "temp_x_dayofweek")?;
    let load_mom = column_f64(df, "load_mom")?;

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let season_label = required(&season, "season", idx)?;
        rows.push(FeatureRow {
            base: base.record(idx)?,
            day_of_week: required(&day_of_week, "day_of_week", idx)?,
            month: required(&month, "month", idx)?,
            year: required(&year, "year", idx)?,
            season: Season::from_label(&season_label)
                .ok_or_else(|| anyhow!("row {idx}: unknown season `{season_label}`"))?,
            load_ma_7d: required(&load_ma_7d, "load_ma_7d", idx)?,
            load_ma_30d: required(&load_ma_30d, "load_ma_30d", idx)?,
            temp_ma_7d: required(&temp_ma_7d, "temp_ma_7d", idx)?,
            temp_ma_30d: required(&temp_ma_30d, "temp_ma_30d", idx)?,
            load_zscore: required(&load_zscore, "load_zscore", idx)?,
            is_anomaly: required(&is_anomaly, "is_anomaly", idx)? != 0,
            load_lag_1d: load_lag_1d[idx],
            load_lag_7d: load_lag_7d[idx],
            temp_lag_1d: temp_lag_1d[idx],
            temp_lag_7d: temp_lag_7d[idx],
            load_x_temp: required(&load_x_temp, "load_x_temp", idx)?,
            temp_x_dayofweek: required(&temp_x_dayofweek, "temp_x_dayofweek", idx)?,
            load_mom: load_mom[idx],
        });
    }
    Ok(rows)
}

struct BaseColumns {
    date: Vec<Option<NaiveDate>>,
    region: Vec<Option<String>>,
    load_mw: Vec<Option<f64>>,
    temp_mean: Vec<Option<f64>>,
    temp_min: Vec<Option<f64>>,
    temp_max: Vec<Option<f64>>,
    radiation_mean: Vec<Option<f64>>,
    precipitation_total: Vec<Option<f64>>,
}

impl BaseColumns {
    fn read(df: &DataFrame) -> Result<Self> {
        Ok(Self {
            date: column_date(df, "date")?,
            region: column_utf8(df, "region")?,
            load_mw: column_f64(df, "load_mw")?,
            temp_mean: column_f64(df, "temp_mean")?,
            temp_min: column_f64(df, "temp_min")?,
            temp_max: column_f64(df, "temp_max")?,
            radiation_mean: column_f64(df, "radiation_mean")?,
            precipitation_total: column_f64(df, "precipitation_total")?,
        })
    }

    fn record(&self, idx: usize) -> Result<MergedRecord> {
        let label = required(&self.region, "region", idx)?;
        let region = Region::from_label(&label)
            .ok_or_else(|| anyhow!("row {idx}: unknown region `{label}`"))?;
        Ok(MergedRecord {
            date: required(&self.date, "date", idx)?,
            region,
            load_mw: required(&self.load_mw, "load_mw", idx)?,
            temp_mean: required(&self.temp_mean, "temp_mean", idx)?,
            temp_min: required(&self.temp_min, "temp_min", idx)?,
            temp_max: required(&self.temp_max, "temp_max", idx)?,
            radiation_mean: required(&self.radiation_mean, "radiation_mean", idx)?,
            precipitation_total: required(&self.precipitation_total, "precipitation_total", idx)?,
        })
    }
}

fn required<T: Clone>(values: &[Option<T>], column: &str, idx: usize) -> Result<T> {
    values[idx]
        .clone()
        .ok_or_else(|| anyhow!("row {idx}: column `{column}` is null"))
}

fn column_f64(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(column)
        .with_context(|| format!("missing column `{column}`"))?
        .cast(&DataType::Float64)
        .with_context(|| format!("column `{column}` must be numeric"))?;
    Ok(series.f64()?.into_iter().collect())
}

fn column_i32(df: &DataFrame, column: &str) -> Result<Vec<Option<i32>>> {
    let series = df
        .column(column)
        .with_context(|| format!("missing column `{column}`"))?
        .cast(&DataType::Int32)
        .with_context(|| format!("column `{column}` must be integer"))?;
    Ok(series.i32()?.into_iter().collect())
}

fn column_utf8(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(column)
        .with_context(|| format!("missing column `{column}`"))?;
    let chunked = series
        .utf8()
        .with_context(|| format!("column `{column}` must be utf8"))?;
    Ok(chunked
        .into_iter()
        .map(|opt| opt.map(|value| value.to_string()))
        .collect())
}

/// Date columns come back as `Date` from Parquet and as strings from CSV.
fn column_date(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDate>>> {
    let series = df
        .column(column)
        .with_context(|| format!("missing column `{column}`"))?;
    if let DataType::Utf8 = series.dtype() {
        return Ok(series
            .utf8()?
            .into_iter()
            .map(|opt| opt.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
            .collect());
    }
    let days = series
        .cast(&DataType::Int32)
        .with_context(|| format!("column `{column}` must be a date"))?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|opt| opt.and_then(days_to_date))
        .collect())
}

fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    match extension_of(path).as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => ParquetReader::new(&mut file)
            .finish()
            .with_context(|| format!("reading Parquet {}", path.display())),
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(anyhow!(
            "parquet support is disabled; rebuild with the 'parquet' feature"
        )),
        "csv" => CsvReader::new(&mut file)
            .has_header(true)
            .finish()
            .with_context(|| format!("reading CSV {}", path.display())),
        other => Err(anyhow!(
            "unsupported file extension '{}'; use .csv or .parquet",
            other
        )),
    }
}

pub fn write_frame_staged(df: &mut DataFrame, path: &Path, stage: &str) -> Result<()> {
    let extension = extension_of(path);
    if extension != "parquet" && extension != "csv" {
        bail!(
            "unsupported output extension '{}' for {}; use .csv or .parquet",
            extension,
            path.display()
        );
    }
    let staged = staged_output_path(path, stage);
    if let Some(parent) = staged.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file =
        File::create(&staged).with_context(|| format!("creating {}", staged.display()))?;
    match extension.as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => ParquetWriter::new(&mut file)
            .with_compression(ParquetCompression::Snappy)
            .finish(df)
            .map(|_| ())
            .with_context(|| format!("writing Parquet {}", staged.display()))?,
        #[cfg(not(feature = "parquet"))]
        "parquet" => bail!("parquet support is disabled; rebuild with the 'parquet' feature"),
        _ => CsvWriter::new(&mut file)
            .finish(df)
            .with_context(|| format!("writing CSV {}", staged.display()))?,
    }
    drop(file);

    fs::rename(&staged, path)
        .with_context(|| format!("moving {} to {}", staged.display(), path.display()))?;
    if let Some(stage_dir) = staged.parent() {
        // Leave the directory if another write is still using it.
        let _ = fs::remove_dir(stage_dir);
    }
    Ok(())
}

fn staged_output_path(output: &Path, stage: &str) -> PathBuf {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    let file_name = output.file_name().unwrap_or_else(|| OsStr::new("output"));
    parent.join(stage).join(file_name)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}
