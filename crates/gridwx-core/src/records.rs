//! Row types passed between pipeline stages.
//!
//! Each stage consumes the previous stage's rows by value and returns its own,
//! so no stage holds on to upstream data.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Version of the declared output column set.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Merged base columns, in output order.
pub const BASE_COLUMNS: [&str; 8] = [
    "date",
    "region",
    "load_mw",
    "temp_mean",
    "temp_min",
    "temp_max",
    "radiation_mean",
    "precipitation_total",
];

/// Derived columns appended by the feature engine, in output order.
pub const DERIVED_COLUMNS: [&str; 17] = [
    "day_of_week",
    "month",
    "year",
    "season",
    "load_ma_7d",
    "load_ma_30d",
    "temp_ma_7d",
    "temp_ma_30d",
    "load_zscore",
    "is_anomaly",
    "load_lag_1d",
    "load_lag_7d",
    "temp_lag_1d",
    "temp_lag_7d",
    "load_x_temp",
    "temp_x_dayofweek",
    "load_mom",
];

/// Full output schema: base columns followed by derived columns.
pub const FEATURE_COLUMNS: [&str; 25] = [
    "date",
    "region",
    "load_mw",
    "temp_mean",
    "temp_min",
    "temp_max",
    "radiation_mean",
    "precipitation_total",
    "day_of_week",
    "month",
    "year",
    "season",
    "load_ma_7d",
    "load_ma_30d",
    "temp_ma_7d",
    "temp_ma_30d",
    "load_zscore",
    "is_anomaly",
    "load_lag_1d",
    "load_lag_7d",
    "temp_lag_1d",
    "temp_lag_7d",
    "load_x_temp",
    "temp_x_dayofweek",
    "load_mom",
];

/// One load-feed row as read, before any validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLoadRow {
    pub timestamp: Option<NaiveDateTime>,
    pub subsystem: Option<String>,
    pub region: Option<Region>,
    pub load_mw: Option<f64>,
}

/// A validated hourly load reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadRecord {
    pub timestamp: NaiveDateTime,
    pub region: Region,
    pub load_mw: f64,
}

/// One hourly reading from a weather station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub timestamp: NaiveDateTime,
    pub station_id: String,
    pub state_code: String,
    pub region: Region,
    pub temperature_c: Option<f64>,
    pub radiation_kj_m2: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

/// Station observations collapsed to one row per (region, date).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionalDailyWeather {
    pub date: NaiveDate,
    pub region: Region,
    pub temp_mean: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub radiation_mean: Option<f64>,
    pub precipitation_total: Option<f64>,
}

/// Daily load joined with complete daily weather.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub date: NaiveDate,
    pub region: Region,
    pub load_mw: f64,
    pub temp_mean: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub radiation_mean: f64,
    pub precipitation_total: f64,
}

/// Southern-Hemisphere meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Summer,
    Fall,
    Winter,
    Spring,
}

impl Season {
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Summer,
            3..=5 => Season::Fall,
            6..=8 => Season::Winter,
            _ => Season::Spring,
        }
    }

    pub fn of(date: NaiveDate) -> Season {
        Season::from_month(date.month())
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
            Season::Spring => "Spring",
        }
    }

    pub fn from_label(label: &str) -> Option<Season> {
        [Season::Summer, Season::Fall, Season::Winter, Season::Spring]
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// A merged row with every derived column filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub base: MergedRecord,
    /// 0 = Monday
    pub day_of_week: i32,
    pub month: i32,
    pub year: i32,
    pub season: Season,
    pub load_ma_7d: f64,
    pub load_ma_30d: f64,
    pub temp_ma_7d: f64,
    pub temp_ma_30d: f64,
    pub load_zscore: f64,
    pub is_anomaly: bool,
    pub load_lag_1d: Option<f64>,
    pub load_lag_7d: Option<f64>,
    pub temp_lag_1d: Option<f64>,
    pub temp_lag_7d: Option<f64>,
    pub load_x_temp: f64,
    pub temp_x_dayofweek: f64,
    pub load_mom: Option<f64>,
}
