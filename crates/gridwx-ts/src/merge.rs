//! Inner join of daily load with complete daily weather.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use gridwx_core::{GridWxError, GridWxResult, LoadRecord, MergedRecord, Region, RegionalDailyWeather};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Distinct (region, date) keys in the load series
    pub load_days: usize,
    pub weather_days: usize,
    /// Weather days with every aggregate present and a canonical region
    pub joinable_weather_days: usize,
    pub merged_rows: usize,
}

/// Collapse hourly load to the mean per (region, date), sorted by key.
pub fn daily_load(records: &[LoadRecord]) -> BTreeMap<(Region, NaiveDate), f64> {
    let mut sums: BTreeMap<(Region, NaiveDate), (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = sums
            .entry((record.region, record.timestamp.date()))
            .or_insert((0.0, 0));
        entry.0 += record.load_mw;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

/// Join on `(date, region)`. Output is sorted by `(region, date)`.
///
/// Weather rows lacking a radiation or precipitation aggregate never join, and
/// neither does the `Unknown` bucket. An empty result is an error.
pub fn merge(
    load: &[LoadRecord],
    weather: Vec<RegionalDailyWeather>,
    year: i32,
) -> GridWxResult<(Vec<MergedRecord>, MergeReport)> {
    let daily = daily_load(load);
    let mut report = MergeReport {
        load_days: daily.len(),
        weather_days: weather.len(),
        ..MergeReport::default()
    };

    let mut merged = Vec::new();
    for day in weather {
        let (Some(radiation_mean), Some(precipitation_total)) =
            (day.radiation_mean, day.precipitation_total)
        else {
            continue;
        };
        if !day.region.is_canonical() {
            continue;
        }
        report.joinable_weather_days += 1;

        if let Some(load_mw) = daily.get(&(day.region, day.date)) {
            merged.push(MergedRecord {
                date: day.date,
                region: day.region,
                load_mw: *load_mw,
                temp_mean: day.temp_mean,
                temp_min: day.temp_min,
                temp_max: day.temp_max,
                radiation_mean,
                precipitation_total,
            });
        }
    }
    merged.sort_by(|a, b| (a.region, a.date).cmp(&(b.region, b.date)));
    report.merged_rows = merged.len();

    if merged.is_empty() {
        warn!(
            year,
            load_days = report.load_days,
            weather_days = report.weather_days,
            "load and weather share no (date, region) key"
        );
        return Err(GridWxError::EmptyJoin {
            year,
            load_days: report.load_days,
            weather_days: report.weather_days,
        });
    }

    info!(
        year,
        rows = report.merged_rows,
        load_days = report.load_days,
        weather_days = report.joinable_weather_days,
        "merged load and weather"
    );
    Ok((merged, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn load(region: Region, day: u32, hour: u32, mw: f64) -> LoadRecord {
        LoadRecord {
            timestamp: date(day).and_hms_opt(hour, 0, 0).unwrap(),
            region,
            load_mw: mw,
        }
    }

    fn weather(region: Region, day: u32) -> RegionalDailyWeather {
        RegionalDailyWeather {
            date: date(day),
            region,
            temp_mean: 20.0,
            temp_min: 15.0,
            temp_max: 25.0,
            radiation_mean: Some(1000.0),
            precipitation_total: Some(0.0),
        }
    }

    #[test]
    fn joins_only_shared_days() {
        let load = vec![
            load(Region::South, 1, 0, 10.0),
            load(Region::South, 2, 0, 20.0),
            load(Region::South, 3, 0, 30.0),
        ];
        let weather = vec![
            weather(Region::South, 2),
            weather(Region::South, 3),
            weather(Region::South, 4),
        ];
        let (merged, report) = merge(&load, weather, 2024).unwrap();
        let dates: Vec<NaiveDate> = merged.iter().map(|m| m.date).collect();
        assert_eq!(dates, vec![date(2), date(3)]);
        assert_eq!(report.load_days, 3);
        assert_eq!(report.merged_rows, 2);
    }

    #[test]
    fn hourly_load_collapses_to_daily_mean() {
        let load = vec![
            load(Region::North, 1, 0, 100.0),
            load(Region::North, 1, 12, 200.0),
        ];
        let (merged, _) = merge(&load, vec![weather(Region::North, 1)], 2024).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].load_mw, 150.0);
    }

    #[test]
    fn incomplete_and_unknown_weather_never_join() {
        let load = vec![load(Region::South, 1, 0, 10.0), load(Region::South, 2, 0, 10.0)];
        let mut no_rain = weather(Region::South, 1);
        no_rain.precipitation_total = None;
        let unknown = weather(Region::Unknown, 2);
        let complete = weather(Region::South, 2);

        let (merged, report) = merge(&load, vec![no_rain, unknown, complete], 2024).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].date, date(2));
        assert_eq!(report.joinable_weather_days, 1);
    }

    #[test]
    fn output_sorted_by_region_then_date() {
        let load = vec![
            load(Region::South, 2, 0, 1.0),
            load(Region::North, 2, 0, 1.0),
            load(Region::South, 1, 0, 1.0),
        ];
        let weather = vec![
            weather(Region::South, 2),
            weather(Region::South, 1),
            weather(Region::North, 2),
        ];
        let (merged, _) = merge(&load, weather, 2024).unwrap();
        let keys: Vec<(Region, NaiveDate)> = merged.iter().map(|m| (m.region, m.date)).collect();
        assert_eq!(
            keys,
            vec![
                (Region::North, date(2)),
                (Region::South, date(1)),
                (Region::South, date(2)),
            ]
        );
    }

    #[test]
    fn empty_join_is_an_error() {
        let load = vec![load(Region::North, 1, 0, 10.0)];
        let err = merge(&load, vec![weather(Region::South, 1)], 2021).unwrap_err();
        assert!(matches!(
            err,
            GridWxError::EmptyJoin {
                year: 2021,
                load_days: 1,
                weather_days: 1
            }
        ));
    }
}
