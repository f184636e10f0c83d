//! Per-region derived columns: calendar, moving averages, Z-score, lags,
//! interactions and the 30-row load change.
//!
//! Every window is computed inside one region, ordered by date. Regions are
//! independent, so they are computed on the rayon pool and concatenated back
//! in region order.

use std::collections::BTreeMap;

use chrono::Datelike;
use rayon::prelude::*;
use tracing::info;

use gridwx_core::{FeatureRow, MergedRecord, Region, Season, Thresholds};

use crate::baseline::{is_anomaly, zscores};

pub const MA_SHORT: usize = 7;
pub const MA_LONG: usize = 30;
pub const LAG_SHORT: usize = 1;
pub const LAG_LONG: usize = 7;
/// Rows back for `load_mom`; a month only when the region has no gaps.
pub const MOM_PERIODS: usize = 30;

/// Derive the full feature set from merged rows.
///
/// Output is sorted by `(region, date)`. The function keeps no state, so the
/// same input always yields the same rows.
pub fn compute_features(rows: Vec<MergedRecord>, thresholds: &Thresholds) -> Vec<FeatureRow> {
    let mut by_region: BTreeMap<Region, Vec<MergedRecord>> = BTreeMap::new();
    for row in rows {
        by_region.entry(row.region).or_default().push(row);
    }

    let anomaly_cutoff = thresholds.anomaly_label_zscore;
    let features: Vec<FeatureRow> = by_region
        .into_par_iter()
        .map(|(_, mut rows)| {
            rows.sort_by_key(|r| r.date);
            region_features(rows, anomaly_cutoff)
        })
        .collect::<Vec<Vec<FeatureRow>>>()
        .into_iter()
        .flatten()
        .collect();

    let anomalies = features.iter().filter(|f| f.is_anomaly).count();
    info!(rows = features.len(), anomalies, "computed features");
    features
}

fn region_features(rows: Vec<MergedRecord>, anomaly_cutoff: f64) -> Vec<FeatureRow> {
    let load: Vec<f64> = rows.iter().map(|r| r.load_mw).collect();
    let temp: Vec<f64> = rows.iter().map(|r| r.temp_mean).collect();

    let load_ma_7d = rolling_mean(&load, MA_SHORT);
    let load_ma_30d = rolling_mean(&load, MA_LONG);
    let temp_ma_7d = rolling_mean(&temp, MA_SHORT);
    let temp_ma_30d = rolling_mean(&temp, MA_LONG);
    let load_zscore = zscores(&load);
    let load_mom = pct_change(&load, MOM_PERIODS);

    rows.into_iter()
        .enumerate()
        .map(|(i, base)| {
            let day_of_week = base.date.weekday().num_days_from_monday() as i32;
            FeatureRow {
                day_of_week,
                month: base.date.month() as i32,
                year: base.date.year(),
                season: Season::of(base.date),
                load_ma_7d: load_ma_7d[i],
                load_ma_30d: load_ma_30d[i],
                temp_ma_7d: temp_ma_7d[i],
                temp_ma_30d: temp_ma_30d[i],
                load_zscore: load_zscore[i],
                is_anomaly: is_anomaly(load_zscore[i], anomaly_cutoff),
                load_lag_1d: lag(&load, i, LAG_SHORT),
                load_lag_7d: lag(&load, i, LAG_LONG),
                temp_lag_1d: lag(&temp, i, LAG_SHORT),
                temp_lag_7d: lag(&temp, i, LAG_LONG),
                load_x_temp: base.load_mw * base.temp_mean,
                temp_x_dayofweek: base.temp_mean * day_of_week as f64,
                load_mom: load_mom[i],
                base,
            }
        })
        .collect()
}

/// Trailing mean over up to `window` values, shrinking at the start.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

fn lag(values: &[f64], i: usize, periods: usize) -> Option<f64> {
    i.checked_sub(periods).map(|j| values[j])
}

/// `x[i] / x[i - periods] - 1`; `None` without a prior value or when it is zero.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let prior = lag(values, i, periods)?;
            (prior != 0.0).then(|| values[i] / prior - 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(region: Region, loads: &[f64]) -> Vec<MergedRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        loads
            .iter()
            .enumerate()
            .map(|(i, load)| MergedRecord {
                date: start + Duration::days(i as i64),
                region,
                load_mw: *load,
                temp_mean: 20.0 + i as f64,
                temp_min: 15.0,
                temp_max: 30.0 + i as f64,
                radiation_mean: 1200.0,
                precipitation_total: 0.0,
            })
            .collect()
    }

    #[test]
    fn rolling_means_never_mix_regions() {
        let mut rows = series(Region::North, &[100.0; 40]);
        rows.extend(series(Region::South, &[500.0; 40]));
        rows.reverse();

        let features = compute_features(rows, &Thresholds::default());
        assert_eq!(features.len(), 80);
        for f in &features {
            let expected = if f.base.region == Region::North { 100.0 } else { 500.0 };
            assert_eq!(f.load_ma_7d, expected);
            assert_eq!(f.load_ma_30d, expected);
            assert_eq!(f.load_zscore, 0.0);
            assert!(!f.is_anomaly);
        }
        assert_eq!(features[0].base.region, Region::North);
        assert!(features.windows(2).all(|w| {
            (w[0].base.region, w[0].base.date) < (w[1].base.region, w[1].base.date)
        }));
    }

    #[test]
    fn flags_exactly_the_spike() {
        let loads = [100.0, 102.0, 98.0, 101.0, 99.0, 250.0, 100.0, 103.0, 97.0, 102.0];
        let features = compute_features(series(Region::Northeast, &loads), &Thresholds::default());

        let flagged: Vec<f64> = features
            .iter()
            .filter(|f| f.is_anomaly)
            .map(|f| f.base.load_mw)
            .collect();
        assert_eq!(flagged, vec![250.0]);

        let mean_z = features.iter().map(|f| f.load_zscore).sum::<f64>() / 10.0;
        assert!(mean_z.abs() < 1e-9);
        assert!(features[5].load_zscore.abs() > 2.5);
    }

    /// 36 days alternating around 1000 MW, then points at about 2.42 and
    /// 2.52 standard deviations on each side.
    fn near_cutoff_loads() -> Vec<f64> {
        let mut loads: Vec<f64> = (0..36)
            .map(|i| if i % 2 == 0 { 990.0 } else { 1010.0 })
            .collect();
        loads.extend([1038.0, 1039.5, 962.0, 960.5]);
        loads
    }

    fn expected_flags(loads: &[f64], cutoff: f64) -> Vec<bool> {
        let n = loads.len() as f64;
        let mu = loads.iter().sum::<f64>() / n;
        let sigma = (loads.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
        loads.iter().map(|x| (x - mu).abs() / sigma > cutoff).collect()
    }

    #[test]
    fn anomaly_flag_follows_each_regions_own_statistics() {
        let north = near_cutoff_loads();
        let south: Vec<f64> = north.iter().map(|x| 3.0 * (x - 1000.0) + 40_000.0).collect();
        let mut rows = series(Region::North, &north);
        rows.extend(series(Region::South, &south));

        for cutoff in [2.5, 2.0] {
            let thresholds = Thresholds {
                anomaly_label_zscore: cutoff,
                ..Thresholds::default()
            };
            let features = compute_features(rows.clone(), &thresholds);
            for (region, loads) in [(Region::North, &north), (Region::South, &south)] {
                let flags: Vec<bool> = features
                    .iter()
                    .filter(|f| f.base.region == region)
                    .map(|f| f.is_anomaly)
                    .collect();
                assert_eq!(flags, expected_flags(loads, cutoff), "{region:?} at {cutoff}");
            }
        }

        let features = compute_features(rows, &Thresholds::default());
        let flagged: Vec<(Region, f64)> = features
            .iter()
            .filter(|f| f.is_anomaly)
            .map(|f| (f.base.region, f.base.load_mw))
            .collect();
        assert_eq!(flagged.len(), 4);
        assert!(flagged.contains(&(Region::North, 1039.5)));
        assert!(flagged.contains(&(Region::North, 960.5)));
        assert!(flagged.contains(&(Region::South, 40_118.5)));
        assert!(flagged.contains(&(Region::South, 39_881.5)));
    }

    #[test]
    fn short_series_has_moving_averages_everywhere() {
        let features = compute_features(series(Region::South, &[10.0, 20.0, 30.0]), &Thresholds::default());
        assert_eq!(features[0].load_ma_7d, 10.0);
        assert_eq!(features[1].load_ma_7d, 15.0);
        assert_eq!(features[2].load_ma_30d, 20.0);
        assert_eq!(features[2].temp_ma_7d, 21.0);
    }

    #[test]
    fn lags_interactions_and_calendar() {
        let loads: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let features = compute_features(series(Region::North, &loads), &Thresholds::default());

        assert_eq!(features[0].load_lag_1d, None);
        assert_eq!(features[1].load_lag_1d, Some(100.0));
        assert_eq!(features[6].load_lag_7d, None);
        assert_eq!(features[7].load_lag_7d, Some(100.0));
        assert_eq!(features[7].temp_lag_7d, Some(20.0));

        // 2024-01-01 is a Monday
        assert_eq!(features[0].day_of_week, 0);
        assert_eq!(features[6].day_of_week, 6);
        assert_eq!(features[0].month, 1);
        assert_eq!(features[0].year, 2024);
        assert_eq!(features[0].season, Season::Summer);
        assert_eq!(features[2].load_x_temp, 102.0 * 22.0);
        assert_eq!(features[2].temp_x_dayofweek, 22.0 * 2.0);
    }

    #[test]
    fn load_mom_looks_back_thirty_rows() {
        let mut loads = vec![100.0; 31];
        loads[30] = 110.0;
        loads.extend([0.0; 5]);
        loads.push(50.0);
        let features = compute_features(series(Region::South, &loads), &Thresholds::default());

        assert!(features[..30].iter().all(|f| f.load_mom.is_none()));
        assert!((features[30].load_mom.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(pct_change(&[0.0, 5.0], 1), vec![None, None]);
    }

    #[test]
    fn recomputation_is_identical() {
        let loads: Vec<f64> = (0..45).map(|i| 1000.0 + (i % 9) as f64 * 13.0).collect();
        let rows = series(Region::SoutheastMidwest, &loads);
        let first = compute_features(rows.clone(), &Thresholds::default());
        let bases: Vec<MergedRecord> = first.iter().map(|f| f.base).collect();
        let second = compute_features(bases, &Thresholds::default());
        assert_eq!(first, second);
    }
}
