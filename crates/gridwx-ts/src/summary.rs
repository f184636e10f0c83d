//! Descriptive statistics over a feature table.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use gridwx_core::{FeatureRow, Region};

use crate::baseline::{mean, sample_std};

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub region: Region,
    pub rows: usize,
    pub load_mean: f64,
    pub load_std: Option<f64>,
    pub load_min: f64,
    pub load_max: f64,
    pub temp_mean: f64,
    pub anomalies: usize,
    pub anomaly_rate_pct: f64,
    /// Pearson correlation of daily load against mean temperature
    pub load_temp_corr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub regions: Vec<RegionSummary>,
    /// Highest `load_zscore` first
    pub top_zscores: Vec<FeatureRow>,
}

pub fn summarize(rows: &[FeatureRow], top_n: usize) -> TableSummary {
    let mut by_region: BTreeMap<Region, Vec<&FeatureRow>> = BTreeMap::new();
    for row in rows {
        by_region.entry(row.base.region).or_default().push(row);
    }

    let regions = by_region
        .into_iter()
        .map(|(region, rows)| {
            let load: Vec<f64> = rows.iter().map(|r| r.base.load_mw).collect();
            let temp: Vec<f64> = rows.iter().map(|r| r.base.temp_mean).collect();
            let anomalies = rows.iter().filter(|r| r.is_anomaly).count();
            RegionSummary {
                region,
                rows: rows.len(),
                load_mean: mean(&load).unwrap_or(0.0),
                load_std: sample_std(&load),
                load_min: load.iter().copied().fold(f64::INFINITY, f64::min),
                load_max: load.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                temp_mean: mean(&temp).unwrap_or(0.0),
                anomalies,
                anomaly_rate_pct: 100.0 * anomalies as f64 / rows.len() as f64,
                load_temp_corr: pearson(&load, &temp),
            }
        })
        .collect();

    let mut ranked: Vec<&FeatureRow> = rows.iter().collect();
    ranked.sort_by(|a, b| b.load_zscore.total_cmp(&a.load_zscore));

    TableSummary {
        rows: rows.len(),
        first_date: rows.iter().map(|r| r.base.date).min(),
        last_date: rows.iter().map(|r| r.base.date).max(),
        regions,
        top_zscores: ranked.into_iter().take(top_n).cloned().collect(),
    }
}

/// `None` when either side has no spread or the lengths differ.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    (denom > 0.0).then(|| sxy / denom)
}
