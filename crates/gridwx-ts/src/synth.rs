//! Demonstration years derived from a real base table.
//!
//! Dates move to the target year and each row gets seeded multiplicative or
//! additive noise. The derived columns are recomputed afterwards, so the
//! output is a regular feature table.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use gridwx_core::{FeatureRow, MergedRecord, Thresholds};

use crate::features::compute_features;

/// Move `date` to `year`; 29 February becomes 28 February.
pub fn shift_to_year(date: NaiveDate, year: i32) -> Option<NaiveDate> {
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
}

/// Perturb `base` into `target_year`. The RNG is seeded from the year, so the
/// same base and year always give the same rows.
pub fn synthesize_year(base: &[MergedRecord], target_year: i32) -> Vec<MergedRecord> {
    let mut rng = StdRng::seed_from_u64(target_year as u64);
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(base.len());

    for record in base {
        let load_factor: f64 = rng.gen_range(0.95..1.05);
        let temp_offset: f64 = rng.gen_range(-2.0..2.0);
        let radiation_factor: f64 = rng.gen_range(0.9..1.1);
        let precip_factor: f64 = rng.gen_range(0.8..1.2);

        let Some(date) = shift_to_year(record.date, target_year) else {
            continue;
        };
        // A shifted leap day can land on an existing 28 February.
        if !seen.insert((record.region, date)) {
            continue;
        }
        rows.push(MergedRecord {
            date,
            region: record.region,
            load_mw: record.load_mw * load_factor,
            temp_mean: record.temp_mean + temp_offset,
            temp_min: record.temp_min + temp_offset,
            temp_max: record.temp_max + temp_offset,
            radiation_mean: record.radiation_mean * radiation_factor,
            precipitation_total: (record.precipitation_total * precip_factor).max(0.0),
        });
    }
    rows
}

pub fn synthesize_features(
    base: &[MergedRecord],
    target_year: i32,
    thresholds: &Thresholds,
) -> Vec<FeatureRow> {
    let rows = synthesize_year(base, target_year);
    info!(
        target_year,
        base_rows = base.len(),
        rows = rows.len(),
        "synthesized year"
    );
    compute_features(rows, thresholds)
}
