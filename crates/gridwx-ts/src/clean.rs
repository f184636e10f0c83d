//! Load cleaning: completeness, de-duplication and global outlier rejection.

use std::collections::HashSet;

use tracing::info;

use gridwx_core::{LoadRecord, RawLoadRow, Thresholds};

use crate::baseline::zscores;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub input_rows: usize,
    /// Missing timestamp, load or region
    pub incomplete: usize,
    pub negative: usize,
    pub duplicates: usize,
    pub outliers: usize,
    pub output_rows: usize,
}

impl CleanReport {
    pub fn removed(&self) -> usize {
        self.input_rows - self.output_rows
    }

    pub fn removed_pct(&self) -> f64 {
        if self.input_rows == 0 {
            0.0
        } else {
            100.0 * self.removed() as f64 / self.input_rows as f64
        }
    }
}

/// Turn raw load rows into validated records.
///
/// Drops incomplete and negative rows, keeps the first row for each
/// `(timestamp, region)`, then drops rows whose global Z-score exceeds
/// `outlier_rejection_zscore`. Input order is preserved.
///
/// The Z-score divides by the sample standard deviation (n - 1), not the
/// population one.
pub fn clean_load(rows: Vec<RawLoadRow>, thresholds: &Thresholds) -> (Vec<LoadRecord>, CleanReport) {
    let mut report = CleanReport {
        input_rows: rows.len(),
        ..CleanReport::default()
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(timestamp), Some(region), Some(load_mw)) = (row.timestamp, row.region, row.load_mw)
        else {
            report.incomplete += 1;
            continue;
        };
        if !load_mw.is_finite() {
            report.incomplete += 1;
            continue;
        }
        if load_mw < 0.0 {
            report.negative += 1;
            continue;
        }
        if !seen.insert((timestamp, region)) {
            report.duplicates += 1;
            continue;
        }
        records.push(LoadRecord {
            timestamp,
            region,
            load_mw,
        });
    }

    let loads: Vec<f64> = records.iter().map(|r| r.load_mw).collect();
    let scores = zscores(&loads);
    let before = records.len();
    let cleaned: Vec<LoadRecord> = records
        .into_iter()
        .zip(scores)
        .filter(|(_, z)| z.abs() <= thresholds.outlier_rejection_zscore)
        .map(|(record, _)| record)
        .collect();
    report.outliers = before - cleaned.len();
    report.output_rows = cleaned.len();

    info!(
        input = report.input_rows,
        incomplete = report.incomplete,
        negative = report.negative,
        duplicates = report.duplicates,
        outliers = report.outliers,
        "cleaned load: removed {} rows ({:.2}%)",
        report.removed(),
        report.removed_pct()
    );
    (cleaned, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use gridwx_core::Region;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn row(day: u32, region: Option<Region>, load: Option<f64>) -> RawLoadRow {
        RawLoadRow {
            timestamp: Some(ts(day, 0)),
            subsystem: Some("N".into()),
            region,
            load_mw: load,
        }
    }

    #[test]
    fn drops_incomplete_negative_and_duplicates() {
        let rows = vec![
            row(1, Some(Region::North), Some(10.0)),
            row(1, Some(Region::North), Some(11.0)),
            row(1, Some(Region::South), Some(12.0)),
            row(2, None, Some(13.0)),
            row(3, Some(Region::North), None),
            row(4, Some(Region::North), Some(-1.0)),
            RawLoadRow {
                timestamp: None,
                ..row(5, Some(Region::North), Some(10.0))
            },
        ];
        let (cleaned, report) = clean_load(rows, &Thresholds::default());

        assert_eq!(report.input_rows, 7);
        assert_eq!(report.incomplete, 3);
        assert_eq!(report.negative, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.outliers, 0);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].load_mw, 10.0);
        assert_eq!(cleaned[1].region, Region::South);
    }

    #[test]
    fn rejects_global_outliers() {
        let mut rows: Vec<RawLoadRow> = (1..=20)
            .map(|d| row(d, Some(Region::Northeast), Some(100.0 + (d % 3) as f64)))
            .collect();
        rows.push(row(21, Some(Region::Northeast), Some(10_000.0)));

        let (cleaned, report) = clean_load(rows, &Thresholds::default());
        assert_eq!(report.outliers, 1);
        assert_eq!(cleaned.len(), 20);
        assert!(cleaned.iter().all(|r| r.load_mw < 1000.0));
        assert!((report.removed_pct() - 100.0 / 21.0).abs() < 1e-9);
    }

    #[test]
    fn keeps_moderate_spike_below_rejection_cutoff() {
        let loads = [100.0, 102.0, 98.0, 101.0, 99.0, 250.0, 100.0, 103.0, 97.0, 102.0];
        let rows = loads
            .iter()
            .enumerate()
            .map(|(i, v)| row(i as u32 + 1, Some(Region::South), Some(*v)))
            .collect();
        let (cleaned, report) = clean_load(rows, &Thresholds::default());
        assert_eq!(report.outliers, 0);
        assert_eq!(cleaned.len(), 10);
    }

    #[test]
    fn outlier_score_uses_sample_std() {
        // nine equal rows and one spike: population z = 3.0, sample z = 9 / sqrt(10)
        let mut rows: Vec<RawLoadRow> = (1..=9)
            .map(|d| row(d, Some(Region::North), Some(100.0)))
            .collect();
        rows.push(row(10, Some(Region::North), Some(200.0)));
        let thresholds = Thresholds {
            outlier_rejection_zscore: 2.9,
            ..Thresholds::default()
        };

        let (cleaned, report) = clean_load(rows.clone(), &thresholds);
        assert_eq!(report.outliers, 0);
        assert_eq!(cleaned.len(), 10);

        let thresholds = Thresholds {
            outlier_rejection_zscore: 2.8,
            ..Thresholds::default()
        };
        let (cleaned, report) = clean_load(rows, &thresholds);
        assert_eq!(report.outliers, 1);
        assert!(cleaned.iter().all(|r| r.load_mw == 100.0));
    }

    #[test]
    fn constant_series_removes_nothing() {
        let rows = (1..=5)
            .map(|d| row(d, Some(Region::North), Some(50.0)))
            .collect();
        let (cleaned, report) = clean_load(rows, &Thresholds::default());
        assert_eq!(report.outliers, 0);
        assert_eq!(cleaned.len(), 5);
    }
}
