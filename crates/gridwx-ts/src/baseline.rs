//! Z-score statistics shared by the load cleaner and the anomaly flag.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// `(x - mean) / std` over the whole slice.
///
/// A constant series, or one with fewer than two values, scores `0.0`
/// everywhere.
pub fn zscores(values: &[f64]) -> Vec<f64> {
    let (Some(mu), Some(sigma)) = (mean(values), sample_std(values)) else {
        return vec![0.0; values.len()];
    };
    if is_degenerate(sigma, mu) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mu) / sigma).collect()
}

pub fn is_anomaly(zscore: f64, anomaly_label_zscore: f64) -> bool {
    zscore.abs() > anomaly_label_zscore
}

// Rounding leaves a tiny non-zero spread on constant series.
fn is_degenerate(sigma: f64, mu: f64) -> bool {
    !sigma.is_finite() || sigma <= 1e-12 * mu.abs().max(1.0)
}
