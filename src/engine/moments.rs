//! Dispersion statistics over a balance-change series.
//!
//! Degenerate inputs never fail: empty or constant series produce `0.0`.

/// Arithmetic mean, or `None` for an empty series.
pub fn mean(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some(series.iter().sum::<f64>() / series.len() as f64)
}

/// Population variance `Σ(x−mean)² / n`.
pub fn variance(series: &[f64]) -> f64 {
    let Some(mean) = mean(series) else {
        return 0.0;
    };
    series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / series.len() as f64
}

pub fn standard_deviation(series: &[f64]) -> f64 {
    variance(series).sqrt()
}

/// Third standardized moment `Σ(x−mean)³ / ((n−1)·sd³)`.
///
/// `sd` is the population standard deviation while the normalizer uses
/// `n−1`; this mix is kept for compatibility with previously published
/// figures.
pub fn skew(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }
    let Some(mean) = mean(series) else {
        return 0.0;
    };
    let sd = standard_deviation(series);
    if sd == 0.0 {
        return 0.0;
    }
    let cubed: f64 = series.iter().map(|x| (x - mean).powi(3)).sum();
    cubed / ((n - 1) as f64 * sd.powi(3))
}

/// The moments of one series, computed together for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub standard_deviation: f64,
    pub skew: f64,
}

impl Moments {
    pub fn from_series(series: &[f64]) -> Self {
        Self {
            count: series.len(),
            mean: mean(series).unwrap_or(0.0),
            variance: variance(series),
            standard_deviation: standard_deviation(series),
            skew: skew(series),
        }
    }
}
