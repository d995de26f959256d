//! Anomaly detection over raw series values.

use crate::utils::stats::{mean, median, quantile, std_dev};

/// Scoring rule for anomaly detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyMethod {
    /// Tukey fences on the interquartile range.
    Iqr,
    /// Standard z-score against mean and standard deviation.
    ZScore,
    /// Modified z-score using the median absolute deviation.
    ModifiedZScore,
}

/// Configuration for anomaly detection.
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    pub method: AnomalyMethod,
    /// IQR fence multiplier, or the z-score cutoff for the other methods.
    pub threshold: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self::iqr(1.5)
    }
}

impl AnomalyConfig {
    /// Tukey fences with the given IQR multiplier (1.5 is conventional).
    pub fn iqr(multiplier: f64) -> Self {
        Self {
            method: AnomalyMethod::Iqr,
            threshold: multiplier,
        }
    }

    /// Z-score cutoff (3.0 is conventional).
    pub fn z_score(cutoff: f64) -> Self {
        Self {
            method: AnomalyMethod::ZScore,
            threshold: cutoff,
        }
    }

    /// Modified z-score cutoff (3.5 is conventional).
    pub fn modified_z_score(cutoff: f64) -> Self {
        Self {
            method: AnomalyMethod::ModifiedZScore,
            threshold: cutoff,
        }
    }
}

/// Result of an anomaly scan.
#[derive(Debug, Clone)]
pub struct AnomalyReport {
    /// Indices of flagged observations.
    pub indices: Vec<usize>,
    /// Per-observation anomaly scores (higher is more anomalous).
    pub scores: Vec<f64>,
    /// Cutoff the scores were compared against.
    pub cutoff: f64,
    /// Method that produced the report.
    pub method: AnomalyMethod,
    /// Normal range implied by the method, where meaningful.
    pub bounds: Option<(f64, f64)>,
}

impl AnomalyReport {
    /// Number of anomalies found.
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    /// Fraction of observations flagged, in percent.
    pub fn share(&self) -> f64 {
        if self.scores.is_empty() {
            0.0
        } else {
            100.0 * self.indices.len() as f64 / self.scores.len() as f64
        }
    }

    /// Whether the observation at `index` was flagged.
    pub fn is_anomaly(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

/// Scan a series for anomalous values.
pub fn detect_anomalies(series: &[f64], config: &AnomalyConfig) -> AnomalyReport {
    let (scores, cutoff, bounds) = match config.method {
        AnomalyMethod::Iqr => iqr_scores(series, config.threshold),
        AnomalyMethod::ZScore => (z_scores(series), config.threshold, None),
        AnomalyMethod::ModifiedZScore => (mad_scores(series), config.threshold, None),
    };

    let indices: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s > cutoff)
        .map(|(i, _)| i)
        .collect();

    AnomalyReport {
        indices,
        scores,
        cutoff,
        method: config.method,
        bounds,
    }
}

/// IQR scoring: distance outside the Tukey fences, in IQR units.
/// Anything with a positive score is outside the fences.
fn iqr_scores(series: &[f64], multiplier: f64) -> (Vec<f64>, f64, Option<(f64, f64)>) {
    if series.len() < 4 {
        return (vec![0.0; series.len()], 0.0, None);
    }

    let q1 = quantile(series, 0.25);
    let q3 = quantile(series, 0.75);
    let iqr = (q3 - q1).max(1e-10);
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    let scores = series
        .iter()
        .map(|&x| {
            if x < lower {
                (lower - x) / iqr
            } else if x > upper {
                (x - upper) / iqr
            } else {
                0.0
            }
        })
        .collect();

    (scores, 0.0, Some((lower, upper)))
}

fn z_scores(series: &[f64]) -> Vec<f64> {
    let m = mean(series);
    let sd = std_dev(series);
    if !sd.is_finite() || sd < 1e-10 {
        return vec![0.0; series.len()];
    }
    series.iter().map(|&x| ((x - m) / sd).abs()).collect()
}

/// Modified z-score: 0.6745 * |x - median| / MAD.
fn mad_scores(series: &[f64]) -> Vec<f64> {
    let med = median(series);
    let deviations: Vec<f64> = series.iter().map(|&x| (x - med).abs()).collect();
    let mad = median(&deviations);
    if !mad.is_finite() || mad < 1e-10 {
        return vec![0.0; series.len()];
    }
    series
        .iter()
        .map(|&x| 0.6745 * (x - med).abs() / mad)
        .collect()
}
