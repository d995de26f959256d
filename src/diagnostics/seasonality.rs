//! Seasonality diagnostics: period detection and the monthly profile.

use crate::core::DailySeries;
use crate::error::Result;
use crate::features::acf;
use crate::utils::stats::{mean, std_dev};
use chrono::Datelike;

/// Configuration for ACF-based period detection.
#[derive(Debug, Clone)]
pub struct SeasonalityConfig {
    /// Smallest period considered.
    pub min_period: usize,
    /// Largest period considered.
    pub max_period: usize,
    /// Minimum ACF value for a peak to count as a candidate.
    pub threshold: f64,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        // Daily data: allow anything from a week up to a year.
        Self {
            min_period: 7,
            max_period: 366,
            threshold: 0.3,
        }
    }
}

/// Result of seasonality detection.
#[derive(Debug, Clone)]
pub struct SeasonalityResult {
    /// Whether a seasonal period was found.
    pub detected: bool,
    /// The dominant period, if detected.
    pub period: Option<usize>,
    /// ACF value at the dominant period, clamped to [0, 1].
    pub strength: f64,
    /// All candidate periods with their ACF peaks, strongest first.
    pub candidates: Vec<(usize, f64)>,
}

impl SeasonalityResult {
    /// Strength at or above 0.7.
    pub fn is_strong(&self) -> bool {
        self.strength >= 0.7
    }

    /// Strength at or above 0.4.
    pub fn is_moderate(&self) -> bool {
        self.strength >= 0.4
    }
}

/// Detect the dominant seasonal period from local maxima of the sample ACF.
pub fn detect_seasonality(series: &[f64], config: &SeasonalityConfig) -> Result<SeasonalityResult> {
    let none = SeasonalityResult {
        detected: false,
        period: None,
        strength: 0.0,
        candidates: Vec::new(),
    };

    let n = series.len();
    if n < config.min_period * 2 + 2 {
        return Ok(none);
    }

    let max_lag = config.max_period.min(n / 2);
    if max_lag <= config.min_period {
        return Ok(none);
    }

    let rho = acf(series, max_lag)?;

    let mut candidates: Vec<(usize, f64)> = Vec::new();
    for lag in config.min_period.max(2)..max_lag {
        let here = rho[lag];
        if here > rho[lag - 1] && here > rho[lag + 1] && here > config.threshold {
            candidates.push((lag, here));
        }
    }
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(match candidates.first().copied() {
        Some((period, peak)) => SeasonalityResult {
            detected: true,
            period: Some(period),
            strength: peak.clamp(0.0, 1.0),
            candidates,
        },
        None => none,
    })
}

/// Statistics for one calendar month across all years of the series.
#[derive(Debug, Clone, Copy)]
pub struct MonthStats {
    /// Calendar month, 1..=12.
    pub month: u32,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Month-of-year seasonal profile of a daily series.
#[derive(Debug, Clone)]
pub struct MonthlyProfile {
    months: Vec<MonthStats>,
}

impl MonthlyProfile {
    /// Stats for months that have at least one observation, ordered by month.
    pub fn months(&self) -> &[MonthStats] {
        &self.months
    }

    /// Stats for a specific calendar month, if observed.
    pub fn month(&self, month: u32) -> Option<&MonthStats> {
        self.months.iter().find(|m| m.month == month)
    }

    /// Difference between the warmest and coldest monthly mean, a crude
    /// measure of annual seasonal amplitude.
    pub fn amplitude(&self) -> f64 {
        let means: Vec<f64> = self.months.iter().map(|m| m.mean).collect();
        if means.is_empty() {
            return 0.0;
        }
        let hi = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lo = means.iter().copied().fold(f64::INFINITY, f64::min);
        hi - lo
    }
}

/// Group the series by calendar month and summarize each group.
pub fn monthly_profile(series: &DailySeries) -> MonthlyProfile {
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); 12];
    for (date, &value) in series.dates().iter().zip(series.values()) {
        if value.is_finite() {
            buckets[(date.month() - 1) as usize].push(value);
        }
    }

    let months = buckets
        .iter()
        .enumerate()
        .filter(|(_, values)| !values.is_empty())
        .map(|(i, values)| MonthStats {
            month: i as u32 + 1,
            count: values.len(),
            mean: mean(values),
            std_dev: if values.len() > 1 { std_dev(values) } else { 0.0 },
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect();

    MonthlyProfile { months }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn sinusoid(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin())
            .collect()
    }

    #[test]
    fn detects_weekly_cycle() {
        let series = sinusoid(280, 7);
        let config = SeasonalityConfig {
            min_period: 2,
            max_period: 30,
            threshold: 0.3,
        };
        let result = detect_seasonality(&series, &config).unwrap();
        assert!(result.detected);
        assert_eq!(result.period, Some(7));
        assert!(result.is_strong());
    }

    #[test]
    fn no_seasonality_in_trend() {
        let series: Vec<f64> = (0..200).map(|i| i as f64 * 0.1).collect();
        let result = detect_seasonality(&series, &SeasonalityConfig::default()).unwrap();
        assert!(!result.detected);
        assert!(result.period.is_none());
    }

    #[test]
    fn short_series_yields_no_detection() {
        let series = sinusoid(10, 7);
        let result = detect_seasonality(&series, &SeasonalityConfig::default()).unwrap();
        assert!(!result.detected);
    }

    #[test]
    fn monthly_profile_separates_summer_and_winter() {
        // Two years of daily data with an annual cosine: warm in January
        // (southern hemisphere), cold in July.
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let n = 730;
        let dates: Vec<NaiveDate> = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let values: Vec<f64> = (0..n)
            .map(|i| 11.0 + 6.0 * (2.0 * std::f64::consts::PI * i as f64 / 365.25).cos())
            .collect();
        let series = DailySeries::new(dates, values, "temp").unwrap();

        let profile = monthly_profile(&series);
        assert_eq!(profile.months().len(), 12);

        let january = profile.month(1).unwrap();
        let july = profile.month(7).unwrap();
        assert!(january.mean > july.mean + 8.0);
        assert!(profile.amplitude() > 10.0);
        assert!(january.min <= january.mean && january.mean <= january.max);
    }

    #[test]
    fn monthly_profile_skips_missing_values() {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..3).map(|i| start + Duration::days(i)).collect();
        let series = DailySeries::new(dates, vec![1.0, f64::NAN, 3.0], "temp").unwrap();

        let profile = monthly_profile(&series);
        let january = profile.month(1).unwrap();
        assert_eq!(january.count, 2);
        assert_relative_eq!(january.mean, 2.0, epsilon = 1e-12);
    }
}
