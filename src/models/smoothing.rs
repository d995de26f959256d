//! Exponential smoothing models: simple (SES) and Holt's linear trend.

use crate::core::{DailySeries, Forecast};
use crate::error::{Result, TempcastError};
use crate::models::Forecaster;
use crate::utils::optim::{nelder_mead, SimplexOptions};
use crate::utils::stats::normal_quantile;

const PARAM_BOUNDS: (f64, f64) = (1e-4, 0.9999);

/// Simple exponential smoothing with an optionally optimized alpha.
#[derive(Debug, Clone)]
pub struct Ses {
    alpha: Option<f64>,
    fitted_alpha: f64,
    level: Option<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: f64,
}

impl Ses {
    /// Fixed smoothing parameter.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: Some(alpha),
            fitted_alpha: alpha,
            level: None,
            fitted: None,
            residuals: None,
            sigma2: 0.0,
        }
    }

    /// Optimize alpha by minimizing the in-sample sum of squared errors.
    pub fn auto() -> Self {
        Self {
            alpha: None,
            fitted_alpha: f64::NAN,
            level: None,
            fitted: None,
            residuals: None,
            sigma2: 0.0,
        }
    }

    /// The alpha actually used by the last fit.
    pub fn alpha(&self) -> f64 {
        self.fitted_alpha
    }

    /// One pass of the smoothing recursion; returns (fitted, level).
    fn smooth(y: &[f64], alpha: f64) -> (Vec<f64>, f64) {
        let mut fitted = vec![f64::NAN; y.len()];
        let mut level = y[0];
        for t in 1..y.len() {
            fitted[t] = level;
            level = alpha * y[t] + (1.0 - alpha) * level;
        }
        (fitted, level)
    }

    fn sse(y: &[f64], alpha: f64) -> f64 {
        let (fitted, _) = Self::smooth(y, alpha);
        y.iter()
            .zip(fitted.iter())
            .filter(|(_, f)| f.is_finite())
            .map(|(y, f)| (y - f).powi(2))
            .sum()
    }
}

impl Forecaster for Ses {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        let y = series.values();
        if y.len() < 3 {
            return Err(TempcastError::InsufficientData { needed: 3, got: y.len() });
        }

        let alpha = match self.alpha {
            Some(a) if (PARAM_BOUNDS.0..=PARAM_BOUNDS.1).contains(&a) => a,
            Some(a) => {
                return Err(TempcastError::InvalidParameter(format!(
                    "alpha {a} outside (0, 1)"
                )))
            }
            None => {
                let outcome = nelder_mead(
                    |p| Self::sse(y, p[0]),
                    &[0.3],
                    Some(&[PARAM_BOUNDS]),
                    SimplexOptions::default(),
                );
                outcome.point[0]
            }
        };

        let (fitted, level) = Self::smooth(y, alpha);
        let residuals: Vec<f64> = y
            .iter()
            .zip(fitted.iter())
            .map(|(y, f)| if f.is_finite() { y - f } else { f64::NAN })
            .collect();
        let finite: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
        self.sigma2 = finite.iter().map(|r| r * r).sum::<f64>() / finite.len().max(1) as f64;

        self.fitted_alpha = alpha;
        self.level = Some(level);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let level = self.level.ok_or(TempcastError::FitRequired)?;
        Ok(Forecast::from_point(vec![level; horizon]))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.predict(horizon)?;
        let z = normal_quantile((1.0 + level) / 2.0);
        let alpha = self.fitted_alpha;

        // Var(h) = sigma^2 * (1 + (h-1) * alpha^2) for SES.
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (h, &p) in point.point().iter().enumerate() {
            let var = self.sigma2 * (1.0 + h as f64 * alpha * alpha);
            let half = z * var.sqrt();
            lower.push(p - half);
            upper.push(p + half);
        }
        Forecast::with_intervals(point.point().to_vec(), lower, upper)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn param_count(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "SES"
    }
}

/// Holt's linear-trend exponential smoothing.
#[derive(Debug, Clone)]
pub struct Holt {
    params: Option<(f64, f64)>,
    fitted_params: (f64, f64),
    state: Option<(f64, f64)>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: f64,
}

impl Holt {
    /// Fixed smoothing parameters (alpha for level, beta for trend).
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self {
            params: Some((alpha, beta)),
            fitted_params: (alpha, beta),
            state: None,
            fitted: None,
            residuals: None,
            sigma2: 0.0,
        }
    }

    /// Optimize both parameters by minimizing in-sample SSE.
    pub fn auto() -> Self {
        Self {
            params: None,
            fitted_params: (f64::NAN, f64::NAN),
            state: None,
            fitted: None,
            residuals: None,
            sigma2: 0.0,
        }
    }

    /// (alpha, beta) actually used by the last fit.
    pub fn params(&self) -> (f64, f64) {
        self.fitted_params
    }

    /// Holt recursion; returns (fitted, final level, final trend).
    fn smooth(y: &[f64], alpha: f64, beta: f64) -> (Vec<f64>, f64, f64) {
        let mut fitted = vec![f64::NAN; y.len()];
        let mut level = y[0];
        let mut trend = y[1] - y[0];
        for t in 1..y.len() {
            fitted[t] = level + trend;
            let prev_level = level;
            level = alpha * y[t] + (1.0 - alpha) * (level + trend);
            trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        }
        (fitted, level, trend)
    }

    fn sse(y: &[f64], alpha: f64, beta: f64) -> f64 {
        let (fitted, _, _) = Self::smooth(y, alpha, beta);
        y.iter()
            .zip(fitted.iter())
            .filter(|(_, f)| f.is_finite())
            .map(|(y, f)| (y - f).powi(2))
            .sum()
    }
}

impl Forecaster for Holt {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        let y = series.values();
        if y.len() < 4 {
            return Err(TempcastError::InsufficientData { needed: 4, got: y.len() });
        }

        let (alpha, beta) = match self.params {
            Some((a, b)) => {
                for (label, v) in [("alpha", a), ("beta", b)] {
                    if !(PARAM_BOUNDS.0..=PARAM_BOUNDS.1).contains(&v) {
                        return Err(TempcastError::InvalidParameter(format!(
                            "{label} {v} outside (0, 1)"
                        )));
                    }
                }
                (a, b)
            }
            None => {
                let outcome = nelder_mead(
                    |p| Self::sse(y, p[0], p[1]),
                    &[0.3, 0.1],
                    Some(&[PARAM_BOUNDS, PARAM_BOUNDS]),
                    SimplexOptions::default(),
                );
                (outcome.point[0], outcome.point[1])
            }
        };

        let (fitted, level, trend) = Self::smooth(y, alpha, beta);
        let residuals: Vec<f64> = y
            .iter()
            .zip(fitted.iter())
            .map(|(y, f)| if f.is_finite() { y - f } else { f64::NAN })
            .collect();
        let finite: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
        self.sigma2 = finite.iter().map(|r| r * r).sum::<f64>() / finite.len().max(1) as f64;

        self.fitted_params = (alpha, beta);
        self.state = Some((level, trend));
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let (level, trend) = self.state.ok_or(TempcastError::FitRequired)?;
        let point = (1..=horizon)
            .map(|h| level + trend * h as f64)
            .collect();
        Ok(Forecast::from_point(point))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.predict(horizon)?;
        let z = normal_quantile((1.0 + level) / 2.0);
        let (alpha, beta) = self.fitted_params;

        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (idx, &p) in point.point().iter().enumerate() {
            // Var(h) = sigma^2 * (1 + sum_{j=1}^{h-1} (alpha + alpha*beta*j)^2)
            let mut factor = 1.0;
            for j in 1..=idx {
                factor += (alpha + alpha * beta * j as f64).powi(2);
            }
            let half = z * (self.sigma2 * factor).sqrt();
            lower.push(p - half);
            upper.push(p + half);
        }
        Forecast::with_intervals(point.point().to_vec(), lower, upper)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn param_count(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "Holt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn make_series(values: Vec<f64>) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        DailySeries::new(dates, values, "temp").unwrap()
    }

    #[test]
    fn ses_forecast_is_flat() {
        let values: Vec<f64> = (0..40).map(|i| 10.0 + (i as f64 * 0.5).sin()).collect();
        let mut model = Ses::new(0.3);
        model.fit(&make_series(values)).unwrap();

        let forecast = model.predict(4).unwrap();
        let first = forecast.point()[0];
        assert!(forecast.point().iter().all(|&p| p == first));
        assert!((first - 10.0).abs() < 2.0);
    }

    #[test]
    fn ses_auto_tracks_noisy_level_closely() {
        // A level shift: optimized alpha should adapt and produce smaller SSE
        // than a tiny fixed alpha.
        let mut values = vec![10.0; 30];
        values.extend(std::iter::repeat(20.0).take(30));
        let series = make_series(values.clone());

        let mut auto = Ses::auto();
        auto.fit(&series).unwrap();
        let auto_sse = Ses::sse(&values, auto.alpha());
        let stiff_sse = Ses::sse(&values, 0.01);

        assert!(auto.alpha() > 0.0 && auto.alpha() < 1.0);
        assert!(auto_sse < stiff_sse);
    }

    #[test]
    fn ses_rejects_out_of_range_alpha() {
        let mut model = Ses::new(1.5);
        let result = model.fit(&make_series(vec![1.0, 2.0, 3.0, 4.0]));
        assert!(matches!(result, Err(TempcastError::InvalidParameter(_))));
    }

    #[test]
    fn holt_follows_linear_trend() {
        let values: Vec<f64> = (0..50).map(|i| 5.0 + 1.5 * i as f64).collect();
        let mut model = Holt::auto();
        model.fit(&make_series(values)).unwrap();

        let forecast = model.predict(4).unwrap();
        // Next point of the exact line is 5 + 1.5*50 = 80.
        assert_relative_eq!(forecast.point()[0], 80.0, epsilon = 0.5);
        assert_relative_eq!(
            forecast.point()[3] - forecast.point()[2],
            1.5,
            epsilon = 0.1
        );
    }

    #[test]
    fn holt_intervals_contain_point() {
        let values: Vec<f64> = (0..60)
            .map(|i| 5.0 + 0.5 * i as f64 + (i as f64 * 0.9).sin())
            .collect();
        let mut model = Holt::new(0.4, 0.1);
        model.fit(&make_series(values)).unwrap();

        let forecast = model.predict_with_intervals(6, 0.95).unwrap();
        let lower = forecast.lower().unwrap();
        let upper = forecast.upper().unwrap();
        for h in 0..6 {
            assert!(lower[h] < forecast.point()[h]);
            assert!(upper[h] > forecast.point()[h]);
        }
        assert!(upper[5] - lower[5] > upper[0] - lower[0]);
    }

    #[test]
    fn smoothing_models_require_fit() {
        assert!(matches!(Ses::new(0.3).predict(2), Err(TempcastError::FitRequired)));
        assert!(matches!(Holt::auto().predict(2), Err(TempcastError::FitRequired)));
    }

    #[test]
    fn smoothing_models_need_enough_data() {
        let mut ses = Ses::new(0.3);
        assert!(matches!(
            ses.fit(&make_series(vec![1.0, 2.0])),
            Err(TempcastError::InsufficientData { .. })
        ));
        let mut holt = Holt::auto();
        assert!(matches!(
            holt.fit(&make_series(vec![1.0, 2.0, 3.0])),
            Err(TempcastError::InsufficientData { .. })
        ));
    }
}
