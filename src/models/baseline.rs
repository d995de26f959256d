//! Baseline forecasting models: naive, seasonal naive, and drift.
//!
//! These are deliberately simple references the model search must beat.

use crate::core::{DailySeries, Forecast};
use crate::error::{Result, TempcastError};
use crate::models::Forecaster;
use crate::utils::stats::normal_quantile;

/// Standard deviation of the finite residuals.
fn residual_sigma(residuals: &[f64]) -> f64 {
    let finite: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
    if finite.len() < 2 {
        return 0.0;
    }
    let mse = finite.iter().map(|r| r * r).sum::<f64>() / finite.len() as f64;
    mse.sqrt()
}

fn intervals_from_scale(
    point: &[f64],
    level: f64,
    step_sd: impl Fn(usize) -> f64,
) -> Result<Forecast> {
    let z = normal_quantile((1.0 + level) / 2.0);
    let mut lower = Vec::with_capacity(point.len());
    let mut upper = Vec::with_capacity(point.len());
    for (h, &p) in point.iter().enumerate() {
        let sd = step_sd(h + 1);
        lower.push(p - z * sd);
        upper.push(p + z * sd);
    }
    Forecast::with_intervals(point.to_vec(), lower, upper)
}

/// Naive forecast: repeat the last observation.
#[derive(Debug, Clone, Default)]
pub struct Naive {
    last: Option<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma: f64,
}

impl Naive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for Naive {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        let y = series.values();
        if y.len() < 2 {
            return Err(TempcastError::InsufficientData { needed: 2, got: y.len() });
        }

        let mut fitted = vec![f64::NAN; y.len()];
        let mut residuals = vec![f64::NAN; y.len()];
        for t in 1..y.len() {
            fitted[t] = y[t - 1];
            residuals[t] = y[t] - fitted[t];
        }

        self.last = y.last().copied();
        self.sigma = residual_sigma(&residuals);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let last = self.last.ok_or(TempcastError::FitRequired)?;
        Ok(Forecast::from_point(vec![last; horizon]))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.predict(horizon)?;
        let sigma = self.sigma;
        // Random-walk forecast variance grows linearly with the horizon.
        intervals_from_scale(point.point(), level, |h| sigma * (h as f64).sqrt())
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "Naive"
    }
}

/// Seasonal naive forecast: repeat the observation from one season back.
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    period: usize,
    history: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma: f64,
}

impl SeasonalNaive {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            history: None,
            fitted: None,
            residuals: None,
            sigma: 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Forecaster for SeasonalNaive {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        if self.period < 2 {
            return Err(TempcastError::InvalidParameter(
                "seasonal period must be at least 2".to_string(),
            ));
        }
        let y = series.values();
        if y.len() <= self.period {
            return Err(TempcastError::InsufficientData {
                needed: self.period + 1,
                got: y.len(),
            });
        }

        let mut fitted = vec![f64::NAN; y.len()];
        let mut residuals = vec![f64::NAN; y.len()];
        for t in self.period..y.len() {
            fitted[t] = y[t - self.period];
            residuals[t] = y[t] - fitted[t];
        }

        self.history = Some(y[y.len() - self.period..].to_vec());
        self.sigma = residual_sigma(&residuals);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let last_season = self.history.as_ref().ok_or(TempcastError::FitRequired)?;
        let point = (0..horizon)
            .map(|h| last_season[h % self.period])
            .collect();
        Ok(Forecast::from_point(point))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.predict(horizon)?;
        let sigma = self.sigma;
        let period = self.period;
        // Variance grows with the number of completed seasonal cycles.
        intervals_from_scale(point.point(), level, |h| {
            let cycles = ((h - 1) / period + 1) as f64;
            sigma * cycles.sqrt()
        })
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "SeasonalNaive"
    }
}

/// Random walk with drift: extrapolate the average historical change.
#[derive(Debug, Clone, Default)]
pub struct Drift {
    last: Option<f64>,
    slope: f64,
    n: usize,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma: f64,
}

impl Drift {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }
}

impl Forecaster for Drift {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        let y = series.values();
        if y.len() < 3 {
            return Err(TempcastError::InsufficientData { needed: 3, got: y.len() });
        }
        let n = y.len();
        let slope = (y[n - 1] - y[0]) / (n - 1) as f64;

        let mut fitted = vec![f64::NAN; n];
        let mut residuals = vec![f64::NAN; n];
        for t in 1..n {
            fitted[t] = y[t - 1] + slope;
            residuals[t] = y[t] - fitted[t];
        }

        self.last = Some(y[n - 1]);
        self.slope = slope;
        self.n = n;
        self.sigma = residual_sigma(&residuals);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let last = self.last.ok_or(TempcastError::FitRequired)?;
        let point = (1..=horizon)
            .map(|h| last + self.slope * h as f64)
            .collect();
        Ok(Forecast::from_point(point))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.predict(horizon)?;
        let sigma = self.sigma;
        let n = self.n as f64;
        intervals_from_scale(point.point(), level, |h| {
            let h = h as f64;
            sigma * (h * (1.0 + h / (n - 1.0))).sqrt()
        })
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "Drift"
    }
}
