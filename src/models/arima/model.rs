//! ARIMA(p, d, q) fit by conditional least squares.

use crate::core::{DailySeries, Forecast};
use crate::error::{Result, TempcastError};
use crate::models::arima::diff::{difference, integrate};
use crate::models::Forecaster;
use crate::utils::optim::{nelder_mead, SimplexOptions};
use crate::utils::stats::normal_quantile;

/// ARIMA order (p, d, q).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    /// Autoregressive order.
    pub p: usize,
    /// Differencing order.
    pub d: usize,
    /// Moving-average order.
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Estimated parameters: AR + MA coefficients plus the intercept.
    pub fn param_count(&self) -> usize {
        self.p + self.q + 1
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA forecasting model estimated by minimizing the conditional sum of
/// squares with a simplex search.
#[derive(Debug, Clone)]
pub struct Arima {
    order: ArimaOrder,
    name: String,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    original: Option<Vec<f64>>,
    diffed: Option<Vec<f64>>,
    /// Residuals on the differenced scale, the MA error history.
    diff_residuals: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: Option<f64>,
    aic: Option<f64>,
    aicc: Option<f64>,
    bic: Option<f64>,
}

impl Arima {
    /// Create an unfitted ARIMA(p, d, q).
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        let order = ArimaOrder::new(p, d, q);
        Self {
            name: order.to_string(),
            order,
            ar: Vec::new(),
            ma: Vec::new(),
            mean: 0.0,
            original: None,
            diffed: None,
            diff_residuals: None,
            fitted: None,
            residuals: None,
            sigma2: None,
            aic: None,
            aicc: None,
            bic: None,
        }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Mean of the differenced series (the model intercept).
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    /// Small-sample corrected AIC, the selection criterion used by the
    /// automatic order search.
    pub fn aicc(&self) -> Option<f64> {
        self.aicc
    }

    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    /// Conditional sum of squares for a candidate parameter vector. The
    /// first `max(p, q)` observations seed the recursion and contribute no
    /// error terms.
    fn css(diffed: &[f64], ar: &[f64], ma: &[f64], mean: f64) -> f64 {
        let p = ar.len();
        let q = ma.len();
        let warmup = p.max(q);
        if diffed.len() <= warmup {
            return f64::MAX;
        }

        let mut errors = vec![0.0; diffed.len()];
        let mut total = 0.0;
        for t in warmup..diffed.len() {
            let mut pred = mean;
            for (i, &phi) in ar.iter().enumerate() {
                pred += phi * (diffed[t - 1 - i] - mean);
            }
            for (i, &theta) in ma.iter().enumerate() {
                pred += theta * errors[t - 1 - i];
            }
            let e = diffed[t] - pred;
            errors[t] = e;
            total += e * e;
        }
        total
    }

    fn estimate(&mut self, diffed: &[f64]) {
        let p = self.order.p;
        let q = self.order.q;
        let mean = diffed.iter().sum::<f64>() / diffed.len() as f64;

        if p == 0 && q == 0 {
            self.mean = mean;
            self.ar = Vec::new();
            self.ma = Vec::new();
            return;
        }

        let mut initial = vec![0.0; p + q + 1];
        initial[0] = mean;
        for i in 0..p {
            initial[1 + i] = 0.1 / (i + 1) as f64;
        }
        for i in 0..q {
            initial[1 + p + i] = 0.1 / (i + 1) as f64;
        }

        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
        bounds.extend(std::iter::repeat((-0.99, 0.99)).take(p + q));

        let outcome = nelder_mead(
            |params| {
                Self::css(diffed, &params[1..1 + p], &params[1 + p..], params[0])
            },
            &initial,
            Some(&bounds),
            SimplexOptions {
                max_iterations: 1000,
                ..Default::default()
            },
        );

        self.mean = outcome.point[0];
        self.ar = outcome.point[1..1 + p].to_vec();
        self.ma = outcome.point[1 + p..].to_vec();
    }

    fn finalize(&mut self, y: &[f64], diffed: &[f64]) {
        let p = self.order.p;
        let q = self.order.q;
        let d = self.order.d;
        let warmup = p.max(q);

        let mut diff_residuals = vec![0.0; diffed.len()];
        for t in warmup..diffed.len() {
            let mut pred = self.mean;
            for (i, &phi) in self.ar.iter().enumerate() {
                pred += phi * (diffed[t - 1 - i] - self.mean);
            }
            for (i, &theta) in self.ma.iter().enumerate() {
                pred += theta * diff_residuals[t - 1 - i];
            }
            diff_residuals[t] = diffed[t] - pred;
        }

        let effective = &diff_residuals[warmup..];
        if !effective.is_empty() {
            let n = effective.len() as f64;
            let sigma2 = effective.iter().map(|r| r * r).sum::<f64>() / n;
            let k = self.order.param_count() as f64;
            let log_lik =
                -0.5 * n * (1.0 + sigma2.max(1e-300).ln() + (2.0 * std::f64::consts::PI).ln());

            let aic = -2.0 * log_lik + 2.0 * k;
            self.sigma2 = Some(sigma2);
            self.aic = Some(aic);
            self.aicc = if n - k - 1.0 > 0.0 {
                Some(aic + 2.0 * k * (k + 1.0) / (n - k - 1.0))
            } else {
                None
            };
            self.bic = Some(-2.0 * log_lik + k * n.ln());
        }

        // One-step-ahead residuals transfer to the original scale unchanged
        // (the differencing terms are observed values), shifted by `d` and
        // with the warmup left undefined.
        let mut fitted = vec![f64::NAN; y.len()];
        let mut residuals = vec![f64::NAN; y.len()];
        for t in (warmup + d)..y.len() {
            let r = diff_residuals[t - d];
            residuals[t] = r;
            fitted[t] = y[t] - r;
        }

        self.diff_residuals = Some(diff_residuals);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
    }
}

impl Forecaster for Arima {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        let y = series.values();
        let needed = self.order.d + self.order.p.max(self.order.q) + 2;
        if y.len() < needed {
            return Err(TempcastError::InsufficientData {
                needed,
                got: y.len(),
            });
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(TempcastError::InvalidParameter(
                "series contains missing values; clean before fitting".to_string(),
            ));
        }

        let diffed = difference(y, self.order.d);
        self.original = Some(y.to_vec());
        self.estimate(&diffed);
        self.finalize(y, &diffed);
        self.diffed = Some(diffed);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let original = self.original.as_ref().ok_or(TempcastError::FitRequired)?;
        let diffed = self.diffed.as_ref().ok_or(TempcastError::FitRequired)?;
        let residuals = self
            .diff_residuals
            .as_ref()
            .ok_or(TempcastError::FitRequired)?;

        if horizon == 0 {
            return Ok(Forecast::from_point(Vec::new()));
        }

        // Roll the recursion forward; future shocks are their expectation, 0.
        let mut history = diffed.clone();
        let mut errors = residuals.clone();
        for _ in 0..horizon {
            let t = history.len();
            let mut pred = self.mean;
            for (i, &phi) in self.ar.iter().enumerate() {
                if t > i {
                    pred += phi * (history[t - 1 - i] - self.mean);
                }
            }
            for (i, &theta) in self.ma.iter().enumerate() {
                if t > i {
                    pred += theta * errors[t - 1 - i];
                }
            }
            history.push(pred);
            errors.push(0.0);
        }

        let forecast_diff = &history[diffed.len()..];
        let point = if self.order.d > 0 {
            integrate(forecast_diff, original, self.order.d)
        } else {
            forecast_diff.to_vec()
        };
        Ok(Forecast::from_point(point))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        if horizon == 0 {
            return Ok(forecast);
        }
        let sigma2 = self.sigma2.unwrap_or(0.0);
        let z = normal_quantile((1.0 + level) / 2.0);

        // Forecast variance approximated as growing linearly with horizon;
        // exact psi-weight accumulation is not worth it at this scale.
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (h, &p) in forecast.point().iter().enumerate() {
            let sd = (sigma2 * (h + 1) as f64).sqrt();
            lower.push(p - z * sd);
            upper.push(p + z * sd);
        }
        Forecast::with_intervals(forecast.point().to_vec(), lower, upper)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn param_count(&self) -> usize {
        self.order.param_count()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
