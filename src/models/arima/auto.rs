//! Automatic ARIMA order selection by corrected AIC.

use crate::core::{DailySeries, Forecast};
use crate::error::{Result, TempcastError};
use crate::models::arima::diff::suggest_differencing;
use crate::models::arima::model::{Arima, ArimaOrder};
use crate::models::Forecaster;
use tracing::debug;

/// Configuration for the order search.
#[derive(Debug, Clone)]
pub struct AutoArimaConfig {
    /// Maximum AR order considered.
    pub max_p: usize,
    /// Maximum MA order considered.
    pub max_q: usize,
    /// Cap on the differencing order suggested by the variance-ratio test.
    pub max_d: usize,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_q: 3,
            max_d: 2,
        }
    }
}

/// Automatic ARIMA: picks `d` with a variance-ratio test, then searches a
/// small (p, q) grid and keeps the order with the lowest AICc.
#[derive(Debug, Clone)]
pub struct AutoArima {
    config: AutoArimaConfig,
    selected: Option<Arima>,
    name: String,
    /// Every converged candidate order with its AICc, best first.
    scores: Vec<(ArimaOrder, f64)>,
}

impl AutoArima {
    pub fn new() -> Self {
        Self::with_config(AutoArimaConfig::default())
    }

    pub fn with_config(config: AutoArimaConfig) -> Self {
        Self {
            config,
            selected: None,
            name: "AutoARIMA".to_string(),
            scores: Vec::new(),
        }
    }

    /// Order of the selected model, if fitted.
    pub fn selected_order(&self) -> Option<ArimaOrder> {
        self.selected.as_ref().map(|m| m.order())
    }

    /// The selected model itself.
    pub fn selected_model(&self) -> Option<&Arima> {
        self.selected.as_ref()
    }

    /// All candidate orders and their AICc scores, best first.
    pub fn scores(&self) -> &[(ArimaOrder, f64)] {
        &self.scores
    }

    /// The (p, q) pairs searched for a given maximum order: a compact grid
    /// rather than the full cartesian product.
    fn candidate_pq(max_p: usize, max_q: usize) -> Vec<(usize, usize)> {
        let shortlist = [
            (0, 0),
            (1, 0),
            (0, 1),
            (1, 1),
            (2, 0),
            (0, 2),
            (2, 1),
            (1, 2),
            (2, 2),
            (3, 0),
            (0, 3),
            (3, 1),
            (1, 3),
        ];
        shortlist
            .into_iter()
            .filter(|&(p, q)| p <= max_p && q <= max_q)
            .collect()
    }
}

impl Default for AutoArima {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for AutoArima {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        let d = suggest_differencing(series.values()).min(self.config.max_d);

        let mut scored: Vec<(ArimaOrder, f64, Arima)> = Vec::new();
        for (p, q) in Self::candidate_pq(self.config.max_p, self.config.max_q) {
            let mut candidate = Arima::new(p, d, q);
            match candidate.fit(series) {
                Ok(()) => {
                    if let Some(aicc) = candidate.aicc() {
                        debug!(order = %candidate.order(), aicc, "arima candidate scored");
                        scored.push((candidate.order(), aicc, candidate));
                    }
                }
                Err(e) => {
                    debug!(p, d, q, error = %e, "arima candidate failed");
                }
            }
        }

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let best = scored
            .first()
            .map(|(_, _, model)| model.clone())
            .ok_or_else(|| {
                TempcastError::Computation("no ARIMA candidate converged".to_string())
            })?;

        self.name = format!("Auto{}", best.order());
        self.scores = scored.into_iter().map(|(order, aicc, _)| (order, aicc)).collect();
        self.selected = Some(best);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.selected
            .as_ref()
            .ok_or(TempcastError::FitRequired)?
            .predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.selected
            .as_ref()
            .ok_or(TempcastError::FitRequired)?
            .predict_with_intervals(horizon, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.fitted_values())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.residuals())
    }

    fn param_count(&self) -> usize {
        self.selected
            .as_ref()
            .map(|m| m.param_count())
            .unwrap_or(0)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_series(values: Vec<f64>) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        DailySeries::new(dates, values, "temp").unwrap()
    }

    fn pseudo_noise(i: usize) -> f64 {
        // splitmix64 finalizer, mapped to [-0.5, 0.5).
        let mut x = (i as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
        x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        x ^= x >> 31;
        (x >> 11) as f64 / (1u64 << 53) as f64 - 0.5
    }

    fn ar2_series(n: usize) -> Vec<f64> {
        let mut values = vec![0.0, 0.0];
        for i in 2..n {
            values.push(0.5 * values[i - 1] + 0.2 * values[i - 2] + pseudo_noise(i));
        }
        values
    }

    #[test]
    fn selects_some_order_and_predicts() {
        let mut model = AutoArima::new();
        model.fit(&make_series(ar2_series(200))).unwrap();

        let order = model.selected_order().unwrap();
        assert!(order.p <= 3 && order.q <= 3);
        assert!(!model.scores().is_empty());
        // Scores are sorted ascending.
        for pair in model.scores().windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }

        let forecast = model.predict(10).unwrap();
        assert_eq!(forecast.horizon(), 10);
        assert!(model.name().starts_with("AutoARIMA("));
    }

    #[test]
    fn differenced_for_trend() {
        let values: Vec<f64> = (0..120)
            .map(|i| 0.8 * i as f64 + (i as f64 * 0.3).sin())
            .collect();
        let mut model = AutoArima::new();
        model.fit(&make_series(values)).unwrap();
        assert!(model.selected_order().unwrap().d >= 1);
    }

    #[test]
    fn respects_order_caps() {
        let config = AutoArimaConfig {
            max_p: 1,
            max_q: 1,
            max_d: 0,
        };
        let mut model = AutoArima::with_config(config);
        model.fit(&make_series(ar2_series(150))).unwrap();

        let order = model.selected_order().unwrap();
        assert!(order.p <= 1 && order.q <= 1 && order.d == 0);
    }

    #[test]
    fn unfitted_predict_errors() {
        let model = AutoArima::new();
        assert!(matches!(model.predict(3), Err(TempcastError::FitRequired)));
    }
}
