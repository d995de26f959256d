//! Forecast combination across heterogeneous models.

use crate::core::{DailySeries, Forecast};
use crate::error::{Result, TempcastError};
use crate::models::{BoxedForecaster, Forecaster};

/// How member forecasts are combined.
#[derive(Debug, Clone, PartialEq)]
pub enum Combination {
    /// Unweighted average.
    Mean,
    /// Pointwise median.
    Median,
    /// Fixed weights, normalized at construction.
    Weighted(Vec<f64>),
}

/// An ensemble of fitted forecasters, itself a `Forecaster`.
pub struct Ensemble {
    members: Vec<BoxedForecaster>,
    combination: Combination,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    is_fitted: bool,
}

impl Ensemble {
    /// Equal-weight mean ensemble.
    pub fn mean(members: Vec<BoxedForecaster>) -> Self {
        Self::with_combination(members, Combination::Mean)
    }

    /// Pointwise median ensemble.
    pub fn median(members: Vec<BoxedForecaster>) -> Self {
        Self::with_combination(members, Combination::Median)
    }

    /// Weighted ensemble; weights are normalized to sum to one.
    pub fn weighted(members: Vec<BoxedForecaster>, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != members.len() {
            return Err(TempcastError::LengthMismatch {
                expected: members.len(),
                got: weights.len(),
            });
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(TempcastError::InvalidParameter(
                "ensemble weights must sum to a positive value".to_string(),
            ));
        }
        let normalized = weights.iter().map(|w| w / total).collect();
        Ok(Self::with_combination(members, Combination::Weighted(normalized)))
    }

    fn with_combination(members: Vec<BoxedForecaster>, combination: Combination) -> Self {
        Self {
            members,
            combination,
            fitted: None,
            residuals: None,
            is_fitted: false,
        }
    }

    /// Number of member models.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Member display names.
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }

    /// Combine one step across members according to the combination rule.
    fn combine_step(&self, step_values: &mut Vec<f64>) -> f64 {
        match &self.combination {
            Combination::Mean => step_values.iter().sum::<f64>() / step_values.len() as f64,
            Combination::Median => {
                step_values
                    .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let n = step_values.len();
                if n % 2 == 0 {
                    (step_values[n / 2 - 1] + step_values[n / 2]) / 2.0
                } else {
                    step_values[n / 2]
                }
            }
            Combination::Weighted(weights) => step_values
                .iter()
                .zip(weights.iter())
                .map(|(v, w)| v * w)
                .sum(),
        }
    }

    fn combine_rows(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }
        let horizon = rows[0].len();
        (0..horizon)
            .map(|h| {
                let mut step: Vec<f64> = rows.iter().map(|r| r[h]).collect();
                self.combine_step(&mut step)
            })
            .collect()
    }
}

impl std::fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensemble")
            .field("members", &self.member_names())
            .field("combination", &self.combination)
            .finish()
    }
}

impl Forecaster for Ensemble {
    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        if self.members.is_empty() {
            return Err(TempcastError::InvalidParameter(
                "ensemble has no members".to_string(),
            ));
        }
        for member in &mut self.members {
            member.fit(series)?;
        }

        // Combined in-sample fit where every member has a finite value.
        let y = series.values();
        let member_fits: Vec<&[f64]> = self
            .members
            .iter()
            .filter_map(|m| m.fitted_values())
            .collect();
        if member_fits.len() == self.members.len()
            && member_fits.iter().all(|f| f.len() == y.len())
        {
            let mut fitted = vec![f64::NAN; y.len()];
            let mut residuals = vec![f64::NAN; y.len()];
            for t in 0..y.len() {
                if member_fits.iter().all(|f| f[t].is_finite()) {
                    let mut step: Vec<f64> = member_fits.iter().map(|f| f[t]).collect();
                    fitted[t] = self.combine_step(&mut step);
                    residuals[t] = y[t] - fitted[t];
                }
            }
            self.fitted = Some(fitted);
            self.residuals = Some(residuals);
        }

        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        if !self.is_fitted {
            return Err(TempcastError::FitRequired);
        }
        let rows: Vec<Vec<f64>> = self
            .members
            .iter()
            .map(|m| m.predict(horizon).map(|f| f.point().to_vec()))
            .collect::<Result<_>>()?;
        Ok(Forecast::from_point(self.combine_rows(&rows)))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        if !self.is_fitted {
            return Err(TempcastError::FitRequired);
        }
        let forecasts: Vec<Forecast> = self
            .members
            .iter()
            .map(|m| m.predict_with_intervals(horizon, level))
            .collect::<Result<_>>()?;

        let points: Vec<Vec<f64>> = forecasts.iter().map(|f| f.point().to_vec()).collect();
        let point = self.combine_rows(&points);

        // Interval bounds combine only when every member provides them.
        if forecasts.iter().all(|f| f.has_intervals()) {
            let lowers: Vec<Vec<f64>> = forecasts
                .iter()
                .map(|f| f.lower().unwrap_or(&[]).to_vec())
                .collect();
            let uppers: Vec<Vec<f64>> = forecasts
                .iter()
                .map(|f| f.upper().unwrap_or(&[]).to_vec())
                .collect();
            Forecast::with_intervals(
                point,
                self.combine_rows(&lowers),
                self.combine_rows(&uppers),
            )
        } else {
            Ok(Forecast::from_point(point))
        }
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn param_count(&self) -> usize {
        self.members.iter().map(|m| m.param_count()).sum()
    }

    fn name(&self) -> &str {
        "Ensemble"
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Drift, Naive, Ses};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn make_series(values: Vec<f64>) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        DailySeries::new(dates, values, "temp").unwrap()
    }

    fn members() -> Vec<BoxedForecaster> {
        vec![
            Box::new(Naive::new()),
            Box::new(Drift::new()),
            Box::new(Ses::new(0.3)),
        ]
    }

    #[test]
    fn mean_ensemble_averages_members() {
        let series = make_series((0..30).map(|i| 10.0 + i as f64).collect());
        let mut ensemble = Ensemble::mean(members());
        ensemble.fit(&series).unwrap();

        let combined = ensemble.predict(1).unwrap().point()[0];
        // Naive and Drift estimate nothing, SES estimates alpha.
        assert_eq!(ensemble.param_count(), 1);

        // Recompute member forecasts independently.
        let mut expected = 0.0;
        for mut member in members() {
            member.fit(&series).unwrap();
            expected += member.predict(1).unwrap().point()[0];
        }
        expected /= 3.0;
        assert_relative_eq!(combined, expected, epsilon = 1e-9);
    }

    #[test]
    fn weighted_ensemble_prefers_heavier_member() {
        let series = make_series((0..30).map(|i| 2.0 * i as f64).collect());

        // All weight on Drift makes the ensemble equal Drift's forecast.
        let mut ensemble = Ensemble::weighted(members(), vec![0.0, 1.0, 0.0]).unwrap();
        ensemble.fit(&series).unwrap();
        let combined = ensemble.predict(2).unwrap();

        let mut drift = Drift::new();
        drift.fit(&series).unwrap();
        let alone = drift.predict(2).unwrap();
        for h in 0..2 {
            assert_relative_eq!(combined.point()[h], alone.point()[h], epsilon = 1e-9);
        }
    }

    #[test]
    fn weighted_validates_weights() {
        assert!(matches!(
            Ensemble::weighted(members(), vec![1.0]),
            Err(TempcastError::LengthMismatch { .. })
        ));
        assert!(matches!(
            Ensemble::weighted(members(), vec![0.0, 0.0, 0.0]),
            Err(TempcastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn median_ensemble_resists_one_wild_member() {
        let series = make_series((0..40).map(|i| 10.0 + (i as f64 * 0.3).sin()).collect());
        let mut ensemble = Ensemble::median(members());
        ensemble.fit(&series).unwrap();
        let forecast = ensemble.predict(3).unwrap();
        for &p in forecast.point() {
            assert!((p - 10.0).abs() < 3.0);
        }
    }

    #[test]
    fn empty_ensemble_rejected_and_fit_required() {
        let mut empty = Ensemble::mean(vec![]);
        let series = make_series(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            empty.fit(&series),
            Err(TempcastError::InvalidParameter(_))
        ));

        let unfitted = Ensemble::mean(members());
        assert!(matches!(unfitted.predict(2), Err(TempcastError::FitRequired)));
    }

    #[test]
    fn interval_combination_when_all_members_support_it() {
        let series = make_series((0..50).map(|i| 10.0 + (i as f64 * 0.5).sin()).collect());
        let mut ensemble = Ensemble::mean(members());
        ensemble.fit(&series).unwrap();

        let forecast = ensemble.predict_with_intervals(4, 0.95).unwrap();
        assert!(forecast.has_intervals());
        let lower = forecast.lower().unwrap();
        let upper = forecast.upper().unwrap();
        for h in 0..4 {
            assert!(lower[h] <= forecast.point()[h]);
            assert!(upper[h] >= forecast.point()[h]);
        }
    }
}
