//! Budgeted model search over the candidate pool.
//!
//! The search holds out a validation tail of the training series, fits each
//! candidate on the remainder, scores it on the tail, and keeps a leaderboard
//! sorted by validation RMSE. The final model is either the best candidate
//! refit on the full series or an inverse-MSE weighted ensemble of the top
//! performers.

mod ensemble;

pub use ensemble::{Combination, Ensemble};

use std::time::{Duration, Instant};

use crate::core::DailySeries;
use crate::error::{Result, TempcastError};
use crate::evaluate::accuracy_with_training;
use crate::models::{candidate_models, BoxedForecaster, Forecaster, ModelSpec};
use tracing::{debug, info, warn};

/// Settings for [`AutoSearch`].
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Fraction of the series held out for validation scoring.
    pub validation_fraction: f64,
    /// Smallest allowed validation tail, in observations.
    pub min_validation: usize,
    /// Wall-clock budget. Once exceeded, no further candidates are started;
    /// at least one candidate always runs.
    pub time_budget: Duration,
    /// Seasonal period hint passed to the candidate pool (365 for daily
    /// temperature data, 0 disables the seasonal candidate).
    pub seasonal_period: usize,
    /// Combine the top `ensemble_top_k` candidates instead of refitting only
    /// the winner.
    pub ensemble: bool,
    /// How many leaders the ensemble combines.
    pub ensemble_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.2,
            min_validation: 7,
            time_budget: Duration::from_secs(30),
            seasonal_period: 365,
            ensemble: true,
            ensemble_top_k: 3,
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.validation_fraction) || self.validation_fraction <= 0.0 {
            return Err(TempcastError::InvalidParameter(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        if self.ensemble && self.ensemble_top_k == 0 {
            return Err(TempcastError::InvalidParameter(
                "ensemble_top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One scored candidate on the leaderboard.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    /// Candidate display name.
    pub name: String,
    /// Root mean squared error on the validation tail.
    pub rmse: f64,
    /// Mean absolute error on the validation tail.
    pub mae: f64,
    /// Mean absolute scaled error, when the training head is long enough
    /// for the seasonal naive scaling.
    pub mase: Option<f64>,
    /// Fit plus scoring time.
    pub elapsed: Duration,
}

/// Candidates ranked by validation RMSE, best first. Failed candidates are
/// recorded separately by name.
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    entries: Vec<CandidateResult>,
    failed: Vec<String>,
}

impl Leaderboard {
    fn push(&mut self, result: CandidateResult) {
        self.entries.push(result);
        self.entries
            .sort_by(|a, b| a.rmse.partial_cmp(&b.rmse).unwrap_or(std::cmp::Ordering::Equal));
    }

    fn push_failure(&mut self, name: &str) {
        self.failed.push(name.to_string());
    }

    /// Ranked results, best first.
    pub fn entries(&self) -> &[CandidateResult] {
        &self.entries
    }

    /// Names of candidates that failed to fit or score.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// The winner, if any candidate scored.
    pub fn best(&self) -> Option<&CandidateResult> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<4} {:<24} {:>10} {:>10} {:>10} {:>9}",
            "rank", "model", "rmse", "mae", "mase", "time"
        )?;
        for (rank, entry) in self.entries.iter().enumerate() {
            let mase = entry
                .mase
                .map_or_else(|| "-".to_string(), |m| format!("{m:.4}"));
            writeln!(
                f,
                "{:<4} {:<24} {:>10.4} {:>10.4} {:>10} {:>8.2}s",
                rank + 1,
                entry.name,
                entry.rmse,
                entry.mae,
                mase,
                entry.elapsed.as_secs_f64()
            )?;
        }
        Ok(())
    }
}

/// The outcome of a search: the fitted final model plus the leaderboard.
pub struct SearchOutcome {
    /// Final model, fitted on the full input series.
    pub model: BoxedForecaster,
    /// Display name of the final model (winner name, or the ensemble's).
    pub final_name: String,
    /// All scored candidates.
    pub leaderboard: Leaderboard,
    /// Total search wall-clock time.
    pub elapsed: Duration,
    /// Whether the time budget cut the candidate sweep short.
    pub budget_exhausted: bool,
}

impl std::fmt::Debug for SearchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOutcome")
            .field("final_name", &self.final_name)
            .field("leaderboard", &self.leaderboard)
            .field("elapsed", &self.elapsed)
            .field("budget_exhausted", &self.budget_exhausted)
            .finish()
    }
}

/// The budgeted search itself.
#[derive(Debug, Clone, Default)]
pub struct AutoSearch {
    config: SearchConfig,
}

impl AutoSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Validation tail length for a series of `n` observations.
    fn validation_len(&self, n: usize) -> usize {
        let by_fraction = (n as f64 * self.config.validation_fraction).round() as usize;
        by_fraction.max(self.config.min_validation).min(n / 2)
    }

    /// Run the search with the default candidate pool.
    pub fn run(&self, series: &DailySeries) -> Result<SearchOutcome> {
        let specs = candidate_models(self.config.seasonal_period);
        self.run_with_candidates(series, &specs)
    }

    /// Run the search over an explicit candidate pool.
    pub fn run_with_candidates(
        &self,
        series: &DailySeries,
        specs: &[ModelSpec],
    ) -> Result<SearchOutcome> {
        self.config.validate()?;
        if specs.is_empty() {
            return Err(TempcastError::InvalidParameter(
                "candidate pool is empty".to_string(),
            ));
        }

        let n_val = self.validation_len(series.len());
        if n_val == 0 || series.len() < 2 * self.config.min_validation {
            return Err(TempcastError::InsufficientData {
                needed: 2 * self.config.min_validation,
                got: series.len(),
            });
        }
        let (train, validation) = series.split_tail(n_val)?;
        info!(
            train = train.len(),
            validation = validation.len(),
            candidates = specs.len(),
            budget_secs = self.config.time_budget.as_secs_f64(),
            "starting model search"
        );

        let started = Instant::now();
        let mut leaderboard = Leaderboard::default();
        let mut budget_exhausted = false;

        for spec in specs {
            if !leaderboard.is_empty() && started.elapsed() >= self.config.time_budget {
                warn!(
                    skipped = spec.name(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "time budget exhausted"
                );
                budget_exhausted = true;
                break;
            }

            let candidate_start = Instant::now();
            match self.score_candidate(spec, &train, &validation) {
                Ok((rmse, mae, mase)) => {
                    debug!(model = spec.name(), rmse, mae, "candidate scored");
                    leaderboard.push(CandidateResult {
                        name: spec.name().to_string(),
                        rmse,
                        mae,
                        mase,
                        elapsed: candidate_start.elapsed(),
                    });
                }
                Err(e) => {
                    debug!(model = spec.name(), error = %e, "candidate failed");
                    leaderboard.push_failure(spec.name());
                }
            }
        }

        let best = leaderboard
            .best()
            .cloned()
            .ok_or_else(|| TempcastError::Computation("no candidate produced a score".to_string()))?;

        let (model, final_name) = self.build_final(series, specs, &leaderboard, &best)?;
        info!(model = %final_name, rmse = best.rmse, "search finished");

        Ok(SearchOutcome {
            model,
            final_name,
            leaderboard,
            elapsed: started.elapsed(),
            budget_exhausted,
        })
    }

    /// Rebuild the final model a finished leaderboard implies (the winner,
    /// or the weighted top-k ensemble) and fit it on `series`, without
    /// re-running the candidate sweep. Used to carry a search result from a
    /// training split over to the full series.
    pub fn refit(
        &self,
        leaderboard: &Leaderboard,
        series: &DailySeries,
    ) -> Result<(BoxedForecaster, String)> {
        let specs = candidate_models(self.config.seasonal_period);
        self.refit_with_candidates(leaderboard, series, &specs)
    }

    /// Like [`refit`](Self::refit), over an explicit candidate pool.
    pub fn refit_with_candidates(
        &self,
        leaderboard: &Leaderboard,
        series: &DailySeries,
        specs: &[ModelSpec],
    ) -> Result<(BoxedForecaster, String)> {
        let best = leaderboard.best().cloned().ok_or_else(|| {
            TempcastError::Computation("leaderboard has no scored candidates".to_string())
        })?;
        self.build_final(series, specs, leaderboard, &best)
    }

    fn score_candidate(
        &self,
        spec: &ModelSpec,
        train: &DailySeries,
        validation: &DailySeries,
    ) -> Result<(f64, f64, Option<f64>)> {
        let mut model = spec.create();
        model.fit(train)?;
        let forecast = model.predict(validation.len())?;
        let acc = accuracy_with_training(
            validation.values(),
            forecast.point(),
            train.values(),
            self.config.seasonal_period.max(1),
        )?;
        if !acc.rmse.is_finite() {
            return Err(TempcastError::Computation(format!(
                "{} produced a non-finite validation score",
                spec.name()
            )));
        }
        Ok((acc.rmse, acc.mae, acc.mase))
    }

    /// Refit the winner on the full series, or assemble the weighted ensemble
    /// of the top performers when enabled and at least two candidates scored.
    fn build_final(
        &self,
        series: &DailySeries,
        specs: &[ModelSpec],
        leaderboard: &Leaderboard,
        best: &CandidateResult,
    ) -> Result<(BoxedForecaster, String)> {
        let top_k = self.config.ensemble_top_k.min(leaderboard.len());
        if self.config.ensemble && top_k >= 2 {
            let leaders = &leaderboard.entries()[..top_k];
            let mut members = Vec::with_capacity(top_k);
            let mut weights = Vec::with_capacity(top_k);
            for entry in leaders {
                let spec = specs
                    .iter()
                    .find(|s| s.name() == entry.name)
                    .ok_or_else(|| {
                        TempcastError::Computation(format!(
                            "leaderboard entry {} has no matching candidate",
                            entry.name
                        ))
                    })?;
                members.push(spec.create());
                // Inverse validation MSE, floored to avoid infinite weights.
                weights.push(1.0 / (entry.rmse * entry.rmse).max(1e-12));
            }
            let names: Vec<String> = leaders.iter().map(|e| e.name.clone()).collect();
            let mut ensemble = Ensemble::weighted(members, weights)?;
            ensemble.fit(series)?;
            let final_name = format!("Ensemble[{}]", names.join(", "));
            Ok((Box::new(ensemble), final_name))
        } else {
            let spec = specs
                .iter()
                .find(|s| s.name() == best.name)
                .ok_or_else(|| {
                    TempcastError::Computation(format!(
                        "winner {} has no matching candidate",
                        best.name
                    ))
                })?;
            let mut model = spec.create();
            model.fit(series)?;
            let final_name = model.name().to_string();
            Ok((model, final_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Drift, Naive};
    use crate::models::Forecaster;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    fn make_series(values: Vec<f64>) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + ChronoDuration::days(i as i64))
            .collect();
        DailySeries::new(dates, values, "temp").unwrap()
    }

    fn trending(n: usize) -> DailySeries {
        make_series((0..n).map(|i| 5.0 + 0.5 * i as f64).collect())
    }

    fn small_pool() -> Vec<ModelSpec> {
        vec![
            ModelSpec::new("Naive", || Box::new(Naive::new()) as BoxedForecaster),
            ModelSpec::new("Drift", || Box::new(Drift::new()) as BoxedForecaster),
        ]
    }

    #[test]
    fn drift_wins_on_a_linear_trend() {
        let series = trending(120);
        let search = AutoSearch::with_config(SearchConfig {
            ensemble: false,
            seasonal_period: 0,
            ..SearchConfig::default()
        });
        let outcome = search.run_with_candidates(&series, &small_pool()).unwrap();

        assert_eq!(outcome.leaderboard.best().unwrap().name, "Drift");
        assert_eq!(outcome.final_name, "Drift");
        assert!(outcome.model.is_fitted());
        assert!(!outcome.budget_exhausted);
    }

    #[test]
    fn leaderboard_is_sorted_by_rmse() {
        let series = trending(100);
        let search = AutoSearch::with_config(SearchConfig {
            ensemble: false,
            seasonal_period: 0,
            ..SearchConfig::default()
        });
        let outcome = search.run_with_candidates(&series, &small_pool()).unwrap();

        let entries = outcome.leaderboard.entries();
        assert_eq!(entries.len(), 2);
        for pair in entries.windows(2) {
            assert!(pair[0].rmse <= pair[1].rmse);
        }
    }

    #[test]
    fn ensemble_combines_top_candidates() {
        let series = trending(150);
        let search = AutoSearch::with_config(SearchConfig {
            ensemble: true,
            ensemble_top_k: 2,
            seasonal_period: 0,
            ..SearchConfig::default()
        });
        let outcome = search.run_with_candidates(&series, &small_pool()).unwrap();

        assert!(outcome.final_name.starts_with("Ensemble["));
        let forecast = outcome.model.predict(7).unwrap();
        assert_eq!(forecast.horizon(), 7);
        assert!(forecast.point().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_budget_still_scores_one_candidate() {
        let series = trending(100);
        let search = AutoSearch::with_config(SearchConfig {
            time_budget: Duration::ZERO,
            ensemble: false,
            seasonal_period: 0,
            ..SearchConfig::default()
        });
        let outcome = search.run_with_candidates(&series, &small_pool()).unwrap();

        assert_eq!(outcome.leaderboard.len(), 1);
        assert!(outcome.budget_exhausted);
    }

    #[test]
    fn default_pool_runs_end_to_end() {
        let values: Vec<f64> = (0..200)
            .map(|i| 11.0 + 4.0 * (i as f64 * std::f64::consts::TAU / 30.0).sin())
            .collect();
        let series = make_series(values);
        let search = AutoSearch::with_config(SearchConfig {
            seasonal_period: 30,
            ..SearchConfig::default()
        });
        let outcome = search.run(&series).unwrap();

        assert!(!outcome.leaderboard.is_empty());
        assert!(outcome.model.predict(14).unwrap().point().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn too_short_series_rejected() {
        let series = make_series(vec![1.0, 2.0, 3.0]);
        let err = AutoSearch::new().run_with_candidates(&series, &small_pool());
        assert!(matches!(err, Err(TempcastError::InsufficientData { .. })));
    }

    #[test]
    fn invalid_config_rejected() {
        let series = trending(100);
        let search = AutoSearch::with_config(SearchConfig {
            validation_fraction: 1.5,
            ..SearchConfig::default()
        });
        assert!(matches!(
            search.run_with_candidates(&series, &small_pool()),
            Err(TempcastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn leaderboard_display_renders_rows() {
        let mut board = Leaderboard::default();
        board.push(CandidateResult {
            name: "Naive".to_string(),
            rmse: 1.25,
            mae: 1.0,
            mase: Some(0.84),
            elapsed: Duration::from_millis(12),
        });
        board.push(CandidateResult {
            name: "Drift".to_string(),
            rmse: 2.5,
            mae: 2.0,
            mase: None,
            elapsed: Duration::from_millis(8),
        });
        let rendered = format!("{board}");
        assert!(rendered.contains("Naive"));
        assert!(rendered.contains("1.25"));
        assert!(rendered.contains("0.8400"));
        // A missing MASE renders as a dash, not a number.
        assert!(rendered.lines().any(|l| l.contains("Drift") && l.contains(" - ")));
    }

    #[test]
    fn candidate_scores_carry_mase() {
        let series = trending(120);
        let search = AutoSearch::with_config(SearchConfig {
            ensemble: false,
            seasonal_period: 0,
            ..SearchConfig::default()
        });
        let outcome = search.run_with_candidates(&series, &small_pool()).unwrap();

        for entry in outcome.leaderboard.entries() {
            let mase = entry.mase.unwrap();
            assert!(mase.is_finite() && mase >= 0.0);
        }
        // Drift tracks the trend far better than one-step naive scaling.
        assert!(outcome.leaderboard.best().unwrap().mase.unwrap() < 1.0);
    }

    #[test]
    fn refit_rebuilds_final_without_rescoring() {
        let series = trending(150);
        let (train, _) = series.split_tail(30).unwrap();
        let search = AutoSearch::with_config(SearchConfig {
            ensemble: false,
            seasonal_period: 0,
            ..SearchConfig::default()
        });
        let outcome = search.run_with_candidates(&train, &small_pool()).unwrap();

        let (model, name) = search
            .refit_with_candidates(&outcome.leaderboard, &series, &small_pool())
            .unwrap();
        assert_eq!(name, outcome.final_name);
        assert!(model.is_fitted());
        // The refit model continues the full series, not the training head.
        let next = model.predict(1).unwrap().point()[0];
        assert!((next - (5.0 + 0.5 * 150.0)).abs() < 1.0, "next = {next}");
    }

    #[test]
    fn refit_preserves_ensemble_choice() {
        let series = trending(150);
        let (train, _) = series.split_tail(30).unwrap();
        let search = AutoSearch::with_config(SearchConfig {
            ensemble: true,
            ensemble_top_k: 2,
            seasonal_period: 0,
            ..SearchConfig::default()
        });
        let outcome = search.run_with_candidates(&train, &small_pool()).unwrap();
        let (model, name) = search
            .refit_with_candidates(&outcome.leaderboard, &series, &small_pool())
            .unwrap();

        assert_eq!(name, outcome.final_name);
        assert!(name.starts_with("Ensemble["));
        assert!(model.predict(5).unwrap().point().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn refit_requires_a_scored_leaderboard() {
        let search = AutoSearch::new();
        let err = search.refit(&Leaderboard::default(), &trending(100));
        assert!(matches!(err, Err(TempcastError::Computation(_))));
    }
}
