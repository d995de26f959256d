//! Forecasting models and the common `Forecaster` interface.

pub mod arima;
pub mod baseline;
pub mod smoothing;

use crate::core::{DailySeries, Forecast};
use crate::error::Result;

pub use arima::{Arima, ArimaOrder, AutoArima, AutoArimaConfig};
pub use baseline::{Drift, Naive, SeasonalNaive};
pub use smoothing::{Holt, Ses};

/// Common interface for all forecasting models. Object-safe, so candidates
/// can be handled as `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to a series.
    fn fit(&mut self, series: &DailySeries) -> Result<()>;

    /// Point predictions for the given horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Predictions with prediction intervals at the given level (e.g. 0.95).
    /// Models without native intervals fall back to point predictions.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let _ = level;
        self.predict(horizon)
    }

    /// In-sample one-step predictions (NaN where undefined).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// In-sample residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Number of parameters estimated by `fit`, the degrees of freedom
    /// subtracted in residual tests. Zero for non-parametric baselines.
    fn param_count(&self) -> usize {
        0
    }

    /// Model display name.
    fn name(&self) -> &str;

    /// Whether `fit` has completed.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Boxed forecaster trait object.
pub type BoxedForecaster = Box<dyn Forecaster>;

/// A named factory producing fresh model instances for the search.
pub struct ModelSpec {
    name: String,
    factory: Box<dyn Fn() -> BoxedForecaster + Send + Sync>,
}

impl ModelSpec {
    /// Create a spec from a name and factory closure.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> BoxedForecaster + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    /// Candidate display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiate a fresh, unfitted model.
    pub fn create(&self) -> BoxedForecaster {
        (self.factory)()
    }
}

impl std::fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSpec").field("name", &self.name).finish()
    }
}

/// The default candidate pool for the model search: baselines, exponential
/// smoothing, and a small ARIMA family. `seasonal_period` parameterizes the
/// seasonal naive candidate (365 for daily temperature data).
pub fn candidate_models(seasonal_period: usize) -> Vec<ModelSpec> {
    let mut specs = vec![
        ModelSpec::new("Naive", || Box::new(Naive::new()) as BoxedForecaster),
        ModelSpec::new("Drift", || Box::new(Drift::new()) as BoxedForecaster),
        ModelSpec::new("SES", || Box::new(Ses::auto()) as BoxedForecaster),
        ModelSpec::new("Holt", || Box::new(Holt::auto()) as BoxedForecaster),
        ModelSpec::new("ARIMA(1,0,0)", || {
            Box::new(Arima::new(1, 0, 0)) as BoxedForecaster
        }),
        ModelSpec::new("ARIMA(2,0,1)", || {
            Box::new(Arima::new(2, 0, 1)) as BoxedForecaster
        }),
        ModelSpec::new("ARIMA(1,1,1)", || {
            Box::new(Arima::new(1, 1, 1)) as BoxedForecaster
        }),
        ModelSpec::new("ARIMA(0,1,2)", || {
            Box::new(Arima::new(0, 1, 2)) as BoxedForecaster
        }),
    ];
    if seasonal_period > 1 {
        specs.push(ModelSpec::new(
            format!("SeasonalNaive({seasonal_period})"),
            move || Box::new(SeasonalNaive::new(seasonal_period)) as BoxedForecaster,
        ));
    }
    specs
}
