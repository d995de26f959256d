//! # tempcast
//!
//! Exploratory analysis and forecasting of daily minimum-temperature series.
//!
//! The crate covers the full workflow for a univariate daily series: CSV
//! loading and cleaning, anomaly and seasonality diagnostics, autocorrelation,
//! calendar feature augmentation, a budgeted model search with an ensemble
//! option, classical ARIMA with automatic order selection, holdout evaluation
//! and chart rendering.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod automl;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod io;
pub mod models;
pub mod plot;
pub mod utils;

pub use error::{Result, TempcastError};

pub mod prelude {
    pub use crate::automl::{AutoSearch, SearchConfig};
    pub use crate::core::{DailySeries, Forecast};
    pub use crate::error::{Result, TempcastError};
    pub use crate::evaluate::{accuracy, holdout_split, Accuracy};
    pub use crate::models::Forecaster;
}
