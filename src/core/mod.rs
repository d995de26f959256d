//! Core data structures: the daily series and the forecast result.

mod forecast;
mod series;

pub use forecast::Forecast;
pub use series::{DailySeries, SeriesSummary};
