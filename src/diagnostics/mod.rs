//! Exploratory diagnostics: anomalies and seasonality.

mod anomaly;
mod seasonality;

pub use anomaly::{detect_anomalies, AnomalyConfig, AnomalyMethod, AnomalyReport};
pub use seasonality::{
    detect_seasonality, monthly_profile, MonthlyProfile, MonthStats, SeasonalityConfig,
    SeasonalityResult,
};
