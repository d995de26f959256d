//! Forecast result: point predictions with optional intervals.

use crate::error::{Result, TempcastError};
use chrono::NaiveDate;

/// Point forecasts over a horizon, with optional prediction intervals and
/// the dates the horizon covers.
#[derive(Debug, Clone, Default)]
pub struct Forecast {
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
    dates: Vec<NaiveDate>,
}

impl Forecast {
    /// Forecast from point predictions only.
    pub fn from_point(point: Vec<f64>) -> Self {
        Self {
            point,
            lower: None,
            upper: None,
            dates: Vec::new(),
        }
    }

    /// Forecast with symmetric-interval bounds.
    pub fn with_intervals(point: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != point.len() || upper.len() != point.len() {
            return Err(TempcastError::LengthMismatch {
                expected: point.len(),
                got: lower.len().max(upper.len()),
            });
        }
        Ok(Self {
            point,
            lower: Some(lower),
            upper: Some(upper),
            dates: Vec::new(),
        })
    }

    /// Attach the dates covered by the horizon.
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.len() != self.point.len() {
            return Err(TempcastError::LengthMismatch {
                expected: self.point.len(),
                got: dates.len(),
            });
        }
        self.dates = dates;
        Ok(self)
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Whether no predictions are present.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Whether interval bounds are present.
    pub fn has_intervals(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// Lower interval bounds, if present.
    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    /// Upper interval bounds, if present.
    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// Horizon dates (empty unless attached with `with_dates`).
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }
}
