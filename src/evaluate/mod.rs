//! Holdout evaluation: point-forecast accuracy, residual whiteness, and
//! prediction-interval calibration.

use crate::core::DailySeries;
use crate::error::{Result, TempcastError};
use crate::features::acf;
use crate::models::Forecaster;
use crate::utils::stats::mean;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Split a series into a training head and a test tail of `n_test`
/// observations.
pub fn holdout_split(series: &DailySeries, n_test: usize) -> Result<(DailySeries, DailySeries)> {
    if n_test == 0 || n_test >= series.len() {
        return Err(TempcastError::InvalidParameter(format!(
            "test size must be in 1..{}, got {n_test}",
            series.len()
        )));
    }
    series.split_tail(n_test)
}

/// Point-forecast accuracy over a holdout set.
#[derive(Debug, Clone, PartialEq)]
pub struct Accuracy {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// Mean absolute percentage error. `None` when any actual is zero.
    pub mape: Option<f64>,
    /// Symmetric MAPE, bounded in [0, 200].
    pub smape: f64,
    /// Mean absolute scaled error. Only set by
    /// [`accuracy_with_training`], which has the training data the
    /// scaling denominator needs.
    pub mase: Option<f64>,
    /// Coefficient of determination. `None` for a constant actual series.
    pub r_squared: Option<f64>,
}

/// Accuracy of `predicted` against `actual`. The slices must be the same
/// non-zero length and hold only finite values.
pub fn accuracy(actual: &[f64], predicted: &[f64]) -> Result<Accuracy> {
    if actual.is_empty() {
        return Err(TempcastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(TempcastError::LengthMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    if actual.iter().chain(predicted.iter()).any(|v| !v.is_finite()) {
        return Err(TempcastError::Computation(
            "accuracy inputs contain non-finite values".to_string(),
        ));
    }

    let n = actual.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;
    let mut pct_defined = true;
    let mut smape_sum = 0.0;

    for (&a, &p) in actual.iter().zip(predicted.iter()) {
        let err = a - p;
        abs_sum += err.abs();
        sq_sum += err * err;
        if a == 0.0 {
            pct_defined = false;
        } else {
            pct_sum += (err / a).abs();
        }
        let denom = (a.abs() + p.abs()) / 2.0;
        if denom > 0.0 {
            smape_sum += err.abs() / denom;
        }
    }

    let mae = abs_sum / n;
    let mse = sq_sum / n;

    let actual_mean = mean(actual);
    let total_ss: f64 = actual.iter().map(|&a| (a - actual_mean).powi(2)).sum();
    let r_squared = if total_ss > 0.0 {
        Some(1.0 - sq_sum / total_ss)
    } else {
        None
    };

    Ok(Accuracy {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape: pct_defined.then(|| 100.0 * pct_sum / n),
        smape: 100.0 * smape_sum / n,
        mase: None,
        r_squared,
    })
}

/// Like [`accuracy`], plus MASE scaled by the in-sample seasonal naive MAE of
/// the training series at `seasonal_period` (use 1 for the plain naive
/// scaling).
pub fn accuracy_with_training(
    actual: &[f64],
    predicted: &[f64],
    train: &[f64],
    seasonal_period: usize,
) -> Result<Accuracy> {
    let mut acc = accuracy(actual, predicted)?;

    let m = seasonal_period.max(1);
    if train.len() > m {
        let naive_mae = train
            .windows(m + 1)
            .map(|w| (w[m] - w[0]).abs())
            .sum::<f64>()
            / (train.len() - m) as f64;
        if naive_mae > 0.0 {
            acc.mase = Some(acc.mae / naive_mae);
        }
    }
    Ok(acc)
}

/// Ljung-Box test for residual autocorrelation.
#[derive(Debug, Clone)]
pub struct LjungBox {
    /// The Q statistic.
    pub statistic: f64,
    /// Chi-squared p-value. Small values indicate leftover autocorrelation.
    pub p_value: f64,
    /// Number of lags included.
    pub lags: usize,
}

/// Ljung-Box Q over the first `lags` residual autocorrelations, with
/// `fitted_params` degrees of freedom subtracted for a fitted model's
/// residuals. NaN residuals (warmup) are skipped.
pub fn ljung_box(residuals: &[f64], lags: usize, fitted_params: usize) -> Result<LjungBox> {
    let clean: Vec<f64> = residuals.iter().copied().filter(|v| v.is_finite()).collect();
    let n = clean.len();
    if lags == 0 || lags <= fitted_params {
        return Err(TempcastError::InvalidParameter(format!(
            "lags must exceed fitted_params ({fitted_params}), got {lags}"
        )));
    }
    if n <= lags + 1 {
        return Err(TempcastError::InsufficientData {
            needed: lags + 2,
            got: n,
        });
    }

    let rho = acf(&clean, lags)?;
    let nf = n as f64;
    let statistic = nf
        * (nf + 2.0)
        * (1..=lags)
            .map(|k| rho[k] * rho[k] / (nf - k as f64))
            .sum::<f64>();

    let df = (lags - fitted_params) as f64;
    let dist = ChiSquared::new(df)
        .map_err(|e| TempcastError::Computation(format!("chi-squared setup failed: {e}")))?;
    let p_value = 1.0 - dist.cdf(statistic);

    Ok(LjungBox {
        statistic,
        p_value,
        lags,
    })
}

/// Observed coverage of one nominal interval level on a holdout set.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRow {
    /// Nominal level, e.g. 0.95.
    pub level: f64,
    /// Share of actuals inside the interval.
    pub coverage: f64,
}

/// Share of `actual` values inside `[lower, upper]`.
pub fn interval_coverage(actual: &[f64], lower: &[f64], upper: &[f64]) -> Result<f64> {
    if actual.is_empty() {
        return Err(TempcastError::EmptyData);
    }
    if lower.len() != actual.len() || upper.len() != actual.len() {
        return Err(TempcastError::LengthMismatch {
            expected: actual.len(),
            got: lower.len().min(upper.len()),
        });
    }
    let inside = actual
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .filter(|(a, (lo, hi))| **a >= **lo && **a <= **hi)
        .count();
    Ok(inside as f64 / actual.len() as f64)
}

/// Observed holdout coverage of a fitted model's intervals at each nominal
/// level. Levels whose forecast carries no intervals are skipped.
pub fn calibration_table(
    model: &dyn Forecaster,
    test: &DailySeries,
    levels: &[f64],
) -> Result<Vec<CalibrationRow>> {
    let mut rows = Vec::with_capacity(levels.len());
    for &level in levels {
        if !(0.0..1.0).contains(&level) || level <= 0.0 {
            return Err(TempcastError::InvalidParameter(format!(
                "interval level must be in (0, 1), got {level}"
            )));
        }
        let forecast = model.predict_with_intervals(test.len(), level)?;
        if let (Some(lower), Some(upper)) = (forecast.lower(), forecast.upper()) {
            rows.push(CalibrationRow {
                level,
                coverage: interval_coverage(test.values(), lower, upper)?,
            });
        }
    }
    Ok(rows)
}
