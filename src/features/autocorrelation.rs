//! Sample autocorrelation and partial autocorrelation.

use crate::error::{Result, TempcastError};
use crate::utils::stats::mean;

/// Sample autocorrelation function for lags `0..=max_lag`.
///
/// Uses the biased estimator (denominator n), the convention of most
/// statistics packages, so the sequence is a valid correlation function.
pub fn acf(series: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    if series.is_empty() {
        return Err(TempcastError::EmptyData);
    }
    if max_lag >= series.len() {
        return Err(TempcastError::InvalidParameter(format!(
            "max_lag {} must be below series length {}",
            max_lag,
            series.len()
        )));
    }

    let n = series.len();
    let m = mean(series);
    let denom: f64 = series.iter().map(|x| (x - m).powi(2)).sum();

    if denom <= f64::EPSILON {
        // Constant series: correlation undefined, report zero beyond lag 0.
        let mut out = vec![0.0; max_lag + 1];
        out[0] = 1.0;
        return Ok(out);
    }

    let mut out = Vec::with_capacity(max_lag + 1);
    for lag in 0..=max_lag {
        let numer: f64 = (lag..n).map(|t| (series[t] - m) * (series[t - lag] - m)).sum();
        out.push(numer / denom);
    }
    Ok(out)
}

/// Partial autocorrelation function for lags `0..=max_lag` via the
/// Durbin-Levinson recursion on the sample ACF.
pub fn pacf(series: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let rho = acf(series, max_lag)?;
    let mut out = vec![1.0];
    if max_lag == 0 {
        return Ok(out);
    }

    // phi[k][j] holds the j-th coefficient of the order-k AR fit.
    let mut phi = vec![vec![0.0; max_lag + 1]; max_lag + 1];
    phi[1][1] = rho[1];
    out.push(rho[1]);

    for k in 2..=max_lag {
        let mut numer = rho[k];
        let mut denom = 1.0;
        for j in 1..k {
            numer -= phi[k - 1][j] * rho[k - j];
            denom -= phi[k - 1][j] * rho[j];
        }
        let phi_kk = if denom.abs() <= f64::EPSILON {
            0.0
        } else {
            numer / denom
        };
        phi[k][k] = phi_kk;
        for j in 1..k {
            phi[k][j] = phi[k - 1][j] - phi_kk * phi[k - 1][k - j];
        }
        out.push(phi_kk);
    }
    Ok(out)
}

/// Two-sided 95% white-noise confidence bound for sample autocorrelations.
pub fn acf_confidence_bound(n: usize) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    1.96 / (n as f64).sqrt()
}
