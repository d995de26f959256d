//! Differencing and integration for ARIMA.

use crate::utils::stats::variance;

/// Difference a series `d` times.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut out = series.to_vec();
    for _ in 0..d {
        if out.len() <= 1 {
            return Vec::new();
        }
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Undo `d` rounds of differencing on a forecast, using the tail of the
/// original series for the starting values.
pub fn integrate(forecast_diff: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || forecast_diff.is_empty() {
        return forecast_diff.to_vec();
    }

    let mut out = forecast_diff.to_vec();
    for level in (0..d).rev() {
        // Starting value: last element of the series differenced `level` times.
        let base = difference(original, level);
        let start = base.last().copied().unwrap_or(0.0);

        let mut acc = start;
        for value in out.iter_mut() {
            acc += *value;
            *value = acc;
        }
    }
    out
}

/// Suggest a differencing order (0, 1 or 2) by checking whether differencing
/// meaningfully reduces the sample variance.
pub fn suggest_differencing(series: &[f64]) -> usize {
    if series.len() < 4 {
        return 0;
    }

    let var0 = variance(series);
    let d1 = difference(series, 1);
    if d1.len() < 3 {
        return 0;
    }
    let var1 = variance(&d1);

    if !(var0.is_finite() && var1.is_finite()) || var0 <= 0.0 {
        return 0;
    }
    if var1 / var0 >= 0.9 {
        return 0;
    }

    let d2 = difference(&d1, 1);
    if d2.len() >= 3 {
        let var2 = variance(&d2);
        if var2.is_finite() && var2 / var1 < 0.9 {
            return 2;
        }
    }
    1
}
