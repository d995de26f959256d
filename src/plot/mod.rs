//! PNG chart rendering for series, diagnostics and forecasts.
//!
//! Charts are drawn with `plotters` on a bitmap backend. Time axes use the
//! observation index with date-formatted tick labels, which keeps every chart
//! on plain `f64` coordinates.

use std::path::Path;

use plotters::prelude::*;

use crate::core::{DailySeries, Forecast};
use crate::diagnostics::AnomalyReport;
use crate::diagnostics::MonthlyProfile;
use crate::error::{Result, TempcastError};
use crate::features::acf_confidence_bound;
use chrono::NaiveDate;

const SERIES_BLUE: RGBColor = RGBColor(0, 123, 255);
const FORECAST_RED: RGBColor = RGBColor(255, 99, 71);
const ACTUAL_GREEN: RGBColor = RGBColor(40, 167, 69);
const BAND_ALPHA: f64 = 0.2;

/// Common chart appearance settings.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub y_label: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: 1024,
            height: 600,
            y_label: "Temperature (°C)".to_string(),
        }
    }
}

impl ChartStyle {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> TempcastError {
    TempcastError::Chart(e.to_string())
}

/// Padded y-range over the finite values of the given slices.
fn y_range(slices: &[&[f64]]) -> Result<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for slice in slices {
        for &v in slice.iter().filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !lo.is_finite() || !hi.is_finite() {
        return Err(TempcastError::Chart(
            "no finite values to plot".to_string(),
        ));
    }
    let pad = if (hi - lo).abs() > 1e-9 {
        (hi - lo) * 0.08
    } else {
        1.0
    };
    Ok((lo - pad, hi + pad))
}

/// Tick-label formatter mapping an observation index to its date.
fn date_label(dates: &[NaiveDate]) -> impl Fn(&f64) -> String + '_ {
    move |x: &f64| {
        let i = x.round() as usize;
        dates
            .get(i.min(dates.len().saturating_sub(1)))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Draw the raw series as a line chart.
pub fn plot_series(series: &DailySeries, path: impl AsRef<Path>, style: &ChartStyle) -> Result<()> {
    let root = BitMapBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let (y_lo, y_hi) = y_range(&[series.values()])?;
    let n = series.len() as f64;
    let title = if style.title.is_empty() {
        series.name().to_string()
    } else {
        style.title.clone()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(52)
        .build_cartesian_2d(0.0..n, y_lo..y_hi)
        .map_err(chart_err)?;

    let labels = date_label(series.dates());
    chart
        .configure_mesh()
        .y_desc(style.y_label.clone())
        .x_label_formatter(&labels)
        .light_line_style(BLACK.mix(0.12))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            series
                .values()
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| (i as f64, v)),
            &SERIES_BLUE,
        ))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Draw the series with flagged anomalies circled and, when the method
/// implies one, the normal range shaded as horizontal fences.
pub fn plot_anomalies(
    series: &DailySeries,
    report: &AnomalyReport,
    path: impl AsRef<Path>,
    style: &ChartStyle,
) -> Result<()> {
    let root = BitMapBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let (y_lo, y_hi) = y_range(&[series.values()])?;
    let n = series.len() as f64;
    let title = if style.title.is_empty() {
        format!("{} anomalies ({} flagged)", series.name(), report.count())
    } else {
        style.title.clone()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(52)
        .build_cartesian_2d(0.0..n, y_lo..y_hi)
        .map_err(chart_err)?;

    let labels = date_label(series.dates());
    chart
        .configure_mesh()
        .y_desc(style.y_label.clone())
        .x_label_formatter(&labels)
        .light_line_style(BLACK.mix(0.12))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            series
                .values()
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| (i as f64, v)),
            &SERIES_BLUE,
        ))
        .map_err(chart_err)?;

    if let Some((lower, upper)) = report.bounds {
        for fence in [lower, upper] {
            chart
                .draw_series(LineSeries::new(
                    [(0.0, fence), (n - 1.0, fence)],
                    BLACK.mix(0.4),
                ))
                .map_err(chart_err)?;
        }
    }

    chart
        .draw_series(report.indices.iter().map(|&i| {
            Circle::new((i as f64, series.values()[i]), 4, FORECAST_RED.filled())
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Draw the month-of-year profile as mean points with min/max whiskers.
pub fn plot_monthly_profile(
    profile: &MonthlyProfile,
    path: impl AsRef<Path>,
    style: &ChartStyle,
) -> Result<()> {
    let months = profile.months();
    if months.is_empty() {
        return Err(TempcastError::Chart("empty monthly profile".to_string()));
    }

    let root = BitMapBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mins: Vec<f64> = months.iter().map(|m| m.min).collect();
    let maxs: Vec<f64> = months.iter().map(|m| m.max).collect();
    let (y_lo, y_hi) = y_range(&[&mins, &maxs])?;
    let title = if style.title.is_empty() {
        "Monthly profile".to_string()
    } else {
        style.title.clone()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(52)
        .build_cartesian_2d(0.5..12.5, y_lo..y_hi)
        .map_err(chart_err)?;

    const MONTH_NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let month_label = |x: &f64| {
        let m = x.round() as usize;
        if (1..=12).contains(&m) && (x - m as f64).abs() < 0.25 {
            MONTH_NAMES[m - 1].to_string()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .y_desc(style.y_label.clone())
        .x_labels(12)
        .x_label_formatter(&month_label)
        .light_line_style(BLACK.mix(0.12))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(months.iter().map(|m| {
            ErrorBar::new_vertical(
                m.month as f64,
                m.min,
                m.mean,
                m.max,
                SERIES_BLUE.filled(),
                10,
            )
        }))
        .map_err(chart_err)?;

    // Connect the monthly means to show the seasonal shape.
    chart
        .draw_series(LineSeries::new(
            months.iter().map(|m| (m.month as f64, m.mean)),
            SERIES_BLUE.mix(0.6),
        ))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Draw a correlogram: one stem per lag plus the white-noise confidence band
/// for a series of `n` observations.
pub fn plot_acf(
    rho: &[f64],
    n: usize,
    path: impl AsRef<Path>,
    style: &ChartStyle,
) -> Result<()> {
    if rho.is_empty() {
        return Err(TempcastError::Chart("empty autocorrelation".to_string()));
    }

    let root = BitMapBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let title = if style.title.is_empty() {
        "Autocorrelation".to_string()
    } else {
        style.title.clone()
    };
    let max_lag = (rho.len() - 1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(52)
        .build_cartesian_2d(-0.5..max_lag + 0.5, -1.05..1.05)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Lag")
        .y_desc("ACF")
        .light_line_style(BLACK.mix(0.12))
        .draw()
        .map_err(chart_err)?;

    let bound = acf_confidence_bound(n);
    if bound.is_finite() {
        for level in [bound, -bound] {
            chart
                .draw_series(LineSeries::new(
                    [(-0.5, level), (max_lag + 0.5, level)],
                    FORECAST_RED.mix(0.6),
                ))
                .map_err(chart_err)?;
        }
    }

    chart
        .draw_series(rho.iter().enumerate().map(|(lag, &r)| {
            PathElement::new([(lag as f64, 0.0), (lag as f64, r)], SERIES_BLUE)
        }))
        .map_err(chart_err)?;
    chart
        .draw_series(
            rho.iter()
                .enumerate()
                .map(|(lag, &r)| Circle::new((lag as f64, r), 3, SERIES_BLUE.filled())),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Draw the history and the forecast on one chart, with the prediction
/// interval as a shaded band when the forecast carries bounds. The forecast
/// must carry its horizon dates. When `actuals` is given (a holdout tail
/// starting right after `history`), it is overlaid on the forecast region
/// so the two can be compared.
pub fn plot_forecast(
    history: &DailySeries,
    forecast: &Forecast,
    actuals: Option<&DailySeries>,
    path: impl AsRef<Path>,
    style: &ChartStyle,
) -> Result<()> {
    if forecast.is_empty() {
        return Err(TempcastError::Chart("empty forecast".to_string()));
    }
    if forecast.dates().len() != forecast.horizon() {
        return Err(TempcastError::Chart(
            "forecast carries no horizon dates".to_string(),
        ));
    }

    let root = BitMapBackend::new(path.as_ref(), (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut slices: Vec<&[f64]> = vec![history.values(), forecast.point()];
    if let (Some(lower), Some(upper)) = (forecast.lower(), forecast.upper()) {
        slices.push(lower);
        slices.push(upper);
    }
    if let Some(actual) = actuals {
        slices.push(actual.values());
    }
    let (y_lo, y_hi) = y_range(&slices)?;

    let n_hist = history.len();
    let n_right = forecast.horizon().max(actuals.map_or(0, |a| a.len()));
    let n_total = (n_hist + n_right) as f64;
    let right_dates: &[NaiveDate] = match actuals {
        Some(a) if a.len() > forecast.horizon() => a.dates(),
        _ => forecast.dates(),
    };
    let all_dates: Vec<NaiveDate> = history
        .dates()
        .iter()
        .chain(right_dates.iter())
        .copied()
        .collect();
    let title = if style.title.is_empty() {
        format!("{} forecast", history.name())
    } else {
        style.title.clone()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(52)
        .build_cartesian_2d(0.0..n_total, y_lo..y_hi)
        .map_err(chart_err)?;

    let labels = date_label(&all_dates);
    chart
        .configure_mesh()
        .y_desc(style.y_label.clone())
        .x_label_formatter(&labels)
        .light_line_style(BLACK.mix(0.12))
        .draw()
        .map_err(chart_err)?;

    if let (Some(lower), Some(upper)) = (forecast.lower(), forecast.upper()) {
        let band: Vec<(f64, f64)> = (0..forecast.horizon())
            .map(|h| ((n_hist + h) as f64, upper[h]))
            .chain(
                (0..forecast.horizon())
                    .rev()
                    .map(|h| ((n_hist + h) as f64, lower[h])),
            )
            .collect();
        chart
            .draw_series(std::iter::once(Polygon::new(
                band,
                FORECAST_RED.mix(BAND_ALPHA),
            )))
            .map_err(chart_err)?;
    }

    chart
        .draw_series(LineSeries::new(
            history
                .values()
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| (i as f64, v)),
            &SERIES_BLUE,
        ))
        .map_err(chart_err)?
        .label("history")
        .legend(|(x, y)| PathElement::new([(x, y), (x + 16, y)], SERIES_BLUE));

    chart
        .draw_series(LineSeries::new(
            forecast
                .point()
                .iter()
                .enumerate()
                .map(|(h, &v)| ((n_hist + h) as f64, v)),
            &FORECAST_RED,
        ))
        .map_err(chart_err)?
        .label("forecast")
        .legend(|(x, y)| PathElement::new([(x, y), (x + 16, y)], FORECAST_RED));

    if let Some(actual) = actuals {
        chart
            .draw_series(LineSeries::new(
                actual
                    .values()
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, &v)| ((n_hist + i) as f64, v)),
                &ACTUAL_GREEN,
            ))
            .map_err(chart_err)?
            .label("actual")
            .legend(|(x, y)| PathElement::new([(x, y), (x + 16, y)], ACTUAL_GREEN));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK.mix(0.4))
        .background_style(WHITE.mix(0.85))
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{detect_anomalies, monthly_profile, AnomalyConfig};
    use crate::features::acf;
    use chrono::Duration;
    use tempfile::tempdir;

    fn make_series(n: usize) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        let dates = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let values = (0..n)
            .map(|i| 11.0 + 6.0 * (i as f64 * std::f64::consts::TAU / 365.0).sin())
            .collect();
        DailySeries::new(dates, values, "temp").unwrap()
    }

    fn assert_png(path: &std::path::Path) {
        let meta = std::fs::metadata(path).unwrap();
        assert!(meta.len() > 0, "chart file is empty");
    }

    #[test]
    fn renders_series_chart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.png");
        plot_series(&make_series(400), &path, &ChartStyle::default()).unwrap();
        assert_png(&path);
    }

    #[test]
    fn renders_anomaly_chart_with_fences() {
        let series = make_series(300);
        let mut values = series.values().to_vec();
        values[50] = 45.0;
        let series = DailySeries::new(series.dates().to_vec(), values, "temp").unwrap();
        let report = detect_anomalies(series.values(), &AnomalyConfig::iqr(1.5));
        assert!(report.count() >= 1);

        let dir = tempdir().unwrap();
        let path = dir.path().join("anomalies.png");
        plot_anomalies(&series, &report, &path, &ChartStyle::titled("outliers")).unwrap();
        assert_png(&path);
    }

    #[test]
    fn renders_monthly_profile_chart() {
        let profile = monthly_profile(&make_series(730));
        let dir = tempdir().unwrap();
        let path = dir.path().join("monthly.png");
        plot_monthly_profile(&profile, &path, &ChartStyle::default()).unwrap();
        assert_png(&path);
    }

    #[test]
    fn renders_acf_chart() {
        let series = make_series(500);
        let rho = acf(series.values(), 40).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("acf.png");
        plot_acf(&rho, series.len(), &path, &ChartStyle::default()).unwrap();
        assert_png(&path);
    }

    #[test]
    fn renders_forecast_chart_with_band() {
        let series = make_series(200);
        let horizon = 14;
        let dates = series.future_dates(horizon);
        let point: Vec<f64> = (0..horizon).map(|h| 11.0 + h as f64 * 0.1).collect();
        let lower: Vec<f64> = point.iter().map(|p| p - 2.0).collect();
        let upper: Vec<f64> = point.iter().map(|p| p + 2.0).collect();
        let forecast = Forecast::with_intervals(point, lower, upper)
            .unwrap()
            .with_dates(dates)
            .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("forecast.png");
        plot_forecast(&series, &forecast, None, &path, &ChartStyle::default()).unwrap();
        assert_png(&path);
    }

    #[test]
    fn renders_forecast_chart_against_holdout_actuals() {
        let series = make_series(240);
        let (train, test) = series.split_tail(30).unwrap();

        // A deliberately biased forecast so the two lines separate.
        let point: Vec<f64> = test.values().iter().map(|v| v + 1.0).collect();
        let lower: Vec<f64> = point.iter().map(|p| p - 2.5).collect();
        let upper: Vec<f64> = point.iter().map(|p| p + 2.5).collect();
        let forecast = Forecast::with_intervals(point, lower, upper)
            .unwrap()
            .with_dates(test.dates().to_vec())
            .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("holdout.png");
        plot_forecast(&train, &forecast, Some(&test), &path, &ChartStyle::titled("holdout"))
            .unwrap();
        assert_png(&path);
    }

    #[test]
    fn forecast_chart_requires_dates() {
        let series = make_series(50);
        let forecast = Forecast::from_point(vec![1.0, 2.0]);
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.png");
        let result = plot_forecast(&series, &forecast, None, &path, &ChartStyle::default());
        assert!(matches!(result, Err(TempcastError::Chart(_))));
    }
}
