//! End-to-end pipeline: messy CSV in, cleaned series, diagnostics, model
//! search, holdout evaluation and rendered charts.

use std::io::Write;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate};
use tempfile::{tempdir, NamedTempFile};

use tempcast::automl::{AutoSearch, SearchConfig};
use tempcast::diagnostics::{
    detect_anomalies, detect_seasonality, monthly_profile, AnomalyConfig, SeasonalityConfig,
};
use tempcast::evaluate::{accuracy_with_training, holdout_split, interval_coverage};
use tempcast::features::{acf, CalendarFeatures};
use tempcast::io::{read_temperature_csv, CsvOptions};
use tempcast::models::{AutoArima, Forecaster};
use tempcast::plot::{plot_acf, plot_anomalies, plot_forecast, plot_series, ChartStyle};

/// Three years of daily minimum temperatures: an annual sine plus a slight
/// warming trend and deterministic noise, with a few injected data problems.
fn write_messy_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Date,Temp").unwrap();

    let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
    for i in 0..1095usize {
        let date = start + ChronoDuration::days(i as i64);
        let value = synthetic_temp(i);
        match i {
            // A value with the stray leading '?' seen in the raw dataset.
            40 => writeln!(file, "{},?{:.1}", date.format("%Y-%m-%d"), value).unwrap(),
            // A missing temperature.
            90 => writeln!(file, "{},", date.format("%Y-%m-%d")).unwrap(),
            // An unparseable date.
            120 => writeln!(file, "not-a-date,{value:.1}").unwrap(),
            // A duplicate of the previous day's date.
            200 => {
                let dup = start + ChronoDuration::days(199);
                writeln!(file, "{},{:.1}", dup.format("%Y-%m-%d"), value).unwrap()
            }
            _ => writeln!(file, "{},{:.1}", date.format("%Y-%m-%d"), value).unwrap(),
        }
    }
    file
}

fn synthetic_temp(i: usize) -> f64 {
    let annual = (i as f64 * std::f64::consts::TAU / 365.25).sin();
    11.0 + 5.5 * annual + 0.0005 * i as f64 + noise(i)
}

fn noise(i: usize) -> f64 {
    let mut x = (i as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    ((x >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * 1.5
}

#[test]
fn full_pipeline_from_messy_csv_to_forecast() {
    let file = write_messy_csv();
    let (series, report) = read_temperature_csv(file.path(), &CsvOptions::default()).unwrap();

    // Cleaning accounted for every injected problem.
    assert_eq!(report.rows_read, 1095);
    assert_eq!(report.bad_dates, 1);
    assert_eq!(report.bad_values, 1);
    assert_eq!(report.duplicate_dates, 1);
    assert_eq!(series.len(), 1092);
    assert_eq!(series.name(), "Temp");

    // Diagnostics see the annual cycle.
    let seasonality = detect_seasonality(
        series.values(),
        &SeasonalityConfig {
            min_period: 300,
            max_period: 366,
            threshold: 0.3,
        },
    )
    .unwrap();
    assert!(seasonality.detected);
    let period = seasonality.period.unwrap();
    assert!((350..=366).contains(&period), "detected period {period}");

    let profile = monthly_profile(&series);
    assert_eq!(profile.months().len(), 12);
    assert!(profile.amplitude() > 5.0);

    // The clean synthetic series has no gross outliers.
    let anomalies = detect_anomalies(series.values(), &AnomalyConfig::iqr(3.0));
    assert!(anomalies.share() < 1.0);

    // Calendar features line up with the observations.
    let features = CalendarFeatures::from_series(&series);
    assert_eq!(features.len(), series.len());

    // Holdout search and evaluation.
    let (train, test) = holdout_split(&series, 30).unwrap();
    let search = AutoSearch::with_config(SearchConfig {
        seasonal_period: 365,
        time_budget: Duration::from_secs(120),
        ..SearchConfig::default()
    });
    let outcome = search.run(&train).unwrap();
    assert!(!outcome.leaderboard.is_empty());

    let holdout_forecast = outcome.model.predict(test.len()).unwrap();
    let acc =
        accuracy_with_training(test.values(), holdout_forecast.point(), train.values(), 365)
            .unwrap();
    assert!(acc.rmse.is_finite());
    // The combined model should clearly beat the per-step noise-free naive
    // bound being off by a whole season.
    assert!(acc.rmse < 6.0, "holdout rmse {}", acc.rmse);

    // The classical ARIMA baseline is evaluated on the same holdout.
    let mut baseline = AutoArima::new();
    baseline.fit(&train).unwrap();
    let baseline_forecast = baseline.predict(test.len()).unwrap();
    let baseline_acc =
        accuracy_with_training(test.values(), baseline_forecast.point(), train.values(), 365)
            .unwrap();
    assert!(baseline_acc.rmse.is_finite());
    assert!(baseline.param_count() >= 1);

    // Out-of-sample forecast with intervals.
    let future = outcome
        .model
        .predict_with_intervals(14, 0.95)
        .unwrap()
        .with_dates(train.future_dates(14))
        .unwrap();
    assert_eq!(future.horizon(), 14);
    assert!(future.point().iter().all(|v| v.is_finite()));
    if future.has_intervals() {
        let coverage = interval_coverage(
            &test.values()[..14],
            future.lower().unwrap(),
            future.upper().unwrap(),
        )
        .unwrap();
        assert!(coverage >= 0.0);
    }

    // Charts render to non-empty files.
    let dir = tempdir().unwrap();
    plot_series(&series, dir.path().join("series.png"), &ChartStyle::default()).unwrap();
    plot_anomalies(
        &series,
        &anomalies,
        dir.path().join("anomalies.png"),
        &ChartStyle::default(),
    )
    .unwrap();
    let rho = acf(series.values(), 60).unwrap();
    plot_acf(&rho, series.len(), dir.path().join("acf.png"), &ChartStyle::default()).unwrap();
    plot_forecast(
        &train,
        &future,
        Some(&test),
        dir.path().join("forecast.png"),
        &ChartStyle::default(),
    )
    .unwrap();
    for name in ["series.png", "anomalies.png", "acf.png", "forecast.png"] {
        let meta = std::fs::metadata(dir.path().join(name)).unwrap();
        assert!(meta.len() > 0, "{name} is empty");
    }
}

#[test]
fn acf_confirms_annual_autocorrelation_structure() {
    let file = write_messy_csv();
    let (series, _) = read_temperature_csv(file.path(), &CsvOptions::default()).unwrap();

    let rho = acf(series.values(), 400).unwrap();
    // Strong short-lag correlation from the smooth annual cycle.
    assert!(rho[1] > 0.8);
    // Half a year out the correlation flips sign.
    assert!(rho[183] < -0.5);
    // A full year out it recovers.
    assert!(rho[365] > 0.5);
}
