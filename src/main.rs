//! Command-line entry point: inspect, analyze and forecast a daily
//! temperature CSV.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tempcast::automl::{AutoSearch, SearchConfig};
use tempcast::core::DailySeries;
use tempcast::diagnostics::{
    detect_anomalies, detect_seasonality, monthly_profile, AnomalyConfig, SeasonalityConfig,
};
use tempcast::evaluate::{accuracy_with_training, calibration_table, holdout_split, ljung_box};
use tempcast::features::{acf, CalendarFeatures};
use tempcast::io::{read_temperature_csv, write_forecast_csv, CsvOptions};
use tempcast::models::{AutoArima, BoxedForecaster, Forecaster};
use tempcast::plot::{
    plot_acf, plot_anomalies, plot_forecast, plot_monthly_profile, plot_series, ChartStyle,
};

#[derive(Parser)]
#[command(name = "tempcast", version, about = "Daily temperature analysis and forecasting")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Date column format.
    #[arg(long, default_value = "%Y-%m-%d", global = true)]
    date_format: String,

    /// Zero-based date column index.
    #[arg(long, default_value_t = 0, global = true)]
    date_column: usize,

    /// Zero-based value column index.
    #[arg(long, default_value_t = 1, global = true)]
    value_column: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Load a CSV, report cleaning actions and summary statistics.
    Inspect {
        /// Input CSV with a date column and a value column.
        csv: PathBuf,
    },
    /// Exploratory diagnostics: anomalies, seasonality, autocorrelation and
    /// calendar features, with charts.
    Analyze {
        csv: PathBuf,

        /// Directory the charts are written into.
        #[arg(long, default_value = "charts")]
        out_dir: PathBuf,

        /// Largest autocorrelation lag.
        #[arg(long, default_value_t = 50)]
        max_lag: usize,

        /// IQR fence multiplier for anomaly detection.
        #[arg(long, default_value_t = 1.5)]
        iqr_multiplier: f64,
    },
    /// Model search, holdout evaluation and an out-of-sample forecast.
    Forecast {
        csv: PathBuf,

        /// Directory the forecast chart is written into.
        #[arg(long, default_value = "charts")]
        out_dir: PathBuf,

        /// Days to forecast beyond the end of the series.
        #[arg(long, default_value_t = 30)]
        horizon: usize,

        /// Days held out for evaluation.
        #[arg(long, default_value_t = 30)]
        test_days: usize,

        /// Model selection strategy.
        #[arg(long, value_enum, default_value_t = ModelChoice::Search)]
        model: ModelChoice,

        /// Search time budget in seconds.
        #[arg(long, default_value_t = 30)]
        budget_secs: u64,

        /// Seasonal period hint for the candidate pool (0 disables it).
        #[arg(long, default_value_t = 365)]
        seasonal_period: usize,

        /// Refit only the best candidate instead of the weighted ensemble.
        #[arg(long)]
        no_ensemble: bool,

        /// Prediction interval level.
        #[arg(long, default_value_t = 0.95)]
        level: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelChoice {
    /// Budgeted search over the full candidate pool.
    Search,
    /// Automatic ARIMA only.
    Arima,
}

impl std::fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelChoice::Search => f.write_str("search"),
            ModelChoice::Arima => f.write_str("arima"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tempcast=info")),
        )
        .init();

    let cli = Cli::parse();
    let options = CsvOptions {
        date_format: cli.date_format.clone(),
        date_column: cli.date_column,
        value_column: cli.value_column,
        series_name: None,
    };

    match cli.command {
        Command::Inspect { csv } => inspect(&csv, &options),
        Command::Analyze {
            csv,
            out_dir,
            max_lag,
            iqr_multiplier,
        } => analyze(&csv, &options, &out_dir, max_lag, iqr_multiplier),
        Command::Forecast {
            csv,
            out_dir,
            horizon,
            test_days,
            model,
            budget_secs,
            seasonal_period,
            no_ensemble,
            level,
        } => forecast(
            &csv,
            &options,
            &out_dir,
            horizon,
            test_days,
            model,
            budget_secs,
            seasonal_period,
            !no_ensemble,
            level,
        ),
    }
}

fn load(csv: &PathBuf, options: &CsvOptions) -> anyhow::Result<DailySeries> {
    let (series, report) = read_temperature_csv(csv, options)
        .with_context(|| format!("reading {}", csv.display()))?;
    info!(
        rows = report.rows_read,
        dropped = report.dropped(),
        duplicates = report.duplicate_dates,
        resorted = report.resorted,
        "loaded {}",
        csv.display()
    );
    Ok(series)
}

fn inspect(csv: &PathBuf, options: &CsvOptions) -> anyhow::Result<()> {
    let (series, report) = read_temperature_csv(csv, options)
        .with_context(|| format!("reading {}", csv.display()))?;
    let summary = series.summary();

    println!("series        {}", series.name());
    println!("rows read     {}", report.rows_read);
    println!("rows dropped  {} (bad dates: {}, bad values: {}, duplicates: {})",
        report.dropped(), report.bad_dates, report.bad_values, report.duplicate_dates);
    println!("observations  {}", summary.count);
    println!("missing       {}", summary.missing);
    println!("range         {} .. {}", summary.first_date, summary.last_date);
    println!("min / max     {:.2} / {:.2}", summary.min, summary.max);
    println!("mean / std    {:.2} / {:.2}", summary.mean, summary.std_dev);

    println!("head");
    for (date, value) in series.dates().iter().zip(series.values()).take(5) {
        println!("  {date}  {value:.1}");
    }
    Ok(())
}

fn analyze(
    csv: &PathBuf,
    options: &CsvOptions,
    out_dir: &PathBuf,
    max_lag: usize,
    iqr_multiplier: f64,
) -> anyhow::Result<()> {
    let series = load(csv, options)?.interpolate_missing(true);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    // Anomalies.
    let report = detect_anomalies(series.values(), &AnomalyConfig::iqr(iqr_multiplier));
    println!(
        "anomalies     {} of {} observations ({:.2}%)",
        report.count(),
        series.len(),
        report.share()
    );
    if let Some((lower, upper)) = report.bounds {
        println!("normal range  {lower:.2} .. {upper:.2}");
    }
    plot_anomalies(
        &series,
        &report,
        out_dir.join("anomalies.png"),
        &ChartStyle::default(),
    )?;

    // Seasonality.
    let seasonality = detect_seasonality(series.values(), &SeasonalityConfig::default())?;
    match seasonality.period {
        Some(period) => println!(
            "seasonality   period {} days (strength {:.2})",
            period, seasonality.strength
        ),
        None => println!("seasonality   none detected"),
    }
    let profile = monthly_profile(&series);
    println!("annual swing  {:.2} (warmest minus coldest monthly mean)", profile.amplitude());
    plot_monthly_profile(
        &profile,
        out_dir.join("monthly_profile.png"),
        &ChartStyle::default(),
    )?;

    // Autocorrelation.
    let lag = max_lag.min(series.len() - 1);
    let rho = acf(series.values(), lag)?;
    plot_acf(&rho, series.len(), out_dir.join("acf.png"), &ChartStyle::default())?;

    // Calendar features.
    let features = CalendarFeatures::from_series(&series);
    let columns = CalendarFeatures::column_names();
    println!(
        "calendar      {} rows, {} columns: {}",
        features.len(),
        columns.len(),
        columns.join(", ")
    );

    plot_series(&series, out_dir.join("series.png"), &ChartStyle::default())?;
    println!("charts        {}", out_dir.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn forecast(
    csv: &PathBuf,
    options: &CsvOptions,
    out_dir: &PathBuf,
    horizon: usize,
    test_days: usize,
    model: ModelChoice,
    budget_secs: u64,
    seasonal_period: usize,
    ensemble: bool,
    level: f64,
) -> anyhow::Result<()> {
    let series = load(csv, options)?.interpolate_missing(true);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let (train, test) = holdout_split(&series, test_days)?;
    info!(train = train.len(), test = test.len(), "holdout split");

    // Fit on the training head, score every evaluated model on the holdout
    // tail. The first entry is the selected model.
    let mut evaluated: Vec<(String, BoxedForecaster)> = Vec::new();
    let final_model: BoxedForecaster = match model {
        ModelChoice::Search => {
            let config = SearchConfig {
                time_budget: std::time::Duration::from_secs(budget_secs),
                seasonal_period,
                ensemble,
                ..SearchConfig::default()
            };
            let search = AutoSearch::with_config(config);
            let outcome = search.run(&train)?;
            println!("{}", outcome.leaderboard);
            if outcome.budget_exhausted {
                println!("(time budget exhausted before all candidates ran)");
            }
            println!("selected      {}", outcome.final_name);
            evaluated.push((outcome.final_name, outcome.model));

            // The classical ARIMA baseline is scored on the same holdout.
            let mut baseline = AutoArima::new();
            match baseline.fit(&train) {
                Ok(()) => evaluated.push((baseline.name().to_string(), Box::new(baseline))),
                Err(e) => warn!(error = %e, "arima baseline failed to fit"),
            }

            // Carry the training-split winner over to the full series
            // instead of searching again.
            let (full, _) = search.refit(&outcome.leaderboard, &series)?;
            full
        }
        ModelChoice::Arima => {
            let mut eval = AutoArima::new();
            eval.fit(&train)?;
            println!("selected      {}", eval.name());
            evaluated.push((eval.name().to_string(), Box::new(eval)));

            let mut full = AutoArima::new();
            full.fit(&series)?;
            Box::new(full)
        }
    };

    for (label, eval_model) in &evaluated {
        let holdout_forecast = eval_model.predict(test.len())?;
        let acc = accuracy_with_training(
            test.values(),
            holdout_forecast.point(),
            train.values(),
            seasonal_period.max(1),
        )?;
        println!("holdout       {label}");
        println!("  mae  {:.3}   rmse {:.3}   smape {:.2}%", acc.mae, acc.rmse, acc.smape);
        if let Some(mape) = acc.mape {
            println!("  mape {mape:.2}%");
        }
        if let Some(mase) = acc.mase {
            println!("  mase {mase:.3}");
        }
        if let Some(r2) = acc.r_squared {
            println!("  r²   {r2:.3}");
        }
    }

    let (selected_name, selected) = &evaluated[0];
    if let Some(residuals) = selected.residuals() {
        let params = selected.param_count();
        if let Ok(lb) = ljung_box(residuals, (params + 5).max(10), params) {
            println!("residuals     Ljung-Box Q = {:.2}, p = {:.3}", lb.statistic, lb.p_value);
        }
    }
    for row in calibration_table(selected.as_ref(), &test, &[0.8, 0.95])? {
        println!(
            "coverage      {:.0}% nominal, {:.1}% observed",
            row.level * 100.0,
            row.coverage * 100.0
        );
    }

    // Holdout comparison chart: the training tail, the selected model's
    // holdout forecast, and the actual holdout values.
    let holdout_fc = selected
        .predict_with_intervals(test.len(), level)?
        .with_dates(test.dates().to_vec())?;
    let tail_start = train.len().saturating_sub(4 * test.len().max(30));
    let tail = train.slice(tail_start, train.len())?;
    plot_forecast(
        &tail,
        &holdout_fc,
        Some(&test),
        out_dir.join("holdout.png"),
        &ChartStyle::titled(format!("{} holdout ({selected_name})", series.name())),
    )?;

    // Out-of-sample forecast from the model refit on the full series.
    let future = final_model
        .predict_with_intervals(horizon, level)?
        .with_dates(series.future_dates(horizon))?;
    plot_forecast(
        &series,
        &future,
        None,
        out_dir.join("forecast.png"),
        &ChartStyle::default(),
    )?;
    write_forecast_csv(out_dir.join("forecast.csv"), &future)?;
    println!("forecast      {} days -> {}", horizon, out_dir.display());
    Ok(())
}
