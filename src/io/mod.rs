//! CSV ingestion and cleaning for (date, temperature) tables.

use crate::core::{DailySeries, Forecast};
use crate::error::{Result, TempcastError};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Options for reading a temperature CSV.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Format string for the date column.
    pub date_format: String,
    /// Zero-based index of the date column.
    pub date_column: usize,
    /// Zero-based index of the value column.
    pub value_column: usize,
    /// Name to give the value series (header label used when `None`).
    pub series_name: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            date_column: 0,
            value_column: 1,
            series_name: None,
        }
    }
}

/// What the cleaning pass did to the raw rows.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    /// Data rows read from the file (excluding the header).
    pub rows_read: usize,
    /// Rows dropped because the date failed to parse.
    pub bad_dates: usize,
    /// Rows dropped because the value was missing or non-numeric.
    pub bad_values: usize,
    /// Rows dropped because their date repeated an earlier row.
    pub duplicate_dates: usize,
    /// Whether the input needed re-sorting by date.
    pub resorted: bool,
}

impl CleanReport {
    /// Total rows removed by cleaning.
    pub fn dropped(&self) -> usize {
        self.bad_dates + self.bad_values + self.duplicate_dates
    }
}

/// Read a daily temperature CSV, clean it, and return the series together
/// with a report of what was dropped.
///
/// Cleaning mirrors what a careful analyst does by hand: unparseable dates
/// and non-numeric or empty temperatures are removed, stray `?` prefixes on
/// numbers (a known artifact of this dataset) are stripped, rows are sorted
/// by date and duplicate dates keep their first occurrence.
pub fn read_temperature_csv(
    path: impl AsRef<Path>,
    options: &CsvOptions,
) -> Result<(DailySeries, CleanReport)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())?;

    let headers = reader.headers()?.clone();
    let series_name = options.series_name.clone().unwrap_or_else(|| {
        headers
            .get(options.value_column)
            .unwrap_or("value")
            .to_string()
    });

    let mut report = CleanReport::default();
    let mut rows: Vec<(NaiveDate, f64)> = Vec::new();

    for record in reader.records() {
        let record = record?;
        report.rows_read += 1;

        let date_field = record.get(options.date_column).unwrap_or("").trim();
        let date = match NaiveDate::parse_from_str(date_field, &options.date_format) {
            Ok(d) => d,
            Err(_) => {
                report.bad_dates += 1;
                debug!(row = report.rows_read, field = date_field, "dropping row: bad date");
                continue;
            }
        };

        let value_field = record.get(options.value_column).unwrap_or("").trim();
        match parse_temperature(value_field) {
            Some(v) => rows.push((date, v)),
            None => {
                report.bad_values += 1;
                debug!(row = report.rows_read, field = value_field, "dropping row: bad value");
            }
        }
    }

    if rows.is_empty() {
        return Err(TempcastError::EmptyData);
    }

    // Sort by date, then drop duplicates keeping the first occurrence.
    let already_sorted = rows.windows(2).all(|w| w[0].0 < w[1].0);
    if !already_sorted {
        rows.sort_by_key(|(date, _)| *date);
        report.resorted = true;
    }
    let mut deduped: Vec<(NaiveDate, f64)> = Vec::with_capacity(rows.len());
    for (date, value) in rows {
        match deduped.last() {
            Some((prev, _)) if *prev == date => report.duplicate_dates += 1,
            _ => deduped.push((date, value)),
        }
    }

    if report.dropped() > 0 {
        warn!(
            bad_dates = report.bad_dates,
            bad_values = report.bad_values,
            duplicates = report.duplicate_dates,
            "cleaning dropped {} of {} rows",
            report.dropped(),
            report.rows_read
        );
    }

    let (dates, values): (Vec<NaiveDate>, Vec<f64>) = deduped.into_iter().unzip();
    let series = DailySeries::new(dates, values, series_name)?;
    Ok((series, report))
}

/// One exported forecast step.
#[derive(Debug, Serialize)]
struct ForecastRow {
    date: String,
    point: f64,
    lower: Option<f64>,
    upper: Option<f64>,
}

/// Write a forecast (with attached horizon dates) as a CSV table with
/// `date,point,lower,upper` columns.
pub fn write_forecast_csv(path: impl AsRef<Path>, forecast: &Forecast) -> Result<()> {
    if forecast.dates().len() != forecast.horizon() {
        return Err(TempcastError::InvalidParameter(
            "forecast carries no horizon dates".to_string(),
        ));
    }

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for (h, date) in forecast.dates().iter().enumerate() {
        writer.serialize(ForecastRow {
            date: date.format("%Y-%m-%d").to_string(),
            point: forecast.point()[h],
            lower: forecast.lower().map(|l| l[h]),
            upper: forecast.upper().map(|u| u[h]),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse a temperature field, tolerating a stray leading `?`.
fn parse_temperature(field: &str) -> Option<f64> {
    if field.is_empty() || field.eq_ignore_ascii_case("na") || field == "?" {
        return None;
    }
    let cleaned = field.strip_prefix('?').unwrap_or(field);
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
