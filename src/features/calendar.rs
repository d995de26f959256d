//! Calendar feature augmentation for a daily series.

use crate::core::DailySeries;
use chrono::{Datelike, NaiveDate, Weekday};

/// Calendar fields derived from one observation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarRow {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u32,
    pub day_of_year: u32,
    /// ISO 8601 week number.
    pub iso_week: u32,
    /// 1..=4.
    pub quarter: u32,
    pub is_weekend: bool,
}

impl CalendarRow {
    /// Derive calendar fields for a single date.
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            year: date.year(),
            month,
            day: date.day(),
            day_of_week: date.weekday().num_days_from_monday(),
            day_of_year: date.ordinal(),
            iso_week: date.iso_week().week(),
            quarter: (month - 1) / 3 + 1,
            is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }
}

/// Column-oriented calendar features for a whole series, the augmentation
/// step that turns the raw (date, value) table into a modeling table.
#[derive(Debug, Clone)]
pub struct CalendarFeatures {
    rows: Vec<CalendarRow>,
}

impl CalendarFeatures {
    /// Derive features for every observation in the series.
    pub fn from_series(series: &DailySeries) -> Self {
        Self {
            rows: series.dates().iter().map(|&d| CalendarRow::from_date(d)).collect(),
        }
    }

    /// Number of rows (equals the series length).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows are present.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row access.
    pub fn rows(&self) -> &[CalendarRow] {
        &self.rows
    }

    /// A named feature as an `f64` column, for downstream consumers that
    /// want a numeric matrix. Returns `None` for unknown names.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col: fn(&CalendarRow) -> f64 = match name {
            "year" => |r| r.year as f64,
            "month" => |r| r.month as f64,
            "day" => |r| r.day as f64,
            "day_of_week" => |r| r.day_of_week as f64,
            "day_of_year" => |r| r.day_of_year as f64,
            "iso_week" => |r| r.iso_week as f64,
            "quarter" => |r| r.quarter as f64,
            "is_weekend" => |r| if r.is_weekend { 1.0 } else { 0.0 },
            _ => return None,
        };
        Some(self.rows.iter().map(col).collect())
    }

    /// Names accepted by [`CalendarFeatures::column`].
    pub fn column_names() -> &'static [&'static str] {
        &[
            "year",
            "month",
            "day",
            "day_of_week",
            "day_of_year",
            "iso_week",
            "quarter",
            "is_weekend",
        ]
    }
}
