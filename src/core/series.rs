//! Daily univariate time series.

use crate::error::{Result, TempcastError};
use crate::utils::stats;
use chrono::{Duration, NaiveDate};

/// A univariate series of daily observations.
///
/// Dates are strictly increasing; gaps are allowed (the source data may skip
/// days) but duplicates and out-of-order rows are rejected at construction.
#[derive(Debug, Clone)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    name: String,
}

/// Summary statistics for a series, used by the CLI `inspect` command.
#[derive(Debug, Clone)]
pub struct SeriesSummary {
    pub count: usize,
    pub missing: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl DailySeries {
    /// Create a new series, validating that dates and values are paired and
    /// dates are strictly increasing.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>, name: impl Into<String>) -> Result<Self> {
        if dates.is_empty() {
            return Err(TempcastError::EmptyData);
        }
        if dates.len() != values.len() {
            return Err(TempcastError::LengthMismatch {
                expected: dates.len(),
                got: values.len(),
            });
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(TempcastError::DateOrder(format!(
                    "{} does not follow {}",
                    pair[1], pair[0]
                )));
            }
        }
        Ok(Self {
            dates,
            values,
            name: name.into(),
        })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Observation dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Observation values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Series name (the value column label).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First observation date.
    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last observation date.
    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Whether any value is NaN or infinite.
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Copy of the series with non-finite values removed.
    pub fn drop_missing(&self) -> Result<DailySeries> {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.values[i].is_finite())
            .collect();
        if keep.is_empty() {
            return Err(TempcastError::EmptyData);
        }
        Ok(DailySeries {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            values: keep.iter().map(|&i| self.values[i]).collect(),
            name: self.name.clone(),
        })
    }

    /// Copy of the series with NaN runs linearly interpolated between their
    /// finite neighbors. Leading and trailing runs are filled with the nearest
    /// finite value when `fill_edges` is set, otherwise left as NaN.
    pub fn interpolate_missing(&self, fill_edges: bool) -> DailySeries {
        let mut values = self.values.clone();
        let n = values.len();

        let mut i = 0;
        while i < n {
            if values[i].is_finite() {
                i += 1;
                continue;
            }
            let start = i;
            while i < n && !values[i].is_finite() {
                i += 1;
            }
            let end = i; // exclusive

            let left = (start > 0).then(|| values[start - 1]);
            let right = (end < n).then(|| values[end]);

            match (left, right) {
                (Some(l), Some(r)) => {
                    let segments = (end - start + 1) as f64;
                    for (k, idx) in (start..end).enumerate() {
                        let t = (k + 1) as f64 / segments;
                        values[idx] = l + t * (r - l);
                    }
                }
                (Some(l), None) if fill_edges => values[start..end].fill(l),
                (None, Some(r)) if fill_edges => values[start..end].fill(r),
                _ => {}
            }
        }

        DailySeries {
            dates: self.dates.clone(),
            values,
            name: self.name.clone(),
        }
    }

    /// Extract the half-open range `[start, end)` as a new series.
    pub fn slice(&self, start: usize, end: usize) -> Result<DailySeries> {
        if start >= end {
            return Err(TempcastError::InvalidParameter(
                "slice start must be before end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(TempcastError::InvalidParameter(format!(
                "slice end {} exceeds length {}",
                end,
                self.len()
            )));
        }
        Ok(DailySeries {
            dates: self.dates[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            name: self.name.clone(),
        })
    }

    /// Split into a leading and trailing part, with `n_tail` observations in
    /// the trailing part.
    pub fn split_tail(&self, n_tail: usize) -> Result<(DailySeries, DailySeries)> {
        if n_tail == 0 || n_tail >= self.len() {
            return Err(TempcastError::InvalidParameter(format!(
                "tail size {} must be between 1 and {}",
                n_tail,
                self.len() - 1
            )));
        }
        let cut = self.len() - n_tail;
        Ok((self.slice(0, cut)?, self.slice(cut, self.len())?))
    }

    /// Dates for the `horizon` days following the last observation.
    pub fn future_dates(&self, horizon: usize) -> Vec<NaiveDate> {
        let last = self.last_date();
        (1..=horizon as i64)
            .map(|offset| last + Duration::days(offset))
            .collect()
    }

    /// Summary statistics over the finite values.
    pub fn summary(&self) -> SeriesSummary {
        let finite: Vec<f64> = self.values.iter().copied().filter(|v| v.is_finite()).collect();
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        SeriesSummary {
            count: self.len(),
            missing: self.len() - finite.len(),
            min,
            max,
            mean: stats::mean(&finite),
            std_dev: stats::std_dev(&finite),
            first_date: self.first_date(),
            last_date: self.last_date(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(1981, 1, 1).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    #[test]
    fn constructs_valid_series() {
        let series = DailySeries::new(make_dates(5), vec![20.7, 17.9, 18.8, 14.6, 15.8], "temp")
            .unwrap();
        assert_eq!(series.len(), 5);
        assert!(!series.is_empty());
        assert_eq!(series.name(), "temp");
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(1981, 1, 1).unwrap());
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(1981, 1, 5).unwrap());
    }

    #[test]
    fn rejects_empty_and_mismatched_input() {
        assert!(matches!(
            DailySeries::new(vec![], vec![], "temp"),
            Err(TempcastError::EmptyData)
        ));
        assert!(matches!(
            DailySeries::new(make_dates(3), vec![1.0, 2.0], "temp"),
            Err(TempcastError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_and_backward_dates() {
        let mut dates = make_dates(3);
        dates[2] = dates[1]; // duplicate
        let result = DailySeries::new(dates, vec![1.0, 2.0, 3.0], "temp");
        assert!(matches!(result, Err(TempcastError::DateOrder(_))));

        let mut dates = make_dates(3);
        dates.swap(1, 2); // backward
        let result = DailySeries::new(dates, vec![1.0, 2.0, 3.0], "temp");
        assert!(matches!(result, Err(TempcastError::DateOrder(_))));
    }

    #[test]
    fn drop_missing_removes_non_finite_rows() {
        let series =
            DailySeries::new(make_dates(5), vec![1.0, f64::NAN, 3.0, f64::INFINITY, 5.0], "temp")
                .unwrap();
        assert!(series.has_missing());

        let cleaned = series.drop_missing().unwrap();
        assert_eq!(cleaned.len(), 3);
        assert_eq!(cleaned.values(), &[1.0, 3.0, 5.0]);
        assert_eq!(cleaned.dates()[1], NaiveDate::from_ymd_opt(1981, 1, 3).unwrap());
    }

    #[test]
    fn drop_missing_on_all_nan_errors() {
        let series = DailySeries::new(make_dates(2), vec![f64::NAN, f64::NAN], "temp").unwrap();
        assert!(matches!(series.drop_missing(), Err(TempcastError::EmptyData)));
    }

    #[test]
    fn interpolation_fills_interior_gaps() {
        let series =
            DailySeries::new(make_dates(5), vec![1.0, f64::NAN, f64::NAN, 4.0, 5.0], "temp")
                .unwrap();
        let filled = series.interpolate_missing(true);
        assert_relative_eq!(filled.values()[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(filled.values()[2], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn interpolation_edge_behavior() {
        let series =
            DailySeries::new(make_dates(4), vec![f64::NAN, 2.0, 3.0, f64::NAN], "temp").unwrap();

        let filled = series.interpolate_missing(true);
        assert_relative_eq!(filled.values()[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(filled.values()[3], 3.0, epsilon = 1e-10);

        let untouched = series.interpolate_missing(false);
        assert!(untouched.values()[0].is_nan());
        assert!(untouched.values()[3].is_nan());
    }

    #[test]
    fn split_tail_partitions_series() {
        let series = DailySeries::new(make_dates(10), (0..10).map(f64::from).collect(), "temp")
            .unwrap();
        let (train, test) = series.split_tail(3).unwrap();
        assert_eq!(train.len(), 7);
        assert_eq!(test.len(), 3);
        assert_eq!(test.values(), &[7.0, 8.0, 9.0]);

        assert!(series.split_tail(0).is_err());
        assert!(series.split_tail(10).is_err());
    }

    #[test]
    fn future_dates_continue_daily() {
        let series = DailySeries::new(make_dates(3), vec![1.0, 2.0, 3.0], "temp").unwrap();
        let future = series.future_dates(2);
        assert_eq!(future[0], NaiveDate::from_ymd_opt(1981, 1, 4).unwrap());
        assert_eq!(future[1], NaiveDate::from_ymd_opt(1981, 1, 5).unwrap());
    }

    #[test]
    fn summary_ignores_missing_values() {
        let series =
            DailySeries::new(make_dates(4), vec![1.0, f64::NAN, 3.0, 5.0], "temp").unwrap();
        let summary = series.summary();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.missing, 1);
        assert_relative_eq!(summary.min, 1.0, epsilon = 1e-12);
        assert_relative_eq!(summary.max, 5.0, epsilon = 1e-12);
        assert_relative_eq!(summary.mean, 3.0, epsilon = 1e-12);
    }
}
