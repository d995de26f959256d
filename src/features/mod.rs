//! Feature engineering: calendar augmentation and autocorrelation.

mod autocorrelation;
mod calendar;

pub use autocorrelation::{acf, acf_confidence_bound, pacf};
pub use calendar::{CalendarFeatures, CalendarRow};
