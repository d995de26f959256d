//! Shared numerical utilities.

pub mod optim;
pub mod stats;

pub use optim::{nelder_mead, SimplexOptions, SimplexOutcome};
pub use stats::{mean, median, normal_quantile, quantile, std_dev, variance};
