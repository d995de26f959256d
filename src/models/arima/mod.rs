//! ARIMA models: differencing utilities, the ARIMA(p,d,q) model fit by
//! conditional least squares, and automatic order selection.

mod auto;
mod diff;
mod model;

pub use auto::{AutoArima, AutoArimaConfig};
pub use diff::{difference, integrate, suggest_differencing};
pub use model::{Arima, ArimaOrder};
