//! Indicator engine: pure numeric functions over closing prices.
//!
//! Every function returns one value per input close; positions without
//! enough history are `None` rather than zero.

pub mod engine;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use engine::compute_indicator_set;
pub use macd::{MacdSeries, macd};
pub use moving_average::{ema, sma};
pub use rsi::rsi;

use crate::domain::errors::{AnalyticsError, AnalyticsResult};

fn check_input(indicator: &str, len: usize, period: usize) -> AnalyticsResult<()> {
    if period == 0 {
        return Err(AnalyticsError::invalid(format!(
            "{} period must be positive",
            indicator
        )));
    }
    if len == 0 {
        return Err(AnalyticsError::invalid(format!(
            "{} requires a non-empty price series",
            indicator
        )));
    }
    Ok(())
}
