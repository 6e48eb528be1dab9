//! Moving Average Convergence Divergence.

use super::check_input;
use super::moving_average::{ema, ema_of_defined};
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::market::indicator_set::IndicatorValue;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<IndicatorValue>,
    pub signal: Vec<IndicatorValue>,
    pub histogram: Vec<IndicatorValue>,
}

/// MACD line = EMA(fast) - EMA(slow); signal = EMA(line, signal) seeded from
/// the first `signal` defined line values; histogram = line - signal.
pub fn macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> AnalyticsResult<MacdSeries> {
    check_input("MACD", closes.len(), fast)?;
    check_input("MACD", closes.len(), slow)?;
    check_input("MACD", closes.len(), signal)?;
    if fast >= slow {
        return Err(AnalyticsError::invalid(format!(
            "MACD fast period {} must be below slow period {}",
            fast, slow
        )));
    }

    let fast_ema = ema(closes, fast)?;
    let slow_ema = ema(closes, slow)?;

    let line: Vec<IndicatorValue> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_of_defined(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    Ok(MacdSeries {
        line,
        signal: signal_line,
        histogram,
    })
}
