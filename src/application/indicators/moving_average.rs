//! Simple and exponential moving averages over closing prices.

use super::check_input;
use crate::domain::errors::AnalyticsResult;
use crate::domain::market::indicator_set::IndicatorValue;

/// Rolling arithmetic mean. The first `period - 1` outputs are not available.
pub fn sma(closes: &[f64], period: usize) -> AnalyticsResult<Vec<IndicatorValue>> {
    check_input("SMA", closes.len(), period)?;

    let mut out = vec![None; closes.len()];
    for (end, window) in closes.windows(period).enumerate() {
        out[end + period - 1] = Some(window.iter().sum::<f64>() / period as f64);
    }
    Ok(out)
}

/// Exponential moving average with `alpha = 2 / (period + 1)`, seeded with
/// the SMA of the first `period` closes.
pub fn ema(closes: &[f64], period: usize) -> AnalyticsResult<Vec<IndicatorValue>> {
    check_input("EMA", closes.len(), period)?;
    let values: Vec<IndicatorValue> = closes.iter().copied().map(Some).collect();
    Ok(ema_of_defined(&values, period))
}

/// EMA over a series that may start with (or contain) unavailable values.
///
/// Seeding restarts after every gap: the first `period` defined values of a
/// run are averaged and placed at the last of them.
pub(crate) fn ema_of_defined(values: &[IndicatorValue], period: usize) -> Vec<IndicatorValue> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut seed_sum = 0.0;
    let mut seed_count = 0usize;
    let mut prev: Option<f64> = None;

    for value in values {
        match (value, prev) {
            (None, _) => {
                seed_sum = 0.0;
                seed_count = 0;
                prev = None;
                out.push(None);
            }
            (Some(x), Some(p)) => {
                let next = alpha * x + (1.0 - alpha) * p;
                prev = Some(next);
                out.push(prev);
            }
            (Some(x), None) => {
                seed_sum += x;
                seed_count += 1;
                if seed_count == period {
                    prev = Some(seed_sum / period as f64);
                }
                out.push(prev);
            }
        }
    }
    out
}
