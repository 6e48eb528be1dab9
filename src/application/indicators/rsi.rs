//! Relative Strength Index with Wilder smoothing.

use super::check_input;
use crate::domain::errors::AnalyticsResult;
use crate::domain::market::indicator_set::IndicatorValue;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// RSI series. The first average gain/loss is the mean of the first `period`
/// changes and is placed at index `period`; later values use
/// `avg = (avg * (period - 1) + x) / period`.
///
/// A zero average loss yields 100 (this includes a perfectly flat series),
/// a zero average gain yields 0.
pub fn rsi(closes: &[f64], period: usize) -> AnalyticsResult<Vec<IndicatorValue>> {
    check_input("RSI", closes.len(), period)?;

    let mut out = vec![None; closes.len()];
    if closes.len() <= period {
        return Ok(out);
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    let weight = (period - 1) as f64;
    for i in period..gains.len() {
        avg_gain = (avg_gain * weight + gains[i]) / period as f64;
        avg_loss = (avg_loss * weight + losses[i]) / period as f64;
        // change i sits between closes i and i + 1
        out[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    Ok(out)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    if avg_gain == 0.0 {
        return 0.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
