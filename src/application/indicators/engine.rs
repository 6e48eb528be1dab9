use super::{ema, macd, rsi, sma};
use crate::domain::errors::AnalyticsResult;
use crate::domain::market::indicator_config::IndicatorConfig;
use crate::domain::market::indicator_set::{IndicatorSet, names};
use crate::domain::market::price_series::PriceSeries;
use tracing::debug;

/// Computes the standard indicator set (three SMAs, two EMAs, RSI and MACD)
/// for every date of the series.
pub fn compute_indicator_set(
    series: &PriceSeries,
    config: &IndicatorConfig,
) -> AnalyticsResult<IndicatorSet> {
    config.validate()?;
    let closes = series.closes();
    let mut set = IndicatorSet::new(series.symbol(), series.dates());

    for period in [
        config.sma_short_period,
        config.sma_medium_period,
        config.sma_long_period,
    ] {
        set.insert(names::sma(period), sma(&closes, period)?)?;
    }
    for period in [config.ema_fast_period, config.ema_slow_period] {
        set.insert(names::ema(period), ema(&closes, period)?)?;
    }
    set.insert(
        names::rsi(config.rsi_period),
        rsi(&closes, config.rsi_period)?,
    )?;

    let macd_series = macd(
        &closes,
        config.macd_fast_period,
        config.macd_slow_period,
        config.macd_signal_period,
    )?;
    set.insert(names::MACD_LINE, macd_series.line)?;
    set.insert(names::MACD_SIGNAL, macd_series.signal)?;
    set.insert(names::MACD_HISTOGRAM, macd_series.histogram)?;

    debug!(
        "IndicatorEngine [{}]: computed {} indicators over {} closes",
        series.symbol(),
        set.names().count(),
        closes.len()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(n: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..n).map(|i| 50.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        PriceSeries::from_closes("MSFT", start, &closes).unwrap()
    }

    #[test]
    fn test_standard_set_names() {
        let set = compute_indicator_set(&series(30), &IndicatorConfig::default()).unwrap();
        let names: Vec<&str> = set.names().collect();
        for expected in [
            "sma_20",
            "sma_50",
            "sma_200",
            "ema_12",
            "ema_26",
            "rsi_14",
            "macd_line",
            "macd_signal",
            "macd_histogram",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_long_sma_unavailable_on_short_history() {
        let set = compute_indicator_set(&series(120), &IndicatorConfig::default()).unwrap();
        assert!(set.values("sma_200").unwrap().iter().all(Option::is_none));
        assert!(set.latest()["sma_50"].is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = IndicatorConfig {
            sma_short_period: 0,
            ..Default::default()
        };
        assert!(compute_indicator_set(&series(30), &config).is_err());
    }
}
