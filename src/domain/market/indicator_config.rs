use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};

/// Periods and thresholds for the standard indicator set and signal votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    // Moving averages (short/medium and medium/long form the cross pairs)
    pub sma_short_period: usize,
    pub sma_medium_period: usize,
    pub sma_long_period: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,

    // RSI
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,

    // MACD
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_short_period: 20,
            sma_medium_period: 50,
            sma_long_period: 200,
            ema_fast_period: 12,
            ema_slow_period: 26,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        let periods = [
            ("sma_short_period", self.sma_short_period),
            ("sma_medium_period", self.sma_medium_period),
            ("sma_long_period", self.sma_long_period),
            ("ema_fast_period", self.ema_fast_period),
            ("ema_slow_period", self.ema_slow_period),
            ("rsi_period", self.rsi_period),
            ("macd_fast_period", self.macd_fast_period),
            ("macd_slow_period", self.macd_slow_period),
            ("macd_signal_period", self.macd_signal_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(AnalyticsError::invalid(format!("{} must be positive", name)));
        }

        if !(self.sma_short_period < self.sma_medium_period
            && self.sma_medium_period < self.sma_long_period)
        {
            return Err(AnalyticsError::invalid(format!(
                "SMA periods must be strictly increasing, got {}/{}/{}",
                self.sma_short_period, self.sma_medium_period, self.sma_long_period
            )));
        }
        if self.ema_fast_period >= self.ema_slow_period {
            return Err(AnalyticsError::invalid("ema_fast_period must be below ema_slow_period"));
        }
        if self.macd_fast_period >= self.macd_slow_period {
            return Err(AnalyticsError::invalid(
                "macd_fast_period must be below macd_slow_period",
            ));
        }

        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.rsi_oversold)
            || !in_range(self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(AnalyticsError::invalid(format!(
                "RSI thresholds must satisfy 0 <= oversold < overbought <= 100, got {}/{}",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(IndicatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_and_inverted_periods() {
        let zero = IndicatorConfig {
            rsi_period: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let inverted = IndicatorConfig {
            macd_fast_period: 26,
            macd_slow_period: 12,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_rejects_crossed_rsi_thresholds() {
        let config = IndicatorConfig {
            rsi_oversold: 80.0,
            rsi_overbought: 20.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
