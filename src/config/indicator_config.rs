//! Indicator periods and RSI thresholds from environment variables.

use super::EnvReader;
use crate::domain::market::indicator_config::IndicatorConfig;
use anyhow::{Context, Result};

/// Indicator environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorEnvConfig {
    // Moving averages
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

impl Default for IndicatorEnvConfig {
    fn default() -> Self {
        let d = IndicatorConfig::default();
        Self {
            sma_short_period: d.sma_short_period,
            sma_medium_period: d.sma_medium_period,
            sma_long_period: d.sma_long_period,
            ema_fast_period: d.ema_fast_period,
            ema_slow_period: d.ema_slow_period,
            rsi_period: d.rsi_period,
            rsi_oversold: d.rsi_oversold,
            rsi_overbought: d.rsi_overbought,
            macd_fast_period: d.macd_fast_period,
            macd_slow_period: d.macd_slow_period,
            macd_signal_period: d.macd_signal_period,
        }
    }
}

impl IndicatorEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = EnvReader::new(lookup);
        let d = Self::default();
        Ok(Self {
            sma_short_period: env.parse_usize("SMA_SHORT_PERIOD", d.sma_short_period)?,
            sma_medium_period: env.parse_usize("SMA_MEDIUM_PERIOD", d.sma_medium_period)?,
            sma_long_period: env.parse_usize("SMA_LONG_PERIOD", d.sma_long_period)?,
            ema_fast_period: env.parse_usize("EMA_FAST_PERIOD", d.ema_fast_period)?,
            ema_slow_period: env.parse_usize("EMA_SLOW_PERIOD", d.ema_slow_period)?,
            rsi_period: env.parse_usize("RSI_PERIOD", d.rsi_period)?,
            rsi_oversold: env.parse_f64("RSI_OVERSOLD", d.rsi_oversold)?,
            rsi_overbought: env.parse_f64("RSI_OVERBOUGHT", d.rsi_overbought)?,
            macd_fast_period: env.parse_usize("MACD_FAST_PERIOD", d.macd_fast_period)?,
            macd_slow_period: env.parse_usize("MACD_SLOW_PERIOD", d.macd_slow_period)?,
            macd_signal_period: env.parse_usize("MACD_SIGNAL_PERIOD", d.macd_signal_period)?,
        })
    }

    /// Validated domain value object.
    pub fn to_indicator_config(&self) -> Result<IndicatorConfig> {
        let config = IndicatorConfig {
            sma_short_period: self.sma_short_period,
            sma_medium_period: self.sma_medium_period,
            sma_long_period: self.sma_long_period,
            ema_fast_period: self.ema_fast_period,
            ema_slow_period: self.ema_slow_period,
            rsi_period: self.rsi_period,
            rsi_oversold: self.rsi_oversold,
            rsi_overbought: self.rsi_overbought,
            macd_fast_period: self.macd_fast_period,
            macd_slow_period: self.macd_slow_period,
            macd_signal_period: self.macd_signal_period,
        };
        config.validate().context("Invalid indicator config")?;
        Ok(config)
    }
}
