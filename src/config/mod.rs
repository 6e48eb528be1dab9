//! Configuration module for pricecast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Indicators, Forecast, Registry, and Observability.

mod forecast_config;
mod indicator_config;
mod observability_config;
mod registry_config;

pub use forecast_config::ForecastEnvConfig;
pub use indicator_config::IndicatorEnvConfig;
pub use observability_config::{LogFormat, ObservabilityEnvConfig};
pub use registry_config::RegistryEnvConfig;

use anyhow::{Context, Result};
use std::str::FromStr;

/// Typed access to a key/value source such as the process environment.
pub(crate) struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    pub(crate) fn new(lookup: F) -> Self {
        Self { lookup }
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr + ToString,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(key)
            .unwrap_or_else(|| default.to_string())
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key))
    }

    pub(crate) fn parse_usize(&self, key: &str, default: usize) -> Result<usize> {
        self.parse(key, default)
    }

    pub(crate) fn parse_u64(&self, key: &str, default: u64) -> Result<u64> {
        self.parse(key, default)
    }

    pub(crate) fn parse_f64(&self, key: &str, default: f64) -> Result<f64> {
        self.parse(key, default)
    }

    pub(crate) fn parse_bool(&self, key: &str, default: bool) -> Result<bool> {
        self.parse(key, default)
    }
}

/// Full configuration, one section per concern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsConfig {
    pub indicators: IndicatorEnvConfig,
    pub forecast: ForecastEnvConfig,
    pub registry: RegistryEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl AnalyticsConfig {
    /// Loads `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            indicators: IndicatorEnvConfig::from_lookup(&lookup)
                .context("Failed to load indicator config")?,
            forecast: ForecastEnvConfig::from_lookup(&lookup)
                .context("Failed to load forecast config")?,
            registry: RegistryEnvConfig::from_lookup(&lookup)
                .context("Failed to load registry config")?,
            observability: ObservabilityEnvConfig::from_lookup(&lookup)
                .context("Failed to load observability config")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every section against its domain invariants.
    pub fn validate(&self) -> Result<()> {
        self.indicators.to_indicator_config()?;
        self.forecast.to_forecast_config()?;
        self.registry.to_registry_config()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = AnalyticsConfig::from_lookup(|_| None).expect("Should parse with defaults");
        assert_eq!(config, AnalyticsConfig::default());
        assert_eq!(config.indicators.sma_short_period, 20);
        assert_eq!(config.forecast.lookback, 60);
    }

    #[test]
    fn test_config_error_names_section_and_key() {
        let err = AnalyticsConfig::from_lookup(|k| {
            (k == "MODEL_RETENTION").then(|| "many".to_string())
        })
        .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("registry config"));
        assert!(msg.contains("MODEL_RETENTION"));
    }

    #[test]
    fn test_config_rejects_invalid_periods() {
        let result = AnalyticsConfig::from_lookup(|k| {
            (k == "SMA_SHORT_PERIOD").then(|| "0".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let env = EnvReader::new(|_: &str| Some(" 7 ".to_string()));
        assert_eq!(env.parse_usize("ANY", 1).unwrap(), 7);
    }
}
