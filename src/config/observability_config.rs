//! Logging configuration from environment variables.

use super::EnvReader;
use anyhow::Result;
use std::str::FromStr;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid LOG_FORMAT: {}. Must be 'pretty' or 'json'", s),
        }
    }
}

/// Observability environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityEnvConfig {
    pub log_format: LogFormat,
    /// `EnvFilter` directives, e.g. `info,pricecast=debug`.
    pub log_filter: String,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_filter: "info".to_string(),
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = EnvReader::new(lookup);
        let d = Self::default();
        let log_format = match env.get("LOG_FORMAT") {
            Some(raw) => LogFormat::from_str(&raw)?,
            None => d.log_format,
        };
        Ok(Self {
            log_format,
            log_filter: env.get("RUST_LOG").unwrap_or(d.log_filter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observability_config_defaults() {
        let config = ObservabilityEnvConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());

        let config = ObservabilityEnvConfig::from_lookup(|k| match k {
            "LOG_FORMAT" => Some("json".to_string()),
            "RUST_LOG" => Some("debug".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_filter, "debug");
    }
}
