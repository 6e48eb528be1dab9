//! Forecast model parameters from environment variables.
//!
//! Only the commonly tuned knobs are exposed; the remaining training
//! parameters (batch size, early-stopping delta, validation share) keep their
//! defaults.

use super::EnvReader;
use crate::application::ml::model_config::ForecastConfig;
use anyhow::{Context, Result};

/// Forecast environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEnvConfig {
    pub lookback: usize,
    pub fallback_lookback: usize,
    pub train_ratio: f64,
    pub min_training_points: usize,
    pub max_horizon_days: usize,

    // Recurrent model
    pub neural_enabled: bool,
    pub neural_min_points: usize,
    pub hidden_size: usize,
    pub layers: usize,
    pub dropout: f64,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub patience: usize,
    pub seed: u64,
}

impl Default for ForecastEnvConfig {
    fn default() -> Self {
        let d = ForecastConfig::default();
        Self {
            lookback: d.lookback,
            fallback_lookback: d.fallback_lookback,
            train_ratio: d.train_ratio,
            min_training_points: d.min_training_points,
            max_horizon_days: d.max_horizon_days,
            neural_enabled: d.neural_enabled,
            neural_min_points: d.neural_min_points,
            hidden_size: d.hidden_size,
            layers: d.layers,
            dropout: d.dropout,
            learning_rate: d.learning_rate,
            max_epochs: d.max_epochs,
            patience: d.patience,
            seed: d.seed,
        }
    }
}

impl ForecastEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = EnvReader::new(lookup);
        let d = Self::default();
        Ok(Self {
            lookback: env.parse_usize("FORECAST_LOOKBACK", d.lookback)?,
            fallback_lookback: env
                .parse_usize("FORECAST_FALLBACK_LOOKBACK", d.fallback_lookback)?,
            train_ratio: env.parse_f64("FORECAST_TRAIN_RATIO", d.train_ratio)?,
            min_training_points: env
                .parse_usize("FORECAST_MIN_TRAINING_POINTS", d.min_training_points)?,
            max_horizon_days: env.parse_usize("FORECAST_MAX_HORIZON_DAYS", d.max_horizon_days)?,
            neural_enabled: env.parse_bool("FORECAST_NEURAL_ENABLED", d.neural_enabled)?,
            neural_min_points: env.parse_usize("FORECAST_NEURAL_MIN_POINTS", d.neural_min_points)?,
            hidden_size: env.parse_usize("FORECAST_HIDDEN_SIZE", d.hidden_size)?,
            layers: env.parse_usize("FORECAST_LAYERS", d.layers)?,
            dropout: env.parse_f64("FORECAST_DROPOUT", d.dropout)?,
            learning_rate: env.parse_f64("FORECAST_LEARNING_RATE", d.learning_rate)?,
            max_epochs: env.parse_usize("FORECAST_MAX_EPOCHS", d.max_epochs)?,
            patience: env.parse_usize("FORECAST_PATIENCE", d.patience)?,
            seed: env.parse_u64("FORECAST_SEED", d.seed)?,
        })
    }

    pub fn to_forecast_config(&self) -> Result<ForecastConfig> {
        let config = ForecastConfig {
            lookback: self.lookback,
            fallback_lookback: self.fallback_lookback,
            train_ratio: self.train_ratio,
            min_training_points: self.min_training_points,
            max_horizon_days: self.max_horizon_days,
            neural_enabled: self.neural_enabled,
            neural_min_points: self.neural_min_points,
            hidden_size: self.hidden_size,
            layers: self.layers,
            dropout: self.dropout,
            learning_rate: self.learning_rate,
            max_epochs: self.max_epochs,
            patience: self.patience,
            seed: self.seed,
            ..ForecastConfig::default()
        };
        config.validate().context("Invalid forecast config")?;
        Ok(config)
    }
}
