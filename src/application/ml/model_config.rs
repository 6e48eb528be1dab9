use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Training and forecasting parameters shared by both model variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Input window of the recurrent model.
    pub lookback: usize,
    /// Input window of the linear fallback.
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
    pub batch_size: usize,
    pub max_epochs: usize,
    pub patience: usize,
    pub min_delta: f64,
    /// Share of training windows held back for early stopping.
    pub validation_ratio: f64,
    pub seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            fallback_lookback: 10,
            train_ratio: 0.8,
            min_training_points: 60,
            max_horizon_days: 365,
            neural_enabled: true,
            neural_min_points: 60,
            hidden_size: 24,
            layers: 2,
            dropout: 0.2,
            learning_rate: 0.05,
            batch_size: 32,
            max_epochs: 200,
            patience: 10,
            min_delta: 1e-7,
            validation_ratio: 0.1,
            seed: 42,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        let positive = [
            ("lookback", self.lookback),
            ("fallback_lookback", self.fallback_lookback),
            ("min_training_points", self.min_training_points),
            ("max_horizon_days", self.max_horizon_days),
            ("hidden_size", self.hidden_size),
            ("layers", self.layers),
            ("batch_size", self.batch_size),
            ("max_epochs", self.max_epochs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(AnalyticsError::invalid(format!("{} must be positive", name)));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(AnalyticsError::invalid(format!(
                "train_ratio must be in (0, 1), got {}",
                self.train_ratio
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(AnalyticsError::invalid(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(0.0..1.0).contains(&self.validation_ratio) {
            return Err(AnalyticsError::invalid(format!(
                "validation_ratio must be in [0, 1), got {}",
                self.validation_ratio
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(AnalyticsError::invalid("learning_rate must be positive"));
        }
        if self.fallback_lookback >= self.min_training_points {
            return Err(AnalyticsError::invalid(
                "fallback_lookback must be below min_training_points",
            ));
        }
        Ok(())
    }
}

/// Lifecycle settings of the model registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Stored versions kept per symbol.
    pub retention: usize,
    pub max_model_age: Duration,
    pub max_concurrent_trainings: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention: 3,
            max_model_age: Duration::from_secs(24 * 60 * 60),
            max_concurrent_trainings: 2,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.retention == 0 {
            return Err(AnalyticsError::invalid("retention must keep at least one version"));
        }
        if self.max_concurrent_trainings == 0 {
            return Err(AnalyticsError::invalid(
                "max_concurrent_trainings must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ForecastConfig::default().validate().is_ok());
        assert!(RegistryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_train_ratio_bounds() {
        for ratio in [0.0, 1.0, -0.5, f64::NAN] {
            let config = ForecastConfig {
                train_ratio: ratio,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "ratio {} accepted", ratio);
        }
    }

    #[test]
    fn test_zero_retention_rejected() {
        let config = RegistryConfig {
            retention: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
