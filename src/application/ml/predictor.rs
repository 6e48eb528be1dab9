use super::linear_predictor::LinearPredictor;
use super::model_config::ForecastConfig;
use super::preprocessor::{MinMaxScaler, Windows};
use super::recurrent_predictor::RecurrentPredictor;
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::ml::forecast::ModelKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

/// Summary of one training run, in scaled units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub epochs: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

/// Interface for forecast models working on min-max scaled closes.
pub trait ForecastPredictor: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Number of trailing values each prediction consumes.
    fn lookback(&self) -> usize;

    fn is_available(&self) -> bool {
        true
    }

    /// Fits the model on training windows, replacing any previous fit.
    fn train(&mut self, windows: Windows<'_>) -> AnalyticsResult<TrainingReport>;

    /// One-step prediction from the last `lookback` values of `window`.
    fn predict_next(&self, window: &[f64]) -> AnalyticsResult<f64>;

    /// Autoregressive forecast of `horizon` scaled values.
    ///
    /// Each prediction is mapped back to price, clamped at zero, re-scaled and
    /// appended to the input window before the next step.
    fn predict(
        &self,
        recent: &[f64],
        horizon: usize,
        scaler: &MinMaxScaler,
    ) -> AnalyticsResult<Vec<f64>> {
        let lookback = self.lookback();
        if recent.len() < lookback {
            return Err(AnalyticsError::insufficient(
                "forecast rollout",
                lookback,
                recent.len(),
            ));
        }

        let mut window: VecDeque<f64> = recent[recent.len() - lookback..].iter().copied().collect();
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let raw = self.predict_next(window.make_contiguous())?;
            if !raw.is_finite() {
                return Err(AnalyticsError::invalid(format!(
                    "{} model produced a non-finite prediction",
                    self.kind()
                )));
            }
            let next = scaler.transform(scaler.inverse(raw).max(0.0));
            window.pop_front();
            window.push_back(next);
            out.push(next);
        }
        Ok(out)
    }
}

/// The selected model variant.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ForecastModel {
    Recurrent(RecurrentPredictor),
    Linear(LinearPredictor),
}

impl ForecastPredictor for ForecastModel {
    fn kind(&self) -> ModelKind {
        match self {
            ForecastModel::Recurrent(m) => m.kind(),
            ForecastModel::Linear(m) => m.kind(),
        }
    }

    fn lookback(&self) -> usize {
        match self {
            ForecastModel::Recurrent(m) => m.lookback(),
            ForecastModel::Linear(m) => m.lookback(),
        }
    }

    fn is_available(&self) -> bool {
        match self {
            ForecastModel::Recurrent(m) => m.is_available(),
            ForecastModel::Linear(m) => m.is_available(),
        }
    }

    fn train(&mut self, windows: Windows<'_>) -> AnalyticsResult<TrainingReport> {
        match self {
            ForecastModel::Recurrent(m) => m.train(windows),
            ForecastModel::Linear(m) => m.train(windows),
        }
    }

    fn predict_next(&self, window: &[f64]) -> AnalyticsResult<f64> {
        match self {
            ForecastModel::Recurrent(m) => m.predict_next(window),
            ForecastModel::Linear(m) => m.predict_next(window),
        }
    }
}

/// Outcome of model selection for one training run.
#[derive(Debug)]
pub struct ModelSelection {
    pub model: ForecastModel,
    pub degraded_mode: bool,
    pub fallback_reason: Option<String>,
}

pub struct ModelFactory;

impl ModelFactory {
    /// Picks the recurrent model when it can serve this series, otherwise the
    /// linear fallback with `degraded_mode` set.
    pub fn select(config: &ForecastConfig, series_len: usize) -> ModelSelection {
        match Self::recurrent(config, series_len) {
            Ok(model) => {
                info!(
                    "ModelFactory: recurrent model selected (lookback {}, {} layers)",
                    config.lookback, config.layers
                );
                ModelSelection {
                    model: ForecastModel::Recurrent(model),
                    degraded_mode: false,
                    fallback_reason: None,
                }
            }
            Err(e) => {
                warn!("ModelFactory: falling back to linear model: {}", e);
                ModelSelection {
                    model: ForecastModel::Linear(LinearPredictor::new(config.fallback_lookback)),
                    degraded_mode: true,
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }

    fn recurrent(config: &ForecastConfig, series_len: usize) -> AnalyticsResult<RecurrentPredictor> {
        if !RecurrentPredictor::is_compiled() {
            return Err(AnalyticsError::ModelUnavailable {
                reason: "built without the `neural` feature".to_string(),
            });
        }
        if !config.neural_enabled {
            return Err(AnalyticsError::ModelUnavailable {
                reason: "recurrent model disabled by configuration".to_string(),
            });
        }
        let required = Self::recurrent_min_points(config);
        if series_len < required {
            return Err(AnalyticsError::ModelUnavailable {
                reason: format!(
                    "recurrent model needs {} points, series has {}",
                    required, series_len
                ),
            });
        }
        Ok(RecurrentPredictor::new(config))
    }

    /// Shortest series the recurrent model accepts: `neural_min_points`, or
    /// more when the training split of `lookback`-sized windows would be too
    /// small to train on.
    pub fn recurrent_min_points(config: &ForecastConfig) -> usize {
        let minimum = RecurrentPredictor::MIN_TRAINING_WINDOWS;
        // bounded so an unvalidated ratio cannot spin
        let windows = (minimum..=minimum * 1000)
            .find(|&total| (total as f64 * config.train_ratio).floor() as usize >= minimum)
            .unwrap_or(minimum * 1000);
        config.neural_min_points.max(config.lookback + windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_series_falls_back_to_linear() {
        let selection = ModelFactory::select(&ForecastConfig::default(), 61);
        assert_eq!(selection.model.kind(), ModelKind::Linear);
        assert!(selection.degraded_mode);
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Model unavailable: recurrent model needs 63 points, series has 61")
        );
    }

    #[test]
    fn test_recurrent_min_points_covers_training_split() {
        // 3 windows at 0.8 leaves 2 for training
        assert_eq!(ModelFactory::recurrent_min_points(&ForecastConfig::default()), 63);

        let config = ForecastConfig {
            neural_min_points: 150,
            ..Default::default()
        };
        assert_eq!(ModelFactory::recurrent_min_points(&config), 150);

        let config = ForecastConfig {
            train_ratio: 0.5,
            ..Default::default()
        };
        assert_eq!(ModelFactory::recurrent_min_points(&config), 64);
    }

    #[cfg(feature = "neural")]
    #[test]
    fn test_recurrent_selected_on_medium_history() {
        let selection = ModelFactory::select(&ForecastConfig::default(), 100);
        assert_eq!(selection.model.kind(), ModelKind::Recurrent);
        assert!(!selection.degraded_mode);
        assert!(selection.fallback_reason.is_none());
    }

    #[test]
    fn test_disabled_neural_falls_back() {
        let config = ForecastConfig {
            neural_enabled: false,
            ..Default::default()
        };
        let selection = ModelFactory::select(&config, 500);
        assert_eq!(selection.model.kind(), ModelKind::Linear);
        assert_eq!(selection.model.lookback(), config.fallback_lookback);
    }

    #[cfg(feature = "neural")]
    #[test]
    fn test_recurrent_selected_with_enough_history() {
        let selection = ModelFactory::select(&ForecastConfig::default(), 200);
        assert_eq!(selection.model.kind(), ModelKind::Recurrent);
        assert!(!selection.degraded_mode);
        assert_eq!(selection.model.lookback(), 60);
    }

    #[test]
    fn test_rollout_clamps_at_zero_price() {
        struct Crash;
        impl ForecastPredictor for Crash {
            fn kind(&self) -> ModelKind {
                ModelKind::Linear
            }
            fn lookback(&self) -> usize {
                2
            }
            fn train(&mut self, _windows: Windows<'_>) -> AnalyticsResult<TrainingReport> {
                unreachable!()
            }
            fn predict_next(&self, window: &[f64]) -> AnalyticsResult<f64> {
                Ok(window[1] - 10.0)
            }
        }

        let scaler = MinMaxScaler::fit(&[10.0, 20.0]).unwrap();
        let recent = scaler.transform_all(&[15.0, 12.0]);
        let out = Crash.predict(&recent, 3, &scaler).unwrap();

        assert_eq!(out.len(), 3);
        for value in out {
            assert!(scaler.inverse(value) >= -1e-9);
        }
    }
}
