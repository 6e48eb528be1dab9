use super::evaluator::evaluate;
use super::model_config::ForecastConfig;
use super::model_handle::ModelHandle;
use super::predictor::{ForecastPredictor, ModelFactory};
use super::preprocessor::prepare;
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::market::price_series::PriceSeries;
use chrono::Utc;
use tracing::{info, warn};

/// Produces a trained handle for a series. Runs on the blocking pool.
pub trait ModelTrainer: Send + Sync {
    fn train(&self, series: &PriceSeries, version: u64) -> AnalyticsResult<ModelHandle>;
}

/// Selects a variant, fits it on the training partition and scores it on the
/// held-out tail.
pub struct DefaultModelTrainer {
    config: ForecastConfig,
}

impl DefaultModelTrainer {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }
}

impl ModelTrainer for DefaultModelTrainer {
    fn train(&self, series: &PriceSeries, version: u64) -> AnalyticsResult<ModelHandle> {
        series.ensure_min_len(self.config.min_training_points, "model training")?;

        let selection = ModelFactory::select(&self.config, series.len());
        let mut model = selection.model;
        let prepared = prepare(&series.closes(), model.lookback(), self.config.train_ratio)?;

        let report = model
            .train(prepared.train())
            .map_err(|e| attach_symbol(e, series.symbol()))?;
        let metrics = evaluate(&model, prepared.test(), &prepared.scaler)?;

        let mut fallback_reason = selection.fallback_reason;
        if prepared.scaler.is_flat() {
            let note = format!(
                "training prices flat at {:.4}; later moves scale to the same level",
                prepared.scaler.min()
            );
            warn!("ModelTrainer: {} {}", series.symbol(), note);
            fallback_reason = Some(match fallback_reason {
                Some(reason) => format!("{}; {}", reason, note),
                None => note,
            });
        }

        info!(
            "ModelTrainer: {} v{} {} model trained on {} windows (loss {:.6}), test MAE {:.4} over {} samples",
            series.symbol(),
            version,
            model.kind(),
            report.samples,
            report.train_loss,
            metrics.mae,
            metrics.sample_count
        );

        Ok(ModelHandle::new(
            series.symbol(),
            version,
            Utc::now(),
            metrics,
            selection.degraded_mode,
            fallback_reason,
            prepared.scaler,
            model,
        ))
    }
}

fn attach_symbol(err: AnalyticsError, symbol: &str) -> AnalyticsError {
    match err {
        AnalyticsError::TrainingFailed { reason, .. } => {
            AnalyticsError::training_failed(symbol, reason)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::forecast::ModelKind;
    use chrono::NaiveDate;

    fn series(n: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + i as f64 * 0.2 + (i as f64 * 0.3).sin() * 2.0)
            .collect();
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        PriceSeries::from_closes("NVDA", start, &closes).unwrap()
    }

    #[test]
    fn test_rejects_short_history() {
        let trainer = DefaultModelTrainer::new(ForecastConfig::default());
        let err = trainer.train(&series(59), 1).unwrap_err();
        assert_eq!(err, AnalyticsError::insufficient("model training", 60, 59));
    }

    #[test]
    fn test_linear_fallback_on_medium_history() {
        let trainer = DefaultModelTrainer::new(ForecastConfig::default());
        let handle = trainer.train(&series(61), 7).unwrap();

        assert_eq!(handle.version, 7);
        assert_eq!(handle.kind(), ModelKind::Linear);
        assert!(handle.degraded_mode);
        assert!(handle.metrics.sample_count > 0);
        assert!(handle.metrics.mae.is_finite());
    }

    #[cfg(feature = "neural")]
    #[test]
    fn test_recurrent_on_long_history() {
        let config = ForecastConfig {
            hidden_size: 8,
            max_epochs: 30,
            ..Default::default()
        };
        let handle = DefaultModelTrainer::new(config).train(&series(200), 1).unwrap();
        assert_eq!(handle.kind(), ModelKind::Recurrent);
        assert!(!handle.degraded_mode);
        assert_eq!(handle.lookback(), 60);
    }

    #[cfg(feature = "neural")]
    #[test]
    fn test_recurrent_on_shortest_eligible_history() {
        let config = ForecastConfig {
            hidden_size: 8,
            max_epochs: 30,
            ..Default::default()
        };
        let handle = DefaultModelTrainer::new(config).train(&series(63), 1).unwrap();
        assert_eq!(handle.kind(), ModelKind::Recurrent);
        assert!(!handle.degraded_mode);
        assert_eq!(handle.metrics.sample_count, 1);
    }

    #[test]
    fn test_flat_training_partition_is_recorded() {
        let mut closes = vec![25.0; 70];
        closes.extend((1..=10).map(|i| 25.0 + i as f64));
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let series = PriceSeries::from_closes("FLAT", start, &closes).unwrap();
        let config = ForecastConfig {
            neural_enabled: false,
            ..Default::default()
        };

        let handle = DefaultModelTrainer::new(config).train(&series, 1).unwrap();
        assert!(handle.scaler.is_flat());
        let reason = handle.fallback_reason.unwrap();
        assert!(reason.starts_with("Model unavailable: recurrent model disabled"));
        assert!(reason.contains("training prices flat at 25.0000"));
    }

    #[test]
    fn test_varying_history_has_no_flat_note() {
        let handle = DefaultModelTrainer::new(ForecastConfig::default())
            .train(&series(61), 1)
            .unwrap();
        assert!(!handle.fallback_reason.unwrap().contains("flat"));
    }

    #[test]
    fn test_attach_symbol_rewrites_training_failures() {
        let err = attach_symbol(AnalyticsError::training_failed("linear", "nan"), "TSLA");
        assert_eq!(err, AnalyticsError::training_failed("TSLA", "nan"));
    }
}
