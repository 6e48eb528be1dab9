use super::predictor::{ForecastModel, ForecastPredictor};
use super::preprocessor::MinMaxScaler;
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::ml::forecast::{AccuracyMetrics, ModelKind};
use crate::domain::ml::model_record::ModelRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trained model state for one symbol. Immutable once committed; a retrain
/// produces a new handle.
#[derive(Debug)]
pub struct ModelHandle {
    pub symbol: String,
    pub version: u64,
    pub trained_at: DateTime<Utc>,
    pub metrics: AccuracyMetrics,
    pub degraded_mode: bool,
    pub fallback_reason: Option<String>,
    /// Fitted on the training partition; reused for inference.
    pub scaler: MinMaxScaler,
    model: ForecastModel,
}

#[derive(Serialize)]
struct PersistedStateRef<'a> {
    scaler: &'a MinMaxScaler,
    fallback_reason: &'a Option<String>,
    model: &'a ForecastModel,
}

#[derive(Deserialize)]
struct PersistedState {
    scaler: MinMaxScaler,
    fallback_reason: Option<String>,
    model: ForecastModel,
}

impl ModelHandle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        version: u64,
        trained_at: DateTime<Utc>,
        metrics: AccuracyMetrics,
        degraded_mode: bool,
        fallback_reason: Option<String>,
        scaler: MinMaxScaler,
        model: ForecastModel,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            version,
            trained_at,
            metrics,
            degraded_mode,
            fallback_reason,
            scaler,
            model,
        }
    }

    pub fn model(&self) -> &ForecastModel {
        &self.model
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn lookback(&self) -> usize {
        self.model.lookback()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.trained_at).to_std().unwrap_or_default()
    }

    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > max_age
    }

    pub fn to_record(&self) -> AnalyticsResult<ModelRecord> {
        let state = PersistedStateRef {
            scaler: &self.scaler,
            fallback_reason: &self.fallback_reason,
            model: &self.model,
        };
        let state = serde_json::to_value(&state)
            .map_err(|e| AnalyticsError::persistence(format!("serialize model state: {}", e)))?;
        Ok(ModelRecord {
            symbol: self.symbol.clone(),
            version: self.version,
            kind: self.kind(),
            trained_at: self.trained_at,
            degraded_mode: self.degraded_mode,
            metrics: self.metrics,
            state,
        })
    }

    pub fn from_record(record: ModelRecord) -> AnalyticsResult<Self> {
        let state: PersistedState = serde_json::from_value(record.state).map_err(|e| {
            AnalyticsError::persistence(format!(
                "deserialize {} v{}: {}",
                record.symbol, record.version, e
            ))
        })?;
        if state.model.kind() != record.kind {
            return Err(AnalyticsError::persistence(format!(
                "{} v{} is labelled {} but contains a {} model",
                record.symbol,
                record.version,
                record.kind,
                state.model.kind()
            )));
        }
        Ok(Self {
            symbol: record.symbol,
            version: record.version,
            trained_at: record.trained_at,
            metrics: record.metrics,
            degraded_mode: record.degraded_mode,
            fallback_reason: state.fallback_reason,
            scaler: state.scaler,
            model: state.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::linear_predictor::LinearPredictor;
    use crate::application::ml::preprocessor::prepare;
    use chrono::Duration as ChronoDuration;

    fn trained_handle(trained_at: DateTime<Utc>) -> ModelHandle {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.4).sin() * 3.0).collect();
        let prepared = prepare(&closes, 5, 0.8).unwrap();
        let mut model = ForecastModel::Linear(LinearPredictor::new(5));
        model.train(prepared.train()).unwrap();
        ModelHandle::new(
            "AAPL",
            4,
            trained_at,
            AccuracyMetrics::default(),
            true,
            Some("recurrent model disabled by configuration".to_string()),
            prepared.scaler,
            model,
        )
    }

    #[test]
    fn test_record_roundtrip_keeps_predictions() {
        let handle = trained_handle(Utc::now());
        let record = handle.to_record().unwrap();
        assert_eq!(record.version, 4);
        assert_eq!(record.kind, ModelKind::Linear);

        let restored = ModelHandle::from_record(record).unwrap();
        let window = [0.2, 0.4, 0.5, 0.45, 0.3];
        let before = handle.model().predict_next(&window).unwrap();
        let after = restored.model().predict_next(&window).unwrap();
        assert!((before - after).abs() < 1e-9);
        assert!((restored.scaler.max() - handle.scaler.max()).abs() < 1e-9);
        assert_eq!(restored.fallback_reason, handle.fallback_reason);
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let handle = trained_handle(now - ChronoDuration::hours(30));
        assert!(handle.is_stale(Duration::from_secs(24 * 3600), now));
        assert!(!handle.is_stale(Duration::from_secs(48 * 3600), now));
    }

    #[test]
    fn test_corrupt_record_is_persistence_error() {
        let mut record = trained_handle(Utc::now()).to_record().unwrap();
        record.state = serde_json::json!({ "model": "garbage" });
        let err = ModelHandle::from_record(record).unwrap_err();
        assert!(matches!(err, AnalyticsError::Persistence { .. }));
    }
}
