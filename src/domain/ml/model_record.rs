use super::forecast::{AccuracyMetrics, ModelKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted form of a trained model for one symbol and version.
///
/// `state` carries the fitted model and its scaler as opaque JSON so stores
/// never depend on a particular model implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub symbol: String,
    pub version: u64,
    pub kind: ModelKind,
    pub trained_at: DateTime<Utc>,
    pub degraded_mode: bool,
    pub metrics: AccuracyMetrics,
    pub state: serde_json::Value,
}
