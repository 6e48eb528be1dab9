use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub symbol: String,
    pub horizon_days: usize,
    #[serde(default)]
    pub force_retrain: bool,
}

impl ForecastRequest {
    pub fn new(symbol: impl Into<String>, horizon_days: usize) -> Self {
        Self {
            symbol: symbol.into(),
            horizon_days,
            force_retrain: false,
        }
    }

    pub fn with_force_retrain(mut self, force: bool) -> Self {
        self.force_retrain = force;
        self
    }
}

/// Which forecast model produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Recurrent,
    Linear,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Recurrent => write!(f, "recurrent"),
            ModelKind::Linear => write!(f, "linear"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 1-based offset from the last observed date.
    pub step_offset: usize,
    pub date: NaiveDate,
    pub predicted_close: f64,
    pub step_confidence: f64,
}

/// Held-out accuracy of a trained model, in price units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Fraction in [0, 1].
    pub directional_accuracy: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub symbol: String,
    pub horizon_days: usize,
    pub points: Vec<ForecastPoint>,
    pub metrics: AccuracyMetrics,
    pub model_version: u64,
    pub model_kind: ModelKind,
    pub trained_at: DateTime<Utc>,
    pub degraded_mode: bool,
}

/// Confidence attached to step `step` (1-based) of a `horizon`-step forecast.
///
/// Decays linearly from 90 at the first step to 50 at the last.
pub fn step_confidence(step: usize, horizon: usize) -> f64 {
    if horizon <= 1 {
        return 90.0;
    }
    let k = step.clamp(1, horizon) as f64;
    90.0 - 40.0 * (k - 1.0) / (horizon as f64 - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_confidence_bounds() {
        assert_eq!(step_confidence(1, 1), 90.0);
        assert_eq!(step_confidence(1, 7), 90.0);
        assert!((step_confidence(7, 7) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_step_confidence_strictly_decreasing() {
        let horizon = 30;
        let values: Vec<f64> = (1..=horizon).map(|k| step_confidence(k, horizon)).collect();
        assert!(values.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_request_defaults_force_retrain_false() {
        let req: ForecastRequest =
            serde_json::from_str(r#"{"symbol":"AAPL","horizon_days":7}"#).unwrap();
        assert!(!req.force_retrain);
        assert_eq!(req, ForecastRequest::new("AAPL", 7));
    }
}
