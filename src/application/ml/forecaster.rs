use super::model_config::ForecastConfig;
use super::predictor::ForecastPredictor;
use super::registry::ModelRegistry;
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::forecast::{ForecastPoint, ForecastRequest, ForecastResult, step_confidence};
use chrono::Days;
use tracing::{info, warn};

/// Entry point for price forecasts: validates the request, obtains a model
/// from the registry and rolls it forward over the horizon.
pub struct ForecastService {
    registry: ModelRegistry,
    config: ForecastConfig,
}

impl ForecastService {
    pub fn new(registry: ModelRegistry, config: ForecastConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub async fn forecast(
        &self,
        request: &ForecastRequest,
        series: &PriceSeries,
    ) -> AnalyticsResult<ForecastResult> {
        self.validate(request, series)?;

        let handle = self
            .registry
            .get_or_train(series, request.force_retrain)
            .await?;

        let lookback = handle.lookback();
        let closes = series.closes();
        if closes.len() < lookback {
            return Err(AnalyticsError::insufficient(
                "forecast input window",
                lookback,
                closes.len(),
            ));
        }
        let window = &closes[closes.len() - lookback..];
        if handle.scaler.is_flat() && window.iter().any(|c| *c != handle.scaler.min()) {
            warn!(
                "ForecastService: {} model v{} was fitted on flat prices at {:.4}; recent moves are ignored",
                series.symbol(),
                handle.version,
                handle.scaler.min()
            );
        }
        let recent = handle.scaler.transform_all(window);

        let horizon = request.horizon_days;
        let rollout_handle = handle.clone();
        let scaled = tokio::task::spawn_blocking(move || {
            rollout_handle
                .model()
                .predict(&recent, horizon, &rollout_handle.scaler)
        })
        .await
        .map_err(|e| AnalyticsError::invalid(format!("forecast task failed: {}", e)))??;

        let last_date = series.last_date();
        let mut points = Vec::with_capacity(horizon);
        for (i, value) in scaled.iter().enumerate() {
            let step = i + 1;
            let date = last_date
                .checked_add_days(Days::new(step as u64))
                .ok_or_else(|| AnalyticsError::invalid("forecast date overflows the calendar"))?;
            points.push(ForecastPoint {
                step_offset: step,
                date,
                predicted_close: handle.scaler.inverse(*value).max(0.0),
                step_confidence: step_confidence(step, horizon),
            });
        }

        info!(
            "ForecastService: {} {}-day forecast from {} model v{}{}",
            series.symbol(),
            horizon,
            handle.kind(),
            handle.version,
            if handle.degraded_mode { " (degraded)" } else { "" }
        );

        Ok(ForecastResult {
            symbol: series.symbol().to_string(),
            horizon_days: horizon,
            points,
            metrics: handle.metrics,
            model_version: handle.version,
            model_kind: handle.kind(),
            trained_at: handle.trained_at,
            degraded_mode: handle.degraded_mode,
        })
    }

    fn validate(&self, request: &ForecastRequest, series: &PriceSeries) -> AnalyticsResult<()> {
        if !request.symbol.trim().eq_ignore_ascii_case(series.symbol()) {
            return Err(AnalyticsError::invalid(format!(
                "request for {} does not match series {}",
                request.symbol,
                series.symbol()
            )));
        }
        if request.horizon_days == 0 {
            return Err(AnalyticsError::invalid("horizon_days must be positive"));
        }
        if request.horizon_days > self.config.max_horizon_days {
            return Err(AnalyticsError::invalid(format!(
                "horizon_days {} exceeds the maximum of {}",
                request.horizon_days, self.config.max_horizon_days
            )));
        }
        series.ensure_min_len(self.config.min_training_points, "model training")
    }
}
