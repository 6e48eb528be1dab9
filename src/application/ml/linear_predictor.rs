use super::predictor::{ForecastPredictor, TrainingReport};
use super::preprocessor::Windows;
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::ml::forecast::ModelKind;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use statrs::statistics::{Data, Distribution};
use std::fmt;
use tracing::{debug, warn};

type Regression = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Below this spread (scaled units) the history is treated as constant.
const FLAT_STD_DEV: f64 = 1e-12;

#[derive(Serialize, Deserialize)]
enum LinearFit {
    Untrained,
    /// OLS on the lagged window values.
    Autoregressive(Regression),
    /// OLS trend line through each input window, extrapolated one step.
    Trend,
}

/// Linear fallback model. Always available.
#[derive(Serialize, Deserialize)]
pub struct LinearPredictor {
    lookback: usize,
    fit: LinearFit,
}

impl fmt::Debug for LinearPredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fit = match self.fit {
            LinearFit::Untrained => "untrained",
            LinearFit::Autoregressive(_) => "autoregressive",
            LinearFit::Trend => "trend",
        };
        f.debug_struct("LinearPredictor")
            .field("lookback", &self.lookback)
            .field("fit", &fit)
            .finish()
    }
}

impl LinearPredictor {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
            fit: LinearFit::Untrained,
        }
    }

    pub fn is_trend_fit(&self) -> bool {
        matches!(self.fit, LinearFit::Trend)
    }

    fn fit_autoregressive(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Regression, String> {
        let x = DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(|e| format!("Matrix error: {}", e))?;
        let params =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let model = LinearRegression::fit(&x, &targets.to_vec(), params)
            .map_err(|e| format!("Training error: {}", e))?;

        let fitted: Vec<f64> = model
            .predict(&x)
            .map_err(|e| format!("Predict error: {}", e))?;
        if fitted.iter().any(|v| !v.is_finite()) {
            return Err("non-finite fitted values".to_string());
        }
        Ok(model)
    }

    fn mse(&self, rows: &[Vec<f64>], targets: &[f64]) -> AnalyticsResult<f64> {
        let mut sum = 0.0;
        for (row, target) in rows.iter().zip(targets) {
            sum += (self.predict_next(row)? - target).powi(2);
        }
        Ok(sum / targets.len().max(1) as f64)
    }
}

/// Closed-form OLS line through `(i, window[i])`, evaluated at `i = len`.
pub fn trend_extrapolate(window: &[f64]) -> f64 {
    let n = window.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = window.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in window.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    mean_y + slope * (n - mean_x)
}

impl ForecastPredictor for LinearPredictor {
    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn train(&mut self, windows: Windows<'_>) -> AnalyticsResult<TrainingReport> {
        if windows.lookback() != self.lookback {
            return Err(AnalyticsError::invalid(format!(
                "linear model expects lookback {}, got windows of {}",
                self.lookback,
                windows.lookback()
            )));
        }
        let (rows, targets): (Vec<Vec<f64>>, Vec<f64>) =
            windows.map(|w| (w.input.to_vec(), w.target)).unzip();
        if rows.is_empty() {
            return Err(AnalyticsError::insufficient("linear model training", 1, 0));
        }

        let values: Vec<f64> = rows.iter().flatten().chain(&targets).copied().collect();
        let flat = Data::new(values)
            .std_dev()
            .is_none_or(|sd| sd < FLAT_STD_DEV);

        self.fit = if flat {
            debug!("LinearPredictor: flat history, using trend fit");
            LinearFit::Trend
        } else {
            match self.fit_autoregressive(&rows, &targets) {
                Ok(model) => LinearFit::Autoregressive(model),
                Err(reason) => {
                    warn!("LinearPredictor: autoregressive fit failed ({}), using trend fit", reason);
                    LinearFit::Trend
                }
            }
        };

        let train_loss = self.mse(&rows, &targets)?;
        if !train_loss.is_finite() {
            return Err(AnalyticsError::training_failed(
                "linear",
                "non-finite training loss",
            ));
        }
        Ok(TrainingReport {
            samples: rows.len(),
            epochs: 1,
            train_loss,
            validation_loss: None,
        })
    }

    fn predict_next(&self, window: &[f64]) -> AnalyticsResult<f64> {
        if window.len() < self.lookback {
            return Err(AnalyticsError::insufficient(
                "linear prediction",
                self.lookback,
                window.len(),
            ));
        }
        let window = &window[window.len() - self.lookback..];

        match &self.fit {
            LinearFit::Untrained => Err(AnalyticsError::ModelUnavailable {
                reason: "linear model has not been trained".to_string(),
            }),
            LinearFit::Trend => Ok(trend_extrapolate(window)),
            LinearFit::Autoregressive(model) => {
                let x = DenseMatrix::from_2d_vec(&vec![window.to_vec()])
                    .map_err(|e| AnalyticsError::invalid(format!("Matrix error: {}", e)))?;
                let predictions: Vec<f64> = model
                    .predict(&x)
                    .map_err(|e| AnalyticsError::invalid(format!("Predict error: {}", e)))?;
                predictions
                    .first()
                    .copied()
                    .ok_or_else(|| AnalyticsError::invalid("No prediction returned"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::preprocessor::windowize;

    // three frequencies keep the lag matrix of width 6 at full rank
    fn oscillation(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                0.5 + 0.3 * (t * 0.35).sin() + 0.05 * (t * 1.3).sin() + 0.02 * (t * 2.7).cos()
            })
            .collect()
    }

    #[test]
    fn test_trend_extrapolation() {
        assert!((trend_extrapolate(&[1.0, 2.0, 3.0]) - 4.0).abs() < 1e-12);
        assert_eq!(trend_extrapolate(&[5.0]), 5.0);
        assert_eq!(trend_extrapolate(&[2.0, 2.0, 2.0]), 2.0);
    }

    #[test]
    fn test_flat_history_uses_trend_fit() {
        let data = vec![0.5; 40];
        let mut model = LinearPredictor::new(5);
        model.train(windowize(&data, 5).unwrap()).unwrap();
        assert!(model.is_trend_fit());
        assert!((model.predict_next(&data[..5]).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_autoregressive_fit_tracks_oscillation() {
        let data = oscillation(120);
        let mut model = LinearPredictor::new(6);
        let report = model.train(windowize(&data, 6).unwrap()).unwrap();

        assert!(report.train_loss < 1e-3);
        let next = model.predict_next(&data[100..106]).unwrap();
        assert!((next - data[106]).abs() < 0.05);
    }

    #[test]
    fn test_untrained_model_is_unavailable() {
        let model = LinearPredictor::new(3);
        let err = model.predict_next(&[0.1, 0.2, 0.3]).unwrap_err();
        assert!(matches!(err, AnalyticsError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_serde_roundtrip_preserves_predictions() {
        let data = oscillation(60);
        let mut model = LinearPredictor::new(6);
        model.train(windowize(&data, 6).unwrap()).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: LinearPredictor = serde_json::from_str(&json).unwrap();
        let window = &data[50..56];
        assert!(
            (model.predict_next(window).unwrap() - restored.predict_next(window).unwrap()).abs()
                < 1e-12
        );
    }
}
