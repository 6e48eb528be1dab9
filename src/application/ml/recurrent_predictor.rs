use super::model_config::ForecastConfig;
use super::predictor::{ForecastPredictor, TrainingReport};
use super::preprocessor::{Window, Windows};
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::ml::forecast::ModelKind;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// GRU cell with fixed, seeded weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GruCell {
    // update gate
    w_iz: Array2<f64>,
    w_hz: Array2<f64>,
    b_z: Array1<f64>,
    // reset gate
    w_ir: Array2<f64>,
    w_hr: Array2<f64>,
    b_r: Array1<f64>,
    // candidate state
    w_in: Array2<f64>,
    w_hn: Array2<f64>,
    b_n: Array1<f64>,
}

impl GruCell {
    fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let mut uniform = |rows: usize, cols: usize| {
            Array2::from_shape_fn((rows, cols), |_| rng.random_range(-limit..=limit))
        };
        Self {
            w_iz: uniform(hidden_size, input_size),
            w_hz: uniform(hidden_size, hidden_size),
            w_ir: uniform(hidden_size, input_size),
            w_hr: uniform(hidden_size, hidden_size),
            w_in: uniform(hidden_size, input_size),
            w_hn: uniform(hidden_size, hidden_size),
            b_z: Array1::zeros(hidden_size),
            b_r: Array1::zeros(hidden_size),
            b_n: Array1::zeros(hidden_size),
        }
    }

    fn hidden_size(&self) -> usize {
        self.b_z.len()
    }

    fn forward(&self, x: &Array1<f64>, h_prev: &Array1<f64>) -> Array1<f64> {
        let z = (self.w_iz.dot(x) + self.w_hz.dot(h_prev) + &self.b_z).mapv(sigmoid);
        let r = (self.w_ir.dot(x) + self.w_hr.dot(h_prev) + &self.b_r).mapv(sigmoid);
        let n = (self.w_in.dot(x) + self.w_hn.dot(&(&r * h_prev)) + &self.b_n).mapv(f64::tanh);
        let one_minus_z = z.mapv(|v| 1.0 - v);
        &one_minus_z * &n + &z * h_prev
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Stacked GRU encoder with a trained dense readout.
///
/// The recurrent layers are initialised from the configured seed and kept
/// fixed; training fits the readout on the final hidden state (plus the last
/// input value) by mini-batch gradient descent on MSE, with dropout on the
/// features and early stopping on a chronological validation tail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentPredictor {
    lookback: usize,
    dropout: f64,
    learning_rate: f64,
    batch_size: usize,
    max_epochs: usize,
    patience: usize,
    min_delta: f64,
    validation_ratio: f64,
    seed: u64,
    cells: Vec<GruCell>,
    readout_w: Array1<f64>,
    readout_b: f64,
    trained: bool,
}

impl RecurrentPredictor {
    /// Training windows needed to fit the readout and hold one back.
    pub const MIN_TRAINING_WINDOWS: usize = 2;

    pub fn new(config: &ForecastConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let layers = config.layers.max(1);
        let cells: Vec<GruCell> = (0..layers)
            .map(|layer| {
                let input = if layer == 0 { 1 } else { config.hidden_size };
                GruCell::new(input, config.hidden_size, &mut rng)
            })
            .collect();

        Self {
            lookback: config.lookback.max(1),
            dropout: config.dropout,
            learning_rate: config.learning_rate,
            batch_size: config.batch_size.max(1),
            max_epochs: config.max_epochs,
            patience: config.patience,
            min_delta: config.min_delta,
            validation_ratio: config.validation_ratio,
            seed: config.seed,
            readout_w: Array1::zeros(config.hidden_size + 1),
            readout_b: 0.0,
            cells,
            trained: false,
        }
    }

    /// Whether the crate was built with the `neural` feature.
    pub fn is_compiled() -> bool {
        cfg!(feature = "neural")
    }

    fn features(&self, window: &[f64]) -> Array1<f64> {
        let mut states: Vec<Array1<f64>> = self
            .cells
            .iter()
            .map(|cell| Array1::zeros(cell.hidden_size()))
            .collect();

        for &value in window {
            let mut layer_input = Array1::from_elem(1, value);
            for (cell, state) in self.cells.iter().zip(states.iter_mut()) {
                let next = cell.forward(&layer_input, state);
                layer_input = next.clone();
                *state = next;
            }
        }

        let last_value = window.last().copied().unwrap_or_default();
        let mut features = states.pop().unwrap_or_default().to_vec();
        features.push(last_value);
        Array1::from_vec(features)
    }

    fn readout(&self, w: &Array1<f64>, b: f64, features: &Array1<f64>) -> f64 {
        w.dot(features) + b
    }

    fn mse(&self, w: &Array1<f64>, b: f64, features: &[Array1<f64>], targets: &[f64]) -> f64 {
        if features.is_empty() {
            return 0.0;
        }
        features
            .iter()
            .zip(targets)
            .map(|(f, t)| (self.readout(w, b, f) - t).powi(2))
            .sum::<f64>()
            / features.len() as f64
    }

    fn apply_dropout(&self, features: &Array1<f64>, rng: &mut StdRng) -> Array1<f64> {
        if self.dropout <= 0.0 {
            return features.clone();
        }
        let keep = 1.0 - self.dropout;
        features.mapv(|v| {
            if rng.random::<f64>() < self.dropout {
                0.0
            } else {
                v / keep
            }
        })
    }
}

impl ForecastPredictor for RecurrentPredictor {
    fn kind(&self) -> ModelKind {
        ModelKind::Recurrent
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn is_available(&self) -> bool {
        Self::is_compiled()
    }

    fn train(&mut self, windows: Windows<'_>) -> AnalyticsResult<TrainingReport> {
        if windows.lookback() != self.lookback {
            return Err(AnalyticsError::invalid(format!(
                "recurrent model expects lookback {}, got windows of {}",
                self.lookback,
                windows.lookback()
            )));
        }
        let samples: Vec<Window<'_>> = windows.collect();
        if samples.len() < Self::MIN_TRAINING_WINDOWS {
            return Err(AnalyticsError::insufficient(
                "recurrent model training",
                Self::MIN_TRAINING_WINDOWS,
                samples.len(),
            ));
        }

        let features: Vec<Array1<f64>> =
            samples.par_iter().map(|w| self.features(w.input)).collect();
        let targets: Vec<f64> = samples.iter().map(|w| w.target).collect();

        let n = samples.len();
        let val_count = if self.validation_ratio > 0.0 {
            ((n as f64 * self.validation_ratio).round() as usize).clamp(1, n - 1)
        } else {
            0
        };
        let train_count = n - val_count;
        let (train_x, val_x) = features.split_at(train_count);
        let (train_y, val_y) = targets.split_at(train_count);

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let mut w = Array1::<f64>::zeros(self.readout_w.len());
        let mut b = 0.0;
        let mut best = (w.clone(), b, f64::INFINITY);
        let mut best_train_loss = f64::INFINITY;
        let mut stale_epochs = 0;
        let mut epochs = 0;

        let order: Vec<usize> = (0..train_count).collect();
        for epoch in 0..self.max_epochs {
            epochs = epoch + 1;
            for batch in order.chunks(self.batch_size) {
                let mut grad_w = Array1::<f64>::zeros(w.len());
                let mut grad_b = 0.0;
                for &i in batch {
                    let x = self.apply_dropout(&train_x[i], &mut rng);
                    let err = self.readout(&w, b, &x) - train_y[i];
                    grad_w.scaled_add(err, &x);
                    grad_b += err;
                }
                let scale = 2.0 / batch.len() as f64;
                w.scaled_add(-self.learning_rate * scale, &grad_w);
                b -= self.learning_rate * scale * grad_b;
            }

            let train_loss = self.mse(&w, b, train_x, train_y);
            let val_loss = if val_count > 0 {
                self.mse(&w, b, val_x, val_y)
            } else {
                train_loss
            };
            if !train_loss.is_finite() || !val_loss.is_finite() {
                return Err(AnalyticsError::training_failed(
                    "recurrent",
                    format!("loss diverged at epoch {}", epochs),
                ));
            }

            if val_loss < best.2 - self.min_delta {
                best = (w.clone(), b, val_loss);
                best_train_loss = train_loss;
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= self.patience {
                    debug!(
                        "RecurrentPredictor: early stop at epoch {} (best val loss {:.6})",
                        epochs, best.2
                    );
                    break;
                }
            }
        }

        let (best_w, best_b, best_val) = best;
        if !best_val.is_finite() {
            return Err(AnalyticsError::training_failed(
                "recurrent",
                "no finite validation loss",
            ));
        }
        self.readout_w = best_w;
        self.readout_b = best_b;
        self.trained = true;

        info!(
            "RecurrentPredictor: trained on {} windows in {} epochs (val loss {:.6})",
            train_count, epochs, best_val
        );
        Ok(TrainingReport {
            samples: train_count,
            epochs,
            train_loss: best_train_loss,
            validation_loss: (val_count > 0).then_some(best_val),
        })
    }

    fn predict_next(&self, window: &[f64]) -> AnalyticsResult<f64> {
        if !self.trained {
            return Err(AnalyticsError::ModelUnavailable {
                reason: "recurrent model has not been trained".to_string(),
            });
        }
        if window.len() < self.lookback {
            return Err(AnalyticsError::insufficient(
                "recurrent prediction",
                self.lookback,
                window.len(),
            ));
        }
        let features = self.features(&window[window.len() - self.lookback..]);
        Ok(self.readout(&self.readout_w, self.readout_b, &features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::preprocessor::windowize;

    fn small_config() -> ForecastConfig {
        ForecastConfig {
            lookback: 12,
            hidden_size: 8,
            layers: 2,
            max_epochs: 80,
            patience: 8,
            ..Default::default()
        }
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 0.5 + 0.3 * (i as f64 * 0.2).sin()).collect()
    }

    #[test]
    fn test_same_seed_gives_same_model() {
        let data = wave(150);
        let mut a = RecurrentPredictor::new(&small_config());
        let mut b = RecurrentPredictor::new(&small_config());
        a.train(windowize(&data, 12).unwrap()).unwrap();
        b.train(windowize(&data, 12).unwrap()).unwrap();

        let window = &data[100..112];
        assert_eq!(a.predict_next(window).unwrap(), b.predict_next(window).unwrap());
    }

    #[test]
    fn test_training_beats_constant_baseline() {
        let data = wave(200);
        let mut model = RecurrentPredictor::new(&small_config());
        let report = model.train(windowize(&data, 12).unwrap()).unwrap();

        let mean = data.iter().sum::<f64>() / data.len() as f64;
        let baseline = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / data.len() as f64;
        assert!(report.train_loss < baseline);
        assert!(report.validation_loss.is_some());
        assert!(report.epochs <= 80);
    }

    #[test]
    fn test_untrained_prediction_is_unavailable() {
        let model = RecurrentPredictor::new(&small_config());
        let err = model.predict_next(&wave(12)).unwrap_err();
        assert!(matches!(err, AnalyticsError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_rejects_mismatched_lookback() {
        let data = wave(50);
        let mut model = RecurrentPredictor::new(&small_config());
        assert!(model.train(windowize(&data, 5).unwrap()).is_err());
    }
}
