use super::predictor::ForecastPredictor;
use super::preprocessor::{MinMaxScaler, Windows};
use crate::domain::errors::AnalyticsResult;
use crate::domain::ml::forecast::AccuracyMetrics;

/// Scores one-step predictions on held-out windows, in price units.
///
/// Directional accuracy counts steps where the predicted move from the
/// previous actual close has the same sign as the actual move. An empty test
/// partition yields zeroed metrics with `sample_count == 0`.
pub fn evaluate<P: ForecastPredictor + ?Sized>(
    model: &P,
    test: Windows<'_>,
    scaler: &MinMaxScaler,
) -> AnalyticsResult<AccuracyMetrics> {
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut hits = 0usize;
    let mut count = 0usize;

    for window in test {
        let predicted = scaler.inverse(model.predict_next(window.input)?).max(0.0);
        let actual = scaler.inverse(window.target);
        let Some(&last_input) = window.input.last() else {
            continue;
        };
        let previous = scaler.inverse(last_input);

        let error = predicted - actual;
        abs_sum += error.abs();
        sq_sum += error * error;
        if direction(predicted - previous) == direction(actual - previous) {
            hits += 1;
        }
        count += 1;
    }

    if count == 0 {
        return Ok(AccuracyMetrics::default());
    }
    let n = count as f64;
    Ok(AccuracyMetrics {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        directional_accuracy: hits as f64 / n,
        sample_count: count,
    })
}

fn direction(delta: f64) -> i8 {
    if delta > 0.0 {
        1
    } else if delta < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::predictor::TrainingReport;
    use crate::application::ml::preprocessor::windowize;
    use crate::domain::ml::forecast::ModelKind;

    /// Predicts the last input plus a fixed offset.
    struct Drift(f64);

    impl ForecastPredictor for Drift {
        fn kind(&self) -> ModelKind {
            ModelKind::Linear
        }
        fn lookback(&self) -> usize {
            1
        }
        fn train(&mut self, _windows: Windows<'_>) -> AnalyticsResult<TrainingReport> {
            unreachable!()
        }
        fn predict_next(&self, window: &[f64]) -> AnalyticsResult<f64> {
            Ok(window[window.len() - 1] + self.0)
        }
    }

    #[test]
    fn test_metrics_on_rising_series() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        let scaler = MinMaxScaler::fit(&closes).unwrap();
        let scaled = scaler.transform_all(&closes);

        // 0.125 scaled == 0.5 in price; actual step is +1
        let metrics = evaluate(&Drift(0.125), windowize(&scaled, 1).unwrap(), &scaler).unwrap();
        assert_eq!(metrics.sample_count, 4);
        assert!((metrics.mae - 0.5).abs() < 1e-9);
        assert!((metrics.rmse - 0.5).abs() < 1e-9);
        assert_eq!(metrics.directional_accuracy, 1.0);

        let metrics = evaluate(&Drift(-0.125), windowize(&scaled, 1).unwrap(), &scaler).unwrap();
        assert_eq!(metrics.directional_accuracy, 0.0);
    }

    #[test]
    fn test_empty_test_partition() {
        let scaler = MinMaxScaler::fit(&[1.0, 2.0]).unwrap();
        let metrics = evaluate(&Drift(0.0), windowize(&[0.5], 3).unwrap(), &scaler).unwrap();
        assert_eq!(metrics, AccuracyMetrics::default());
        assert_eq!(metrics.sample_count, 0);
    }
}
