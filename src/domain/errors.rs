use thiserror::Error;

/// Errors raised by the analytics and forecasting core.
///
/// The enum is `Clone` so a single training outcome can be handed to every
/// caller that joined the same in-flight training.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("Insufficient data for {operation}: need {required} points, got {actual}")]
    InsufficientData {
        operation: String,
        required: usize,
        actual: usize,
    },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Training failed for {symbol}: {reason}")]
    TrainingFailed { symbol: String, reason: String },

    #[error("Model persistence failed: {reason}")]
    Persistence { reason: String },
}

impl AnalyticsError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn insufficient(operation: impl Into<String>, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            operation: operation.into(),
            required,
            actual,
        }
    }

    pub fn training_failed(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TrainingFailed {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn persistence(reason: impl Into<String>) -> Self {
        Self::Persistence {
            reason: reason.into(),
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
