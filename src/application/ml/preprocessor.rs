//! Feature preprocessing for the forecast models: min-max scaling fitted on
//! the training partition, sliding windows and the chronological split.

use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

/// Min-max scaler. Parameters come from the training partition only and are
/// kept for the inverse transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> AnalyticsResult<Self> {
        if values.is_empty() {
            return Err(AnalyticsError::invalid("cannot fit scaler on empty data"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::invalid("cannot fit scaler on non-finite data"));
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    /// True when the training partition held a single price level.
    pub fn is_flat(&self) -> bool {
        self.range() == 0.0
    }

    /// A flat training partition maps every value to 0.5.
    pub fn transform(&self, value: f64) -> f64 {
        if self.is_flat() {
            return 0.5;
        }
        (value - self.min) / self.range()
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        if self.is_flat() {
            return self.min;
        }
        scaled * self.range() + self.min
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.transform(*v)).collect()
    }

    pub fn inverse_all(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|v| self.inverse(*v)).collect()
    }
}

/// One training example: `lookback` inputs and the value right after them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    pub input: &'a [f64],
    pub target: f64,
    /// Position of the target in the underlying series.
    pub target_index: usize,
}

/// Lazy sliding windows over a scaled series, advancing by one step.
///
/// Cloning restarts iteration from the clone's current position.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    data: &'a [f64],
    lookback: usize,
    // target indices still to yield: next..end
    next: usize,
    end: usize,
}

/// All windows of `lookback` inputs over `data`.
pub fn windowize(data: &[f64], lookback: usize) -> AnalyticsResult<Windows<'_>> {
    if lookback == 0 {
        return Err(AnalyticsError::invalid("lookback must be positive"));
    }
    Ok(Windows {
        data,
        lookback,
        next: lookback.min(data.len()),
        end: data.len(),
    })
}

impl<'a> Windows<'a> {
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Chronological split: the first `floor(n * ratio)` windows train (at
    /// least one when any exist), the remainder test. No shuffling.
    pub fn split(self, train_ratio: f64) -> AnalyticsResult<(Windows<'a>, Windows<'a>)> {
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(AnalyticsError::invalid(format!(
                "train ratio must be in (0, 1), got {}",
                train_ratio
            )));
        }
        let n = self.len();
        let train_count = ((n as f64 * train_ratio).floor() as usize).clamp(n.min(1), n);
        Ok(self.split_at(train_count))
    }

    /// First `count` windows and the rest.
    pub fn split_at(self, count: usize) -> (Windows<'a>, Windows<'a>) {
        let boundary = self.next + count.min(self.len());
        let head = Windows {
            end: boundary,
            ..self.clone()
        };
        let tail = Windows {
            next: boundary,
            ..self
        };
        (head, tail)
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        Some(Window {
            input: &self.data[idx - self.lookback..idx],
            target: self.data[idx],
            target_index: idx,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows<'_> {}

impl FusedIterator for Windows<'_> {}

/// Scaled closes with the scaler fitted on the training partition.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub scaler: MinMaxScaler,
    pub scaled: Vec<f64>,
    pub lookback: usize,
    pub train_windows: usize,
}

impl PreparedSeries {
    pub fn windows(&self) -> Windows<'_> {
        Windows {
            data: &self.scaled,
            lookback: self.lookback,
            next: self.lookback,
            end: self.scaled.len(),
        }
    }

    pub fn train(&self) -> Windows<'_> {
        self.windows().split_at(self.train_windows).0
    }

    pub fn test(&self) -> Windows<'_> {
        self.windows().split_at(self.train_windows).1
    }

    /// Number of closes (inputs and targets) covered by training windows.
    pub fn training_partition_len(&self) -> usize {
        self.lookback + self.train_windows
    }
}

/// Splits in price space first, fits the scaler on the training partition,
/// then scales the whole series with it.
pub fn prepare(closes: &[f64], lookback: usize, train_ratio: f64) -> AnalyticsResult<PreparedSeries> {
    if lookback == 0 {
        return Err(AnalyticsError::invalid("lookback must be positive"));
    }
    if closes.len() <= lookback {
        return Err(AnalyticsError::insufficient(
            "window preparation",
            lookback + 1,
            closes.len(),
        ));
    }
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(AnalyticsError::invalid(format!(
            "train ratio must be in (0, 1), got {}",
            train_ratio
        )));
    }

    let total = closes.len() - lookback;
    let train_windows = ((total as f64 * train_ratio).floor() as usize).clamp(1, total);
    let scaler = MinMaxScaler::fit(&closes[..lookback + train_windows])?;

    Ok(PreparedSeries {
        scaler,
        scaled: scaler.transform_all(closes),
        lookback,
        train_windows,
    })
}
