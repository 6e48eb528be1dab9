use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A computed indicator value, `None` where history was insufficient.
///
/// Serializes as `null`; never replaced by zero.
pub type IndicatorValue = Option<f64>;

/// Canonical indicator names used as keys in an [`IndicatorSet`].
pub mod names {
    pub const MACD_LINE: &str = "macd_line";
    pub const MACD_SIGNAL: &str = "macd_signal";
    pub const MACD_HISTOGRAM: &str = "macd_histogram";

    pub fn sma(period: usize) -> String {
        format!("sma_{}", period)
    }

    pub fn ema(period: usize) -> String {
        format!("ema_{}", period)
    }

    pub fn rsi(period: usize) -> String {
        format!("rsi_{}", period)
    }
}

/// Per-date indicator values for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    series: BTreeMap<String, Vec<IndicatorValue>>,
}

impl IndicatorSet {
    pub fn new(symbol: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            symbol: symbol.into(),
            dates,
            series: BTreeMap::new(),
        }
    }

    /// Adds an indicator column; its length must match the date axis.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        values: Vec<IndicatorValue>,
    ) -> AnalyticsResult<()> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(AnalyticsError::invalid(format!(
                "indicator {} has {} values for {} dates",
                name,
                values.len(),
                self.dates.len()
            )));
        }
        self.series.insert(name, values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn values(&self, name: &str) -> Option<&[IndicatorValue]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn value_at_index(&self, name: &str, idx: usize) -> IndicatorValue {
        self.series.get(name).and_then(|v| v.get(idx).copied().flatten())
    }

    pub fn value_on(&self, name: &str, date: NaiveDate) -> IndicatorValue {
        let idx = self.dates.binary_search(&date).ok()?;
        self.value_at_index(name, idx)
    }

    /// All indicators for one date; `None` if the date is not in the series.
    pub fn row(&self, date: NaiveDate) -> Option<BTreeMap<&str, IndicatorValue>> {
        let idx = self.dates.binary_search(&date).ok()?;
        Some(
            self.series
                .iter()
                .map(|(name, values)| (name.as_str(), values[idx]))
                .collect(),
        )
    }

    /// Most recent defined value of each indicator; `None` if it never had one.
    pub fn latest(&self) -> BTreeMap<String, IndicatorValue> {
        self.series
            .iter()
            .map(|(name, values)| (name.clone(), values.iter().rev().find_map(|v| *v)))
            .collect()
    }
}
