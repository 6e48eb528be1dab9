use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// One daily bar for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bar where only the close is known (open/high/low mirror it).
    pub fn from_close(symbol: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self::new(symbol, date, close, close, close, close, 0.0)
    }
}

/// Validated, chronologically ordered price history for one symbol.
///
/// Construction is the only place where ordering and sanity checks happen;
/// everything downstream relies on these invariants:
/// - at least one point
/// - every point belongs to the series symbol
/// - dates strictly increasing (no duplicates)
/// - prices finite, close strictly positive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> AnalyticsResult<Self> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalyticsError::invalid("symbol must not be empty"));
        }
        if points.is_empty() {
            return Err(AnalyticsError::invalid(format!(
                "price series for {} is empty",
                symbol
            )));
        }

        for (idx, point) in points.iter().enumerate() {
            if !point.symbol.trim().eq_ignore_ascii_case(&symbol) {
                return Err(AnalyticsError::invalid(format!(
                    "point {} belongs to {}, expected {}",
                    idx, point.symbol, symbol
                )));
            }

            let fields = [point.open, point.high, point.low, point.close, point.volume];
            if fields.iter().any(|v| !v.is_finite()) {
                return Err(AnalyticsError::invalid(format!(
                    "point {} ({}) contains a non-finite value",
                    idx, point.date
                )));
            }
            if point.close <= 0.0 {
                return Err(AnalyticsError::invalid(format!(
                    "point {} ({}) has non-positive close {}",
                    idx, point.date, point.close
                )));
            }

            if idx > 0 {
                let prev = points[idx - 1].date;
                if point.date == prev {
                    return Err(AnalyticsError::invalid(format!(
                        "duplicate date {} at index {}",
                        point.date, idx
                    )));
                }
                if point.date < prev {
                    return Err(AnalyticsError::invalid(format!(
                        "unsorted dates: {} follows {} at index {}",
                        point.date, prev, idx
                    )));
                }
            }
        }

        Ok(Self { symbol, points })
    }

    /// Builds a series of consecutive calendar days starting at `start`.
    pub fn from_closes(
        symbol: impl Into<String>,
        start: NaiveDate,
        closes: &[f64],
    ) -> AnalyticsResult<Self> {
        let symbol = symbol.into();
        let mut points = Vec::with_capacity(closes.len());
        for (i, &close) in closes.iter().enumerate() {
            let date = start
                .checked_add_days(Days::new(i as u64))
                .ok_or_else(|| AnalyticsError::invalid("date range overflows the calendar"))?;
            points.push(PricePoint::from_close(symbol.clone(), date, close));
        }
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed series; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    pub fn last_close(&self) -> f64 {
        self.points[self.points.len() - 1].close
    }

    /// Fails with `InsufficientData` when the series is shorter than `required`.
    pub fn ensure_min_len(&self, required: usize, operation: &str) -> AnalyticsResult<()> {
        if self.points.len() < required {
            return Err(AnalyticsError::insufficient(
                operation,
                required,
                self.points.len(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_valid_series_is_accepted() {
        let series = PriceSeries::from_closes("aapl", day(1), &[10.0, 11.0, 12.0]).unwrap();
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_date(), day(3));
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_empty_series_rejected() {
        let result = PriceSeries::new("AAPL", Vec::new());
        assert!(matches!(result, Err(AnalyticsError::InvalidInput { .. })));
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let points = vec![
            PricePoint::from_close("AAPL", day(1), 10.0),
            PricePoint::from_close("AAPL", day(1), 11.0),
        ];
        let err = PriceSeries::new("AAPL", points).unwrap_err();
        assert!(err.to_string().contains("duplicate date"));
    }

    #[test]
    fn test_unsorted_dates_rejected() {
        let points = vec![
            PricePoint::from_close("AAPL", day(2), 10.0),
            PricePoint::from_close("AAPL", day(1), 11.0),
        ];
        let err = PriceSeries::new("AAPL", points).unwrap_err();
        assert!(err.to_string().contains("unsorted"));
    }

    #[test]
    fn test_foreign_symbol_rejected() {
        let points = vec![
            PricePoint::from_close("AAPL", day(1), 10.0),
            PricePoint::from_close("MSFT", day(2), 11.0),
        ];
        assert!(PriceSeries::new("AAPL", points).is_err());
    }

    #[test]
    fn test_non_positive_close_rejected() {
        let result = PriceSeries::from_closes("AAPL", day(1), &[10.0, 0.0]);
        assert!(result.is_err());

        let result = PriceSeries::from_closes("AAPL", day(1), &[10.0, f64::NAN]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ensure_min_len() {
        let series = PriceSeries::from_closes("AAPL", day(1), &[10.0; 5]).unwrap();
        assert!(series.ensure_min_len(5, "test").is_ok());
        assert_eq!(
            series.ensure_min_len(60, "model training"),
            Err(AnalyticsError::insufficient("model training", 60, 5))
        );
    }
}
