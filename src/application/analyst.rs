use crate::application::indicators::compute_indicator_set;
use crate::application::market_data::signal_generator::SignalGenerator;
use crate::domain::errors::AnalyticsResult;
use crate::domain::market::indicator_config::IndicatorConfig;
use crate::domain::market::indicator_set::{IndicatorSet, IndicatorValue};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::trading::signal::SignalVerdict;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Indicators, latest values and verdict for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub indicators: IndicatorSet,
    pub latest_values: BTreeMap<String, IndicatorValue>,
    pub verdict: SignalVerdict,
}

/// Technical analysis over complete price histories: indicator set, then verdict.
pub struct TechnicalAnalyst {
    generator: SignalGenerator,
}

impl Default for TechnicalAnalyst {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

impl TechnicalAnalyst {
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            generator: SignalGenerator::new(config),
        }
    }

    pub fn config(&self) -> &IndicatorConfig {
        self.generator.config()
    }

    pub fn analyze(&self, series: &PriceSeries) -> AnalyticsResult<SymbolAnalysis> {
        let indicators = compute_indicator_set(series, self.config())?;
        let verdict = self.generator.generate(&indicators)?;
        Ok(SymbolAnalysis {
            symbol: series.symbol().to_string(),
            latest_values: indicators.latest(),
            indicators,
            verdict,
        })
    }

    /// Analyzes independent series in parallel; results keep input order and
    /// a failure for one symbol does not affect the others.
    pub fn analyze_many(&self, series: &[PriceSeries]) -> Vec<AnalyticsResult<SymbolAnalysis>> {
        series.par_iter().map(|s| self.analyze(s)).collect()
    }
}

/// Free-function form of [`TechnicalAnalyst::analyze_many`].
pub fn analyze_many(
    series: &[PriceSeries],
    config: &IndicatorConfig,
) -> Vec<AnalyticsResult<SymbolAnalysis>> {
    TechnicalAnalyst::new(config.clone()).analyze_many(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::from_closes(symbol, start, closes).unwrap()
    }

    #[test]
    fn test_analyze_reports_latest_values() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let analysis = TechnicalAnalyst::default()
            .analyze(&series("AAPL", &closes))
            .unwrap();

        assert_eq!(analysis.symbol, "AAPL");
        assert_eq!(analysis.latest_values["sma_20"], Some(149.5));
        assert_eq!(analysis.latest_values["sma_200"], None);
        assert_eq!(analysis.verdict.as_of, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_analyze_many_keeps_input_order() {
        let inputs = vec![
            series("AAA", &[10.0; 30]),
            series("BBB", &[20.0; 5]),
            series("CCC", &[30.0; 80]),
        ];
        let results = analyze_many(&inputs, &IndicatorConfig::default());

        let symbols: Vec<String> = results
            .iter()
            .map(|r| r.as_ref().unwrap().symbol.clone())
            .collect();
        assert_eq!(symbols, vec!["AAA", "BBB", "CCC"]);
    }

    #[test]
    fn test_analyze_many_reports_error_per_symbol() {
        let inputs = vec![series("AAA", &[10.0; 30]), series("BBB", &[20.0; 30])];
        let config = IndicatorConfig {
            rsi_period: 0,
            ..Default::default()
        };
        let results = analyze_many(&inputs, &config);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_err));
    }
}
