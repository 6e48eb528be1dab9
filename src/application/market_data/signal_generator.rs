use super::crossover::cross_at;
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::market::indicator_config::IndicatorConfig;
use crate::domain::market::indicator_set::{IndicatorSet, names};
use crate::domain::trading::signal::{
    SignalAction, SignalReason, SignalVerdict, Vote, VoteTally,
};
use chrono::Utc;
use tracing::{debug, info};

/// Turns an indicator set into a BUY/SELL/HOLD verdict.
///
/// Votes (in reason order): SMA short/medium cross, SMA medium/long cross,
/// RSI zone, MACD line/signal crossover. Each indicator whose inputs are
/// defined on the evaluated bar casts one vote; the rest are skipped.
pub struct SignalGenerator {
    config: IndicatorConfig,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

impl SignalGenerator {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Verdict for the most recent bar.
    pub fn generate(&self, set: &IndicatorSet) -> AnalyticsResult<SignalVerdict> {
        let last = set.len().checked_sub(1).ok_or_else(|| {
            AnalyticsError::invalid(format!("indicator set for {} is empty", set.symbol))
        })?;
        self.generate_at(set, last)
    }

    /// Verdict for the bar at `index`, using only history up to it.
    pub fn generate_at(&self, set: &IndicatorSet, index: usize) -> AnalyticsResult<SignalVerdict> {
        let as_of = *set.dates.get(index).ok_or_else(|| {
            AnalyticsError::invalid(format!(
                "index {} outside indicator set of {} dates",
                index,
                set.len()
            ))
        })?;

        let mut reasons = Vec::new();
        let pairs = [
            (self.config.sma_short_period, self.config.sma_medium_period),
            (self.config.sma_medium_period, self.config.sma_long_period),
        ];
        for (short, long) in pairs {
            if let Some(reason) = self.cross_vote(set, index, short, long) {
                reasons.push(reason);
            }
        }
        if let Some(reason) = self.rsi_vote(set, index) {
            reasons.push(reason);
        }
        if let Some(reason) = self.macd_vote(set, index) {
            reasons.push(reason);
        }

        let mut tally = VoteTally::default();
        for reason in &reasons {
            tally.record(reason.vote);
        }
        let (action, confidence) = combine_votes(&tally);

        for reason in &reasons {
            debug!("SignalGenerator [{}]: {}", set.symbol, reason);
        }
        info!(
            "SignalGenerator: {} {} at {} ({:.1}% of {} votes)",
            set.symbol,
            action,
            as_of,
            confidence,
            tally.applicable()
        );

        Ok(SignalVerdict {
            symbol: set.symbol.clone(),
            action,
            confidence,
            reasons,
            as_of,
            tally,
            generated_at: Utc::now(),
        })
    }

    fn cross_vote(
        &self,
        set: &IndicatorSet,
        index: usize,
        short: usize,
        long: usize,
    ) -> Option<SignalReason> {
        let short_name = names::sma(short);
        let long_name = names::sma(long);
        let vote = cross_at(set.values(&short_name)?, set.values(&long_name)?, index)?;
        let difference =
            set.value_at_index(&short_name, index)? - set.value_at_index(&long_name, index)?;

        let description = match vote {
            Vote::Bullish => format!("Golden Cross ({}/{} SMA) detected", short, long),
            Vote::Bearish => format!("Death Cross ({}/{} SMA) detected", short, long),
            Vote::Neutral => format!(
                "No {}/{} SMA cross (spread {:.4})",
                short, long, difference
            ),
        };
        Some(SignalReason {
            indicator: format!("{}/{}", short_name, long_name),
            vote,
            value: difference,
            description,
        })
    }

    fn rsi_vote(&self, set: &IndicatorSet, index: usize) -> Option<SignalReason> {
        let name = names::rsi(self.config.rsi_period);
        let value = set.value_at_index(&name, index)?;

        let (vote, description) = if value < self.config.rsi_oversold {
            (Vote::Bullish, format!("RSI oversold ({:.2})", value))
        } else if value > self.config.rsi_overbought {
            (Vote::Bearish, format!("RSI overbought ({:.2})", value))
        } else {
            (Vote::Neutral, format!("RSI neutral ({:.2})", value))
        };
        Some(SignalReason {
            indicator: name,
            vote,
            value,
            description,
        })
    }

    fn macd_vote(&self, set: &IndicatorSet, index: usize) -> Option<SignalReason> {
        let line = set.values(names::MACD_LINE)?;
        let signal = set.values(names::MACD_SIGNAL)?;
        let vote = cross_at(line, signal, index)?;
        let current = line[index]? - signal[index]?;

        let description = match vote {
            Vote::Bullish => format!("MACD bullish crossover ({:.4})", current),
            Vote::Bearish => format!("MACD bearish crossover ({:.4})", current),
            Vote::Neutral => format!("MACD no crossover ({:.4})", current),
        };
        Some(SignalReason {
            indicator: "macd".to_string(),
            vote,
            value: current,
            description,
        })
    }
}

/// Majority of directional votes wins with `agreeing / applicable` confidence;
/// a tie or all-neutral tally holds with `neutral / applicable`.
pub fn combine_votes(tally: &VoteTally) -> (SignalAction, f64) {
    let applicable = tally.applicable();
    if applicable == 0 {
        return (SignalAction::Hold, 0.0);
    }
    let pct = |n: usize| (n as f64 / applicable as f64 * 100.0).clamp(0.0, 100.0);

    if tally.bullish > tally.bearish {
        (SignalAction::Buy, pct(tally.bullish))
    } else if tally.bearish > tally.bullish {
        (SignalAction::Sell, pct(tally.bearish))
    } else {
        (SignalAction::Hold, pct(tally.neutral))
    }
}
