use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
            SignalAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// Direction of a single indicator vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Bullish,
    Bearish,
    Neutral,
}

/// One contributing reason in a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReason {
    /// Indicator that cast the vote, e.g. `sma_20/sma_50` or `rsi_14`.
    pub indicator: String,
    pub vote: Vote,
    /// Value that triggered the vote (difference, RSI level, histogram).
    pub value: f64,
    pub description: String,
}

impl fmt::Display for SignalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl VoteTally {
    pub fn record(&mut self, vote: Vote) {
        match vote {
            Vote::Bullish => self.bullish += 1,
            Vote::Bearish => self.bearish += 1,
            Vote::Neutral => self.neutral += 1,
        }
    }

    /// Indicators whose inputs were defined on the evaluated bar.
    pub fn applicable(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalVerdict {
    pub symbol: String,
    pub action: SignalAction,
    /// Percentage in [0, 100].
    pub confidence: f64,
    pub reasons: Vec<SignalReason>,
    pub as_of: NaiveDate,
    pub tally: VoteTally,
    pub generated_at: DateTime<Utc>,
}

impl SignalVerdict {
    pub fn reason_texts(&self) -> Vec<String> {
        self.reasons.iter().map(|r| r.description.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_uppercase() {
        let json = serde_json::to_string(&SignalAction::Buy).unwrap();
        assert_eq!(json, "\"BUY\"");
        assert_eq!(SignalAction::Hold.to_string(), "HOLD");
    }

    #[test]
    fn test_tally_counts_applicable() {
        let mut tally = VoteTally::default();
        tally.record(Vote::Bullish);
        tally.record(Vote::Neutral);
        tally.record(Vote::Bullish);
        assert_eq!(tally.bullish, 2);
        assert_eq!(tally.applicable(), 3);
    }
}
