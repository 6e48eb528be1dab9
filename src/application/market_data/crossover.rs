use crate::domain::market::indicator_set::IndicatorValue;
use crate::domain::trading::signal::Vote;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A sign change of `short - long`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossEvent {
    pub index: usize,
    /// `Bullish` for a golden cross, `Bearish` for a death cross.
    pub direction: Vote,
    pub difference: f64,
}

/// Streaming cross detector over `(short, long)` pairs.
///
/// Remembers the last side the short average was strictly on. A zero
/// difference is a touch and keeps the remembered side, so touching and
/// continuing never produces a second event.
#[derive(Debug, Clone, Default)]
pub struct CrossoverTracker {
    last_was_above: Option<bool>,
}

impl CrossoverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next pair; returns the cross direction when the side flips.
    /// An unavailable pair breaks the history.
    pub fn update(&mut self, short: IndicatorValue, long: IndicatorValue) -> Option<Vote> {
        let (Some(s), Some(l)) = (short, long) else {
            self.last_was_above = None;
            return None;
        };

        let is_above = match (s - l).partial_cmp(&0.0)? {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => return None,
        };

        let crossed = match self.last_was_above {
            Some(true) if !is_above => Some(Vote::Bearish),
            Some(false) if is_above => Some(Vote::Bullish),
            _ => None,
        };
        self.last_was_above = Some(is_above);
        crossed
    }

    pub fn last_was_above(&self) -> Option<bool> {
        self.last_was_above
    }
}

/// Every cross over the whole history, in chronological order.
pub fn cross_events(short: &[IndicatorValue], long: &[IndicatorValue]) -> Vec<CrossEvent> {
    let mut tracker = CrossoverTracker::new();
    short
        .iter()
        .zip(long)
        .enumerate()
        .filter_map(|(index, (&s, &l))| {
            tracker.update(s, l).map(|direction| CrossEvent {
                index,
                direction,
                // update only fires when both are defined
                difference: s.unwrap_or_default() - l.unwrap_or_default(),
            })
        })
        .collect()
}

/// Cross vote at `index`.
///
/// `None` when the pair is not applicable there (either side unavailable at
/// `index` or `index - 1`). Otherwise `Bullish`/`Bearish` on a sign change
/// against the last strict side before `index`, `Neutral` if none.
pub fn cross_at(short: &[IndicatorValue], long: &[IndicatorValue], index: usize) -> Option<Vote> {
    let diff_at = |i: usize| -> Option<f64> { Some((*short.get(i)?)? - (*long.get(i)?)?) };

    let current = diff_at(index)?;
    let prev_index = index.checked_sub(1)?;
    diff_at(prev_index)?;

    let prior_side = (0..=prev_index)
        .rev()
        .map_while(diff_at)
        .find(|d| *d != 0.0)
        .map(|d| d > 0.0);

    let vote = match prior_side {
        Some(false) if current > 0.0 => Vote::Bullish,
        Some(true) if current < 0.0 => Vote::Bearish,
        _ => Vote::Neutral,
    };
    Some(vote)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined(values: &[f64]) -> Vec<IndicatorValue> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_golden_cross_fires_once() {
        let short = defined(&[1.0, 2.0, 4.0, 5.0, 6.0]);
        let long = defined(&[3.0, 3.0, 3.0, 3.0, 3.0]);

        let events = cross_events(&short, &long);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 2);
        assert_eq!(events[0].direction, Vote::Bullish);

        assert_eq!(cross_at(&short, &long, 2), Some(Vote::Bullish));
        assert_eq!(cross_at(&short, &long, 3), Some(Vote::Neutral));
    }

    #[test]
    fn test_touch_and_continue_does_not_refire() {
        // above, touch, above again
        let short = defined(&[5.0, 3.0, 5.0]);
        let long = defined(&[3.0, 3.0, 3.0]);
        assert!(cross_events(&short, &long).is_empty());
        assert_eq!(cross_at(&short, &long, 2), Some(Vote::Neutral));
    }

    #[test]
    fn test_cross_through_touch_fires_after_touch() {
        let short = defined(&[5.0, 3.0, 1.0]);
        let long = defined(&[3.0, 3.0, 3.0]);
        assert_eq!(cross_at(&short, &long, 1), Some(Vote::Neutral));
        assert_eq!(cross_at(&short, &long, 2), Some(Vote::Bearish));

        let events = cross_events(&short, &long);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 2);
    }

    #[test]
    fn test_not_applicable_without_previous_value() {
        let short = vec![None, Some(2.0), Some(4.0)];
        let long = vec![None, Some(3.0), Some(3.0)];
        assert_eq!(cross_at(&short, &long, 1), None);
        assert_eq!(cross_at(&short, &long, 2), Some(Vote::Bullish));
    }

    #[test]
    fn test_tracker_resets_on_gap() {
        let mut tracker = CrossoverTracker::new();
        assert_eq!(tracker.update(Some(1.0), Some(2.0)), None);
        assert_eq!(tracker.update(None, Some(2.0)), None);
        assert_eq!(tracker.last_was_above(), None);
        assert_eq!(tracker.update(Some(3.0), Some(2.0)), None);
    }
}
