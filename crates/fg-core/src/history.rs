//! Rolling focus score history
//!
//! A FIFO of relevance scores (0..=100). The rounded mean is the focus score
//! shown in the popup.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of scores kept.
pub const SCORE_HISTORY_CAPACITY: usize = 100;

/// Score recorded for whitelisted or passed pages.
pub const TRUSTED_SCORE: u8 = 100;

/// Bounded, ordered score log. Serialized as a plain array under
/// `focus_scores_history`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct ScoreHistory {
    entries: VecDeque<u8>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a score, evicting the oldest entry past capacity.
    pub fn record(&mut self, score: u8) {
        self.entries.push_back(score.min(100));
        while self.entries.len() > SCORE_HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Arithmetic mean, or `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: u32 = self.entries.iter().map(|&s| u32::from(s)).sum();
        Some(f64::from(sum) / self.entries.len() as f64)
    }

    /// Mean rounded to the nearest integer.
    pub fn focus_score(&self) -> Option<u8> {
        self.average().map(|avg| avg.round() as u8)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.iter().copied()
    }

    pub fn latest(&self) -> Option<u8> {
        self.entries.back().copied()
    }
}

impl From<Vec<u8>> for ScoreHistory {
    fn from(scores: Vec<u8>) -> Self {
        let mut history = Self::new();
        for score in scores {
            history.record(score);
        }
        history
    }
}

impl From<ScoreHistory> for Vec<u8> {
    fn from(history: ScoreHistory) -> Self {
        history.entries.into()
    }
}
