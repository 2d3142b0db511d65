//! Linear score boosting

use serde::{Deserialize, Serialize};

use crate::lookup::model::LookupCandidate;

/// `score' = score * multiplier + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreOptions {
    pub multiplier: f64,
    pub offset: f64,
}

impl ScoreOptions {
    pub fn new(multiplier: f64, offset: f64) -> Self {
        Self { multiplier, offset }
    }

    pub fn apply(&self, score: f64) -> f64 {
        score * self.multiplier + self.offset
    }

    pub fn is_identity(&self) -> bool {
        self.multiplier == 1.0 && self.offset == 0.0
    }
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            offset: 0.0,
        }
    }
}

/// Rescore candidates without reordering them or touching the inputs
pub fn adjust_scores(candidates: &[LookupCandidate], options: Option<&ScoreOptions>) -> Vec<LookupCandidate> {
    match options {
        Some(options) => candidates
            .iter()
            .map(|c| c.with_score(options.apply(c.score())))
            .collect(),
        None => candidates.to_vec(),
    }
}
