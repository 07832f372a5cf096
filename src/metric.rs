//! Evaluation score aggregation.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Aggregated outcome of one evaluation round.
///
/// Bundles the headline metric the plateau controller monitors with the full
/// named score map and a human-readable report. The score map must contain a
/// `"loss"` entry, which is also the natural auxiliary metric for
/// tie-breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalScore {
    /// The headline metric for this round.
    pub main_score: f64,
    /// All named scores, including `"loss"`.
    pub scores: HashMap<String, f64>,
    /// Detailed per-class/per-label results, preformatted.
    pub detailed_results: String,
}

impl EvalScore {
    /// Build a score bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingLoss`] if `scores` has no `"loss"` entry.
    pub fn new(
        main_score: f64,
        scores: HashMap<String, f64>,
        detailed_results: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if !scores.contains_key("loss") {
            return Err(ConfigError::MissingLoss);
        }
        Ok(Self {
            main_score,
            scores,
            detailed_results: detailed_results.into(),
        })
    }

    /// The recorded loss.
    pub fn loss(&self) -> f64 {
        self.scores["loss"]
    }
}

impl fmt::Display for EvalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\nLoss: {}", self.detailed_results, self.loss())
    }
}
