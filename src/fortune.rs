//! Drawn fortune input.
//!
//! The sequencer never performs a draw. It is handed a [`FortuneResult`]
//! and only reads its magnitude (for classification) and label (for
//! display pass-through).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::presentation::{FortuneThresholds, FortuneTone};

/// A drawn fortune, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortuneResult {
    /// Numeric strength of the fortune. Higher is better.
    pub magnitude: i32,
    /// Short display label, passed through untouched.
    pub label: String,
}

impl FortuneResult {
    /// Creates a fortune result.
    #[must_use]
    pub fn new(magnitude: i32, label: impl Into<String>) -> Self {
        Self {
            magnitude,
            label: label.into(),
        }
    }

    /// Classifies this fortune against `thresholds`.
    #[must_use]
    pub const fn tone(&self, thresholds: FortuneThresholds) -> FortuneTone {
        FortuneTone::classify(self.magnitude, thresholds)
    }
}

impl fmt::Display for FortuneResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:+})", self.label, self.magnitude)
    }
}
