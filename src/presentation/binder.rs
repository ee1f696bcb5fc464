//! Phase-to-visibility binding.
//!
//! A pure mapping from `(phase, magnitude)` to the set of decorative
//! elements that should be on screen. No timers, no state.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Magnitude cut-offs for the exceptional fortune tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FortuneThresholds {
    /// Magnitudes at or above this are exceptionally good.
    pub exceptionally_good: i32,
    /// Magnitudes at or below this are exceptionally bad.
    pub exceptionally_bad: i32,
}

impl FortuneThresholds {
    /// Default good cut-off (the top of the fortune scale).
    pub const DEFAULT_GOOD: i32 = 4;
    /// Default bad cut-off (the bottom of the fortune scale).
    pub const DEFAULT_BAD: i32 = -2;

    /// Returns `true` if some magnitude is both good and bad.
    #[must_use]
    pub const fn overlaps(self) -> bool {
        self.exceptionally_bad >= self.exceptionally_good
    }
}

impl Default for FortuneThresholds {
    fn default() -> Self {
        Self {
            exceptionally_good: Self::DEFAULT_GOOD,
            exceptionally_bad: Self::DEFAULT_BAD,
        }
    }
}

/// Classification of a fortune magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortuneTone {
    /// At or above the good threshold.
    ExceptionallyGood,
    /// At or below the bad threshold.
    ExceptionallyBad,
    /// Everything in between.
    Ordinary,
}

impl FortuneTone {
    /// Classifies `magnitude`. With overlapping thresholds, good wins.
    #[must_use]
    pub const fn classify(magnitude: i32, thresholds: FortuneThresholds) -> Self {
        if magnitude >= thresholds.exceptionally_good {
            Self::ExceptionallyGood
        } else if magnitude <= thresholds.exceptionally_bad {
            Self::ExceptionallyBad
        } else {
            Self::Ordinary
        }
    }

    /// Returns `true` for either exceptional tone.
    #[must_use]
    pub const fn is_exceptional(self) -> bool {
        !matches!(self, Self::Ordinary)
    }
}

/// Visibility of each decorative element for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Visibility {
    /// Shrine gate, shown only while passing through it.
    pub gate: bool,
    /// Approach-path background, shown once the gate is passed.
    pub path_background: bool,
    /// Fortune container.
    pub container: bool,
    /// Whether the container is animating its shake.
    pub container_shaking: bool,
    /// The ejected stick.
    pub stick: bool,
    /// Good or bad flourish at the reveal.
    pub special_effects: bool,
    /// Tone of the fortune, for styling the flourish.
    pub tone: FortuneTone,
}

/// Computes [`Visibility`] from the current phase and fortune magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentationBinder {
    thresholds: FortuneThresholds,
}

impl PresentationBinder {
    /// Creates a binder using `thresholds`.
    #[must_use]
    pub const fn new(thresholds: FortuneThresholds) -> Self {
        Self { thresholds }
    }

    /// The thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> FortuneThresholds {
        self.thresholds
    }

    /// Derives the visibility set. Total over every phase and magnitude.
    #[must_use]
    pub const fn bind(&self, phase: Phase, magnitude: i32) -> Visibility {
        let tone = FortuneTone::classify(magnitude, self.thresholds);
        Visibility {
            gate: matches!(phase, Phase::GatePass),
            path_background: !matches!(phase, Phase::GatePass),
            container: matches!(
                phase,
                Phase::ContainerShake | Phase::StickEject | Phase::Reveal
            ),
            container_shaking: matches!(phase, Phase::ContainerShake),
            stick: matches!(phase, Phase::StickEject | Phase::Reveal),
            special_effects: matches!(phase, Phase::Reveal) && tone.is_exceptional(),
            tone,
        }
    }
}
