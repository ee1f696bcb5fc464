//! Declarative phase table.
//!
//! The five-phase sequence is data, not control flow: a [`PhaseTable`] is an
//! ordered, validated array of `{phase, duration, start}` entries from which
//! the scheduler derives every timer it arms.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PhaseTableError};

/// Number of phases in every table.
pub const PHASE_COUNT: usize = 5;

/// One stage of the draw animation, in fixed sequence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Passing through the shrine gate.
    GatePass,
    /// The approach path comes into view.
    PathReveal,
    /// The fortune container is shaken.
    ContainerShake,
    /// A stick is ejected from the container.
    StickEject,
    /// The drawn fortune is shown. Terminal.
    Reveal,
}

impl Phase {
    /// All phases in sequence order.
    pub const ALL: [Self; PHASE_COUNT] = [
        Self::GatePass,
        Self::PathReveal,
        Self::ContainerShake,
        Self::StickEject,
        Self::Reveal,
    ];

    /// The terminal phase.
    pub const TERMINAL: Self = Self::Reveal;

    /// Zero-based position in the sequence.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable kebab-case name, used in logs, metrics labels and config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GatePass => "gate-pass",
            Self::PathReveal => "path-reveal",
            Self::ContainerShake => "container-shake",
            Self::StickEject => "stick-eject",
            Self::Reveal => "reveal",
        }
    }

    /// Returns `true` for the last phase of the sequence.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Reveal)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "phase".to_string(),
                value: s.to_string(),
                expected: format!(
                    "one of {}",
                    Self::ALL.map(Self::as_str).join(", ")
                ),
            })
    }
}

/// Timing for a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseDefinition {
    /// Which phase this entry describes.
    pub phase: Phase,
    /// Time spent in the phase.
    #[serde(with = "millis")]
    pub duration: Duration,
    /// Offset from sequence start at which the phase becomes active.
    #[serde(with = "millis")]
    pub start: Duration,
}

impl PhaseDefinition {
    /// Offset from sequence start at which the phase ends.
    #[must_use]
    pub fn end(&self) -> Duration {
        self.start.saturating_add(self.duration)
    }
}

/// Named built-in tables.
///
/// Both shipped timings are kept; neither is assumed authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetName {
    /// 1000/1000/1500/1000/500 ms, five seconds total.
    #[default]
    Standard,
    /// 4000/500/1500/1000/500 ms with a lengthened gate pass, 7.5 seconds total.
    Extended,
}

impl PresetName {
    /// Every preset, for listings and suggestions.
    pub const ALL: [Self; 2] = [Self::Standard, Self::Extended];

    /// Config-file spelling of the preset.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Extended => "extended",
        }
    }

    /// Builds the preset's table.
    #[must_use]
    pub fn table(self) -> PhaseTable {
        match self {
            Self::Standard => PhaseTable::standard(),
            Self::Extended => PhaseTable::extended(),
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(preset) = Self::ALL.into_iter().find(|p| p.as_str() == s) {
            return Ok(preset);
        }
        let suggestion = Self::ALL
            .into_iter()
            .map(|p| (p, strsim::jaro_winkler(s, p.as_str())))
            .filter(|(_, score)| *score > 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p.as_str().to_string());
        Err(ConfigError::UnknownPreset {
            name: s.to_string(),
            suggestion,
        })
    }
}

/// A validated, contiguous, gapless table of the five phases.
///
/// Invariants, checked by [`PhaseTable::new`]:
/// - exactly one entry per [`Phase`], in [`Phase::ALL`] order
/// - every duration is strictly positive
/// - `start[0] == 0` and `start[i] == start[i - 1] + duration[i - 1]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhaseTable {
    entries: [PhaseDefinition; PHASE_COUNT],
}

impl PhaseTable {
    /// Validates `entries` and builds a table.
    ///
    /// # Errors
    ///
    /// Returns a [`PhaseTableError`] describing the first violated invariant.
    pub fn new(entries: Vec<PhaseDefinition>) -> Result<Self, PhaseTableError> {
        let entries: [PhaseDefinition; PHASE_COUNT] = entries.try_into().map_err(
            |rejected: Vec<PhaseDefinition>| PhaseTableError::WrongLength {
                expected: PHASE_COUNT,
                actual: rejected.len(),
            },
        )?;

        let mut expected_start = Duration::ZERO;
        for (index, (entry, expected)) in entries.iter().zip(Phase::ALL).enumerate() {
            if entry.phase != expected {
                return Err(PhaseTableError::OutOfOrder {
                    index,
                    expected,
                    actual: entry.phase,
                });
            }
            if entry.duration.is_zero() {
                return Err(PhaseTableError::ZeroDuration { phase: entry.phase });
            }
            if entry.start != expected_start {
                return Err(PhaseTableError::Discontiguous {
                    phase: entry.phase,
                    expected: expected_start,
                    actual: entry.start,
                });
            }
            expected_start = expected_start
                .checked_add(entry.duration)
                .ok_or(PhaseTableError::Overflow { phase: entry.phase })?;
        }

        Ok(Self { entries })
    }

    /// Builds a table from per-phase durations, deriving contiguous starts.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseTableError::ZeroDuration`] if any duration is zero and
    /// [`PhaseTableError::Overflow`] if the offsets do not fit in a `Duration`.
    pub fn from_durations(durations: [Duration; PHASE_COUNT]) -> Result<Self, PhaseTableError> {
        let mut start = Duration::ZERO;
        let mut entries = Vec::with_capacity(PHASE_COUNT);
        for (phase, duration) in Phase::ALL.into_iter().zip(durations) {
            entries.push(PhaseDefinition {
                phase,
                duration,
                start,
            });
            start = start
                .checked_add(duration)
                .ok_or(PhaseTableError::Overflow { phase })?;
        }
        Self::new(entries)
    }

    /// The five-second table.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_millis_unchecked([1000, 1000, 1500, 1000, 500])
    }

    /// The 7.5-second table with a lengthened gate pass.
    #[must_use]
    pub fn extended() -> Self {
        Self::from_millis_unchecked([4000, 500, 1500, 1000, 500])
    }

    // Only for the built-in constants above, which are covered by tests.
    fn from_millis_unchecked(millis: [u64; PHASE_COUNT]) -> Self {
        let mut start = 0;
        let entries = std::array::from_fn(|i| {
            let entry = PhaseDefinition {
                phase: Phase::ALL[i],
                duration: Duration::from_millis(millis[i]),
                start: Duration::from_millis(start),
            };
            start += millis[i];
            entry
        });
        Self { entries }
    }

    /// Entries in sequence order.
    #[must_use]
    pub const fn entries(&self) -> &[PhaseDefinition; PHASE_COUNT] {
        &self.entries
    }

    /// The entry for `phase`.
    #[must_use]
    pub const fn get(&self, phase: Phase) -> &PhaseDefinition {
        &self.entries[phase.index()]
    }

    /// The first entry.
    #[must_use]
    pub const fn first(&self) -> &PhaseDefinition {
        &self.entries[0]
    }

    /// The terminal entry.
    #[must_use]
    pub const fn terminal(&self) -> &PhaseDefinition {
        &self.entries[PHASE_COUNT - 1]
    }

    /// Offset at which the sequence completes.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.terminal().end()
    }

    /// Phase whose window contains `elapsed`, saturating at the terminal phase.
    #[must_use]
    pub fn phase_at(&self, elapsed: Duration) -> Phase {
        self.entries
            .iter()
            .rev()
            .find(|e| e.start <= elapsed)
            .map_or(Phase::GatePass, |e| e.phase)
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self::standard()
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
