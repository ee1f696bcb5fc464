//! Configuration schema.
//!
//! Mirrors the YAML file layout. Phase names and durations stay as raw
//! values here so the validator can report every bad entry, not just the
//! first one serde trips over.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::phase::{
    DEFAULT_MESSAGE_INTERVAL, PHASE_COUNT, Phase, PhaseTable, PresetName, SchedulerOptions,
};
use crate::presentation::{FortuneThresholds, PresentationBinder, StatusMessages};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequencerConfig {
    /// Preset name or explicit phase list. Defaults to `standard`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSpec>,

    /// Status message tick period, e.g. `500ms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_interval: Option<DurationValue>,

    /// Skip straight to the completed state.
    #[serde(default)]
    pub reduced_motion: bool,

    /// Magnitude cut-offs for the special effects.
    #[serde(default)]
    pub thresholds: FortuneThresholds,

    /// Replaces the default status messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_messages: Option<Vec<String>>,
}

/// How the phase table is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableSpec {
    /// A named built-in table.
    Preset(String),
    /// Five explicit entries; start offsets are derived.
    Explicit(Vec<PhaseEntryConfig>),
}

/// One explicit table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseEntryConfig {
    /// Phase name, e.g. `gate-pass`.
    pub phase: String,
    /// Time spent in the phase.
    pub duration: DurationValue,
}

/// A duration written either as bare milliseconds or as humantime text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    /// Bare integer, in milliseconds.
    Millis(u64),
    /// Human-readable text such as `1s` or `1500ms`.
    Text(String),
}

impl DurationValue {
    /// Parses the value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the text is not a valid
    /// humantime duration.
    pub fn to_duration(&self, field: &str) -> Result<Duration, ConfigError> {
        match self {
            Self::Millis(ms) => Ok(Duration::from_millis(*ms)),
            Self::Text(text) => {
                humantime::parse_duration(text.trim()).map_err(|e| ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: text.clone(),
                    expected: format!("a duration such as '500ms' or '1s' ({e})"),
                })
            }
        }
    }
}

impl TableSpec {
    /// Builds the phase table.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown preset, a bad phase name or
    /// duration, or a table that fails [`PhaseTable`] validation.
    pub fn resolve(&self) -> Result<PhaseTable, ConfigError> {
        match self {
            Self::Preset(name) => Ok(name.parse::<PresetName>()?.table()),
            Self::Explicit(entries) => {
                if entries.len() != PHASE_COUNT {
                    return Err(ConfigError::InvalidValue {
                        field: "table".to_string(),
                        value: format!("{} entries", entries.len()),
                        expected: format!("{PHASE_COUNT} entries"),
                    });
                }
                let mut durations = [Duration::ZERO; PHASE_COUNT];
                for (i, (entry, expected)) in entries.iter().zip(Phase::ALL).enumerate() {
                    let phase: Phase = entry.phase.parse()?;
                    if phase != expected {
                        return Err(ConfigError::InvalidValue {
                            field: format!("table[{i}].phase"),
                            value: entry.phase.clone(),
                            expected: expected.to_string(),
                        });
                    }
                    durations[i] = entry.duration.to_duration(&format!("table[{i}].duration"))?;
                }
                PhaseTable::from_durations(durations).map_err(ConfigError::from)
            }
        }
    }
}

/// Fully resolved settings, ready to mount a scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Validated phase table.
    pub table: PhaseTable,
    /// Status message tick period.
    pub message_interval: Duration,
    /// Reduced-motion bypass.
    pub reduced_motion: bool,
    /// Fortune thresholds for the binder.
    pub thresholds: FortuneThresholds,
    /// Status messages to rotate through.
    pub status_messages: StatusMessages,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            table: PhaseTable::default(),
            message_interval: DEFAULT_MESSAGE_INTERVAL,
            reduced_motion: false,
            thresholds: FortuneThresholds::default(),
            status_messages: StatusMessages::default(),
        }
    }
}

impl ResolvedConfig {
    /// Scheduler options carrying the timing settings, without callbacks.
    #[must_use]
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions::default()
            .reduced_motion(self.reduced_motion)
            .message_interval(self.message_interval)
    }

    /// A binder using the configured thresholds.
    #[must_use]
    pub const fn binder(&self) -> PresentationBinder {
        PresentationBinder::new(self.thresholds)
    }
}

impl SequencerConfig {
    /// Resolves raw settings into typed values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered. Use the validator for
    /// a complete report.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let table = match &self.table {
            Some(spec) => spec.resolve()?,
            None => PhaseTable::default(),
        };
        let message_interval = match &self.message_interval {
            Some(value) => value.to_duration("message_interval")?,
            None => DEFAULT_MESSAGE_INTERVAL,
        };
        let status_messages = self
            .status_messages
            .clone()
            .map_or_else(StatusMessages::default, StatusMessages::new);

        Ok(ResolvedConfig {
            table,
            message_interval,
            reduced_motion: self.reduced_motion,
            thresholds: self.thresholds,
            status_messages,
        })
    }
}
