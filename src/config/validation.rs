//! Configuration validation.
//!
//! Validation collects ALL issues (doesn't stop at first) so a single run
//! of `omikuji validate` reports everything wrong with a file.

use std::time::Duration;

use crate::config::schema::{SequencerConfig, TableSpec};
use crate::error::{ConfigError, Severity, ValidationIssue};
use crate::phase::{PHASE_COUNT, Phase, PresetName};

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &SequencerConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        let total = self.validate_table(config.table.as_ref());
        let interval = self.validate_message_interval(config);

        if let (Some(total), Some(interval)) = (total, interval) {
            if interval > total {
                self.add_warning(
                    "message_interval",
                    &format!(
                        "interval {} is longer than the whole sequence ({}); no message will rotate before completion",
                        humantime::format_duration(interval),
                        humantime::format_duration(total)
                    ),
                );
            }
        }

        if config.thresholds.overlaps() {
            self.add_warning(
                "thresholds",
                &format!(
                    "exceptionally_bad ({}) is not below exceptionally_good ({}); overlapping magnitudes classify as good",
                    config.thresholds.exceptionally_bad, config.thresholds.exceptionally_good
                ),
            );
        }

        if config.status_messages.as_ref().is_some_and(Vec::is_empty) {
            self.add_warning(
                "status_messages",
                "status message list is empty; no status text will be shown",
            );
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Table
    // ========================================================================

    /// Validates the table and returns its total duration if it is usable.
    fn validate_table(&mut self, spec: Option<&TableSpec>) -> Option<Duration> {
        match spec {
            None => Some(PresetName::default().table().total_duration()),
            Some(TableSpec::Preset(name)) => match name.parse::<PresetName>() {
                Ok(preset) => Some(preset.table().total_duration()),
                Err(e) => {
                    self.add_error("table", &e.to_string());
                    None
                }
            },
            Some(TableSpec::Explicit(entries)) => {
                let before = self.errors.len();

                if entries.len() != PHASE_COUNT {
                    self.add_error(
                        "table",
                        &format!(
                            "expected {PHASE_COUNT} entries (one per phase), got {}",
                            entries.len()
                        ),
                    );
                }

                let mut total = Some(Duration::ZERO);
                for (i, entry) in entries.iter().enumerate() {
                    match entry.phase.parse::<Phase>() {
                        Ok(phase) => {
                            if let Some(expected) = Phase::ALL.get(i) {
                                if phase != *expected {
                                    self.add_error(
                                        &format!("table[{i}].phase"),
                                        &format!("expected '{expected}' at this position, got '{phase}'"),
                                    );
                                }
                            }
                        }
                        Err(e) => self.add_error(&format!("table[{i}].phase"), &e.to_string()),
                    }

                    let path = format!("table[{i}].duration");
                    match entry.duration.to_duration(&path) {
                        Ok(d) if d.is_zero() => {
                            self.add_error(&path, "duration must be greater than zero");
                        }
                        Ok(d) => match total.map(|t| t.checked_add(d)) {
                            Some(Some(sum)) => total = Some(sum),
                            Some(None) => {
                                self.add_error(&path, "cumulative table duration is too large");
                                total = None;
                            }
                            None => {}
                        },
                        Err(e) => self.add_error(&path, &issue_text(&e)),
                    }
                }

                total.filter(|_| self.errors.len() == before)
            }
        }
    }

    // ========================================================================
    // Timing
    // ========================================================================

    fn validate_message_interval(&mut self, config: &SequencerConfig) -> Option<Duration> {
        let Some(value) = &config.message_interval else {
            return Some(crate::phase::DEFAULT_MESSAGE_INTERVAL);
        };
        match value.to_duration("message_interval") {
            Ok(d) if d.is_zero() => {
                self.add_error("message_interval", "interval must be greater than zero");
                None
            }
            Ok(d) => Some(d),
            Err(e) => {
                self.add_error("message_interval", &issue_text(&e));
                None
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

/// Message for an issue whose path is reported separately.
fn issue_text(err: &ConfigError) -> String {
    match err {
        ConfigError::InvalidValue {
            value, expected, ..
        } => format!("invalid value '{value}', expected {expected}"),
        other => other.to_string(),
    }
}
