//! Error types for the omikuji sequencer.
//!
//! The sequencer core has no fallible I/O: a malformed phase table is a
//! programming error reported at construction, and stale timers are
//! discarded silently. The remaining variants cover the configuration
//! loader and the command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::phase::Phase;

// ============================================================================
// Exit Codes
// ============================================================================

/// Process exit codes for the `omikuji` binary.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for sequencer operations.
///
/// Aggregates the domain errors and maps each to an exit code.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scheduler could not be constructed
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SequencerError {
    /// Returns the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Scheduler(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Phase Table Errors
// ============================================================================

/// A phase table that violates the contiguous, ordered, five-entry layout.
///
/// These are programming errors in a static table. The scheduler's liveness
/// guarantees assume a well-formed table, so construction fails fast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseTableError {
    /// Wrong number of entries
    #[error("phase table must have {expected} entries, got {actual}")]
    WrongLength {
        /// Required entry count
        expected: usize,
        /// Entry count supplied
        actual: usize,
    },

    /// An entry names the wrong phase for its position
    #[error("phase table entry {index} must be {expected}, got {actual}")]
    OutOfOrder {
        /// Position in the table
        index: usize,
        /// Phase required at this position
        expected: Phase,
        /// Phase supplied
        actual: Phase,
    },

    /// An entry has a zero duration
    #[error("phase {phase} has a zero duration")]
    ZeroDuration {
        /// Offending phase
        phase: Phase,
    },

    /// An entry does not start where the previous one ends
    #[error("phase {phase} starts at {actual:?}, expected {expected:?}")]
    Discontiguous {
        /// Offending phase
        phase: Phase,
        /// Start offset required for a gapless table
        expected: Duration,
        /// Start offset supplied
        actual: Duration,
    },

    /// Cumulative offsets exceed what a `Duration` can represent
    #[error("phase {phase} ends beyond the representable time range")]
    Overflow {
        /// Phase whose end offset overflowed
        phase: Phase,
    },
}

// ============================================================================
// Scheduler Errors
// ============================================================================

/// Errors raised while mounting a [`PhaseScheduler`](crate::phase::PhaseScheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Timers need a Tokio runtime and none is active on this thread
    #[error("phase scheduler must be created inside a Tokio runtime")]
    RuntimeUnavailable,
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Explicit table violates a [`PhaseTable`](crate::phase::PhaseTable) invariant
    #[error("invalid phase table: {0}")]
    InvalidTable(#[from] PhaseTableError),

    /// Named table preset does not exist
    #[error("unknown table preset '{name}'{}", suggestion_suffix(.suggestion.as_deref()))]
    UnknownPreset {
        /// Name supplied by the user
        name: String,
        /// Closest known preset, if any is similar enough
        suggestion: Option<String>,
    },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn suggestion_suffix(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "table[2].duration")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Reported but does not block loading
    Warning,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for sequencer operations.
pub type Result<T> = std::result::Result<T, SequencerError>;

// ============================================================================
// Tests
// ============================================================================
