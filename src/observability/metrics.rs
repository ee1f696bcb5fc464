//! Metrics collection.
//!
//! Prometheus-compatible counters for the scheduler. The `metrics` macros
//! are no-ops until [`init_metrics`] installs a recorder, so the library
//! can record unconditionally.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::SequencerError;
use crate::phase::Phase;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// How a sequence reached completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Ran every phase on timers.
    Animated,
    /// Skipped straight to the end.
    ReducedMotion,
}

impl CompletionMode {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Animated => "animated",
            Self::ReducedMotion => "reduced_motion",
        }
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `SequencerError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), SequencerError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| SequencerError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "omikuji_phase_transitions_total",
        "Phases entered on timers, by phase"
    );
    describe_counter!(
        "omikuji_sequences_completed_total",
        "Sequences that reached completion, by mode"
    );
    describe_counter!(
        "omikuji_sequence_restarts_total",
        "Explicit sequence restarts"
    );
    describe_counter!(
        "omikuji_stale_timers_discarded_total",
        "Timers that fired after their run was superseded, by kind"
    );
}

/// Records entry into `phase`.
pub fn record_phase_transition(phase: Phase) {
    counter!("omikuji_phase_transitions_total", "phase" => phase.as_str()).increment(1);
}

/// Records a completed sequence.
pub fn record_completion(mode: CompletionMode) {
    counter!("omikuji_sequences_completed_total", "mode" => mode.as_str()).increment(1);
}

/// Records a restart.
pub fn record_restart() {
    counter!("omikuji_sequence_restarts_total").increment(1);
}

/// Records a discarded stale timer. `kind` is one of a fixed set of labels.
pub fn record_stale_timer(kind: &'static str) {
    counter!("omikuji_stale_timers_discarded_total", "kind" => kind).increment(1);
}
