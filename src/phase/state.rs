//! Scheduler state.
//!
//! [`RunState`] is the mutable state owned by one scheduler. Consumers only
//! ever see [`SchedulerSnapshot`], a copy published after every change.

use serde::Serialize;

use super::table::Phase;

/// Read-only view of a scheduler at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    /// Phase currently active.
    pub phase: Phase,
    /// Whether the terminal phase has run its full duration.
    pub is_complete: bool,
    /// Status message counter. Unbounded; clamp against the message list.
    pub message_index: usize,
}

impl SchedulerSnapshot {
    /// Snapshot at the start of a run.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            phase: Phase::GatePass,
            is_complete: false,
            message_index: 0,
        }
    }

    /// Snapshot of a finished sequence, used by the reduced-motion bypass.
    #[must_use]
    pub const fn finished() -> Self {
        Self {
            phase: Phase::TERMINAL,
            is_complete: true,
            message_index: 0,
        }
    }
}

/// Mutable state behind the scheduler's lock.
///
/// `generation` is bumped on every run start and on teardown. Timers capture
/// the generation they were armed under and are discarded if it no longer
/// matches when they fire.
#[derive(Debug)]
pub(crate) struct RunState {
    pub(crate) snapshot: SchedulerSnapshot,
    pub(crate) generation: u64,
    pub(crate) completion_delivered: bool,
    pub(crate) torn_down: bool,
}

impl RunState {
    pub(crate) const fn new(snapshot: SchedulerSnapshot, completion_delivered: bool) -> Self {
        Self {
            snapshot,
            generation: 0,
            completion_delivered,
            torn_down: false,
        }
    }

    /// Returns `true` if a timer armed under `generation` may still act.
    pub(crate) const fn is_current(&self, generation: u64) -> bool {
        !self.torn_down && self.generation == generation
    }

    /// Starts a new generation and resets the observable state.
    ///
    /// Returns the new generation.
    pub(crate) const fn begin_run(&mut self) -> u64 {
        self.generation += 1;
        self.snapshot = SchedulerSnapshot::initial();
        self.completion_delivered = false;
        self.generation
    }

    /// Enters `phase`. Returns `false` if that would move the phase backward.
    pub(crate) fn enter(&mut self, phase: Phase) -> bool {
        if phase < self.snapshot.phase {
            return false;
        }
        self.snapshot.phase = phase;
        true
    }

    /// Marks the run complete. Returns `true` exactly once per generation.
    pub(crate) const fn complete(&mut self) -> bool {
        self.snapshot.is_complete = true;
        if self.completion_delivered {
            return false;
        }
        self.completion_delivered = true;
        true
    }

    pub(crate) const fn advance_message(&mut self) -> usize {
        self.snapshot.message_index = self.snapshot.message_index.saturating_add(1);
        self.snapshot.message_index
    }

    /// Invalidates every outstanding timer. Idempotent.
    pub(crate) const fn tear_down(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.generation += 1;
        true
    }
}
