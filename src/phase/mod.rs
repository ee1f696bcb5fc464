//! Phase sequencing.
//!
//! A [`PhaseTable`] declares the five phases and their timing. A
//! [`PhaseScheduler`] plays one table on Tokio timers, publishes a
//! [`SchedulerSnapshot`] on every change, and delivers phase-change and
//! completion callbacks.

pub mod scheduler;
pub mod state;
pub mod table;

pub use scheduler::{
    CompleteCallback, DEFAULT_MESSAGE_INTERVAL, PhaseChangeCallback, PhaseScheduler,
    SchedulerOptions,
};
pub use state::SchedulerSnapshot;
pub use table::{PHASE_COUNT, Phase, PhaseDefinition, PhaseTable, PresetName};
