//! `omikuji-sequencer` - phased omikuji draw animation sequencer
//!
//! Plays a fixed five-phase draw sequence on timers, signals completion
//! exactly once per run, rotates a status message index, and derives
//! decorative element visibility from the current phase.

pub mod cli;
pub mod config;
pub mod error;
pub mod fortune;
pub mod observability;
pub mod phase;
pub mod presentation;
