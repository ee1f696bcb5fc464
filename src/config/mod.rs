//! Configuration module.
//!
//! Loads and validates sequencer configuration files: the phase table
//! (preset or explicit), message tick interval, reduced-motion default,
//! fortune thresholds and status messages.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{
    ConfigLimits, ConfigLoader, LoadResult, REDUCED_MOTION_ENV, apply_env_overrides, parse_config,
};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
