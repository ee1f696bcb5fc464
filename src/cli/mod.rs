//! Command-line interface for the `omikuji` binary.

pub mod args;
pub mod commands;
