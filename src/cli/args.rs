//! CLI argument definitions.
//!
//! All Clap derive structs for `omikuji` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::phase::PresetName;
use crate::presentation::messages::DEFAULT_OMIKUJI_TYPE;

// ============================================================================
// Root CLI
// ============================================================================

/// Phased omikuji draw animation sequencer.
#[derive(Parser, Debug)]
#[command(name = "omikuji", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "OMIKUJI_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play the draw sequence for a fortune.
    Play(PlayArgs),

    /// Validate configuration files.
    Validate(ValidateArgs),

    /// Print the resolved phase table.
    Table(TableArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Play Command
// ============================================================================

/// Arguments for `play`.
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "OMIKUJI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Built-in phase table; overrides the configuration file.
    #[arg(short, long)]
    pub preset: Option<PresetName>,

    /// Magnitude of the drawn fortune.
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub magnitude: i32,

    /// Label of the drawn fortune.
    #[arg(short, long, default_value = "吉")]
    pub label: String,

    /// Omikuji type id, selects the animation title.
    #[arg(long, default_value = DEFAULT_OMIKUJI_TYPE)]
    pub omikuji_type: String,

    /// Skip straight to the result.
    #[arg(long)]
    pub reduced_motion: bool,

    /// Write JSONL events to a file (`-` for stdout).
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "OMIKUJI_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Restart the sequence this many times after it completes.
    #[arg(long, default_value_t = 0)]
    pub replay: u32,
}

// ============================================================================
// Validate / Table Commands
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `table`.
#[derive(Args, Debug)]
pub struct TableArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "OMIKUJI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Built-in phase table; overrides the configuration file.
    #[arg(short, long)]
    pub preset: Option<PresetName>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Utility Commands
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
