//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod play;
pub mod table;
pub mod validate;
pub mod version;

use std::path::Path;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::config::{ConfigLoader, ResolvedConfig, apply_env_overrides};
use crate::error::{ExitCode, SequencerError};
use crate::observability::StopReason;
use crate::phase::PresetName;

/// Shutdown request shared between the signal handler and commands.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl Shutdown {
    /// Creates an untriggered shutdown handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. The first reason wins.
    pub fn trigger(&self, reason: StopReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// Waits until shutdown is requested and returns the reason.
    pub async fn triggered(&self) -> StopReason {
        self.token.cancelled().await;
        self.reason().unwrap_or(StopReason::Interrupted)
    }

    /// The reason shutdown was requested, if it has been.
    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    /// Process exit code for a successful command under this shutdown state.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.reason() {
            None | Some(StopReason::Completed) => ExitCode::SUCCESS,
            Some(StopReason::Interrupted) => ExitCode::INTERRUPTED,
            Some(StopReason::Terminated) => ExitCode::TERMINATED,
        }
    }
}

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, shutdown: Shutdown) -> Result<(), SequencerError> {
    match cli.command {
        Commands::Play(args) => play::run(&args, cli.quiet, &shutdown).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Table(args) => table::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Resolves settings from an optional file, a preset override and the
/// environment.
pub(crate) fn resolve_config(
    path: Option<&Path>,
    preset: Option<PresetName>,
) -> Result<ResolvedConfig, SequencerError> {
    let mut config = match path {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            ConfigLoader::default().load(path)?.config
        }
        None => {
            let mut config = ResolvedConfig::default();
            apply_env_overrides(&mut config);
            config
        }
    };
    if let Some(preset) = preset {
        config.table = preset.table();
    }
    Ok(config)
}
