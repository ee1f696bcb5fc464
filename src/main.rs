//! `omikuji` - phased omikuji draw animation sequencer

use clap::Parser;

use omikuji_sequencer::cli::args::Cli;
use omikuji_sequencer::cli::commands::{self, Shutdown};
use omikuji_sequencer::error::ExitCode;
use omikuji_sequencer::observability::{LogFormat, StopReason, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(LogFormat::Human, cli.verbose, cli.color);
    }

    let shutdown = Shutdown::new();

    // First signal tears playback down gracefully; a second one exits at once.
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let Ok(mut sigterm) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            else {
                tracing::warn!("failed to register SIGTERM handler");
                return;
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => shutdown.trigger(StopReason::Interrupted),
                _ = sigterm.recv() => shutdown.trigger(StopReason::Terminated),
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
                _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
            }
        }
    });

    let result = commands::dispatch(cli, shutdown.clone()).await;

    match result {
        Ok(()) => std::process::exit(shutdown.exit_code()),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
