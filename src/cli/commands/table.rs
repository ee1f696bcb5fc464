//! `table`: print the resolved phase table.

use serde::Serialize;

use crate::cli::args::{OutputFormat, TableArgs};
use crate::cli::commands::resolve_config;
use crate::error::SequencerError;
use crate::phase::PhaseTable;

#[derive(Debug, Serialize)]
struct TableReport<'a> {
    total_ms: u128,
    message_interval_ms: u128,
    reduced_motion: bool,
    phases: &'a PhaseTable,
}

/// Prints the phase table that `play` would use with the same options.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn run(args: &TableArgs) -> Result<(), SequencerError> {
    let config = resolve_config(args.config.as_deref(), args.preset)?;

    match args.format {
        OutputFormat::Human => print!("{}", render_human(&config.table)),
        OutputFormat::Json => {
            let report = TableReport {
                total_ms: config.table.total_duration().as_millis(),
                message_interval_ms: config.message_interval.as_millis(),
                reduced_motion: config.reduced_motion,
                phases: &config.table,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn render_human(table: &PhaseTable) -> String {
    let mut out = format!("{:<16} {:>8} {:>8}\n", "PHASE", "START", "DURATION");
    for entry in table.entries() {
        out.push_str(&format!(
            "{:<16} {:>6}ms {:>6}ms\n",
            entry.phase.as_str(),
            entry.start.as_millis(),
            entry.duration.as_millis()
        ));
    }
    out.push_str(&format!(
        "{:<16} {:>6}ms\n",
        "total",
        table.total_duration().as_millis()
    ));
    out
}
