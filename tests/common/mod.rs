#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Helpers for running the `omikuji` binary in integration tests.
pub struct OmikujiProcess;

impl OmikujiProcess {
    /// Path to a file under `tests/fixtures`.
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    /// Runs the binary to completion with a clean environment for the
    /// variables it reads.
    pub fn spawn_command(args: &[&str]) -> Output {
        Self::spawn_with_env(args, &[])
    }

    /// Like [`spawn_command`](Self::spawn_command), then sets `vars`.
    pub fn spawn_with_env(args: &[&str], vars: &[(&str, &str)]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_omikuji"))
            .args(args)
            .env_remove("OMIKUJI_CONFIG")
            .env_remove("OMIKUJI_REDUCED_MOTION")
            .env_remove("OMIKUJI_LOG_LEVEL")
            .env_remove("OMIKUJI_METRICS_PORT")
            .env("NO_COLOR", "1")
            .envs(vars.iter().copied())
            .output()
            .expect("failed to run omikuji binary")
    }

    /// Values of the `type` field, in order.
    pub fn event_types(events: &[serde_json::Value]) -> Vec<String> {
        events
            .iter()
            .map(|e| e["type"].as_str().unwrap_or_default().to_owned())
            .collect()
    }

    /// Parses stdout as JSON lines.
    pub fn json_lines(output: &Output) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).expect("stdout line should be JSON"))
            .collect()
    }
}
