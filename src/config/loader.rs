//! Configuration loader.
//!
//! Pipeline:
//! 1. Size check against [`ConfigLimits`]
//! 2. Read and strip a UTF-8 BOM
//! 3. YAML parsing (errors carry the line)
//! 4. Deserialization to [`SequencerConfig`]
//! 5. Validation (all issues collected)
//! 6. Environment overrides and resolution

use std::path::Path;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::config::schema::{ResolvedConfig, SequencerConfig};
use crate::config::validation::Validator;
use crate::error::{ConfigError, ValidationIssue};

/// Environment variable forcing the reduced-motion bypass on or off.
pub const REDUCED_MOTION_ENV: &str = "OMIKUJI_REDUCED_MOTION";

// ============================================================================
// Public API
// ============================================================================

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("OMIKUJI_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The resolved configuration.
    pub config: ResolvedConfig,

    /// Validation warnings; they do not block loading.
    pub warnings: Vec<ValidationIssue>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    /// Creates a loader with the given limits.
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    /// Loads, validates and resolves a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - YAML parsing or deserialization fails
    /// - Validation finds any error
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let (config, warnings) = self.load_unresolved(path)?;
        let mut resolved = config.resolve()?;
        apply_env_overrides(&mut resolved);
        for issue in &warnings {
            warn!(path = %path.display(), "{issue}");
        }
        Ok(LoadResult {
            config: resolved,
            warnings,
        })
    }

    /// Loads and validates a file without resolving it.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_unresolved(
        &self,
        path: &Path,
    ) -> Result<(SequencerConfig, Vec<ValidationIssue>), ConfigError> {
        let config = self.read(path)?;

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }
        Ok((config, result.warnings))
    }

    /// Reads and parses a file without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, exceeds the size limit,
    /// or does not parse.
    pub fn read(&self, path: &Path) -> Result<SequencerConfig, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        parse_config(&raw, path)
    }
}

/// Parses configuration text. `source` is only used in error messages.
///
/// An empty document yields the default configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] for malformed YAML or an unexpected
/// shape.
pub fn parse_config(raw: &str, source: &Path) -> Result<SequencerConfig, ConfigError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let root: Value = serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
        path: source.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })?;

    if root.is_null() {
        return Ok(SequencerConfig::default());
    }

    serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
        path: source.to_path_buf(),
        line: None,
        message: format!("failed to deserialize configuration: {e}"),
    })
}

/// Applies environment overrides to resolved settings.
///
/// Currently only `OMIKUJI_REDUCED_MOTION`, which wins over the file.
pub fn apply_env_overrides(config: &mut ResolvedConfig) {
    if let Some(flag) = env_flag(REDUCED_MOTION_ENV) {
        debug!(reduced_motion = flag, "reduced motion overridden by {REDUCED_MOTION_ENV}");
        config.reduced_motion = flag;
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads a boolean flag from the environment. Unset or unrecognized is `None`.
#[must_use]
pub fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
