//! `validate`: check configuration files without playing them.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, Validator};
use crate::error::{ConfigError, SequencerError, Severity, ValidationIssue};

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: PathBuf,
    valid: bool,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

/// Validates every file, prints a report, and fails if any file failed.
///
/// # Errors
///
/// Returns a [`ConfigError::ValidationError`] for the first failing file.
/// With `--strict`, warnings count as failures.
pub fn run(args: &ValidateArgs) -> Result<(), SequencerError> {
    let loader = ConfigLoader::default();
    let reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| check_file(&loader, path, args.strict))
        .collect();

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                print_human(report);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    if let Some(failed) = reports.into_iter().find(|r| !r.valid) {
        let mut errors = failed.errors;
        if args.strict {
            errors.extend(failed.warnings);
        }
        return Err(ConfigError::ValidationError {
            path: failed.file.display().to_string(),
            errors,
        }
        .into());
    }
    Ok(())
}

fn check_file(loader: &ConfigLoader, path: &Path, strict: bool) -> FileReport {
    tracing::info!(file = %path.display(), "validating configuration");

    let (errors, warnings) = match loader.read(path) {
        Ok(config) => {
            let result = Validator::new().validate(&config);
            (result.errors, result.warnings)
        }
        Err(e) => (
            vec![ValidationIssue {
                path: path.display().to_string(),
                message: e.to_string(),
                severity: Severity::Error,
            }],
            Vec::new(),
        ),
    };

    let valid = errors.is_empty() && (!strict || warnings.is_empty());
    FileReport {
        file: path.to_path_buf(),
        valid,
        errors,
        warnings,
    }
}

fn print_human(report: &FileReport) {
    let mark = if report.valid { "ok" } else { "FAILED" };
    println!("{}: {mark}", report.file.display());
    for issue in report.errors.iter().chain(&report.warnings) {
        println!("  {issue}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_file() {
        let file = write_config("table: standard\n");
        let report = check_file(&ConfigLoader::default(), file.path(), false);
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_strict_fails_on_warnings() {
        let file = write_config("status_messages: []\n");
        let loader = ConfigLoader::default();
        assert!(check_file(&loader, file.path(), false).valid);
        assert!(!check_file(&loader, file.path(), true).valid);
    }

    #[test]
    fn test_parse_failure_becomes_issue() {
        let file = write_config("table: [\n");
        let report = check_file(&ConfigLoader::default(), file.path(), false);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_run_reports_first_failure() {
        let good = write_config("");
        let bad = write_config("message_interval: 0ms\n");
        let args = ValidateArgs {
            files: vec![good.path().to_path_buf(), bad.path().to_path_buf()],
            format: OutputFormat::Json,
            strict: false,
        };
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("message_interval"));
        assert_eq!(err.exit_code(), crate::error::ExitCode::CONFIG_ERROR);
    }
}
