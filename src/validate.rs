//! Validation utilities for simcpu program files
//!
//! Provides batch validation with detailed error reporting. Each file is
//! loaded into a fresh machine, which assembles it and runs the load-time
//! dry run; nothing is executed for real.
//!
//! # Example
//!
//! ```ignore
//! use simcpu::validate::{validate_directory, ValidationResult};
//!
//! let results = validate_directory("programs")?;
//! for result in &results {
//!     match result {
//!         ValidationResult::Ok { path, instructions, .. } => {
//!             println!("+ {}: {} instructions", path.display(), instructions);
//!         }
//!         ValidationResult::Err { path, error } => {
//!             eprintln!("x {}: {}", path.display(), error);
//!         }
//!     }
//! }
//! ```

use crate::config::MachineConfig;
use crate::error::LoadError;
use crate::loader::SOURCE_EXTENSION;
use crate::vm::{Machine, NullSink};
use std::path::{Path, PathBuf};

/// Result of validating a single program file
#[derive(Debug)]
pub enum ValidationResult {
    /// File loaded and passed the dry run
    Ok {
        path: PathBuf,
        instructions: usize,
        labels: usize,
    },
    /// File failed to load
    Err {
        path: PathBuf,
        error: ValidationError,
    },
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Ok { path, .. } => path,
            Self::Err { path, .. } => path,
        }
    }
}

/// Validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Line number (if available)
    pub line: Option<usize>,
    pub message: String,
    /// Offending source line (if available)
    pub snippet: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: {}", line, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(snippet) = &self.snippet {
            write!(f, "\n  | {}", snippet)?;
        }
        Ok(())
    }
}

impl From<LoadError> for ValidationError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::At { line, text, kind } => Self {
                line: Some(line),
                message: kind.to_string(),
                snippet: Some(text.trim().to_string()),
            },
            other => Self {
                line: None,
                message: other.to_string(),
                snippet: None,
            },
        }
    }
}

impl From<std::io::Error> for ValidationError {
    fn from(e: std::io::Error) -> Self {
        Self {
            line: None,
            message: e.to_string(),
            snippet: None,
        }
    }
}

/// Validate a single program file with the default machine configuration.
pub fn validate_file<P: AsRef<Path>>(path: P) -> ValidationResult {
    validate_file_with_config(path, &MachineConfig::default(), None)
}

/// Validate a single program file.
///
/// When `preamble` is given it is loaded ahead of the file, as an
/// embedding host would.
pub fn validate_file_with_config<P: AsRef<Path>>(
    path: P,
    config: &MachineConfig,
    preamble: Option<&str>,
) -> ValidationResult {
    let path = path.as_ref().to_path_buf();

    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            return ValidationResult::Err {
                path,
                error: e.into(),
            };
        }
    };

    let mut machine = match Machine::with_config(path.display().to_string(), config.clone()) {
        Ok(m) => m.with_sink(NullSink),
        Err(e) => {
            return ValidationResult::Err {
                path,
                error: ValidationError {
                    line: None,
                    message: e.to_string(),
                    snippet: None,
                },
            };
        }
    };

    let lines = preamble.unwrap_or("").lines().chain(source.lines());
    match machine.load(lines, 0) {
        Ok(()) => {
            let instructions = machine
                .memory()
                .as_slice()
                .iter()
                .filter(|w| w.as_instruction().is_some())
                .count();
            ValidationResult::Ok {
                path,
                instructions,
                labels: machine.labels().len(),
            }
        }
        Err(e) => ValidationResult::Err {
            path,
            error: e.into(),
        },
    }
}

/// Validate all `.sasm` files in a directory (recursive).
pub fn validate_directory<P: AsRef<Path>>(dir: P) -> std::io::Result<Vec<ValidationResult>> {
    validate_directory_with_config(dir, &MachineConfig::default(), None)
}

pub fn validate_directory_with_config<P: AsRef<Path>>(
    dir: P,
    config: &MachineConfig,
    preamble: Option<&str>,
) -> std::io::Result<Vec<ValidationResult>> {
    let mut results = Vec::new();
    validate_directory_recursive(dir.as_ref(), config, preamble, &mut results)?;

    // Sort by path for consistent output
    results.sort_by(|a, b| a.path().cmp(b.path()));

    Ok(results)
}

fn validate_directory_recursive(
    dir: &Path,
    config: &MachineConfig,
    preamble: Option<&str>,
    results: &mut Vec<ValidationResult>,
) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            validate_directory_recursive(&path, config, preamble, results)?;
        } else if path.extension().map_or(false, |e| e == SOURCE_EXTENSION) {
            results.push(validate_file_with_config(&path, config, preamble));
        }
    }

    Ok(())
}

/// Summary of validation results
#[derive(Debug, Default)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub instructions: usize,
    pub errors: Vec<(PathBuf, ValidationError)>,
}

impl ValidationSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result {
                ValidationResult::Ok { instructions, .. } => {
                    summary.passed += 1;
                    summary.instructions += instructions;
                }
                ValidationResult::Err { path, error } => {
                    summary.failed += 1;
                    summary.errors.push((path.clone(), error.clone()));
                }
            }
        }

        summary
    }

    /// Print summary to stderr
    pub fn print_report(&self) {
        if !self.errors.is_empty() {
            eprintln!("\n{} LOAD ERRORS:", self.errors.len());
            for (path, error) in &self.errors {
                eprintln!("\n  {}", path.display());
                if let Some(line) = error.line {
                    eprintln!("    line {}: {}", line, error.message);
                } else {
                    eprintln!("    {}", error.message);
                }
                if let Some(snippet) = &error.snippet {
                    eprintln!("    | {}", snippet);
                }
            }
            eprintln!();
        }

        eprintln!(
            "Validated {} files: {} passed, {} failed ({} instructions)",
            self.total, self.passed, self.failed, self.instructions
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn source_file(source: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", source).unwrap();
        file
    }

    #[test]
    fn test_validate_valid_source() {
        let file = source_file(
            r#"
@200
count:
=3

@0
loop:
    compute @count - @count 1
    test @count > 0
    jumpif loop
    halt
"#,
        );

        match validate_file(file.path()) {
            ValidationResult::Ok { instructions, labels, .. } => {
                assert_eq!(instructions, 4);
                assert_eq!(labels, 2);
            }
            ValidationResult::Err { error, .. } => panic!("unexpected error: {}", error),
        }
    }

    #[test]
    fn test_validate_invalid_source() {
        let file = source_file("copy R0 1\n    frobnicate R0\nhalt\n");

        let result = validate_file(file.path());
        assert!(result.is_err());

        if let ValidationResult::Err { error, .. } = result {
            assert_eq!(error.line, Some(2));
            assert!(error.message.contains("unsupported command"));
            assert_eq!(error.snippet.as_deref(), Some("frobnicate R0"));
        }
    }

    #[test]
    fn test_dry_run_failure_reported() {
        let file = source_file("jump nowhere\n");
        match validate_file(file.path()) {
            ValidationResult::Err { error, .. } => {
                assert_eq!(error.line, Some(1));
                assert!(error.message.contains("nowhere"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_preamble_resolves_labels() {
        let file = source_file("copy R0 @_health\nhalt\n");
        assert!(validate_file(file.path()).is_err());

        let preamble = "@250\n_health:\n=0\n@0";
        let result = validate_file_with_config(file.path(), &MachineConfig::default(), Some(preamble));
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_directory_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();

        std::fs::write(dir.path().join("a.sasm"), "copy R0 1\nhalt\n").unwrap();
        std::fs::write(nested.join("b.sasm"), "pop\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a program").unwrap();

        let results = validate_directory(dir.path()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());

        let summary = ValidationSummary::from_results(&results);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.instructions, 2);
        assert_eq!(summary.errors[0].0, nested.join("b.sasm"));
    }
}
