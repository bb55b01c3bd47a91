//! Domain-specific error types for the backup engine.
//!
//! Only the setup phase produces hard failures: a missing configuration
//! file, an unusable output directory, or an unavailable snapshot backend
//! abort the run before any discovery happens.  Everything that goes wrong
//! *after* setup is recorded as a news diagnostic on the session and never
//! terminates the process (see [`crate::engine::Session`]).
//!
//! # Error hierarchy
//!
//! ```text
//! SavegameError
//! ├── Config(ConfigError)     — configuration file loading and parsing
//! ├── Setup(SetupError)       — output tree and rules directory validation
//! └── Snapshot(SnapshotError) — snapshot backend availability
//! ```

use thiserror::Error;

/// Top-level error type for the backup engine.
///
/// Aggregates the setup-phase sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum SavegameError {
    /// Configuration file error (missing file, I/O, syntax).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Output tree or rules directory validation error.
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Snapshot backend error.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist or is not a regular file.
    #[error("Configuration file is not actually a file: {0}")]
    NotAFile(String),

    /// An I/O error occurred while reading the configuration file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file contains a line that cannot be parsed.
    #[error("Invalid syntax in {file} at line {line}: {message}")]
    Syntax {
        /// File the offending line was read from.
        file: String,
        /// One-based line number.
        line: usize,
        /// Human-readable description of the problem.
        message: String,
    },
}

/// Errors that arise while validating the output tree and rule sources.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The output path exists but is not a directory.
    #[error("Output folder is not actually a folder: {0}")]
    OutputNotDirectory(String),

    /// The output directory could not be created.
    #[error("Failed to create output directory {path}: {source}")]
    CreateOutput {
        /// Path that could not be created.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No built-in rules directory could be located.
    #[error("Cannot locate a rules directory. Use --rules or set SAVEGAME_RULES")]
    RulesDirMissing,
}

/// Errors that arise from the snapshot backend.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshotting was requested but the `git` binary is not on PATH.
    #[error("git required but not available")]
    GitMissing,

    /// A snapshot subprocess failed in a way that cannot be ignored.
    #[error("git {action} failed: {detail}")]
    Command {
        /// The git subcommand that failed (e.g. `init`).
        action: String,
        /// Captured stderr or exit description.
        detail: String,
    },
}
