//! # Error Types
//!
//! Defines `SdvgError`, the unified error enum for every failure mode in the
//! generation pipeline. Every variant carries enough context (model name,
//! column name, partition path, config path) to debug immediately without
//! digging through logs.

use thiserror::Error;

/// All errors that can occur in SDVG operations.
#[derive(Error, Debug)]
pub enum SdvgError {
    /// Collated configuration validation failures. `message` is a multi-line
    /// report with one failure per line so a broken config surfaces every
    /// problem in a single run instead of one at a time.
    #[error("Configuration error:\n{message}")]
    Config { message: String },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// The config does not structurally match the backup written by the run
    /// being continued. The diff lists every divergent path as
    /// `path old -> new`.
    #[error("Config does not match the backup of the run being continued:\n{diff}\n  Remove backup.json (or re-run without --continue) to start fresh.")]
    BackupMismatch { diff: String },

    #[error("Partition files limit of {limit} exceeded for model '{model}' and generation was not confirmed")]
    PartitionFilesLimitExceeded { model: String, limit: u64 },

    #[error("Output directory {dir} holds results of a previous run:\n{conflicts}\n  Re-run with --force to delete them, or --continue to resume.")]
    OutputConflict { dir: String, conflicts: String },

    #[error("Sink error for model '{model}': {message}")]
    Sink { model: String, message: String },

    #[error("I/O error: {message}: {source}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP delivery to {endpoint} failed after {attempts} attempts within the configured timeout: {last_error}")]
    HttpDelivery {
        endpoint: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Template error in column '{column}': {message}")]
    Template { column: String, message: String },

    #[error("Task was canceled: {cause}")]
    Canceled { cause: String },

    #[error("Task was interrupted by a signal")]
    Signal,

    /// Unreachable-branch guard. A sequencer emitting a number outside any
    /// range, a row shorter than its column list: anything that indicates a
    /// bug rather than bad input.
    #[error("Internal invariant violated: {message}")]
    Internal { message: String },
}

impl SdvgError {
    /// Build a collated `Config` error from a list of individual failures.
    pub fn config_report(failures: Vec<String>) -> Self {
        SdvgError::Config {
            message: failures
                .iter()
                .map(|f| format!("  - {}", f))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Short stable identity used when a cause has to cross a cancellation
    /// boundary as text.
    pub fn cause_label(&self) -> String {
        match self {
            SdvgError::Config { .. } => "config".to_string(),
            SdvgError::BackupMismatch { .. } => "backup mismatch".to_string(),
            SdvgError::PartitionFilesLimitExceeded { model, .. } => {
                format!("partition files limit ({})", model)
            }
            SdvgError::Signal => "signal".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SdvgError>;
