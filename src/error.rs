//! Error taxonomy for the backup lifecycle
//!
//! Each step of a cycle has its own error type; [`CycleError`] is what the
//! orchestrator hands back to the scheduler.

use std::path::PathBuf;

/// Failure while producing the uncompressed dump
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Missing connection parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Dump tool failed: {0}")]
    ToolFailed(String),

    #[error("Dump tool produced no output file at {0:?}")]
    NoOutput(PathBuf),
}

/// Failure while compressing or verifying the archive
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Compression failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Compressed archive is empty: {0:?}")]
    Empty(PathBuf),

    #[error("Compression task did not complete: {0}")]
    Task(String),
}

/// Failure to remove a single expired entry; never aborts a sweep
#[derive(Debug, thiserror::Error)]
#[error("Failed to remove expired backup {path:?}: {source}")]
pub struct RetentionError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Why a backup cycle did not produce a verified artifact
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dump failed: {0}")]
    Dump(DumpError),

    #[error("Archive failed: {0}")]
    Archive(ArchiveError),

    #[error("Compressed archive is empty: {0:?}")]
    EmptyArchive(PathBuf),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl CycleError {
    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Config(_) => "ConfigError",
            CycleError::Dump(_) => "DumpError",
            CycleError::Archive(_) => "ArchiveError",
            CycleError::EmptyArchive(_) => "EmptyArchiveError",
            CycleError::Delivery(_) => "DeliveryError",
            CycleError::Unexpected(_) => "UnexpectedError",
        }
    }

    /// Only unexpected failures switch the scheduler to the fallback delay
    pub fn is_unexpected(&self) -> bool {
        matches!(self, CycleError::Unexpected(_))
    }
}

impl From<DumpError> for CycleError {
    fn from(err: DumpError) -> Self {
        match err {
            DumpError::MissingParameter(field) => {
                CycleError::Config(format!("missing connection parameter '{}'", field))
            }
            other => CycleError::Dump(other),
        }
    }
}

impl From<ArchiveError> for CycleError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Empty(path) => CycleError::EmptyArchive(path),
            other => CycleError::Archive(other),
        }
    }
}
