use std::path::PathBuf;

/// Errors that can occur when building or running the rotating logger.
///
/// Only [`RotatingLoggerError::Closed`] ever reaches a producer. Everything else
/// is either returned from [`crate::RotatingLoggerBuilder::build`] (startup
/// failures) or logged by the background threads and retried on their next
/// natural trigger.
#[derive(Debug, thiserror::Error)]
pub enum RotatingLoggerError {
    #[error("Failed to create directory '{0}': {1}")]
    CreateDirectoryFailed(PathBuf, String),
    #[error("Failed to create file '{0}': {1}")]
    CreateFileFailed(PathBuf, String),
    #[error("Failed to rename file from '{from}' to '{to}': {error}")]
    RenameFileError { from: PathBuf, to: PathBuf, error: String },
    #[error("Failed to compress '{path}': {error}")]
    CompressFailed { path: PathBuf, error: String },
    #[error("Failed to set file permissions for '{path}': {error}")]
    SetFilePermissionsError { path: PathBuf, error: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to spawn background thread '{0}': {1}")]
    SpawnFailed(&'static str, String),
    #[error("File IO error: {0}")]
    FileIOError(#[from] std::io::Error),
    #[error("Logger is closed")]
    Closed,
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, RotatingLoggerError>;
