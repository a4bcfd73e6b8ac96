//! Error types shared by the driver and its collaborators.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync pass.
///
/// Application-level outcomes (a rejected upload, a share request answered
/// with a failure status) are not errors; they are reported per file.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("local I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("share response is not well-formed XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),

    #[error("malformed share response: {0}")]
    MalformedResponse(String),

    #[error("failed to record share link: {0}")]
    Record(String),

    #[error("invalid server configuration: {0}")]
    InvalidConfiguration(String),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}
