//! Sink error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when storing or reading session records.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backing file could not be opened, written or read.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A stored line is not a valid record.
    #[error("{path}:{line}: invalid record: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The sink refused the record.
    #[error("record rejected: {0}")]
    Rejected(String),
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
