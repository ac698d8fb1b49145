//! Storage errors

use std::path::PathBuf;
use triage_core::ReportId;

/// Errors raised by run log and report stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem access failed
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored line could not be decoded
    #[error("corrupt record in {} line {line}: {message}", path.display())]
    Corrupt {
        /// File holding the record
        path: PathBuf,
        /// One-based line number
        line: usize,
        /// Decoder message
        message: String,
    },

    /// Identifier cannot be used as a storage key
    #[error("invalid identifier for storage: {0:?}")]
    InvalidIdentifier(String),

    /// Reports are immutable; an id can be saved once
    #[error("report already exists: {0}")]
    ReportExists(ReportId),

    /// Backend refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Wrap an io error with the path it concerns
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_path() {
        let err = StoreError::io(
            "/tmp/runs/r1.jsonl",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/runs/r1.jsonl"));
    }
}
