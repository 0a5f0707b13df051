//! Staging store error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the local trace store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid trace id '{0}': expected ASCII letters, digits, '-' or '_'")]
    InvalidTraceId(String),

    #[error("Malformed staged file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot {0} is not a JSON array")]
    NotAnArray(PathBuf),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
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
    fn test_invalid_trace_id_display() {
        let err = StoreError::InvalidTraceId("../etc".to_string());
        assert!(err.to_string().starts_with("Invalid trace id '../etc'"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = StoreError::io(
            "/tmp/x.jsonl",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/x.jsonl"));
        assert!(msg.contains("denied"));
    }
}
