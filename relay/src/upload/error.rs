//! Upload error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the upload client and bridge
#[derive(Error, Debug)]
pub enum UploadError {
    /// No bearer token available; the upload attempt cannot start
    #[error("Upload credential not found ({0}). Cannot upload traces.")]
    MissingCredential(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collector rejected {path}: HTTP {status}: {body}")]
    Rejected {
        path: PathBuf,
        status: u16,
        body: String,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload worker unavailable: {0}")]
    Worker(String),

    /// Failure reported by a custom `UploadClient` implementation
    #[error("{0}")]
    Client(String),
}

impl UploadError {
    /// Configuration errors are raised to the caller instead of being folded
    /// into an outcome.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingCredential(_))
    }
}
