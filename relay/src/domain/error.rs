//! Export error types

use thiserror::Error;

use crate::data::error::StoreError;
use crate::upload::error::UploadError;

/// Errors returned by `ExportCoordinator::export`
///
/// Upload failures never appear here; they are reported on the receipt.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Cannot export an empty span batch")]
    EmptyBatch,

    #[error("First span has no context.trace_id")]
    MissingTraceId,

    #[error("Span {index} did not serialize to a JSON object")]
    InvalidSpan { index: usize },

    #[error("Span serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Staging failed: {0}")]
    Store(#[from] StoreError),

    #[error("Upload worker failed to start: {0}")]
    Upload(#[from] UploadError),
}
