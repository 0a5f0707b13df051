//! Upload path: bridge, client seam, errors

pub mod bridge;
pub mod client;
pub mod error;

pub use bridge::{UploadBridge, UploadOutcome};
pub use client::{HttpUploadClient, UploadClient, UploadSession};
pub use error::UploadError;
