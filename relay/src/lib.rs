pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod upload;
pub mod utils;

pub use crate::core::{RelayConfig, UploadConfig};
pub use domain::{ExportContext, ExportCoordinator, ExportError, ExportReceipt, SpanRecord};
pub use upload::{UploadBridge, UploadClient, UploadOutcome};
