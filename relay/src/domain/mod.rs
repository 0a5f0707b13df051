//! Export domain: span documents, envelopes, content ids and the coordinator

pub mod envelope;
pub mod error;
pub mod exporter;
pub mod identity;
pub mod span;

pub use envelope::{Envelope, ExportContext};
pub use error::ExportError;
pub use exporter::{ExportCoordinator, ExportReceipt, UploadReport};
pub use identity::{assign_id, compute_id};
pub use span::{SpanContext, SpanKind, SpanRecord, SpanStatus, StatusCode};
