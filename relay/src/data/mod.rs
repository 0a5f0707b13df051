//! Durable local staging

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{LocalTraceStore, SnapshotWrite, StagedTrace};
