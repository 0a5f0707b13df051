//! Export coordinator
//!
//! Turns span batches into envelopes, stages them on disk and uploads each
//! finished trace once the next trace id shows up. A trace counts as finished
//! when a different trace id is first exported, so uploads lag by one trace;
//! `flush` covers the last one.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::envelope::{Envelope, ExportContext};
use super::error::ExportError;
use super::span::trace_id_of;
use crate::core::config::RelayConfig;
use crate::data::{LocalTraceStore, SnapshotWrite};
use crate::upload::{UploadBridge, UploadError, UploadOutcome};

/// One upload attempt made on behalf of the coordinator
#[derive(Debug)]
pub struct UploadReport {
    pub path: PathBuf,
    pub result: Result<UploadOutcome, UploadError>,
}

impl UploadReport {
    pub fn is_uploaded(&self) -> bool {
        matches!(&self.result, Ok(outcome) if outcome.is_uploaded())
    }
}

/// What a single `export` call did
#[derive(Debug)]
pub struct ExportReceipt {
    /// The envelope as staged, with enriched metadata and pipeline
    pub envelope: Envelope,
    pub snapshot: SnapshotWrite,
    /// Upload of the previous trace, when this call crossed a trace boundary
    pub upload: Option<UploadReport>,
}

pub struct ExportCoordinator {
    project_name: Option<String>,
    session_id: String,
    context: ExportContext,
    store: LocalTraceStore,
    bridge: UploadBridge,
    cursor: Option<PathBuf>,
}

impl ExportCoordinator {
    pub fn new(
        config: &RelayConfig,
        context: ExportContext,
        bridge: UploadBridge,
    ) -> Result<Self, ExportError> {
        let store = LocalTraceStore::open(&config.staging_dir, &config.last_export_path)?;
        let session_id = config
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        tracing::debug!(
            session_id = %session_id,
            project = ?config.project_name,
            staging_dir = %store.root().display(),
            "Export coordinator ready"
        );

        Ok(Self {
            project_name: config.project_name.clone(),
            session_id,
            context,
            store,
            bridge,
            cursor: None,
        })
    }

    /// Build a coordinator that uploads over HTTP to the configured endpoint.
    pub fn with_http(config: &RelayConfig, context: ExportContext) -> Result<Self, ExportError> {
        let bridge = UploadBridge::spawn_http(&config.upload, config.project_name.clone())?;
        Self::new(config, context, bridge)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Snapshot that will be uploaded when the next trace begins
    pub fn cursor(&self) -> Option<&Path> {
        self.cursor.as_deref()
    }

    pub fn store(&self) -> &LocalTraceStore {
        &self.store
    }

    /// Stage one batch of spans sharing a trace id.
    ///
    /// Staging errors are returned. Upload problems are logged and reported on
    /// the receipt only.
    pub fn export<S: Serialize>(&mut self, spans: &[S]) -> Result<ExportReceipt, ExportError> {
        if spans.is_empty() {
            return Err(ExportError::EmptyBatch);
        }

        let docs = spans
            .iter()
            .enumerate()
            .map(|(index, span)| match serde_json::to_value(span)? {
                JsonValue::Object(doc) => Ok(doc),
                _ => Err(ExportError::InvalidSpan { index }),
            })
            .collect::<Result<Vec<Map<String, JsonValue>>, ExportError>>()?;

        let trace_id = docs
            .first()
            .and_then(trace_id_of)
            .map(str::to_string)
            .ok_or(ExportError::MissingTraceId)?;
        let span_count = docs.len();

        let envelope = Envelope::assemble(
            self.project_name.clone(),
            &self.session_id,
            &trace_id,
            docs,
            &self.context,
        );
        let doc = serde_json::to_value(&envelope)?;

        self.store.append_line(&trace_id, &doc)?;
        self.store.write_last_export(&doc)?;
        let snapshot = self.store.append_or_create_snapshot(&trace_id, &doc)?;

        let upload = match snapshot {
            SnapshotWrite::Appended { .. } => None,
            SnapshotWrite::Created => {
                let path = self.store.snapshot_path(&trace_id)?;
                let report = match self.cursor.take() {
                    Some(previous) if previous != path => Some(self.upload(previous)),
                    _ => None,
                };
                self.cursor = Some(path);
                report
            }
        };

        tracing::debug!(
            trace_id = %trace_id,
            spans = span_count,
            ?snapshot,
            "Exported span batch"
        );

        Ok(ExportReceipt {
            envelope,
            snapshot,
            upload,
        })
    }

    /// Upload the snapshot held by the cursor and clear it.
    pub fn flush(&mut self) -> Option<UploadReport> {
        let path = self.cursor.take()?;
        Some(self.upload(path))
    }

    /// Flush, then stop the upload worker shared by all bridge clones.
    pub fn shutdown(mut self) -> Option<UploadReport> {
        let report = self.flush();
        self.bridge.shutdown();
        report
    }

    fn upload(&self, path: PathBuf) -> UploadReport {
        let result = self.bridge.upload_and_wait(&path);
        match &result {
            Ok(outcome) if outcome.is_uploaded() => {
                tracing::debug!(path = %path.display(), "Staged trace uploaded");
            }
            Ok(outcome) => {
                tracing::warn!(path = %path.display(), outcome = %outcome, "Staged trace not uploaded");
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Upload skipped");
            }
        }
        UploadReport { path, result }
    }
}
