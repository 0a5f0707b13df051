//! Local trace staging store
//!
//! Lays out staged traces under one working directory:
//!
//! ```text
//! {root}/{trace_id}.jsonl   one envelope per line, append-only
//! {root}/{trace_id}.json    JSON array of the same envelopes, rewritten per export
//! {last_export_path}        most recent envelope, overwritten per export
//! ```
//!
//! All I/O is blocking. The snapshot rewrite is read-modify-write and assumes a
//! single writer per trace id.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use super::error::StoreError;
use crate::core::constants::{LINES_EXTENSION, SNAPSHOT_EXTENSION};
use crate::utils::file::{overwrite_atomic, write_atomic};

/// Result of writing a document into a trace's array snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotWrite {
    /// No snapshot existed; a one-element array was written
    Created,
    /// Appended to an existing snapshot, which now holds `len` envelopes
    Appended { len: usize },
}

/// Summary of one staged trace on disk
#[derive(Debug, Clone)]
pub struct StagedTrace {
    pub trace_id: String,
    pub lines_path: PathBuf,
    pub snapshot_path: Option<PathBuf>,
    /// Number of envelopes in the line-delimited history
    pub envelopes: usize,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct LocalTraceStore {
    root: PathBuf,
    last_export_path: PathBuf,
}

impl LocalTraceStore {
    /// Open the store, creating the working directory if needed.
    pub fn open(
        root: impl Into<PathBuf>,
        last_export_path: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        tracing::debug!(root = %root.display(), "Trace store opened");
        Ok(Self {
            root,
            last_export_path: last_export_path.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn last_export_path(&self) -> &Path {
        &self.last_export_path
    }

    pub fn lines_path(&self, trace_id: &str) -> Result<PathBuf, StoreError> {
        validate_trace_id(trace_id)?;
        Ok(self.root.join(format!("{}.{}", trace_id, LINES_EXTENSION)))
    }

    pub fn snapshot_path(&self, trace_id: &str) -> Result<PathBuf, StoreError> {
        validate_trace_id(trace_id)?;
        Ok(self.root.join(format!("{}.{}", trace_id, SNAPSHOT_EXTENSION)))
    }

    /// Append one document as a single line to the trace's history file.
    pub fn append_line(&self, trace_id: &str, doc: &JsonValue) -> Result<(), StoreError> {
        let path = self.lines_path(trace_id)?;
        let mut line = serde_json::to_vec(doc)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        file.write_all(&line).map_err(|e| StoreError::io(&path, e))?;

        tracing::trace!(trace_id, path = %path.display(), bytes = line.len(), "Appended staged line");
        Ok(())
    }

    pub fn snapshot_exists(&self, trace_id: &str) -> Result<bool, StoreError> {
        Ok(self.snapshot_path(trace_id)?.exists())
    }

    /// Append to the trace's array snapshot, creating it when absent.
    pub fn append_or_create_snapshot(
        &self,
        trace_id: &str,
        doc: &JsonValue,
    ) -> Result<SnapshotWrite, StoreError> {
        let path = self.snapshot_path(trace_id)?;

        // Read directly; ENOENT means first write. A separate exists() check
        // would race with the write below.
        let (items, outcome) = match fs::read(&path) {
            Ok(bytes) => {
                let mut items = parse_snapshot(&path, &bytes)?;
                items.push(doc.clone());
                let len = items.len();
                (items, SnapshotWrite::Appended { len })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => (vec![doc.clone()], SnapshotWrite::Created),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let data = serde_json::to_vec(&items)?;
        write_atomic(&path, &data).map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(trace_id, path = %path.display(), ?outcome, "Snapshot written");
        Ok(outcome)
    }

    /// Overwrite the fixed inspection file with `doc`.
    pub fn write_last_export(&self, doc: &JsonValue) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(doc)?;
        overwrite_atomic(&self.last_export_path, &data)
            .map_err(|e| StoreError::io(&self.last_export_path, e))?;
        tracing::trace!(path = %self.last_export_path.display(), "Last export written");
        Ok(())
    }

    /// Read every envelope from the trace's history file, in write order.
    pub fn read_lines(&self, trace_id: &str) -> Result<Vec<JsonValue>, StoreError> {
        let path = self.lines_path(trace_id)?;
        let file = fs::File::open(&path).map_err(|e| StoreError::io(&path, e))?;

        let mut docs = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StoreError::io(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let doc = serde_json::from_str(&line).map_err(|source| StoreError::Malformed {
                path: path.clone(),
                source,
            })?;
            docs.push(doc);
        }
        Ok(docs)
    }

    /// Read the trace's array snapshot.
    pub fn read_snapshot(&self, trace_id: &str) -> Result<Vec<JsonValue>, StoreError> {
        let path = self.snapshot_path(trace_id)?;
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        parse_snapshot(&path, &bytes)
    }

    /// List staged traces, oldest first.
    pub fn list_staged(&self) -> Result<Vec<StagedTrace>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut staged = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LINES_EXTENSION) {
                continue;
            }
            let Some(trace_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_trace_id(trace_id).is_err() {
                tracing::debug!(path = %path.display(), "Skipping foreign file in staging dir");
                continue;
            }

            let envelopes = count_lines(&path)?;
            let snapshot = self.snapshot_path(trace_id)?;
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            staged.push(StagedTrace {
                trace_id: trace_id.to_string(),
                lines_path: path.clone(),
                snapshot_path: snapshot.exists().then_some(snapshot),
                envelopes,
                modified,
            });
        }

        staged.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.trace_id.cmp(&b.trace_id))
        });
        Ok(staged)
    }
}

/// Trace ids become file names, so only a safe alphabet is accepted
fn validate_trace_id(trace_id: &str) -> Result<(), StoreError> {
    let valid = !trace_id.is_empty()
        && trace_id.len() <= 256
        && trace_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTraceId(trace_id.to_string()))
    }
}

fn parse_snapshot(path: &Path, bytes: &[u8]) -> Result<Vec<JsonValue>, StoreError> {
    let value: JsonValue = serde_json::from_slice(bytes).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        JsonValue::Array(items) => Ok(items),
        _ => Err(StoreError::NotAnArray(path.to_path_buf())),
    }
}

fn count_lines(path: &Path) -> Result<usize, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| StoreError::io(path, e))?;
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_store(dir: &Path) -> LocalTraceStore {
        LocalTraceStore::open(dir.join("staging"), dir.join("tracer.json")).unwrap()
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        open_store(dir.path());
        let store = open_store(dir.path());
        assert!(store.root().is_dir());
    }

    #[test]
    fn test_append_line_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        store.append_line("abc", &json!({"n": 1})).unwrap();
        store.append_line("abc", &json!({"n": 2})).unwrap();
        store.append_line("abc", &json!({"n": 3})).unwrap();

        let docs = store.read_lines("abc").unwrap();
        let ns: Vec<_> = docs.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![1, 2, 3]);

        let raw = fs::read_to_string(store.lines_path("abc").unwrap()).unwrap();
        assert_eq!(raw.lines().count(), 3);
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn test_traces_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        store.append_line("t1", &json!({"trace": 1})).unwrap();
        store.append_line("t2", &json!({"trace": 2})).unwrap();

        assert_eq!(store.read_lines("t1").unwrap().len(), 1);
        assert_eq!(store.read_lines("t2").unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_create_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        assert!(!store.snapshot_exists("abc").unwrap());
        let first = store.append_or_create_snapshot("abc", &json!({"n": 1})).unwrap();
        assert_eq!(first, SnapshotWrite::Created);
        assert!(store.snapshot_exists("abc").unwrap());

        let second = store.append_or_create_snapshot("abc", &json!({"n": 2})).unwrap();
        assert_eq!(second, SnapshotWrite::Appended { len: 2 });

        let items = store.read_snapshot("abc").unwrap();
        assert_eq!(items, vec![json!({"n": 1}), json!({"n": 2})]);
    }

    #[test]
    fn test_snapshot_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        fs::write(store.snapshot_path("abc").unwrap(), r#"{"not":"array"}"#).unwrap();

        let err = store
            .append_or_create_snapshot("abc", &json!({}))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnArray(_)));
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        fs::write(store.snapshot_path("abc").unwrap(), "[{").unwrap();

        let err = store.read_snapshot("abc").unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_last_export_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        store.write_last_export(&json!({"n": 1})).unwrap();
        store.write_last_export(&json!({"n": 2})).unwrap();

        let raw = fs::read_to_string(store.last_export_path()).unwrap();
        let doc: JsonValue = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc, json!({"n": 2}));
    }

    #[test]
    fn test_invalid_trace_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        for bad in ["", "../escape", "a/b", "with space", "dot.dot"] {
            let err = store.append_line(bad, &json!({})).unwrap_err();
            assert!(matches!(err, StoreError::InvalidTraceId(_)), "{bad}");
        }
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[test]
    fn test_io_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        // A directory where the history file should be makes the open fail
        fs::create_dir(store.lines_path("abc").unwrap()).unwrap();

        let err = store.append_line("abc", &json!({})).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_list_staged() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        store.append_line("first", &json!({})).unwrap();
        store.append_line("first", &json!({})).unwrap();
        store.append_or_create_snapshot("first", &json!({})).unwrap();
        store.append_line("second", &json!({})).unwrap();
        fs::write(store.root().join("notes.txt"), "ignored").unwrap();

        let mut staged = store.list_staged().unwrap();
        staged.sort_by(|a, b| a.trace_id.cmp(&b.trace_id));

        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].trace_id, "first");
        assert_eq!(staged[0].envelopes, 2);
        assert!(staged[0].snapshot_path.is_some());
        assert_eq!(staged[1].trace_id, "second");
        assert_eq!(staged[1].envelopes, 1);
        assert!(staged[1].snapshot_path.is_none());
    }

    #[test]
    fn test_shared_last_export_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let stores = [open_store(dir.path()), open_store(dir.path())];

        let handles: Vec<_> = stores
            .into_iter()
            .enumerate()
            .map(|(n, store)| {
                std::thread::spawn(move || {
                    (0..500)
                        .filter(|i| {
                            store
                                .write_last_export(&json!({"writer": n, "seq": i}))
                                .is_err()
                        })
                        .count()
                })
            })
            .collect();

        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let last: JsonValue =
            serde_json::from_slice(&fs::read(dir.path().join("tracer.json")).unwrap()).unwrap();
        assert_eq!(last["seq"], json!(499));
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
