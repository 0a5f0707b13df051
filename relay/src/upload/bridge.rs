//! Blocking bridge onto a persistent upload worker
//!
//! The export path is synchronous, the transfer is async. A single worker
//! thread owns a current-thread tokio runtime and a reusable HTTP client, and
//! consumes upload requests from a queue. Callers enqueue one path and block on
//! the reply for at most the configured timeout (plus a small grace period),
//! so at most one upload stalls a caller at a time and no runtime is built per
//! call. Running the runtime on its own thread also keeps `upload_and_wait`
//! safe to call from inside another tokio runtime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::client::{HttpUploadClient, UploadClient, UploadSession};
use super::error::UploadError;
use crate::core::config::UploadConfig;
use crate::core::constants::{APP_NAME_LOWER, UPLOAD_REPLY_GRACE_MS, UPLOAD_WORKER_THREAD};
use crate::core::credential::{BearerToken, TokenSource};

const WORKER_STOPPED: &str = "upload worker stopped";

/// Result of one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    NothingToUpload,
    /// The attempt exceeded the configured timeout
    TimedOut(Duration),
    Failed(String),
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded)
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded => write!(f, "Files uploaded successfully"),
            Self::NothingToUpload => write!(f, "No files to upload"),
            Self::TimedOut(timeout) => {
                write!(f, "Upload timed out after {} seconds", timeout.as_secs_f64())
            }
            Self::Failed(reason) => write!(f, "Upload failed: {}", reason),
        }
    }
}

struct UploadRequest {
    path: PathBuf,
    token: BearerToken,
    reply: SyncSender<UploadOutcome>,
}

struct BridgeInner {
    queue: Mutex<Option<mpsc::UnboundedSender<UploadRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    token: TokenSource,
    timeout: Duration,
}

impl BridgeInner {
    fn stop(&self) {
        // Closing the queue lets the worker finish queued requests and exit
        drop(self.queue.lock().take());
        if let Some(handle) = self.worker.lock().take()
            && handle.join().is_err()
        {
            tracing::warn!("Upload worker panicked");
        }
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to the upload worker. Clones share the same worker.
#[derive(Clone)]
pub struct UploadBridge {
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for UploadBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadBridge")
            .field("token", &self.inner.token)
            .field("timeout", &self.inner.timeout)
            .field("running", &self.is_running())
            .finish()
    }
}

impl UploadBridge {
    /// Start a worker that uploads through the default HTTP client.
    pub fn spawn_http(
        config: &UploadConfig,
        project_name: Option<String>,
    ) -> Result<Self, UploadError> {
        let client = Arc::new(HttpUploadClient::new(&config.endpoint));
        Self::spawn(config, project_name, client)
    }

    /// Start the worker thread with a custom upload client.
    pub fn spawn(
        config: &UploadConfig,
        project_name: Option<String>,
        client: Arc<dyn UploadClient>,
    ) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{}/{}", APP_NAME_LOWER, env!("CARGO_PKG_VERSION")))
            .build()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let timeout = config.timeout;

        let handle = thread::Builder::new()
            .name(UPLOAD_WORKER_THREAD.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build upload runtime");
                        return;
                    }
                };
                runtime.block_on(run_worker(rx, client, http, project_name, timeout));
            })
            .map_err(|e| UploadError::Worker(e.to_string()))?;

        tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Upload worker started");

        Ok(Self {
            inner: Arc::new(BridgeInner {
                queue: Mutex::new(Some(tx)),
                worker: Mutex::new(Some(handle)),
                token: config.token.clone(),
                timeout,
            }),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .queue
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Upload one file and block until the worker reports back.
    ///
    /// A missing credential is returned as an error before anything is queued.
    /// Every other failure, including a timeout, is reported as an outcome.
    pub fn upload_and_wait(&self, path: &Path) -> Result<UploadOutcome, UploadError> {
        let token = self.inner.token.resolve().ok_or_else(|| {
            UploadError::MissingCredential(self.inner.token.describe())
        })?;

        let (reply, reply_rx) = sync_channel(1);
        let request = UploadRequest {
            path: path.to_path_buf(),
            token,
            reply,
        };

        let queued = match self.inner.queue.lock().as_ref() {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        };
        if !queued {
            return Ok(UploadOutcome::Failed(WORKER_STOPPED.to_string()));
        }

        let wait = self.inner.timeout + Duration::from_millis(UPLOAD_REPLY_GRACE_MS);
        match reply_rx.recv_timeout(wait) {
            Ok(outcome) => Ok(outcome),
            Err(RecvTimeoutError::Timeout) => Ok(UploadOutcome::TimedOut(self.inner.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Ok(UploadOutcome::Failed(WORKER_STOPPED.to_string()))
            }
        }
    }

    /// Stop accepting uploads and wait for the worker to drain its queue.
    pub fn shutdown(&self) {
        tracing::debug!("Stopping upload worker");
        self.inner.stop();
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<UploadRequest>,
    client: Arc<dyn UploadClient>,
    http: reqwest::Client,
    project_name: Option<String>,
    timeout: Duration,
) {
    while let Some(request) = rx.recv().await {
        let session = UploadSession {
            http: http.clone(),
            token: request.token,
            project_name: project_name.clone(),
        };
        let paths = std::slice::from_ref(&request.path);

        let outcome =
            match tokio::time::timeout(timeout, client.check_and_upload_files(&session, paths))
                .await
            {
                Ok(Ok(true)) => UploadOutcome::Uploaded,
                Ok(Ok(false)) => UploadOutcome::NothingToUpload,
                Ok(Err(e)) => UploadOutcome::Failed(e.to_string()),
                Err(_) => UploadOutcome::TimedOut(timeout),
            };

        tracing::debug!(path = %request.path.display(), outcome = %outcome, "Upload attempt finished");

        // The caller may have stopped waiting
        let _ = request.reply.send(outcome);
    }

    tracing::debug!("Upload worker stopped");
}
