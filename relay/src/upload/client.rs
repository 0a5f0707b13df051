//! Upload client seam and the default HTTP implementation

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::error::UploadError;
use crate::core::constants::{PROJECT_HEADER, UPLOAD_PATH};
use crate::core::credential::BearerToken;

/// Maximum response body kept in a rejection error
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Network context for one upload attempt
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub http: reqwest::Client,
    pub token: BearerToken,
    pub project_name: Option<String>,
}

/// Remote storage collaborator that performs the actual transfer
#[async_trait]
pub trait UploadClient: Send + Sync {
    /// Upload the given files. Returns whether any file was actually sent.
    async fn check_and_upload_files(
        &self,
        session: &UploadSession,
        file_paths: &[PathBuf],
    ) -> Result<bool, UploadError>;
}

/// Posts each staged snapshot as a JSON body to `{endpoint}/traces`
#[derive(Debug, Clone)]
pub struct HttpUploadClient {
    url: String,
}

impl HttpUploadClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            url: format!("{}{}", endpoint.trim_end_matches('/'), UPLOAD_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn check_and_upload_files(
        &self,
        session: &UploadSession,
        file_paths: &[PathBuf],
    ) -> Result<bool, UploadError> {
        let mut uploaded = false;

        for path in file_paths {
            let body = match tokio::fs::read(path).await {
                Ok(body) => body,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Staged file missing, skipping");
                    continue;
                }
                Err(source) => {
                    return Err(UploadError::Io {
                        path: path.clone(),
                        source,
                    });
                }
            };
            if body.is_empty() {
                tracing::debug!(path = %path.display(), "Staged file empty, skipping");
                continue;
            }

            let size = body.len();
            let mut request = session
                .http
                .post(&self.url)
                .bearer_auth(session.token.expose())
                .header(CONTENT_TYPE, "application/json")
                .body(body);
            if let Some(project) = &session.project_name {
                request = request.header(PROJECT_HEADER, project);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(UploadError::Rejected {
                    path: path.clone(),
                    status: status.as_u16(),
                    body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                });
            }

            tracing::debug!(path = %path.display(), size, status = status.as_u16(), "Trace file uploaded");
            uploaded = true;
        }

        Ok(uploaded)
    }
}
