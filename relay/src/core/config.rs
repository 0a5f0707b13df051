use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_ENDPOINT, DEFAULT_UPLOAD_TIMEOUT_SECS,
    LAST_EXPORT_FILE_NAME, STAGING_DIR_NAME,
};
use super::credential::TokenSource;

// =============================================================================
// File Config Structs (all fields optional for merging)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct UploadFileConfig {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub token_env: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub project_name: Option<String>,
    pub session_id: Option<String>,
    pub staging_dir: Option<String>,
    pub last_export_path: Option<String>,
    pub upload: Option<UploadFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if other.project_name.is_some() {
            self.project_name = other.project_name;
        }
        if other.session_id.is_some() {
            self.session_id = other.session_id;
        }
        if other.staging_dir.is_some() {
            self.staging_dir = other.staging_dir;
        }
        if other.last_export_path.is_some() {
            self.last_export_path = other.last_export_path;
        }
        if let Some(upload) = other.upload {
            let current = self.upload.get_or_insert_with(UploadFileConfig::default);
            if upload.endpoint.is_some() {
                current.endpoint = upload.endpoint;
            }
            if upload.timeout_secs.is_some() {
                current.timeout_secs = upload.timeout_secs;
            }
            if upload.token_env.is_some() {
                current.token_env = upload.token_env;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

/// Upload settings used by the bridge and the HTTP client
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Collector base URL
    pub endpoint: String,
    /// Bound on a single upload attempt
    pub timeout: Duration,
    pub token: TokenSource,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            token: TokenSource::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Project name stamped on every envelope (`null` when unset)
    pub project_name: Option<String>,
    /// Fixed session id; a UUID is generated per coordinator when unset.
    /// Only read by `ExportCoordinator`, so it comes from the config file or
    /// library code, never from CLI flags.
    pub session_id: Option<String>,
    /// Working directory for `{trace_id}.jsonl` and `{trace_id}.json`
    pub staging_dir: PathBuf,
    /// Fixed file overwritten with the most recent envelope. Set from the
    /// config file or library code; the CLI only reports it.
    pub last_export_path: PathBuf,
    pub upload: UploadConfig,
}

impl RelayConfig {
    /// Defaults for library use: temp staging dir, `./tracer.json`, env token
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: Some(project_name.into()),
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            project_name: None,
            session_id: None,
            staging_dir: std::env::temp_dir().join(STAGING_DIR_NAME),
            last_export_path: cwd.join(LAST_EXPORT_FILE_NAME),
            upload: UploadConfig::default(),
        }
    }

    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.tracerelay/tracerelay.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading relay configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::layer(file_config, cli);
        config.validate()?;
        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn layer(file_config: FileConfig, cli: &CliConfig) -> Self {
        let defaults = Self::defaults();
        let file_upload = file_config.upload.unwrap_or_default();

        let staging_dir = cli
            .staging_dir
            .clone()
            .or(file_config.staging_dir.map(|s| expand_path(&s)))
            .unwrap_or(defaults.staging_dir);

        let last_export_path = file_config
            .last_export_path
            .map(|s| expand_path(&s))
            .unwrap_or(defaults.last_export_path);

        let timeout_secs = cli
            .upload_timeout_secs
            .or(file_upload.timeout_secs)
            .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS);

        let token = cli
            .token_env
            .clone()
            .or(file_upload.token_env)
            .map(TokenSource::Env)
            .unwrap_or_default();

        Self {
            project_name: cli.project.clone().or(file_config.project_name),
            session_id: file_config.session_id,
            staging_dir,
            last_export_path,
            upload: UploadConfig {
                endpoint: cli
                    .endpoint
                    .clone()
                    .or(file_upload.endpoint)
                    .unwrap_or(defaults.upload.endpoint),
                timeout: Duration::from_secs(timeout_secs),
                token,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(project) = &self.project_name
            && project.trim().is_empty()
        {
            anyhow::bail!("Project name must not be empty");
        }
        if self.upload.timeout.is_zero() {
            anyhow::bail!("Upload timeout must be greater than zero");
        }
        let endpoint = self.upload.endpoint.as_str();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            anyhow::bail!(
                "Invalid upload endpoint '{}': expected http:// or https:// URL",
                endpoint
            );
        }
        Ok(())
    }
}

/// Get the profile config path (~/.tracerelay/tracerelay.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
