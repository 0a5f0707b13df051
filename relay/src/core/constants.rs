// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "tracerelay";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".tracerelay";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tracerelay.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACERELAY_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRACERELAY_LOG";

// =============================================================================
// Environment Variables - Export
// =============================================================================

/// Environment variable for the project name attached to every envelope
pub const ENV_PROJECT: &str = "TRACERELAY_PROJECT";

/// Environment variable overriding the staging directory
pub const ENV_STAGING_DIR: &str = "TRACERELAY_STAGING_DIR";

// =============================================================================
// Environment Variables - Upload
// =============================================================================

/// Environment variable for the collector base URL
pub const ENV_ENDPOINT: &str = "TRACERELAY_ENDPOINT";

/// Environment variable for the upload timeout in seconds
pub const ENV_UPLOAD_TIMEOUT_SECS: &str = "TRACERELAY_UPLOAD_TIMEOUT_SECS";

/// Environment variable naming the variable that holds the bearer token
pub const ENV_TOKEN_ENV: &str = "TRACERELAY_TOKEN_ENV";

/// Default environment variable holding the bearer token
pub const DEFAULT_TOKEN_ENV: &str = "TRACERELAY_TOKEN";

// =============================================================================
// Staging Layout
// =============================================================================

/// Directory created under the system temp dir for staged traces
pub const STAGING_DIR_NAME: &str = "tracerelay";

/// Fixed file in the current working directory holding the last envelope
pub const LAST_EXPORT_FILE_NAME: &str = "tracer.json";

/// Extension of the line-delimited per-trace history
pub const LINES_EXTENSION: &str = "jsonl";

/// Extension of the per-trace array snapshot
pub const SNAPSHOT_EXTENSION: &str = "json";

// =============================================================================
// Upload Defaults
// =============================================================================

/// Default collector base URL
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/api";

/// Path appended to the endpoint for trace uploads
pub const UPLOAD_PATH: &str = "/traces";

/// Header carrying the project name on upload requests
pub const PROJECT_HEADER: &str = "X-Project-Name";

/// Default bound on a single upload attempt in seconds
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;

/// Extra time the caller waits for the worker reply beyond the upload timeout
pub const UPLOAD_REPLY_GRACE_MS: u64 = 500;

/// Name of the background upload thread
pub const UPLOAD_WORKER_THREAD: &str = "tracerelay-upload";
