//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Base URL used when building public and deletion URLs.
    /// Falls back to the request `Host` header when unset.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Shared secret required in the `Authorization` header of create requests.
    /// Create endpoints are open when unset.
    #[serde(default)]
    pub upload_password: Option<String>,
    /// Maximum request body size for uploads in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: None,
            upload_password: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("public_url", &self.public_url)
            .field(
                "upload_password",
                &self.upload_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ServerConfig {
    /// Public base URL without a trailing slash, if configured.
    pub fn public_base(&self) -> Option<&str> {
        self.public_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes must be greater than 0".to_string());
        }
        if let Some(base) = self.public_base() {
            let parsed = url::Url::parse(base)
                .map_err(|e| format!("server.public_url is not a valid URL: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err("server.public_url must use http or https".to_string());
            }
        }
        if matches!(self.upload_password.as_deref(), Some(p) if p.is_empty()) {
            return Err("server.upload_password must not be empty when set".to_string());
        }
        Ok(())
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Directory holding uploaded files.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/uploads"),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } if path.as_os_str().is_empty() => {
                Err("storage.path must not be empty".to_string())
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/urls.db"),
        }
    }
}

impl MetadataConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { path } if path.as_os_str().is_empty() => {
                Err("metadata.path must not be empty".to_string())
            }
            MetadataConfig::Sqlite { .. } => Ok(()),
        }
    }
}

/// Source of the server secret that keys deletion capabilities.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecretConfig {
    /// Secret provided directly (NOT recommended for production).
    Value {
        value: String,
    },
    /// Secret read from an environment variable.
    Env {
        /// Environment variable name.
        var: String,
    },
    /// Secret read from a file. Surrounding whitespace is trimmed.
    File {
        path: PathBuf,
    },
}

impl fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { .. } => f
                .debug_struct("Value")
                .field("value", &"[REDACTED]")
                .finish(),
            Self::Env { var } => f.debug_struct("Env").field("var", var).finish(),
            Self::File { path } => f.debug_struct("File").field("path", path).finish(),
        }
    }
}

impl SecretConfig {
    /// Create a fixed secret for tests.
    pub fn for_testing() -> Self {
        Self::Value {
            value: "test-server-secret".to_string(),
        }
    }
}

/// Upload handling configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Extensions (derived from content) that may be stored.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Accept every extension that can be derived from content.
    #[serde(default)]
    pub allow_all_extensions: bool,
    /// MIME type to extension mappings that win over the built-in table.
    #[serde(default = "default_mime_overrides")]
    pub mime_overrides: HashMap<String, String>,
    /// Random bytes in generated filenames.
    #[serde(default = "default_file_token_bytes")]
    pub file_token_bytes: usize,
    /// Bytes inspected when sniffing content.
    #[serde(default = "default_sniff_window_bytes")]
    pub sniff_window_bytes: usize,
    /// Honor the client's request to keep part of the original filename.
    #[serde(default = "default_true")]
    pub use_original_filename: bool,
    /// Maximum characters kept from the original filename.
    #[serde(default = "default_original_filename_length")]
    pub original_filename_length: usize,
    /// Attempts at finding an unused filename before giving up.
    #[serde(default = "default_max_token_attempts")]
    pub max_token_attempts: u32,
}

fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webm", "mp4", "webp", "txt", "m4v"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_mime_overrides() -> HashMap<String, String> {
    HashMap::from([
        ("video/x-m4v".to_string(), "m4v".to_string()),
        ("image/webp".to_string(), "webp".to_string()),
    ])
}

fn default_file_token_bytes() -> usize {
    12
}

fn default_sniff_window_bytes() -> usize {
    2048
}

fn default_true() -> bool {
    true
}

fn default_original_filename_length() -> usize {
    18
}

fn default_max_token_attempts() -> u32 {
    5
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            allow_all_extensions: false,
            mime_overrides: default_mime_overrides(),
            file_token_bytes: default_file_token_bytes(),
            sniff_window_bytes: default_sniff_window_bytes(),
            use_original_filename: true,
            original_filename_length: default_original_filename_length(),
            max_token_attempts: default_max_token_attempts(),
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.allow_all_extensions
            && self
                .allowed_extensions
                .iter()
                .all(|e| e.trim().trim_start_matches('.').is_empty())
        {
            return Err(
                "upload.allowed_extensions is empty; set upload.allow_all_extensions = true \
                 to accept every type"
                    .to_string(),
            );
        }
        if self.file_token_bytes == 0 {
            return Err("upload.file_token_bytes must be greater than 0".to_string());
        }
        if self.sniff_window_bytes == 0 {
            return Err("upload.sniff_window_bytes must be greater than 0".to_string());
        }
        if self.max_token_attempts == 0 {
            return Err("upload.max_token_attempts must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// URL shortening configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShortenConfig {
    /// Random bytes in short URL tokens.
    #[serde(default = "default_url_token_bytes")]
    pub url_token_bytes: usize,
    /// Attempts at finding an unused token before giving up.
    #[serde(default = "default_max_token_attempts")]
    pub max_token_attempts: u32,
}

fn default_url_token_bytes() -> usize {
    6
}

impl Default for ShortenConfig {
    fn default() -> Self {
        Self {
            url_token_bytes: default_url_token_bytes(),
            max_token_attempts: default_max_token_attempts(),
        }
    }
}

impl ShortenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.url_token_bytes == 0 {
            return Err("shorten.url_token_bytes must be greater than 0".to_string());
        }
        if self.max_token_attempts == 0 {
            return Err("shorten.max_token_attempts must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Webhook notification configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Discord-compatible webhook endpoints.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Per-target delivery timeout in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_webhook_timeout_secs() -> f64 {
    5.0
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    /// Per-target timeout. Falls back to the default for values `validate` rejects.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_webhook_timeout_secs()))
    }

    pub fn validate(&self) -> Result<(), String> {
        match Duration::try_from_secs_f64(self.timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => {
                return Err(
                    "webhooks.timeout_secs must be a positive number of seconds".to_string(),
                );
            }
        }
        for target in &self.urls {
            url::Url::parse(target)
                .map_err(|e| format!("webhooks.urls contains an invalid URL {target}: {e}"))?;
        }
        Ok(())
    }
}

/// Stale-file sweep configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Files at least this many days old are deleted. 0 disables the sweep.
    #[serde(default)]
    pub max_age_days: u64,
    /// Seconds between sweep runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_age_days: 0,
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SweepConfig {
    pub fn enabled(&self) -> bool {
        self.max_age_days > 0
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(24 * 60 * 60))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.enabled() && self.interval_secs == 0 {
            return Err("sweep.interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Server secret source (required).
    pub secret: SecretConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub shorten: ShortenConfig,
    #[serde(default)]
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses the default relative data paths and a fixed secret.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            metadata: MetadataConfig::default(),
            secret: SecretConfig::for_testing(),
            upload: UploadConfig::default(),
            shorten: ShortenConfig::default(),
            webhooks: WebhookConfig::default(),
            sweep: SweepConfig::default(),
        }
    }

    /// Check every section, returning all problems found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let errors: Vec<String> = [
            self.server.validate(),
            self.storage.validate(),
            self.metadata.validate(),
            self.upload.validate(),
            self.shorten.validate(),
            self.webhooks.validate(),
            self.sweep.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
