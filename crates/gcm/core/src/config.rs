//! Dispatcher configuration.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth scope required to send through FCM.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Production FCM endpoint.
pub const DEFAULT_BASE_URL: &str = "https://fcm.googleapis.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("No Firebase credentials file configured (set FIREBASE_CREDENTIALS_FILE)")]
    MissingCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Service-account JSON file.
    #[serde(default)]
    pub credentials_file: PathBuf,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound on registration ids per chunk.
    #[serde(default = "default_max_recipients")]
    pub max_recipients: NonZeroUsize,
    /// Per-request timeout in seconds; the HTTP client default when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_recipients() -> NonZeroUsize {
    NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN)
}

fn default_database_url() -> String {
    "gcm.db".to_string()
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::new(),
            scope: default_scope(),
            base_url: default_base_url(),
            max_recipients: default_max_recipients(),
            timeout_secs: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Config {
    /// Configuration with defaults for everything but the credentials file.
    pub fn new(credentials_file: impl Into<PathBuf>) -> Self {
        Self {
            firebase: FirebaseConfig {
                credentials_file: credentials_file.into(),
                ..Default::default()
            },
            database: DatabaseConfig::default(),
        }
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Build purely from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(PathBuf::new()).with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` and validate them.
    ///
    /// Recognised keys: `FIREBASE_CREDENTIALS_FILE`, `GCM_MAX_RECIPIENTS`,
    /// `GCM_BASE_URL`, `DATABASE_URL`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("FIREBASE_CREDENTIALS_FILE") {
            self.firebase.credentials_file = PathBuf::from(path);
        }

        if let Some(raw) = lookup("GCM_MAX_RECIPIENTS") {
            self.firebase.max_recipients = raw
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "GCM_MAX_RECIPIENTS",
                    value: raw.clone(),
                })?;
        }

        if let Some(url) = lookup("GCM_BASE_URL") {
            self.firebase.base_url = url;
        }

        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }

        Ok(self)
    }

    /// Credentials file, required only for talking to the gateway.
    pub fn credentials_file(&self) -> Result<&Path, ConfigError> {
        if self.firebase.credentials_file.as_os_str().is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(&self.firebase.credentials_file)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.firebase.timeout_secs.map(Duration::from_secs)
    }

    /// FCM v1 send endpoint for a project.
    pub fn send_url(&self, project_id: &str) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.firebase.base_url.trim_end_matches('/'),
            project_id
        )
    }
}
