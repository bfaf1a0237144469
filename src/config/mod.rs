//! Configuration management for feedsweep.
//!
//! Configuration is read from `~/.config/feedsweep/config.toml` (or the path
//! given with `--config`). Missing fields use defaults, then environment
//! variables and command-line flags are layered on top:
//!
//! - `FEEDBIN_USERNAME`, `FEEDBIN_PASSWORD`: credentials
//! - `DRY_RUN=1`: do not mark anything as read
//! - `FEEDSWEEP_CACHE_DIR`: item cache location

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::feedbin::{normalize_base_url, DEFAULT_BASE_URL, DEFAULT_CONCURRENT_REQUESTS};
use crate::client::MAX_IDS_PER_FETCH;
use crate::rules::RuleConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log matches instead of marking them as read
    pub dry_run: bool,
    /// Log every fetched item
    pub verbose: bool,
    pub client: ClientConfig,
    pub cache: CacheConfig,
    pub rules: Vec<RuleConfig>,
}

/// Which feed service to talk to. Only one backend is used per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    #[default]
    Feedbin,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub kind: ClientKind,
    pub username: String,
    pub password: String,
    pub base_url: String,
    /// Ids per entries request (1..=100)
    pub batch_size: usize,
    /// Entries requests allowed in flight at once
    pub max_concurrent_requests: usize,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kind: ClientKind::Feedbin,
            username: String::new(),
            password: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            batch_size: MAX_IDS_PER_FETCH,
            max_concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Defaults to the user cache directory, or the temp directory
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl CacheConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("feedsweep"),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path if none is
    /// given, then apply environment overrides. Call [`Config::validate`]
    /// before talking to the feed service.
    ///
    /// An explicit path must exist. A missing default file just means
    /// defaults (credentials then have to come from the environment).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedsweep/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("feedsweep").join("config.toml"))
    }

    /// Overlay environment variables looked up through `var`.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = var("FEEDBIN_USERNAME").filter(|v| !v.is_empty()) {
            self.client.username = username;
        }
        if let Some(password) = var("FEEDBIN_PASSWORD").filter(|v| !v.is_empty()) {
            self.client.password = password;
        }
        if var("DRY_RUN").as_deref() == Some("1") {
            self.dry_run = true;
        }
        if let Some(dir) = var("FEEDSWEEP_CACHE_DIR").filter(|v| !v.is_empty()) {
            self.cache.dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.username.is_empty() {
            return Err(ConfigError::MissingCredential("username"));
        }
        if self.client.password.is_empty() {
            return Err(ConfigError::MissingCredential("password"));
        }
        if !(1..=MAX_IDS_PER_FETCH).contains(&self.client.batch_size) {
            return Err(ConfigError::InvalidValue(format!(
                "client.batch_size must be between 1 and {}, got {}",
                MAX_IDS_PER_FETCH, self.client.batch_size
            )));
        }
        if self.client.max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue(
                "client.max_concurrent_requests must be at least 1".into(),
            ));
        }
        if self.client.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "client.timeout_secs must be at least 1".into(),
            ));
        }
        normalize_base_url(&self.client.base_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "client.base_url '{}' is not a valid URL: {}",
                self.client.base_url, e
            ))
        })?;

        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing {0}: set client.{0} in the config file or FEEDBIN_{upper} in the environment", upper = .0.to_uppercase())]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}
