//! Alias management
//!
//! Aliases are named references to tus upload endpoints, including
//! request headers and the retry and upload settings used against them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::{Backoff, ExponentialBackoff, FixedBackoff};
use crate::config::ConfigManager;
use crate::error::{Error, Result};
use crate::path::{Endpoint, is_valid_alias_name};

/// Backoff strategy between upload attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// Doubling delay, capped at `max_backoff_ms`
    Exponential,
}

/// Retry configuration for an alias
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of upload attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff strategy
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Delay before a retry in milliseconds (initial delay for exponential)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Upper bound for exponential backoff in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    5000
}

fn default_max_backoff() -> u64 {
    60000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffKind::default(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl RetryConfig {
    /// Build the backoff policy described by this configuration
    pub fn backoff_policy(&self) -> Box<dyn Backoff> {
        let delay = Duration::from_millis(self.backoff_ms);
        match self.backoff {
            BackoffKind::Fixed => Box::new(FixedBackoff::new(delay)),
            BackoffKind::Exponential => Box::new(ExponentialBackoff::new(
                delay,
                Duration::from_millis(self.max_backoff_ms),
            )),
        }
    }
}

/// Timeout configuration for an alias
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    30000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
        }
    }
}

/// Upload tuning for an alias
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Bytes sent per PATCH request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Send an integrity checksum with every chunk
    #[serde(default = "default_true")]
    pub checksum: bool,
}

fn default_chunk_size() -> usize {
    8 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            checksum: true,
        }
    }
}

/// An alias represents a named tus upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
    /// Unique name for this alias
    pub name: String,

    /// Base upload URL, e.g. "https://host/files"
    pub endpoint: String,

    /// Extra headers sent with every request (e.g. Authorization)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Retry configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,

    /// Upload configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadConfig>,
}

impl Alias {
    /// Create a new alias with required fields
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            headers: BTreeMap::new(),
            retry: None,
            timeout: None,
            upload: None,
        }
    }

    /// Check the alias name and endpoint without touching the network
    pub fn validate(&self) -> Result<Endpoint> {
        if !is_valid_alias_name(&self.name) {
            return Err(Error::Validation(format!(
                "Alias name '{}' may only contain letters, digits, '_' and '-'",
                self.name
            )));
        }
        Endpoint::parse(&self.endpoint)
    }

    /// Parsed endpoint for this alias
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.endpoint)
    }

    /// Get the effective retry configuration
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Get the effective timeout configuration
    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }

    /// Get the effective upload configuration
    pub fn upload_config(&self) -> UploadConfig {
        self.upload.clone().unwrap_or_default()
    }
}

/// Manager for alias operations
pub struct AliasManager {
    config_manager: ConfigManager,
}

impl AliasManager {
    /// Create a new AliasManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new AliasManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// List all configured aliases
    pub fn list(&self) -> Result<Vec<Alias>> {
        let config = self.config_manager.load()?;
        Ok(config.aliases)
    }

    /// Get an alias by name
    pub fn get(&self, name: &str) -> Result<Alias> {
        let config = self.config_manager.load()?;
        config
            .aliases
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::AliasNotFound(name.to_string()))
    }

    /// Add or update an alias
    pub fn set(&self, alias: Alias) -> Result<()> {
        alias.validate()?;

        let mut config = self.config_manager.load()?;
        config.aliases.retain(|a| a.name != alias.name);
        config.aliases.push(alias);

        self.config_manager.save(&config)
    }

    /// Remove an alias
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.aliases.len();

        config.aliases.retain(|a| a.name != name);

        if config.aliases.len() == original_len {
            return Err(Error::AliasNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }

    /// Check if an alias exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.aliases.iter().any(|a| a.name == name))
    }
}
