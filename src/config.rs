//! Configuration handling for the sync engine

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default form server address
const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8000/api";

/// Environment variable overriding the server address
pub const ADDRESS_ENV: &str = "ANSWER_SYNC_SERVER_ADDRESS";

const DEFAULT_DEBOUNCE_MS: u64 = 3000;
const DEFAULT_DELETE_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// User configuration; every field is optional and falls back to a default
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Form server base URL
    pub server_address: Option<String>,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Quiet period before a draft write is issued
    pub debounce_ms: Option<u64>,
    /// Retries after a failed draft delete
    pub delete_retries: Option<u32>,
    /// Linear backoff step between delete attempts
    pub retry_backoff_ms: Option<u64>,
    /// Per-request timeout
    pub request_timeout_secs: Option<u64>,
}

/// Timing parameters of the draft synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSettings {
    pub debounce: Duration,
    pub delete_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            delete_retries: DEFAULT_DELETE_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl SyncConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "answer-sync", "answer-sync")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if let Some(path) = path {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SyncConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Server address: environment, then file, then default
    pub fn server_address(&self) -> String {
        std::env::var(ADDRESS_ENV)
            .ok()
            .or_else(|| self.server_address.clone())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn draft_settings(&self) -> DraftSettings {
        let defaults = DraftSettings::default();
        DraftSettings {
            debounce: self
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            delete_retries: self.delete_retries.unwrap_or(defaults.delete_retries),
            retry_backoff: self
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        }
    }
}
