//! Application configuration management.
//!
//! Everything that is fixed at startup lives here: backend base URL,
//! transport timeouts and pool size, the reserved session keys, the data
//! directory and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/jbeatda/config.json`. The
//! `JBEATDA_BASE_URL` and `JBEATDA_DATA_DIR` environment variables override
//! the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::api::client::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_MAX_IDLE_CONNECTIONS,
    DEFAULT_MAX_RATE_LIMIT_RETRIES, DEFAULT_READ_TIMEOUT_MS,
};
use crate::auth::session::{SessionKeys, DEFAULT_EXPIRY_KEY, DEFAULT_TOKEN_KEY};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "jbeatda";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_BASE_URL: &str = "JBEATDA_BASE_URL";
pub const ENV_DATA_DIR: &str = "JBEATDA_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub max_idle_connections: usize,
    pub max_rate_limit_retries: u32,
    pub token_key: String,
    pub expiry_key: String,
    pub data_dir: Option<PathBuf>,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
            max_rate_limit_retries: DEFAULT_MAX_RATE_LIMIT_RETRIES,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            expiry_key: DEFAULT_EXPIRY_KEY.to_string(),
            data_dir: None,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from `lookup` (the process environment in production).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = value(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(dir) = value(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Root of everything the client persists (settings, logs)
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("logs"))
    }

    /// Base URL as a directory, so relative endpoint paths join under it
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).with_context(|| format!("Invalid base URL: {}", self.base_url))
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig {
            base_url: self.base_url()?,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            max_idle_connections: self.max_idle_connections,
            max_rate_limit_retries: self.max_rate_limit_retries,
        })
    }

    pub fn session_keys(&self) -> SessionKeys {
        SessionKeys {
            token: self.token_key.clone(),
            expiry: self.expiry_key.clone(),
        }
    }
}
