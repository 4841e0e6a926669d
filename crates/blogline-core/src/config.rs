//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend URL, where credentials are kept and the last
//! email used to sign in.
//!
//! Configuration is stored at `~/.config/blogline/config.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::transport::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::auth::{CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "blogline";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured backend URL
pub const API_URL_ENV: &str = "BLOGLINE_API_URL";

/// Backend used when neither the environment nor the config names one
pub const DEFAULT_API_URL: &str = "http://localhost:3008/api";

/// Where the credential pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
    /// Nothing survives the process
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_email: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: `BLOGLINE_API_URL`, then the config file, then the default.
    pub fn resolved_api_url(&self) -> String {
        self.api_url_with(std::env::var(API_URL_ENV).ok())
    }

    fn api_url_with(&self, env_override: Option<String>) -> String {
        env_override
            .into_iter()
            .chain(self.api_base_url.clone())
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Build the credential store selected by `credential_backend`
    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        Ok(match self.credential_backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::new(self.cache_dir()?)),
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore),
            CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        })
    }
}
