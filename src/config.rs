//! Configuration management for the CRUD client
//!
//! Loaded from ~/.config/dyncrud/config.json, then overridden by environment
//! variables (a `.env` file in the working directory is honored).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/dynamicApi";
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the dynamic record API
    pub api_url: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Initial grid page size
    pub page_size: usize,
    /// Where exports are written; working directory if unset
    pub export_dir: Option<PathBuf>,
    /// Bearer token to start the session with
    pub token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            page_size: DEFAULT_PAGE_SIZE,
            export_dir: None,
            token: None,
        }
    }
}

impl AppConfig {
    /// Get the config file path (~/.config/dyncrud/config.json)
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("dyncrud");

        Ok(config_dir.join("config.json"))
    }

    /// Load configuration from disk and the environment, creating an empty
    /// config file if it doesn't exist
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "using default configuration");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Try to load configuration from disk
    fn try_load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let config = Self::default();
            let _ = config.save();
            return Ok(config);
        }

        let contents = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
    }

    /// Apply `DYNCRUD_*` overrides; `lookup` abstracts the environment
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DYNCRUD_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(token) = lookup("DYNCRUD_TOKEN").filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
        if let Some(size) = lookup("DYNCRUD_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            if size > 0 {
                self.page_size = size;
            }
        }
        if let Some(dir) = lookup("DYNCRUD_EXPORT_DIR").filter(|v| !v.is_empty()) {
            self.export_dir = Some(PathBuf::from(dir));
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory exports are written to
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
