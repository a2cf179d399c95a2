//! Client configuration.
//!
//! `ClientConfig` is persisted as JSON under the user's config directory and
//! can be overridden from the environment. Timings for autosave and retry
//! live here so hosts can tune them without touching the engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "notekeep";

/// Environment variable overriding `api_base_url`.
pub const API_BASE_URL_ENV: &str = "NOTEKEEP_API_BASE_URL";

const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 1000;
const DEFAULT_SAVE_MAX_RETRIES: u32 = 3;
const DEFAULT_SAVE_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// Retries after the first failed save attempt.
    #[serde(default = "default_save_max_retries")]
    pub save_max_retries: u32,
    #[serde(default = "default_save_retry_delay_ms")]
    pub save_retry_delay_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            save_max_retries: DEFAULT_SAVE_MAX_RETRIES,
            save_retry_delay_ms: DEFAULT_SAVE_RETRY_DELAY_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

const fn default_save_debounce_ms() -> u64 {
    DEFAULT_SAVE_DEBOUNCE_MS
}

const fn default_save_max_retries() -> u32 {
    DEFAULT_SAVE_MAX_RETRIES
}

const fn default_save_retry_delay_ms() -> u64 {
    DEFAULT_SAVE_RETRY_DELAY_MS
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Directory holding notekeep's config and token files.
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| {
            Error::InvalidConfiguration("could not resolve a config directory".to_string())
        })
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_config_dir()?.join(CONFIG_FILE_NAME))
}

impl ClientConfig {
    /// Load from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&default_config_path()?)?;
        config.apply_env_overrides(std::env::var(API_BASE_URL_ENV).ok());
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::InvalidConfiguration(format!(
                "failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self, api_base_url: Option<String>) {
        if let Some(url) = normalize_text_option(api_base_url) {
            self.api_base_url = Some(url);
        }
    }

    /// The configured API base URL, validated.
    pub fn require_api_base_url(&self) -> Result<String> {
        let url = normalize_text_option(self.api_base_url.clone()).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "API base URL is not configured. Set {API_BASE_URL_ENV} or run `notekeep config init`."
            ))
        })?;
        if !is_http_url(&url) {
            return Err(Error::InvalidConfiguration(
                "API base URL must include http:// or https://".to_string(),
            ));
        }
        Ok(url)
    }

    #[must_use]
    pub const fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    #[must_use]
    pub const fn save_retry_delay(&self) -> Duration {
        Duration::from_millis(self.save_retry_delay_ms)
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
    }
}
