//! Settings loaded from `~/.config/livefetch/config.toml`.
//!
//! Every field is optional; a missing file means defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::retry::RetryPolicy;

/// Retry section of the settings file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Proxy used when the caller does not pass one.
    pub proxy: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Overrides every platform's backup cap when set.
    pub max_backups: Option<usize>,
    pub retry: RetrySettings,
    /// Cookie strings keyed by platform id.
    pub cookies: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: 15,
            max_backups: None,
            retry: RetrySettings::default(),
            cookies: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load from the default location, falling back to defaults if the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load an explicitly named file. Unlike [`Settings::load`], a missing
    /// file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid TOML in {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub fn cookies_for(&self, platform: Platform) -> Option<&str> {
        self.cookies
            .get(platform.id())
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }

    /// Explicit proxy wins over the configured one. Empty strings count as
    /// unset.
    pub fn effective_proxy<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit
            .filter(|p| !p.is_empty())
            .or_else(|| self.proxy.as_deref().filter(|p| !p.is_empty()))
    }
}

/// Return the path to the settings file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("livefetch")
        .join("config.toml")
}
