//! Configuration for the confirmation core.
//!
//! This is the small slice of the server's configuration that the core
//! actually consumes: which request store to use (and where it lives), how long
//! a confirmation link stays good for, where confirmation links point, and
//! optionally the text of the notifications we send. It's YAML, same as
//! anything else human-facing around here.
//!
//! ```yaml
//! store:
//!   backend: file
//!   path: /var/lib/mailsign/pending
//! request_ttl_hours: 72
//! confirm_url: https://validation.example.com/confirm
//! ```

use crate::{
    error::{Error, Result},
    template::Templates,
};
use chrono::Duration;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Which request store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Confirmations are switched off. See [DisabledStore](crate::store::DisabledStore).
    #[serde(alias = "none")]
    Disabled,
    /// Requests live in memory and die with the process.
    #[serde(alias = "volatile")]
    Memory,
    /// Requests live in files and survive restarts.
    #[serde(alias = "durable")]
    File,
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Request store settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct StoreConfig {
    /// The backend to use.
    #[serde(default)]
    backend: StoreBackend,
    /// Where the file backend keeps its entries. Ignored by the others.
    #[serde(default)]
    path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(backend: StoreBackend, path: Option<PathBuf>) -> Self {
        Self { backend, path }
    }
}

/// Overrides for the notification texts. Anything left out uses the built-in
/// default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct TemplateConfig {
    #[serde(default)]
    confirmation: Option<String>,
    #[serde(default)]
    signed_key: Option<String>,
}

/// The whole thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Config {
    /// Request store settings.
    #[serde(default)]
    store: StoreConfig,
    /// How many hours a confirmation link is good for. `None` means forever.
    #[serde(default)]
    request_ttl_hours: Option<u32>,
    /// Base URL confirmation links point at. The nonce is appended as a
    /// `nonce` query parameter. Without one, confirmation mails carry the bare
    /// token and expect a reply.
    #[serde(default)]
    confirm_url: Option<Url>,
    /// Notification text overrides.
    #[serde(default)]
    templates: TemplateConfig,
}

impl Config {
    /// Parse and validate a config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading config");
        Self::from_yaml(&contents)
    }

    /// Make sure the config hangs together.
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::File && self.store.path.is_none() {
            Err(Error::ConfigInvalid(String::from("store.path is required for the file backend")))?;
        }
        if let Some(url) = self.confirm_url.as_ref() {
            if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
                Err(Error::ConfigInvalid(format!("confirm_url must be an http(s) URL: {}", url)))?;
            }
        }
        if self.request_ttl_hours == Some(0) {
            Err(Error::ConfigInvalid(String::from("request_ttl_hours must be greater than zero")))?;
        }
        self.build_templates()?;
        Ok(())
    }

    /// The request TTL as a duration.
    pub fn request_ttl(&self) -> Option<Duration> {
        self.request_ttl_hours.map(|h| Duration::hours(i64::from(h)))
    }

    /// Build the notification templates, applying any overrides.
    pub fn build_templates(&self) -> Result<Templates> {
        let defaults = Templates::default();
        Templates::new(
            self.templates.confirmation.as_deref().unwrap_or(defaults.confirmation()),
            self.templates.signed_key.as_deref().unwrap_or(defaults.signed_key()),
        )
    }
}
