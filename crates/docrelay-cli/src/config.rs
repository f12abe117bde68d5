//! `docrelay.toml` loading.
//!
//! Every key is optional. A missing file yields the defaults, and
//! `DOCRELAY_UPSTREAM_URL` overrides `upstream.url` after the file is read.

use docrelay_core::{RelayError, RelayResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides the upstream endpoint.
pub const UPSTREAM_URL_ENV: &str = "DOCRELAY_UPSTREAM_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocrelayConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_url() -> String {
    docrelay_tools::DEFAULT_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    docrelay_tools::DEFAULT_TIMEOUT.as_secs()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}

impl DocrelayConfig {
    /// Read and parse `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> RelayResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(RelayError::Config(format!(
                    "failed to read '{}': {e}",
                    path.display()
                )))
            }
        };

        toml::from_str(&raw)
            .map_err(|e| RelayError::Config(format!("invalid '{}': {e}", path.display())))
    }

    /// Apply an upstream URL taken from the environment, if set and non-empty.
    pub fn with_upstream_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.upstream.url = url;
        }
        self
    }
}
