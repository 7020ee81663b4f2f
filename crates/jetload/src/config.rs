//! Configuration loading and resolution.

use serde::{Deserialize, Serialize};

use crate::cache::Ttl;
use crate::error::{LoaderError, Result};

/// Base location used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost/";

/// Default lifetime of imported text and template sources (10 seconds).
pub const DEFAULT_TTL_MS: i64 = 10_000;

/// Fallback delay before a completion race gives up on its marker.
pub const DEFAULT_MARKER_TIMEOUT_MS: u64 = 750;

/// Default transport request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Settings shared by the importer and everything built on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// The location relative URLs resolve against.
    pub base_url: String,
    /// Default TTL for imported text, in milliseconds; negative never expires.
    pub default_ttl_ms: i64,
    /// How long to wait for a completion marker before giving up.
    pub marker_timeout_ms: u64,
    /// Transport request timeout.
    pub request_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_ttl_ms: DEFAULT_TTL_MS,
            marker_timeout_ms: DEFAULT_MARKER_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl NetworkConfig {
    /// Defaults overridden by `JETLOAD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Apply `JETLOAD_*` environment overrides on top of `self`.
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| LoaderError::InvalidConfig(format!("invalid network config: {e}")))
    }

    /// The default TTL as a [`Ttl`].
    pub fn default_ttl(&self) -> Ttl {
        Ttl::from_millis(self.default_ttl_ms)
    }

    fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base) = lookup("JETLOAD_BASE_URL") {
            self.base_url = base;
        }
        if let Some(ttl) = lookup("JETLOAD_TTL_MS") {
            self.default_ttl_ms = Ttl::parse(&ttl)?.as_millis();
        }
        if let Some(ms) = lookup("JETLOAD_MARKER_TIMEOUT_MS") {
            self.marker_timeout_ms = parse_ms("JETLOAD_MARKER_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("JETLOAD_TIMEOUT_MS") {
            self.request_timeout_ms = parse_ms("JETLOAD_TIMEOUT_MS", &ms)?;
        }
        Ok(self)
    }
}

fn parse_ms(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| LoaderError::InvalidConfig(format!("{key} must be a whole number of milliseconds (got \"{raw}\")")))
}
