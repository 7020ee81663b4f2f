//! Remote templates with `{{token}}` substitution.
//!
//! A [`Template`] pulls its raw text through the importer, keeps it in its
//! own [`TtlCache`] for `ttl`, and renders by replacing `{{key}}` tokens with
//! data values. Tokens with no matching key are removed from the output.
//! Rendering always starts again from the current raw text.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::cache::{Ttl, TtlCache};
use crate::config::DEFAULT_TTL_MS;
use crate::error::{LoaderError, Result};
use crate::events::{EventBus, LoaderEvent};
use crate::net::{ImportOptions, Network};

/// Key/value data applied to a template.
pub type TemplateData = serde_json::Map<String, Value>;

const SOURCE_KEY: &str = "source";

/// How a template is configured: a bare URL or `{ url, ttl }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    pub url: Option<String>,
    pub ttl: Ttl,
}

impl TemplateConfig {
    /// A template at `url` with the default TTL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ttl: Ttl::from_millis(DEFAULT_TTL_MS),
        }
    }

    /// Parse a JSON string or `{ "url": ..., "ttl": ... }` object.
    ///
    /// `ttl` (or `TTL`) may be a number or a numeric string; anything else is
    /// rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(url) => Ok(Self::url(url.clone())),
            Value::Object(map) => {
                let url = match map.get("url") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => {
                        return Err(LoaderError::InvalidConfig(format!(
                            "template url must be a string, got {other}"
                        )))
                    }
                };
                let ttl = match map.get("ttl").or_else(|| map.get("TTL")) {
                    None | Some(Value::Null) => Ttl::from_millis(DEFAULT_TTL_MS),
                    Some(raw) => ttl_from_value(raw)?,
                };
                Ok(Self { url, ttl })
            }
            other => Err(LoaderError::InvalidConfig(format!(
                "expected a template URL or {{ url, ttl }} object, got {other}"
            ))),
        }
    }
}

fn ttl_from_value(raw: &Value) -> Result<Ttl> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Ttl::from_millis)
            .ok_or_else(|| LoaderError::InvalidTtl(n.to_string())),
        Value::String(s) => Ttl::parse(s),
        other => Err(LoaderError::InvalidTtl(other.to_string())),
    }
}

struct TemplateState {
    url: Option<String>,
    output: Option<String>,
}

/// A remote template.
pub struct Template {
    network: Network,
    events: EventBus,
    ttl: Ttl,
    source: TtlCache<String>,
    shared: Arc<Mutex<TemplateState>>,
}

impl Template {
    /// Create a template bound to `network`. Emits on the network's bus.
    pub fn new(network: Network, config: TemplateConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .map(|u| network.normalize(u))
            .transpose()?;
        let events = network.events().clone();
        let shared = Arc::new(Mutex::new(TemplateState { url, output: None }));

        let source = {
            let shared = shared.clone();
            let events = events.clone();
            TtlCache::new().with_eviction_hook(move |_| {
                let url = {
                    let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
                    state.output = None;
                    state.url.clone()
                };
                tracing::debug!(url = ?url, "template source expired");
                events.emit(LoaderEvent::CacheCleared { url });
            })
        };

        Ok(Self {
            network,
            events,
            ttl: config.ttl,
            source,
            shared,
        })
    }

    /// Normalized URL of the remote template.
    pub fn url(&self) -> Option<String> {
        self.lock().url.clone()
    }

    /// Point the template at a new URL. Clears cached content when it changes.
    pub fn set_url(&mut self, url: &str) -> Result<()> {
        let url = self.network.normalize(url)?;
        let changed = {
            let mut state = self.lock();
            if state.url.as_deref() == Some(url.as_str()) {
                false
            } else {
                state.url = Some(url);
                true
            }
        };
        if changed {
            self.clear_cache();
        }
        Ok(())
    }

    /// How long raw template text stays in memory.
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Change the TTL and restart the eviction timer from now.
    pub fn set_ttl(&mut self, ttl: Ttl) {
        let old = self.ttl.as_millis();
        self.ttl = ttl;
        self.events.emit(LoaderEvent::CacheTtlChange {
            url: self.url(),
            old,
            new: ttl.as_millis(),
        });
        self.restart_timer();
    }

    /// [`Template::set_ttl`] from user input; non-numeric values are rejected.
    pub fn set_ttl_str(&mut self, raw: &str) -> Result<()> {
        let ttl = Ttl::parse(raw)?;
        self.set_ttl(ttl);
        Ok(())
    }

    /// Current raw template text.
    pub fn source(&self) -> Option<String> {
        self.source.get(SOURCE_KEY)
    }

    /// Replace the raw text and start its TTL.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source.set(SOURCE_KEY, source.into(), self.ttl);
    }

    /// Whether raw text is held in memory.
    pub fn is_cached(&self) -> bool {
        self.source.contains(SOURCE_KEY)
    }

    /// Most recent rendered output.
    pub fn output(&self) -> Option<String> {
        self.lock().output.clone()
    }

    /// Render the current source with `data`.
    ///
    /// Without source this warns and returns `None`.
    pub fn apply(&mut self, data: &TemplateData) -> Option<String> {
        let Some(source) = self.source() else {
            tracing::warn!(
                "Cannot apply data to empty template found at {}.",
                self.url().unwrap_or_default()
            );
            return None;
        };

        Some(self.render_source(&source, data))
    }

    /// Drop the raw text and rendered output.
    pub fn clear_cache(&mut self) {
        self.source.clear();
        self.lock().output = None;
        self.events.emit(LoaderEvent::CacheCleared { url: self.url() });
    }

    /// Raw template text, from memory unless `force` or nothing is cached.
    ///
    /// Every successful pull restarts the TTL, so a template in steady use
    /// stays in memory.
    pub async fn pull(&mut self, force: bool) -> Result<String> {
        if !force {
            if let Some(source) = self.source() {
                self.set_source(source.clone());
                return Ok(source);
            }
        }

        let url = self.url().ok_or(LoaderError::MissingTemplateUrl)?;
        let options = ImportOptions {
            bypass_cache: force,
            ttl: Some(self.ttl),
        };
        let imported = self.network.import(&url, options).await?;
        let source = imported.content.unwrap_or_default();
        self.set_source(source.clone());
        Ok(source)
    }

    /// Pull the template, then render it with `data`.
    pub async fn generate(&mut self, data: &TemplateData, force: bool) -> Result<String> {
        let source = self.pull(force).await?;
        Ok(self.render_source(&source, data))
    }

    fn render_source(&mut self, source: &str, data: &TemplateData) -> String {
        let output = render(source, data);
        self.lock().output = Some(output.clone());
        self.events.emit(LoaderEvent::Generated {
            url: self.url(),
            output: output.clone(),
        });
        output
    }

    fn restart_timer(&mut self) {
        if let Some(source) = self.source() {
            self.source.set(SOURCE_KEY, source, self.ttl);
        }
    }

    fn lock(&self) -> MutexGuard<'_, TemplateState> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Network {
    /// Fetch the template at `url` and render it with `data`.
    pub async fn template(&self, url: &str, data: &TemplateData) -> Result<String> {
        let mut template = Template::new(self.clone(), TemplateConfig::url(url))?;
        template.generate(data, false).await
    }
}

/// Substitute `{{key}}` tokens and strip any left over.
///
/// Tokens are resolved in one pass over the source. Substituted values are
/// inserted verbatim: a value that itself contains `{{x}}` is neither
/// expanded again nor stripped.
pub fn render(source: &str, data: &TemplateData) -> String {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let token = TOKEN.get_or_init(|| Regex::new(r"\{\{([^{}\n]*)\}\}").expect("token regex is valid"));

    token
        .replace_all(source, |caps: &regex::Captures<'_>| {
            data.get(&caps[1]).map(value_text).unwrap_or_default()
        })
        .into_owned()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
