//! The importer — turns URLs into content.
//!
//! [`Network`] resolves a URL against its [`Location`], deduplicates
//! in-flight and already-injected requests, serves fresh content from its
//! [`TtlCache`], and otherwise classifies the resource by suffix:
//! scripts are fetched and injected with a completion marker, stylesheets
//! are linked, and everything else is returned (and cached) as text.
//!
//! The hint, insertion, and JSONP helpers in the submodules are thin glue
//! over the same handle.

pub mod hints;
pub mod import;
pub mod insert;
pub mod jsonp;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};

use crate::cache::{Ttl, TtlCache};
use crate::config::NetworkConfig;
use crate::document::{Completion, Document};
use crate::error::Result;
use crate::events::EventBus;
use crate::location::{file_extension, Location};
use crate::transport::{HttpTransport, Transport};

pub use hints::Hint;
pub use insert::Insertion;

/// How a resource is handled once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Executable code injected into the document.
    Script,
    /// Style reference linked into the document.
    Stylesheet,
    /// Anything else; returned and cached as text.
    Text,
}

impl ResourceKind {
    /// Classify a normalized URL by its file extension.
    pub fn classify(url: &str) -> Self {
        match file_extension(url).as_deref() {
            Some("js") => ResourceKind::Script,
            Some("css") => ResourceKind::Stylesheet,
            _ => ResourceKind::Text,
        }
    }

    /// Whether the resource is injected into the document.
    pub fn is_injected(&self) -> bool {
        !matches!(self, ResourceKind::Text)
    }
}

/// Lifecycle of an [`ImportRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Pending,
    Imported,
}

/// Bookkeeping for one normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub url: String,
    pub kind: ResourceKind,
    pub state: ImportState,
}

/// Where an import's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    Network,
    Cache,
    /// Read back from the element injected by an earlier import.
    AlreadyImported,
}

/// Result of a single import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Imported {
    /// Normalized URL.
    pub url: String,
    pub kind: ResourceKind,
    /// Script source or text body. `None` for stylesheets and for
    /// injected elements the document could not read back.
    pub content: Option<String>,
    pub source: ImportSource,
    /// How the injection completed; `None` when nothing was injected.
    pub completion: Option<Completion>,
}

/// Per-call import options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Skip the cache lookup and fetch again.
    pub bypass_cache: bool,
    /// TTL for cached text; `None` uses the network default.
    pub ttl: Option<Ttl>,
}

impl ImportOptions {
    pub fn bypass_cache() -> Self {
        Self {
            bypass_cache: true,
            ttl: None,
        }
    }

    pub fn with_ttl(ttl: Ttl) -> Self {
        Self {
            bypass_cache: false,
            ttl: Some(ttl),
        }
    }
}

type SharedImport = Shared<BoxFuture<'static, Result<Imported>>>;

struct Inner {
    location: Location,
    transport: Arc<dyn Transport>,
    document: Arc<dyn Document>,
    events: EventBus,
    cache: TtlCache<String>,
    records: Mutex<HashMap<String, ImportRecord>>,
    inflight: Mutex<HashMap<String, SharedImport>>,
    default_ttl: Ttl,
    marker_timeout: Duration,
}

/// Handle onto the importer. Cloning shares the cache and import records.
#[derive(Clone)]
pub struct Network {
    inner: Arc<Inner>,
}

impl Network {
    /// Build an importer over the given transport and document.
    pub fn new(
        config: &NetworkConfig,
        transport: Arc<dyn Transport>,
        document: Arc<dyn Document>,
        events: EventBus,
    ) -> Result<Self> {
        let location = Location::new(&config.base_url)?;
        Ok(Self {
            inner: Arc::new(Inner {
                location,
                transport,
                document,
                events,
                cache: TtlCache::new(),
                records: Mutex::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
                default_ttl: config.default_ttl(),
                marker_timeout: Duration::from_millis(config.marker_timeout_ms),
            }),
        })
    }

    /// Build an importer that talks HTTP through reqwest.
    pub fn http(config: &NetworkConfig, document: Arc<dyn Document>, events: EventBus) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout_ms)?;
        Self::new(config, Arc::new(transport), document, events)
    }

    /// The event bus this importer emits on.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// The base location.
    pub fn location(&self) -> &Location {
        &self.inner.location
    }

    /// The document capability.
    pub fn document(&self) -> &Arc<dyn Document> {
        &self.inner.document
    }

    /// Default TTL applied to imported text.
    pub fn default_ttl(&self) -> Ttl {
        self.inner.default_ttl
    }

    /// Normalize a URL against the base location.
    pub fn normalize(&self, raw: &str) -> Result<String> {
        self.inner.location.normalize(raw)
    }

    // ── Cache ─────────────────────────────

    /// Cache content by URL. `None` keeps it until cleared.
    pub fn cache_content(&self, url: &str, content: impl Into<String>, ttl: Option<Ttl>) -> Result<()> {
        let key = self.normalize(url)?;
        self.inner
            .cache
            .set(&key, content.into(), ttl.unwrap_or(Ttl::Never));
        Ok(())
    }

    /// Cached content for a URL, if still fresh.
    pub fn cache_item(&self, url: &str) -> Option<String> {
        let key = self.normalize(url).ok()?;
        self.inner.cache.get(&key)
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    // ── Records ───────────────────────────

    /// The import record for a URL.
    pub fn import_record(&self, url: &str) -> Option<ImportRecord> {
        let key = self.normalize(url).ok()?;
        self.records().get(&key).cloned()
    }

    /// Every import record, sorted by URL.
    pub fn import_records(&self) -> Vec<ImportRecord> {
        let mut records: Vec<_> = self.records().values().cloned().collect();
        records.sort_by(|a, b| a.url.cmp(&b.url));
        records
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, ImportRecord>> {
        self.inner.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn inflight(&self) -> MutexGuard<'_, HashMap<String, SharedImport>> {
        self.inner.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }
}
