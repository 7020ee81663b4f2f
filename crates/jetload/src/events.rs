//! Notification bus — named events from the loader, importer, and templates.
//!
//! The bus is a `tokio::sync::broadcast` channel carrying [`LoaderEvent`]
//! values. Each component receives a bus handle at construction instead of
//! reaching for a process-wide singleton, so independent instances never see
//! each other's traffic. When nobody subscribes, events are dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::loader::LoadedFile;

/// Default buffer capacity for a new bus.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Every event the loader core emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoaderEvent {
    // ── Loader ────────────────────────────
    /// One entry of the sequential phase finished.
    SyncLoaded {
        file: String,
        content: Option<String>,
    },
    /// One entry of the parallel phase finished.
    AsyncLoaded {
        file: String,
        content: Option<String>,
    },
    /// Both phases drained; carries the joined result list.
    LoadComplete { files: Vec<LoadedFile> },

    // ── Importer ──────────────────────────
    /// Text content was imported (from the network or from cache).
    HtmlImport { url: String, content: String },
    /// A resource hint `<link rel=...>` was added to the document.
    NetworkHint { rel: String, url: String },

    // ── Template ──────────────────────────
    /// A template's TTL changed.
    CacheTtlChange {
        url: Option<String>,
        old: i64,
        new: i64,
    },
    /// A template's cached source and output were dropped.
    CacheCleared { url: Option<String> },
    /// A template finished rendering.
    Generated { url: Option<String>, output: String },
}

impl LoaderEvent {
    /// The dotted event name subscribers match on.
    pub fn name(&self) -> String {
        match self {
            LoaderEvent::SyncLoaded { .. } => "load.sync".to_string(),
            LoaderEvent::AsyncLoaded { .. } => "load.async".to_string(),
            LoaderEvent::LoadComplete { .. } => "load.complete".to_string(),
            LoaderEvent::HtmlImport { .. } => "html.import".to_string(),
            LoaderEvent::NetworkHint { rel, .. } => format!("network.{rel}"),
            LoaderEvent::CacheTtlChange { .. } => "cache.ttl.change".to_string(),
            LoaderEvent::CacheCleared { .. } => "cache.cleared".to_string(),
            LoaderEvent::Generated { .. } => "generated".to_string(),
        }
    }
}

/// Event channel handed to each component.
///
/// Cloning yields another handle onto the same channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<LoaderEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: LoaderEvent) {
        tracing::trace!(event = %event.name(), "emit");
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<LoaderEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Drain every event currently buffered on a receiver.
pub fn drain(rx: &mut broadcast::Receiver<LoaderEvent>) -> Vec<LoaderEvent> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => out.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    out
}
