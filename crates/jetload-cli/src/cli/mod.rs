//! CLI subcommand implementations for the jetload binary.

pub mod hint_cmd;
pub mod import_cmd;
pub mod jsonp_cmd;
pub mod load_cmd;
pub mod output;
pub mod template_cmd;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use jetload::{EventBus, HeadlessDocument, LoaderEvent, Network, NetworkConfig};

/// A network over HTTP with a headless document, plus a task that mirrors
/// every bus event into the log.
pub struct Session {
    pub network: Network,
    pub document: Arc<HeadlessDocument>,
    events: JoinHandle<()>,
}

impl Session {
    pub fn open(config: &NetworkConfig) -> Result<Self> {
        let document = Arc::new(HeadlessDocument::new());
        let bus = EventBus::default();
        // Subscribe before anything can emit; the task may not run for a while.
        let events = tokio::spawn(log_events(bus.subscribe()));
        let network = Network::http(config, document.clone(), bus)?;

        tracing::debug!(base = %network.location().base(), "session opened");
        Ok(Self {
            network,
            document,
            events,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.events.abort();
    }
}

async fn log_events(mut rx: broadcast::Receiver<LoaderEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::info!(event = %event.name(), "{}", summary(&event)),
            Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn summary(event: &LoaderEvent) -> String {
    use LoaderEvent::*;
    match event {
        SyncLoaded { file, .. } | AsyncLoaded { file, .. } => file.clone(),
        LoadComplete { files } => format!("{} file(s)", files.len()),
        HtmlImport { url, content } => format!("{url} ({} bytes)", content.len()),
        NetworkHint { url, .. } => url.clone(),
        CacheTtlChange { old, new, .. } => format!("{old}ms -> {new}ms"),
        CacheCleared { url } | Generated { url, .. } => url.clone().unwrap_or_default(),
    }
}
