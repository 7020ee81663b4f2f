//! Phased loader — a sequential queue followed by a parallel queue.
//!
//! `run` imports every `sync` entry one at a time, in order, then dispatches
//! every `async` entry together. When both phases drain, the sync results
//! followed by the async results are emitted as `load.complete` and returned.
//!
//! A loader runs one cycle at a time: calling `run` while a cycle is active
//! is ignored and reports [`RunOutcome::AlreadyRunning`].
//!
//! Repeated URLs (after normalization) are dropped while the queues are
//! built. The first occurrence wins and sync entries are seen before async
//! ones, so the result list holds one entry per distinct URL.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LoaderError, Result};
use crate::events::{EventBus, LoaderEvent};
use crate::net::{ImportOptions, Imported, Network, ResourceKind};

/// One loaded file as reported to callers and on `load.complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFile {
    /// Normalized URL.
    pub file: String,
    pub content: Option<String>,
}

impl From<Imported> for LoadedFile {
    fn from(imported: Imported) -> Self {
        Self {
            file: imported.url,
            content: imported.content,
        }
    }
}

/// What to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    /// Explicit `{ sync: [...], async: [...] }` lists.
    Phased { sync: Vec<String>, parallel: Vec<String> },
    /// A bare list; loaded in the parallel phase.
    List(Vec<String>),
    /// Loose URL arguments; loaded in the parallel phase.
    Args(Vec<String>),
}

impl LoadRequest {
    /// Build from loose URL arguments.
    pub fn args<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LoadRequest::Args(urls.into_iter().map(Into::into).collect())
    }

    /// Parse `{ "sync": ..., "async": ... }`, a list of URLs, or one URL.
    ///
    /// Each of `sync` / `async` may be a single string or a list of strings.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                for key in map.keys() {
                    if key != "sync" && key != "async" {
                        tracing::warn!(key = %key, "ignoring unknown loader option");
                    }
                }
                Ok(LoadRequest::Phased {
                    sync: url_list(map.get("sync"), "sync")?,
                    parallel: url_list(map.get("async"), "async")?,
                })
            }
            Value::Array(_) => Ok(LoadRequest::List(url_list(Some(value), "list")?)),
            Value::String(url) => Ok(LoadRequest::Args(vec![url.clone()])),
            other => Err(LoaderError::InvalidConfig(format!(
                "expected {{ sync, async }}, a list of URLs, or a URL; got {other}"
            ))),
        }
    }

    /// Split into (sync, async) lists.
    pub fn into_phases(self) -> (Vec<String>, Vec<String>) {
        match self {
            LoadRequest::Phased { sync, parallel } => (sync, parallel),
            LoadRequest::List(urls) | LoadRequest::Args(urls) => (Vec::new(), urls),
        }
    }
}

fn url_list(value: Option<&Value>, field: &str) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(url)) => Ok(vec![url.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(url) => Ok(url.clone()),
                other => Err(LoaderError::InvalidConfig(format!(
                    "{field} entries must be URL strings, got {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(LoaderError::InvalidConfig(format!(
            "{field} must be a URL or a list of URLs, got {other}"
        ))),
    }
}

/// Loader lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    Running,
}

/// Result of [`Loader::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Both phases finished; sync results first, then async results.
    Completed(Vec<LoadedFile>),
    /// Another cycle was active; this call did nothing.
    AlreadyRunning,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Two-phase loader over a [`Network`].
pub struct Loader {
    network: Network,
    events: EventBus,
    sync: Vec<String>,
    parallel: Vec<String>,
    running: AtomicBool,
}

impl Loader {
    /// Build the queues. URLs are normalized and deduplicated here, so a
    /// malformed URL fails now rather than mid-run.
    pub fn new(network: Network, request: LoadRequest) -> Result<Self> {
        let (sync, parallel) = request.into_phases();
        let mut seen = HashSet::new();
        let sync = queue(&network, sync, &mut seen)?;
        let parallel = queue(&network, parallel, &mut seen)?;

        Ok(Self {
            events: network.events().clone(),
            network,
            sync,
            parallel,
            running: AtomicBool::new(false),
        })
    }

    /// Normalized sync queue.
    pub fn sync_queue(&self) -> &[String] {
        &self.sync
    }

    /// Normalized async queue.
    pub fn async_queue(&self) -> &[String] {
        &self.parallel
    }

    pub fn state(&self) -> LoaderState {
        if self.running.load(Ordering::SeqCst) {
            LoaderState::Running
        } else {
            LoaderState::Idle
        }
    }

    /// Run one loading cycle.
    ///
    /// The first failing import aborts the cycle and is returned; the loader
    /// goes back to idle either way.
    pub async fn run(&self) -> Result<RunOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("loader already running; ignoring run()");
            return Ok(RunOutcome::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        tracing::info!(sync = self.sync.len(), parallel = self.parallel.len(), "load started");
        let mut files = Vec::with_capacity(self.sync.len() + self.parallel.len());

        for url in &self.sync {
            let file = LoadedFile::from(self.network.import(url, ImportOptions::default()).await?);
            self.events.emit(LoaderEvent::SyncLoaded {
                file: file.file.clone(),
                content: file.content.clone(),
            });
            files.push(file);
        }

        let parallel = self.parallel.iter().map(|url| async move {
            let file = LoadedFile::from(self.network.import(url, ImportOptions::default()).await?);
            self.events.emit(LoaderEvent::AsyncLoaded {
                file: file.file.clone(),
                content: file.content.clone(),
            });
            Ok::<_, LoaderError>(file)
        });
        files.extend(try_join_all(parallel).await?);

        tracing::info!(files = files.len(), "load complete");
        self.events.emit(LoaderEvent::LoadComplete {
            files: files.clone(),
        });
        Ok(RunOutcome::Completed(files))
    }

    /// [`Loader::run`], then hand the joined list to `callback`.
    ///
    /// The callback is skipped when the call was ignored as re-entrant.
    pub async fn run_with<F>(&self, callback: F) -> Result<RunOutcome>
    where
        F: FnOnce(&[LoadedFile]),
    {
        let outcome = self.run().await?;
        if let RunOutcome::Completed(files) = &outcome {
            callback(files);
        }
        Ok(outcome)
    }
}

fn queue(network: &Network, urls: Vec<String>, seen: &mut HashSet<String>) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(urls.len());
    for raw in urls {
        let url = network.normalize(&raw)?;
        if !seen.insert(url.clone()) {
            tracing::debug!(url = %url, "skipping duplicate loader entry");
            continue;
        }
        if ResourceKind::classify(&url) != ResourceKind::Script {
            tracing::warn!("{url} does not look like a script; loading it anyway");
        }
        out.push(url);
    }
    Ok(out)
}
