//! Shared helpers for jetload integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use jetload::{
    EventBus, HeadlessDocument, LoaderEvent, Network, NetworkConfig, Result, Transport,
    TransportResponse,
};

pub const BASE: &str = "http://localhost:9876/base/";

/// Absolute URL under [`BASE`].
pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

/// In-memory transport that serves canned responses and logs every request.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, (u16, String)>>,
    delays: Mutex<HashMap<String, Duration>>,
    log: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 at `path` (relative to [`BASE`]).
    pub fn ok(self, path: &str, body: &str) -> Self {
        self.status(path, 200, body)
    }

    pub fn status(self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url(path), (status, body.to_string()));
        self
    }

    /// Hold the response for `path` by `ms` milliseconds.
    pub fn delay(self, path: &str, ms: u64) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(url(path), Duration::from_millis(ms));
        self
    }

    /// Every request, as `start <url>` / `end <url>` lines in order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// URLs requested, in order.
    pub fn requests(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|line| line.strip_prefix("start ").map(str::to_string))
            .collect()
    }

    /// Number of requests for `path`, ignoring query strings.
    pub fn hits(&self, path: &str) -> usize {
        let target = url(path);
        self.requests()
            .iter()
            .filter(|u| u.split('?').next() == Some(target.as_str()))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        self.log.lock().unwrap().push(format!("start {url}"));

        let path = url.split('?').next().unwrap_or(url).to_string();
        let delay = self.delays.lock().unwrap().get(&path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(&path).cloned();
        self.log.lock().unwrap().push(format!("end {url}"));

        let (status, body) = route.unwrap_or((404, "not found".to_string()));
        Ok(TransportResponse {
            url: url.to_string(),
            status,
            body,
        })
    }
}

/// A network over the given doubles, with a short marker timeout.
pub fn network(transport: Arc<MockTransport>, document: Arc<HeadlessDocument>) -> Network {
    let config = NetworkConfig {
        base_url: format!("{BASE}index.html"),
        marker_timeout_ms: 100,
        ..NetworkConfig::default()
    };
    Network::new(&config, transport, document, EventBus::new(1024)).unwrap()
}

/// Names of the drained events, in emission order.
pub fn names(events: &[LoaderEvent]) -> Vec<String> {
    events.iter().map(LoaderEvent::name).collect()
}
