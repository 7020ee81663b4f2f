//! Document capability — where imported scripts, stylesheets, hints, and
//! HTML fragments land.
//!
//! The importer never touches a global document. It is handed a
//! [`Document`] at construction and talks to it through elements carrying
//! [`CompletionMarker`]s. A marker is fired by the document once the engine
//! has actually executed / loaded / inserted the element; the importer races
//! that signal against a timeout and tags which branch won.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::{LoaderError, Result};

/// Attribute tagging every injected element with its normalized URL.
pub const IMPORT_ID_ATTR: &str = "jet-import-id";

/// Function a wrapped script calls once it has finished executing.
pub const MARKER_FN: &str = "__jetloadExecuted";

/// Where an appended element goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Head,
    Body,
}

/// Position of an HTML fragment relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    /// Immediately before the target.
    BeforeBegin,
    /// Immediately after the target.
    AfterEnd,
    /// Inside the target, after its last child.
    BeforeEnd,
}

impl InsertPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::BeforeBegin => "beforebegin",
            InsertPosition::AfterEnd => "afterend",
            InsertPosition::BeforeEnd => "beforeend",
        }
    }
}

/// Which branch of a completion race won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The document fired the marker.
    Marker,
    /// The fallback timer elapsed first.
    Timeout,
}

/// One-shot signal the document fires when an element is done.
#[derive(Debug)]
pub struct CompletionMarker {
    id: String,
    tx: Option<oneshot::Sender<()>>,
}

impl CompletionMarker {
    /// Unique marker id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Signal completion. Firing twice is a no-op.
    pub fn fire(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// The importer's half of a [`CompletionMarker`].
#[derive(Debug)]
pub struct MarkerWait {
    id: String,
    rx: oneshot::Receiver<()>,
}

impl MarkerWait {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the marker, or for `timeout`, whichever comes first.
    ///
    /// A marker dropped without firing is never observed, so the timeout wins.
    pub async fn wait(self, timeout: Duration) -> Completion {
        let rx = self.rx;
        let observed = async move {
            if rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = observed => Completion::Marker,
            _ = tokio::time::sleep(timeout) => {
                tracing::debug!(marker = %self.id, "completion marker timed out");
                Completion::Timeout
            }
        }
    }
}

/// Create a linked marker pair with a fresh id under `kind` (e.g. `javascript`).
pub fn completion_marker(kind: &str) -> (CompletionMarker, MarkerWait) {
    let id = format!("{kind}::{}", uuid::Uuid::new_v4());
    let (tx, rx) = oneshot::channel();
    (
        CompletionMarker {
            id: id.clone(),
            tx: Some(tx),
        },
        MarkerWait { id, rx },
    )
}

/// Wrap executable source so it reports completion after it has run.
pub fn wrap_script(body: &str, marker_id: &str) -> String {
    format!("{body}\n;{MARKER_FN}('{marker_id}');")
}

/// Strip the trailer added by [`wrap_script`], if present.
pub fn unwrap_script(text: &str) -> &str {
    match text.rfind(&format!("\n;{MARKER_FN}('")) {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// An element the importer asks the document to append.
#[derive(Debug)]
pub enum Element {
    /// Inline executable code; fire `marker` after execution.
    Script {
        import_id: String,
        text: String,
        marker: CompletionMarker,
    },
    /// Stylesheet reference; fire `marker` on load.
    Stylesheet {
        import_id: String,
        href: String,
        marker: CompletionMarker,
    },
    /// Resource hint (`preconnect`, `dns-prefetch`, ...).
    Link {
        rel: String,
        href: String,
        crossorigin: bool,
    },
}

/// Narrow view of a document.
#[async_trait]
pub trait Document: Send + Sync {
    /// Whether the document has a head to receive hints and injected elements.
    fn has_head(&self) -> bool;

    /// Append an element. `Region::Head` falls back to the body when there is no head.
    async fn append(&self, region: Region, element: Element) -> Result<()>;

    /// Text content of the element tagged with `import_id`, if one exists.
    fn imported_text(&self, import_id: &str) -> Option<String>;

    /// Insert an HTML fragment relative to `target`; fire `observer` once the
    /// mutation is visible.
    async fn insert_html(
        &self,
        target: &str,
        position: InsertPosition,
        html: &str,
        observer: CompletionMarker,
    ) -> Result<()>;
}

// ── Headless document ─────────────────────

/// A node recorded by [`HeadlessDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl Node {
    /// Value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A fragment inserted with [`Document::insert_html`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub target: String,
    pub position: InsertPosition,
    pub html: String,
}

#[derive(Default)]
struct HeadlessState {
    head: Vec<Node>,
    body: Vec<Node>,
    fragments: Vec<Fragment>,
    executed: Vec<String>,
}

/// In-memory document that "executes" scripts by recording them.
///
/// Markers fire as soon as an element is appended unless
/// [`HeadlessDocument::withhold_markers`] is set, in which case every
/// completion race falls through to its timeout.
pub struct HeadlessDocument {
    has_head: bool,
    fire_markers: AtomicBool,
    state: Mutex<HeadlessState>,
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self {
            has_head: true,
            fire_markers: AtomicBool::new(true),
            state: Mutex::new(HeadlessState::default()),
        }
    }

    /// A document with no `<head>`.
    pub fn without_head() -> Self {
        Self {
            has_head: false,
            ..Self::new()
        }
    }

    /// Stop (or resume) firing completion markers.
    pub fn withhold_markers(&self, withhold: bool) {
        self.fire_markers.store(!withhold, Ordering::SeqCst);
    }

    /// Nodes appended to a region.
    pub fn nodes(&self, region: Region) -> Vec<Node> {
        let state = self.lock();
        match region {
            Region::Head => state.head.clone(),
            Region::Body => state.body.clone(),
        }
    }

    /// First node in head or body whose attribute `name` equals `value`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<Node> {
        let state = self.lock();
        state
            .head
            .iter()
            .chain(state.body.iter())
            .find(|n| n.attr(name) == Some(value))
            .cloned()
    }

    /// Script bodies in execution order (marker trailer removed).
    pub fn executed_scripts(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Fragments inserted so far.
    pub fn fragments(&self) -> Vec<Fragment> {
        self.lock().fragments.clone()
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn settle(&self, mut marker: CompletionMarker) {
        if self.fire_markers.load(Ordering::SeqCst) {
            marker.fire();
        }
    }
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Document for HeadlessDocument {
    fn has_head(&self) -> bool {
        self.has_head
    }

    async fn append(&self, region: Region, element: Element) -> Result<()> {
        let (node, marker) = match element {
            Element::Script {
                import_id,
                text,
                marker,
            } => {
                self.lock().executed.push(unwrap_script(&text).to_string());
                let node = Node {
                    tag: "script".to_string(),
                    attributes: vec![
                        ("type".to_string(), "text/javascript".to_string()),
                        (IMPORT_ID_ATTR.to_string(), import_id),
                    ],
                    text,
                };
                (node, Some(marker))
            }
            Element::Stylesheet {
                import_id,
                href,
                marker,
            } => {
                let node = Node {
                    tag: "link".to_string(),
                    attributes: vec![
                        ("rel".to_string(), "stylesheet".to_string()),
                        ("type".to_string(), "text/css".to_string()),
                        ("href".to_string(), href),
                        (IMPORT_ID_ATTR.to_string(), import_id),
                    ],
                    text: String::new(),
                };
                (node, Some(marker))
            }
            Element::Link {
                rel,
                href,
                crossorigin,
            } => {
                let mut attributes = vec![("rel".to_string(), rel), ("href".to_string(), href)];
                if crossorigin {
                    attributes.push(("crossorigin".to_string(), "true".to_string()));
                }
                let node = Node {
                    tag: "link".to_string(),
                    attributes,
                    text: String::new(),
                };
                (node, None)
            }
        };

        {
            let mut state = self.lock();
            if region == Region::Head && self.has_head {
                state.head.push(node);
            } else {
                state.body.push(node);
            }
        }

        if let Some(marker) = marker {
            self.settle(marker);
        }
        Ok(())
    }

    fn imported_text(&self, import_id: &str) -> Option<String> {
        self.find_by_attr(IMPORT_ID_ATTR, import_id).map(|n| n.text)
    }

    async fn insert_html(
        &self,
        target: &str,
        position: InsertPosition,
        html: &str,
        observer: CompletionMarker,
    ) -> Result<()> {
        if target.trim().is_empty() {
            return Err(LoaderError::Document(
                "insertion target selector is empty".to_string(),
            ));
        }
        self.lock().fragments.push(Fragment {
            target: target.to_string(),
            position,
            html: html.to_string(),
        });
        self.settle(observer);
        Ok(())
    }
}
