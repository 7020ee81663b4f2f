//! jetload — client-side resource acquisition.
//!
//! - [`loader`]: a two-phase loader (sequential queue, then parallel queue)
//!   joined into one completion.
//! - [`net`]: the importer, which normalizes, deduplicates, caches, and
//!   injects scripts and stylesheets through a [`document::Document`].
//! - [`template`]: remote `{{token}}` templates pulled through the importer.
//! - [`cache`]: the timer-driven TTL cache both paths share.
//!
//! HTTP and the document are injected capabilities ([`transport::Transport`],
//! [`document::Document`]); events go to an [`events::EventBus`] owned by the
//! caller.

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod loader;
pub mod location;
pub mod net;
pub mod template;
pub mod transport;

pub use cache::{Ttl, TtlCache};
pub use config::NetworkConfig;
pub use document::{Completion, Document, HeadlessDocument};
pub use error::{LoaderError, Result};
pub use events::{EventBus, LoaderEvent};
pub use loader::{LoadRequest, LoadedFile, Loader, LoaderState, RunOutcome};
pub use location::Location;
pub use net::{Hint, ImportOptions, ImportRecord, ImportSource, ImportState, Imported, Network, ResourceKind};
pub use template::{Template, TemplateConfig, TemplateData};
pub use transport::{HttpTransport, Transport, TransportResponse};
