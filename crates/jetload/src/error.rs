//! Error types for the loader, importer, and template engine.

/// Errors that can occur while acquiring remote resources.
///
/// Every payload is plain data so a single failure can be handed to each
/// waiter of a deduplicated in-flight import.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Values for TTL must be a valid integer (got \"{0}\")")]
    InvalidTtl(String),

    #[error("Could not find importable content at {url}. (Received HTTP Status Code {status}.)")]
    HttpStatus { url: String, status: u16 },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("No template URL specified.")]
    MissingTemplateUrl,

    #[error("Document error: {0}")]
    Document(String),

    #[error("JSONP error for {url}: {message}")]
    Jsonp { url: String, message: String },
}

impl LoaderError {
    /// Whether this error came from the network rather than from caller input.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LoaderError::HttpStatus { .. } | LoaderError::Transport { .. }
        )
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LoaderError>;
