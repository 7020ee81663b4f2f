//! Resource hints: `<link rel=...>` elements that let the engine resolve,
//! connect, or fetch ahead of time.

use serde::{Deserialize, Serialize};

use super::Network;
use crate::document::{Element, Region};
use crate::error::Result;
use crate::events::LoaderEvent;

/// Kinds of resource hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hint {
    DnsPrefetch,
    Preconnect,
    Prefetch,
    Subresource,
    Prerender,
}

impl Hint {
    /// The `rel` attribute value, also used as the `network.<rel>` event suffix.
    pub fn rel(&self) -> &'static str {
        match self {
            Hint::DnsPrefetch => "dns-prefetch",
            Hint::Preconnect => "preconnect",
            Hint::Prefetch => "prefetch",
            Hint::Subresource => "subresource",
            Hint::Prerender => "prerender",
        }
    }
}

impl Network {
    /// Append a hint link to the head and emit `network.<rel>`.
    ///
    /// `crossorigin` defaults to comparing the URL's origin with the base.
    /// Without a head this logs a warning and does nothing.
    pub async fn prelink(&self, url: &str, hint: Hint, crossorigin: Option<bool>) -> Result<()> {
        if !self.document().has_head() {
            tracing::warn!(
                "Cannot use a preconnect, predns, etc because there is no HEAD in the HTML document."
            );
            return Ok(());
        }

        let href = if url.trim().to_ascii_lowercase().starts_with("http") {
            url.trim().to_string()
        } else {
            self.normalize(url)?
        };
        let crossorigin = crossorigin.unwrap_or_else(|| self.location().is_cross_origin(&href));

        self.document()
            .append(
                Region::Head,
                Element::Link {
                    rel: hint.rel().to_string(),
                    href: href.clone(),
                    crossorigin,
                },
            )
            .await?;

        tracing::debug!(rel = hint.rel(), href = %href, "resource hint added");
        self.events().emit(LoaderEvent::NetworkHint {
            rel: hint.rel().to_string(),
            url: href,
        });
        Ok(())
    }

    /// Resolve DNS for `domain` ahead of time. Uses the base location's scheme.
    pub async fn predns(&self, domain: &str, crossorigin: Option<bool>) -> Result<()> {
        let url = format!("{}://{}", self.location().scheme(), domain.trim());
        self.prelink(&url, Hint::DnsPrefetch, crossorigin).await
    }

    /// Resolve DNS, open the connection, and negotiate TLS ahead of time.
    pub async fn preconnect(&self, url: &str, crossorigin: Option<bool>) -> Result<()> {
        self.prelink(url, Hint::Preconnect, crossorigin).await
    }

    /// Fetch and cache a resource that may be needed later.
    pub async fn prefetch(&self, url: &str, crossorigin: Option<bool>) -> Result<()> {
        self.prelink(url, Hint::Prefetch, crossorigin).await
    }

    /// A prioritized [`Network::prefetch`] for resources the current page needs.
    pub async fn subresource(&self, url: &str, crossorigin: Option<bool>) -> Result<()> {
        self.prelink(url, Hint::Subresource, crossorigin).await
    }

    /// Render a whole page in the background.
    pub async fn prerender(&self, url: &str, crossorigin: Option<bool>) -> Result<()> {
        self.prelink(url, Hint::Prerender, crossorigin).await
    }
}
