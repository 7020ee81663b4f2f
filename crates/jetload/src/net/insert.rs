//! Import a fragment and place it relative to a target element.

use serde::{Deserialize, Serialize};

use super::{ImportOptions, Network};
use crate::document::{completion_marker, Completion, InsertPosition};
use crate::error::Result;

/// Outcome of inserting imported content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insertion {
    /// Normalized URL of the fragment.
    pub url: String,
    pub target: String,
    pub position: InsertPosition,
    pub content: String,
    /// Whether the document reported the mutation or the timer gave up.
    pub completion: Completion,
}

impl Network {
    /// Import `url` and append it inside `target`.
    pub async fn import_to(&self, url: &str, target: &str) -> Result<Insertion> {
        self.insert_remote(url, target, InsertPosition::BeforeEnd).await
    }

    /// Import `url` and insert it right after `target`.
    pub async fn import_after(&self, url: &str, target: &str) -> Result<Insertion> {
        self.insert_remote(url, target, InsertPosition::AfterEnd).await
    }

    /// Import `url` and insert it right before `target`.
    pub async fn import_before(&self, url: &str, target: &str) -> Result<Insertion> {
        self.insert_remote(url, target, InsertPosition::BeforeBegin).await
    }

    async fn insert_remote(&self, url: &str, target: &str, position: InsertPosition) -> Result<Insertion> {
        let imported = self.import(url, ImportOptions::default()).await?;
        let content = imported.content.unwrap_or_default();

        let (observer, wait) = completion_marker("html");
        self.document()
            .insert_html(target, position, &content, observer)
            .await?;
        let completion = wait.wait(self.inner.marker_timeout).await;

        tracing::debug!(url = %imported.url, target, position = position.as_str(), ?completion, "fragment inserted");
        Ok(Insertion {
            url: imported.url,
            target: target.to_string(),
            position,
            content,
            completion,
        })
    }
}
