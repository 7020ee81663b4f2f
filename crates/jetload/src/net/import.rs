//! Import pipeline: dedup, cache, classify, inject.

use futures::future::{try_join_all, FutureExt};

use super::{ImportOptions, ImportRecord, ImportSource, ImportState, Imported, Network, ResourceKind};
use crate::document::{completion_marker, unwrap_script, wrap_script, Completion, Element, Region};
use crate::error::Result;
use crate::events::LoaderEvent;
use crate::location::file_extension;

impl Network {
    /// Import a single resource.
    ///
    /// Resolution order for the normalized URL:
    /// 1. already injected → read back from the document, no request;
    /// 2. an identical import in flight → wait for it;
    /// 3. fresh in the cache (unless bypassed) → cached text;
    /// 4. otherwise fetch and handle by [`ResourceKind`].
    ///
    /// A non-200 response is an error; nothing is retried.
    pub async fn import(&self, url: &str, options: ImportOptions) -> Result<Imported> {
        let url = self.normalize(url)?;

        if let Some(imported) = self.read_back(&url) {
            tracing::debug!(url = %url, "already imported");
            return Ok(imported);
        }

        let shared = {
            let mut inflight = self.inflight();
            if let Some(shared) = inflight.get(&url) {
                shared.clone()
            } else {
                if !options.bypass_cache {
                    if let Some(content) = self.inner.cache.get(&url) {
                        drop(inflight);
                        return Ok(self.from_cache(url, content));
                    }
                }
                let shared = self.clone().fetch(url.clone(), options).boxed().shared();
                inflight.insert(url.clone(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Import several resources concurrently.
    ///
    /// Results keep the input order. The first failure fails the whole batch.
    pub async fn import_all<S: AsRef<str>>(&self, urls: &[S], options: ImportOptions) -> Result<Vec<Imported>> {
        try_join_all(urls.iter().map(|url| self.import(url.as_ref(), options))).await
    }

    fn read_back(&self, url: &str) -> Option<Imported> {
        let record = self.records().get(url).cloned()?;
        if record.state != ImportState::Imported || !record.kind.is_injected() {
            return None;
        }
        let content = self
            .inner
            .document
            .imported_text(url)
            .map(|text| unwrap_script(&text).to_string())
            .filter(|text| !text.is_empty());
        Some(Imported {
            url: record.url,
            kind: record.kind,
            content,
            source: ImportSource::AlreadyImported,
            completion: None,
        })
    }

    fn from_cache(&self, url: String, content: String) -> Imported {
        tracing::debug!(url = %url, "cache hit");
        self.inner.events.emit(LoaderEvent::HtmlImport {
            url: url.clone(),
            content: content.clone(),
        });
        Imported {
            url,
            kind: ResourceKind::Text,
            content: Some(content),
            source: ImportSource::Cache,
            completion: None,
        }
    }

    async fn fetch(self, url: String, options: ImportOptions) -> Result<Imported> {
        let kind = ResourceKind::classify(&url);
        if file_extension(&url).is_none() {
            tracing::warn!(url = %url, "resource has no file extension; importing as text");
        }

        let previous = self.begin_record(&url, kind);
        let result = match kind {
            ResourceKind::Script => self.inject_script(&url).await,
            ResourceKind::Stylesheet => self.inject_stylesheet(&url).await,
            ResourceKind::Text => self.fetch_text(&url, options).await,
        };

        match &result {
            Ok(_) => self.set_record_state(&url, ImportState::Imported),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "import failed");
                match previous {
                    Some(state) => self.set_record_state(&url, state),
                    None => {
                        self.records().remove(&url);
                    }
                }
            }
        }
        self.inflight().remove(&url);
        result
    }

    async fn inject_script(&self, url: &str) -> Result<Imported> {
        let body = self.inner.transport.get(url).await?.into_body()?;
        if body.is_empty() {
            tracing::warn!("{url} import has no content.");
        }

        let (marker, wait) = completion_marker("javascript");
        let text = wrap_script(&body, marker.id());
        self.append_to_head(Element::Script {
            import_id: url.to_string(),
            text,
            marker,
        })
        .await?;

        let completion = wait.wait(self.inner.marker_timeout).await;
        if completion == Completion::Timeout {
            tracing::warn!(url, "script did not report execution before the timeout");
        }

        Ok(Imported {
            url: url.to_string(),
            kind: ResourceKind::Script,
            content: Some(body),
            source: ImportSource::Network,
            completion: Some(completion),
        })
    }

    async fn inject_stylesheet(&self, url: &str) -> Result<Imported> {
        let (marker, wait) = completion_marker("stylesheet");
        self.append_to_head(Element::Stylesheet {
            import_id: url.to_string(),
            href: url.to_string(),
            marker,
        })
        .await?;

        let completion = wait.wait(self.inner.marker_timeout).await;
        Ok(Imported {
            url: url.to_string(),
            kind: ResourceKind::Stylesheet,
            content: None,
            source: ImportSource::Network,
            completion: Some(completion),
        })
    }

    async fn fetch_text(&self, url: &str, options: ImportOptions) -> Result<Imported> {
        let doc = self.inner.transport.get(url).await?.into_body()?;
        let ttl = options.ttl.unwrap_or(self.inner.default_ttl);
        self.inner.cache.set(url, doc.clone(), ttl);

        if doc.is_empty() {
            tracing::warn!("{url} import has no content.");
        }

        self.inner.events.emit(LoaderEvent::HtmlImport {
            url: url.to_string(),
            content: doc.clone(),
        });

        Ok(Imported {
            url: url.to_string(),
            kind: ResourceKind::Text,
            content: Some(doc),
            source: ImportSource::Network,
            completion: None,
        })
    }

    async fn append_to_head(&self, element: Element) -> Result<()> {
        if !self.inner.document.has_head() {
            tracing::warn!("document has no head; appending to body");
        }
        self.inner.document.append(Region::Head, element).await
    }

    /// Mark `url` pending; returns the state it had before, if any.
    fn begin_record(&self, url: &str, kind: ResourceKind) -> Option<ImportState> {
        let mut records = self.records();
        match records.get_mut(url) {
            Some(record) => Some(std::mem::replace(&mut record.state, ImportState::Pending)),
            None => {
                records.insert(
                    url.to_string(),
                    ImportRecord {
                        url: url.to_string(),
                        kind,
                        state: ImportState::Pending,
                    },
                );
                None
            }
        }
    }

    fn set_record_state(&self, url: &str, state: ImportState) {
        if let Some(record) = self.records().get_mut(url) {
            record.state = state;
        }
    }
}
