//! URL normalization against a base location.
//!
//! Every cache lookup, dedup check, and import record is keyed by the
//! normalized form produced here, so two spellings of the same resource
//! always collide.

use url::Url;

use crate::error::{LoaderError, Result};

/// The "current location" relative URLs resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    base: Url,
}

impl Location {
    /// Parse an absolute base URL.
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base.trim()).map_err(|e| LoaderError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(LoaderError::InvalidUrl {
                url: base.to_string(),
                reason: "base location must be hierarchical".to_string(),
            });
        }
        Ok(Self { base })
    }

    /// The base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Scheme of the base location (e.g. `https`).
    pub fn scheme(&self) -> &str {
        self.base.scheme()
    }

    /// Resolve `raw` against the base and canonicalize it.
    ///
    /// Scheme and host are lower-cased, default ports dropped, dot segments
    /// and repeated slashes collapsed, and the fragment removed.
    pub fn normalize(&self, raw: &str) -> Result<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LoaderError::InvalidUrl {
                url: raw.to_string(),
                reason: "empty URL".to_string(),
            });
        }

        let mut url = self.base.join(trimmed).map_err(|e| LoaderError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        url.set_fragment(None);
        if url.path().contains("//") {
            let collapsed = collapse_slashes(url.path());
            url.set_path(&collapsed);
        }

        Ok(url.to_string())
    }

    /// Whether `raw` points at a different origin than the base.
    ///
    /// Unparseable input counts as cross-origin.
    pub fn is_cross_origin(&self, raw: &str) -> bool {
        match self.normalize(raw).ok().and_then(|u| Url::parse(&u).ok()) {
            Some(url) => url.origin() != self.base.origin(),
            None => true,
        }
    }
}

/// Lower-cased file extension of the last path segment, query and fragment removed.
pub fn file_extension(uri: &str) -> Option<String> {
    let without_query = uri.split(['?', '#']).next().unwrap_or_default();
    let segment = without_query.rsplit('/').next().unwrap_or_default();
    let (_, ext) = segment.rsplit_once('.')?;
    let ext = ext.trim().to_ascii_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}
