//! JSONP requests without a script engine.
//!
//! The request carries a generated `callback=` parameter like a browser
//! JSONP call would; the response's `callback( ... )` wrapper is stripped and
//! the payload parsed as JSON.

use rand::Rng;

use super::Network;
use crate::error::{LoaderError, Result};

const BLOCKED: &str = "The JSONP request was blocked. This may be the result of an invalid URL, \
cross origin restrictions, or the remote server may not be online.";

impl Network {
    /// Execute a JSONP request and return the decoded payload.
    pub async fn jsonp(&self, url: &str) -> Result<serde_json::Value> {
        let callback = format!("jsonp_callback_{}", rand::thread_rng().gen_range(0..100_000));
        let separator = if url.contains('?') { '&' } else { '?' };
        let request = self.normalize(&format!("{url}{separator}callback={callback}"))?;

        let blocked = |detail: String| LoaderError::Jsonp {
            url: request.clone(),
            message: detail,
        };

        let resp = self
            .inner
            .transport
            .get(&request)
            .await
            .map_err(|e| blocked(format!("{BLOCKED} ({e})")))?;
        if !resp.is_success() {
            return Err(blocked(format!("{BLOCKED} (HTTP {})", resp.status)));
        }

        parse_jsonp(&resp.body, &callback).map_err(blocked)
    }
}

/// Strip `callback( ... );` from a JSONP body and parse what's inside.
pub fn parse_jsonp(body: &str, callback: &str) -> std::result::Result<serde_json::Value, String> {
    let trimmed = body.trim();
    let trimmed = trimmed.strip_prefix("/**/").unwrap_or(trimmed).trim_start();

    let inner = trimmed
        .strip_prefix(callback)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .ok_or_else(|| format!("response is not wrapped in {callback}(...)"))?;

    let inner = inner.trim_end();
    let inner = inner.strip_suffix(';').unwrap_or(inner).trim_end();
    let inner = inner
        .strip_suffix(')')
        .ok_or_else(|| "unterminated JSONP callback".to_string())?;

    serde_json::from_str(inner).map_err(|e| format!("invalid JSONP payload: {e}"))
}
