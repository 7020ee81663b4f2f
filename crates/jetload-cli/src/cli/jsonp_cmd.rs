//! `jetload jsonp <url>` — fetch and decode a JSONP endpoint.

use anyhow::Result;

use jetload::NetworkConfig;

use super::output::print_json;
use super::Session;

/// Run the jsonp command. The payload is always printed as JSON.
pub async fn run(config: &NetworkConfig, url: &str) -> Result<()> {
    let session = Session::open(config)?;
    let value = session.network.jsonp(url).await?;
    print_json(&value);
    Ok(())
}
