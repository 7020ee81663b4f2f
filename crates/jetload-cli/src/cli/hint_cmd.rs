//! `jetload hint` — print the resource-hint links a page would receive.

use anyhow::Result;
use clap::ValueEnum;

use jetload::document::Region;
use jetload::NetworkConfig;

use super::output::{is_json, print_json};
use super::Session;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum HintKind {
    Predns,
    Preconnect,
    Prefetch,
    Subresource,
    Prerender,
}

/// Run the hint command.
pub async fn run(config: &NetworkConfig, kind: HintKind, urls: &[String], crossorigin: Option<bool>) -> Result<()> {
    let session = Session::open(config)?;
    let net = &session.network;

    for url in urls {
        match kind {
            HintKind::Predns => net.predns(url, crossorigin).await?,
            HintKind::Preconnect => net.preconnect(url, crossorigin).await?,
            HintKind::Prefetch => net.prefetch(url, crossorigin).await?,
            HintKind::Subresource => net.subresource(url, crossorigin).await?,
            HintKind::Prerender => net.prerender(url, crossorigin).await?,
        }
    }

    let links: Vec<_> = session
        .document
        .nodes(Region::Head)
        .into_iter()
        .map(|node| {
            node.attributes
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect::<serde_json::Map<_, _>>()
        })
        .collect();

    if is_json() {
        print_json(&links);
    } else {
        for link in &links {
            let attrs: Vec<String> = link.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("<link {}>", attrs.join(" "));
        }
    }
    Ok(())
}
