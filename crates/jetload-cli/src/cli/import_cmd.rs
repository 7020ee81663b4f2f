//! `jetload import` — import one or more resources.

use anyhow::Result;
use serde::Serialize;

use jetload::{Completion, ImportOptions, ImportSource, NetworkConfig, ResourceKind, Ttl};

use super::output::{is_json, preview, print_json};
use super::Session;

#[derive(Serialize)]
struct ImportReport {
    url: String,
    kind: ResourceKind,
    source: ImportSource,
    completion: Option<Completion>,
    bytes: usize,
    content: Option<String>,
}

/// Run the import command.
pub async fn run(
    config: &NetworkConfig,
    urls: &[String],
    bypass_cache: bool,
    ttl: Option<&str>,
) -> Result<()> {
    let session = Session::open(config)?;
    let options = ImportOptions {
        bypass_cache,
        ttl: ttl.map(Ttl::parse).transpose()?,
    };

    let imported = session.network.import_all(urls, options).await?;
    let reports: Vec<ImportReport> = imported
        .into_iter()
        .map(|i| ImportReport {
            bytes: i.content.as_ref().map_or(0, String::len),
            url: i.url,
            kind: i.kind,
            source: i.source,
            completion: i.completion,
            content: i.content,
        })
        .collect();

    if is_json() {
        print_json(&reports);
        return Ok(());
    }

    for r in &reports {
        println!("{} [{:?}, {:?}] {} bytes", r.url, r.kind, r.source, r.bytes);
        if let Some(content) = &r.content {
            println!("  {}", preview(content, 72));
        }
    }
    Ok(())
}
