//! `jetload load` — run a two-phase load.

use anyhow::{Context, Result};

use jetload::{LoadRequest, Loader, NetworkConfig, RunOutcome};

use super::output::{is_json, preview, print_json};
use super::Session;

/// Build the request from flags. `--request` JSON takes precedence over
/// `--sync` / `--async` lists, which take precedence over bare URLs.
pub fn request(
    raw: Option<&str>,
    sync: Vec<String>,
    parallel: Vec<String>,
    urls: Vec<String>,
) -> Result<LoadRequest> {
    if let Some(raw) = raw {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("--request must be JSON")?;
        return Ok(LoadRequest::from_value(&value)?);
    }
    if !sync.is_empty() || !parallel.is_empty() {
        let mut parallel = parallel;
        parallel.extend(urls);
        return Ok(LoadRequest::Phased { sync, parallel });
    }
    Ok(LoadRequest::args(urls))
}

/// Run the load command.
pub async fn run(config: &NetworkConfig, request: LoadRequest) -> Result<()> {
    let session = Session::open(config)?;
    let loader = Loader::new(session.network.clone(), request)?;

    if !is_json() {
        println!(
            "Loading {} sequential, {} parallel...",
            loader.sync_queue().len(),
            loader.async_queue().len()
        );
    }

    let files = match loader.run().await? {
        RunOutcome::Completed(files) => files,
        RunOutcome::AlreadyRunning => anyhow::bail!("loader is already running"),
    };

    if is_json() {
        print_json(&files);
    } else {
        for file in &files {
            let body = file.content.as_deref().map(|c| preview(c, 60)).unwrap_or_default();
            println!("  {}  {}", file.file, body);
        }
        println!("Loaded {} file(s).", files.len());
    }
    Ok(())
}
