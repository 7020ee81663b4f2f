//! `jetload template` — render a remote template.

use anyhow::{Context, Result};

use jetload::{NetworkConfig, Template, TemplateConfig, TemplateData, Ttl};

use super::output::{is_json, print_json};
use super::Session;

/// Parse `--data` into template data. Must be a JSON object.
pub fn parse_data(raw: Option<&str>) -> Result<TemplateData> {
    let Some(raw) = raw else {
        return Ok(TemplateData::new());
    };
    let value: serde_json::Value = serde_json::from_str(raw).context("--data must be JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("--data must be a JSON object, got {other}"),
    }
}

/// Run the template command.
pub async fn run(config: &NetworkConfig, url: &str, data: TemplateData, ttl: Option<&str>) -> Result<()> {
    let session = Session::open(config)?;

    let mut template_config = TemplateConfig::url(url);
    if let Some(ttl) = ttl {
        template_config.ttl = Ttl::parse(ttl)?;
    }
    let mut template = Template::new(session.network.clone(), template_config)?;
    let output = template.generate(&data, false).await?;

    if is_json() {
        print_json(&serde_json::json!({
            "url": template.url(),
            "ttl": template.ttl().as_millis(),
            "output": output,
        }));
    } else {
        println!("{output}");
    }
    Ok(())
}
