//! jetload — load scripts, stylesheets, fragments, and templates from the
//! command line.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod cli;
mod config;

use cli::hint_cmd::HintKind;

#[derive(Parser)]
#[command(
    name = "jetload",
    about = "jetload — two-phase resource loader with caching imports and remote templates",
    version,
    after_help = "Relative URLs resolve against --base-url (or JETLOAD_BASE_URL)."
)]
struct Cli {
    /// Base location relative URLs resolve against.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path to a JSON config file.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output results as JSON (machine-readable).
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load scripts: a sequential phase, then a parallel phase.
    Load {
        /// Load these one at a time, in order. Can be repeated.
        #[arg(long = "sync")]
        sync: Vec<String>,
        /// Load these together after the sequential phase. Can be repeated.
        #[arg(long = "async")]
        parallel: Vec<String>,
        /// Full request as JSON, e.g. '{"sync": ["a.js"], "async": ["b.js"]}'.
        #[arg(long, conflicts_with_all = ["sync", "parallel", "urls"])]
        request: Option<String>,
        /// Extra URLs for the parallel phase.
        urls: Vec<String>,
    },
    /// Import resources (scripts, stylesheets, or text).
    Import {
        /// URLs to import.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Skip the text cache.
        #[arg(long)]
        bypass_cache: bool,
        /// Cache lifetime for imported text, in ms (negative never expires).
        #[arg(long, allow_hyphen_values = true)]
        ttl: Option<String>,
    },
    /// Render a remote template.
    Template {
        /// Template URL.
        url: String,
        /// Template data as a JSON object.
        #[arg(long)]
        data: Option<String>,
        /// Source lifetime in ms (negative never expires).
        #[arg(long, allow_hyphen_values = true)]
        ttl: Option<String>,
    },
    /// Add resource hints and print the resulting links.
    Hint {
        /// Hint kind.
        #[arg(value_enum)]
        kind: HintKind,
        /// URLs (or domains, for predns).
        #[arg(required = true)]
        urls: Vec<String>,
        /// Force the crossorigin attribute on or off.
        #[arg(long)]
        crossorigin: Option<bool>,
    },
    /// Fetch a JSONP endpoint and print its payload.
    Jsonp {
        /// Endpoint URL.
        url: String,
    },
    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   jetload completions bash > ~/.local/share/bash-completion/completions/jetload
    ///   jetload completions zsh > ~/.zfunc/_jetload
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli::output::set_json(cli.json);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "jetload", &mut std::io::stdout());
        return Ok(());
    }

    let result = run(cli).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = config::resolve_config_path(cli.config.as_deref());
    let config = config::load(config_path.as_deref(), cli.base_url.as_deref())?;

    match cli.command {
        Commands::Load {
            sync,
            parallel,
            request,
            urls,
        } => {
            let request = cli::load_cmd::request(request.as_deref(), sync, parallel, urls)?;
            cli::load_cmd::run(&config, request).await
        }
        Commands::Import {
            urls,
            bypass_cache,
            ttl,
        } => cli::import_cmd::run(&config, &urls, bypass_cache, ttl.as_deref()).await,
        Commands::Template { url, data, ttl } => {
            let data = cli::template_cmd::parse_data(data.as_deref())?;
            cli::template_cmd::run(&config, &url, data, ttl.as_deref()).await
        }
        Commands::Hint {
            kind,
            urls,
            crossorigin,
        } => cli::hint_cmd::run(&config, kind, &urls, crossorigin).await,
        Commands::Jsonp { url } => cli::jsonp_cmd::run(&config, &url).await,
        Commands::Completions { .. } => Ok(()),
    }
}
