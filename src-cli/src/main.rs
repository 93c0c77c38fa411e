//! TKML command line renderer
//!
//! Renders a page file or URL to HTML on stdout, for precomputing pages
//! on the server.
//!
//! ```text
//! tkml <file|url> [--config tkml.json] [--origin http://host]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tkml_core::{Config, HttpFetcher, NavigateOptions, NavigationOutcome, RecordingHost, Runtime};

const USAGE: &str = "usage: tkml <file|url> [--config <path>] [--origin <url>]";

#[derive(Debug, PartialEq)]
struct Args {
    input: String,
    config: Option<PathBuf>,
    origin: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut input = None;
    let mut config = None;
    let mut origin = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--origin" => {
                origin = Some(args.next().context("--origin needs a url")?);
            }
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
            _ if input.is_some() => bail!("more than one input\n{}", USAGE),
            _ => input = Some(arg),
        }
    }

    Ok(Args {
        input: input.context(USAGE)?,
        config,
        origin,
    })
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

#[tokio::main]
async fn main() -> Result<()> {
    tkml_core::init_logging();

    let args = parse_args(std::env::args().skip(1))?;
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(origin) = args.origin {
        config.origin = origin;
    }

    let host = RecordingHost::new();
    let fetcher = HttpFetcher::new(config.user_agent.as_deref())?;
    let runtime = Runtime::new(config, Arc::new(host), Arc::new(fetcher))?;

    let html = if is_url(&args.input) {
        match runtime.navigate(&args.input, NavigateOptions::default()).await? {
            NavigationOutcome::Applied { markup, .. } => markup,
            outcome => bail!("page was not rendered: {:?}", outcome),
        }
    } else {
        let markup = std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input))?;
        runtime.from_text(&markup).await?
    };

    tracing::debug!(bytes = html.len(), "Rendered");
    println!("{}", html);
    Ok(())
}
