use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedbrief::aggregate::Aggregator;
use feedbrief::config::Config;
use feedbrief::types::{FeedsResponse, NewsItem, Source};

/// Default config path (~/.config/feedbrief/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedbrief")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedbrief",
    version,
    about = "Aggregates news feeds and prints every article with a short summary as JSON"
)]
struct Args {
    /// Config file (default: ~/.config/feedbrief/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Never call the summarization service; use extractive summaries
    #[arg(long)]
    offline: bool,

    /// Only aggregate the named source (repeatable)
    #[arg(long = "source", value_name = "NAME")]
    sources: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Restricts `sources` to the names given on the command line, in config order.
fn select_sources(sources: &[Source], names: &[String]) -> Result<Vec<Source>> {
    if names.is_empty() {
        return Ok(sources.to_vec());
    }
    for name in names {
        if !sources.iter().any(|s| &s.name == name) {
            bail!("Unknown source '{}'", name);
        }
    }
    Ok(sources
        .iter()
        .filter(|s| names.contains(&s.name))
        .cloned()
        .collect())
}

async fn run(args: &Args) -> Result<Vec<NewsItem>> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;
    tracing::debug!(config = ?config, "Configuration resolved");

    let sources = select_sources(&config.sources, &args.sources)?;
    let aggregator =
        Aggregator::from_config(&config, args.offline).context("Failed to set up aggregation")?;

    let items = aggregator.aggregate(&sources).await?;
    Ok(items)
}

fn print_json(response: &FeedsResponse, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the JSON document
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(items) => print_json(&FeedsResponse::ok(items), args.pretty),
        Err(e) => {
            tracing::error!(error = %e, "Aggregation failed");
            print_json(&FeedsResponse::failed(format!("{:#}", e)), args.pretty)?;
            std::process::exit(1);
        }
    }
}
