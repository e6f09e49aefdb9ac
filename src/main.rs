use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use glance::config::Config;
use glance::feed::fetch_entries;
use glance::util::validate_url;

/// Fetch an Atom feed and print its normalized entries.
#[derive(Debug, Parser)]
#[command(name = "glance", version, about)]
struct Cli {
    /// Feed URL (overrides the config file)
    url: Option<String>,

    /// Path to the config file (default: ~/.config/glance/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print entries as JSON instead of aligned text
    #[arg(long)]
    json: bool,
}

/// Get the default config file path (~/.config/glance/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("glance")
        .join("config.toml"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for entry output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    if let Some(url) = cli.url {
        config.feed_url = url;
    }

    let url = validate_url(&config.feed_url)
        .with_context(|| format!("Refusing to fetch '{}'", config.feed_url))?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("glance/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let extraction = fetch_entries(&client, url.as_str(), &config.vocabulary, &config.fallback_link)
        .await
        .with_context(|| format!("Could not process feed '{}'", url))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&extraction.entries)?);
    } else {
        for entry in &extraction.entries {
            println!(
                "{}  {}\n    {}",
                entry.date.format("%Y-%m-%d %H:%M"),
                entry.title,
                entry.link
            );
        }
    }

    if !extraction.dropped.is_empty() {
        tracing::warn!(
            dropped = extraction.dropped.len(),
            kept = extraction.entries.len(),
            "Some feed entries were malformed and skipped"
        );
    }

    Ok(())
}
