//! Configuration file parser for ~/.config/glance/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::feed::Vocabulary;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`, which targets
/// the Daring Fireball Atom feed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// URL of the Atom feed to fetch.
    pub feed_url: String,

    /// URL used when an entry has no qualifying link candidate.
    pub fallback_link: String,

    /// Element/attribute names the extractor looks up. Overridable so the
    /// same binary can read fixture feeds with renamed tags.
    pub vocabulary: Vocabulary,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://daringfireball.net/feeds/main".to_string(),
            fallback_link: "https://daringfireball.net".to_string(),
            vocabulary: Vocabulary::default(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading so a corrupted or hostile config
        // cannot exhaust memory.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in unknown_keys(&raw) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feed_url = %config.feed_url, "Loaded configuration");
        Ok(config)
    }
}

/// Collects keys serde would silently ignore, so likely typos get a warning.
/// Checks the top level and the `[vocabulary]` table.
fn unknown_keys(raw: &toml::Table) -> Vec<String> {
    const KNOWN: [&str; 3] = ["feed_url", "fallback_link", "vocabulary"];
    const KNOWN_VOCABULARY: [&str; 7] = [
        "root",
        "entry",
        "title",
        "published",
        "link",
        "relation_attr",
        "destination_attr",
    ];

    let mut unknown: Vec<String> = raw
        .keys()
        .filter(|k| !KNOWN.contains(&k.as_str()))
        .cloned()
        .collect();

    if let Some(toml::Value::Table(vocab)) = raw.get("vocabulary") {
        unknown.extend(
            vocab
                .keys()
                .filter(|k| !KNOWN_VOCABULARY.contains(&k.as_str()))
                .map(|k| format!("vocabulary.{}", k)),
        );
    }

    unknown
}
