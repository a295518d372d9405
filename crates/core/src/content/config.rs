//! Configuration for the content module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How collection members are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStrategy {
    /// Ask the content client to enumerate the collection.
    #[default]
    Enumerator,
    /// Scrape member identifiers out of the collection's web page.
    PageScrape,
}

/// Configuration for the content client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Additional arguments passed to every yt-dlp invocation.
    #[serde(default)]
    pub extra_ytdlp_args: Vec<String>,

    /// Timeout for metadata resolution in seconds.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,

    /// Connect timeout for HTTP transfers in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User agent sent with HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Collection resolution strategy.
    #[serde(default)]
    pub collection_strategy: CollectionStrategy,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_resolve_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("lyra/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            extra_ytdlp_args: Vec::new(),
            resolve_timeout_secs: default_resolve_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            collection_strategy: CollectionStrategy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ContentConfig::default();
        assert_eq!(config.ytdlp_path, PathBuf::from("yt-dlp"));
        assert_eq!(config.collection_strategy, CollectionStrategy::Enumerator);
        assert!(config.user_agent.starts_with("lyra/"));
    }

    #[test]
    fn test_strategy_deserialization() {
        let config: ContentConfig =
            serde_json::from_str(r#"{"collection_strategy": "page_scrape"}"#).unwrap();
        assert_eq!(config.collection_strategy, CollectionStrategy::PageScrape);
        assert_eq!(config.resolve_timeout_secs, 120);
    }
}
