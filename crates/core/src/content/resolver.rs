//! Collection member resolution.
//!
//! Two strategies are supported: asking the content client to enumerate the
//! collection, or scraping member identifiers out of the collection page.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::config::{CollectionStrategy, ContentConfig};
use super::error::ContentError;
use super::traits::{ContentClient, PageFetcher};
use super::types::MediaReference;
use super::ytdlp::WATCH_URL_PREFIX;

static MEMBER_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:watch\?v=|"videoId"\s*:\s*")([A-Za-z0-9_-]{11})"#)
        .expect("member id pattern is valid")
});

/// Resolves a collection reference into its member references.
#[derive(Clone)]
pub enum CollectionResolver {
    /// Delegates to [`ContentClient::resolve_collection_members`].
    EnumeratorBased,
    /// Fetches the collection page and extracts member identifiers.
    PageScrapeBased(Arc<dyn PageFetcher>),
}

impl std::fmt::Debug for CollectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnumeratorBased => f.write_str("EnumeratorBased"),
            Self::PageScrapeBased(_) => f.write_str("PageScrapeBased"),
        }
    }
}

impl Default for CollectionResolver {
    fn default() -> Self {
        Self::EnumeratorBased
    }
}

impl CollectionResolver {
    /// Builds the resolver selected by `config.collection_strategy`.
    pub fn from_config(config: &ContentConfig) -> Result<Self, ContentError> {
        Ok(match config.collection_strategy {
            CollectionStrategy::Enumerator => Self::EnumeratorBased,
            CollectionStrategy::PageScrape => {
                Self::PageScrapeBased(Arc::new(HttpPageFetcher::new(config)?))
            }
        })
    }

    /// Name of the strategy, for logging.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::EnumeratorBased => "enumerator",
            Self::PageScrapeBased(_) => "page_scrape",
        }
    }

    /// Resolves `reference` into member references.
    pub async fn resolve(
        &self,
        client: &dyn ContentClient,
        reference: &MediaReference,
    ) -> Result<Vec<MediaReference>, ContentError> {
        match self {
            Self::EnumeratorBased => client.resolve_collection_members(reference).await,
            Self::PageScrapeBased(fetcher) => {
                let body = fetcher.fetch_page(reference.as_str()).await?;
                let members: Vec<MediaReference> = scrape_member_ids(&body)
                    .into_iter()
                    .map(|id| MediaReference::new(format!("{}{}", WATCH_URL_PREFIX, id)))
                    .collect();
                debug!(
                    reference = %reference,
                    members = members.len(),
                    "Scraped collection page"
                );
                Ok(members)
            }
        }
    }
}

/// Extracts member identifiers from a page body, deduplicated and in
/// first-seen order.
pub fn scrape_member_ids(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MEMBER_ID_RE
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Page fetcher backed by reqwest.
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &ContentConfig) -> Result<Self, ContentError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.resolve_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, ContentError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ContentError::resolution(
                url,
                format!("HTTP {} while fetching collection page", response.status()),
            ));
        }
        Ok(response.text().await?)
    }
}
