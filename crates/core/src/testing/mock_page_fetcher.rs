//! Mock page fetcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::content::{ContentError, PageFetcher};

/// Mock implementation of the PageFetcher trait.
///
/// Returns the same body for every URL and records the URLs requested.
#[derive(Debug, Clone, Default)]
pub struct MockPageFetcher {
    body: Arc<RwLock<String>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockPageFetcher {
    /// Create a fetcher returning `body`.
    pub fn new(body: &str) -> Self {
        Self {
            body: Arc::new(RwLock::new(body.to_string())),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Replace the page body.
    pub async fn set_body(&self, body: &str) {
        *self.body.write().await = body.to_string();
    }

    /// Get all requested URLs.
    pub async fn recorded_requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, ContentError> {
        self.requests.write().await.push(url.to_string());
        Ok(self.body.read().await.clone())
    }
}
