//! Trait definitions for the content module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ContentError;
use super::types::{ItemMetadata, MediaReference, StreamDescriptor};

/// Capability to talk to the remote media-hosting service.
///
/// Implementations are treated as already correct: the orchestration layer
/// does not retry their failures beyond its per-item catch boundary.
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Returns the name of this client implementation.
    fn name(&self) -> &str;

    /// Resolves an item reference to its title and available streams.
    async fn resolve_item(&self, reference: &MediaReference)
        -> Result<ItemMetadata, ContentError>;

    /// Enumerates the member items of a collection, in service order.
    async fn resolve_collection_members(
        &self,
        reference: &MediaReference,
    ) -> Result<Vec<MediaReference>, ContentError>;

    /// Streams the bytes of `stream` into `dest_path`, returning the number of
    /// bytes written.
    async fn transfer_stream(
        &self,
        stream: &StreamDescriptor,
        dest_path: &Path,
    ) -> Result<u64, ContentError>;
}

/// Fetches the raw body of a web page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, ContentError>;
}
