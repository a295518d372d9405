//! Mock content client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::content::{
    ContentClient, ContentError, ItemMetadata, MediaReference, StreamDescriptor,
};

/// Bytes written by every successful transfer.
pub const MOCK_STREAM_CONTENT: &[u8] = b"mock stream bytes";

/// Separator between the owning reference and the stream id in mock URLs.
const URL_SEPARATOR: &str = "#stream=";

/// A recorded transfer for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTransfer {
    /// Item the stream belongs to.
    pub reference: MediaReference,
    /// The stream that was requested.
    pub stream: StreamDescriptor,
    /// Where the bytes were written.
    pub dest_path: PathBuf,
}

/// Mock implementation of the ContentClient trait.
///
/// Provides controllable behavior for testing:
/// - Serve configured items and collections
/// - Write a fixed payload on transfer
/// - Fail resolution or transfer for chosen references
/// - Track transfers and peak transfer concurrency
///
/// # Example
///
/// ```rust,ignore
/// use lyra_core::testing::MockContentClient;
///
/// let client = MockContentClient::new();
/// client.add_item(fixtures::audio_item("ref-1", "Song", &[128, 160])).await;
/// client.fail_transfer(MediaReference::from("ref-2")).await;
///
/// let item = client.resolve_item(&MediaReference::from("ref-1")).await?;
/// assert_eq!(item.title, "Song");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockContentClient {
    /// Items by reference.
    items: Arc<RwLock<HashMap<MediaReference, ItemMetadata>>>,
    /// Collection members by collection reference.
    collections: Arc<RwLock<HashMap<MediaReference, Vec<MediaReference>>>>,
    /// References whose resolution fails.
    failing_resolves: Arc<RwLock<HashSet<MediaReference>>>,
    /// References whose transfer fails.
    failing_transfers: Arc<RwLock<HashSet<MediaReference>>>,
    /// Recorded transfers.
    transfers: Arc<RwLock<Vec<RecordedTransfer>>>,
    /// Simulated transfer duration.
    transfer_delay: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockContentClient {
    /// Create a new mock content client with no items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item.
    ///
    /// Streams without a URL get a mock URL tying them back to the item, so
    /// transfers can be attributed to a reference.
    pub async fn add_item(&self, mut item: ItemMetadata) {
        for stream in &mut item.streams {
            if stream.url.is_none() {
                stream.url = Some(format!("{}{}{}", item.reference, URL_SEPARATOR, stream.id));
            }
        }
        self.items.write().await.insert(item.reference.clone(), item);
    }

    /// Register collection members.
    pub async fn set_collection(&self, reference: MediaReference, members: Vec<MediaReference>) {
        self.collections.write().await.insert(reference, members);
    }

    /// Make resolution of `reference` fail.
    pub async fn fail_resolve(&self, reference: MediaReference) {
        self.failing_resolves.write().await.insert(reference);
    }

    /// Make transfers of any stream of `reference` fail.
    pub async fn fail_transfer(&self, reference: MediaReference) {
        self.failing_transfers.write().await.insert(reference);
    }

    /// Set the simulated transfer duration.
    pub async fn set_transfer_delay(&self, delay: Duration) {
        *self.transfer_delay.write().await = delay;
    }

    /// Get all recorded transfers.
    pub async fn recorded_transfers(&self) -> Vec<RecordedTransfer> {
        self.transfers.read().await.clone()
    }

    /// Highest number of transfers observed running at once.
    pub fn max_concurrent_transfers(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn owner_of(stream: &StreamDescriptor) -> Option<MediaReference> {
        let url = stream.url.as_deref()?;
        let (reference, _) = url.split_once(URL_SEPARATOR)?;
        Some(MediaReference::from(reference))
    }
}

/// Decrements the in-flight counter when a transfer ends, however it ends.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentClient for MockContentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve_item(&self, reference: &MediaReference) -> Result<ItemMetadata, ContentError> {
        if self.failing_resolves.read().await.contains(reference) {
            return Err(ContentError::resolution(reference, "mock resolution failure"));
        }

        self.items
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| ContentError::resolution(reference, "unknown item"))
    }

    async fn resolve_collection_members(
        &self,
        reference: &MediaReference,
    ) -> Result<Vec<MediaReference>, ContentError> {
        if self.failing_resolves.read().await.contains(reference) {
            return Err(ContentError::resolution(reference, "mock resolution failure"));
        }

        self.collections
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| ContentError::resolution(reference, "unknown collection"))
    }

    async fn transfer_stream(
        &self,
        stream: &StreamDescriptor,
        dest_path: &Path,
    ) -> Result<u64, ContentError> {
        let reference = Self::owner_of(stream)
            .unwrap_or_else(|| MediaReference::new(stream.id.clone()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));

        self.transfers.write().await.push(RecordedTransfer {
            reference: reference.clone(),
            stream: stream.clone(),
            dest_path: dest_path.to_path_buf(),
        });

        // Half the payload lands before the delay, so failures and
        // cancellations leave a partial file behind.
        let (head, tail) = MOCK_STREAM_CONTENT.split_at(MOCK_STREAM_CONTENT.len() / 2);
        tokio::fs::write(dest_path, head).await?;

        let delay = *self.transfer_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing_transfers.read().await.contains(&reference) {
            return Err(ContentError::transfer("mock transfer failure"));
        }

        let mut content = head.to_vec();
        content.extend_from_slice(tail);
        tokio::fs::write(dest_path, &content).await?;

        Ok(content.len() as u64)
    }
}
