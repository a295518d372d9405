//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the capability traits the
//! orchestration layer depends on, so downloads, conversions and the
//! toolchain bootstrap can be exercised without network access or ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use lyra_core::testing::{fixtures, MockContentClient, MockConverter};
//!
//! let client = Arc::new(MockContentClient::new());
//! client.add_item(fixtures::audio_item("ref-1", "Song", &[96, 160])).await;
//!
//! let orchestrator = DownloadOrchestrator::new(
//!     client.clone(),
//!     Arc::new(MockConverter::new()),
//!     DownloadConfig::default(),
//! );
//! ```

mod mock_content_client;
mod mock_converter;
mod mock_page_fetcher;
mod mock_toolchain_fetcher;

pub use mock_content_client::{MockContentClient, RecordedTransfer, MOCK_STREAM_CONTENT};
pub use mock_converter::{MockConverter, RecordedConversion};
pub use mock_page_fetcher::MockPageFetcher;
pub use mock_toolchain_fetcher::MockToolchainFetcher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::content::{ItemMetadata, MediaReference, StreamDescriptor};

    /// Create an item offering one audio-only webm stream per bitrate.
    pub fn audio_item(reference: &str, title: &str, bitrates_kbps: &[u32]) -> ItemMetadata {
        let streams = bitrates_kbps
            .iter()
            .map(|kbps| StreamDescriptor::audio(format!("a{}", kbps), "webm", *kbps))
            .collect();
        ItemMetadata::new(MediaReference::from(reference), title, streams)
    }

    /// Create a collection of `count` items titled "Track 1".."Track N".
    ///
    /// Returns the member references and their metadata.
    pub fn collection(prefix: &str, count: usize) -> (Vec<MediaReference>, Vec<ItemMetadata>) {
        let items: Vec<ItemMetadata> = (1..=count)
            .map(|i| audio_item(&format!("{}-{}", prefix, i), &format!("Track {}", i), &[128, 160]))
            .collect();
        let references = items.iter().map(|item| item.reference.clone()).collect();
        (references, items)
    }
}
