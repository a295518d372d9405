//! Content module: access to the remote media-hosting service.
//!
//! The orchestration layer treats the service as a capability described by
//! the [`ContentClient`] trait:
//!
//! - `resolve_item`: title and available streams of one item
//! - `resolve_collection_members`: member items of a playlist
//! - `transfer_stream`: stream the bytes of one variant to disk
//!
//! [`YtDlpClient`] implements the capability on top of the `yt-dlp`
//! executable. Collection membership can alternatively be scraped from the
//! playlist page through [`CollectionResolver::PageScrapeBased`].
//!
//! # Example
//!
//! ```ignore
//! use lyra_core::content::{ContentClient, MediaReference, YtDlpClient};
//!
//! let client = YtDlpClient::with_defaults()?;
//! let item = client
//!     .resolve_item(&MediaReference::from("https://www.youtube.com/watch?v=WBqf-vSMA6k"))
//!     .await?;
//! println!("{} has {} streams", item.title, item.streams.len());
//! ```

mod config;
mod error;
mod resolver;
mod traits;
mod types;
mod ytdlp;

pub use config::{CollectionStrategy, ContentConfig};
pub use error::ContentError;
pub use resolver::{scrape_member_ids, CollectionResolver, HttpPageFetcher};
pub use traits::{ContentClient, PageFetcher};
pub use types::{ItemMetadata, MediaReference, StreamDescriptor};
pub use ytdlp::{YtDlpClient, WATCH_URL_PREFIX};
