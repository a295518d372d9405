//! Downloader module: item downloads and collection fan-out.
//!
//! For one item, [`DownloadOrchestrator::download_item`] runs strictly in
//! order:
//!
//! 1. resolve the reference to a title and its streams
//! 2. pick the best audio-only stream ([`select_stream`])
//! 3. transfer it to `<dest>/<sanitized title>.<container>`
//! 4. optionally convert it to the target audio format
//!
//! [`DownloadOrchestrator::download_collection`] resolves a playlist and runs
//! the item flow for every member concurrently, aggregating the per-member
//! results into a [`CollectionOutcome`].
//!
//! # Example
//!
//! ```ignore
//! use lyra_core::downloader::{DownloadConfig, DownloadOrchestrator};
//!
//! let orchestrator = DownloadOrchestrator::new(client, converter, DownloadConfig::default());
//! let outcome = orchestrator
//!     .download_collection(&playlist, Path::new("/music"), true)
//!     .await?;
//! println!("{} ok, {} failed", outcome.success_count(), outcome.failure_count());
//! ```

mod collection;
mod config;
mod error;
mod orchestrator;
mod select;
mod types;

pub use config::{DownloadConfig, OverwritePolicy};
pub use error::{DownloadError, DownloadStage};
pub use orchestrator::DownloadOrchestrator;
pub use select::select_stream;
pub use types::{
    CollectionOutcome, DownloadTask, ItemFailure, ItemOutcome, ItemSuccess,
};
