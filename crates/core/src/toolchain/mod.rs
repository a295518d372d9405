//! Toolchain module: guarantees ffmpeg and ffprobe are present.
//!
//! [`ToolchainBootstrap`] walks through these states once per process:
//!
//! - probe configured paths, the system search path, then the
//!   application-managed directory
//! - if nothing is found, install a prebuilt distribution through a
//!   [`ToolchainFetcher`] into the managed directory
//! - memoize the outcome; an unavailable toolchain stays unavailable
//!
//! Concurrent first callers share a single initialization.

mod bootstrap;
mod config;
mod error;
mod fetcher;
mod traits;
mod types;

pub use bootstrap::ToolchainBootstrap;
pub use config::ToolchainConfig;
pub use error::ToolchainError;
pub use fetcher::HttpToolchainFetcher;
pub use traits::ToolchainFetcher;
pub use types::{ToolchainLocation, ToolchainSource, ToolchainState};
