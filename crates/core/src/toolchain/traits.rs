//! Trait definitions for the toolchain module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ToolchainError;
use crate::platform::PlatformInfo;

/// Installs a known-good ffmpeg distribution into a directory.
#[async_trait]
pub trait ToolchainFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Places `ffmpeg` and `ffprobe` executables (with the platform's
    /// executable suffix) directly inside `install_dir`.
    async fn fetch(&self, install_dir: &Path, platform: &PlatformInfo)
        -> Result<(), ToolchainError>;
}
