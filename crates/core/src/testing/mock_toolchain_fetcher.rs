//! Mock toolchain fetcher for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::platform::PlatformInfo;
use crate::toolchain::{ToolchainError, ToolchainFetcher};

/// Mock implementation of the ToolchainFetcher trait.
///
/// By default a fetch writes placeholder `ffmpeg`/`ffprobe` files (with the
/// platform's executable suffix) into the install directory. Clones share
/// the fetch counter.
///
/// # Example
///
/// ```rust,ignore
/// use lyra_core::testing::MockToolchainFetcher;
///
/// let fetcher = MockToolchainFetcher::new().with_delay(Duration::from_millis(50));
/// let bootstrap = ToolchainBootstrap::new(config, platform, Arc::new(fetcher.clone()));
/// bootstrap.ensure().await?;
/// assert_eq!(fetcher.fetch_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockToolchainFetcher {
    fetches: Arc<AtomicUsize>,
    error: Option<ToolchainError>,
    delay: Duration,
    skip_files: bool,
}

impl MockToolchainFetcher {
    /// Create a fetcher that succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every fetch with `error`.
    pub fn with_error(mut self, error: ToolchainError) -> Self {
        self.error = Some(error);
        self
    }

    /// Sleep for `delay` before completing each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report success without writing any executable.
    pub fn without_files(mut self) -> Self {
        self.skip_files = true;
        self
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolchainFetcher for MockToolchainFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        install_dir: &Path,
        platform: &PlatformInfo,
    ) -> Result<(), ToolchainError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        if self.skip_files {
            return Ok(());
        }

        tokio::fs::create_dir_all(install_dir).await?;
        for binary in ["ffmpeg", "ffprobe"] {
            tokio::fs::write(install_dir.join(platform.executable_name(binary)), b"mock").await?;
        }
        Ok(())
    }
}
