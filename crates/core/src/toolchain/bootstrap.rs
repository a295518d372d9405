//! Single-flight, memoized discovery and installation of ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use super::config::ToolchainConfig;
use super::error::ToolchainError;
use super::fetcher::HttpToolchainFetcher;
use super::traits::ToolchainFetcher;
use super::types::{ToolchainLocation, ToolchainSource, ToolchainState};
use crate::platform::PlatformInfo;

/// Process-scoped owner of the ffmpeg installation.
///
/// The first call to [`ensure`](Self::ensure) probes for an existing
/// installation and, failing that, downloads one. Concurrent first callers
/// share that single initialization; every later caller receives the
/// memoized outcome, including a terminal [`ToolchainError::Unavailable`].
pub struct ToolchainBootstrap {
    config: ToolchainConfig,
    platform: PlatformInfo,
    fetcher: Arc<dyn ToolchainFetcher>,
    resolved: OnceCell<Result<ToolchainLocation, ToolchainError>>,
    state: RwLock<ToolchainState>,
}

impl ToolchainBootstrap {
    pub fn new(
        config: ToolchainConfig,
        platform: PlatformInfo,
        fetcher: Arc<dyn ToolchainFetcher>,
    ) -> Self {
        Self {
            config,
            platform,
            fetcher,
            resolved: OnceCell::new(),
            state: RwLock::new(ToolchainState::Unchecked),
        }
    }

    /// Bootstrap for the running host using the HTTP distribution fetcher.
    pub fn with_defaults(config: ToolchainConfig) -> Result<Self, ToolchainError> {
        let fetcher = HttpToolchainFetcher::new(&config)?;
        Ok(Self::new(config, PlatformInfo::current(), Arc::new(fetcher)))
    }

    /// Returns the ffmpeg installation, locating or installing it on first use.
    pub async fn ensure(&self) -> Result<ToolchainLocation, ToolchainError> {
        self.resolved
            .get_or_init(|| self.initialize())
            .await
            .clone()
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ToolchainState {
        *self.state.read().await
    }

    /// Memoized location, if initialization already succeeded.
    pub fn location(&self) -> Option<&ToolchainLocation> {
        self.resolved.get().and_then(|r| r.as_ref().ok())
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    /// Directory the managed installation lives in.
    pub fn install_dir(&self) -> PathBuf {
        self.config
            .install_dir
            .clone()
            .unwrap_or_else(|| self.platform.managed_toolchain_dir())
    }

    async fn set_state(&self, state: ToolchainState) {
        *self.state.write().await = state;
    }

    async fn initialize(&self) -> Result<ToolchainLocation, ToolchainError> {
        self.set_state(ToolchainState::Probing).await;

        if let Some(location) = self.probe().await {
            info!(
                ffmpeg = %location.ffmpeg.display(),
                source = ?location.source,
                "FFmpeg available"
            );
            self.set_state(ToolchainState::Available).await;
            return Ok(location);
        }

        let result = if self.config.auto_install {
            self.set_state(ToolchainState::Downloading).await;
            self.install().await
        } else {
            Err(ToolchainError::Verification(
                "not found and automatic installation is disabled".to_string(),
            ))
        };

        match result {
            Ok(location) => {
                info!(
                    ffmpeg = %location.ffmpeg.display(),
                    fetcher = self.fetcher.name(),
                    "FFmpeg installed"
                );
                self.set_state(ToolchainState::Available).await;
                Ok(location)
            }
            Err(e) => {
                let guidance = self.platform.install_guidance();
                error!(error = %e, guidance = %guidance, "FFmpeg is unavailable");
                self.set_state(ToolchainState::Unavailable).await;
                Err(ToolchainError::Unavailable {
                    reason: e.to_string(),
                    guidance,
                })
            }
        }
    }

    /// Runs the probes in order: configured paths, system search path,
    /// managed directory.
    async fn probe(&self) -> Option<ToolchainLocation> {
        if let Some(location) = self.probe_configured().await {
            return Some(location);
        }

        if self.config.search_system_path {
            if let Some(location) = self.probe_system_path().await {
                return Some(location);
            }
        }

        self.probe_managed()
    }

    async fn probe_configured(&self) -> Option<ToolchainLocation> {
        let ffmpeg = self.config.ffmpeg_path.clone()?;
        let ffprobe = match &self.config.ffprobe_path {
            Some(path) => path.clone(),
            None => ffmpeg
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(self.platform.executable_name("ffprobe")),
        };

        let location = ToolchainLocation {
            ffmpeg,
            ffprobe,
            source: ToolchainSource::Configured,
        };

        if location.exists() && self.responds_to_version(&location.ffmpeg).await {
            Some(location)
        } else {
            warn!(
                ffmpeg = %location.ffmpeg.display(),
                ffprobe = %location.ffprobe.display(),
                "Configured FFmpeg paths are not usable"
            );
            None
        }
    }

    async fn probe_system_path(&self) -> Option<ToolchainLocation> {
        let ffmpeg = which::which("ffmpeg").ok()?;
        let ffprobe = match which::which("ffprobe") {
            Ok(path) => path,
            Err(_) => {
                debug!(ffmpeg = %ffmpeg.display(), "ffprobe not on PATH");
                return None;
            }
        };

        if ffmpeg.parent() != ffprobe.parent() {
            debug!(
                ffmpeg = %ffmpeg.display(),
                ffprobe = %ffprobe.display(),
                "ffmpeg and ffprobe on PATH belong to different installations"
            );
            return None;
        }

        if !self.responds_to_version(&ffmpeg).await || !self.responds_to_version(&ffprobe).await {
            return None;
        }

        Some(ToolchainLocation {
            ffmpeg,
            ffprobe,
            source: ToolchainSource::SystemPath,
        })
    }

    fn probe_managed(&self) -> Option<ToolchainLocation> {
        let location = self.managed_location(ToolchainSource::Managed);
        if location.exists() {
            Some(location)
        } else {
            debug!(dir = %self.install_dir().display(), "No managed FFmpeg installation");
            None
        }
    }

    async fn install(&self) -> Result<ToolchainLocation, ToolchainError> {
        let dir = self.install_dir();
        info!(
            dir = %dir.display(),
            fetcher = self.fetcher.name(),
            "FFmpeg not found, installing"
        );

        self.fetcher.fetch(&dir, &self.platform).await?;

        let location = self.managed_location(ToolchainSource::Downloaded);
        if location.exists() {
            Ok(location)
        } else {
            Err(ToolchainError::Verification(dir.display().to_string()))
        }
    }

    fn managed_location(&self, source: ToolchainSource) -> ToolchainLocation {
        ToolchainLocation::in_dir(
            &self.install_dir(),
            &self.platform.executable_name("ffmpeg"),
            &self.platform.executable_name("ffprobe"),
            source,
        )
    }

    /// Runs `<binary> -version` and reports whether it exited cleanly.
    async fn responds_to_version(&self, binary: &Path) -> bool {
        let mut cmd = Command::new(binary);
        cmd.arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let limit = Duration::from_secs(self.config.version_check_timeout_secs);
        match timeout(limit, cmd.status()).await {
            Ok(Ok(status)) if status.success() => true,
            Ok(Ok(status)) => {
                debug!(binary = %binary.display(), code = ?status.code(), "Version check failed");
                false
            }
            Ok(Err(e)) => {
                debug!(binary = %binary.display(), error = %e, "Version check could not run");
                false
            }
            Err(_) => {
                warn!(binary = %binary.display(), "Version check timed out");
                false
            }
        }
    }
}

impl std::fmt::Debug for ToolchainBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolchainBootstrap")
            .field("install_dir", &self.install_dir())
            .field("fetcher", &self.fetcher.name())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HostOs;
    use crate::testing::MockToolchainFetcher;
    use std::fs;
    use tempfile::TempDir;

    fn isolated_config(dir: &Path) -> ToolchainConfig {
        ToolchainConfig::default()
            .with_install_dir(dir.join("ffmpeg"))
            .with_system_path(false)
    }

    fn linux(dir: &Path) -> PlatformInfo {
        PlatformInfo::new(HostOs::Linux, dir)
    }

    #[tokio::test]
    async fn test_managed_install_found_without_fetch() {
        let dir = TempDir::new().unwrap();
        let managed = dir.path().join("ffmpeg");
        fs::create_dir_all(&managed).unwrap();
        fs::write(managed.join("ffmpeg"), b"bin").unwrap();
        fs::write(managed.join("ffprobe"), b"bin").unwrap();

        let fetcher = Arc::new(MockToolchainFetcher::new());
        let bootstrap =
            ToolchainBootstrap::new(isolated_config(dir.path()), linux(dir.path()), fetcher.clone());

        let location = bootstrap.ensure().await.unwrap();
        assert_eq!(location.source, ToolchainSource::Managed);
        assert_eq!(location.ffmpeg, managed.join("ffmpeg"));
        assert_eq!(fetcher.fetch_count(), 0);
        assert_eq!(bootstrap.state().await, ToolchainState::Available);
    }

    #[tokio::test]
    async fn test_missing_install_is_downloaded() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockToolchainFetcher::new());
        let bootstrap =
            ToolchainBootstrap::new(isolated_config(dir.path()), linux(dir.path()), fetcher.clone());

        assert_eq!(bootstrap.state().await, ToolchainState::Unchecked);
        let location = bootstrap.ensure().await.unwrap();

        assert_eq!(location.source, ToolchainSource::Downloaded);
        assert!(location.exists());
        assert_eq!(fetcher.fetch_count(), 1);
        assert_eq!(bootstrap.location(), Some(&location));

        // Memoized: no second fetch.
        bootstrap.ensure().await.unwrap();
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_terminal() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(
            MockToolchainFetcher::new()
                .with_error(ToolchainError::Download("connection refused".to_string())),
        );
        let bootstrap =
            ToolchainBootstrap::new(isolated_config(dir.path()), linux(dir.path()), fetcher.clone());

        let first = bootstrap.ensure().await.unwrap_err();
        match &first {
            ToolchainError::Unavailable { reason, guidance } => {
                assert!(reason.contains("connection refused"));
                assert!(guidance.contains("apt install ffmpeg"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(bootstrap.state().await, ToolchainState::Unavailable);

        let second = bootstrap.ensure().await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(fetcher.fetch_count(), 1);
        assert!(bootstrap.location().is_none());
    }

    #[tokio::test]
    async fn test_fetch_without_files_fails_verification() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockToolchainFetcher::new().without_files());
        let bootstrap =
            ToolchainBootstrap::new(isolated_config(dir.path()), linux(dir.path()), fetcher);

        let err = bootstrap.ensure().await.unwrap_err();
        assert!(err.guidance().is_some());
        assert!(err.to_string().contains("missing after install"));
    }

    #[tokio::test]
    async fn test_auto_install_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = isolated_config(dir.path());
        config.auto_install = false;
        let fetcher = Arc::new(MockToolchainFetcher::new());
        let bootstrap = ToolchainBootstrap::new(config, linux(dir.path()), fetcher.clone());

        assert!(bootstrap.ensure().await.is_err());
        assert_eq!(fetcher.fetch_count(), 0);
        assert_eq!(bootstrap.state().await, ToolchainState::Unavailable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_configured_paths_probed_first() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("custom");
        fs::create_dir_all(&custom).unwrap();
        for name in ["ffmpeg", "ffprobe"] {
            let path = custom.join(name);
            fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let config = isolated_config(dir.path())
            .with_paths(custom.join("ffmpeg"), custom.join("ffprobe"));
        let fetcher = Arc::new(MockToolchainFetcher::new());
        let bootstrap = ToolchainBootstrap::new(config, linux(dir.path()), fetcher.clone());

        let location = bootstrap.ensure().await.unwrap();
        assert_eq!(location.source, ToolchainSource::Configured);
        assert_eq!(location.ffmpeg, custom.join("ffmpeg"));
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[test]
    fn test_install_dir_defaults_to_managed_dir() {
        let dir = TempDir::new().unwrap();
        let bootstrap = ToolchainBootstrap::new(
            ToolchainConfig::default(),
            linux(dir.path()),
            Arc::new(MockToolchainFetcher::new()),
        );
        assert_eq!(bootstrap.install_dir(), dir.path().join("ffmpeg"));
    }
}
