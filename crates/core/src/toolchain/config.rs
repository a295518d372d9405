//! Configuration for the toolchain module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for locating and installing ffmpeg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Explicit ffmpeg path; probed before anything else when set together
    /// with `ffprobe_path`.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit ffprobe path.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Application-managed install directory. Defaults to `<app data>/ffmpeg`.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Whether to look for ffmpeg on the system search path.
    #[serde(default = "default_true")]
    pub search_system_path: bool,

    /// Whether to download ffmpeg when it cannot be found.
    #[serde(default = "default_true")]
    pub auto_install: bool,

    /// Base URL of the prebuilt distribution releases.
    #[serde(default = "default_distribution_base_url")]
    pub distribution_base_url: String,

    /// Version of the prebuilt distribution to install.
    #[serde(default = "default_distribution_version")]
    pub distribution_version: String,

    /// Timeout for the `-version` health check in seconds.
    #[serde(default = "default_version_check_timeout")]
    pub version_check_timeout_secs: u64,

    /// Timeout for downloading one archive in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_distribution_base_url() -> String {
    "https://github.com/ffbinaries/ffbinaries-prebuilt/releases/download".to_string()
}

fn default_distribution_version() -> String {
    "6.1".to_string()
}

fn default_version_check_timeout() -> u64 {
    10
}

fn default_download_timeout() -> u64 {
    600
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            install_dir: None,
            search_system_path: true,
            auto_install: true,
            distribution_base_url: default_distribution_base_url(),
            distribution_version: default_distribution_version(),
            version_check_timeout_secs: default_version_check_timeout(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

impl ToolchainConfig {
    /// Sets the managed install directory.
    pub fn with_install_dir(mut self, dir: PathBuf) -> Self {
        self.install_dir = Some(dir);
        self
    }

    /// Enables or disables the system search path probe.
    pub fn with_system_path(mut self, enabled: bool) -> Self {
        self.search_system_path = enabled;
        self
    }

    /// Sets explicit ffmpeg/ffprobe paths.
    pub fn with_paths(mut self, ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        self.ffmpeg_path = Some(ffmpeg_path);
        self.ffprobe_path = Some(ffprobe_path);
        self
    }
}
