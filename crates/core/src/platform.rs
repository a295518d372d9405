//! Host platform information.
//!
//! All OS-conditional decisions (executable names, per-user data location,
//! manual installation instructions, prebuilt toolchain flavour) live here so
//! the rest of the crate never branches on the target OS directly.

use chrono::NaiveDate;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl HostOs {
    /// Detects the OS this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

/// Platform facts consumed by the toolchain bootstrap and the downloader.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    os: HostOs,
    arch: String,
    app_data_dir: PathBuf,
}

impl PlatformInfo {
    /// Platform info for the running host.
    pub fn current() -> Self {
        let os = HostOs::current();
        Self {
            os,
            arch: std::env::consts::ARCH.to_string(),
            app_data_dir: default_app_data_dir(os),
        }
    }

    /// Platform info with an explicit OS and application data directory.
    pub fn new(os: HostOs, app_data_dir: impl Into<PathBuf>) -> Self {
        Self {
            os,
            arch: std::env::consts::ARCH.to_string(),
            app_data_dir: app_data_dir.into(),
        }
    }

    /// Overrides the CPU architecture (e.g. "x86_64", "aarch64").
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Overrides the application data directory.
    pub fn with_app_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.app_data_dir = dir.into();
        self
    }

    pub fn os(&self) -> HostOs {
        self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Suffix appended to executable names ("" or ".exe").
    pub fn executable_suffix(&self) -> &'static str {
        match self.os {
            HostOs::Windows => ".exe",
            _ => "",
        }
    }

    /// Full executable file name for `base` (e.g. "ffmpeg" -> "ffmpeg.exe").
    pub fn executable_name(&self, base: &str) -> String {
        format!("{}{}", base, self.executable_suffix())
    }

    /// Per-user application data directory.
    pub fn default_app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    /// Directory holding the application-managed ffmpeg installation.
    pub fn managed_toolchain_dir(&self) -> PathBuf {
        self.app_data_dir.join("ffmpeg")
    }

    /// Default download directory for a run started on `date`.
    pub fn default_download_dir(&self, date: NaiveDate) -> PathBuf {
        self.app_data_dir
            .join("downloads")
            .join(date.format("%Y-%m-%d").to_string())
    }

    /// Platform tag used by the ffbinaries prebuilt archives, if one exists
    /// for this host.
    pub fn distribution_tag(&self) -> Option<&'static str> {
        match (self.os, self.arch.as_str()) {
            (HostOs::Windows, "x86_64") => Some("win-64"),
            (HostOs::MacOs, "x86_64" | "aarch64") => Some("macos-64"),
            (HostOs::Linux, "x86_64") => Some("linux-64"),
            (HostOs::Linux, "aarch64") => Some("linux-arm-64"),
            _ => None,
        }
    }

    /// Human-readable instructions for installing ffmpeg by hand.
    pub fn install_guidance(&self) -> String {
        match self.os {
            HostOs::Windows => "Windows: download FFmpeg from https://ffmpeg.org/download.html, \
                 extract it and add the 'bin' folder to your system PATH."
                .to_string(),
            HostOs::MacOs => "macOS: install FFmpeg with Homebrew: brew install ffmpeg".to_string(),
            HostOs::Linux => "Linux: install FFmpeg with your package manager: \
                 sudo apt install ffmpeg (Debian/Ubuntu), \
                 sudo dnf install ffmpeg (Fedora), \
                 sudo pacman -S ffmpeg (Arch)."
                .to_string(),
            HostOs::Other => "Unknown OS: install FFmpeg manually from \
                 https://ffmpeg.org/download.html and make sure it is on your PATH."
                .to_string(),
        }
    }
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::current()
    }
}

fn default_app_data_dir(os: HostOs) -> PathBuf {
    let fallback = || {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("lyra")
    };

    match BaseDirs::new() {
        Some(dirs) => match os {
            HostOs::Windows => dirs.data_dir().join("LYRA"),
            HostOs::MacOs | HostOs::Linux => dirs.home_dir().join(".lyra"),
            HostOs::Other => fallback(),
        },
        None => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executable_names() {
        let win = PlatformInfo::new(HostOs::Windows, "/data");
        assert_eq!(win.executable_name("ffmpeg"), "ffmpeg.exe");

        let linux = PlatformInfo::new(HostOs::Linux, "/data");
        assert_eq!(linux.executable_name("ffprobe"), "ffprobe");
    }

    #[test]
    fn test_managed_dir_and_download_dir() {
        let info = PlatformInfo::new(HostOs::Linux, "/home/u/.lyra");
        assert_eq!(
            info.managed_toolchain_dir(),
            PathBuf::from("/home/u/.lyra/ffmpeg")
        );

        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            info.default_download_dir(date),
            PathBuf::from("/home/u/.lyra/downloads/2024-03-09")
        );
    }

    #[test]
    fn test_distribution_tag() {
        let linux = PlatformInfo::new(HostOs::Linux, "/d").with_arch("x86_64");
        assert_eq!(linux.distribution_tag(), Some("linux-64"));

        let arm = PlatformInfo::new(HostOs::Linux, "/d").with_arch("aarch64");
        assert_eq!(arm.distribution_tag(), Some("linux-arm-64"));

        let other = PlatformInfo::new(HostOs::Other, "/d");
        assert_eq!(other.distribution_tag(), None);
    }

    #[test]
    fn test_install_guidance_differs_per_os() {
        let win = PlatformInfo::new(HostOs::Windows, "/d").install_guidance();
        let mac = PlatformInfo::new(HostOs::MacOs, "/d").install_guidance();
        let linux = PlatformInfo::new(HostOs::Linux, "/d").install_guidance();

        assert!(win.contains("PATH"));
        assert!(mac.contains("brew install ffmpeg"));
        assert!(linux.contains("apt install ffmpeg"));
        assert_ne!(win, linux);
    }
}
