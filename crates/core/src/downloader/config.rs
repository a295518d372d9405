//! Configuration for the downloader module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::platform::PlatformInfo;
use crate::sanitize::DEFAULT_MAX_LENGTH;

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Report `DestinationExists` for the item.
    #[default]
    Fail,
    /// Keep the existing file and continue with conversion.
    Skip,
    /// Replace the existing file.
    Overwrite,
}

/// Configuration for single-item and collection downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Destination directory. Defaults to `<app data>/downloads/<YYYY-MM-DD>`.
    #[serde(default)]
    pub destination: Option<PathBuf>,

    /// Convert downloads to the converter's target format.
    #[serde(default = "default_true")]
    pub convert: bool,

    #[serde(default)]
    pub overwrite: OverwritePolicy,

    /// Remove the downloaded file once conversion succeeded.
    #[serde(default)]
    pub delete_source_after_convert: bool,

    /// Maximum collection members downloaded at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Maximum length of a sanitized file stem, in UTF-16 code units.
    #[serde(default = "default_sanitize_max_length")]
    pub sanitize_max_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    4
}

fn default_sanitize_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination: None,
            convert: true,
            overwrite: OverwritePolicy::default(),
            delete_source_after_convert: false,
            max_concurrent_downloads: default_max_concurrent(),
            sanitize_max_length: default_sanitize_max_length(),
        }
    }
}

impl DownloadConfig {
    /// Destination directory for a run started on `today`.
    pub fn destination_dir(&self, platform: &PlatformInfo, today: NaiveDate) -> PathBuf {
        self.destination
            .clone()
            .unwrap_or_else(|| platform.default_download_dir(today))
    }

    /// Sets the collection concurrency ceiling.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max;
        self
    }

    /// Sets the overwrite policy.
    pub fn with_overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HostOs;

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert!(config.convert);
        assert_eq!(config.overwrite, OverwritePolicy::Fail);
        assert!(!config.delete_source_after_convert);
        assert_eq!(config.max_concurrent_downloads, 4);
        assert_eq!(config.sanitize_max_length, 255);
    }

    #[test]
    fn test_destination_dir() {
        let platform = PlatformInfo::new(HostOs::Linux, "/home/u/.lyra");
        let today = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

        let config = DownloadConfig::default();
        assert_eq!(
            config.destination_dir(&platform, today),
            PathBuf::from("/home/u/.lyra/downloads/2025-01-31")
        );

        let explicit = DownloadConfig {
            destination: Some(PathBuf::from("/music")),
            ..Default::default()
        };
        assert_eq!(
            explicit.destination_dir(&platform, today),
            PathBuf::from("/music")
        );
    }

    #[test]
    fn test_overwrite_policy_serde() {
        let config: DownloadConfig = toml::from_str("overwrite = \"skip\"").unwrap();
        assert_eq!(config.overwrite, OverwritePolicy::Skip);
    }
}
