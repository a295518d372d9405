use serde::{Deserialize, Serialize};

use crate::content::ContentConfig;
use crate::converter::ConverterConfig;
use crate::downloader::DownloadConfig;
use crate::toolchain::ToolchainConfig;

/// Root configuration
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub content: ContentConfig,
}
