//! Error types for the toolchain module.

use thiserror::Error;

/// Errors raised while locating or installing ffmpeg.
///
/// The type is `Clone` because the bootstrap memoizes its outcome and hands
/// the same error to every later caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolchainError {
    /// No prebuilt distribution exists for this host.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Fetching the distribution failed.
    #[error("Failed to download FFmpeg: {0}")]
    Download(String),

    /// Unpacking the distribution failed.
    #[error("Failed to extract FFmpeg archive: {0}")]
    Extract(String),

    /// The install finished but the executables are missing.
    #[error("FFmpeg executables missing after install: {0}")]
    Verification(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Terminal state: ffmpeg cannot be used in this process.
    #[error("FFmpeg is unavailable ({reason}). Manual installation: {guidance}")]
    Unavailable { reason: String, guidance: String },
}

impl ToolchainError {
    /// Manual installation instructions, when this is the terminal error.
    pub fn guidance(&self) -> Option<&str> {
        match self {
            Self::Unavailable { guidance, .. } => Some(guidance),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ToolchainError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<reqwest::Error> for ToolchainError {
    fn from(e: reqwest::Error) -> Self {
        Self::Download(e.to_string())
    }
}
