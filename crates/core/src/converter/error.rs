//! Errors raised while transcoding a download.

use std::path::PathBuf;
use thiserror::Error;

use crate::toolchain::ToolchainError;

/// Why a transcode did not produce an output file.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// ffmpeg could not be located or installed. Nothing was spawned.
    #[error("FFmpeg toolchain unavailable: {0}")]
    ToolchainUnavailable(#[from] ToolchainError),

    #[error("Downloaded file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// ffmpeg could not be started or exited unsuccessfully. `stderr` holds
    /// the error lines it printed, if any.
    #[error("Audio conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("Audio conversion exceeded {timeout_secs}s and was killed")]
    Timeout { timeout_secs: u64 },

    /// ffprobe could not read the file.
    #[error("Media probe failed: {reason}")]
    ProbeFailed { reason: String },

    #[error("I/O error during conversion: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio conversion cancelled")]
    Cancelled,
}

impl ConverterError {
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Manual installation instructions when ffmpeg is unavailable.
    pub fn guidance(&self) -> Option<&str> {
        match self {
            Self::ToolchainUnavailable(e) => e.guidance(),
            _ => None,
        }
    }

    /// Timeouts and I/O hiccups may succeed on a second attempt; a missing
    /// toolchain or a rejected input will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
