//! Error types for the downloader module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::converter::ConverterError;
use crate::sanitize::SanitizeError;

/// Step of an item download a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStage {
    /// Metadata or collection membership lookup.
    Resolve,
    /// Stream selection.
    Select,
    /// File name and destination preparation.
    Prepare,
    Transfer,
    Convert,
}

impl fmt::Display for DownloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Select => "select",
            Self::Prepare => "prepare",
            Self::Transfer => "transfer",
            Self::Convert => "convert",
        })
    }
}

/// Errors raised by the download orchestrator.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The title could not be turned into a file name.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Item metadata could not be resolved.
    #[error("Failed to resolve {reference}: {reason}")]
    ResolutionFailed { reference: String, reason: String },

    /// The item offers no audio-only stream.
    #[error("No audio-only stream available for {reference}")]
    NoStreamAvailable { reference: String },

    /// The destination file exists and the overwrite policy is `Fail`.
    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Stream transfer failed.
    #[error("Transfer failed for {reference}: {reason}")]
    TransferFailed { reference: String, reason: String },

    /// ffmpeg could not be located or installed.
    #[error("FFmpeg is unavailable: {reason}")]
    ToolchainUnavailable {
        reason: String,
        guidance: Option<String>,
    },

    /// ffmpeg ran but the conversion failed.
    #[error("Conversion failed for {reference}: {reason}")]
    ConversionFailed { reference: String, reason: String },

    /// Collection membership could not be resolved.
    #[error("Failed to resolve collection {reference}: {reason}")]
    CollectionResolutionFailed { reference: String, reason: String },

    /// The collection has no members.
    #[error("Collection {reference} is empty")]
    EmptyCollection { reference: String },

    /// The cancellation token fired while `stage` was running.
    #[error("Download cancelled during {stage}")]
    Cancelled { stage: DownloadStage },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Stage this error belongs to.
    pub fn stage(&self) -> DownloadStage {
        match self {
            Self::ResolutionFailed { .. }
            | Self::CollectionResolutionFailed { .. }
            | Self::EmptyCollection { .. } => DownloadStage::Resolve,
            Self::NoStreamAvailable { .. } => DownloadStage::Select,
            Self::InvalidArgument(_) | Self::DestinationExists { .. } => DownloadStage::Prepare,
            Self::TransferFailed { .. } | Self::Io(_) => DownloadStage::Transfer,
            Self::Cancelled { stage } => *stage,
            Self::ToolchainUnavailable { .. } | Self::ConversionFailed { .. } => {
                DownloadStage::Convert
            }
        }
    }

    /// Manual ffmpeg installation instructions, for toolchain failures.
    pub fn guidance(&self) -> Option<&str> {
        match self {
            Self::ToolchainUnavailable { guidance, .. } => guidance.as_deref(),
            _ => None,
        }
    }

    /// Maps a converter error for the item identified by `reference`.
    pub fn from_converter(reference: impl ToString, error: ConverterError) -> Self {
        match error {
            ConverterError::ToolchainUnavailable(e) => Self::ToolchainUnavailable {
                guidance: e.guidance().map(str::to_string),
                reason: e.to_string(),
            },
            ConverterError::Cancelled => Self::Cancelled {
                stage: DownloadStage::Convert,
            },
            other => Self::ConversionFailed {
                reference: reference.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<SanitizeError> for DownloadError {
    fn from(e: SanitizeError) -> Self {
        match e {
            SanitizeError::InvalidArgument(reason) => Self::InvalidArgument(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::ToolchainError;

    #[test]
    fn test_stage_mapping() {
        assert_eq!(
            DownloadError::NoStreamAvailable {
                reference: "x".to_string()
            }
            .stage(),
            DownloadStage::Select
        );
        assert_eq!(
            DownloadError::InvalidArgument("empty".to_string()).stage(),
            DownloadStage::Prepare
        );
        assert_eq!(DownloadStage::Transfer.to_string(), "transfer");
    }

    #[test]
    fn test_from_converter_keeps_guidance() {
        let err = DownloadError::from_converter(
            "ref",
            ConverterError::ToolchainUnavailable(ToolchainError::Unavailable {
                reason: "offline".to_string(),
                guidance: "sudo apt install ffmpeg".to_string(),
            }),
        );
        assert!(matches!(err, DownloadError::ToolchainUnavailable { .. }));
        assert_eq!(err.guidance(), Some("sudo apt install ffmpeg"));
        assert_eq!(err.stage(), DownloadStage::Convert);

        let failed = DownloadError::from_converter(
            "ref",
            ConverterError::conversion_failed("exit 1", None),
        );
        assert!(matches!(failed, DownloadError::ConversionFailed { .. }));

        let cancelled = DownloadError::from_converter("ref", ConverterError::Cancelled);
        assert_eq!(cancelled.stage(), DownloadStage::Convert);
    }
}
