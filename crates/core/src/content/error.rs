//! Error types for the content module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a content client or a collection resolver.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Item or collection metadata could not be resolved.
    #[error("Failed to resolve {reference}: {reason}")]
    Resolution { reference: String, reason: String },

    /// Binary transfer of a stream failed.
    #[error("Transfer failed: {reason}")]
    Transfer { reason: String },

    /// The helper executable backing the client is missing.
    #[error("Content tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// Output of the service or helper tool could not be parsed.
    #[error("Failed to parse content metadata: {reason}")]
    Parse { reason: String },

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContentError {
    /// Creates a resolution error for `reference`.
    pub fn resolution(reference: impl ToString, reason: impl Into<String>) -> Self {
        Self::Resolution {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a transfer error.
    pub fn transfer(reason: impl Into<String>) -> Self {
        Self::Transfer {
            reason: reason.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}
