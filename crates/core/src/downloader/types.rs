//! Types for the downloader module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::error::{DownloadError, DownloadStage};
use crate::content::MediaReference;

/// Unit of work for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub reference: MediaReference,
    /// Directory the file is written to; created if absent.
    pub dest_dir: PathBuf,
    /// Whether to convert after the transfer.
    pub convert: bool,
}

impl DownloadTask {
    pub fn new(reference: MediaReference, dest_dir: impl Into<PathBuf>, convert: bool) -> Self {
        Self {
            reference,
            dest_dir: dest_dir.into(),
            convert,
        }
    }
}

/// Why one item failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub reference: MediaReference,
    pub stage: DownloadStage,
    pub reason: String,
    /// Manual ffmpeg installation instructions when the toolchain is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    /// Set when the cancellation token stopped the item.
    #[serde(default)]
    pub cancelled: bool,
}

impl ItemFailure {
    pub fn from_error(reference: MediaReference, error: &DownloadError) -> Self {
        Self {
            reference,
            stage: error.stage(),
            reason: error.to_string(),
            guidance: error.guidance().map(str::to_string),
            cancelled: matches!(error, DownloadError::Cancelled { .. }),
        }
    }

    /// Whether the failure came from the cancellation token.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Result of one item download. Never an error: failures are data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed {
        reference: MediaReference,
        /// Final file (converted output when conversion ran).
        path: PathBuf,
    },
    Failed(ItemFailure),
}

impl ItemOutcome {
    pub fn reference(&self) -> &MediaReference {
        match self {
            Self::Completed { reference, .. } => reference,
            Self::Failed(failure) => &failure.reference,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Completed { path, .. } => Some(path),
            Self::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A successfully downloaded collection member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSuccess {
    pub reference: MediaReference,
    pub path: PathBuf,
}

/// Aggregated result of a collection download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOutcome {
    /// Number of distinct members the collection resolved to.
    pub member_count: usize,
    /// Successful members, in collection order.
    pub successes: Vec<ItemSuccess>,
    /// Failed members keyed by reference.
    pub failures: BTreeMap<MediaReference, ItemFailure>,
}

impl CollectionOutcome {
    pub fn new(member_count: usize) -> Self {
        Self {
            member_count,
            ..Default::default()
        }
    }

    /// Adds one item result.
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Completed { reference, path } => {
                self.successes.push(ItemSuccess { reference, path })
            }
            ItemOutcome::Failed(failure) => {
                self.failures.insert(failure.reference.clone(), failure);
            }
        }
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// True when every member succeeded (an empty collection included).
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// References worth retrying.
    pub fn failed_references(&self) -> Vec<MediaReference> {
        self.failures.keys().cloned().collect()
    }

    /// Installation guidance, if any member failed because ffmpeg is missing.
    pub fn toolchain_guidance(&self) -> Option<&str> {
        self.failures.values().find_map(|f| f.guidance.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(reference: &str, error: DownloadError) -> ItemOutcome {
        ItemOutcome::Failed(ItemFailure::from_error(MediaReference::from(reference), &error))
    }

    #[test]
    fn test_collection_outcome_aggregation() {
        let mut outcome = CollectionOutcome::new(3);
        outcome.record(ItemOutcome::Completed {
            reference: MediaReference::from("a"),
            path: PathBuf::from("/d/a.mp3"),
        });
        outcome.record(failed(
            "b",
            DownloadError::TransferFailed {
                reference: "b".to_string(),
                reason: "reset".to_string(),
            },
        ));
        outcome.record(ItemOutcome::Completed {
            reference: MediaReference::from("c"),
            path: PathBuf::from("/d/c.mp3"),
        });

        assert_eq!(outcome.success_count(), 2);
        assert_eq!(outcome.failure_count(), 1);
        assert!(!outcome.is_complete_success());
        assert_eq!(outcome.failed_references(), vec![MediaReference::from("b")]);

        let failure = &outcome.failures[&MediaReference::from("b")];
        assert_eq!(failure.stage, DownloadStage::Transfer);
        assert!(outcome.toolchain_guidance().is_none());
    }

    #[test]
    fn test_failure_carries_guidance() {
        let outcome = failed(
            "x",
            DownloadError::ToolchainUnavailable {
                reason: "offline".to_string(),
                guidance: Some("brew install ffmpeg".to_string()),
            },
        );
        let mut collection = CollectionOutcome::new(1);
        collection.record(outcome);
        assert_eq!(collection.toolchain_guidance(), Some("brew install ffmpeg"));
    }

    #[test]
    fn test_cancelled_failure() {
        let outcome = failed(
            "x",
            DownloadError::Cancelled {
                stage: DownloadStage::Convert,
            },
        );
        match outcome {
            ItemOutcome::Failed(f) => {
                assert!(f.is_cancelled());
                assert_eq!(f.stage, DownloadStage::Convert);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cancellation_is_not_inferred_from_reason_text() {
        let outcome = failed(
            "x",
            DownloadError::TransferFailed {
                reference: "x".to_string(),
                reason: "Download cancelled during transfer".to_string(),
            },
        );
        match outcome {
            ItemOutcome::Failed(f) => assert!(!f.is_cancelled()),
            _ => unreachable!(),
        }
    }
}
