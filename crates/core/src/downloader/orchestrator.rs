//! Single-item download: resolve, select, transfer, convert.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::{DownloadConfig, OverwritePolicy};
use super::error::{DownloadError, DownloadStage};
use super::select::select_stream;
use super::types::{DownloadTask, ItemFailure, ItemOutcome};
use crate::content::{CollectionResolver, ContentClient, MediaReference};
use crate::converter::{Converter, ConverterError};
use crate::sanitize::sanitize;

/// Drives item and collection downloads.
///
/// Cheap to clone: every collaborator is shared, and clones observe the same
/// cancellation token.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    pub(super) client: Arc<dyn ContentClient>,
    pub(super) converter: Arc<dyn Converter>,
    pub(super) resolver: CollectionResolver,
    pub(super) config: DownloadConfig,
    pub(super) cancel: CancellationToken,
    claims: ClaimSet,
}

impl DownloadOrchestrator {
    pub fn new(
        client: Arc<dyn ContentClient>,
        converter: Arc<dyn Converter>,
        config: DownloadConfig,
    ) -> Self {
        Self {
            client,
            converter,
            resolver: CollectionResolver::default(),
            config,
            cancel: CancellationToken::new(),
            claims: ClaimSet::default(),
        }
    }

    /// Uses `resolver` for collection membership.
    pub fn with_resolver(mut self, resolver: CollectionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Uses `token` for cancellation instead of a private one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Downloads one item into `dest_dir` and optionally converts it.
    ///
    /// Returns the final file: the converted output when `convert` is set,
    /// otherwise `<dest_dir>/<sanitized title>.<container>`.
    pub async fn download_item(
        &self,
        reference: &MediaReference,
        dest_dir: &Path,
        convert: bool,
    ) -> Result<PathBuf, DownloadError> {
        if self.cancel.is_cancelled() {
            return Err(DownloadError::Cancelled {
                stage: DownloadStage::Resolve,
            });
        }
        if convert {
            self.ensure_converter(reference).await?;
        }

        let metadata = self
            .cancellable(self.client.resolve_item(reference), DownloadStage::Resolve)
            .await?
            .map_err(|e| DownloadError::ResolutionFailed {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;

        let stream =
            select_stream(&metadata.streams).ok_or_else(|| DownloadError::NoStreamAvailable {
                reference: reference.to_string(),
            })?;
        debug!(
            reference = %reference,
            stream = %stream.id,
            bitrate_kbps = stream.bitrate_kbps,
            container = %stream.container,
            "Selected stream"
        );

        let name = sanitize(&metadata.title, self.config.sanitize_max_length)?;
        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(name.with_extension(&stream.container));

        // Keyed by stem so the source and its converted output are both covered.
        let _claim = DestinationClaim::acquire(&self.claims, dest_dir.join(name.as_str()))
            .ok_or_else(|| DownloadError::DestinationExists { path: path.clone() })?;

        let transfer = match self.config.overwrite {
            OverwritePolicy::Fail => {
                match tokio::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await
                {
                    Ok(_) => true,
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        return Err(DownloadError::DestinationExists { path })
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            OverwritePolicy::Skip if path.exists() => {
                info!(reference = %reference, path = %path.display(), "Destination exists, skipping transfer");
                false
            }
            OverwritePolicy::Skip | OverwritePolicy::Overwrite => true,
        };

        if transfer {
            info!(reference = %reference, path = %path.display(), "Downloading");
            let result = self
                .cancellable(
                    self.client.transfer_stream(stream, &path),
                    DownloadStage::Transfer,
                )
                .await;
            match result {
                Ok(Ok(bytes)) => {
                    info!(reference = %reference, bytes, path = %path.display(), "Download complete")
                }
                Ok(Err(e)) => {
                    remove_partial(&path).await;
                    return Err(DownloadError::TransferFailed {
                        reference: reference.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(cancelled) => {
                    remove_partial(&path).await;
                    return Err(cancelled);
                }
            }
        }

        if !convert {
            return Ok(path);
        }

        let output = match self
            .cancellable(self.converter.convert(&path), DownloadStage::Convert)
            .await
        {
            Ok(Ok(result)) => result.output_path,
            Ok(Err(e)) => return Err(DownloadError::from_converter(reference, e)),
            Err(cancelled) => {
                remove_partial(&self.converter.output_path_for(&path)).await;
                return Err(cancelled);
            }
        };

        if self.config.delete_source_after_convert && output != path {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to delete source after conversion");
            }
        }

        Ok(output)
    }

    /// Downloads one item, turning every failure into an [`ItemOutcome`].
    pub async fn download_item_outcome(
        &self,
        reference: &MediaReference,
        dest_dir: &Path,
        convert: bool,
    ) -> ItemOutcome {
        match self.download_item(reference, dest_dir, convert).await {
            Ok(path) => ItemOutcome::Completed {
                reference: reference.clone(),
                path,
            },
            Err(e) => {
                match &e {
                    DownloadError::ToolchainUnavailable { .. } => {
                        error!(reference = %reference, stage = %e.stage(), error = %e, "Item download failed")
                    }
                    DownloadError::Cancelled { stage } => {
                        info!(reference = %reference, stage = %stage, "Item download cancelled")
                    }
                    _ => {
                        warn!(reference = %reference, stage = %e.stage(), error = %e, "Item download failed")
                    }
                }
                ItemOutcome::Failed(ItemFailure::from_error(reference.clone(), &e))
            }
        }
    }

    /// Runs a [`DownloadTask`].
    pub async fn run_task(&self, task: DownloadTask) -> ItemOutcome {
        self.download_item_outcome(&task.reference, &task.dest_dir, task.convert)
            .await
    }

    /// Fails when conversion is requested but ffmpeg cannot be provided.
    ///
    /// Other converter complaints are left for the convert stage to report.
    pub(super) async fn ensure_converter(
        &self,
        reference: &MediaReference,
    ) -> Result<(), DownloadError> {
        match self
            .cancellable(self.converter.validate(), DownloadStage::Convert)
            .await?
        {
            Ok(()) => Ok(()),
            Err(e @ ConverterError::ToolchainUnavailable(_)) => {
                Err(DownloadError::from_converter(reference, e))
            }
            Err(e) => {
                debug!(converter = self.converter.name(), error = %e, "Converter check failed");
                Ok(())
            }
        }
    }

    /// Awaits `fut` unless the token fires first, in which case the
    /// cancellation is attributed to `stage`.
    pub(super) async fn cancellable<T>(
        &self,
        fut: impl Future<Output = T>,
        stage: DownloadStage,
    ) -> Result<T, DownloadError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DownloadError::Cancelled { stage }),
            value = fut => Ok(value),
        }
    }
}

/// Destination stems held by in-flight items, shared by clones.
type ClaimSet = Arc<Mutex<HashSet<PathBuf>>>;

/// Exclusive hold on a destination stem, released on drop.
struct DestinationClaim {
    claims: ClaimSet,
    key: PathBuf,
}

impl DestinationClaim {
    /// Returns `None` when another item already holds `key`.
    fn acquire(claims: &ClaimSet, key: PathBuf) -> Option<Self> {
        let mut held = claims.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(key.clone()) {
            return None;
        }
        Some(Self {
            claims: Arc::clone(claims),
            key,
        })
    }
}

impl Drop for DestinationClaim {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
    }
}
