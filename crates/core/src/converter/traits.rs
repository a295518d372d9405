//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use super::error::ConverterError;
use super::types::{AudioFormat, ConversionJob, ConversionProgress, ConversionResult, MediaInfo};

/// A converter that transcodes a downloaded file into the target audio format.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Format produced by [`convert`](Self::convert).
    fn target_format(&self) -> AudioFormat;

    /// Path the converted file for `input` will be written to.
    fn output_path_for(&self, input: &Path) -> PathBuf {
        ConversionJob::for_input(input, self.target_format()).output_path
    }

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError>;

    /// Converts `input` and returns where the result was written.
    async fn convert(&self, input: &Path) -> Result<ConversionResult, ConverterError>;

    /// Converts `input` with progress reporting.
    ///
    /// Progress is best-effort: if the receiver is dropped or full,
    /// conversion continues without it.
    async fn convert_with_progress(
        &self,
        input: &Path,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is ready to run.
    async fn validate(&self) -> Result<(), ConverterError>;
}
