//! Mock converter for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::converter::{
    AudioFormat, ConversionJob, ConversionProgress, ConversionResult, Converter, ConverterError,
    MediaInfo,
};

/// Bytes written to every converted file.
const CONVERTED_CONTENT: &[u8] = b"mock converted audio";

/// A recorded conversion for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was run.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Writes a small output file next to the input, like ffmpeg would
/// - Tracks conversions for assertions
/// - Simulates failures and slow conversions
///
/// # Example
///
/// ```rust,ignore
/// use lyra_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// let result = converter.convert(Path::new("/tmp/song.webm")).await?;
/// assert_eq!(result.output_path, PathBuf::from("/tmp/song.mp3"));
/// assert_eq!(converter.conversion_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    format: AudioFormat,
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Inputs that always fail to convert.
    failing_inputs: Arc<RwLock<Vec<PathBuf>>>,
    /// Simulated conversion duration.
    conversion_duration: Arc<RwLock<Duration>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter producing mp3 files.
    pub fn new() -> Self {
        Self {
            format: AudioFormat::Mp3,
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failing_inputs: Arc::new(RwLock::new(Vec::new())),
            conversion_duration: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Produce `format` instead of mp3.
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every conversion of `input` fail.
    pub async fn fail_input(&self, input: impl AsRef<Path>) {
        self.failing_inputs
            .write()
            .await
            .push(input.as_ref().to_path_buf());
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration.write().await = duration;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, job: ConversionJob, success: bool) {
        self.conversions
            .write()
            .await
            .push(RecordedConversion { job, success });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    fn target_format(&self) -> AudioFormat {
        self.format
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let size_bytes = tokio::fs::metadata(path)
            .await
            .map_err(|_| ConverterError::InputNotFound {
                path: path.to_path_buf(),
            })?
            .len();

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs: 180.0,
            format: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
            audio_codec: Some("opus".to_string()),
            audio_bitrate_kbps: Some(160),
        })
    }

    async fn convert(&self, input: &Path) -> Result<ConversionResult, ConverterError> {
        let job = ConversionJob::for_input(input, self.format);

        if let Some(err) = self.take_error().await {
            self.record(job, false).await;
            return Err(err);
        }

        if self.failing_inputs.read().await.iter().any(|p| p == input) {
            self.record(job, false).await;
            return Err(ConverterError::conversion_failed(
                "mock conversion failure",
                Some("Error while decoding stream".to_string()),
            ));
        }

        if !input.exists() {
            self.record(job.clone(), false).await;
            return Err(ConverterError::InputNotFound {
                path: job.input_path,
            });
        }

        let duration = *self.conversion_duration.read().await;
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }

        tokio::fs::write(&job.output_path, CONVERTED_CONTENT).await?;
        self.record(job.clone(), true).await;

        Ok(ConversionResult {
            job_id: job.job_id,
            input_path: job.input_path,
            output_path: job.output_path,
            output_size_bytes: CONVERTED_CONTENT.len() as u64,
            duration_ms: duration.as_millis() as u64,
            output_format: self.format,
        })
    }

    async fn convert_with_progress(
        &self,
        input: &Path,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        let job_id = ConversionJob::for_input(input, self.format).job_id;
        let steps = 4;
        for i in 1..=steps {
            let _ = progress_tx
                .send(ConversionProgress {
                    job_id: job_id.clone(),
                    percent: (i as f32 / steps as f32) * 100.0,
                    time_secs: 45.0 * i as f64,
                    duration_secs: Some(180.0),
                    speed: Some("10x".to_string()),
                })
                .await;
        }

        self.convert(input).await
    }

    /// Reports a pending toolchain error; any other pending error is left
    /// for the next conversion.
    async fn validate(&self) -> Result<(), ConverterError> {
        let mut next = self.next_error.write().await;
        match next.take() {
            Some(err @ ConverterError::ToolchainUnavailable(_)) => Err(err),
            other => {
                *next = other;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn input(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("song.webm");
        std::fs::write(&path, b"source").unwrap();
        path
    }

    #[tokio::test]
    async fn test_basic_conversion() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();

        let result = converter.convert(&input(&dir)).await.unwrap();

        assert_eq!(result.output_path, dir.path().join("song.mp3"));
        assert!(result.output_path.exists());
        assert_eq!(result.output_format, AudioFormat::Mp3);
    }

    #[tokio::test]
    async fn test_recorded_conversions() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new().with_format(AudioFormat::OggVorbis);
        let path = input(&dir);

        converter.convert(&path).await.unwrap();
        converter.convert(&path).await.unwrap();

        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 2);
        assert!(conversions[0].success);
        assert_eq!(conversions[0].job.output_path, dir.path().join("song.ogg"));
    }

    #[tokio::test]
    async fn test_error_injection() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::conversion_failed("test error", None))
            .await;

        let path = input(&dir);
        assert!(converter.convert(&path).await.is_err());

        // Error should be consumed, conversion recorded as failed
        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 1);
        assert!(!conversions[0].success);

        assert!(converter.convert(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_leaves_conversion_errors_pending() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::conversion_failed("test error", None))
            .await;

        assert!(converter.validate().await.is_ok());
        assert!(converter.convert(&input(&dir)).await.is_err());
    }

    #[tokio::test]
    async fn test_progress_updates() {
        let dir = TempDir::new().unwrap();
        let converter = MockConverter::new();
        let (tx, mut rx) = mpsc::channel(8);

        converter
            .convert_with_progress(&input(&dir), tx)
            .await
            .unwrap();

        let mut last = 0.0;
        while let Some(progress) = rx.recv().await {
            assert!(progress.percent >= last);
            last = progress.percent;
        }
        assert_eq!(last, 100.0);
    }
}
