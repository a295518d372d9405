//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::progress::{parse_progress_line, ProgressLine, ProgressTracker};
use super::traits::Converter;
use super::types::{AudioFormat, ConversionJob, ConversionProgress, ConversionResult, MediaInfo};
use crate::toolchain::ToolchainBootstrap;

/// Converter that shells out to the ffmpeg installation provided by a
/// [`ToolchainBootstrap`].
///
/// The bootstrap is consulted before anything is spawned, so the first
/// conversion of a process may trigger a toolchain download.
pub struct FfmpegConverter {
    config: ConverterConfig,
    toolchain: Arc<ToolchainBootstrap>,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig, toolchain: Arc<ToolchainBootstrap>) -> Self {
        Self { config, toolchain }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Builds ffmpeg arguments for an audio-only transcode.
    fn build_args(&self, job: &ConversionJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            "-vn".to_string(), // Drop any video track
            "-c:a".to_string(),
            job.format.ffmpeg_codec().to_string(),
        ];

        args.extend(job.format.quality_args(self.config.vbr_quality));

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, ConverterError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            bit_rate: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| ConverterError::probe_failed(format!("invalid ffprobe output: {}", e)))?;

        let duration_secs = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let size_bytes = probe
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

        let format_name = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown");

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
            format: format_name.to_string(),
            audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
            audio_bitrate_kbps: audio_stream
                .and_then(|s| s.bit_rate.as_ref())
                .and_then(|b| b.parse::<u32>().ok())
                .map(|b| b / 1000),
        })
    }

    async fn probe_with(&self, ffprobe: &Path, path: &Path) -> Result<MediaInfo, ConverterError> {
        let output = Command::new(ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn discard_partial_output(&self, path: &Path) {
        if !self.config.remove_partial_output {
            return;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
        }
    }

    /// Runs the conversion with optional progress reporting.
    async fn run_conversion(
        &self,
        job: &ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        if !job.input_path.exists() {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let location = self.toolchain.ensure().await?;

        // Duration only feeds the progress percentage.
        let duration_secs = match self.probe_with(&location.ffprobe, &job.input_path).await {
            Ok(info) => Some(info.duration_secs),
            Err(e) => {
                debug!(input = %job.input_path.display(), error = %e, "Probe failed, progress percentage unavailable");
                None
            }
        };

        let args = self.build_args(job);
        debug!(ffmpeg = %location.ffmpeg.display(), ?args, "Starting conversion");

        let mut child = Command::new(&location.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ConverterError::conversion_failed(format!("failed to start ffmpeg: {}", e), None)
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConverterError::conversion_failed("ffmpeg stderr not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let mut tracker = ProgressTracker::new(duration_secs);
        let mut current_time = 0.0;
        let mut current_speed = None;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut last_progress_send = Instant::now();
            let progress_interval = Duration::from_millis(500);
            let mut error_output = String::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if line.to_ascii_lowercase().contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                match parse_progress_line(&line) {
                    Some(ProgressLine::Time(secs)) => {
                        current_time = secs;
                        tracker.update(secs);
                    }
                    Some(ProgressLine::Speed(speed)) => current_speed = Some(speed),
                    None => continue,
                }

                if let Some(ref tx) = progress_tx {
                    if last_progress_send.elapsed() >= progress_interval {
                        let _ = tx.try_send(ConversionProgress {
                            job_id: job.job_id.clone(),
                            percent: tracker.percent(),
                            time_secs: current_time,
                            duration_secs,
                            speed: current_speed.clone(),
                        });
                        last_progress_send = Instant::now();
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, _))) if status.success() => {}
            Ok(Ok((status, error_output))) => {
                self.discard_partial_output(&job.output_path).await;
                return Err(ConverterError::conversion_failed(
                    format!("FFmpeg exited with code: {:?}", status.code()),
                    if error_output.is_empty() {
                        None
                    } else {
                        Some(error_output)
                    },
                ));
            }
            Ok(Err(e)) => {
                self.discard_partial_output(&job.output_path).await;
                return Err(ConverterError::Io(e));
            }
            Err(_) => {
                let _ = child.kill().await;
                self.discard_partial_output(&job.output_path).await;
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?;

        if let Some(tx) = progress_tx {
            let _ = tx.try_send(ConversionProgress {
                job_id: job.job_id.clone(),
                percent: tracker.finish(),
                time_secs: duration_secs.unwrap_or(current_time),
                duration_secs,
                speed: current_speed,
            });
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            output = %job.output_path.display(),
            bytes = output_meta.len(),
            duration_ms,
            "Conversion complete"
        );

        Ok(ConversionResult {
            job_id: job.job_id.clone(),
            input_path: job.input_path.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms,
            output_format: job.format,
        })
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn target_format(&self) -> AudioFormat {
        self.config.format
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let location = self.toolchain.ensure().await?;
        self.probe_with(&location.ffprobe, path).await
    }

    async fn convert(&self, input: &Path) -> Result<ConversionResult, ConverterError> {
        let job = ConversionJob::for_input(input, self.config.format);
        self.run_conversion(&job, None).await
    }

    async fn convert_with_progress(
        &self,
        input: &Path,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        let job = ConversionJob::for_input(input, self.config.format);
        self.run_conversion(&job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        self.toolchain.ensure().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HostOs, PlatformInfo};
    use crate::testing::MockToolchainFetcher;
    use crate::toolchain::{ToolchainConfig, ToolchainError};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn bootstrap(dir: &Path, fetcher: MockToolchainFetcher) -> Arc<ToolchainBootstrap> {
        let config = ToolchainConfig::default()
            .with_install_dir(dir.join("ffmpeg"))
            .with_system_path(false);
        Arc::new(ToolchainBootstrap::new(
            config,
            PlatformInfo::new(HostOs::Linux, dir),
            Arc::new(fetcher),
        ))
    }

    #[test]
    fn test_build_args_mp3() {
        let dir = TempDir::new().unwrap();
        let converter = FfmpegConverter::new(
            ConverterConfig::default(),
            bootstrap(dir.path(), MockToolchainFetcher::new()),
        );
        let job = ConversionJob::for_input(Path::new("/in/song.webm"), AudioFormat::Mp3);
        let args = converter.build_args(&job);

        assert_eq!(
            &args[..9],
            &["-y", "-i", "/in/song.webm", "-vn", "-c:a", "libmp3lame", "-q:a", "2", "-loglevel"]
        );
        assert!(args.windows(2).any(|w| w == ["-progress", "pipe:2"]));
        assert_eq!(args.last().map(String::as_str), Some("/in/song.mp3"));
    }

    #[test]
    fn test_build_args_opus_with_extra_args() {
        let dir = TempDir::new().unwrap();
        let mut config = ConverterConfig::default().with_format(AudioFormat::Opus);
        config.extra_ffmpeg_args = vec!["-ar".to_string(), "48000".to_string()];
        let converter =
            FfmpegConverter::new(config, bootstrap(dir.path(), MockToolchainFetcher::new()));

        let job = ConversionJob::for_input(Path::new("/in/song.m4a"), AudioFormat::Opus);
        let args = converter.build_args(&job);

        assert!(args.contains(&"libopus".to_string()));
        assert!(args.windows(2).any(|w| w == ["-b:a", "160k"]));
        assert!(args.windows(2).any(|w| w == ["-ar", "48000"]));
        assert_eq!(args.last().map(String::as_str), Some("/in/song.opus"));
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "format": {
                "filename": "test.webm",
                "format_name": "matroska,webm",
                "duration": "180.5",
                "size": "3000000"
            },
            "streams": [
                {
                    "codec_type": "audio",
                    "codec_name": "opus",
                    "bit_rate": "160000"
                }
            ]
        }"#;

        let info = FfmpegConverter::parse_probe_output(Path::new("test.webm"), json).unwrap();
        assert_eq!(info.format, "matroska");
        assert!((info.duration_secs - 180.5).abs() < 0.01);
        assert_eq!(info.size_bytes, 3000000);
        assert_eq!(info.audio_codec, Some("opus".to_string()));
        assert_eq!(info.audio_bitrate_kbps, Some(160));
    }

    #[test]
    fn test_parse_probe_output_invalid() {
        let result = FfmpegConverter::parse_probe_output(Path::new("x"), "not json");
        assert!(matches!(result, Err(ConverterError::ProbeFailed { .. })));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockToolchainFetcher::new();
        let counter = fetcher.clone();
        let converter = FfmpegConverter::new(ConverterConfig::default(), bootstrap(dir.path(), fetcher));

        let result = converter.convert(&dir.path().join("missing.webm")).await;
        assert!(matches!(result, Err(ConverterError::InputNotFound { .. })));
        // A missing input never triggers a toolchain install.
        assert_eq!(counter.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_toolchain_fails_fast() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("song.webm");
        std::fs::write(&input, b"data").unwrap();

        let fetcher = MockToolchainFetcher::new()
            .with_error(ToolchainError::Download("offline".to_string()));
        let converter = FfmpegConverter::new(ConverterConfig::default(), bootstrap(dir.path(), fetcher));

        let err = converter.convert(&input).await.unwrap_err();
        assert!(matches!(err, ConverterError::ToolchainUnavailable(_)));
        assert!(err.guidance().is_some());
        assert!(!dir.path().join("song.mp3").exists());
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        const FFPROBE: &str = "#!/bin/sh\n\
            echo '{\"format\":{\"format_name\":\"webm\",\"duration\":\"2.0\",\"size\":\"4\"},\"streams\":[]}'\n";

        fn install_fake_toolchain(dir: &Path, ffmpeg_script: &str) {
            let managed = dir.join("ffmpeg");
            fs::create_dir_all(&managed).unwrap();
            for (name, script) in [("ffmpeg", ffmpeg_script), ("ffprobe", FFPROBE)] {
                let path = managed.join(name);
                fs::write(&path, script).unwrap();
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            }
        }

        fn input_file(dir: &Path) -> PathBuf {
            let input = dir.join("song.webm");
            fs::write(&input, b"data").unwrap();
            input
        }

        #[tokio::test]
        async fn test_successful_conversion_reports_progress() {
            let dir = TempDir::new().unwrap();
            install_fake_toolchain(
                dir.path(),
                "#!/bin/sh\n\
                 for last; do :; done\n\
                 echo 'out_time_ms=1000000' >&2\n\
                 echo 'speed=4.0x' >&2\n\
                 printf 'mp3!' > \"$last\"\n",
            );
            let input = input_file(dir.path());
            let converter = FfmpegConverter::new(
                ConverterConfig::default(),
                bootstrap(dir.path(), MockToolchainFetcher::new()),
            );

            let (tx, mut rx) = mpsc::channel(16);
            let result = converter.convert_with_progress(&input, tx).await.unwrap();

            assert_eq!(result.output_path, dir.path().join("song.mp3"));
            assert_eq!(result.output_size_bytes, 4);
            assert_eq!(result.output_format, AudioFormat::Mp3);

            let mut updates = Vec::new();
            while let Some(update) = rx.recv().await {
                updates.push(update);
            }
            let last = updates.last().expect("final progress update");
            assert_eq!(last.percent, 100.0);
            assert!(updates.windows(2).all(|w| w[0].percent <= w[1].percent));
        }

        #[tokio::test]
        async fn test_failed_conversion_removes_partial_output() {
            let dir = TempDir::new().unwrap();
            install_fake_toolchain(
                dir.path(),
                "#!/bin/sh\n\
                 for last; do :; done\n\
                 printf 'half' > \"$last\"\n\
                 echo 'Error while decoding stream' >&2\n\
                 exit 1\n",
            );
            let input = input_file(dir.path());
            let converter = FfmpegConverter::new(
                ConverterConfig::default(),
                bootstrap(dir.path(), MockToolchainFetcher::new()),
            );

            let err = converter.convert(&input).await.unwrap_err();
            match err {
                ConverterError::ConversionFailed { stderr, .. } => {
                    assert!(stderr.unwrap_or_default().contains("Error while decoding"));
                }
                other => panic!("unexpected error: {:?}", other),
            }
            assert!(!dir.path().join("song.mp3").exists());
        }

        #[tokio::test]
        async fn test_timeout_kills_conversion() {
            let dir = TempDir::new().unwrap();
            install_fake_toolchain(dir.path(), "#!/bin/sh\nsleep 30\n");
            let input = input_file(dir.path());
            let converter = FfmpegConverter::new(
                ConverterConfig::default().with_timeout(1),
                bootstrap(dir.path(), MockToolchainFetcher::new()),
            );

            let err = converter.convert(&input).await.unwrap_err();
            assert!(matches!(err, ConverterError::Timeout { timeout_secs: 1 }));
        }
    }
}
