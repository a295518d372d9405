//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Target audio format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    #[default]
    Mp3,
    /// Ogg Vorbis
    OggVorbis,
    /// Opus
    Opus,
}

impl AudioFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg",
            Self::Opus => "opus",
        }
    }

    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::OggVorbis => "libvorbis",
            Self::Opus => "libopus",
        }
    }

    /// Encoder quality arguments for a LAME-style VBR quality
    /// (0 = best, 9 = smallest).
    ///
    /// Vorbis uses the inverted 0..=9 scale, Opus has no quality scale so the
    /// value is mapped onto a bitrate (quality 2 -> 160 kbps).
    pub fn quality_args(&self, vbr_quality: u8) -> Vec<String> {
        let q = vbr_quality.min(9);
        match self {
            Self::Mp3 => vec!["-q:a".to_string(), q.to_string()],
            Self::OggVorbis => vec!["-q:a".to_string(), (9 - q).to_string()],
            Self::Opus => vec![
                "-b:a".to_string(),
                format!("{}k", 192 - 16 * u32::from(q)),
            ],
        }
    }
}

/// One conversion: an input file and the output path derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    /// Identifier used in progress updates (the input file name).
    pub job_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub format: AudioFormat,
}

impl ConversionJob {
    /// Job converting `input` to `format` next to the input.
    ///
    /// The output is the input with its extension replaced. When the input
    /// already carries the target extension, `.converted` is inserted before
    /// it so ffmpeg never reads and writes the same file.
    pub fn for_input(input: &Path, format: AudioFormat) -> Self {
        let mut output_path = input.with_extension(format.extension());
        if output_path == input {
            output_path = input.with_extension(format!("converted.{}", format.extension()));
        }

        Self {
            job_id: input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.display().to_string()),
            input_path: input.to_path_buf(),
            output_path,
            format,
        }
    }
}

/// Progress update during conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Job ID.
    pub job_id: String,
    /// Progress percentage (0-100, never decreasing within a job).
    pub percent: f32,
    /// Current time position in seconds.
    pub time_secs: f64,
    /// Total duration in seconds, when known.
    pub duration_secs: Option<f64>,
    /// Encoding speed (e.g. "2.5x").
    pub speed: Option<String>,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub job_id: String,
    pub input_path: PathBuf,
    /// Path to the converted file.
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    /// Wall-clock conversion time in milliseconds.
    pub duration_ms: u64,
    pub output_format: AudioFormat,
}

/// Information about a media file, from ffprobe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    /// Container format name (first entry of ffprobe's `format_name`).
    pub format: String,
    pub audio_codec: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
}
