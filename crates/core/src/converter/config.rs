//! Settings for transcoding downloads to audio.

use serde::{Deserialize, Serialize};

use super::types::AudioFormat;

/// How downloaded streams are transcoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Target audio format.
    #[serde(default)]
    pub format: AudioFormat,

    /// VBR quality on the LAME scale (0 = best, 9 = smallest).
    #[serde(default = "default_vbr_quality")]
    pub vbr_quality: u8,

    /// Wall-clock limit for one ffmpeg run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Value passed to ffmpeg's `-loglevel`.
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional ffmpeg output arguments.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// Remove a partially written output file when conversion fails.
    #[serde(default = "default_true")]
    pub remove_partial_output: bool,
}

fn default_vbr_quality() -> u8 {
    2
}

fn default_timeout() -> u64 {
    3600
}

fn default_log_level() -> String {
    "warning".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            vbr_quality: default_vbr_quality(),
            timeout_secs: default_timeout(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
            remove_partial_output: true,
        }
    }
}

impl ConverterConfig {
    /// Sets the target format.
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the VBR quality.
    pub fn with_vbr_quality(mut self, quality: u8) -> Self {
        self.vbr_quality = quality;
        self
    }
}
