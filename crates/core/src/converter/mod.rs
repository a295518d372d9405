//! Converter module for transcoding downloads into a standard audio format.
//!
//! [`FfmpegConverter`] runs ffmpeg on one file at a time:
//!
//! - the output path is the input with its extension replaced by the
//!   target format's (`mp3` by default)
//! - ffmpeg is located (or installed) through the shared
//!   [`ToolchainBootstrap`](crate::toolchain::ToolchainBootstrap) before
//!   anything is spawned
//! - progress is parsed from `-progress pipe:2` and reported as a clamped,
//!   non-decreasing percentage
//!
//! # Example
//!
//! ```ignore
//! use lyra_core::converter::{Converter, ConverterConfig, FfmpegConverter};
//! use lyra_core::toolchain::{ToolchainBootstrap, ToolchainConfig};
//!
//! let toolchain = Arc::new(ToolchainBootstrap::with_defaults(ToolchainConfig::default())?);
//! let converter = FfmpegConverter::new(ConverterConfig::default(), toolchain);
//!
//! let result = converter.convert(Path::new("/downloads/song.webm")).await?;
//! println!("Wrote {}", result.output_path.display());
//! ```

mod config;
mod error;
mod ffmpeg;
mod progress;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use progress::{parse_progress_line, ProgressLine, ProgressTracker};
pub use traits::Converter;
pub use types::{AudioFormat, ConversionJob, ConversionProgress, ConversionResult, MediaInfo};
