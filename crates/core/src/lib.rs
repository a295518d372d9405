pub mod config;
pub mod content;
pub mod converter;
pub mod downloader;
pub mod platform;
pub mod sanitize;
pub mod testing;
pub mod toolchain;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError,
};
pub use content::{
    CollectionResolver, CollectionStrategy, ContentClient, ContentConfig, ContentError,
    ItemMetadata, MediaReference, StreamDescriptor, YtDlpClient,
};
pub use converter::{
    AudioFormat, ConversionResult, Converter, ConverterConfig, ConverterError, FfmpegConverter,
};
pub use downloader::{
    select_stream, CollectionOutcome, DownloadConfig, DownloadError, DownloadOrchestrator,
    DownloadStage, ItemFailure, ItemOutcome, OverwritePolicy,
};
pub use platform::{HostOs, PlatformInfo};
pub use sanitize::{sanitize, sanitize_default, SanitizeError, SanitizedName};
pub use toolchain::{
    ToolchainBootstrap, ToolchainConfig, ToolchainError, ToolchainLocation, ToolchainState,
};
