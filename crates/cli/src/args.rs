use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

use lyra_core::{CollectionStrategy, Config};

/// Download media from a video-hosting service and convert it to audio.
#[derive(Debug, Parser)]
#[command(name = "lyra", version, about)]
#[command(group(ArgGroup::new("mode").args(["video", "playlist"]).multiple(false)))]
pub struct Args {
    /// Download a single video.
    #[arg(long, value_name = "URL")]
    pub video: Option<String>,

    /// Download every video of a playlist.
    #[arg(long, value_name = "URL")]
    pub playlist: Option<String>,

    /// Keep the downloaded stream as-is instead of converting it.
    #[arg(long)]
    pub no_convert: bool,

    /// Destination directory (default: a dated folder in the user data dir).
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Configuration file.
    #[arg(long, value_name = "FILE", env = "LYRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of playlist members downloaded at once.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// How playlist members are discovered.
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Delete the downloaded stream once it has been converted.
    #[arg(long)]
    pub delete_source: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Enumerator,
    PageScrape,
}

impl From<Strategy> for CollectionStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Enumerator => CollectionStrategy::Enumerator,
            Strategy::PageScrape => CollectionStrategy::PageScrape,
        }
    }
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Video(String),
    Playlist(String),
}

impl Args {
    pub fn mode(&self) -> Option<Mode> {
        match (&self.video, &self.playlist) {
            (Some(url), _) => Some(Mode::Video(url.clone())),
            (None, Some(url)) => Some(Mode::Playlist(url.clone())),
            (None, None) => None,
        }
    }

    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dest) = &self.dest {
            config.download.destination = Some(dest.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.download.max_concurrent_downloads = concurrency;
        }
        if let Some(strategy) = self.strategy {
            config.content.collection_strategy = strategy.into();
        }
        if self.no_convert {
            config.download.convert = false;
        }
        if self.delete_source {
            config.download.delete_source_after_convert = true;
        }
    }
}
