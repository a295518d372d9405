//! yt-dlp backed content client.
//!
//! Metadata comes from yt-dlp's JSON dump; the selected stream is then fetched
//! directly over HTTP so the transfer can be streamed to disk.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::ContentConfig;
use super::error::ContentError;
use super::traits::ContentClient;
use super::types::{ItemMetadata, MediaReference, StreamDescriptor};

/// Base URL used to turn bare video ids into item references.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Content client that shells out to yt-dlp for metadata.
pub struct YtDlpClient {
    config: ContentConfig,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct DumpedItem {
    title: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    formats: Vec<DumpedFormat>,
}

#[derive(Debug, Deserialize)]
struct DumpedFormat {
    format_id: String,
    ext: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DumpedCollection {
    #[serde(default)]
    entries: Vec<DumpedEntry>,
}

#[derive(Debug, Deserialize)]
struct DumpedEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl YtDlpClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: ContentConfig) -> Result<Self, ContentError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, http })
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> Result<Self, ContentError> {
        Self::new(ContentConfig::default())
    }

    /// Runs yt-dlp with `args` and returns its stdout.
    async fn run_ytdlp(
        &self,
        reference: &MediaReference,
        args: &[&str],
    ) -> Result<String, ContentError> {
        let mut command = Command::new(&self.config.ytdlp_path);
        command
            .args(args)
            .args(&self.config.extra_ytdlp_args)
            .arg(reference.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(reference = %reference, ?args, "Running yt-dlp");

        let timeout_duration = Duration::from_secs(self.config.resolve_timeout_secs);
        let output = timeout(timeout_duration, command.output())
            .await
            .map_err(|_| {
                ContentError::resolution(
                    reference,
                    format!(
                        "yt-dlp timed out after {} seconds",
                        self.config.resolve_timeout_secs
                    ),
                )
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ContentError::ToolNotFound {
                        path: self.config.ytdlp_path.clone(),
                    }
                } else {
                    ContentError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .find(|l| l.contains("ERROR"))
                .unwrap_or_else(|| stderr.trim())
                .to_string();
            return Err(ContentError::resolution(
                reference,
                format!("yt-dlp exited with code {:?}: {}", output.status.code(), reason),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parses a single-item JSON dump into item metadata.
    fn parse_item(reference: &MediaReference, json: &str) -> Result<ItemMetadata, ContentError> {
        let dumped: DumpedItem = serde_json::from_str(json)
            .map_err(|e| ContentError::parse(format!("invalid yt-dlp item dump: {}", e)))?;

        let streams = dumped
            .formats
            .into_iter()
            .map(|f| {
                let has_audio = f.acodec.as_deref().is_some_and(|c| c != "none");
                let has_video = f.vcodec.as_deref().is_some_and(|c| c != "none");
                let bitrate = f.abr.filter(|b| *b > 0.0).or(f.tbr).unwrap_or(0.0);

                StreamDescriptor {
                    id: f.format_id,
                    container: f.ext,
                    bitrate_kbps: bitrate.round() as u32,
                    audio_only: has_audio && !has_video,
                    video_height: if has_video { f.height } else { None },
                    url: f.url,
                    headers: f.http_headers,
                }
            })
            .collect();

        Ok(ItemMetadata {
            reference: reference.clone(),
            title: dumped.title,
            streams,
            duration_secs: dumped.duration,
            uploader: dumped.uploader,
        })
    }

    /// Parses a flat collection dump into member references.
    fn parse_collection(json: &str) -> Result<Vec<MediaReference>, ContentError> {
        let dumped: DumpedCollection = serde_json::from_str(json)
            .map_err(|e| ContentError::parse(format!("invalid yt-dlp playlist dump: {}", e)))?;

        Ok(dumped
            .entries
            .into_iter()
            .filter_map(|entry| match (entry.url, entry.id) {
                (Some(url), _) if url.starts_with("http") => Some(MediaReference::new(url)),
                (_, Some(id)) => Some(MediaReference::new(format!("{}{}", WATCH_URL_PREFIX, id))),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl ContentClient for YtDlpClient {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn resolve_item(
        &self,
        reference: &MediaReference,
    ) -> Result<ItemMetadata, ContentError> {
        let json = self
            .run_ytdlp(
                reference,
                &["--dump-single-json", "--no-playlist", "--no-warnings"],
            )
            .await?;
        Self::parse_item(reference, &json)
    }

    async fn resolve_collection_members(
        &self,
        reference: &MediaReference,
    ) -> Result<Vec<MediaReference>, ContentError> {
        let json = self
            .run_ytdlp(
                reference,
                &["--flat-playlist", "--dump-single-json", "--no-warnings"],
            )
            .await?;
        Self::parse_collection(&json)
    }

    async fn transfer_stream(
        &self,
        stream: &StreamDescriptor,
        dest_path: &Path,
    ) -> Result<u64, ContentError> {
        let url = stream.url.as_deref().ok_or_else(|| {
            ContentError::transfer(format!("stream {} has no direct URL", stream.id))
        })?;

        let mut request = self.http.get(url);
        for (name, value) in &stream.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ContentError::transfer(format!(
                "HTTP {} while fetching stream {}",
                response.status(),
                stream.id
            )));
        }

        let mut file = tokio::fs::File::create(dest_path).await?;
        let mut written: u64 = 0;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(
            stream = %stream.id,
            path = %dest_path.display(),
            bytes = written,
            "Stream transferred"
        );

        Ok(written)
    }
}
