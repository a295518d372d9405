//! Downloads prebuilt ffmpeg/ffprobe archives over HTTP.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::config::ToolchainConfig;
use super::error::ToolchainError;
use super::traits::ToolchainFetcher;
use crate::platform::PlatformInfo;

/// Binaries shipped as separate archives by the distribution.
const BINARIES: [&str; 2] = ["ffmpeg", "ffprobe"];

/// Fetcher for the ffbinaries prebuilt releases.
///
/// Each binary is published as its own zip archive:
/// `<base>/v<version>/<binary>-<version>-<platform>.zip`.
pub struct HttpToolchainFetcher {
    client: Client,
    base_url: String,
    version: String,
    download_timeout: Duration,
}

impl HttpToolchainFetcher {
    /// Creates a fetcher from the toolchain configuration.
    pub fn new(config: &ToolchainConfig) -> Result<Self, ToolchainError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.distribution_base_url.trim_end_matches('/').to_string(),
            version: config.distribution_version.clone(),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    /// Archive URL for `binary` on the platform tagged `tag`.
    pub fn archive_url(&self, binary: &str, tag: &str) -> String {
        format!(
            "{base}/v{ver}/{binary}-{ver}-{tag}.zip",
            base = self.base_url,
            ver = self.version,
            binary = binary,
            tag = tag,
        )
    }

    /// Streams `url` into `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, ToolchainError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ToolchainError::Download(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(dest).await?;
        let mut downloaded: u64 = 0;
        let mut last_logged_percent = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if total_size > 0 {
                let percent = downloaded * 100 / total_size;
                if percent >= last_logged_percent + 25 {
                    debug!(url, percent, "Downloading FFmpeg archive");
                    last_logged_percent = percent;
                }
            }
        }
        file.flush().await?;

        Ok(downloaded)
    }
}

#[async_trait]
impl ToolchainFetcher for HttpToolchainFetcher {
    fn name(&self) -> &str {
        "ffbinaries"
    }

    async fn fetch(
        &self,
        install_dir: &Path,
        platform: &PlatformInfo,
    ) -> Result<(), ToolchainError> {
        let tag = platform.distribution_tag().ok_or_else(|| {
            ToolchainError::UnsupportedPlatform(format!(
                "{:?} ({})",
                platform.os(),
                platform.arch()
            ))
        })?;

        tokio::fs::create_dir_all(install_dir).await?;

        for binary in BINARIES {
            let url = self.archive_url(binary, tag);
            let archive_path = install_dir.join(format!("{}.zip.part", binary));
            info!(url = %url, dir = %install_dir.display(), "Downloading {}", binary);

            let downloaded = timeout(self.download_timeout, self.download(&url, &archive_path))
                .await
                .unwrap_or_else(|_| {
                    Err(ToolchainError::Download(format!(
                        "timed out after {} seconds: {}",
                        self.download_timeout.as_secs(),
                        url
                    )))
                });
            let bytes = match downloaded {
                Ok(bytes) => bytes,
                Err(e) => {
                    remove_archive(&archive_path).await;
                    return Err(e);
                }
            };
            debug!(binary, bytes, "Archive downloaded");

            let executable = platform.executable_name(binary);
            let target = install_dir.join(&executable);
            let archive = archive_path.clone();
            let extracted = tokio::task::spawn_blocking(move || {
                extract_executable(&archive, &executable, &target)
            })
            .await
            .map_err(|e| ToolchainError::Extract(e.to_string()))?;

            remove_archive(&archive_path).await;
            let path = extracted?;
            info!(path = %path.display(), "Installed {}", binary);
        }

        Ok(())
    }
}

async fn remove_archive(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove archive"),
    }
}

/// Extracts the entry named `executable` from the zip at `archive_path` into
/// `target`, marking it executable on Unix.
fn extract_executable(
    archive_path: &Path,
    executable: &str,
    target: &Path,
) -> Result<PathBuf, ToolchainError> {
    let file = fs::File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ToolchainError::Extract(e.to_string()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ToolchainError::Extract(e.to_string()))?;
        if !entry.is_file() {
            continue;
        }

        let matches = Path::new(entry.name())
            .file_name()
            .is_some_and(|name| name == executable);
        if !matches {
            continue;
        }

        let mut out = fs::File::create(target)?;
        io::copy(&mut entry, &mut out)?;
        drop(out);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(target, fs::Permissions::from_mode(0o755))?;
        }

        return Ok(target.to_path_buf());
    }

    Err(ToolchainError::Extract(format!(
        "{} not found in {}",
        executable,
        archive_path.display()
    )))
}
