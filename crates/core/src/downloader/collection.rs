//! Collection fan-out: one task per member, all awaited, failures isolated.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::error::{DownloadError, DownloadStage};
use super::orchestrator::DownloadOrchestrator;
use super::types::{CollectionOutcome, DownloadTask, ItemFailure, ItemOutcome};
use crate::content::MediaReference;

impl DownloadOrchestrator {
    /// Downloads every member of the collection at `reference`.
    ///
    /// Members run as independent tasks, at most
    /// `max_concurrent_downloads` at a time. A failing member never affects
    /// its siblings; only a failure to resolve the collection itself is
    /// returned as an error. An empty collection yields an empty outcome.
    ///
    /// When `convert` is set and ffmpeg cannot be provided, every member is
    /// recorded as failed before any transfer starts.
    pub async fn download_collection(
        &self,
        reference: &MediaReference,
        dest_dir: &Path,
        convert: bool,
    ) -> Result<CollectionOutcome, DownloadError> {
        info!(
            reference = %reference,
            strategy = self.resolver.strategy_name(),
            "Resolving collection"
        );

        let members = self
            .cancellable(
                self.resolver.resolve(self.client.as_ref(), reference),
                DownloadStage::Resolve,
            )
            .await?
            .map_err(|e| DownloadError::CollectionResolutionFailed {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;

        let members = dedupe(members);
        if members.is_empty() {
            let empty = DownloadError::EmptyCollection {
                reference: reference.to_string(),
            };
            warn!(reference = %reference, "{}", empty);
            return Ok(CollectionOutcome::new(0));
        }

        if convert {
            if let Err(e) = self.ensure_converter(reference).await {
                error!(reference = %reference, error = %e, "Converter unavailable, skipping every member");
                let mut outcome = CollectionOutcome::new(members.len());
                for member in members {
                    outcome.record(ItemOutcome::Failed(ItemFailure::from_error(member, &e)));
                }
                return Ok(outcome);
            }
        }

        let limit = self.config.max_concurrent_downloads.max(1);
        info!(
            reference = %reference,
            members = members.len(),
            concurrency = limit,
            dest = %dest_dir.display(),
            "Downloading collection"
        );

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut set = JoinSet::new();

        for (index, member) in members.iter().cloned().enumerate() {
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let task = DownloadTask::new(member, dest_dir, convert);

            set.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = this.cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };

                let outcome = match permit {
                    Some(_permit) => this.run_task(task).await,
                    None => ItemOutcome::Failed(ItemFailure::from_error(
                        task.reference,
                        &DownloadError::Cancelled {
                            stage: DownloadStage::Resolve,
                        },
                    )),
                };
                (index, outcome)
            });
        }

        let mut results: Vec<Option<ItemOutcome>> = vec![None; members.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(e) => error!(reference = %reference, error = %e, "Download task panicked"),
            }
        }

        let mut outcome = CollectionOutcome::new(members.len());
        for (member, result) in members.into_iter().zip(results) {
            outcome.record(result.unwrap_or_else(|| {
                ItemOutcome::Failed(ItemFailure::from_error(
                    member.clone(),
                    &DownloadError::TransferFailed {
                        reference: member.to_string(),
                        reason: "download task aborted".to_string(),
                    },
                ))
            }));
        }

        info!(
            reference = %reference,
            succeeded = outcome.success_count(),
            failed = outcome.failure_count(),
            "Collection finished"
        );

        Ok(outcome)
    }
}

/// Drops repeated members, keeping the first occurrence.
fn dedupe(members: Vec<MediaReference>) -> Vec<MediaReference> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{CollectionResolver, ItemMetadata, StreamDescriptor};
    use crate::converter::ConverterError;
    use crate::downloader::DownloadConfig;
    use crate::testing::{MockContentClient, MockConverter, MockPageFetcher, MOCK_STREAM_CONTENT};
    use crate::toolchain::ToolchainError;
    use std::time::Duration;
    use tempfile::TempDir;

    fn track(reference: &str, title: &str) -> ItemMetadata {
        ItemMetadata::new(
            MediaReference::from(reference),
            title,
            vec![StreamDescriptor::audio("251", "webm", 160)],
        )
    }

    fn orchestrator(client: Arc<MockContentClient>, config: DownloadConfig) -> DownloadOrchestrator {
        DownloadOrchestrator::new(client, Arc::new(MockConverter::new()), config)
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let members = vec![
            MediaReference::from("b"),
            MediaReference::from("a"),
            MediaReference::from("b"),
        ];
        assert_eq!(
            dedupe(members),
            vec![MediaReference::from("b"), MediaReference::from("a")]
        );
    }

    #[tokio::test]
    async fn test_empty_collection_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());
        let playlist = MediaReference::from("playlist");
        client.set_collection(playlist.clone(), vec![]).await;

        let outcome = orchestrator(client, DownloadConfig::default())
            .download_collection(&playlist, dir.path(), true)
            .await
            .unwrap();

        assert_eq!(outcome.member_count, 0);
        assert!(outcome.is_complete_success());
    }

    #[tokio::test]
    async fn test_unresolvable_collection() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());

        let err = orchestrator(client, DownloadConfig::default())
            .download_collection(&MediaReference::from("nope"), dir.path(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::CollectionResolutionFailed { .. }));
        assert_eq!(err.stage(), DownloadStage::Resolve);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());
        client.set_transfer_delay(Duration::from_millis(30)).await;
        let playlist = MediaReference::from("playlist");
        let members: Vec<_> = (0..6).map(|i| MediaReference::new(format!("m{}", i))).collect();
        for (i, member) in members.iter().enumerate() {
            client
                .add_item(track(member.as_str(), &format!("Song {}", i)))
                .await;
        }
        client.set_collection(playlist.clone(), members).await;

        let outcome = orchestrator(client.clone(), DownloadConfig::default().with_max_concurrent(2))
            .download_collection(&playlist, dir.path(), false)
            .await
            .unwrap();

        assert_eq!(outcome.success_count(), 6);
        assert!(client.max_concurrent_transfers() <= 2);
    }

    #[tokio::test]
    async fn test_page_scrape_strategy() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());
        let watch = |id: &str| format!("https://www.youtube.com/watch?v={}", id);
        client.add_item(track(&watch("aaaaaaaaaaa"), "One")).await;
        client.add_item(track(&watch("bbbbbbbbbbb"), "Two")).await;

        let page = MockPageFetcher::new(
            r#"<a href="/watch?v=aaaaaaaaaaa">1</a><a href="/watch?v=bbbbbbbbbbb">2</a><a href="/watch?v=aaaaaaaaaaa">1</a>"#,
        );
        let outcome = orchestrator(client, DownloadConfig::default())
            .with_resolver(CollectionResolver::PageScrapeBased(Arc::new(page)))
            .download_collection(&MediaReference::from("https://www.youtube.com/playlist?list=PL"), dir.path(), false)
            .await
            .unwrap();

        assert_eq!(outcome.member_count, 2);
        assert_eq!(outcome.success_count(), 2);
        assert!(dir.path().join("one.webm").exists());
        assert!(dir.path().join("two.webm").exists());
    }

    #[tokio::test]
    async fn test_members_sharing_a_title_never_clobber() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());
        client.set_transfer_delay(Duration::from_millis(50)).await;
        let playlist = MediaReference::from("playlist");
        let members = vec![MediaReference::from("m1"), MediaReference::from("m2")];
        client.add_item(track("m1", "Intro")).await;
        client.add_item(track("m2", "Intro")).await;
        client.fail_transfer(MediaReference::from("m2")).await;
        client.set_collection(playlist.clone(), members).await;

        let outcome = orchestrator(client, DownloadConfig::default().with_max_concurrent(4))
            .download_collection(&playlist, dir.path(), false)
            .await
            .unwrap();

        assert_eq!(outcome.success_count() + outcome.failure_count(), 2);
        for success in &outcome.successes {
            assert_eq!(std::fs::read(&success.path).unwrap(), MOCK_STREAM_CONTENT);
        }
    }

    #[tokio::test]
    async fn test_members_sharing_a_title_keep_one_file() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());
        client.set_transfer_delay(Duration::from_millis(50)).await;
        let playlist = MediaReference::from("playlist");
        let members = vec![MediaReference::from("m1"), MediaReference::from("m2")];
        client.add_item(track("m1", "Intro")).await;
        client.add_item(track("m2", "Intro")).await;
        client.set_collection(playlist.clone(), members).await;

        let outcome = orchestrator(client.clone(), DownloadConfig::default().with_max_concurrent(4))
            .download_collection(&playlist, dir.path(), false)
            .await
            .unwrap();

        assert_eq!(outcome.success_count(), 1);
        assert_eq!(outcome.failure_count(), 1);
        let failure = outcome.failures.values().next().unwrap();
        assert_eq!(failure.stage, DownloadStage::Prepare);
        assert_eq!(client.recorded_transfers().await.len(), 1);
        assert_eq!(
            std::fs::read(dir.path().join("intro.webm")).unwrap(),
            MOCK_STREAM_CONTENT
        );
    }

    #[tokio::test]
    async fn test_missing_toolchain_skips_every_transfer() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());
        let converter = Arc::new(MockConverter::new());
        converter
            .set_next_error(ConverterError::ToolchainUnavailable(ToolchainError::Unavailable {
                reason: "offline".to_string(),
                guidance: "sudo apt install ffmpeg".to_string(),
            }))
            .await;
        let playlist = MediaReference::from("playlist");
        let members: Vec<_> = (0..10).map(|i| MediaReference::new(format!("m{}", i))).collect();
        for (i, member) in members.iter().enumerate() {
            client
                .add_item(track(member.as_str(), &format!("Song {}", i)))
                .await;
        }
        client.set_collection(playlist.clone(), members).await;

        let outcome = DownloadOrchestrator::new(
            client.clone(),
            converter,
            DownloadConfig::default().with_max_concurrent(1),
        )
        .download_collection(&playlist, dir.path(), true)
        .await
        .unwrap();

        assert_eq!(outcome.failure_count(), 10);
        assert!(outcome
            .failures
            .values()
            .all(|f| f.stage == DownloadStage::Convert));
        assert_eq!(outcome.toolchain_guidance(), Some("sudo apt install ffmpeg"));
        assert!(client.recorded_transfers().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_stops_pending_members() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockContentClient::new());
        client.set_transfer_delay(Duration::from_millis(200)).await;
        let playlist = MediaReference::from("playlist");
        let members: Vec<_> = (0..4).map(|i| MediaReference::new(format!("m{}", i))).collect();
        for (i, member) in members.iter().enumerate() {
            client
                .add_item(track(member.as_str(), &format!("Song {}", i)))
                .await;
        }
        client.set_collection(playlist.clone(), members).await;

        let orchestrator = orchestrator(client, DownloadConfig::default().with_max_concurrent(1));
        let token = orchestrator.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let outcome = orchestrator
            .download_collection(&playlist, dir.path(), false)
            .await
            .unwrap();

        assert_eq!(outcome.member_count, 4);
        assert_eq!(outcome.failure_count(), 4);
        assert!(outcome.failures.values().all(|f| f.is_cancelled()));
    }
}
