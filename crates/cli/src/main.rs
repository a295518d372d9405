mod args;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lyra_core::{
    load_config, load_config_from_env, validate_config, CollectionOutcome, CollectionResolver,
    Config, DownloadError, DownloadOrchestrator, FfmpegConverter, MediaReference, PlatformInfo,
    ToolchainBootstrap, YtDlpClient,
};

use args::{Args, Mode};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Success,
    PartialFailure,
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::PartialFailure => ExitCode::from(2),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let Some(mode) = args.mode() else {
        let _ = Args::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    };

    match run(&args, mode).await {
        Ok(status) => status.into(),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_config_from_env().context("Failed to load config from environment")?,
    };
    args.apply(&mut config);
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run(args: &Args, mode: Mode) -> Result<RunStatus> {
    info!("Starting lyra v{}", VERSION);
    let config = load(args)?;

    let platform = PlatformInfo::current();
    let dest_dir: PathBuf = config
        .download
        .destination_dir(&platform, chrono::Local::now().date_naive());
    info!(dest = %dest_dir.display(), convert = config.download.convert, "Configuration loaded");

    let client = Arc::new(
        YtDlpClient::new(config.content.clone()).context("Failed to create content client")?,
    );
    let resolver =
        CollectionResolver::from_config(&config.content).context("Failed to create resolver")?;
    let toolchain = Arc::new(
        ToolchainBootstrap::with_defaults(config.toolchain.clone())
            .context("Failed to prepare ffmpeg bootstrap")?,
    );
    let converter = Arc::new(FfmpegConverter::new(config.converter.clone(), toolchain));

    let cancel = CancellationToken::new();
    let orchestrator = DownloadOrchestrator::new(client, converter, config.download.clone())
        .with_resolver(resolver)
        .with_cancellation(cancel.clone());

    tokio::spawn(cancel_on_interrupt(cancel));

    let convert = config.download.convert;
    match mode {
        Mode::Video(url) => download_video(&orchestrator, &url, &dest_dir, convert).await,
        Mode::Playlist(url) => download_playlist(&orchestrator, &url, &dest_dir, convert).await,
    }
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, cancelling downloads");
        cancel.cancel();
    }
}

async fn download_video(
    orchestrator: &DownloadOrchestrator,
    url: &str,
    dest_dir: &Path,
    convert: bool,
) -> Result<RunStatus> {
    let reference = MediaReference::from(url);
    match orchestrator.download_item(&reference, dest_dir, convert).await {
        Ok(path) => {
            println!("{}", path.display());
            Ok(RunStatus::Success)
        }
        Err(e @ DownloadError::ToolchainUnavailable { .. }) => Err(fatal_toolchain(&e)),
        Err(e) => {
            eprintln!("failed at {} stage: {}", e.stage(), e);
            Ok(RunStatus::PartialFailure)
        }
    }
}

async fn download_playlist(
    orchestrator: &DownloadOrchestrator,
    url: &str,
    dest_dir: &Path,
    convert: bool,
) -> Result<RunStatus> {
    let reference = MediaReference::from(url);
    let outcome = orchestrator
        .download_collection(&reference, dest_dir, convert)
        .await
        .with_context(|| format!("Failed to download playlist {}", url))?;

    report(&outcome);

    if let Some(guidance) = outcome.toolchain_guidance() {
        anyhow::bail!("ffmpeg is unavailable. {}", guidance);
    }
    Ok(if outcome.is_complete_success() {
        RunStatus::Success
    } else {
        RunStatus::PartialFailure
    })
}

fn report(outcome: &CollectionOutcome) {
    for success in &outcome.successes {
        println!("{}", success.path.display());
    }
    for failure in outcome.failures.values() {
        eprintln!(
            "failed: {} at {} stage: {}",
            failure.reference, failure.stage, failure.reason
        );
    }
    eprintln!(
        "{} of {} downloaded, {} failed",
        outcome.success_count(),
        outcome.member_count,
        outcome.failure_count()
    );
}

fn fatal_toolchain(e: &DownloadError) -> anyhow::Error {
    match e.guidance() {
        Some(guidance) => anyhow::anyhow!("{}. {}", e, guidance),
        None => anyhow::anyhow!("{}", e),
    }
}
