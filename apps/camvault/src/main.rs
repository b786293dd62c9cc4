//! CamVault daemon: watches the segment directory and uploads finished
//! recordings to cloud storage.
//!
//! Exit status: 0 when every processed file uploaded, 1 when any failed,
//! 2 when startup or the watcher itself failed.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use camvault_cloud::{CloudApi, HttpCloudClient};
use camvault_notifier::{LogNotifier, NotificationSink, WebhookNotifier};
use camvault_uploader::{
    CredentialRefresher, LandingPageRefresher, SegmentUploader, StaticCredentials, UploadEvent,
    UploaderConfig,
};
use camvault_watcher::{SegmentFilter, UploadQueueWatcher, UploadSummary};

use config::AppConfig;

#[derive(Parser)]
#[command(name = "camvault", version, about = "Upload finished camera segments to cloud storage")]
struct Cli {
    /// Upload what is already in the directory, then exit
    #[arg(long)]
    once: bool,
    /// Directory to watch (overrides the config file)
    #[arg(long)]
    watch_dir: Option<PathBuf>,
    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,camvault=debug")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(summary) => {
            info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "camvault stopped"
            );
            if summary.all_succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<UploadSummary> {
    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.watch_dir {
        cfg.watch_dir = dir;
    }

    let api: Arc<dyn CloudApi> = Arc::new(
        HttpCloudClient::new(cfg.endpoints(), Duration::from_secs(cfg.http_timeout_secs))
            .context("building storage client")?,
    );

    let credentials: Arc<dyn CredentialRefresher> = if cfg.refresh_tokens {
        Arc::new(
            LandingPageRefresher::new(api.clone(), cfg.credentials())
                .with_max_age(Duration::from_secs(cfg.token_max_age_secs)),
        )
    } else {
        Arc::new(StaticCredentials::new(cfg.credentials()))
    };

    let sink: Arc<dyn NotificationSink> = match &cfg.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url, Duration::from_secs(cfg.notify_timeout_secs))
                .context("building webhook notifier")?,
        ),
        None => {
            warn!("no webhook_url configured, failures are only logged");
            Arc::new(LogNotifier)
        }
    };

    let (events_tx, events_rx) = mpsc::channel(64);
    tokio::spawn(log_events(events_rx));

    let uploader = SegmentUploader::new(
        api,
        credentials,
        UploaderConfig::new(cfg.remote_folder.clone()).with_plan(cfg.plan()),
    )
    .with_retry_policy(cfg.retry_policy())
    .with_events(events_tx);

    let watcher = UploadQueueWatcher::new(
        cfg.watch_dir.clone(),
        SegmentFilter::new(cfg.extension_filter()),
        Arc::new(uploader),
        sink,
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    info!(
        dir = %cfg.watch_dir.display(),
        remote = %cfg.remote_folder,
        once = cli.once,
        "camvault starting"
    );

    let summary = if cli.once {
        watcher.run_once(&cancel).await?
    } else {
        watcher.run(&cancel).await?
    };
    Ok(summary)
}

async fn log_events(mut rx: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::Started {
                file,
                size_bytes,
                pieces,
            } => info!(%file, size_bytes, pieces, "upload started"),
            UploadEvent::PieceTransferred {
                file,
                index,
                total,
                bytes,
            } => debug!(%file, piece = index + 1, total, bytes, "piece transferred"),
            UploadEvent::Finished { file, outcome } => {
                info!(%file, ?outcome, "upload finished")
            }
        }
    }
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    wait_for_signal().await;
    info!("shutdown requested, finishing current step");
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
