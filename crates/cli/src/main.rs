mod cli;
mod metrics;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audiodrop_core::{
    load_config, load_default_config, validate_config, AudioDrop, CollectionProgress,
    CollectionReport, Config, FfmpegEncoder, ItemArtifacts, ProgressSink, UrlKind, YtDlpSource,
};

use cli::Cli;

/// Configuration file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "audiodrop.toml";

/// Exit status when a collection finished with failed items.
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_PARTIAL_FAILURE),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether everything requested was produced.
async fn run(cli: Cli) -> Result<bool> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = resolve_config(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;
    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());

    let service = AudioDrop::from_config(&config);
    service
        .validate()
        .await
        .context("yt-dlp or ffmpeg is not usable")?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let success = match service.classify(&cli.url) {
        UrlKind::Item => {
            let sink = Arc::new(ProgressSink::new());
            let mut watchers = JoinSet::new();
            watchers.spawn(log_progress(cli.url.clone(), Arc::clone(&sink)));

            let artifacts = service
                .process_item(
                    &cli.url,
                    &cli.conversion_options(),
                    &output_dir,
                    Some(&sink),
                    &cancel,
                )
                .await?;
            watchers.abort_all();
            print_item(&artifacts);
            true
        }
        UrlKind::Collection => {
            let report = process_collection(&service, &cli, &output_dir, &cancel).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            report.is_success()
        }
        UrlKind::Unsupported => bail!("Unsupported URL: {}", cli.url),
    };

    if cli.metrics {
        eprintln!("{}", metrics::encode_metrics()?);
    }

    Ok(success)
}

/// Loads `--config`, then `AUDIODROP_CONFIG`, then `audiodrop.toml` if it
/// exists; otherwise defaults with environment overrides.
fn resolve_config(flag: Option<&Path>) -> Result<Config> {
    let path = flag
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("AUDIODROP_CONFIG").ok().map(PathBuf::from))
        .or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        });

    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_default_config().context("Failed to load default configuration"),
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
}

async fn process_collection(
    service: &AudioDrop<YtDlpSource, FfmpegEncoder>,
    cli: &Cli,
    output_dir: &Path,
    cancel: &CancellationToken,
) -> Result<CollectionReport> {
    let (collection, members) = service
        .collection_items(&cli.url)
        .await
        .context("Failed to list collection")?;
    info!(
        "Collection {:?} has {} items",
        collection.title,
        members.len()
    );

    let progress = CollectionProgress::for_items(members.iter().map(|m| m.info.id.clone()));
    let mut watchers = JoinSet::new();
    for (id, sink) in progress.iter() {
        watchers.spawn(log_progress(id.to_string(), Arc::clone(sink)));
    }

    let report = service
        .process_collection(
            &cli.url,
            &cli.collection_options(),
            output_dir,
            &progress,
            cancel,
        )
        .await?;
    watchers.abort_all();
    Ok(report)
}

/// Logs every 10% step of an item's combined progress.
async fn log_progress(label: String, sink: Arc<ProgressSink>) {
    let mut rx = sink.subscribe();
    let mut last_step = 0;
    while rx.changed().await.is_ok() {
        let percent = rx.borrow_and_update().percent();
        let step = percent / 10;
        if step > last_step {
            last_step = step;
            info!(item = %label, "{}%", percent);
        }
    }
}

fn print_item(artifacts: &ItemArtifacts) {
    for path in &artifacts.artifacts {
        println!("{}", path.display());
    }
}

fn print_report(report: &CollectionReport) {
    for path in report.artifact_paths() {
        println!("{}", path.display());
    }
    if report.excluded > 0 {
        println!("excluded: {}", report.excluded);
    }
    for failure in &report.failures {
        println!(
            "failed: {} ({}) [{}{}] {}",
            failure.item_id,
            failure.title,
            failure.kind.as_str(),
            if failure.retryable { ", retryable" } else { "" },
            failure.error
        );
    }
    println!("state: {:?}", report.state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_config_from_flag() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_dir = \"/srv/music\"").unwrap();

        let config = resolve_config(Some(file.path())).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/music"));
    }

    #[test]
    fn test_resolve_config_missing_flag_path_fails() {
        let result = resolve_config(Some(Path::new("/nonexistent/audiodrop.toml")));
        assert!(result.is_err());
    }
}
