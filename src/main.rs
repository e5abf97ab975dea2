mod cli;
mod config;
mod destination;
mod error;
mod job_spec;
mod models;
mod orchestrator;
mod preflight;
mod progress;
mod validate;
mod ytdlp;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::Args;
use config::DownloaderConfig;
use models::{DownloadRequest, JobOutcome};
use orchestrator::Orchestrator;
use progress::{ProgressBoard, ProgressReporter};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use ytdlp::YtDlpBackend;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level());

    let mut config = DownloaderConfig::load(args.config.as_deref())?;
    if let Some(yt_dlp) = &args.yt_dlp {
        config.tools.yt_dlp = yt_dlp.clone();
    }
    if let Some(ffmpeg) = &args.ffmpeg {
        config.tools.ffmpeg = ffmpeg.clone();
    }

    let versions = preflight::run(&config.tools).await?;
    info!(yt_dlp = %versions.yt_dlp, ffmpeg = %versions.ffmpeg, "preflight passed");

    let output = args.output.clone().unwrap_or_else(destination::default_dir);
    let destination = destination::resolve(&output)?;
    if destination.created {
        println!("Created download directory: {}", destination.path.display());
    }

    let mut inputs = args.urls.clone();
    if let Some(path) = &args.input_file {
        let from_file = validate::read_url_file(path)
            .with_context(|| format!("Failed to read URL file {}", path.display()))?;
        inputs.extend(from_file);
    }
    let urls = validate::build_batch(&inputs, &config.allowed_hosts, config.max_urls)?;

    let requests: Vec<DownloadRequest> = urls
        .iter()
        .map(|url| DownloadRequest {
            url: url.clone(),
            destination: destination.path.clone(),
            format: args.format,
            quality: args.quality,
        })
        .collect();

    println!(
        "Downloading {} item(s) to {} ({:?}, {}), one at a time",
        requests.len(),
        destination.path.display(),
        args.format,
        args.quality
    );

    let board = ProgressBoard::new();
    board.register(&urls);
    let reporter = ProgressReporter::new(board.clone(), config.poll_interval()).spawn(urls);

    let orchestrator = Orchestrator::new(YtDlpBackend::new(config.tools.yt_dlp.clone()), config);
    let outcomes = orchestrator.run(&requests, &board).await;

    reporter.await.context("Progress reporter task failed")?;
    debug!(entries = ?board.snapshot(), "final progress");

    report_outcomes(&outcomes)
}

fn report_outcomes(outcomes: &[JobOutcome]) -> Result<()> {
    for outcome in outcomes {
        match outcome {
            JobOutcome::Succeeded { .. } => println!("Saved: {}", outcome.url()),
            JobOutcome::Failed { .. } => eprintln!("Failed: {}", outcome.url()),
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();

    if failed == 0 {
        println!("\nAll downloads completed!");
        return Ok(());
    }

    println!("\nDone: {} success, {} failed", outcomes.len() - failed, failed);
    Err(anyhow!("{} of {} downloads failed", failed, outcomes.len()))
}
