//! Sequential batch driver: one yt-dlp run per URL, in submission order.

use crate::config::DownloaderConfig;
use crate::job_spec::JobSpec;
use crate::models::{DownloadRequest, JobOutcome};
use crate::progress::{DONE, ProgressSink};
use crate::ytdlp::{DownloadBackend, HookEvent};
use tracing::info;

/// Progress heuristic used while the total size is unknown but bytes are flowing.
pub const UNKNOWN_SIZE_FRACTION: f64 = 0.5;

/// Maps one hook report to a completion fraction. `None` means the report
/// carries no progress information.
pub fn fraction_for(event: &HookEvent) -> Option<f64> {
    match event.status.as_str() {
        "downloading" => {
            let downloaded = event.downloaded_bytes.unwrap_or(0.0);
            let total = event
                .total_bytes
                .or(event.total_bytes_estimate)
                .filter(|t| *t > 0.0);
            Some(match total {
                Some(total) => (downloaded / total).clamp(0.0, DONE),
                None if event.speed.is_some_and(|s| s > 0.0) => UNKNOWN_SIZE_FRACTION,
                None => 0.0,
            })
        }
        "finished" => Some(DONE),
        _ => None,
    }
}

pub struct Orchestrator<B> {
    backend: B,
    config: DownloaderConfig,
}

impl<B: DownloadBackend> Orchestrator<B> {
    pub fn new(backend: B, config: DownloaderConfig) -> Self {
        Self { backend, config }
    }

    /// Downloads every request strictly one after another. A failed item is
    /// recorded and the batch moves on; each entry ends at 1.0 either way.
    pub async fn run(&self, requests: &[DownloadRequest], sink: &dyn ProgressSink) -> Vec<JobOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());

        for (idx, request) in requests.iter().enumerate() {
            info!(url = %request.url, item = idx + 1, total = requests.len(), "downloading");
            outcomes.push(self.download_one(request, sink).await);
        }

        outcomes
    }

    async fn download_one(&self, request: &DownloadRequest, sink: &dyn ProgressSink) -> JobOutcome {
        let url = request.url.as_str();
        sink.report(url, 0.0);

        let spec = JobSpec::for_request(request, &self.config);
        let hook = |event: HookEvent| {
            if let Some(fraction) = fraction_for(&event) {
                sink.report(url, fraction);
            }
        };

        let outcome = match self.backend.download(url, &spec, &hook).await {
            Ok(()) => {
                info!(url, "download complete");
                JobOutcome::Succeeded {
                    url: url.to_string(),
                }
            }
            Err(e) => {
                // The reporter prints the banner; a log line here would draw over the bars.
                info!(url, error = %e, "download failed");
                let message = format!("Error downloading {}: {}", url, e);
                sink.fail(url, &message);
                JobOutcome::Failed {
                    url: url.to_string(),
                    message,
                }
            }
        };
        sink.report(url, DONE);

        outcome
    }
}
