//! Shared per-URL progress map and the terminal reporter that polls it.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DONE: f64 = 1.0;

/// Receives `(url, fraction)` updates from the orchestrator.
pub trait ProgressSink: Send + Sync {
    fn report(&self, url: &str, fraction: f64);

    /// Records why `url` failed. Sent before the final 1.0.
    fn fail(&self, _url: &str, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub url: String,
    pub fraction: f64,
    pub error: Option<String>,
}

/// Submission-ordered progress entries, one per URL.
///
/// Cloning yields another handle to the same entries.
#[derive(Debug, Clone, Default)]
pub struct ProgressBoard {
    entries: Arc<Mutex<Vec<ProgressEntry>>>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProgressEntry>> {
        // Entries stay consistent even if a writer panicked mid-update.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a 0.0 entry for every URL not already present.
    pub fn register<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = self.lock();
        for url in urls {
            let url = url.as_ref();
            if !entries.iter().any(|e| e.url == url) {
                entries.push(ProgressEntry {
                    url: url.to_string(),
                    fraction: 0.0,
                    error: None,
                });
            }
        }
    }

    pub fn get(&self, url: &str) -> Option<f64> {
        self.lock().iter().find(|e| e.url == url).map(|e| e.fraction)
    }

    pub fn failure(&self, url: &str) -> Option<String> {
        self.lock().iter().find(|e| e.url == url).and_then(|e| e.error.clone())
    }

    pub fn snapshot(&self) -> Vec<ProgressEntry> {
        self.lock().clone()
    }
}

impl ProgressSink for ProgressBoard {
    fn report(&self, url: &str, fraction: f64) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, DONE) };
        let mut entries = self.lock();
        match entries.iter_mut().find(|e| e.url == url) {
            // Never move backwards; a second stream restarting at 0 keeps the bar where it was.
            Some(entry) => entry.fraction = entry.fraction.max(fraction),
            None => entries.push(ProgressEntry {
                url: url.to_string(),
                fraction,
                error: None,
            }),
        }
    }

    fn fail(&self, url: &str, message: &str) {
        let mut entries = self.lock();
        match entries.iter_mut().find(|e| e.url == url) {
            Some(entry) => entry.error = Some(message.to_string()),
            None => entries.push(ProgressEntry {
                url: url.to_string(),
                fraction: 0.0,
                error: Some(message.to_string()),
            }),
        }
    }
}

/// Renders a [`ProgressBoard`] as one bar per URL. Read-only.
pub struct ProgressReporter {
    board: ProgressBoard,
    mp: MultiProgress,
    interval: Duration,
}

impl ProgressReporter {
    pub fn new(board: ProgressBoard, interval: Duration) -> Self {
        Self {
            board,
            mp: MultiProgress::new(),
            interval,
        }
    }

    #[cfg(test)]
    pub fn hidden(board: ProgressBoard, interval: Duration) -> Self {
        Self {
            board,
            mp: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            interval,
        }
    }

    /// Polls each URL in order until it reaches 1.0, printing the error
    /// banner above the bars for items that failed. The task ends once the
    /// last URL is done.
    pub fn spawn(self, urls: Vec<String>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(urls).await })
    }

    async fn run(self, urls: Vec<String>) {
        let style = ProgressStyle::default_bar()
            .template("{msg:40} {bar:40} {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");

        let bars: Vec<ProgressBar> = urls
            .iter()
            .enumerate()
            .map(|(idx, url)| {
                let pb = self.mp.add(ProgressBar::new(100));
                pb.set_style(style.clone());
                pb.set_message(format!("[{}] {}", idx + 1, url));
                pb
            })
            .collect();

        for (url, pb) in urls.iter().zip(&bars) {
            loop {
                let fraction = self.board.get(url).unwrap_or(0.0);
                pb.set_position(to_percent(fraction));
                if fraction >= DONE {
                    break;
                }
                tokio::time::sleep(self.interval).await;
            }
            match self.board.failure(url) {
                Some(message) => {
                    pb.abandon_with_message(format!("{} failed", pb.message()));
                    let _ = self.mp.println(message);
                }
                None => pb.finish_with_message(format!("{} done", pb.message())),
            }
        }
    }
}

fn to_percent(fraction: f64) -> u64 {
    (fraction.clamp(0.0, DONE) * 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_creates_zero_entries_in_order() {
        let board = ProgressBoard::new();
        board.register(&["b", "a", "b"]);
        let snapshot = board.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].url, "b");
        assert_eq!(snapshot[1].url, "a");
        assert!(snapshot.iter().all(|e| e.fraction == 0.0));
    }

    #[test]
    fn report_clamps_and_never_regresses() {
        let board = ProgressBoard::new();
        board.register(&["u"]);

        board.report("u", 0.4);
        board.report("u", 0.1);
        assert_eq!(board.get("u"), Some(0.4));

        board.report("u", 7.0);
        assert_eq!(board.get("u"), Some(1.0));

        board.report("u", 0.0);
        assert_eq!(board.get("u"), Some(1.0));
    }

    #[test]
    fn nan_is_treated_as_zero() {
        let board = ProgressBoard::new();
        board.report("u", f64::NAN);
        assert_eq!(board.get("u"), Some(0.0));
    }

    #[test]
    fn clones_share_entries() {
        let board = ProgressBoard::new();
        let other = board.clone();
        other.report("u", 0.5);
        assert_eq!(board.get("u"), Some(0.5));
    }

    #[test]
    fn percent_rounding() {
        assert_eq!(to_percent(0.0), 0);
        assert_eq!(to_percent(0.333), 33);
        assert_eq!(to_percent(1.0), 100);
    }

    #[test]
    fn failure_is_kept_alongside_progress() {
        let board = ProgressBoard::new();
        board.register(&["u", "v"]);
        board.fail("u", "Error downloading u: boom");
        board.report("u", 1.0);

        assert_eq!(board.failure("u").as_deref(), Some("Error downloading u: boom"));
        assert_eq!(board.get("u"), Some(1.0));
        assert_eq!(board.failure("v"), None);
    }

    #[tokio::test]
    async fn reporter_finishes_failed_items_too() {
        let board = ProgressBoard::new();
        let urls = vec!["bad".to_string(), "good".to_string()];
        board.register(&urls);
        let reporter = ProgressReporter::hidden(board.clone(), Duration::from_millis(5)).spawn(urls);

        board.fail("bad", "Error downloading bad: boom");
        board.report("bad", 1.0);
        board.report("good", 1.0);

        tokio::time::timeout(Duration::from_secs(2), reporter)
            .await
            .expect("reporter should stop")
            .unwrap();
        assert_eq!(board.failure("bad").as_deref(), Some("Error downloading bad: boom"));
    }

    #[tokio::test]
    async fn reporter_finishes_once_every_entry_is_done() {
        let board = ProgressBoard::new();
        let urls = vec!["one".to_string(), "two".to_string()];
        board.register(&urls);

        let reporter = ProgressReporter::hidden(board.clone(), Duration::from_millis(5)).spawn(urls);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reporter.is_finished());

        board.report("one", 1.0);
        board.report("two", 0.5);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reporter.is_finished());

        board.report("two", 1.0);
        tokio::time::timeout(Duration::from_secs(2), reporter)
            .await
            .expect("reporter should stop")
            .unwrap();

        assert_eq!(board.get("one"), Some(1.0));
        assert_eq!(board.get("two"), Some(1.0));
    }
}
