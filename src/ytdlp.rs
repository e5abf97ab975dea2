//! yt-dlp driven as a subprocess, with its progress hook adapted to
//! in-process callbacks.

use crate::error::{DlError, Result};
use crate::job_spec::JobSpec;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace, warn};

const PROGRESS_MARKER: &str = "ytbdl-progress ";

/// Callback the backend invokes, in order, for every progress report.
pub type ProgressHook<'a> = &'a (dyn Fn(HookEvent) + Send + Sync);

/// One progress report, field-compatible with yt-dlp's progress hook dict.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HookEvent {
    pub status: String,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    pub speed: Option<f64>,
}

#[cfg(test)]
impl HookEvent {
    pub fn downloading(downloaded: f64, total: Option<f64>, speed: Option<f64>) -> Self {
        Self {
            status: "downloading".to_string(),
            downloaded_bytes: Some(downloaded),
            total_bytes: total,
            total_bytes_estimate: None,
            speed,
        }
    }

    pub fn finished() -> Self {
        Self {
            status: "finished".to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait DownloadBackend: Send + Sync {
    /// Downloads one URL, returning once the transfer and any
    /// post-processing are done.
    async fn download(&self, url: &str, spec: &JobSpec, hook: ProgressHook<'_>) -> Result<()>;
}

pub struct YtDlpBackend {
    binary: String,
}

impl YtDlpBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command_args(spec: &JobSpec, url: &str) -> Vec<String> {
        let mut args = spec.to_args();
        args.extend([
            "--newline".to_string(),
            "--no-colors".to_string(),
            "--progress-template".to_string(),
            format!("download:{}%(progress)j", PROGRESS_MARKER),
            "--".to_string(),
            url.to_string(),
        ]);
        args
    }
}

#[async_trait]
impl DownloadBackend for YtDlpBackend {
    async fn download(&self, url: &str, spec: &JobSpec, hook: ProgressHook<'_>) -> Result<()> {
        let args = Self::command_args(spec, url);
        debug!(url, tool = %self.binary, ?args, "spawning yt-dlp");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DlError::Io(std::io::Error::other("yt-dlp stdout was not captured"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            DlError::Io(std::io::Error::other("yt-dlp stderr was not captured"))
        })?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        // Titles echoed on stdout need not be UTF-8, so decode lossily. Only
        // the exit status decides success.
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    match parse_progress_line(&line) {
                        Some(event) => hook(event),
                        None => trace!(url, "yt-dlp> {}", line.trim_end()),
                    }
                }
                Err(e) => {
                    warn!(url, error = %e, "stopped reading yt-dlp output");
                    break;
                }
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(DlError::ToolFailed {
                status: status.to_string(),
                detail: last_error_line(&stderr),
            });
        }

        Ok(())
    }
}

/// Decodes a progress line emitted through our progress template.
pub fn parse_progress_line(line: &str) -> Option<HookEvent> {
    let json = line.trim().strip_prefix(PROGRESS_MARKER)?;
    serde_json::from_str(json).ok()
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VideoSettings;
    use crate::models::QualityTier;
    use std::path::Path;

    #[test]
    fn decodes_downloading_line() {
        let line = r#"ytbdl-progress {"status": "downloading", "downloaded_bytes": 1024, "total_bytes": 4096, "speed": 512.5, "eta": 6, "filename": "x.mp4"}"#;
        let event = parse_progress_line(line).unwrap();
        assert_eq!(event.status, "downloading");
        assert_eq!(event.downloaded_bytes, Some(1024.0));
        assert_eq!(event.total_bytes, Some(4096.0));
        assert_eq!(event.speed, Some(512.5));
    }

    #[test]
    fn decodes_nulls_and_estimates() {
        let line = r#"ytbdl-progress {"status":"downloading","downloaded_bytes":10,"total_bytes":null,"total_bytes_estimate":100.0,"speed":null}"#;
        let event = parse_progress_line(line).unwrap();
        assert_eq!(event.total_bytes, None);
        assert_eq!(event.total_bytes_estimate, Some(100.0));
        assert_eq!(event.speed, None);
    }

    #[test]
    fn ignores_unmarked_and_broken_lines() {
        assert!(parse_progress_line("[youtube] abc123: Downloading webpage").is_none());
        assert!(parse_progress_line("ytbdl-progress {not json").is_none());
    }

    #[test]
    fn url_comes_last_after_separator() {
        let spec = JobSpec::video(QualityTier::P480, Path::new("/tmp"), &VideoSettings::default());
        let args = YtDlpBackend::command_args(&spec, "https://youtu.be/-abc");
        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], "https://youtu.be/-abc");
        assert!(args.contains(&"download:ytbdl-progress %(progress)j".to_string()));
    }

    #[test]
    fn failure_detail_is_last_stderr_line() {
        let stderr = "WARNING: slow\nERROR: Video unavailable\n\n";
        assert_eq!(last_error_line(stderr), "ERROR: Video unavailable");
        assert_eq!(last_error_line(""), "no error output");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_becomes_tool_failed() {
        let backend = YtDlpBackend::new("false");
        let spec = JobSpec::video(QualityTier::Best, Path::new("/tmp"), &VideoSettings::default());
        let err = backend
            .download("https://youtu.be/abc", &spec, &|_: HookEvent| {})
            .await
            .unwrap_err();
        assert!(matches!(err, DlError::ToolFailed { .. }));
    }

    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("yt-dlp");
        std::fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn progress_lines_reach_the_hook_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ytdlp(
            dir.path(),
            r#"echo '[youtube] abc123: Downloading webpage'
printf 'ytbdl-progress {"status":"downloading","downloaded_bytes":25,"total_bytes":100,"speed":5}\n'
printf 'ytbdl-progress {"status":"downloading","downloaded_bytes":75,"total_bytes":100,"speed":5}\n'
printf 'ytbdl-progress {"status":"finished"}\n'
exit 0
"#,
        );

        let seen = std::sync::Mutex::new(Vec::new());
        let hook = |event: HookEvent| seen.lock().unwrap().push(event);
        let spec = JobSpec::video(QualityTier::Best, dir.path(), &VideoSettings::default());

        YtDlpBackend::new(binary)
            .download("https://youtu.be/abc123", &spec, &hook)
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        let statuses: Vec<&str> = seen.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["downloading", "downloading", "finished"]);
        assert_eq!(seen[0].downloaded_bytes, Some(25.0));
        assert_eq!(seen[1].downloaded_bytes, Some(75.0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_output_does_not_fail_the_download() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ytdlp(
            dir.path(),
            r#"printf '[download] Destination: caf\351.mp4\n'
printf 'ytbdl-progress {"status":"downloading","downloaded_bytes":50,"total_bytes":100}\n'
printf 'ytbdl-progress {"status":"finished"}\n'
exit 0
"#,
        );

        let seen = std::sync::Mutex::new(Vec::new());
        let hook = |event: HookEvent| seen.lock().unwrap().push(event.status);
        let spec = JobSpec::video(QualityTier::Best, dir.path(), &VideoSettings::default());

        YtDlpBackend::new(binary)
            .download("https://youtu.be/abc123", &spec, &hook)
            .await
            .unwrap();

        assert_eq!(seen.into_inner().unwrap(), vec!["downloading", "finished"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_script_reports_last_stderr_line() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ytdlp(dir.path(), "echo 'ERROR: Video unavailable' >&2\nexit 1\n");
        let spec = JobSpec::audio(dir.path(), &crate::config::AudioSettings::default());

        let err = YtDlpBackend::new(binary)
            .download("https://youtu.be/gone", &spec, &|_: HookEvent| {})
            .await
            .unwrap_err();
        match err {
            DlError::ToolFailed { detail, .. } => assert_eq!(detail, "ERROR: Video unavailable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
