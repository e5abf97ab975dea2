//! Startup gate: both external executables must answer a version query
//! before any input is accepted.

use crate::config::ToolPaths;
use crate::error::{DlError, Result};
use std::io::ErrorKind;
use tokio::process::Command;
use tracing::debug;

pub const YT_DLP_HINT: &str = "Please install it using: pip install yt-dlp";
pub const FFMPEG_HINT: &str = "Please install it first:\n  Windows: choco install ffmpeg\n  Mac: brew install ffmpeg\n  Linux: sudo apt install ffmpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersions {
    pub yt_dlp: String,
    pub ffmpeg: String,
}

/// Checks yt-dlp first, then ffmpeg. The first failure aborts the run.
pub async fn run(tools: &ToolPaths) -> Result<ToolVersions> {
    let yt_dlp = check_tool(&tools.yt_dlp, "--version", YT_DLP_HINT).await?;
    let ffmpeg = check_tool(&tools.ffmpeg, "-version", FFMPEG_HINT).await?;
    Ok(ToolVersions { yt_dlp, ffmpeg })
}

/// Runs `binary version_arg` and returns the first line it prints.
pub async fn check_tool(binary: &str, version_arg: &str, hint: &str) -> Result<String> {
    debug!(tool = binary, "checking executable");

    let output = match Command::new(binary).arg(version_arg).output().await {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied => {
            return Err(DlError::MissingTool {
                tool: binary.to_string(),
                hint: hint.to_string(),
            });
        }
        Err(e) => return Err(DlError::Io(e)),
    };

    if !output.status.success() {
        return Err(DlError::ToolUnhealthy {
            tool: binary.to_string(),
            status: output.status.to_string(),
            hint: hint.to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}
