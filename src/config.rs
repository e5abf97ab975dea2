use crate::error::{DlError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    pub tools: ToolPaths,
    /// Host substrings a URL's network location must contain.
    pub allowed_hosts: Vec<String>,
    pub max_urls: usize,
    pub poll_interval_ms: u64,
    pub resilience: ResilienceOptions,
    pub audio: AudioSettings,
    pub video: VideoSettings,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            allowed_hosts: vec!["youtube.com".to_string(), "youtu.be".to_string()],
            max_urls: 5,
            poll_interval_ms: 100,
            resilience: ResilienceOptions::default(),
            audio: AudioSettings::default(),
            video: VideoSettings::default(),
        }
    }
}

impl DownloaderConfig {
    /// Reads the JSON config at `path`, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path).map_err(|source| DlError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| DlError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub yt_dlp: String,
    pub ffmpeg: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

/// Options handed to yt-dlp unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceOptions {
    pub retries: u32,
    pub fragment_retries: u32,
    pub socket_timeout_secs: u64,
    pub continue_partial: bool,
    /// Bytes per second below which yt-dlp treats the transfer as throttled.
    pub throttled_rate: u64,
    pub sleep_interval_secs: u64,
    pub max_sleep_interval_secs: u64,
}

impl Default for ResilienceOptions {
    fn default() -> Self {
        Self {
            retries: 10,
            fragment_retries: 10,
            socket_timeout_secs: 30,
            continue_partial: true,
            throttled_rate: 100_000,
            sleep_interval_secs: 2,
            max_sleep_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub codec: String,
    pub quality: String,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: "mp3".to_string(),
            quality: "192".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub container: String,
    pub audio_ext: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            container: "mp4".to_string(),
            audio_ext: "m4a".to_string(),
        }
    }
}
