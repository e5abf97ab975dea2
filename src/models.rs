use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum QualityTier {
    #[serde(rename = "best")]
    #[value(name = "best")]
    Best,
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    P720,
    #[serde(rename = "480p")]
    #[value(name = "480p")]
    P480,
    #[serde(rename = "360p")]
    #[value(name = "360p")]
    P360,
}

impl QualityTier {
    /// Height bound for the video stream, `None` for `Best`.
    pub fn max_height(self) -> Option<u32> {
        match self {
            QualityTier::Best => None,
            QualityTier::P720 => Some(720),
            QualityTier::P480 => Some(480),
            QualityTier::P360 => Some(360),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_height() {
            Some(h) => write!(f, "{}p", h),
            None => f.write_str("best"),
        }
    }
}

/// One accepted URL of a batch, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub format: MediaFormat,
    pub quality: QualityTier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded { url: String },
    Failed { url: String, message: String },
}

impl JobOutcome {
    pub fn url(&self) -> &str {
        match self {
            JobOutcome::Succeeded { url } | JobOutcome::Failed { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }
}
