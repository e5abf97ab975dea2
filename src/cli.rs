use crate::models::{MediaFormat, QualityTier};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "yt-batch-dl")]
#[command(author, version, about = "Download YouTube videos or audio, one URL at a time", long_about = None)]
pub struct Args {
    /// Video URLs to download, in order
    pub urls: Vec<String>,

    /// File with one URL per line, appended after the positional URLs
    #[arg(short, long)]
    pub input_file: Option<PathBuf>,

    /// Output directory (default: your Downloads folder)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Video quality
    #[arg(short, long, value_enum, default_value = "best")]
    pub quality: QualityTier,

    /// Save as video or extract audio
    #[arg(short, long, value_enum, default_value = "video")]
    pub format: MediaFormat,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp")]
    pub yt_dlp: Option<String>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
