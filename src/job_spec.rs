//! Translates a request's format and quality into yt-dlp options.

use crate::config::{AudioSettings, DownloaderConfig, ResilienceOptions, VideoSettings};
use crate::models::{DownloadRequest, MediaFormat, QualityTier};
use std::path::Path;

/// Arguments ffmpeg receives when merging video and audio streams.
const VIDEO_POSTPROCESSOR_ARGS: &str = "-c:v copy -c:a aac";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: String,
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub format_selector: String,
    pub output_template: String,
    pub merge_output_format: Option<String>,
    pub postprocessor_args: Option<String>,
    pub audio_extraction: Option<AudioExtraction>,
    pub resilience: ResilienceOptions,
    /// Set only when ffmpeg is not the one found on PATH.
    pub ffmpeg_location: Option<String>,
}

impl JobSpec {
    pub fn for_request(request: &DownloadRequest, config: &DownloaderConfig) -> Self {
        let mut spec = match request.format {
            MediaFormat::Video => Self::video(request.quality, &request.destination, &config.video),
            MediaFormat::Audio => Self::audio(&request.destination, &config.audio),
        };
        spec.resilience = config.resilience.clone();
        if config.tools.ffmpeg != "ffmpeg" {
            spec.ffmpeg_location = Some(config.tools.ffmpeg.clone());
        }
        spec
    }

    pub fn video(quality: QualityTier, destination: &Path, video: &VideoSettings) -> Self {
        let container = &video.container;
        let format_selector = match quality.max_height() {
            Some(height) => format!(
                "bestvideo[height<={height}][ext={container}]+bestaudio[ext={}]/best[ext={container}]",
                video.audio_ext
            ),
            None => format!("best[ext={container}]"),
        };

        Self {
            format_selector,
            output_template: output_template(destination, container),
            merge_output_format: Some(container.clone()),
            postprocessor_args: Some(VIDEO_POSTPROCESSOR_ARGS.to_string()),
            audio_extraction: None,
            resilience: ResilienceOptions::default(),
            ffmpeg_location: None,
        }
    }

    pub fn audio(destination: &Path, audio: &AudioSettings) -> Self {
        Self {
            format_selector: "bestaudio/best".to_string(),
            output_template: output_template(destination, &audio.codec),
            merge_output_format: None,
            postprocessor_args: None,
            audio_extraction: Some(AudioExtraction {
                codec: audio.codec.clone(),
                quality: audio.quality.clone(),
            }),
            resilience: ResilienceOptions::default(),
            ffmpeg_location: None,
        }
    }

    /// Renders the spec as yt-dlp command-line flags, URL excluded.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.format_selector.clone(),
            "-o".to_string(),
            self.output_template.clone(),
        ];

        if let Some(container) = &self.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }

        if let Some(pp_args) = &self.postprocessor_args {
            args.push("--postprocessor-args".to_string());
            args.push(format!("ffmpeg:{}", pp_args));
        }

        if let Some(extraction) = &self.audio_extraction {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(extraction.codec.clone());
            args.push("--audio-quality".to_string());
            args.push(audio_quality_arg(&extraction.quality));
        }

        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.clone());
        }

        let r = &self.resilience;
        args.extend([
            "--retries".to_string(),
            r.retries.to_string(),
            "--fragment-retries".to_string(),
            r.fragment_retries.to_string(),
            "--socket-timeout".to_string(),
            r.socket_timeout_secs.to_string(),
            if r.continue_partial { "--continue" } else { "--no-continue" }.to_string(),
            "--throttled-rate".to_string(),
            r.throttled_rate.to_string(),
            "--sleep-interval".to_string(),
            r.sleep_interval_secs.to_string(),
            "--max-sleep-interval".to_string(),
            r.max_sleep_interval_secs.to_string(),
        ]);

        args
    }
}

fn output_template(destination: &Path, extension: &str) -> String {
    destination
        .join(format!("%(title)s.{}", extension))
        .to_string_lossy()
        .into_owned()
}

// Plain numbers above 10 are bitrates in kbps; 0-10 are VBR levels.
fn audio_quality_arg(quality: &str) -> String {
    match quality.parse::<u32>() {
        Ok(n) if n > 10 => format!("{}K", n),
        _ => quality.to_string(),
    }
}
