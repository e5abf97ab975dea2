use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DlError>;

#[derive(Error, Debug)]
pub enum DlError {
    #[error("{tool} is not installed. {hint}")]
    MissingTool { tool: String, hint: String },

    #[error("{tool} is installed but its version query exited with {status}. {hint}")]
    ToolUnhealthy {
        tool: String,
        status: String,
        hint: String,
    },

    #[error("Cannot create directory {}. Please choose a valid location", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exists but is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Please enter at least one URL")]
    EmptyBatch,

    #[error("Too many URLs: {count} given, at most {max} per batch")]
    TooManyUrls { count: usize, max: usize },

    #[error("Invalid URLs: {}", urls.join(", "))]
    InvalidUrls { urls: Vec<String> },

    #[error("Failed to read config file {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("yt-dlp exited with {status}: {detail}")]
    ToolFailed {
        status: String,
        detail: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
