use crate::error::{DlError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Platform downloads folder, falling back to `~/Downloads`.
pub fn default_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub path: PathBuf,
    pub created: bool,
}

/// Makes sure `path` is a usable directory, creating missing parents.
/// Calling it again on the same path is a no-op check.
pub fn resolve(path: &Path) -> Result<Destination> {
    if path.exists() {
        if !path.is_dir() {
            return Err(DlError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        return Ok(Destination {
            path: path.to_path_buf(),
            created: false,
        });
    }

    fs::create_dir_all(path).map_err(|source| DlError::Destination {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "created download directory");

    Ok(Destination {
        path: path.to_path_buf(),
        created: true,
    })
}
