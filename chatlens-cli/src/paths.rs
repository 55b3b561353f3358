use anyhow::{anyhow, Result};
use chatlens_core::storage::{ClassificationStorage, FileStorage, NoOpStorage};
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_DIR: &str = "chatlens";

/// Per-user data directory for chatlens
pub fn get_data_dir() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let base = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine local data directory"))?;
        Ok(base.join(APP_DIR))
    }

    // ~/.local/share/chatlens on macOS too, not ~/Library/Application Support
    #[cfg(not(windows))]
    {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
        Ok(home.join(".local").join("share").join(APP_DIR))
    }
}

/// Where classification results are persisted between runs
pub fn default_cache_dir() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("cache"))
}

/// Storage for classification results.
///
/// Results live only for the current run unless `persist` is set; then they
/// go to `cache_dir` (or the default cache dir). An unusable directory falls
/// back to no persistence with a warning.
pub fn select_storage(persist: bool, cache_dir: Option<&Path>) -> Result<Box<dyn ClassificationStorage>> {
    if !persist {
        return Ok(Box::new(NoOpStorage::new()));
    }
    let cache_dir = match cache_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_cache_dir()?,
    };
    match FileStorage::new(&cache_dir) {
        Ok(storage) => Ok(Box::new(storage)),
        Err(e) => {
            warn!("Cache directory {} unavailable, continuing without cache: {}", cache_dir.display(), e);
            Ok(Box::new(NoOpStorage::new()))
        }
    }
}
