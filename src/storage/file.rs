//! Disk-persisted storage backend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use super::SessionStorage;

/// Storage file name in the storage directory
const STORAGE_FILE: &str = "storage.json";

/// Directory name under the platform cache directory for the default location
const APP_DIR: &str = "sessionguard";

/// Storage backed by a single JSON file (a flat string map).
///
/// The map is held in memory and flushed to disk on every mutation, so the
/// session survives process restarts. The `SessionStorage` contract is
/// infallible: a flush failure is logged at `error` level and reads keep
/// serving the in-memory state.
pub struct FileStorage {
    path: PathBuf,
    items: HashMap<String, String>,
}

impl FileStorage {
    /// Open (or create) the storage file in the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let path = dir.into().join(STORAGE_FILE);
        let items = Self::read_items(&path);
        Self { path, items }
    }

    /// Open the storage file at the platform default location,
    /// `<cache dir>/sessionguard/storage.json`.
    ///
    /// Returns `None` when the platform has no cache directory.
    pub fn default_location() -> Option<Self> {
        dirs::cache_dir().map(|dir| Self::new(dir.join(APP_DIR)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_items(path: &Path) -> HashMap<String, String> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            // Missing file means a fresh store
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&contents) {
            Ok(items) => items,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable storage file, starting empty");
                HashMap::new()
            }
        }
    }

    fn flush(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!(path = %self.path.display(), error = %e, "Failed to create storage directory");
                return;
            }
        }
        let contents = match serde_json::to_string_pretty(&self.items) {
            Ok(contents) => contents,
            Err(e) => {
                error!(error = %e, "Failed to serialize storage");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, contents) {
            error!(path = %self.path.display(), error = %e, "Failed to write storage file");
        }
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.items.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove_item(&mut self, key: &str) {
        if self.items.remove(key).is_some() {
            self.flush();
        }
    }
}
