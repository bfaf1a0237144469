use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::Item;

const ENTRY_EXTENSION: &str = "json";

/// On-disk layout of one cache file.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    item: Item,
}

/// One JSON file per item id inside a single directory.
///
/// Every failure is logged and swallowed: a broken entry is a cache miss,
/// a failed write just means the item gets fetched again next run.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create the cache directory (and parents) if needed.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for an item id. Ids are opaque, so they are hashed rather
    /// than trusted as path components.
    pub fn entry_file_name(id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(id.as_bytes());
        format!("{}.{}", hex::encode(hasher.finalize()), ENTRY_EXTENSION)
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.dir.join(Self::entry_file_name(id))
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        let path = self.entry_path(id);
        if !path.exists() {
            return None;
        }

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Error reading cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unparsable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.item.id() != id {
            warn!(
                "Cache entry {} holds item {} instead of {}",
                path.display(),
                entry.item.id(),
                id
            );
            return None;
        }

        debug!("Cache hit for item {} (cached at {})", id, entry.cached_at);
        Some(entry.item)
    }

    pub fn put(&self, item: &Item) {
        let path = self.entry_path(item.id());
        let entry = CacheEntry {
            cached_at: Utc::now(),
            item: item.clone(),
        };

        let data = match serde_json::to_vec(&entry) {
            Ok(data) => data,
            Err(e) => {
                warn!("Error serializing item {} for cache: {}", item.id(), e);
                return;
            }
        };

        if let Err(e) = fs::write(&path, data) {
            warn!("Error writing cache entry {}: {}", path.display(), e);
        }
    }

    /// Delete every entry whose id is not in `live_ids`. Returns how many
    /// entries were removed.
    pub fn prune(&self, live_ids: &HashSet<String>) -> usize {
        let keep: HashSet<String> = live_ids
            .iter()
            .map(|id| Self::entry_file_name(id))
            .collect();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Error listing cache directory {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let stale: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| !keep.contains(name))
            })
            .collect();

        if !stale.is_empty() {
            debug!("Cleaning up {} old items from cache", stale.len());
        }

        let mut removed = 0;
        for path in stale {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Error removing obsolete cache file {}: {}", path.display(), e),
            }
        }

        removed
    }
}
