//! Local item cache.
//!
//! Items already fetched in an earlier run are kept on disk so the next run
//! only asks the feed service for entries it has not seen. The only eviction
//! signal is "this id is no longer unread", applied through
//! [`CacheHandle::prune`] once per successful fetch.
//!
//! ```text
//! unread ids → get() hits  ─┐
//!            → misses → fetch → put() → prune(all unread ids)
//! ```

mod file;

pub use file::FileCache;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::Item;

/// Either a usable cache or the explicit "do not use the cache" state.
///
/// Failing to create the cache directory disables caching for the run
/// instead of failing it.
#[derive(Debug, Clone)]
pub enum CacheHandle {
    Enabled(FileCache),
    Disabled,
}

impl CacheHandle {
    pub fn initialize(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        match FileCache::open(&base_path) {
            Ok(cache) => {
                info!("Using item cache at {}", base_path.display());
                CacheHandle::Enabled(cache)
            }
            Err(e) => {
                warn!(
                    "Error creating cache directory {}; disabling cache: {}",
                    base_path.display(),
                    e
                );
                CacheHandle::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheHandle::Enabled(_))
    }

    pub fn dir(&self) -> Option<&Path> {
        match self {
            CacheHandle::Enabled(cache) => Some(cache.dir()),
            CacheHandle::Disabled => None,
        }
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        match self {
            CacheHandle::Enabled(cache) => cache.get(id),
            CacheHandle::Disabled => None,
        }
    }

    pub fn put(&self, item: &Item) {
        if let CacheHandle::Enabled(cache) = self {
            cache.put(item);
        }
    }

    pub fn prune(&self, live_ids: &HashSet<String>) -> usize {
        match self {
            CacheHandle::Enabled(cache) => cache.prune(live_ids),
            CacheHandle::Disabled => 0,
        }
    }

    /// Remove every entry.
    pub fn clear(&self) -> usize {
        self.prune(&HashSet::new())
    }
}
