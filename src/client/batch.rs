use std::collections::HashSet;

use crate::cache::CacheHandle;
use crate::domain::Item;

/// How one set of unread ids will be satisfied: some from the cache, the
/// rest from consecutive bounded-size fetches.
#[derive(Debug, Default)]
pub struct BatchPlan {
    pub cached: Vec<Item>,
    pub batches: Vec<Vec<String>>,
}

impl BatchPlan {
    /// Partition `ids` into cache hits and fetch batches of at most
    /// `batch_size`, keeping list order. Duplicate ids are planned once.
    pub fn build(ids: &[String], cache: &CacheHandle, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let mut seen = HashSet::with_capacity(ids.len());
        let mut cached = Vec::new();
        let mut to_fetch = Vec::new();

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match cache.get(id) {
                Some(item) => cached.push(item),
                None => to_fetch.push(id.clone()),
            }
        }

        let batches = to_fetch
            .chunks(batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        Self { cached, batches }
    }

    pub fn fetch_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}
