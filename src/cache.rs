// In-memory memo of fetched listings, keyed by the canonical query.
// Unbounded and never expires: entries live until the process restarts.

use cached::{Cached, UnboundCache};
use std::sync::{Arc, Mutex};

use crate::models::ListingSet;
use crate::query::CacheKey;

pub struct QueryCache {
    entries: Mutex<UnboundCache<CacheKey, Arc<ListingSet>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(UnboundCache::new()) }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ListingSet>> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.cache_get(key).cloned()
    }

    /// Stores a listing set. An existing entry for the key is kept as is.
    pub fn put(&self, key: CacheKey, listings: ListingSet) -> Arc<ListingSet> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(entries.cache_get_or_set_with(key, || Arc::new(listings)))
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.cache_size()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
