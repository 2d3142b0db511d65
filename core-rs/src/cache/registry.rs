//! Registry of lookup caches sharing one invalidation signal
//!
//! Every service cache registers here when it is built. Writes against the
//! underlying repositories call `invalidate_all`, which clears every live
//! cache before returning.

use std::sync::{Arc, RwLock, Weak};

use crate::cache::lookup_cache::LookupCache;

#[derive(Debug, Default)]
pub struct CacheRegistry {
    caches: RwLock<Vec<Weak<LookupCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, cache: &Arc<LookupCache>) {
        let mut caches = self.caches.write().unwrap_or_else(|e| e.into_inner());
        caches.retain(|c| c.strong_count() > 0);
        caches.push(Arc::downgrade(cache));
    }

    /// Clear every registered cache; returns how many were cleared
    pub fn invalidate_all(&self) -> usize {
        let mut caches = self.caches.write().unwrap_or_else(|e| e.into_inner());
        caches.retain(|c| c.strong_count() > 0);

        let mut cleared = 0;
        for cache in caches.iter().filter_map(Weak::upgrade) {
            cache.invalidate_all();
            cleared += 1;
        }

        tracing::info!(cleared, "Invalidated all lookup caches");
        cleared
    }

    /// Number of live registered caches
    pub fn len(&self) -> usize {
        self.caches
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
