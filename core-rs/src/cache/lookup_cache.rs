//! Concurrent response cache for one lookup service
//!
//! Backed by `moka::sync::Cache` with the LRU eviction policy, so a
//! size-bounded cache always drops the least recently used response.
//!
//! Every `invalidate_all` starts a new generation. A response computed from
//! a backend read that began in an older generation is discarded instead of
//! cached, so nothing read before an invalidation is served after it.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::cache::spec::{CachePolicy, MAX_EXPIRY};
use crate::lookup::model::LookupResponse;

pub struct LookupCache {
    inner: Cache<String, Arc<LookupResponse>>,
    policy: CachePolicy,
    generation: RwLock<u64>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LookupCache {
    pub fn new(policy: CachePolicy) -> Self {
        let mut builder = Cache::builder().eviction_policy(EvictionPolicy::lru());

        if let Some(size) = policy.maximum_size {
            builder = builder.max_capacity(size);
        }
        if let Some(capacity) = policy.initial_capacity {
            builder = builder.initial_capacity(capacity);
        }
        // policies built in code skip the parser's expiry check
        if let Some(ttl) = policy.expire_after_write {
            builder = builder.time_to_live(ttl.min(MAX_EXPIRY));
        }
        if let Some(tti) = policy.expire_after_access {
            builder = builder.time_to_idle(tti.min(MAX_EXPIRY));
        }

        tracing::debug!(
            maximum_size = ?policy.maximum_size,
            expire_after_write = ?policy.expire_after_write,
            expire_after_access = ?policy.expire_after_access,
            "Lookup cache initialized"
        );

        Self {
            inner: builder.build(),
            policy,
            generation: RwLock::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn get(&self, key: &str) -> Option<Arc<LookupResponse>> {
        match self.inner.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "Lookup cache HIT");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "Lookup cache MISS");
                None
            }
        }
    }

    pub fn insert(&self, key: String, value: Arc<LookupResponse>) {
        self.inner.insert(key, value);
        if self.policy.maximum_size.is_some() {
            // evict now rather than on moka's housekeeping schedule
            self.inner.run_pending_tasks();
        }
    }

    /// Current generation, captured before reading the backend
    pub fn generation(&self) -> u64 {
        *self.generation.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert unless `invalidate_all` ran since `generation` was captured
    ///
    /// Returns whether the response was cached.
    pub fn insert_if_current(&self, key: String, value: Arc<LookupResponse>, generation: u64) -> bool {
        let current = self.generation.read().unwrap_or_else(|e| e.into_inner());
        if *current != generation {
            tracing::debug!(key = %key, "Discarding response read before cache invalidation");
            return false;
        }
        self.insert(key, value);
        true
    }

    /// Entries inserted before this call are never returned afterwards,
    /// nor are responses whose backend read started before it
    pub fn invalidate_all(&self) {
        let mut generation = self.generation.write().unwrap_or_else(|e| e.into_inner());
        *generation = generation.wrapping_add(1);
        self.inner.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupCache")
            .field("policy", &self.policy)
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
