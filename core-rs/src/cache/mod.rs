//! Cache module for lookup responses
//!
//! - spec: Guava/Caffeine style policy strings (`maximumSize=3`, `none`)
//! - lookup_cache: per-service concurrent cache (moka, LRU)
//! - registry: shared invalidate-all signal across services

pub mod lookup_cache;
pub mod registry;
pub mod spec;

pub use lookup_cache::LookupCache;
pub use registry::CacheRegistry;
pub use spec::{CachePolicy, CacheSpec, DEFAULT_CACHE_SPEC, MAX_EXPIRY, NO_CACHE};
