//! # Lookup Core - SPARQL entity lookup and reconciliation
//!
//! Answers "which entities match this text?" against RDF repositories.
//! A lookup names a search token plus optional type, property filters and
//! a result limit; the answer is a ranked list of candidates.
//!
//! ## Architecture
//!
//! ```text
//!   LookupRequest
//!        │
//!        ▼
//! ┌───────────────────────┐    ┌─────────────────────┐
//! │ LookupServiceRegistry │───▶│ SparqlLookupService │───▶ LookupCache (moka)
//! └───────────────────────┘    └──────────┬──────────┘          ▲
//!                                         │ SparqlQuery         │ invalidate_all
//!                                         ▼                     │
//!                             ┌───────────────────────┐  ┌──────┴────────┐
//!                             │ TripleStoreConnection │  │ CacheRegistry │
//!                             │  (oxigraph / RDF4J)   │  └───────────────┘
//!                             └───────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - Query builders for REGEX and Blazegraph full-text search dialects
//! - User values travel as pre-bound variables, never inlined in query text
//! - Order-independent cache keys with Guava style cache policy strings
//! - Linear score boosting per service
//! - Reconciliation Service API batch format

pub mod errors;
pub mod sparql;
pub mod cache;
pub mod lookup;
pub mod config;

pub use errors::{LookupError, Result};
pub use sparql::{
    available_entity_types_query, FtsQueryBuilder, LookupQueryBuilder, MemoryStore, QueryEngine, QueryRow,
    Rdf4jHttpConnection, RegexQueryBuilder, SparqlQuery, TripleStoreConnection,
};
pub use cache::{CacheRegistry, CacheSpec, LookupCache};
pub use lookup::{
    adjust_scores, create_cache_key, DatasetDescriptor, EntityType, LookupCandidate, LookupProperty, LookupQuery,
    LookupRequest, LookupResponse, LookupService, LookupServiceOptions, LookupServiceRegistry, ScoreOptions,
    SparqlLookupService, Strictness,
};
pub use config::LookupConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
