//! Entity lookup
//!
//! - model: queries, candidates and responses
//! - cache_key: deterministic response cache keys
//! - score: linear score boosting
//! - service: the cached SPARQL lookup façade
//! - registry: named services with a default
//! - reconciliation: Reconciliation Service API batch format

pub mod cache_key;
pub mod model;
pub mod reconciliation;
pub mod registry;
pub mod score;
pub mod service;

pub use cache_key::create_cache_key;
pub use model::{
    local_name, DatasetDescriptor, EntityType, LookupCandidate, LookupProperty, LookupQuery, LookupRequest,
    LookupResponse, Strictness, DEFAULT_LIMIT,
};
pub use reconciliation::{batch_results, batch_results_json, parse_batch, ReconciliationQuery};
pub use registry::LookupServiceRegistry;
pub use score::{adjust_scores, ScoreOptions};
pub use service::{query_builder, LookupService, LookupServiceOptions, SparqlLookupService};
