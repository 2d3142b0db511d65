//! Lookup service façade
//!
//! ```text
//! lookup(request)
//!   └─ validate ─ cache key ─┬─ HIT  ──────────────────────────────────────────┐
//!                            └─ MISS ─ build query ─ execute ─ adjust ─ cache ─┴─ respond
//! ```
//!
//! Concurrent misses on the same key are not coalesced: each one executes
//! its own backend query. A miss whose backend read overlaps a cache
//! invalidation still answers its caller but is not cached.

use oxigraph::model::NamedNode;
use std::sync::Arc;

use crate::cache::{CacheRegistry, CacheSpec, LookupCache};
use crate::errors::{LookupError, Result};
use crate::lookup::cache_key::create_cache_key;
use crate::lookup::model::{
    local_name, DatasetDescriptor, EntityType, LookupCandidate, LookupProperty, LookupQuery, LookupRequest,
    LookupResponse,
};
use crate::lookup::score::{adjust_scores, ScoreOptions};
use crate::sparql::query::{
    available_entity_types_query, FtsQueryBuilder, LookupQueryBuilder, QueryEngine, QueryRow, RegexQueryBuilder,
    SparqlQuery, RDFS_COMMENT, RDFS_LABEL,
};
use crate::sparql::TripleStoreConnection;

/// A named entity lookup backend
pub trait LookupService: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked candidates for one request
    fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse>;

    /// Distinct indexed entity types (never cached)
    fn available_entity_types(&self) -> Result<Vec<EntityType>>;
}

/// Per-service settings
#[derive(Debug, Clone)]
pub struct LookupServiceOptions {
    pub query_engine: QueryEngine,
    pub key_predicates: Vec<String>,
    /// Projected as the candidate description, empty disables it
    pub description_predicates: Vec<String>,
    pub score: Option<ScoreOptions>,
    pub cache_spec: CacheSpec,
    pub dataset: Option<DatasetDescriptor>,
    pub allow_empty_query: bool,
    pub min_relevance: f64,
    pub match_all_terms: bool,
}

impl Default for LookupServiceOptions {
    fn default() -> Self {
        Self {
            query_engine: QueryEngine::Regex,
            key_predicates: vec![RDFS_LABEL.to_string()],
            description_predicates: vec![RDFS_COMMENT.to_string()],
            score: None,
            cache_spec: CacheSpec::default(),
            dataset: None,
            allow_empty_query: false,
            min_relevance: 0.0,
            match_all_terms: true,
        }
    }
}

/// Query builder for the configured engine
pub fn query_builder(options: &LookupServiceOptions) -> Box<dyn LookupQueryBuilder> {
    match options.query_engine {
        QueryEngine::Regex => Box::new(
            RegexQueryBuilder::new(options.key_predicates.clone())
                .with_description_predicates(options.description_predicates.clone()),
        ),
        QueryEngine::Fts => Box::new(
            FtsQueryBuilder::new(
                options.key_predicates.clone(),
                options.min_relevance,
                options.match_all_terms,
            )
            .with_description_predicates(options.description_predicates.clone()),
        ),
    }
}

/// Lookup service answering from a SPARQL repository
pub struct SparqlLookupService {
    name: String,
    connection: Arc<dyn TripleStoreConnection>,
    builder: Box<dyn LookupQueryBuilder>,
    options: LookupServiceOptions,
    cache: Option<Arc<LookupCache>>,
}

impl SparqlLookupService {
    /// Create a service; its cache (if any) joins `caches`
    pub fn new(
        name: impl Into<String>,
        connection: Arc<dyn TripleStoreConnection>,
        options: LookupServiceOptions,
        caches: &CacheRegistry,
    ) -> Self {
        let name = name.into();

        let builder = query_builder(&options);
        let cache = options.cache_spec.policy().map(|policy| {
            let cache = Arc::new(LookupCache::new(policy.clone()));
            caches.register(&cache);
            cache
        });

        tracing::info!(
            service = %name,
            engine = ?options.query_engine,
            cache_spec = %options.cache_spec,
            "Lookup service created"
        );

        Self {
            name,
            connection,
            builder,
            options,
            cache,
        }
    }

    /// Replace the query builder (custom dialects)
    pub fn with_query_builder(mut self, builder: Box<dyn LookupQueryBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Response cache, `None` when the cache spec is `none`
    pub fn cache(&self) -> Option<&LookupCache> {
        self.cache.as_deref()
    }

    pub fn options(&self) -> &LookupServiceOptions {
        &self.options
    }

    /// Reject queries that can never produce a valid SPARQL request
    pub fn validate(&self, query: &LookupQuery) -> Result<()> {
        if query.limit() == 0 {
            return Err(LookupError::InvalidQuery("limit must be greater than zero".to_string()));
        }

        if let Some(entity_type) = query.entity_type() {
            check_iri("type", entity_type)?;
        }

        for property in query.properties() {
            check_iri("property", property.property())?;
            if let LookupProperty::Object { entity, .. } = property {
                check_iri("property value", entity)?;
            }
        }

        if query.is_empty() && !self.options.allow_empty_query {
            return Err(LookupError::InvalidQuery(
                "query needs a search token, a type or a property filter".to_string(),
            ));
        }

        Ok(())
    }

    /// SPARQL this service would send for a query
    pub fn build_query(&self, query: &LookupQuery) -> SparqlQuery {
        self.builder.build(query)
    }

    fn execute(&self, query: &LookupQuery) -> Result<Vec<LookupCandidate>> {
        let sparql = self.build_query(query);
        tracing::trace!(service = %self.name, query = %sparql.as_str(), bindings = ?sparql.bindings(), "Executing lookup query");

        let rows = self.connection.select(&sparql).map_err(|e| {
            tracing::warn!(service = %self.name, error = %e, "Lookup query failed");
            match e {
                LookupError::Processing(_) => e,
                other => LookupError::Processing(other.to_string()),
            }
        })?;

        rows.iter()
            .filter(|row| row.contains_key("candidate"))
            .map(|row| self.candidate_from_row(row))
            .collect()
    }

    fn candidate_from_row(&self, row: &QueryRow) -> Result<LookupCandidate> {
        let id = row.get("candidate").cloned().unwrap_or_default();

        let name = row
            .get("name")
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| local_name(&id).to_string());

        let types: Vec<EntityType> = row
            .get("types")
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(EntityType::from_iri)
                    .collect()
            })
            .unwrap_or_default();

        let score = match row.get("score") {
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| LookupError::Processing(format!("Score '{}' of {} is not numeric", raw, id)))?,
            None => 0.0,
        };

        let description = row.get("description").filter(|d| !d.is_empty()).cloned();

        // regex scores are 0 only when the label has exactly the token's length
        let matched = self.options.query_engine == QueryEngine::Regex && score == 0.0;

        Ok(LookupCandidate::new(id, name, score)
            .with_types(types)
            .with_match(matched)
            .with_dataset(self.options.dataset.clone())
            .with_description(description))
    }
}

fn check_iri(what: &str, value: &str) -> Result<()> {
    NamedNode::new(value)
        .map(|_| ())
        .map_err(|e| LookupError::InvalidQuery(format!("Malformed {} IRI '{}': {}", what, value, e)))
}

impl LookupService for SparqlLookupService {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse> {
        self.validate(&request.query)?;
        let key = create_cache_key(&request.query);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key) {
                return Ok(cached.for_query(&request.query_id));
            }
        }

        let generation = self.cache.as_ref().map(|cache| cache.generation());
        let candidates = self.execute(&request.query)?;
        let candidates = adjust_scores(&candidates, self.options.score.as_ref());
        let response = LookupResponse::new(request.query_id.clone(), candidates);

        if let (Some(cache), Some(generation)) = (&self.cache, generation) {
            cache.insert_if_current(key, Arc::new(response.clone()), generation);
        }

        tracing::debug!(
            service = %self.name,
            query_id = %request.query_id,
            candidates = response.candidates.len(),
            "Lookup answered from backend"
        );

        Ok(response)
    }

    fn available_entity_types(&self) -> Result<Vec<EntityType>> {
        let query = available_entity_types_query(&self.options.key_predicates);
        tracing::trace!(service = %self.name, query = %query.as_str(), "Fetching entity types");

        let rows = self
            .connection
            .select(&query)
            .map_err(|e| LookupError::TypeFetch(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("type")?.clone();
                let name = row
                    .get("name")
                    .filter(|n| !n.is_empty())
                    .cloned()
                    .unwrap_or_else(|| local_name(&id).to_string());
                Some(EntityType::new(id, name))
            })
            .collect())
    }
}
