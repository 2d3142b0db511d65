/**
 * config.rs
 * Parser for lookup service configuration files (YAML format)
 *
 * Format:
 * ```yaml
 * apiVersion: lookup/v1
 * kind: LookupConfig
 * metadata:
 *   name: demo
 * spec:
 *   defaultService: people
 *   services:
 *     - name: people
 *       queryEngine: regex
 *       repository:
 *         memory:
 *           files: [data/people.ttl]
 *       cacheSpec: maximumSize=1000,expireAfterWrite=10m
 *       score: { multiplier: 1.0, offset: 0.0 }
 * ```
 *
 * Relative repository files resolve against the directory of the config file.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheSpec;
use crate::errors::{LookupError, Result};
use crate::lookup::model::DatasetDescriptor;
use crate::lookup::registry::LookupServiceRegistry;
use crate::lookup::score::ScoreOptions;
use crate::lookup::service::{LookupServiceOptions, SparqlLookupService};
use crate::sparql::query::{QueryEngine, RDFS_COMMENT, RDFS_LABEL};
use crate::sparql::{MemoryStore, Rdf4jHttpConnection, TripleStoreConnection};

pub const API_VERSION: &str = "lookup/v1";
pub const KIND: &str = "LookupConfig";

/// Configuration file looked up by the CLI when none is given
pub const DEFAULT_CONFIG_FILE: &str = "lookup.yaml";

/// Lookup configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LookupConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: Spec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Service answering requests that name none (first service if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_service: Option<String>,
    pub services: Vec<ServiceConfig>,
}

/// In-process oxigraph store loaded from RDF files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MemoryRepository {
    #[serde(default)]
    pub files: Vec<String>,
}

/// Remote repository speaking the RDF4J REST protocol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rdf4jRepository {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Exactly one of `memory` or `rdf4j`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RepositoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryRepository>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdf4j: Option<Rdf4jRepository>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub query_engine: QueryEngine,
    pub repository: RepositoryConfig,
    /// Cache policy string, `none` disables caching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_spec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_predicates: Vec<String>,
    /// Description predicates (rdfs:comment when unset, `[]` disables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_predicates: Option<Vec<String>>,
    #[serde(default)]
    pub allow_empty_query: bool,
    #[serde(default)]
    pub min_relevance: f64,
    #[serde(default = "default_match_all_terms")]
    pub match_all_terms: bool,
}

fn default_match_all_terms() -> bool {
    true
}

impl ServiceConfig {
    /// Service backed by an empty in-memory repository
    pub fn memory(name: impl Into<String>, files: Vec<String>) -> Self {
        ServiceConfig {
            name: name.into(),
            query_engine: QueryEngine::Regex,
            repository: RepositoryConfig {
                memory: Some(MemoryRepository { files }),
                rdf4j: None,
            },
            cache_spec: None,
            score: None,
            dataset: None,
            key_predicates: Vec::new(),
            description_predicates: None,
            allow_empty_query: false,
            min_relevance: 0.0,
            match_all_terms: true,
        }
    }

    pub fn cache_spec(&self) -> Result<CacheSpec> {
        match &self.cache_spec {
            Some(spec) => CacheSpec::parse(spec),
            None => Ok(CacheSpec::default()),
        }
    }

    pub fn options(&self) -> Result<LookupServiceOptions> {
        let key_predicates = if self.key_predicates.is_empty() {
            vec![RDFS_LABEL.to_string()]
        } else {
            self.key_predicates.clone()
        };

        Ok(LookupServiceOptions {
            query_engine: self.query_engine,
            key_predicates,
            description_predicates: self
                .description_predicates
                .clone()
                .unwrap_or_else(|| vec![RDFS_COMMENT.to_string()]),
            score: self.score,
            cache_spec: self.cache_spec()?,
            dataset: self.dataset.clone(),
            allow_empty_query: self.allow_empty_query,
            min_relevance: self.min_relevance,
            match_all_terms: self.match_all_terms,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LookupError::ValidationError("service name cannot be empty".to_string()));
        }

        match (&self.repository.memory, &self.repository.rdf4j) {
            (Some(_), None) => {}
            (None, Some(rdf4j)) => {
                if rdf4j.url.trim().is_empty() {
                    return Err(LookupError::ValidationError(format!(
                        "service '{}': rdf4j url cannot be empty",
                        self.name
                    )));
                }
            }
            _ => {
                return Err(LookupError::ValidationError(format!(
                    "service '{}': repository needs exactly one of memory or rdf4j",
                    self.name
                )));
            }
        }

        self.cache_spec()
            .map_err(|e| LookupError::ValidationError(format!("service '{}': {}", self.name, e)))?;

        if !(0.0..=1.0).contains(&self.min_relevance) {
            return Err(LookupError::ValidationError(format!(
                "service '{}': minRelevance must be between 0 and 1, got {}",
                self.name, self.min_relevance
            )));
        }

        Ok(())
    }

    fn connect(&self, base_dir: &Path) -> Result<Arc<dyn TripleStoreConnection>> {
        if let Some(rdf4j) = &self.repository.rdf4j {
            let timeout = rdf4j.timeout_seconds.map(Duration::from_secs);
            return Ok(Arc::new(Rdf4jHttpConnection::new(rdf4j.url.clone(), timeout)?));
        }

        let store = MemoryStore::new()?;
        if let Some(memory) = &self.repository.memory {
            for file in &memory.files {
                store.load_file(&base_dir.join(file))?;
            }
        }
        let triples = store.len()?;
        tracing::info!(service = %self.name, triples, "Memory repository loaded");
        Ok(Arc::new(store))
    }
}

impl LookupConfig {
    /// Load a configuration file
    ///
    /// # Example
    /// ```no_run
    /// use lookup_core::config::LookupConfig;
    ///
    /// let config = LookupConfig::load("lookup.yaml").unwrap();
    /// println!("{}", config.metadata.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LookupError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: LookupConfig = serde_yaml::from_str(content)
            .map_err(|e| LookupError::ParseError(format!("Invalid lookup config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }

    pub fn new(name: impl Into<String>, services: Vec<ServiceConfig>) -> Self {
        LookupConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: Metadata { name: name.into() },
            spec: Spec {
                default_service: None,
                services,
            },
        }
    }

    /// Validate document structure
    ///
    /// Ensures:
    /// - apiVersion is "lookup/v1" and kind is "LookupConfig"
    /// - at least one service, all names non-empty and unique
    /// - the default service (if named) exists
    /// - every repository and cache spec is well formed
    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(LookupError::ValidationError(format!(
                "Invalid apiVersion: expected '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }

        if self.kind != KIND {
            return Err(LookupError::ValidationError(format!(
                "Invalid kind: expected '{}', got '{}'",
                KIND, self.kind
            )));
        }

        if self.metadata.name.is_empty() {
            return Err(LookupError::ValidationError("metadata.name cannot be empty".to_string()));
        }

        if self.spec.services.is_empty() {
            return Err(LookupError::ValidationError("spec.services cannot be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for service in &self.spec.services {
            service.validate()?;
            if !seen.insert(service.name.as_str()) {
                return Err(LookupError::ValidationError(format!(
                    "duplicate service name '{}'",
                    service.name
                )));
            }
        }

        if let Some(default) = &self.spec.default_service {
            if !seen.contains(default.as_str()) {
                return Err(LookupError::ValidationError(format!(
                    "defaultService '{}' is not a configured service",
                    default
                )));
            }
        }

        Ok(())
    }

    /// Connect every service and register it
    pub fn build_registry(&self, base_dir: &Path) -> Result<LookupServiceRegistry> {
        let mut registry = LookupServiceRegistry::new();

        for service in &self.spec.services {
            let connection = service.connect(base_dir)?;
            let lookup = SparqlLookupService::new(
                service.name.clone(),
                connection,
                service.options()?,
                registry.cache_registry(),
            );
            registry.register(Arc::new(lookup));
        }

        if let Some(default) = &self.spec.default_service {
            registry.set_default(default)?;
        }

        Ok(registry)
    }
}
