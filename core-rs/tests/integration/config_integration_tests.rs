//! Integration tests for configuration driven setup
//!
//! Tests building a service registry from a lookup.yaml document:
//! - Loading and validation
//! - Repository file resolution
//! - Per-service cache policies and defaults

use lookup_core::config::{LookupConfig, ServiceConfig};
use lookup_core::errors::LookupError;
use lookup_core::{LookupQuery, LookupRequest};
use std::fs;
use tempfile::TempDir;

const PEOPLE: &str = include_str!("../fixtures/people.ttl");

const CONFIG: &str = r#"
apiVersion: lookup/v1
kind: LookupConfig
metadata:
  name: integration
spec:
  defaultService: cities
  services:
    - name: people
      repository:
        memory:
          files: [data/people.ttl]
      cacheSpec: maximumSize=3,expireAfterWrite=10m
      score: { multiplier: 2.0, offset: -10.0 }
    - name: cities
      repository:
        memory:
          files: [data/people.ttl]
      cacheSpec: none
      keyPredicates:
        - http://www.w3.org/2000/01/rdf-schema#label
"#;

fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("data")).unwrap();
    fs::write(temp_dir.path().join("data/people.ttl"), PEOPLE).unwrap();
    fs::write(temp_dir.path().join("lookup.yaml"), CONFIG).unwrap();
    temp_dir
}

#[test]
fn test_config_to_registry_lifecycle() {
    let temp_dir = workspace();

    // 1. Load and validate
    let config = LookupConfig::load(temp_dir.path().join("lookup.yaml")).unwrap();
    assert_eq!(config.metadata.name, "integration");

    // 2. Build registry
    let registry = config.build_registry(temp_dir.path()).unwrap();
    assert_eq!(registry.service_names(), vec!["cities", "people"]);
    assert_eq!(registry.default_name(), Some("cities"));
    assert_eq!(registry.cache_registry().len(), 1);

    // 3. Default service answers with raw scores
    let request = LookupRequest::new("q0", LookupQuery::new("Ada").with_type("http://ex.org/City"));
    let response = registry.lookup(None, &request).unwrap();
    assert_eq!(response.candidates[0].id(), "http://ex.org/ada_city");
    assert_eq!(response.candidates[0].score(), 0.0);

    // 4. Named service applies its boost
    let response = registry.lookup(Some("people"), &request).unwrap();
    assert_eq!(response.candidates[0].score(), -10.0);
}

#[test]
fn test_unknown_service_name() {
    let temp_dir = workspace();
    let config = LookupConfig::load(temp_dir.path().join("lookup.yaml")).unwrap();
    let registry = config.build_registry(temp_dir.path()).unwrap();

    let result = registry.lookup(Some("planets"), &LookupRequest::new("q0", LookupQuery::new("Mars")));
    assert!(matches!(result, Err(LookupError::ServiceNotFound(_))));
}

#[test]
fn test_invalid_config_is_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("lookup.yaml");
    fs::write(&path, CONFIG.replace("cacheSpec: none", "cacheSpec: maximumWeight=5")).unwrap();

    let err = LookupConfig::load(&path).unwrap_err();
    assert!(matches!(err, LookupError::ValidationError(_)));
}

#[test]
fn test_saved_config_builds_same_registry() {
    let temp_dir = workspace();

    let mut service = ServiceConfig::memory("people", vec!["data/people.ttl".to_string()]);
    service.cache_spec = Some("none".to_string());
    let config = LookupConfig::new("saved", vec![service]);

    let path = temp_dir.path().join("saved.yaml");
    config.save(&path).unwrap();

    let registry = LookupConfig::load(&path).unwrap().build_registry(temp_dir.path()).unwrap();
    assert_eq!(registry.default_name(), Some("people"));
    assert!(registry.cache_registry().is_empty());
}
