//! Integration tests for end-to-end lookups
//!
//! Tests the full lookup path against an embedded oxigraph store:
//! - Query building and execution
//! - Candidate mapping and score adjustment
//! - Caching and invalidation through the service registry
//! - Reconciliation batches

use lookup_core::lookup::reconciliation::{batch_results_json, parse_batch};
use lookup_core::{
    CacheSpec, DatasetDescriptor, LookupProperty, LookupQuery, LookupRequest, LookupService, LookupServiceOptions,
    LookupServiceRegistry, MemoryStore, ScoreOptions, SparqlLookupService, Strictness,
};
use std::sync::Arc;

const PEOPLE: &str = include_str!("../fixtures/people.ttl");
const FOAF_PERSON: &str = "http://xmlns.com/foaf/0.1/Person";
const FOAF_FAMILY: &str = "http://xmlns.com/foaf/0.1/family_name";
const FOAF_KNOWS: &str = "http://xmlns.com/foaf/0.1/knows";

fn people_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new().unwrap();
    store.load_turtle(PEOPLE).unwrap();
    Arc::new(store)
}

fn registry_with(options: LookupServiceOptions) -> LookupServiceRegistry {
    let mut registry = LookupServiceRegistry::new();
    let service = SparqlLookupService::new("people", people_store(), options, registry.cache_registry());
    registry.register(Arc::new(service));
    registry
}

#[test]
fn test_lookup_returns_ranked_candidates() {
    let registry = registry_with(LookupServiceOptions::default());

    let response = registry
        .lookup(None, &LookupRequest::new("q0", LookupQuery::new("Ada").with_type(FOAF_PERSON)))
        .unwrap();

    let names: Vec<&str> = response.candidates.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Adaline", "Adam Smith", "Ada Lovelace"]);

    let best = &response.candidates[0];
    assert_eq!(best.id(), "http://ex.org/adaline");
    assert_eq!(best.score(), -4.0);
    assert!(!best.matched());
    assert_eq!(best.types()[0].id, FOAF_PERSON);
    assert_eq!(best.types()[0].name, "Person");
    assert_eq!(best.description(), None);

    let ada = &response.candidates[2];
    assert_eq!(ada.description(), Some("Mathematician, wrote the first published algorithm"));
}

#[test]
fn test_exact_label_is_a_match() {
    let registry = registry_with(LookupServiceOptions::default());

    let response = registry
        .lookup(None, &LookupRequest::new("q0", LookupQuery::new("Ada")))
        .unwrap();

    assert_eq!(response.candidates[0].id(), "http://ex.org/ada_city");
    assert!(response.candidates[0].matched());
    assert!(response.candidates[1..].iter().all(|c| !c.matched()));
}

#[test]
fn test_score_options_and_dataset_are_applied() {
    let registry = registry_with(LookupServiceOptions {
        score: Some(ScoreOptions::new(0.5, 100.0)),
        dataset: Some(DatasetDescriptor {
            id: "people".to_string(),
            name: "People".to_string(),
        }),
        ..LookupServiceOptions::default()
    });

    let response = registry
        .lookup(None, &LookupRequest::new("q0", LookupQuery::new("Adaline")))
        .unwrap();

    let candidate = &response.candidates[0];
    assert_eq!(candidate.score(), 100.0);
    // match reflects the backend score, before boosting
    assert!(candidate.matched());
    assert_eq!(candidate.dataset().unwrap().name, "People");
}

#[test]
fn test_property_filters_end_to_end() {
    let registry = registry_with(LookupServiceOptions::default());

    let strict = LookupQuery::new("Ada")
        .with_strictness(Strictness::All)
        .with_property(LookupProperty::data(FOAF_FAMILY, "Lovelace"))
        .with_property(LookupProperty::object(FOAF_KNOWS, "http://ex.org/babbage"));
    let response = registry.lookup(None, &LookupRequest::new("q0", strict)).unwrap();
    assert_eq!(response.candidates.len(), 1);
    assert_eq!(response.candidates[0].name(), "Ada Lovelace");

    let lenient = LookupQuery::new("Ada")
        .with_strictness(Strictness::Should)
        .with_property(LookupProperty::data(FOAF_FAMILY, "Lovelace"))
        .with_property(LookupProperty::object(FOAF_KNOWS, "http://ex.org/babbage"));
    let response = registry.lookup(None, &LookupRequest::new("q1", lenient)).unwrap();
    assert_eq!(response.candidates.len(), 2);
}

#[test]
fn test_available_entity_types() {
    let registry = registry_with(LookupServiceOptions::default());

    let types = registry.available_entity_types(None).unwrap();
    let ids: Vec<&str> = types.iter().map(|t| t.id.as_str()).collect();

    assert_eq!(ids, vec!["http://ex.org/City", FOAF_PERSON]);
    // labelled type keeps its label, unlabelled one falls back to its local name
    assert_eq!(types[0].name, "City");
    assert_eq!(types[1].name, "Person");
}

#[test]
fn test_cache_and_invalidation_through_registry() {
    let mut registry = LookupServiceRegistry::new();
    let options = LookupServiceOptions {
        cache_spec: CacheSpec::parse("maximumSize=100").unwrap(),
        ..LookupServiceOptions::default()
    };
    let service = Arc::new(SparqlLookupService::new(
        "people",
        people_store(),
        options,
        registry.cache_registry(),
    ));
    registry.register(service.clone());
    let cache = service.cache().unwrap();
    let request = LookupRequest::new("q0", LookupQuery::new("Babbage"));

    // 1. First lookup misses and fills the cache
    let first = registry.lookup(None, &request).unwrap();
    assert_eq!((cache.hits(), cache.misses()), (0, 1));
    assert_eq!(cache.entry_count(), 1);

    // 2. Repeat is served from cache
    let second = registry.lookup(None, &request).unwrap();
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
    assert_eq!(first, second);

    // 3. Invalidation empties the cache and the next lookup misses
    assert_eq!(registry.invalidate_caches(), 1);
    let third = registry.lookup(None, &request).unwrap();
    assert_eq!((cache.hits(), cache.misses()), (1, 2));
    assert_eq!(third.candidates[0].name(), "Charles Babbage");
}

#[test]
fn test_reconciliation_batch_round_trip() {
    let registry = registry_with(LookupServiceOptions::default());
    let batch = r#"{
        "q0": { "query": "Ada", "type": "http://xmlns.com/foaf/0.1/Person", "limit": 1 },
        "q1": { "query": "Babbage", "properties": [{ "pid": "http://xmlns.com/foaf/0.1/family_name", "v": "Babbage" }] }
    }"#;

    let responses: Vec<_> = parse_batch(batch)
        .unwrap()
        .iter()
        .map(|request| registry.lookup(None, request).unwrap())
        .collect();

    let json: serde_json::Value = serde_json::from_str(&batch_results_json(&responses).unwrap()).unwrap();

    assert_eq!(json["q0"]["result"].as_array().unwrap().len(), 1);
    assert_eq!(json["q0"]["result"][0]["id"], "http://ex.org/adaline");
    assert_eq!(json["q1"]["result"][0]["name"], "Charles Babbage");
}
