// Lookup Cache Contract Tests
//
// These tests verify INVARIANTS of the cached lookup path that MUST NEVER BREAK.
// Each one documents what a caller relies on and what breaks if it changes.
//
// A counting connection stands in for the repository so every test can
// observe exactly how many queries reached the backend.

use lookup_core::errors::{LookupError, Result};
use lookup_core::{
    create_cache_key, CacheRegistry, CacheSpec, LookupProperty, LookupQuery, LookupRequest, LookupService,
    LookupServiceOptions, QueryRow, ScoreOptions, SparqlLookupService, SparqlQuery, Strictness,
    TripleStoreConnection,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

const FOAF_NAME: &str = "http://xmlns.com/foaf/0.1/name";
const FOAF_AGE: &str = "http://xmlns.com/foaf/0.1/age";
const FOAF_PERSON: &str = "http://xmlns.com/foaf/0.1/Person";

struct CountingConnection {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingConnection {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TripleStoreConnection for CountingConnection {
    fn select(&self, _query: &SparqlQuery) -> Result<Vec<QueryRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LookupError::Processing("backend down".to_string()));
        }

        let row: QueryRow = [
            ("candidate", "http://ex.org/ada"),
            ("name", "Ada Lovelace"),
            ("types", FOAF_PERSON),
            ("score", "0.8"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Ok(vec![row])
    }
}

/// Blocks its first query between two barriers so a test can act while the
/// backend read is in flight. Candidate ids carry the call number.
struct GatedConnection {
    calls: AtomicUsize,
    entered: Barrier,
    release: Barrier,
}

impl GatedConnection {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        })
    }
}

impl TripleStoreConnection for GatedConnection {
    fn select(&self, _query: &SparqlQuery) -> Result<Vec<QueryRow>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == 1 {
            self.entered.wait();
            self.release.wait();
        }

        let row: QueryRow = [
            ("candidate".to_string(), format!("http://ex.org/v{}", call)),
            ("score".to_string(), "0".to_string()),
        ]
        .into_iter()
        .collect();
        Ok(vec![row])
    }
}

fn service_with(
    conn: Arc<CountingConnection>,
    cache_spec: &str,
    score: Option<ScoreOptions>,
    caches: &CacheRegistry,
) -> SparqlLookupService {
    let options = LookupServiceOptions {
        cache_spec: CacheSpec::parse(cache_spec).unwrap(),
        score,
        ..LookupServiceOptions::default()
    };
    SparqlLookupService::new("people", conn, options, caches)
}

fn request(token: &str) -> LookupRequest {
    LookupRequest::new("q0", LookupQuery::new(token))
}

/// WHY: Property filter order is a caller detail, not part of the question
/// REASON: Reconciliation clients serialize properties in arbitrary order
/// BREAKS: Cache hit rate, identical questions occupy several entries
#[test]
fn cache_key_ignores_property_order() {
    let forward = LookupQuery::new("Ada")
        .with_property(LookupProperty::data(FOAF_NAME, "Ada"))
        .with_property(LookupProperty::data(FOAF_AGE, "36"))
        .with_property(LookupProperty::object(FOAF_NAME, "http://ex.org/ada"));
    let backward = LookupQuery::new("Ada")
        .with_property(LookupProperty::object(FOAF_NAME, "http://ex.org/ada"))
        .with_property(LookupProperty::data(FOAF_AGE, "36"))
        .with_property(LookupProperty::data(FOAF_NAME, "Ada"));

    assert_eq!(create_cache_key(&forward), create_cache_key(&backward));
}

/// WHY: Every field that changes the generated query must change the key
/// REASON: A shared key would answer one question with another's candidates
/// BREAKS: Correctness, wrong candidates served from cache
#[test]
fn cache_key_discriminates_query_fields() {
    let base = LookupQuery::new("Ada");
    let base_key = create_cache_key(&base);

    let variants = vec![
        LookupQuery::new("Ada Lovelace"),
        LookupQuery::new("Ada").with_limit(3),
        LookupQuery::new("Ada").with_type(FOAF_PERSON),
        LookupQuery::new("Ada").with_strictness(Strictness::Should),
        LookupQuery::new("Ada").with_property(LookupProperty::data(FOAF_AGE, "36")),
        LookupQuery::new("Ada").with_preferred_language("en"),
    ];

    for variant in &variants {
        assert_ne!(create_cache_key(variant), base_key, "{:?}", variant);
    }

    let literal = LookupQuery::new("Ada").with_property(LookupProperty::data(FOAF_NAME, "http://ex.org/ada"));
    let linked = LookupQuery::new("Ada").with_property(LookupProperty::object(FOAF_NAME, "http://ex.org/ada"));
    assert_ne!(create_cache_key(&literal), create_cache_key(&linked));

    // a literal that spells out a second property filter
    let spliced = LookupQuery::new("Ada")
        .with_property(LookupProperty::data(FOAF_AGE, format!("36\"--{}=\"Ada", FOAF_NAME)));
    let separate = LookupQuery::new("Ada")
        .with_property(LookupProperty::data(FOAF_AGE, "36"))
        .with_property(LookupProperty::data(FOAF_NAME, "Ada"));
    assert_ne!(create_cache_key(&spliced), create_cache_key(&separate));

    let thirty_six = LookupQuery::new("Ada").with_property(LookupProperty::data(FOAF_AGE, "36"));
    let thirty_seven = LookupQuery::new("Ada").with_property(LookupProperty::data(FOAF_AGE, "37"));
    assert_ne!(create_cache_key(&thirty_six), create_cache_key(&thirty_seven));
}

/// WHY: A repeated request must be answered from cache, adjusted scores included
/// REASON: The cache stores post-adjustment responses; adjusting twice would drift
/// BREAKS: Backend load and score stability across calls
#[test]
fn repeated_lookup_hits_backend_once() {
    let conn = CountingConnection::new();
    let svc = service_with(conn.clone(), "maximumSize=10", Some(ScoreOptions::new(2.0, -10.0)), &CacheRegistry::new());

    let first = svc.lookup(&request("Ada")).unwrap();
    let second = svc.lookup(&request("Ada")).unwrap();

    assert_eq!(conn.calls(), 1);
    assert_eq!(first, second);
    assert!((first.candidates[0].score() - (-8.4)).abs() < 0.01);
    assert!((second.candidates[0].score() - (-8.4)).abs() < 0.01);
}

/// WHY: Without score options the backend score passes through unchanged
/// BREAKS: Ranking for services that configure no boost
#[test]
fn unset_score_options_keep_backend_score() {
    let conn = CountingConnection::new();
    let svc = service_with(conn, "maximumSize=10", None, &CacheRegistry::new());

    let response = svc.lookup(&request("Ada")).unwrap();
    assert!((response.candidates[0].score() - 0.8).abs() < 1e-9);
}

/// WHY: The `none` cache spec disables caching entirely
/// REASON: Frequently written repositories must never serve stale answers
/// BREAKS: Freshness guarantee for uncached services
#[test]
fn disabled_cache_always_hits_backend() {
    let conn = CountingConnection::new();
    let svc = service_with(conn.clone(), "none", None, &CacheRegistry::new());

    assert!(svc.cache().is_none());
    svc.lookup(&request("Ada")).unwrap();
    svc.lookup(&request("Ada")).unwrap();
    svc.lookup(&request("Ada")).unwrap();

    assert_eq!(conn.calls(), 3);
}

/// WHY: invalidate_all must clear every service's cache before returning
/// REASON: Repository writes call it and then expect fresh answers
/// BREAKS: Stale candidates after data changes
#[test]
fn invalidate_all_forces_fresh_queries() {
    let caches = CacheRegistry::new();
    let people_conn = CountingConnection::new();
    let places_conn = CountingConnection::new();
    let people = service_with(people_conn.clone(), "maximumSize=10", None, &caches);
    let places = service_with(places_conn.clone(), "maximumSize=10", None, &caches);

    people.lookup(&request("Ada")).unwrap();
    places.lookup(&request("Paris")).unwrap();
    assert_eq!(caches.invalidate_all(), 2);

    people.lookup(&request("Ada")).unwrap();
    places.lookup(&request("Paris")).unwrap();

    assert_eq!(people_conn.calls(), 2);
    assert_eq!(places_conn.calls(), 2);
}

/// WHY: A backend read that started before invalidate_all is never cached
/// REASON: Invalidation promises that the next lookup misses, even when a
///         lookup was already in flight while the repository changed
/// BREAKS: Pre-invalidation candidates served after the data changed
#[test]
fn invalidation_discards_in_flight_miss() {
    let caches = CacheRegistry::new();
    let conn = GatedConnection::new();
    let options = LookupServiceOptions {
        cache_spec: CacheSpec::parse("maximumSize=10").unwrap(),
        ..LookupServiceOptions::default()
    };
    let svc = Arc::new(SparqlLookupService::new("people", conn.clone(), options, &caches));

    let in_flight = {
        let svc = Arc::clone(&svc);
        std::thread::spawn(move || svc.lookup(&request("Ada")).unwrap())
    };

    conn.entered.wait();
    assert_eq!(caches.invalidate_all(), 1);
    conn.release.wait();

    // the in-flight caller still gets its answer
    let first = in_flight.join().unwrap();
    assert_eq!(first.candidates[0].id(), "http://ex.org/v1");

    let next = svc.lookup(&request("Ada")).unwrap();
    assert_eq!(next.candidates[0].id(), "http://ex.org/v2");
    assert_eq!(conn.calls.load(Ordering::SeqCst), 2);

    // responses read after the invalidation are cached again
    svc.lookup(&request("Ada")).unwrap();
    assert_eq!(conn.calls.load(Ordering::SeqCst), 2);
}

/// WHY: A size-bounded cache evicts the least recently used entry
/// REASON: maximumSize is the memory contract operators configure
/// BREAKS: Memory bounds, or recently used answers disappearing first
#[test]
fn maximum_size_evicts_oldest_entry() {
    let conn = CountingConnection::new();
    let svc = service_with(conn.clone(), "maximumSize=3", None, &CacheRegistry::new());

    for token in ["k1", "k2", "k3", "k4"] {
        svc.lookup(&request(token)).unwrap();
    }
    assert_eq!(conn.calls(), 4);

    // k4, k3, k2 are still cached
    for token in ["k4", "k3", "k2"] {
        svc.lookup(&request(token)).unwrap();
    }
    assert_eq!(conn.calls(), 4);

    // k1 was evicted when k4 arrived
    svc.lookup(&request("k1")).unwrap();
    assert_eq!(conn.calls(), 5);
}

/// WHY: Failures are never cached
/// REASON: A transient backend outage must not poison the cache
/// BREAKS: Recovery after outages
#[test]
fn backend_errors_are_not_cached() {
    let conn = CountingConnection::new();
    let svc = service_with(conn.clone(), "maximumSize=10", None, &CacheRegistry::new());

    conn.failing.store(true, Ordering::SeqCst);
    assert!(matches!(svc.lookup(&request("Ada")), Err(LookupError::Processing(_))));

    conn.failing.store(false, Ordering::SeqCst);
    let response = svc.lookup(&request("Ada")).unwrap();

    assert_eq!(response.candidates.len(), 1);
    assert_eq!(conn.calls(), 2);
}

/// WHY: Invalid requests are rejected before touching cache or backend
/// BREAKS: Backend receives queries it can only fail on
#[test]
fn invalid_requests_never_reach_backend() {
    let conn = CountingConnection::new();
    let svc = service_with(conn.clone(), "maximumSize=10", None, &CacheRegistry::new());

    let err = svc
        .lookup(&LookupRequest::new("q0", LookupQuery::new("Ada").with_limit(0)))
        .unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(conn.calls(), 0);
}

/// WHY: Concurrent readers share one cache safely
/// BREAKS: Thread safety of services held behind Arc
#[test]
fn concurrent_lookups_share_cache() {
    let conn = CountingConnection::new();
    let svc = Arc::new(service_with(conn.clone(), "maximumSize=10", None, &CacheRegistry::new()));
    svc.lookup(&request("Ada")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = Arc::clone(&svc);
            std::thread::spawn(move || svc.lookup(&request("Ada")).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().candidates.len(), 1);
    }
    assert_eq!(conn.calls(), 1);
}
