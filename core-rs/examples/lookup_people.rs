/// Example: Look up people in an embedded store
///
/// Loads the test fixture into an in-memory repository, then answers a
/// token from the command line and prints the generated SPARQL.
///
/// Usage:
///   cargo run --example lookup_people Ada
///   cargo run --example lookup_people Babbage

use lookup_core::{
    CacheRegistry, LookupQuery, LookupQueryBuilder, LookupRequest, LookupService, LookupServiceOptions,
    MemoryStore, RegexQueryBuilder, SparqlLookupService,
};
use std::env;
use std::sync::Arc;

const PEOPLE: &str = include_str!("../tests/fixtures/people.ttl");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let token = env::args().nth(1).unwrap_or_else(|| "Ada".to_string());

    let store = MemoryStore::new()?;
    store.load_turtle(PEOPLE)?;
    println!("Loaded {} triples\n", store.len()?);

    let caches = CacheRegistry::new();
    let service = SparqlLookupService::new("people", Arc::new(store), LookupServiceOptions::default(), &caches);

    let query = LookupQuery::new(token.as_str()).with_limit(5);
    println!("{}\n", RegexQueryBuilder::default().build(&query).as_str());

    let response = service.lookup(&LookupRequest::new("q0", query))?;
    for candidate in &response.candidates {
        println!("{:>6.1}  {:<20} {}", candidate.score(), candidate.name(), candidate.id());
    }

    Ok(())
}
