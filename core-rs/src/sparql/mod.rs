/**
 * sparql module
 *
 * - query: parameterized lookup query builders (regex and full-text search)
 * - connection: triple-store connections (embedded oxigraph, RDF4J HTTP)
 */

pub mod connection;
pub mod query;

pub use connection::{MemoryStore, Rdf4jHttpConnection, TripleStoreConnection};
pub use query::{
    available_entity_types_query, normalize_placeholders, BoundValue, FtsQueryBuilder, LookupQueryBuilder,
    QueryEngine, QueryRow, RegexQueryBuilder, SparqlQuery,
};
