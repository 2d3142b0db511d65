//! Triple-store connections
//!
//! Lookup services never own a store. They hand a `SparqlQuery` (text plus
//! pre-bound values) to a `TripleStoreConnection` and read back rows of
//! lexical values. Implementations:
//! - MemoryStore: embedded oxigraph store, bound terms inlined after escaping
//! - Rdf4jHttpConnection: remote repository over the RDF4J REST protocol

use oxigraph::io::RdfFormat;
use oxigraph::model::{Literal, NamedNode, Term};
use oxigraph::sparql::{Query, QueryOptions, QueryResults};
use oxigraph::store::Store;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::errors::{LookupError, Result};
use crate::sparql::query::{BoundValue, QueryRow, SparqlQuery};

/// A connection able to evaluate SELECT queries with pre-bound variables
///
/// Implementations must be safe to share between threads; the lookup
/// façade calls `select` from whichever thread issued the lookup.
pub trait TripleStoreConnection: Send + Sync {
    /// Evaluate a SELECT query
    ///
    /// # Returns
    ///
    /// One map per solution, variable name to lexical value. Unbound
    /// variables are absent from the map.
    fn select(&self, query: &SparqlQuery) -> Result<Vec<QueryRow>>;
}

/// Embedded oxigraph store
pub struct MemoryStore {
    store: Store,
}

impl MemoryStore {
    pub fn new() -> Result<Self> {
        let store = Store::new().map_err(|e| LookupError::Processing(e.to_string()))?;
        Ok(Self { store })
    }

    /// Load Turtle content into the default graph
    pub fn load_turtle(&self, content: &str) -> Result<()> {
        self.store
            .load_from_reader(RdfFormat::Turtle, content.as_bytes())
            .map_err(|e| LookupError::ParseError(e.to_string()))
    }

    /// Load an RDF file, format chosen by extension (Turtle when unknown)
    pub fn load_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(LookupError::FileNotFound(path.display().to_string()));
        }

        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(RdfFormat::from_extension)
            .unwrap_or(RdfFormat::Turtle);

        let content = fs::read(path)?;
        tracing::debug!(path = %path.display(), ?format, "Loading RDF file");

        self.store
            .load_from_reader(format, content.as_slice())
            .map_err(|e| LookupError::ParseError(format!("{}: {}", path.display(), e)))
    }

    pub fn len(&self) -> Result<usize> {
        self.store
            .len()
            .map_err(|e| LookupError::Processing(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Renders a bound value as an oxigraph term (N-Triples escaping)
    ///
    /// oxigraph only substitutes variables of the top-level projection, and
    /// lookup placeholders live inside grouped and union patterns, so the
    /// escaped terms take the placeholders' place in the text instead.
    fn render_term(value: &BoundValue) -> Result<String> {
        let term: Term = match value {
            BoundValue::Iri(iri) => NamedNode::new(iri.as_str())
                .map_err(|e| LookupError::InvalidQuery(format!("Invalid IRI <{}>: {}", iri, e)))?
                .into(),
            BoundValue::Literal(literal) => Literal::new_simple_literal(literal.as_str()).into(),
        };
        Ok(term.to_string())
    }
}

fn lexical(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::Literal(literal) => literal.value().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

impl TripleStoreConnection for MemoryStore {
    fn select(&self, query: &SparqlQuery) -> Result<Vec<QueryRow>> {
        let text = query.inline_bindings(Self::render_term)?;
        let parsed = Query::parse(&text, None)
            .map_err(|e| LookupError::Processing(format!("Malformed SPARQL: {}", e)))?;

        let results = self
            .store
            .query_opt(parsed, QueryOptions::default())
            .map_err(|e| LookupError::Processing(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();

                for solution in solutions {
                    let solution = solution.map_err(|e| LookupError::Processing(e.to_string()))?;

                    let mut row = QueryRow::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), lexical(term));
                    }
                    rows.push(row);
                }

                Ok(rows)
            }
            _ => Err(LookupError::Processing(
                "Expected SELECT solutions from lookup query".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SparqlJsonResults {
    results: SparqlJsonBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlJsonBindings {
    bindings: Vec<HashMap<String, SparqlJsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlJsonTerm {
    value: String,
}

/// Remote repository speaking the RDF4J REST protocol
///
/// Bindings travel as `$<name>=<N-Triples term>` form parameters, so the
/// server binds them the same way the embedded store does.
///
/// # Example
///
/// ```no_run
/// use lookup_core::sparql::Rdf4jHttpConnection;
///
/// let conn = Rdf4jHttpConnection::new("http://localhost:8080/rdf4j-server/repositories/people", None).unwrap();
/// ```
pub struct Rdf4jHttpConnection {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl Rdf4jHttpConnection {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(LookupError::Config("Repository endpoint cannot be empty".to_string()));
        }

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| LookupError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Form parameters sent for a query
    pub fn form_params(query: &SparqlQuery) -> Vec<(String, String)> {
        let mut params = vec![("query".to_string(), query.as_str().to_string())];
        for (name, value) in query.bindings() {
            params.push((format!("${}", name), value.to_ntriples()));
        }
        params
    }
}

impl TripleStoreConnection for Rdf4jHttpConnection {
    fn select(&self, query: &SparqlQuery) -> Result<Vec<QueryRow>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&Self::form_params(query))
            .send()
            .map_err(|e| LookupError::Processing(format!("{}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LookupError::Processing(format!(
                "{} answered {}: {}",
                self.endpoint,
                status,
                body.trim()
            )));
        }

        let results: SparqlJsonResults = response
            .json()
            .map_err(|e| LookupError::Processing(format!("Invalid SPARQL JSON results: {}", e)))?;

        Ok(results
            .results
            .bindings
            .into_iter()
            .map(|binding| {
                binding
                    .into_iter()
                    .map(|(var, term)| (var, term.value))
                    .collect()
            })
            .collect())
    }
}
