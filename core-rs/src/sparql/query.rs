/**
 * query.rs
 * Parameterized SPARQL text for entity lookup
 *
 * Caller-supplied values never reach the query text. Each one is bound to a
 * placeholder variable `?__<name>_<suffix>__` whose suffix is fresh for
 * every build, and the value travels next to the text in `bindings`.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::errors::Result;
use crate::lookup::model::{LookupProperty, LookupQuery, Strictness};

pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

/// Blazegraph full-text search namespace
pub const BDS_NAMESPACE: &str = "http://www.bigdata.com/rdf/search#";

/// One row of a SELECT result: variable name to lexical term value
pub type QueryRow = HashMap<String, String>;

static PLACEHOLDER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([A-Za-z]+)_([0-9a-f]{32})__").expect("placeholder pattern"));

static PLACEHOLDER_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?(__[A-Za-z]+_[0-9a-f]{32}__)").expect("placeholder variable pattern"));

/// Value bound to a placeholder variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "termType", content = "value")]
pub enum BoundValue {
    Iri(String),
    Literal(String),
}

impl BoundValue {
    pub fn as_str(&self) -> &str {
        match self {
            BoundValue::Iri(v) | BoundValue::Literal(v) => v,
        }
    }

    /// N-Triples encoding (RDF4J protocol binding parameters)
    pub fn to_ntriples(&self) -> String {
        match self {
            BoundValue::Iri(iri) => format!("<{}>", iri),
            BoundValue::Literal(value) => {
                let mut out = String::with_capacity(value.len() + 2);
                out.push('"');
                for c in value.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        _ => out.push(c),
                    }
                }
                out.push('"');
                out
            }
        }
    }
}

impl fmt::Display for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ntriples())
    }
}

/// SPARQL text plus the values bound to its placeholder variables
#[derive(Debug, Clone, PartialEq)]
pub struct SparqlQuery {
    query: String,
    bindings: BTreeMap<String, BoundValue>,
}

impl SparqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    /// Placeholder variable name (without `?`) to bound value
    pub fn bindings(&self) -> &BTreeMap<String, BoundValue> {
        &self.bindings
    }

    /// Bind a placeholder variable (name without `?`)
    pub fn with_binding(mut self, variable: impl Into<String>, value: BoundValue) -> Self {
        self.bindings.insert(variable.into(), value);
        self
    }

    /// Query text with each bound placeholder replaced by its rendered term
    ///
    /// `render` must produce a syntactically closed SPARQL term (an escaped
    /// literal or an `<iri>`). Placeholders without a binding are left as
    /// variables.
    pub fn inline_bindings<F>(&self, mut render: F) -> Result<String>
    where
        F: FnMut(&BoundValue) -> Result<String>,
    {
        let mut terms: HashMap<&str, String> = HashMap::with_capacity(self.bindings.len());
        for (var, value) in &self.bindings {
            terms.insert(var.as_str(), render(value)?);
        }

        Ok(PLACEHOLDER_VARIABLE
            .replace_all(&self.query, |caps: &Captures| match terms.get(&caps[1]) {
                Some(term) => term.clone(),
                None => caps[0].to_string(),
            })
            .into_owned())
    }

    /// Bound value whose placeholder starts with `__<name>_`
    pub fn binding_named(&self, name: &str) -> Option<&BoundValue> {
        let prefix = format!("__{}_", name);
        self.bindings
            .iter()
            .find(|(var, _)| var.starts_with(&prefix))
            .map(|(_, value)| value)
    }
}

/// Rewrites per-build placeholder suffixes to 1, 2, 3... in order of first
/// appearance, so generated text can be compared with a fixture.
pub fn normalize_placeholders(text: &str) -> String {
    let mut seen: HashMap<String, usize> = HashMap::new();
    PLACEHOLDER_SUFFIX
        .replace_all(text, |caps: &Captures| {
            let next = seen.len() + 1;
            let index = *seen.entry(caps[2].to_string()).or_insert(next);
            format!("__{}_{}__", &caps[1], index)
        })
        .into_owned()
}

/// Escapes XPath regular expression metacharacters
pub fn escape_regex(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        if matches!(
            c,
            '\\' | '|' | '.' | '?' | '*' | '+' | '(' | ')' | '{' | '}' | '-' | '[' | ']' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Query engine dialect a lookup service targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryEngine {
    /// Plain SPARQL 1.1 with REGEX token matching
    Regex,
    /// Blazegraph style full-text search service
    Fts,
}

impl Default for QueryEngine {
    fn default() -> Self {
        QueryEngine::Regex
    }
}

/// Builds the lookup SELECT for one query engine
pub trait LookupQueryBuilder: Send + Sync {
    fn build(&self, query: &LookupQuery) -> SparqlQuery;
}

/// Collects placeholder bindings during one build
struct Placeholders {
    bindings: BTreeMap<String, BoundValue>,
}

impl Placeholders {
    fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    fn bind(&mut self, name: &str, value: BoundValue) -> String {
        let var = format!("__{}_{}__", name, uuid::Uuid::new_v4().simple());
        let rendered = format!("?{}", var);
        self.bindings.insert(var, value);
        rendered
    }

    fn finish(self, text: String) -> SparqlQuery {
        SparqlQuery {
            query: text,
            bindings: self.bindings,
        }
    }
}

const SELECT_CLAUSE: &str = "SELECT ?candidate (SAMPLE(?keyLabel) AS ?name) \
(GROUP_CONCAT(DISTINCT STR(?type) ; separator=\",\") AS ?types) (MAX(?keyScore) AS ?score)";

const DESCRIPTION_PROJECTION: &str = " (SAMPLE(?comment) AS ?description)";

fn predicate_path(predicates: &[String]) -> String {
    let predicates: Vec<&str> = if predicates.is_empty() {
        vec![RDFS_LABEL]
    } else {
        predicates.iter().map(String::as_str).collect()
    };
    predicates
        .iter()
        .map(|p| format!("<{}>", p))
        .collect::<Vec<_>>()
        .join("|")
}

fn indent(lines: &[String], level: usize) -> Vec<String> {
    let pad = "  ".repeat(level);
    lines.iter().map(|l| format!("{}{}", pad, l)).collect()
}

/// Renders groups as `{ a } UNION { b } ...`; a single group stays bare
fn union_of(groups: &[Vec<String>]) -> Vec<String> {
    if groups.len() == 1 {
        return groups[0].clone();
    }
    let mut out = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            out.push("UNION".to_string());
        }
        out.push("{".to_string());
        out.extend(indent(group, 1));
        out.push("}".to_string());
    }
    out
}

fn finish_query(prefix: Option<&str>, mut body: Vec<String>, description_predicates: &[String], limit: usize) -> String {
    let mut text = String::new();
    if let Some(prefix) = prefix {
        text.push_str(prefix);
        text.push('\n');
    }
    text.push_str(SELECT_CLAUSE);
    if !description_predicates.is_empty() {
        text.push_str(DESCRIPTION_PROJECTION);
        body.push(format!(
            "OPTIONAL {{ ?candidate {} ?comment . }}",
            predicate_path(description_predicates)
        ));
    }
    text.push_str("\nWHERE {\n");
    for line in indent(&body, 1) {
        text.push_str(&line);
        text.push('\n');
    }
    text.push_str("}\nGROUP BY ?candidate\nORDER BY DESC(?score)\n");
    text.push_str(&format!("LIMIT {}", limit));
    text
}

fn type_patterns(query: &LookupQuery, ph: &mut Placeholders) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(entity_type) = query.entity_type() {
        let var = ph.bind("type", BoundValue::Iri(entity_type.to_string()));
        lines.push(format!("?candidate a {} .", var));
    }
    lines.push("?candidate a ?type .".to_string());
    lines
}

/// REGEX token matching over the configured label predicates
#[derive(Debug, Clone)]
pub struct RegexQueryBuilder {
    key_predicates: Vec<String>,
    description_predicates: Vec<String>,
}

impl RegexQueryBuilder {
    pub fn new(key_predicates: Vec<String>) -> Self {
        Self {
            key_predicates,
            description_predicates: vec![RDFS_COMMENT.to_string()],
        }
    }

    /// Predicates projected as the candidate description; empty disables it
    pub fn with_description_predicates(mut self, predicates: Vec<String>) -> Self {
        self.description_predicates = predicates;
        self
    }

    fn property_block(index: usize, property: &LookupProperty, ph: &mut Placeholders) -> Vec<String> {
        let predicate = ph.bind("property", BoundValue::Iri(property.property().to_string()));
        match property {
            LookupProperty::Data { value, .. } => {
                let literal = ph.bind("value", BoundValue::Literal(value.clone()));
                vec![
                    format!("?candidate {} ?value{} .", predicate, index),
                    format!("FILTER(STR(?value{}) = STR({}))", index, literal),
                ]
            }
            LookupProperty::Object { entity, .. } => {
                let object = ph.bind("value", BoundValue::Iri(entity.clone()));
                vec![format!("?candidate {} {} .", predicate, object)]
            }
        }
    }
}

impl Default for RegexQueryBuilder {
    fn default() -> Self {
        Self::new(vec![RDFS_LABEL.to_string()])
    }
}

impl LookupQueryBuilder for RegexQueryBuilder {
    fn build(&self, query: &LookupQuery) -> SparqlQuery {
        let mut ph = Placeholders::new();
        let mut body = type_patterns(query, &mut ph);

        let regex = ph.bind("regex", BoundValue::Literal(escape_regex(query.token())));
        let token = ph.bind("token", BoundValue::Literal(query.token().to_string()));

        body.push(format!("?candidate {} ?key .", predicate_path(&self.key_predicates)));
        body.push(format!("FILTER(REGEX(LCASE(STR(?key)), LCASE({}), \"i\"))", regex));
        if let Some(language) = query.preferred_language() {
            let lang = ph.bind("lang", BoundValue::Literal(language.to_string()));
            body.push(format!("FILTER(LANG(?key) = \"\" || LANGMATCHES(LANG(?key), {}))", lang));
        }
        body.push("BIND(STR(?key) AS ?keyLabel)".to_string());
        body.push(format!("BIND((STRLEN({}) - STRLEN(STR(?key))) AS ?keyScore)", token));

        let blocks: Vec<Vec<String>> = query
            .properties()
            .iter()
            .enumerate()
            .map(|(i, p)| Self::property_block(i, p, &mut ph))
            .collect();

        match query.strictness() {
            Some(Strictness::Should) if !blocks.is_empty() => body.extend(union_of(&blocks)),
            _ => body.extend(blocks.into_iter().flatten()),
        }

        ph.finish(finish_query(None, body, &self.description_predicates, query.limit()))
    }
}

/// Full-text search through the Blazegraph `bds:search` service
#[derive(Debug, Clone)]
pub struct FtsQueryBuilder {
    key_predicates: Vec<String>,
    description_predicates: Vec<String>,
    min_relevance: f64,
    match_all_terms: bool,
}

impl FtsQueryBuilder {
    pub fn new(key_predicates: Vec<String>, min_relevance: f64, match_all_terms: bool) -> Self {
        Self {
            key_predicates,
            description_predicates: vec![RDFS_COMMENT.to_string()],
            min_relevance,
            match_all_terms,
        }
    }

    pub fn with_description_predicates(mut self, predicates: Vec<String>) -> Self {
        self.description_predicates = predicates;
        self
    }

    fn property_block(index: usize, property: &LookupProperty, ph: &mut Placeholders) -> Vec<String> {
        let predicate = ph.bind("property", BoundValue::Iri(property.property().to_string()));
        match property {
            LookupProperty::Object { entity, .. } => {
                let object = ph.bind("value", BoundValue::Iri(entity.clone()));
                vec![format!("?candidate {} {} .", predicate, object)]
            }
            LookupProperty::Data { value, .. } => {
                let literal = ph.bind("value", BoundValue::Literal(value.clone()));
                union_of(&[
                    vec![format!("?candidate {} {} .", predicate, literal)],
                    vec![
                        format!("?candidate {} ?value{} .", predicate, index),
                        format!("FILTER(STR(?value{}) = STR({}))", index, literal),
                    ],
                ])
            }
        }
    }
}

impl Default for FtsQueryBuilder {
    fn default() -> Self {
        Self::new(vec![RDFS_LABEL.to_string()], 0.0, true)
    }
}

impl LookupQueryBuilder for FtsQueryBuilder {
    fn build(&self, query: &LookupQuery) -> SparqlQuery {
        let mut ph = Placeholders::new();
        let token = ph.bind("token", BoundValue::Literal(query.token().to_string()));

        let mut body = vec![
            "SERVICE bds:search {".to_string(),
            format!("  ?key bds:search {} ;", token),
            "    bds:relevance ?keyScore ;".to_string(),
            format!("    bds:minRelevance \"{}\" ;", self.min_relevance),
            format!("    bds:matchAllTerms \"{}\" .", self.match_all_terms),
            "}".to_string(),
            format!("?candidate {} ?key .", predicate_path(&self.key_predicates)),
        ];
        body.extend(type_patterns(query, &mut ph));
        body.push("BIND(STR(?key) AS ?keyLabel)".to_string());

        let mut blocks: Vec<Vec<String>> = query
            .properties()
            .iter()
            .enumerate()
            .map(|(i, p)| Self::property_block(i, p, &mut ph))
            .collect();

        match query.strictness() {
            Some(Strictness::All) => body.extend(blocks.into_iter().flatten()),
            Some(Strictness::Should) if !blocks.is_empty() => body.extend(union_of(&blocks)),
            _ if !blocks.is_empty() => {
                let rest = blocks.split_off(1);
                body.extend(blocks.into_iter().flatten());
                if !rest.is_empty() {
                    body.extend(union_of(&rest));
                }
            }
            _ => {}
        }

        let prefix = format!("PREFIX bds: <{}>", BDS_NAMESPACE);
        ph.finish(finish_query(Some(&prefix), body, &self.description_predicates, query.limit()))
    }
}

/// Distinct indexed entity types with an optional label
pub fn available_entity_types_query(label_predicates: &[String]) -> SparqlQuery {
    SparqlQuery::new(format!(
        "SELECT ?type (SAMPLE(STR(?typeLabel)) AS ?name)\n\
         WHERE {{\n  \
           ?entity a ?type .\n  \
           OPTIONAL {{ ?type {} ?typeLabel . }}\n\
         }}\n\
         GROUP BY ?type\n\
         ORDER BY ?type",
        predicate_path(label_predicates)
    ))
}
