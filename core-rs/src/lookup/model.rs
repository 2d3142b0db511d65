/**
 * model.rs
 * Value types exchanged with lookup services
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result limit applied when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 10;

/// How property filters combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Every property filter must match
    All,
    /// Any property filter may match
    Should,
}

impl Strictness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strictness::All => "all",
            Strictness::Should => "should",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "all" => Some(Strictness::All),
            "should" => Some(Strictness::Should),
            _ => None,
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property filter attached to a lookup query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LookupProperty {
    /// Property whose value is a literal
    Data { property: String, value: String },
    /// Property whose value links to another entity
    Object { property: String, entity: String },
}

impl LookupProperty {
    pub fn data(property: impl Into<String>, value: impl Into<String>) -> Self {
        LookupProperty::Data {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn object(property: impl Into<String>, entity: impl Into<String>) -> Self {
        LookupProperty::Object {
            property: property.into(),
            entity: entity.into(),
        }
    }

    pub fn property(&self) -> &str {
        match self {
            LookupProperty::Data { property, .. } => property,
            LookupProperty::Object { property, .. } => property,
        }
    }

    /// Literal for data properties, linked IRI for object properties
    pub fn value(&self) -> &str {
        match self {
            LookupProperty::Data { value, .. } => value,
            LookupProperty::Object { entity, .. } => entity,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, LookupProperty::Object { .. })
    }
}

/// Structured lookup query
///
/// Built once per incoming request and dropped after use.
///
/// # Example
///
/// ```
/// use lookup_core::lookup::{LookupQuery, LookupProperty, Strictness};
///
/// let query = LookupQuery::new("Ada")
///     .with_limit(5)
///     .with_type("http://xmlns.com/foaf/0.1/Person")
///     .with_strictness(Strictness::Should)
///     .with_property(LookupProperty::data("http://xmlns.com/foaf/0.1/family_name", "Lovelace"));
/// assert_eq!(query.limit(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupQuery {
    token: String,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strictness: Option<Strictness>,
    #[serde(default)]
    properties: Vec<LookupProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preferred_language: Option<String>,
}

impl LookupQuery {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            limit: DEFAULT_LIMIT,
            entity_type: None,
            strictness: None,
            properties: Vec::new(),
            preferred_language: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = Some(strictness);
        self
    }

    pub fn with_property(mut self, property: LookupProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_properties(mut self, properties: impl IntoIterator<Item = LookupProperty>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_preferred_language(mut self, language: impl Into<String>) -> Self {
        self.preferred_language = Some(language.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn strictness(&self) -> Option<Strictness> {
        self.strictness
    }

    pub fn properties(&self) -> &[LookupProperty] {
        &self.properties
    }

    pub fn preferred_language(&self) -> Option<&str> {
        self.preferred_language.as_deref()
    }

    /// No token, no type and no property filters
    pub fn is_empty(&self) -> bool {
        self.token.trim().is_empty() && self.entity_type.is_none() && self.properties.is_empty()
    }
}

/// A lookup query tagged with the caller's query id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub query_id: String,
    pub query: LookupQuery,
}

impl LookupRequest {
    pub fn new(query_id: impl Into<String>, query: LookupQuery) -> Self {
        Self {
            query_id: query_id.into(),
            query,
        }
    }
}

/// Entity type (id plus display name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    pub id: String,
    pub name: String,
}

impl EntityType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Type whose display name is the local part of its IRI
    pub fn from_iri(id: impl Into<String>) -> Self {
        let id = id.into();
        let name = local_name(&id).to_string();
        Self { id, name }
    }
}

/// Dataset a candidate was found in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub id: String,
    pub name: String,
}

/// One matching entity
///
/// Identity (id, name, types) is fixed at creation; only the score is
/// replaced, and only by building a new candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupCandidate {
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    types: Vec<EntityType>,
    score: f64,
    #[serde(rename = "match", default)]
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    dataset: Option<DatasetDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    description: Option<String>,
}

impl LookupCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            types: Vec::new(),
            score,
            matched: false,
            dataset: None,
            description: None,
        }
    }

    pub fn with_types(mut self, types: Vec<EntityType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_match(mut self, matched: bool) -> Self {
        self.matched = matched;
        self
    }

    pub fn with_dataset(mut self, dataset: Option<DatasetDescriptor>) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Copy of this candidate carrying a different score
    pub fn with_score(&self, score: f64) -> Self {
        Self {
            score,
            ..self.clone()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[EntityType] {
        &self.types
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    pub fn dataset(&self) -> Option<&DatasetDescriptor> {
        self.dataset.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Candidates for one query, in backend order (descending score)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub query_id: String,
    pub candidates: Vec<LookupCandidate>,
}

impl LookupResponse {
    pub fn new(query_id: impl Into<String>, candidates: Vec<LookupCandidate>) -> Self {
        Self {
            query_id: query_id.into(),
            candidates,
        }
    }

    /// Same candidates answered under another query id
    pub fn for_query(&self, query_id: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            candidates: self.candidates.clone(),
        }
    }
}

/// Local part of an IRI (after the last `#` or `/`)
pub fn local_name(iri: &str) -> &str {
    let trimmed = iri.trim_end_matches(['/', '#']);
    match trimmed.rfind(['#', '/']) {
        Some(idx) if idx + 1 < trimmed.len() => &trimmed[idx + 1..],
        _ => trimmed,
    }
}
