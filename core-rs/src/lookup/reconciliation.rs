//! Reconciliation Service API batch format
//!
//! Requests arrive as a JSON object keyed by query id:
//!
//! ```json
//! {
//!   "q0": {
//!     "query": "Ada Lovelace",
//!     "type": "http://xmlns.com/foaf/0.1/Person",
//!     "limit": 3,
//!     "type_strict": "should",
//!     "properties": [
//!       { "pid": "http://xmlns.com/foaf/0.1/family_name", "v": "Lovelace" },
//!       { "pid": "http://xmlns.com/foaf/0.1/knows", "v": { "id": "http://ex.org/babbage" } }
//!     ]
//!   }
//! }
//! ```
//!
//! and are answered as `{"q0": {"result": [candidate, ...]}}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::Result;
use crate::lookup::model::{LookupCandidate, LookupProperty, LookupQuery, LookupRequest, LookupResponse, Strictness};

/// `type` may be a single IRI or a list; only the first entry is used
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypeFilter {
    One(String),
    Many(Vec<String>),
}

impl TypeFilter {
    pub fn first(&self) -> Option<&str> {
        match self {
            TypeFilter::One(t) => Some(t.as_str()),
            TypeFilter::Many(ts) => ts.first().map(String::as_str),
        }
    }
}

/// Value of a property filter
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Entity { id: String },
    Text(String),
    Many(Vec<PropertyValue>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyFilter {
    pub pid: String,
    pub v: PropertyValue,
}

impl PropertyFilter {
    fn push_properties(&self, value: &PropertyValue, out: &mut Vec<LookupProperty>) {
        match value {
            PropertyValue::Entity { id } => out.push(LookupProperty::object(&self.pid, id)),
            PropertyValue::Text(text) => out.push(LookupProperty::data(&self.pid, text)),
            PropertyValue::Many(values) => {
                for v in values {
                    self.push_properties(v, out);
                }
            }
            PropertyValue::Other(serde_json::Value::Null) => {}
            PropertyValue::Other(other) => out.push(LookupProperty::data(&self.pid, other.to_string())),
        }
    }

    /// One lookup property per value (lists expand)
    pub fn to_properties(&self) -> Vec<LookupProperty> {
        let mut out = Vec::new();
        self.push_properties(&self.v, &mut out);
        out
    }
}

/// One query of a batch
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReconciliationQuery {
    #[serde(default)]
    pub query: String,
    #[serde(rename = "type", default)]
    pub entity_type: Option<TypeFilter>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub type_strict: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyFilter>,
}

impl ReconciliationQuery {
    pub fn to_lookup_query(&self) -> LookupQuery {
        let mut query = LookupQuery::new(self.query.trim());

        if let Some(limit) = self.limit {
            query = query.with_limit(limit);
        }
        if let Some(t) = self.entity_type.as_ref().and_then(TypeFilter::first) {
            query = query.with_type(t);
        }
        // "any" and unknown values leave strictness unset
        if let Some(strictness) = self.type_strict.as_deref().and_then(Strictness::parse) {
            query = query.with_strictness(strictness);
        }

        query.with_properties(self.properties.iter().flat_map(PropertyFilter::to_properties))
    }
}

/// Parse a batch into requests ordered by query id
pub fn parse_batch(json: &str) -> Result<Vec<LookupRequest>> {
    let batch: BTreeMap<String, ReconciliationQuery> = serde_json::from_str(json)?;
    Ok(batch
        .into_iter()
        .map(|(id, q)| {
            let query = q.to_lookup_query();
            LookupRequest::new(id, query)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub result: Vec<LookupCandidate>,
}

/// Batch answer keyed by query id
pub fn batch_results(responses: &[LookupResponse]) -> BTreeMap<String, ReconciliationResult> {
    responses
        .iter()
        .map(|r| {
            (
                r.query_id.clone(),
                ReconciliationResult {
                    result: r.candidates.clone(),
                },
            )
        })
        .collect()
}

pub fn batch_results_json(responses: &[LookupResponse]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&batch_results(responses))?)
}
