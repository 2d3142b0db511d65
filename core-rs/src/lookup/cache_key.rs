//! Cache key derivation
//!
//! Semantically identical requests must collapse onto one cache entry, so
//! the key depends only on what changes the generated query and never on
//! the order in which the caller listed property filters.

use crate::lookup::model::{LookupProperty, LookupQuery};

const SEPARATOR: &str = "--";

/// Backslash-escapes the characters the layout uses as delimiters
fn push_escaped(key: &mut String, segment: &str) {
    for c in segment.chars() {
        if matches!(c, '\\' | '-' | '=' | '"') {
            key.push('\\');
        }
        key.push(c);
    }
}

/// Deterministic cache key for a lookup query
///
/// Layout: `<token>--<type>--<limit>[--<strictness>][--@<lang>]` followed by
/// `--<property>=<value>` for every property filter, sorted by property IRI
/// and then value. Object values are written as the linked IRI, data values
/// in double quotes. `\`, `-`, `=` and `"` inside any segment are escaped
/// with a backslash, so distinct queries never render the same key.
///
/// # Example
///
/// ```
/// use lookup_core::lookup::{create_cache_key, LookupQuery, LookupProperty};
///
/// let a = LookupQuery::new("Ada")
///     .with_property(LookupProperty::data("http://ex.org/b", "2"))
///     .with_property(LookupProperty::data("http://ex.org/a", "1"));
/// let b = LookupQuery::new("Ada")
///     .with_property(LookupProperty::data("http://ex.org/a", "1"))
///     .with_property(LookupProperty::data("http://ex.org/b", "2"));
/// assert_eq!(create_cache_key(&a), create_cache_key(&b));
/// ```
pub fn create_cache_key(query: &LookupQuery) -> String {
    let mut key = String::new();
    push_escaped(&mut key, query.token());
    key.push_str(SEPARATOR);
    push_escaped(&mut key, query.entity_type().unwrap_or(""));
    key.push_str(SEPARATOR);
    key.push_str(&query.limit().to_string());

    if let Some(strictness) = query.strictness() {
        key.push_str(SEPARATOR);
        key.push_str(strictness.as_str());
    }

    if let Some(language) = query.preferred_language() {
        key.push_str(SEPARATOR);
        key.push('@');
        push_escaped(&mut key, language);
    }

    let mut properties: Vec<&LookupProperty> = query.properties().iter().collect();
    properties.sort_by(|a, b| {
        a.property()
            .cmp(b.property())
            .then_with(|| a.value().cmp(b.value()))
            .then_with(|| a.is_object().cmp(&b.is_object()))
    });

    for property in properties {
        key.push_str(SEPARATOR);
        push_escaped(&mut key, property.property());
        key.push('=');
        if property.is_object() {
            push_escaped(&mut key, property.value());
        } else {
            key.push('"');
            push_escaped(&mut key, property.value());
            key.push('"');
        }
    }

    key
}
