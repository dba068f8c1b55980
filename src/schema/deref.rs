//! JSON Schema `$ref` dereferencing.
//!
//! The 360Giving package schema references the per-grant schema by
//! relative URL, so resolving it means fetching and splicing in other
//! documents, not just following internal pointers. [`dereference`]
//! replaces every `$ref` node with the subtree it points to, producing
//! a self-contained schema the validator can compile without any
//! resolver of its own.
//!
//! Shared targets are expanded once per reference site (plain value
//! duplication). A reference chain that loops back on itself is
//! rejected with [`SchemaError::CircularReference`] rather than
//! recursing forever.

use std::collections::HashMap;

use reqwest::Url;
use serde_json::{Map, Value};

use crate::error::{SchemaError, SchemaResult};

/// Fetches schema documents by URL.
///
/// The default implementation is [`HttpFetcher`]; tests and embedded
/// schemas use in-memory implementations instead.
pub trait SchemaFetcher {
    /// Fetch and parse the document at `url`.
    fn fetch(&self, url: &str) -> SchemaResult<Value>;
}

/// Fetches schema documents over HTTP with a configured user agent.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            user_agent: user_agent.into(),
        }
    }
}

impl SchemaFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> SchemaResult<Value> {
        tracing::debug!(url, "fetching schema document");
        let value = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(value)
    }
}

/// Resolves schema documents from an in-memory map of URL to document.
///
/// Used when the schema is embedded or supplied by a test; any URL not
/// present in the map is an unresolvable reference.
pub struct MapFetcher {
    documents: HashMap<String, Value>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    pub fn insert(&mut self, url: impl Into<String>, document: Value) {
        self.documents.insert(url.into(), document);
    }
}

impl Default for MapFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaFetcher for MapFetcher {
    fn fetch(&self, url: &str) -> SchemaResult<Value> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| SchemaError::UnresolvableRef(url.to_string()))
    }
}

/// Replace every `$ref` in `document` with the subtree it points to.
///
/// `base_url` is the URL the document was fetched from; relative
/// references are joined against it. Cross-document references are
/// fetched through `fetcher` and cached for the duration of the call.
pub fn dereference(
    document: &Value,
    base_url: &str,
    fetcher: &dyn SchemaFetcher,
) -> SchemaResult<Value> {
    let mut resolver = Resolver {
        fetcher,
        documents: HashMap::new(),
        in_flight: Vec::new(),
    };
    resolver
        .documents
        .insert(base_url.to_string(), document.clone());
    resolver.expand(document, base_url)
}

struct Resolver<'a> {
    fetcher: &'a dyn SchemaFetcher,
    /// Documents fetched during this resolution, keyed by URL.
    documents: HashMap<String, Value>,
    /// Reference targets currently being expanded, for cycle detection.
    in_flight: Vec<String>,
}

impl Resolver<'_> {
    fn expand(&mut self, node: &Value, base_url: &str) -> SchemaResult<Value> {
        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.resolve_ref(reference, base_url);
                }
                let mut out = Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), self.expand(value, base_url)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.expand(item, base_url))
                    .collect::<SchemaResult<Vec<_>>>()?,
            )),
            scalar => Ok(scalar.clone()),
        }
    }

    fn resolve_ref(&mut self, reference: &str, base_url: &str) -> SchemaResult<Value> {
        let (target_url, pointer) = split_ref(reference, base_url)?;
        let key = format!("{target_url}#{pointer}");
        if self.in_flight.contains(&key) {
            return Err(SchemaError::CircularReference(reference.to_string()));
        }

        let document = self.document(&target_url)?;
        let target = document
            .pointer(&pointer)
            .cloned()
            .ok_or_else(|| SchemaError::UnresolvableRef(reference.to_string()))?;

        // Refs inside the target resolve against the target's own URL.
        self.in_flight.push(key);
        let expanded = self.expand(&target, &target_url);
        self.in_flight.pop();
        expanded
    }

    fn document(&mut self, url: &str) -> SchemaResult<Value> {
        if let Some(document) = self.documents.get(url) {
            return Ok(document.clone());
        }
        let document = self.fetcher.fetch(url)?;
        self.documents.insert(url.to_string(), document.clone());
        Ok(document)
    }
}

/// Split a `$ref` value into the absolute URL of the target document
/// and the JSON pointer within it.
fn split_ref(reference: &str, base_url: &str) -> SchemaResult<(String, String)> {
    let (url_part, fragment) = match reference.split_once('#') {
        Some((url, fragment)) => (url, fragment),
        None => (reference, ""),
    };

    let target_url = if url_part.is_empty() {
        base_url.to_string()
    } else {
        let base = Url::parse(base_url).map_err(|e| {
            SchemaError::UnresolvableRef(format!("{reference} (bad base URL {base_url}: {e})"))
        })?;
        base.join(url_part)
            .map_err(|e| SchemaError::UnresolvableRef(format!("{reference}: {e}")))?
            .to_string()
    };

    // An empty pointer addresses the whole document.
    Ok((target_url, fragment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://example.org/schema/package.json";

    #[test]
    fn test_internal_ref() {
        let schema = json!({
            "definitions": { "name": { "type": "string", "title": "Name" } },
            "properties": { "name": { "$ref": "#/definitions/name" } }
        });
        let resolved = dereference(&schema, BASE, &MapFetcher::new()).unwrap();
        assert_eq!(
            resolved["properties"]["name"],
            json!({ "type": "string", "title": "Name" })
        );
    }

    #[test]
    fn test_cross_document_relative_ref() {
        let mut fetcher = MapFetcher::new();
        fetcher.insert(
            "https://example.org/schema/grant.json",
            json!({ "type": "object", "properties": { "id": { "type": "string" } } }),
        );
        let schema = json!({
            "properties": {
                "grants": { "type": "array", "items": { "$ref": "grant.json" } }
            }
        });
        let resolved = dereference(&schema, BASE, &fetcher).unwrap();
        assert_eq!(
            resolved["properties"]["grants"]["items"]["properties"]["id"],
            json!({ "type": "string" })
        );
    }

    #[test]
    fn test_ref_with_fragment_into_other_document() {
        let mut fetcher = MapFetcher::new();
        fetcher.insert(
            "https://example.org/schema/defs.json",
            json!({ "definitions": { "currency": { "title": "Currency" } } }),
        );
        let schema = json!({ "$ref": "defs.json#/definitions/currency" });
        let resolved = dereference(&schema, BASE, &fetcher).unwrap();
        assert_eq!(resolved, json!({ "title": "Currency" }));
    }

    #[test]
    fn test_nested_refs_resolved_transitively() {
        let schema = json!({
            "definitions": {
                "inner": { "type": "integer" },
                "outer": { "items": { "$ref": "#/definitions/inner" } }
            },
            "properties": { "values": { "$ref": "#/definitions/outer" } }
        });
        let resolved = dereference(&schema, BASE, &MapFetcher::new()).unwrap();
        assert_eq!(
            resolved["properties"]["values"]["items"],
            json!({ "type": "integer" })
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let schema = json!({
            "definitions": { "node": { "next": { "$ref": "#/definitions/node" } } },
            "properties": { "root": { "$ref": "#/definitions/node" } }
        });
        let err = dereference(&schema, BASE, &MapFetcher::new()).unwrap_err();
        assert!(matches!(err, SchemaError::CircularReference(_)));
    }

    #[test]
    fn test_missing_pointer_is_unresolvable() {
        let schema = json!({ "properties": { "x": { "$ref": "#/definitions/missing" } } });
        let err = dereference(&schema, BASE, &MapFetcher::new()).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvableRef(_)));
    }

    #[test]
    fn test_same_target_referenced_twice() {
        let schema = json!({
            "definitions": { "id": { "type": "string" } },
            "properties": {
                "a": { "$ref": "#/definitions/id" },
                "b": { "$ref": "#/definitions/id" }
            }
        });
        let resolved = dereference(&schema, BASE, &MapFetcher::new()).unwrap();
        assert_eq!(resolved["properties"]["a"], resolved["properties"]["b"]);
    }
}
