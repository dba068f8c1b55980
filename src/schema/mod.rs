//! Schema resolution, validation and rename-rule derivation.
//!
//! A [`SchemaIndex`] is built once per dataset from the 360Giving
//! package schema: every `$ref` is replaced by its target subtree
//! ([`deref`]), a Draft 4 validator with format assertion is compiled
//! against the result, and one traversal of the per-grant properties
//! derives the ordered field rename rules ([`rename`]).
//!
//! Validation filters out one known false positive: 360Giving date
//! fields are polymorphic `oneOf` alternatives whose first branch is
//! `{"format": "date-time"}`, and a date-only value trips the whole
//! `oneOf` even though the document is fine. Those errors are
//! suppressed; everything else is surfaced.

pub mod deref;
pub mod rename;

pub use deref::{dereference, HttpFetcher, MapFetcher, SchemaFetcher};
pub use rename::{derive_rename_rules, RenameRule};

use jsonschema::Validator;
use serde_json::{json, Value};

use crate::error::{SchemaError, SchemaResult, ValidationFailure};

/// A resolved package schema: dereferenced document, compiled
/// validator and ordered rename rules.
pub struct SchemaIndex {
    schema: Value,
    validator: Validator,
    rename_rules: Vec<RenameRule>,
}

impl SchemaIndex {
    /// Resolve a fetched schema document.
    ///
    /// `base_url` is where `document` came from; relative `$ref`s are
    /// joined against it and fetched through `fetcher`. `root_id` is
    /// the key holding the record list (`grants`); a schema without
    /// `properties.<root_id>.items.properties` is malformed.
    pub fn resolve(
        document: &Value,
        base_url: &str,
        fetcher: &dyn SchemaFetcher,
        root_id: &str,
    ) -> SchemaResult<Self> {
        let schema = dereference(document, base_url, fetcher)?;

        // Declared string formats (date-time, email, ...) are hard
        // constraints, not hints.
        let validator = jsonschema::draft4::options()
            .should_validate_formats(true)
            .build(&schema)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;

        let properties = schema
            .pointer(&format!("/properties/{root_id}/items/properties"))
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::MalformedSchema(root_id.to_string()))?;
        let rename_rules = derive_rename_rules(properties)?;
        tracing::debug!(rules = rename_rules.len(), "schema resolved");

        Ok(Self {
            schema,
            validator,
            rename_rules,
        })
    }

    /// Resolve a schema supplied as a value, without remote fetching.
    /// Internal (`#/...`) references still resolve.
    pub fn from_value(schema: &Value, root_id: &str) -> SchemaResult<Self> {
        Self::resolve(schema, "urn:x-threesixty:inline", &MapFetcher::new(), root_id)
    }

    /// The fully dereferenced schema document.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Ordered rename rules derived from the schema.
    pub fn rename_rules(&self) -> &[RenameRule] {
        &self.rename_rules
    }

    /// Validate a document, returning every surfaced failure.
    ///
    /// Failures of a `oneOf` whose first alternative is exactly
    /// `{"format": "date-time"}` are suppressed; all other errors pass
    /// through with their instance path, keyword and message.
    pub fn validate(&self, document: &Value) -> Vec<ValidationFailure> {
        self.iter_failures(document).collect()
    }

    /// Lazily iterate surfaced failures, applying the same suppression
    /// as [`Self::validate`].
    pub fn iter_failures<'a>(
        &'a self,
        document: &'a Value,
    ) -> impl Iterator<Item = ValidationFailure> + 'a {
        self.validator
            .iter_errors(document)
            .filter(|error| !self.is_suppressed(error))
            .map(|error| {
                let schema_path = error.schema_path().to_string();
                ValidationFailure {
                    instance_path: error.instance_path().to_string(),
                    keyword: keyword_of(&schema_path),
                    message: error.to_string(),
                }
            })
    }

    /// Whether `document` validates with zero surfaced failures.
    pub fn is_valid(&self, document: &Value) -> bool {
        self.validate(document).is_empty()
    }

    fn is_suppressed(&self, error: &jsonschema::ValidationError) -> bool {
        let schema_path = error.schema_path().to_string();
        if keyword_of(&schema_path) != "oneOf" {
            return false;
        }
        let first_alternative = self
            .schema
            .pointer(&schema_path)
            .and_then(Value::as_array)
            .and_then(|alternatives| alternatives.first());
        first_alternative == Some(&json!({ "format": "date-time" }))
    }
}

impl std::fmt::Debug for SchemaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaIndex")
            .field("rename_rules", &self.rename_rules.len())
            .finish_non_exhaustive()
    }
}

/// The violated keyword: last non-index segment of a schema path.
fn keyword_of(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or("")
        .to_string()
}
