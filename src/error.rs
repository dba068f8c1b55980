//! Error types for loading, validating and exporting 360Giving data.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SchemaError`] - schema fetching, dereferencing and rule derivation
//! - [`LoadError`] - top-level document ingestion errors
//! - [`ExportError`] - tabular/JSON output errors
//! - [`ValidationFailure`] - one surfaced schema violation
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. Everything is
//! fail-fast: nothing is retried or recovered internally.

use thiserror::Error;

// =============================================================================
// Validation Failures
// =============================================================================

/// A single schema violation surfaced by validation.
///
/// Carries the JSON pointer to the offending value, the violated
/// schema keyword and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// JSON pointer to the offending value (e.g. `/grants/0/awardDate`).
    pub instance_path: String,
    /// The violated schema keyword (e.g. `required`, `type`).
    pub keyword: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "[{}] {}", self.keyword, self.message)
        } else {
            write!(f, "{}: [{}] {}", self.instance_path, self.keyword, self.message)
        }
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while fetching or resolving a JSON Schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Network fetch for a schema document failed.
    #[error("Failed to fetch schema: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Schema document is not valid JSON.
    #[error("Schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema is missing the expected package structure.
    #[error("Malformed schema: missing `properties.{0}.items.properties`")]
    MalformedSchema(String),

    /// A `$ref` chain loops back on itself.
    #[error("Circular schema reference: {0}")]
    CircularReference(String),

    /// A `$ref` target does not exist.
    #[error("Unresolvable schema reference: {0}")]
    UnresolvableRef(String),

    /// The dereferenced schema was rejected by the validator builder.
    #[error("Schema failed to compile: {0}")]
    Compile(String),

    /// A derived rename rule is not a valid regex.
    #[error("Invalid rename pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

// =============================================================================
// Load Errors (top-level)
// =============================================================================

/// Top-level document ingestion errors.
///
/// This is the main error type returned by [`crate::loader::Loader`]
/// and [`crate::dataset::Dataset::load`]. It wraps all lower-level
/// errors and adds load-specific variants.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the input file.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Network fetch for a source document failed.
    #[error("Failed to fetch document: {0}")]
    Transport(#[from] reqwest::Error),

    /// Input is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Input content-type/extension does not map to a known filetype.
    #[error("Unrecognised file type [{0}]")]
    UnrecognisedFormat(String),

    /// Schema resolution failed.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The document failed schema validation; no partial dataset is kept.
    #[error("Invalid document: {} validation error(s)", .errors.len())]
    Invalid { errors: Vec<ValidationFailure> },

    /// No candidate encoding decodes the input cleanly.
    #[error("No usable encoding found (tried: {0})")]
    Encoding(String),

    /// CSV/spreadsheet input was given but no unflattener is configured.
    #[error("Loading {0} input requires an unflattener")]
    MissingUnflattener(crate::loader::FileType),

    /// The external unflattening collaborator failed.
    #[error("Unflatten failed: {0}")]
    Unflatten(String),
}

impl LoadError {
    /// Every surfaced validation failure, when the load failed validation.
    pub fn validation_failures(&self) -> &[ValidationFailure] {
        match self {
            LoadError::Invalid { errors } => errors,
            _ => &[],
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing exported output.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to write the output file.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writing failed.
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// The requested export variant is not implemented.
    #[error("Not implemented: {0}")]
    Unsupported(&'static str),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // SchemaError -> LoadError
        let schema_err = SchemaError::MalformedSchema("grants".into());
        let load_err: LoadError = schema_err.into();
        assert!(load_err.to_string().contains("grants"));
    }

    #[test]
    fn test_validation_failure_display() {
        let failure = ValidationFailure {
            instance_path: "/grants/0/id".into(),
            keyword: "type".into(),
            message: "\"x\" is not of type \"number\"".into(),
        };
        let msg = failure.to_string();
        assert!(msg.contains("/grants/0/id"));
        assert!(msg.contains("[type]"));
    }

    #[test]
    fn test_invalid_load_enumerates_failures() {
        let err = LoadError::Invalid {
            errors: vec![
                ValidationFailure {
                    instance_path: "/grants/0".into(),
                    keyword: "required".into(),
                    message: "\"id\" is a required property".into(),
                },
                ValidationFailure {
                    instance_path: "/grants/1/amountAwarded".into(),
                    keyword: "type".into(),
                    message: "not a number".into(),
                },
            ],
        };
        assert_eq!(err.validation_failures().len(), 2);
        assert!(err.to_string().contains("2 validation error(s)"));
    }

    #[test]
    fn test_unsupported_export_message() {
        let err = ExportError::Unsupported("multi-sheet spreadsheet output");
        assert!(err.to_string().contains("Not implemented"));
    }
}
