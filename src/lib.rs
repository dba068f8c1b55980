//! # threesixty - 360Giving grant data loading, validation and export
//!
//! Loads grant-making data published in the
//! [360Giving standard](https://www.threesixtygiving.org/), validates
//! it against the published JSON Schema, and re-exports it into flat
//! tabular formats with human-friendly column names.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  JSON / CSV  │───▶│   Loader     │───▶│   Dataset    │───▶│ CSV/XLSX/JSON│
//! │  / XLSX in   │    │ (schema +    │    │ (validated,  │    │  flat table  │
//! │              │    │  validation) │    │  iterable)   │    │  out         │
//! └──────────────┘    └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use threesixty::{Config, Loader};
//!
//! let loader = Loader::new(Config::default());
//! let dataset = loader.from_path("grants.json".as_ref(), None)?;
//! for grant in dataset.grants() {
//!     println!("{grant}");
//! }
//! dataset.to_csv_path("grants.csv".as_ref(), true)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Schema URLs, root key, user agent
//! - [`schema`] - Schema dereferencing, validation, rename rules
//! - [`grant`] - The grant record type
//! - [`flatten`] - Nested-to-flat transformation
//! - [`mapper`] - Flat field name to display name mapping
//! - [`dataset`] - The validated dataset and its exports
//! - [`loader`] - Filetype dispatch and file/URL ingestion
//! - [`convert`] - Unflattening seam and encoding guessing

// Core modules
pub mod config;
pub mod error;

// Schema handling
pub mod schema;

// Records and transformation
pub mod flatten;
pub mod grant;
pub mod mapper;

// Dataset and exports
pub mod dataset;

// Ingestion
pub mod convert;
pub mod loader;

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    Config, DEFAULT_RECORD_SCHEMA_URL, DEFAULT_ROOT_ID, DEFAULT_SCHEMA_URL, DEFAULT_USER_AGENT,
};

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExportError, ExportResult, LoadError, LoadResult, SchemaError, SchemaResult, ValidationFailure,
};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{
    derive_rename_rules, HttpFetcher, MapFetcher, RenameRule, SchemaFetcher, SchemaIndex,
};

// =============================================================================
// Re-exports - Records and flattening
// =============================================================================

pub use flatten::{flatten, FlatRow};
pub use grant::Grant;
pub use mapper::{map_field_names, FieldNameMap};

// =============================================================================
// Re-exports - Dataset
// =============================================================================

pub use dataset::{Dataset, Table};

// =============================================================================
// Re-exports - Ingestion
// =============================================================================

pub use convert::{
    encoding_labels, guess_encoding, EncodingCandidate, UnflattenOptions, Unflattener,
    ENCODINGS_TO_CHECK,
};
pub use loader::{FileType, Loader};
