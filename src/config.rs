//! Dataset configuration.
//!
//! The original 360Giving tooling hard-codes the package schema URL,
//! the root list key and the user agent. Here they live in an explicit
//! [`Config`] passed into constructors, so a dataset can point at a
//! different schema version without global state.

/// Default 360Giving package schema (the document validated against).
pub const DEFAULT_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/ThreeSixtyGiving/standard/master/schema/360-giving-package-schema.json";

/// Default 360Giving grant schema, passed to the unflattening
/// collaborator so titled CSV/spreadsheet columns convert back to
/// canonical field names.
pub const DEFAULT_RECORD_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/ThreeSixtyGiving/standard/master/schema/360-giving-schema.json";

/// Root key holding the record list in a 360Giving package.
pub const DEFAULT_ROOT_ID: &str = "grants";

/// User agent sent with schema and document fetches.
pub const DEFAULT_USER_AGENT: &str = "360Giving data";

/// Configuration for loading a 360Giving dataset.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the package schema used for validation.
    pub schema_url: String,
    /// URL of the per-record schema used when unflattening tabular input.
    pub record_schema_url: String,
    /// Key holding the record list (`grants`).
    pub root_id: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_url: DEFAULT_SCHEMA_URL.to_string(),
            record_schema_url: DEFAULT_RECORD_SCHEMA_URL.to_string(),
            root_id: DEFAULT_ROOT_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Override the package schema URL.
    pub fn with_schema_url(mut self, url: impl Into<String>) -> Self {
        self.schema_url = url.into();
        self
    }

    /// Override the per-record schema URL.
    pub fn with_record_schema_url(mut self, url: impl Into<String>) -> Self {
        self.record_schema_url = url.into();
        self
    }

    /// Override the root list key.
    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }
}
