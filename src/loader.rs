//! Document ingestion: filetype dispatch, file and URL loading.
//!
//! A [`Loader`] turns an input source into a validated
//! [`Dataset`]: it resolves the package schema (fresh per load, no
//! cross-instance cache), dispatches on the input [`FileType`], and
//! for CSV/spreadsheet input hands the bytes to the configured
//! [`Unflattener`] collaborator before validating the nested result.
//!
//! Filetype guessing for URLs follows the response headers first:
//! content type, then the `Content-Disposition` filename, then the
//! URL's extension. Anything unmapped is an unrecognised-format error.

use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;

use crate::config::Config;
use crate::convert::{encoding_labels, guess_encoding, UnflattenOptions, Unflattener};
use crate::dataset::Dataset;
use crate::error::{LoadError, LoadResult};
use crate::schema::{HttpFetcher, SchemaFetcher, SchemaIndex};

// =============================================================================
// File types
// =============================================================================

/// Known input formats, dispatched explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    Csv,
    Xlsx,
}

impl FileType {
    /// Map a `Content-Type` header value to a filetype.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match media_type.as_str() {
            "application/json" => Some(FileType::Json),
            "text/csv" => Some(FileType::Csv),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(FileType::Xlsx)
            }
            _ => None,
        }
    }

    /// Map a file extension (without the dot) to a filetype.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim().to_ascii_lowercase().as_str() {
            "json" => Some(FileType::Json),
            "csv" => Some(FileType::Csv),
            "xlsx" | "xls" | "excel" => Some(FileType::Xlsx),
            _ => None,
        }
    }

    /// Guess the filetype from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FileType::Json => "json",
            FileType::Csv => "csv",
            FileType::Xlsx => "xlsx",
        })
    }
}

static FILENAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="?([^";]+)"?"#).expect("valid filename pattern"));

/// Guess the filetype from a `Content-Disposition` header's filename.
fn filetype_from_disposition(disposition: &str) -> Option<FileType> {
    let filename = FILENAME_PATTERN.captures(disposition)?.get(1)?.as_str();
    let extension = filename.rsplit('.').next()?;
    FileType::from_extension(extension)
}

// =============================================================================
// Loader
// =============================================================================

/// Loads 360Giving documents into validated datasets.
pub struct Loader {
    config: Config,
    fetcher: Box<dyn SchemaFetcher>,
    unflattener: Option<Box<dyn Unflattener>>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Loader {
    pub fn new(config: Config) -> Self {
        let fetcher = Box::new(HttpFetcher::new(config.user_agent.clone()));
        Self {
            config,
            fetcher,
            unflattener: None,
        }
    }

    /// Replace the schema fetcher (tests, embedded schemas).
    pub fn with_schema_fetcher(mut self, fetcher: Box<dyn SchemaFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Attach the tabular-to-nested collaborator required for
    /// CSV/spreadsheet input.
    pub fn with_unflattener(mut self, unflattener: Box<dyn Unflattener>) -> Self {
        self.unflattener = Some(unflattener);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch and resolve the configured package schema.
    pub fn resolve_schema(&self) -> LoadResult<SchemaIndex> {
        let document = self.fetcher.fetch(&self.config.schema_url)?;
        Ok(SchemaIndex::resolve(
            &document,
            &self.config.schema_url,
            self.fetcher.as_ref(),
            &self.config.root_id,
        )?)
    }

    /// Load an already-parsed nested document.
    pub fn from_value(&self, document: Value) -> LoadResult<Dataset> {
        let schema = self.resolve_schema()?;
        Dataset::load(document, schema, self.config.clone())
    }

    /// Load a JSON document from a reader.
    pub fn from_reader<R: Read>(&self, reader: R) -> LoadResult<Dataset> {
        let document = serde_json::from_reader(reader)?;
        self.from_value(document)
    }

    /// Load a document from a file, guessing the filetype from the
    /// extension when not given.
    pub fn from_path(&self, path: &Path, filetype: Option<FileType>) -> LoadResult<Dataset> {
        let filetype = filetype
            .or_else(|| FileType::from_path(path))
            .ok_or_else(|| LoadError::UnrecognisedFormat(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        self.from_bytes(&bytes, filetype)
    }

    /// Fetch a document over HTTP and load it.
    ///
    /// The filetype, when not given, is guessed from the content type,
    /// then the `Content-Disposition` filename, then the URL extension.
    /// Transport errors surface immediately with no retry.
    pub fn from_url(&self, url: &str, filetype: Option<FileType>) -> LoadResult<Dataset> {
        tracing::info!(url, "fetching document");
        let client = reqwest::blocking::Client::new();
        let response = client
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .send()?
            .error_for_status()?;

        let filetype = filetype
            .or_else(|| {
                header_str(&response, CONTENT_TYPE.as_str()).and_then(FileType::from_content_type)
            })
            .or_else(|| {
                header_str(&response, CONTENT_DISPOSITION.as_str())
                    .and_then(filetype_from_disposition)
            })
            .or_else(|| url.rsplit('.').next().and_then(FileType::from_extension))
            .ok_or_else(|| LoadError::UnrecognisedFormat(url.to_string()))?;

        let bytes = response.bytes()?;
        self.from_bytes(&bytes, filetype)
    }

    /// Load a document from raw bytes of a known filetype.
    pub fn from_bytes(&self, bytes: &[u8], filetype: FileType) -> LoadResult<Dataset> {
        match filetype {
            FileType::Json => {
                let document = serde_json::from_slice(bytes)?;
                self.from_value(document)
            }
            FileType::Csv | FileType::Xlsx => {
                let unflattener = self
                    .unflattener
                    .as_deref()
                    .ok_or(LoadError::MissingUnflattener(filetype))?;

                let mut options = UnflattenOptions::from_config(&self.config);
                if filetype == FileType::Csv {
                    let candidate = guess_encoding(bytes)
                        .ok_or_else(|| LoadError::Encoding(encoding_labels()))?;
                    options.encoding = Some(candidate.label().to_string());
                }

                let document = unflattener.unflatten(bytes, filetype, &options)?;
                self.from_value(document)
            }
        }
    }
}

fn header_str<'r>(response: &'r reqwest::blocking::Response, name: &str) -> Option<&'r str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}
