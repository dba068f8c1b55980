//! Input-side collaborators: tabular-to-nested conversion and text
//! encoding guessing.
//!
//! CSV and spreadsheet input first has to be unflattened back into the
//! nested `{ "grants": [...] }` shape before it can be validated. That
//! conversion is delegated to an external collaborator through the
//! [`Unflattener`] trait; this crate only prepares the options the
//! collaborator needs (root list path, schema URLs, encoding) and
//! consumes its JSON output.
//!
//! Published CSV files arrive in a handful of encodings, so loading
//! one starts by trying a fixed candidate list in order and picking
//! the first that decodes the whole file without error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::LoadResult;
use crate::loader::FileType;

// =============================================================================
// Encoding guessing
// =============================================================================

/// Candidate encodings tried in order when loading CSV input.
pub const ENCODINGS_TO_CHECK: [EncodingCandidate; 3] = [
    EncodingCandidate::Utf8Sig,
    EncodingCandidate::Windows1252,
    EncodingCandidate::Latin1,
];

/// One candidate text encoding for CSV input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingCandidate {
    /// UTF-8, tolerating a leading byte-order mark.
    Utf8Sig,
    /// Windows code page 1252.
    Windows1252,
    /// ISO-8859-1.
    Latin1,
}

impl EncodingCandidate {
    /// The label handed to the unflattening collaborator.
    pub fn label(&self) -> &'static str {
        match self {
            EncodingCandidate::Utf8Sig => "utf-8-sig",
            EncodingCandidate::Windows1252 => "windows-1252",
            EncodingCandidate::Latin1 => "latin-1",
        }
    }

    /// Decode `bytes` fully, or `None` on any decoding error.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            EncodingCandidate::Utf8Sig => {
                let stripped = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
                std::str::from_utf8(stripped).ok().map(str::to_string)
            }
            EncodingCandidate::Windows1252 => {
                // Bytes with no assignment in cp1252.
                if bytes
                    .iter()
                    .any(|b| matches!(b, 0x81 | 0x8d | 0x8f | 0x90 | 0x9d))
                {
                    return None;
                }
                let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
                (!had_errors).then(|| text.into_owned())
            }
            EncodingCandidate::Latin1 => {
                // Every byte value maps in ISO-8859-1.
                Some(bytes.iter().map(|&b| b as char).collect())
            }
        }
    }
}

impl std::fmt::Display for EncodingCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Pick the first candidate encoding that decodes `bytes` without error.
pub fn guess_encoding(bytes: &[u8]) -> Option<EncodingCandidate> {
    ENCODINGS_TO_CHECK
        .iter()
        .copied()
        .find(|candidate| candidate.decode(bytes).is_some())
}

/// Comma-joined candidate labels, for error messages.
pub fn encoding_labels() -> String {
    ENCODINGS_TO_CHECK
        .iter()
        .map(|candidate| candidate.label())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Unflattening collaborator
// =============================================================================

/// Options handed to the unflattening collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnflattenOptions {
    /// Key the record list lives under (`grants`).
    pub root_list_path: String,
    /// Per-record schema URL driving title-to-fieldname conversion.
    pub schema_url: String,
    /// Package schema URL for the metadata tab of spreadsheet input.
    pub metatab_schema_url: String,
    /// Detected or caller-supplied input encoding label.
    pub encoding: Option<String>,
    /// Whether column titles convert back to canonical field names.
    pub convert_titles: bool,
}

impl UnflattenOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            root_list_path: config.root_id.clone(),
            schema_url: config.record_schema_url.clone(),
            metatab_schema_url: config.schema_url.clone(),
            encoding: None,
            convert_titles: true,
        }
    }
}

/// External tabular-to-nested converter.
///
/// Implementations receive the raw input bytes and must return the
/// nested package document (`{ "grants": [...] }`) for validation.
pub trait Unflattener {
    fn unflatten(
        &self,
        bytes: &[u8],
        filetype: FileType,
        options: &UnflattenOptions,
    ) -> LoadResult<Value>;
}
