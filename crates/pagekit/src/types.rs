//! Core types for PageKit

use schemars::{schema::RootSchema, schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

/// Page metadata gathered during extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// Text of the first `<title>` element, as it appeared in the page
    pub title: String,

    /// Value of the description `<meta>` tag, empty if none matched
    #[serde(default)]
    pub description: String,

    /// UTC time extraction finished, RFC3339 formatted
    pub timestamp: String,

    /// HTTP status code of the response
    pub status_code: u16,
}

/// A fetched and extracted page
///
/// Serializes to the message shape consumed by the indexer:
/// `{"url", "text", "metadata": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    /// Source URL (empty when extracted from a local buffer)
    pub url: String,

    /// Normalized body text
    pub text: String,

    /// Title, description, timestamp and status
    #[serde(rename = "metadata")]
    pub meta: Metadata,
}

impl Document {
    /// JSON Schema of the serialized document
    pub fn json_schema() -> RootSchema {
        schema_for!(Document)
    }

    /// First `max_chars` characters of the text
    ///
    /// Never splits a multi-byte character; shorter text is returned whole.
    pub fn text_preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}
