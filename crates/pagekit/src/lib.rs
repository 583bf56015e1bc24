//! PageKit - single-page text extraction for indexing pipelines
//!
//! This crate fetches one web page over HTTP and extracts a normalized
//! plain-text body plus metadata (title, description, status code and
//! retrieval timestamp).
//!
//! ## Pipeline
//!
//! - [`fetch`] issues one GET with a 5 second timeout. Transport failures
//!   and non-200 responses are returned as [`FetchError`].
//! - [`Tokenizer`] turns the body into a lazy stream of [`Token`]s.
//! - [`Extractor`] consumes the stream in a single pass and builds the
//!   [`Document`].
//!
//! Extraction never fails; malformed HTML yields whatever text was found
//! before the malformed point.
//!
//! ```
//! let doc = pagekit::extract("<title>Hi</title><p>Hello <b>World</b></p>".bytes());
//! assert_eq!(doc.meta.title, "Hi");
//! assert_eq!(doc.text, "hello world");
//! ```

pub mod client;
mod error;
mod extract;
pub mod tokenizer;
mod types;

pub use client::{fetch, fetch_with_options, FetchOptions, DEFAULT_TIMEOUT};
pub use error::FetchError;
pub use extract::{attr_equals, attr_map, extract, normalize_text, Extractor};
pub use tokenizer::{Attribute, Tag, Token, Tokenizer};
pub use types::{Document, Metadata};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Everruns PageKit/1.0";
