//! Text and metadata extraction
//!
//! [`Extractor`] walks the token stream once. It collects the page title
//! and description, drops the bodies of `script`, `noscript` and `style`,
//! and inserts line breaks for block elements. The raw buffer is normalized
//! into [`Document::text`] when the stream ends.

use crate::tokenizer::{Attribute, Tag, Token, Tokenizer};
use crate::types::{Document, Metadata};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Elements whose whole subtree is dropped
const SKIP_TAGS: &[&str] = &["script", "noscript", "style"];

/// Elements that start a new line
const BREAK_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "div", "br"];

/// Marker written for each list item
const BULLET: &str = "\n• ";

/// Status reported by extraction; fetch only extracts 200 responses
const EXTRACTED_STATUS: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Dropping tokens until the end tag with this name
    Suppressing(String),
}

/// Single-pass consumer of [`Token`]s
///
/// Titles are first-wins: once set, later `<title>` elements are ignored.
/// Descriptions are last-wins across tags, so a `<meta name="description">`
/// that follows an `og:description` tag replaces it.
#[derive(Debug)]
pub struct Extractor {
    mode: Mode,
    raw: String,
    title: Option<String>,
    description: Option<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Create an extractor with an empty buffer
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            raw: String::new(),
            title: None,
            description: None,
        }
    }

    /// Consume every token from `tokens`
    pub fn consume<T>(&mut self, tokens: T)
    where
        T: IntoIterator<Item = Token>,
    {
        let mut tokens = tokens.into_iter();
        while let Some(token) = tokens.next() {
            self.step(token, &mut tokens);
        }
    }

    /// Text accumulated so far, before normalization
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    /// True while the body of a skipped element is being dropped
    pub fn is_suppressing(&self) -> bool {
        matches!(self.mode, Mode::Suppressing(_))
    }

    /// Normalize the buffer and stamp the document
    pub fn finish(self) -> Document {
        let text = normalize_text(&self.raw);
        debug!(
            raw_len = self.raw.len(),
            text_len = text.len(),
            has_title = self.title.is_some(),
            "Extraction finished"
        );

        Document {
            url: String::new(),
            text,
            meta: Metadata {
                title: self.title.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                status_code: EXTRACTED_STATUS,
            },
        }
    }

    fn step(&mut self, token: Token, rest: &mut impl Iterator<Item = Token>) {
        if let Mode::Suppressing(skip) = &self.mode {
            if matches!(&token, Token::EndTag(name) if name == skip) {
                self.mode = Mode::Normal;
            }
            return;
        }

        match token {
            Token::StartTag(tag) | Token::SelfClosingTag(tag) => self.open_tag(tag, rest),
            Token::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    self.raw.push_str(text);
                    self.raw.push(' ');
                }
            }
            Token::EndTag(_) | Token::Comment(_) | Token::Doctype(_) => {}
        }
    }

    fn open_tag(&mut self, tag: Tag, rest: &mut impl Iterator<Item = Token>) {
        match tag.name.as_str() {
            "title" => {
                // Only the token right after <title> can be its text
                if let Some(Token::Text(text)) = rest.next() {
                    if self.title.is_none() {
                        self.title = Some(text);
                    }
                }
            }
            "meta" => {
                let attrs = attr_map(&tag.attrs);
                let matches_description = attr_equals(&attrs, "property", "og:description")
                    || attr_equals(&attrs, "name", "description");
                if matches_description {
                    let content = attrs.get("content").copied().unwrap_or_default();
                    self.description = Some(content.to_string());
                }
            }
            name if SKIP_TAGS.contains(&name) => {
                self.mode = Mode::Suppressing(name.to_string());
            }
            name if BREAK_TAGS.contains(&name) => self.raw.push('\n'),
            "li" => self.raw.push_str(BULLET),
            _ => {}
        }
    }
}

/// Extract a [`Document`] from HTML bytes
///
/// Never fails: malformed markup ends tokenization early and whatever was
/// collected up to that point is returned. `url` is left empty and
/// `status_code` is always 200.
///
/// Any byte source works, e.g. `extract(html.bytes())` or
/// `extract(reader.bytes().map_while(Result::ok))`.
pub fn extract<I>(input: I) -> Document
where
    I: IntoIterator<Item = u8>,
{
    let mut extractor = Extractor::new();
    extractor.consume(Tokenizer::new(input.into_iter()));
    extractor.finish()
}

/// Normalize extracted text
///
/// Lowercases, collapses newline runs, then collapses every whitespace run
/// (newlines included) into one space and trims. Block structure therefore
/// does not survive into the result.
pub fn normalize_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let lowered = raw.to_lowercase();
    let lines = collapse_runs(&lowered, |c| c == '\n', '\n');
    let spaced = collapse_runs(&lines, |c| c.is_ascii_whitespace(), ' ');
    spaced.trim().to_string()
}

fn collapse_runs(s: &str, in_run: impl Fn(char) -> bool, replacement: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_previous_run = false;
    for c in s.chars() {
        if in_run(c) {
            if !in_previous_run {
                out.push(replacement);
            }
            in_previous_run = true;
        } else {
            out.push(c);
            in_previous_run = false;
        }
    }
    out
}

/// Map attribute names to values; the last duplicate wins
pub fn attr_map(attrs: &[Attribute]) -> HashMap<&str, &str> {
    attrs
        .iter()
        .map(|attr| (attr.key.as_str(), attr.value.as_str()))
        .collect()
}

/// True if `key` is present and maps to exactly `value`
pub fn attr_equals(attrs: &HashMap<&str, &str>, key: &str, value: &str) -> bool {
    attrs.get(key).is_some_and(|v| *v == value)
}
