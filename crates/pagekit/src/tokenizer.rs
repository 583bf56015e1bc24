//! Streaming HTML tokenizer
//!
//! [`Tokenizer`] is a pull-based iterator over a byte source. It yields one
//! [`Token`] at a time and never materializes the token list, so memory use
//! is bounded by the largest single token rather than by the document.
//!
//! Markup delimiters are all ASCII, which makes scanning raw bytes safe for
//! UTF-8 input. Text is decoded lossily when a token is emitted.
//!
//! Iteration ends at end of input. It also ends early when the input stops
//! inside a tag or comment; the partial token is dropped.

use html5ever::data::{C1_REPLACEMENTS, NAMED_ENTITIES};
use std::collections::VecDeque;

/// Elements whose content is raw text up to the matching end tag
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "noembed", "noframes", "xmp", "textarea", "title",
    "plaintext",
];

/// Raw-text elements whose content still has character references decoded
const RCDATA_TAGS: &[&str] = &["textarea", "title"];

/// A single `key="value"` attribute on a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name
    pub key: String,
    /// Attribute value with character references decoded
    pub value: String,
}

/// A start or self-closing tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased element name
    pub name: String,
    /// Attributes in source order, duplicates included
    pub attrs: Vec<Attribute>,
}

/// Markup token produced by [`Tokenizer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Character data between tags
    Text(String),
    /// `<name ...>`
    StartTag(Tag),
    /// `</name>`
    EndTag(String),
    /// `<name ... />`
    SelfClosingTag(Tag),
    /// `<!-- ... -->` or a bogus comment such as `<?xml ...>`
    Comment(String),
    /// `<!DOCTYPE ...>` or another `<!...>` declaration
    Doctype(String),
}

/// Outcome of scanning the markup after a `<`
enum Markup {
    Token(Token),
    /// The `<` was literal text
    Text,
    /// Markup that produces no token
    Skip,
    /// Input ended inside the markup
    Eof,
}

/// Lazy HTML tokenizer over bytes
pub struct Tokenizer<I: Iterator<Item = u8>> {
    input: I,
    /// Bytes read ahead or pushed back, consumed before `input`
    pending: VecDeque<u8>,
    /// Set after a start tag whose content is raw text
    raw_tag: Option<String>,
    done: bool,
}

impl<I: Iterator<Item = u8>> Tokenizer<I> {
    /// Create a tokenizer reading from `input`
    pub fn new<T>(input: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            input: input.into_iter(),
            pending: VecDeque::new(),
            raw_tag: None,
            done: false,
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        self.pending.pop_front().or_else(|| self.input.next())
    }

    fn peek_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            let b = self.input.next()?;
            self.pending.push_back(b);
        }
        self.pending.front().copied()
    }

    fn push_back(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().rev() {
            self.pending.push_front(b);
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
            self.next_byte();
        }
    }

    /// Read bytes up to (not including) the first byte matching `stop`
    fn read_until(&mut self, stop: impl Fn(u8) -> bool) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = self.peek_byte() {
            if stop(b) {
                break;
            }
            out.push(b);
            self.next_byte();
        }
        out
    }

    /// Read up to and consuming `>`; `None` on EOF
    fn read_to_gt(&mut self) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.next_byte()? {
                b'>' => return Some(out),
                b => out.push(b),
            }
        }
    }

    /// Content of a raw-text element, stopping before its end tag
    fn read_raw_text(&mut self, tag: &str) -> Vec<u8> {
        let mut text = Vec::new();
        if tag == "plaintext" {
            while let Some(b) = self.next_byte() {
                text.push(b);
            }
            return text;
        }

        while let Some(b) = self.next_byte() {
            if b != b'<' {
                text.push(b);
                continue;
            }
            if self.peek_byte() != Some(b'/') {
                text.push(b);
                continue;
            }

            let mut probe = vec![b'<'];
            if let Some(slash) = self.next_byte() {
                probe.push(slash);
            }
            let mut matched = true;
            for expected in tag.bytes() {
                match self.next_byte() {
                    Some(c) => {
                        probe.push(c);
                        if !c.eq_ignore_ascii_case(&expected) {
                            matched = false;
                            break;
                        }
                    }
                    None => {
                        matched = false;
                        break;
                    }
                }
            }

            let closes = matched
                && match self.peek_byte() {
                    Some(c) => c.is_ascii_whitespace() || c == b'/' || c == b'>',
                    None => true,
                };

            if closes {
                self.push_back(&probe);
                return text;
            }

            // Keep the `<` and rescan the rest, it may start the real end tag
            text.push(b'<');
            self.push_back(&probe[1..]);
        }
        text
    }

    fn read_tag_name(&mut self) -> String {
        let name = self.read_until(|b| b.is_ascii_whitespace() || b == b'/' || b == b'>');
        String::from_utf8_lossy(&name).to_ascii_lowercase()
    }

    /// Attributes and the closing `>` of a start tag; `None` on EOF
    fn read_attributes(&mut self) -> Option<(Vec<Attribute>, bool)> {
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek_byte()? {
                b'>' => {
                    self.next_byte();
                    return Some((attrs, false));
                }
                b'/' => {
                    self.next_byte();
                    if self.peek_byte()? == b'>' {
                        self.next_byte();
                        return Some((attrs, true));
                    }
                }
                _ => {
                    let attr = self.read_attribute()?;
                    attrs.push(attr);
                }
            }
        }
    }

    fn read_attribute(&mut self) -> Option<Attribute> {
        // The first byte always belongs to the name, even a stray `=`
        let mut key = vec![self.next_byte()?];
        key.extend(
            self.read_until(|b| b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/'),
        );
        let key = String::from_utf8_lossy(&key).to_ascii_lowercase();

        self.skip_whitespace();
        if self.peek_byte()? != b'=' {
            return Some(Attribute {
                key,
                value: String::new(),
            });
        }
        self.next_byte();
        self.skip_whitespace();

        let raw = match self.peek_byte()? {
            quote @ (b'"' | b'\'') => {
                self.next_byte();
                let value = self.read_until(|b| b == quote);
                // closing quote, or EOF
                self.next_byte()?;
                value
            }
            _ => self.read_until(|b| b.is_ascii_whitespace() || b == b'>'),
        };

        Some(Attribute {
            key,
            value: decode_attribute_entities(&String::from_utf8_lossy(&raw)),
        })
    }

    fn read_start_tag(&mut self) -> Option<Token> {
        let name = self.read_tag_name();
        let (attrs, self_closing) = self.read_attributes()?;

        if self_closing {
            return Some(Token::SelfClosingTag(Tag { name, attrs }));
        }
        if RAW_TEXT_TAGS.contains(&name.as_str()) {
            self.raw_tag = Some(name.clone());
        }
        Some(Token::StartTag(Tag { name, attrs }))
    }

    fn read_end_tag(&mut self) -> Option<Token> {
        let name = self.read_tag_name();
        // attributes on end tags are dropped
        self.read_to_gt()?;
        Some(Token::EndTag(name))
    }

    fn read_comment(&mut self) -> Option<Token> {
        let mut content = Vec::new();
        loop {
            let b = self.next_byte()?;
            if b != b'>' {
                content.push(b);
                continue;
            }
            if content.ends_with(b"--") {
                content.truncate(content.len() - 2);
                break;
            }
            // `<!-->` and `<!--->`
            if content.is_empty() || content == b"-" {
                content.clear();
                break;
            }
            content.push(b);
        }
        Some(Token::Comment(String::from_utf8_lossy(&content).into_owned()))
    }

    fn read_markup_declaration(&mut self) -> Option<Token> {
        if self.peek_byte() == Some(b'-') {
            self.next_byte();
            if self.peek_byte() == Some(b'-') {
                self.next_byte();
                return self.read_comment();
            }
            self.push_back(b"-");
        }
        let content = self.read_to_gt()?;
        Some(Token::Doctype(String::from_utf8_lossy(&content).into_owned()))
    }

    fn read_bogus_comment(&mut self) -> Option<Token> {
        let content = self.read_to_gt()?;
        Some(Token::Comment(String::from_utf8_lossy(&content).into_owned()))
    }

    /// Tokenize markup following a `<`
    fn read_markup(&mut self) -> Markup {
        let token = match self.peek_byte() {
            Some(b) if b.is_ascii_alphabetic() => self.read_start_tag(),
            Some(b'!') => {
                self.next_byte();
                self.read_markup_declaration()
            }
            Some(b'?') => self.read_bogus_comment(),
            Some(b'/') => {
                self.next_byte();
                match self.peek_byte() {
                    Some(b) if b.is_ascii_alphabetic() => self.read_end_tag(),
                    Some(b'>') => {
                        self.next_byte();
                        return Markup::Skip;
                    }
                    Some(_) => self.read_bogus_comment(),
                    None => {
                        self.push_back(b"/");
                        return Markup::Text;
                    }
                }
            }
            _ => return Markup::Text,
        };
        token.map_or(Markup::Eof, Markup::Token)
    }

    fn starts_markup(&mut self) -> bool {
        matches!(
            self.peek_byte(),
            Some(b) if b.is_ascii_alphabetic() || matches!(b, b'!' | b'?' | b'/')
        )
    }

    fn text_token(raw: &[u8], decode: bool) -> Token {
        let text = String::from_utf8_lossy(raw);
        if decode {
            Token::Text(decode_entities(&text))
        } else {
            Token::Text(text.into_owned())
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for Tokenizer<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }

        if let Some(tag) = self.raw_tag.take() {
            let raw = self.read_raw_text(&tag);
            if !raw.is_empty() {
                return Some(Self::text_token(&raw, RCDATA_TAGS.contains(&tag.as_str())));
            }
        }

        let mut text = Vec::new();
        loop {
            let Some(b) = self.next_byte() else {
                self.done = true;
                if text.is_empty() {
                    return None;
                }
                return Some(Self::text_token(&text, true));
            };

            if b != b'<' {
                text.push(b);
                continue;
            }

            if !self.starts_markup() {
                text.push(b);
                continue;
            }

            if !text.is_empty() {
                self.push_back(b"<");
                return Some(Self::text_token(&text, true));
            }

            match self.read_markup() {
                Markup::Token(token) => return Some(token),
                Markup::Text => text.push(b),
                // `</>` is dropped
                Markup::Skip => continue,
                Markup::Eof => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

/// Longest named reference that is also recognized without a trailing `;`
const LONGEST_LEGACY_REFERENCE: usize = 6;

/// Decode HTML character references in `s`
///
/// Named references come from the full WHATWG table, including the legacy
/// forms that may omit the `;` (`&amp`, `&copy`). Numeric references map
/// C1 controls through the Windows-1252 table and invalid code points to
/// U+FFFD. Unknown references are kept literally.
pub fn decode_entities(s: &str) -> String {
    unescape(s, false)
}

/// Attribute values never match a legacy reference by prefix, and a
/// reference without `;` followed by `=` stays literal.
fn decode_attribute_entities(s: &str) -> String {
    unescape(s, true)
}

fn unescape(s: &str, in_attribute: bool) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let reference = &rest[pos + 1..];
        match decode_reference(reference, in_attribute, &mut out) {
            Some(consumed) => rest = &reference[consumed..],
            None => {
                out.push('&');
                rest = reference;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the reference at the start of `s` (the text after `&`) into
/// `out`, returning how many bytes of `s` it used
fn decode_reference(s: &str, in_attribute: bool, out: &mut String) -> Option<usize> {
    if let Some(numeric) = s.strip_prefix('#') {
        return decode_numeric(numeric, out).map(|used| used + 1);
    }

    let name_len = s.bytes().take_while(u8::is_ascii_alphanumeric).count();
    if name_len == 0 {
        return None;
    }
    let next = s.as_bytes().get(name_len).copied();
    let name = if next == Some(b';') {
        &s[..=name_len]
    } else {
        &s[..name_len]
    };

    if in_attribute && next == Some(b'=') {
        return None;
    }
    if let Some(chars) = named_reference(name) {
        push_reference(out, chars);
        return Some(name.len());
    }
    if in_attribute {
        return None;
    }

    // `&copy2024` decodes as `&copy` followed by "2024"
    let longest = (name.len() - 1).min(LONGEST_LEGACY_REFERENCE);
    let (len, chars) = (2..=longest)
        .rev()
        .find_map(|len| named_reference(&name[..len]).map(|chars| (len, chars)))?;
    push_reference(out, chars);
    Some(len)
}

fn named_reference(name: &str) -> Option<(char, Option<char>)> {
    // The table also holds every prefix of a name, mapped to NUL
    let &(first, second) = NAMED_ENTITIES.get(name)?;
    let first = char::from_u32(first).filter(|&c| c != '\0')?;
    Some((first, char::from_u32(second).filter(|&c| c != '\0')))
}

fn push_reference(out: &mut String, (first, second): (char, Option<char>)) {
    out.push(first);
    out.extend(second);
}

fn decode_numeric(s: &str, out: &mut String) -> Option<usize> {
    let (prefix, radix) = match s.as_bytes().first() {
        Some(b'x' | b'X') => (1, 16),
        _ => (0, 10),
    };
    let digits = s[prefix..]
        .bytes()
        .take_while(|&b| char::from(b).is_digit(radix))
        .count();
    if digits == 0 {
        return None;
    }

    let end = prefix + digits;
    let code = s[prefix..end]
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0u32, |acc, d| acc.saturating_mul(radix).saturating_add(d));
    out.push(numeric_char(code));

    let semicolon = s.as_bytes().get(end) == Some(&b';');
    Some(end + usize::from(semicolon))
}

fn numeric_char(code: u32) -> char {
    match code {
        0 => char::REPLACEMENT_CHARACTER,
        0x80..=0x9F => C1_REPLACEMENTS[(code - 0x80) as usize]
            .or_else(|| char::from_u32(code))
            .unwrap_or(char::REPLACEMENT_CHARACTER),
        _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    }
}
