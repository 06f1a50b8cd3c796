//! Minimal XML property list reader
//!
//! Reads the subset of the plist 1.0 format that launchd jobs use. Anything
//! the reader does not understand becomes `PlistValue::Other` instead of an
//! error, so foreign jobs still decode.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<\?.*?\?>|<!--.*?-->|<!\[CDATA\[(.*?)\]\]>|<![^>]*>|<(/?)([A-Za-z]+)[^>]*?(/?)>|([^<]+)",
    )
        .expect("plist token pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Array(Vec<PlistValue>),
    Dict(Vec<(String, PlistValue)>),
    Other,
}

impl PlistValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PlistValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(String, PlistValue)]> {
        match self {
            PlistValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key of a dict. Later duplicates win, as in launchd.
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.as_dict()?
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    Open(&'a str),
    Close(&'a str),
    Empty(&'a str),
    Text(&'a str),
    /// Literal character data, entities not expanded.
    CData(&'a str),
}

/// Parse the root value of a property list document.
pub fn parse(text: &str) -> Option<PlistValue> {
    let tokens = tokenize(text);
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_value()
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    TOKEN_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            if let Some(data) = caps.get(1) {
                Some(Token::CData(data.as_str()))
            } else if let Some(name) = caps.get(3) {
                let closing = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
                let empty = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
                Some(match (closing, empty) {
                    (true, _) => Token::Close(name.as_str()),
                    (false, true) => Token::Empty(name.as_str()),
                    (false, false) => Token::Open(name.as_str()),
                })
            } else {
                caps.get(5).map(|m| Token::Text(m.as_str()))
            }
        })
        .collect()
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek_significant(&mut self) -> Option<Token<'a>> {
        while let Some(Token::Text(text)) = self.tokens.get(self.pos) {
            if !text.trim().is_empty() {
                break;
            }
            self.pos += 1;
        }
        self.tokens.get(self.pos).copied()
    }

    fn next_significant(&mut self) -> Option<Token<'a>> {
        let token = self.peek_significant()?;
        self.pos += 1;
        Some(token)
    }

    fn parse_value(&mut self) -> Option<PlistValue> {
        match self.next_significant()? {
            Token::Open(tag) => self.parse_element(tag),
            Token::Empty(tag) => Some(empty_element(tag)),
            Token::Close(_) | Token::Text(_) | Token::CData(_) => None,
        }
    }

    fn parse_element(&mut self, tag: &str) -> Option<PlistValue> {
        match tag {
            "plist" => {
                let value = self.parse_value();
                self.skip_to_close("plist");
                value
            }
            "dict" => {
                let mut entries = Vec::new();
                loop {
                    match self.next_significant()? {
                        Token::Close("dict") => break,
                        Token::Open("key") => {
                            let key = self.read_text("key")?;
                            let value = self.parse_value()?;
                            entries.push((key, value));
                        }
                        Token::Empty("key") => {
                            let value = self.parse_value()?;
                            entries.push((String::new(), value));
                        }
                        _ => return None,
                    }
                }
                Some(PlistValue::Dict(entries))
            }
            "array" => {
                let mut items = Vec::new();
                loop {
                    if let Token::Close("array") = self.peek_significant()? {
                        self.pos += 1;
                        break;
                    }
                    items.push(self.parse_value()?);
                }
                Some(PlistValue::Array(items))
            }
            "string" => self.read_text("string").map(PlistValue::String),
            "integer" => {
                let text = self.read_text("integer")?;
                Some(
                    text.trim()
                        .parse()
                        .map(PlistValue::Integer)
                        .unwrap_or(PlistValue::Other),
                )
            }
            "real" => {
                let text = self.read_text("real")?;
                Some(
                    text.trim()
                        .parse()
                        .map(PlistValue::Real)
                        .unwrap_or(PlistValue::Other),
                )
            }
            "true" | "false" => {
                self.skip_to_close(tag);
                Some(PlistValue::Boolean(tag == "true"))
            }
            other => {
                self.skip_to_close(other);
                Some(PlistValue::Other)
            }
        }
    }

    /// Concatenate text up to the closing tag, whitespace included.
    fn read_text(&mut self, tag: &str) -> Option<String> {
        let mut text = String::new();
        loop {
            match self.tokens.get(self.pos)? {
                Token::Text(raw) => text.push_str(&unescape(raw)),
                Token::CData(data) => text.push_str(data),
                Token::Close(name) if *name == tag => {
                    self.pos += 1;
                    return Some(text);
                }
                _ => return None,
            }
            self.pos += 1;
        }
    }

    fn skip_to_close(&mut self, tag: &str) {
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            match token {
                Token::Open(name) if *name == tag => depth += 1,
                Token::Close(name) if *name == tag => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }
}

fn empty_element(tag: &str) -> PlistValue {
    match tag {
        "true" => PlistValue::Boolean(true),
        "false" => PlistValue::Boolean(false),
        "string" => PlistValue::String(String::new()),
        "array" => PlistValue::Array(Vec::new()),
        "dict" => PlistValue::Dict(Vec::new()),
        _ => PlistValue::Other,
    }
}

/// Escape text for an XML element body.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Resolve the predefined XML entities and numeric character references.
pub fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('&') {
        result.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find(';') else {
            result.push_str(after);
            return result;
        };

        let entity = &after[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &after[end + 1..];
            }
            None => {
                result.push('&');
                rest = &after[1..];
            }
        }
    }

    result.push_str(rest);
    result
}
