//! Tokenizer for `named.conf` text.
//!
//! The lexer never rejects input: characters that fit no other rule become
//! single-character `Punct` tokens and the parser decides whether they are
//! acceptable. Only reading the underlying stream can fail.

use regex::Regex;
use std::io::Read;
use std::sync::LazyLock;

pub const NO_PARSE_PREFIX: &str = "//@stork:no-parse:";
pub const NO_PARSE_SCOPE: &str = "//@stork:no-parse:scope";
pub const NO_PARSE_GLOBAL: &str = "//@stork:no-parse:global";
pub const NO_PARSE_END: &str = "//@stork:no-parse:end";

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}(?:/\d{1,3})?").expect("static IPv4 pattern")
});

static IPV6: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[0-9A-Fa-f]{0,4}:){2,7}(?:(?:\d{1,3}\.){3}\d{1,3}|[0-9A-Fa-f]{0,4})(?:/\d{1,3})?",
    )
    .expect("static IPv6 pattern")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("static number pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Comment,
    CppStyleComment,
    IPv4Address,
    IPv6Address,
    IPv4AddressQuoted,
    IPv6AddressQuoted,
    String,
    Number,
    Ident,
    Punct,
    Whitespace,
    Eol,
    /// Verbatim region opened by `//@stork:no-parse:scope`.
    NoParseScope,
    /// Verbatim region opened by `//@stork:no-parse:global`.
    NoParseGlobal,
}

impl TokenKind {
    /// Kinds the parser never observes.
    pub fn is_elided(self) -> bool {
        matches!(
            self,
            Self::Comment | Self::CppStyleComment | Self::Whitespace | Self::Eol
        )
    }

    fn is_quoted(self) -> bool {
        matches!(
            self,
            Self::String | Self::IPv4AddressQuoted | Self::IPv6AddressQuoted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text; unquoted for strings and quoted addresses, the captured
    /// body for no-parse regions.
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    /// Text that reproduces the token in a configuration file.
    pub fn surface(&self) -> String {
        if self.kind.is_quoted() {
            quote(&self.value)
        } else {
            self.value.clone()
        }
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct && self.value.len() == c.len_utf8() && self.value.starts_with(c)
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.value == keyword
    }

    pub fn is_address(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::IPv4Address
                | TokenKind::IPv6Address
                | TokenKind::IPv4AddressQuoted
                | TokenKind::IPv6AddressQuoted
        )
    }
}

/// Wraps a value in double quotes, escaping embedded quotes.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

fn unquote(raw: &str) -> String {
    raw.replace("\\\"", "\"")
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c == '.'
}

/// Returns every token of `input`, including elided ones.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

/// Returns the tokens the parser observes.
pub fn significant_tokens(input: &str) -> Vec<Token> {
    Lexer::new(input).filter(|t| !t.kind.is_elided()).collect()
}

/// Reads the whole stream and tokenizes it.
pub fn read_tokens<R: Read>(mut reader: R) -> std::io::Result<Vec<Token>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(significant_tokens(&text))
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn advance(&mut self, len: usize) -> &'a str {
        let consumed = &self.input[self.pos..self.pos + len];
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos += len;
        consumed
    }

    fn emit(&mut self, kind: TokenKind, len: usize) -> Token {
        let (line, column) = (self.line, self.column);
        let value = self.advance(len).to_string();
        Token {
            kind,
            value,
            line,
            column,
        }
    }

    /// Captures a no-parse region. The returned token carries the body with
    /// the sentinel line break and trailing whitespace removed.
    fn no_parse(&mut self, kind: TokenKind, sentinel: &str) -> Token {
        let (line, column) = (self.line, self.column);
        self.advance(sentinel.len());
        let body_len = match kind {
            TokenKind::NoParseScope => self.rest().find(NO_PARSE_END).unwrap_or(self.rest().len()),
            _ => enclosing_block_len(self.rest()),
        };
        let body = self.advance(body_len);
        if kind == TokenKind::NoParseScope && self.rest().starts_with(NO_PARSE_END) {
            self.advance(NO_PARSE_END.len());
        }
        let body = body.trim_start_matches([' ', '\t']);
        let body = body
            .strip_prefix("\r\n")
            .or_else(|| body.strip_prefix('\n'))
            .unwrap_or(body);
        Token {
            kind,
            value: body.trim_end().to_string(),
            line,
            column,
        }
    }

    fn string(&mut self) -> Token {
        let rest = self.rest();
        let mut escaped = false;
        let mut end = None;
        for (i, c) in rest.char_indices().skip(1) {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                end = Some(i);
                break;
            }
        }
        let Some(end) = end else {
            return self.emit(TokenKind::Punct, 1);
        };
        let content = unquote(&rest[1..end]);
        let kind = if full_match(&IPV4, &content) {
            TokenKind::IPv4AddressQuoted
        } else if full_match(&IPV6, &content) {
            TokenKind::IPv6AddressQuoted
        } else {
            TokenKind::String
        };
        let mut token = self.emit(kind, end + 1);
        token.value = content;
        token
    }

    fn address(&self, re: &Regex) -> Option<usize> {
        let m = re.find(self.rest())?;
        match self.rest()[m.end()..].chars().next() {
            Some(c) if is_ident_char(c) || c == ':' => None,
            _ => Some(m.end()),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let rest = self.rest();
        let c = rest.chars().next()?;

        if rest.starts_with(NO_PARSE_SCOPE) {
            return Some(self.no_parse(TokenKind::NoParseScope, NO_PARSE_SCOPE));
        }
        if rest.starts_with(NO_PARSE_GLOBAL) {
            return Some(self.no_parse(TokenKind::NoParseGlobal, NO_PARSE_GLOBAL));
        }
        if c == '#' || rest.starts_with("//") {
            let len = rest.find('\n').unwrap_or(rest.len());
            return Some(self.emit(TokenKind::Comment, len));
        }
        if rest.starts_with("/*") {
            let len = rest[2..].find("*/").map_or(rest.len(), |i| i + 4);
            return Some(self.emit(TokenKind::CppStyleComment, len));
        }
        if c == '\n' || c == '\r' {
            let len = rest
                .find(|c: char| c != '\n' && c != '\r')
                .unwrap_or(rest.len());
            return Some(self.emit(TokenKind::Eol, len));
        }
        if c.is_whitespace() {
            let len = rest
                .find(|c: char| !c.is_whitespace() || c == '\n' || c == '\r')
                .unwrap_or(rest.len());
            return Some(self.emit(TokenKind::Whitespace, len));
        }
        if c == '"' {
            return Some(self.string());
        }
        if let Some(len) = self.address(&IPV4) {
            return Some(self.emit(TokenKind::IPv4Address, len));
        }
        if let Some(len) = self.address(&IPV6) {
            return Some(self.emit(TokenKind::IPv6Address, len));
        }
        if is_ident_start(c) {
            let len = rest
                .find(|c: char| !is_ident_char(c))
                .unwrap_or(rest.len());
            let kind = if NUMBER.is_match(&rest[..len]) {
                TokenKind::Number
            } else {
                TokenKind::Ident
            };
            return Some(self.emit(kind, len));
        }
        Some(self.emit(TokenKind::Punct, c.len_utf8()))
    }
}

fn full_match(re: &Regex, text: &str) -> bool {
    re.find(text).is_some_and(|m| m.end() == text.len())
}

/// Length of the text up to (not including) the brace closing the block the
/// text starts in, or the whole text when the block is the file itself.
fn enclosing_block_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..].find("*/").map_or(bytes.len(), |end| i + end + 3);
            }
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}
