//! Recursive-descent parser for `named.conf`.
//!
//! Alternatives are ordered choices: a specific production is tried first
//! and, when it does not match, the parser rewinds and lets the generic
//! absorber take the construct. When every alternative fails the error
//! reached furthest into the input is reported.

use super::ast::*;
use super::lexer::{self, Token, TokenKind};
use crate::error::{Error, ParseError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

type PResult<T> = std::result::Result<T, ParseError>;

/// Deepest brace nesting accepted inside a statement.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parses configuration text. `file` is only used in error messages.
pub fn parse(file: &str, input: &str) -> PResult<Config> {
    Parser::new(file, lexer::significant_tokens(input)).config()
}

/// Parses a configuration read from `reader`.
pub fn parse_reader<R: Read>(file: &str, reader: R) -> Result<Config> {
    let tokens = lexer::read_tokens(reader).map_err(|source| Error::Io {
        path: PathBuf::from(file),
        source,
    })?;
    Ok(Parser::new(file, tokens).config()?)
}

/// Parses a configuration file and records its absolute path.
pub fn parse_file(path: &Path) -> Result<Config> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let absolute = std::path::absolute(path).map_err(io_err)?;
    let file = File::open(&absolute).map_err(io_err)?;
    debug!(path = %absolute.display(), "parsing BIND 9 configuration");
    let mut config = parse_reader(&path.display().to_string(), file)?;
    config.source_path = Some(super::expand::clean_path(&absolute));
    Ok(config)
}

enum Generic {
    Option(GenericOption),
    Named(NamedStatement),
    Unnamed(UnnamedStatement),
}

struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(file: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            file,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_punct(c))
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn error(&self, expected: &str) -> ParseError {
        let (line, column, found) = match self.peek() {
            Some(t) => (t.line, t.column, t.surface()),
            None => self
                .tokens
                .last()
                .map_or((1, 1, String::new()), |t| (t.line, t.column, String::new())),
        };
        ParseError {
            file: self.file.to_string(),
            line,
            column,
            expected: expected.to_string(),
            found,
        }
    }

    fn too_deep(&self) -> ParseError {
        self.error(&format!("nesting of at most {MAX_NESTING_DEPTH} levels"))
    }

    fn expect_punct(&mut self, c: char) -> PResult<()> {
        if self.at_punct(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("'{c}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> PResult<()> {
        if self.at_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("keyword {keyword}")))
        }
    }

    /// A name: identifier, number, string or address.
    fn name(&mut self, what: &str) -> PResult<String> {
        match self.peek() {
            Some(t) if t.kind != TokenKind::Punct && !is_no_parse(t) => {
                let value = t.value.clone();
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error(what)),
        }
    }

    fn number(&mut self, what: &str) -> PResult<i64> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Number => {
                let parsed = t.value.parse::<i64>().map_err(|_| self.error(what))?;
                self.pos += 1;
                Ok(parsed)
            }
            _ => Err(self.error(what)),
        }
    }

    fn boolean(&mut self) -> PResult<bool> {
        let value = match self.peek() {
            Some(t) => match t.value.to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
            None => None,
        };
        match value {
            Some(v) => {
                self.pos += 1;
                Ok(v)
            }
            None => Err(self.error("boolean")),
        }
    }

    /// Runs `first`; when it fails, rewinds and runs `second`. Reports the
    /// error that got further when both fail.
    fn choice<T>(
        &mut self,
        first: impl FnOnce(&mut Self) -> PResult<T>,
        second: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let start = self.pos;
        let first_err = match first(self) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        self.pos = start;
        match second(self) {
            Ok(v) => Ok(v),
            Err(second_err) => {
                if (first_err.line, first_err.column) >= (second_err.line, second_err.column) {
                    Err(first_err)
                } else {
                    Err(second_err)
                }
            }
        }
    }

    fn config(mut self) -> PResult<Config> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.statement()?);
        }
        Ok(Config {
            source_path: None,
            statements,
        })
    }

    fn statement(&mut self) -> PResult<Statement> {
        if let Some(no_parse) = self.no_parse() {
            return Ok(Statement::NoParse(no_parse));
        }
        let keyword = match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => t.value.clone(),
            _ => return Err(self.error("statement")),
        };
        let specific: fn(&mut Self) -> PResult<Statement> = match keyword.as_str() {
            "include" => |p| p.include().map(Statement::Include),
            "acl" => |p| p.acl().map(Statement::Acl),
            "key" => |p| p.key().map(Statement::Key),
            "controls" => |p| p.controls().map(Statement::Controls),
            "statistics-channels" => |p| p.statistics_channels().map(Statement::StatisticsChannels),
            "options" => |p| p.options().map(Statement::Options),
            "view" => |p| p.view().map(Statement::View),
            "zone" => |p| p.zone().map(Statement::Zone),
            _ => return self.generic().map(Generic::into_statement),
        };
        self.choice(specific, |p| p.generic().map(Generic::into_statement))
    }

    fn no_parse(&mut self) -> Option<NoParse> {
        let kind = match self.peek()?.kind {
            TokenKind::NoParseScope => NoParseKind::Scope,
            TokenKind::NoParseGlobal => NoParseKind::Global,
            _ => return None,
        };
        let token = self.bump()?;
        Some(NoParse {
            kind,
            contents: token.value,
        })
    }

    fn include(&mut self) -> PResult<Include> {
        self.expect_keyword("include")?;
        let path = self.name("include path")?;
        self.expect_punct(';')?;
        Ok(Include { path })
    }

    fn acl(&mut self) -> PResult<Acl> {
        self.expect_keyword("acl")?;
        let name = self.name("ACL name")?;
        let address_match_list = self.address_match_list()?;
        self.expect_punct(';')?;
        Ok(Acl {
            name,
            address_match_list,
        })
    }

    fn address_match_list(&mut self) -> PResult<AddressMatchList> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let list = self.address_match_list_entries();
        self.depth -= 1;
        list
    }

    fn address_match_list_entries(&mut self) -> PResult<AddressMatchList> {
        self.expect_punct('{')?;
        let mut elements = Vec::new();
        while !self.at_punct('}') {
            elements.push(self.address_match_list_element()?);
            self.expect_punct(';')?;
        }
        self.expect_punct('}')?;
        Ok(AddressMatchList { elements })
    }

    fn address_match_list_element(&mut self) -> PResult<AddressMatchListElement> {
        let negation = self.at_punct('!');
        if negation {
            self.pos += 1;
        }
        let kind = if self.at_punct('{') {
            ElementKind::Acl(self.address_match_list()?)
        } else if self.at_keyword("key") && self.peek_at(1).is_some_and(|t| !t.is_punct(';')) {
            self.pos += 1;
            ElementKind::Key(self.name("key name")?)
        } else {
            let token = match self.peek() {
                Some(t) => t.clone(),
                None => return Err(self.error("address match list element")),
            };
            let kind = match token.kind {
                TokenKind::IPv4Address | TokenKind::IPv4AddressQuoted => {
                    ElementKind::IPv4Address(token.value)
                }
                TokenKind::IPv6Address | TokenKind::IPv6AddressQuoted => {
                    ElementKind::IPv6Address(token.value)
                }
                TokenKind::Ident | TokenKind::String | TokenKind::Number => {
                    ElementKind::AclName(token.value)
                }
                _ => return Err(self.error("address match list element")),
            };
            self.pos += 1;
            kind
        };
        Ok(AddressMatchListElement { negation, kind })
    }

    fn key(&mut self) -> PResult<Key> {
        self.expect_keyword("key")?;
        let name = self.name("key name")?;
        self.expect_punct('{')?;
        let mut clauses = Vec::new();
        while !self.at_punct('}') {
            let clause = if self.at_keyword("algorithm") {
                self.pos += 1;
                KeyClause::Algorithm(self.name("key algorithm")?)
            } else if self.at_keyword("secret") {
                self.pos += 1;
                KeyClause::Secret(self.name("key secret")?)
            } else {
                return Err(self.error("algorithm or secret"));
            };
            self.expect_punct(';')?;
            clauses.push(clause);
        }
        self.expect_punct('}')?;
        self.expect_punct(';')?;
        Ok(Key { name, clauses })
    }

    fn controls(&mut self) -> PResult<Controls> {
        self.expect_keyword("controls")?;
        self.expect_punct('{')?;
        let mut clauses = Vec::new();
        while !self.at_punct('}') {
            if self.at_keyword("inet") {
                clauses.push(ControlClause::Inet(self.inet_clause()?));
            } else if self.at_keyword("unix") {
                clauses.push(ControlClause::Unix(self.unix_clause()?));
            } else {
                return Err(self.error("inet or unix"));
            }
        }
        self.expect_punct('}')?;
        self.expect_punct(';')?;
        Ok(Controls { clauses })
    }

    fn statistics_channels(&mut self) -> PResult<StatisticsChannels> {
        self.expect_keyword("statistics-channels")?;
        self.expect_punct('{')?;
        let mut clauses = Vec::new();
        while !self.at_punct('}') {
            clauses.push(self.inet_clause()?);
        }
        self.expect_punct('}')?;
        self.expect_punct(';')?;
        Ok(StatisticsChannels { clauses })
    }

    /// Address or port that may be the `*` wildcard.
    fn wildcard_or_name(&mut self, what: &str) -> PResult<String> {
        if self.at_punct('*') {
            self.pos += 1;
            Ok("*".to_string())
        } else {
            self.name(what)
        }
    }

    fn inet_clause(&mut self) -> PResult<InetClause> {
        self.expect_keyword("inet")?;
        let mut clause = InetClause {
            address: self.wildcard_or_name("inet address")?,
            ..InetClause::default()
        };
        while !self.at_punct(';') {
            if self.at_keyword("port") {
                self.pos += 1;
                clause.port = Some(self.wildcard_or_name("port")?);
            } else if self.at_keyword("allow") {
                self.pos += 1;
                clause.allow = Some(self.address_match_list()?);
            } else if self.at_keyword("keys") {
                self.pos += 1;
                clause.keys = Some(self.key_list()?);
            } else if self.at_keyword("read-only") {
                self.pos += 1;
                clause.read_only = Some(self.boolean()?);
            } else {
                return Err(self.error("port, allow, keys, read-only or ';'"));
            }
        }
        self.expect_punct(';')?;
        Ok(clause)
    }

    fn unix_clause(&mut self) -> PResult<UnixClause> {
        self.expect_keyword("unix")?;
        let mut clause = UnixClause {
            path: self.name("socket path")?,
            ..UnixClause::default()
        };
        while !self.at_punct(';') {
            let switch = match self.peek() {
                Some(t) if t.kind == TokenKind::Ident => t.value.clone(),
                _ => return Err(self.error("perm, owner, group, keys, read-only or ';'")),
            };
            self.pos += 1;
            match switch.as_str() {
                "perm" => clause.perm = Some(self.name("permissions")?),
                "owner" => clause.owner = Some(self.name("owner")?),
                "group" => clause.group = Some(self.name("group")?),
                "keys" => clause.keys = Some(self.key_list()?),
                "read-only" => clause.read_only = Some(self.boolean()?),
                _ => {
                    self.pos -= 1;
                    return Err(self.error("perm, owner, group, keys, read-only or ';'"));
                }
            }
        }
        self.expect_punct(';')?;
        Ok(clause)
    }

    fn key_list(&mut self) -> PResult<Vec<String>> {
        self.expect_punct('{')?;
        let mut keys = Vec::new();
        while !self.at_punct('}') {
            keys.push(self.name("key name")?);
            self.expect_punct(';')?;
        }
        self.expect_punct('}')?;
        Ok(keys)
    }

    fn options(&mut self) -> PResult<Options> {
        self.expect_keyword("options")?;
        self.expect_punct('{')?;
        let mut clauses = Vec::new();
        while !self.at_punct('}') {
            if self.at_end() {
                return Err(self.error("'}'"));
            }
            clauses.push(self.option_clause()?);
        }
        self.expect_punct('}')?;
        self.expect_punct(';')?;
        Ok(Options::new(clauses))
    }

    fn option_clause(&mut self) -> PResult<OptionClause> {
        if let Some(no_parse) = self.no_parse() {
            return Ok(OptionClause::NoParse(no_parse));
        }
        let specific: fn(&mut Self) -> PResult<OptionClause> = match self.peek() {
            Some(t) if t.is_keyword("allow-transfer") => {
                |p| p.allow_transfer().map(OptionClause::AllowTransfer)
            }
            Some(t) if t.is_keyword("listen-on") => {
                |p| p.listen_on("listen-on").map(OptionClause::ListenOn)
            }
            Some(t) if t.is_keyword("listen-on-v6") => {
                |p| p.listen_on("listen-on-v6").map(OptionClause::ListenOnV6)
            }
            Some(t) if t.is_keyword("response-policy") => {
                |p| p.response_policy().map(OptionClause::ResponsePolicy)
            }
            _ => return self.generic().map(Generic::into_option_clause),
        };
        self.choice(specific, |p| p.generic().map(Generic::into_option_clause))
    }

    fn allow_transfer(&mut self) -> PResult<AllowTransfer> {
        self.expect_keyword("allow-transfer")?;
        let mut clause = AllowTransfer::default();
        loop {
            if self.at_keyword("port") {
                self.pos += 1;
                clause.port = Some(self.number("port number")?);
            } else if self.at_keyword("transport") {
                self.pos += 1;
                clause.transport = Some(self.name("transport")?);
            } else {
                break;
            }
        }
        clause.address_match_list = self.address_match_list()?;
        self.expect_punct(';')?;
        Ok(clause)
    }

    fn listen_on(&mut self, keyword: &str) -> PResult<ListenOn> {
        self.expect_keyword(keyword)?;
        let mut clause = ListenOn::default();
        loop {
            if self.at_keyword("port") {
                self.pos += 1;
                clause.port = Some(self.number("port number")?);
            } else if self.at_keyword("tls") {
                self.pos += 1;
                clause.tls = Some(self.name("tls configuration")?);
            } else if self.at_keyword("http") {
                self.pos += 1;
                clause.http = Some(self.name("http configuration")?);
            } else {
                break;
            }
        }
        clause.address_match_list = self.address_match_list()?;
        self.expect_punct(';')?;
        Ok(clause)
    }

    fn response_policy(&mut self) -> PResult<ResponsePolicy> {
        self.expect_keyword("response-policy")?;
        self.expect_punct('{')?;
        let mut zones = Vec::new();
        while !self.at_punct('}') {
            self.expect_keyword("zone")?;
            let zone = self.name("response policy zone name")?;
            let switches = self.plain_tokens();
            self.expect_punct(';')?;
            zones.push(ResponsePolicyZone { zone, switches });
        }
        self.expect_punct('}')?;
        let switches = self.plain_tokens();
        self.expect_punct(';')?;
        Ok(ResponsePolicy { zones, switches })
    }

    fn view(&mut self) -> PResult<View> {
        self.expect_keyword("view")?;
        let name = self.name("view name")?;
        let class = self.optional_class();
        self.expect_punct('{')?;
        let mut clauses = Vec::new();
        while !self.at_punct('}') {
            if self.at_end() {
                return Err(self.error("'}'"));
            }
            clauses.push(self.view_clause()?);
        }
        self.expect_punct('}')?;
        self.expect_punct(';')?;
        Ok(View {
            name,
            class,
            clauses,
        })
    }

    fn view_clause(&mut self) -> PResult<ViewClause> {
        if let Some(no_parse) = self.no_parse() {
            return Ok(ViewClause::NoParse(no_parse));
        }
        let specific: fn(&mut Self) -> PResult<ViewClause> = match self.peek() {
            Some(t) if t.is_keyword("match-clients") => |p| {
                p.expect_keyword("match-clients")?;
                let address_match_list = p.address_match_list()?;
                p.expect_punct(';')?;
                Ok(ViewClause::MatchClients(MatchClients { address_match_list }))
            },
            Some(t) if t.is_keyword("zone") => |p| p.zone().map(ViewClause::Zone),
            Some(t) if t.is_keyword("allow-transfer") => {
                |p| p.allow_transfer().map(ViewClause::AllowTransfer)
            }
            Some(t) if t.is_keyword("response-policy") => {
                |p| p.response_policy().map(ViewClause::ResponsePolicy)
            }
            _ => return self.generic().map(Generic::into_view_clause),
        };
        self.choice(specific, |p| p.generic().map(Generic::into_view_clause))
    }

    fn zone(&mut self) -> PResult<Zone> {
        self.expect_keyword("zone")?;
        let name = self.name("zone name")?;
        let class = self.optional_class();
        self.expect_punct('{')?;
        let mut clauses = Vec::new();
        while !self.at_punct('}') {
            if self.at_end() {
                return Err(self.error("'}'"));
            }
            clauses.push(self.zone_clause()?);
        }
        self.expect_punct('}')?;
        self.expect_punct(';')?;
        Ok(Zone {
            name,
            class,
            clauses,
        })
    }

    fn zone_clause(&mut self) -> PResult<ZoneClause> {
        if let Some(no_parse) = self.no_parse() {
            return Ok(ZoneClause::NoParse(no_parse));
        }
        if self.at_keyword("allow-transfer") {
            return self.choice(
                |p| p.allow_transfer().map(ZoneClause::AllowTransfer),
                |p| p.generic().map(Generic::into_zone_clause),
            );
        }
        self.generic().map(Generic::into_zone_clause)
    }

    fn optional_class(&mut self) -> Option<String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => {
                let class = t.value.clone();
                self.pos += 1;
                Some(class)
            }
            _ => None,
        }
    }

    /// Tokens up to the next `{`, `}` or `;`, in surface form.
    fn plain_tokens(&mut self) -> Vec<String> {
        let mut tokens = Vec::new();
        while let Some(t) = self.peek() {
            if t.is_punct('{') || t.is_punct('}') || t.is_punct(';') || is_no_parse(t) {
                break;
            }
            tokens.push(t.surface());
            self.pos += 1;
        }
        tokens
    }

    /// The catch-all: `<id> [tokens];`, `<id> <name> [tokens] { ... };` or
    /// `<id> { ... };`.
    fn generic(&mut self) -> PResult<Generic> {
        let identifier = match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => t.value.clone(),
            _ => return Err(self.error("identifier")),
        };
        self.pos += 1;
        if self.at_punct('{') {
            let contents = self.generic_body()?;
            self.expect_punct(';')?;
            return Ok(Generic::Unnamed(UnnamedStatement {
                identifier,
                contents,
            }));
        }
        let mut values = self.plain_tokens();
        if self.at_punct('{') && !values.is_empty() {
            let name = unquote_surface(values.remove(0));
            let contents = self.generic_body()?;
            self.expect_punct(';')?;
            return Ok(Generic::Named(NamedStatement {
                identifier,
                name,
                switches: values,
                contents,
            }));
        }
        self.expect_punct(';')?;
        Ok(Generic::Option(GenericOption { identifier, values }))
    }

    /// Consumes `{ ... }`, recording every token between the braces.
    fn generic_body(&mut self) -> PResult<GenericContents> {
        self.expect_punct('{')?;
        let mut depth = 0usize;
        let mut tokens = Vec::new();
        while let Some(t) = self.peek() {
            if t.is_punct('{') {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(self.too_deep());
                }
                depth += 1;
            } else if t.is_punct('}') {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            tokens.push(surface_with_no_parse(t));
            self.pos += 1;
        }
        self.expect_punct('}')?;
        Ok(GenericContents { tokens })
    }
}

impl Generic {
    fn into_statement(self) -> Statement {
        match self {
            Self::Option(o) => Statement::Option(o),
            Self::Named(n) => Statement::Named(n),
            Self::Unnamed(u) => Statement::Unnamed(u),
        }
    }

    fn into_option_clause(self) -> OptionClause {
        match self {
            Self::Option(o) => OptionClause::Option(o),
            Self::Named(n) => OptionClause::Named(n),
            Self::Unnamed(u) => OptionClause::Unnamed(u),
        }
    }

    fn into_view_clause(self) -> ViewClause {
        match self {
            Self::Option(o) => ViewClause::Option(o),
            Self::Named(n) => ViewClause::Named(n),
            Self::Unnamed(u) => ViewClause::Unnamed(u),
        }
    }

    fn into_zone_clause(self) -> ZoneClause {
        match self {
            Self::Option(o) => ZoneClause::Option(o),
            Self::Named(n) => ZoneClause::Named(n),
            Self::Unnamed(u) => ZoneClause::Unnamed(u),
        }
    }
}

fn is_no_parse(t: &Token) -> bool {
    matches!(t.kind, TokenKind::NoParseScope | TokenKind::NoParseGlobal)
}

/// Surface form of a token inside a generic body. No-parse regions are
/// rebuilt with their sentinels so the body can be written back.
fn surface_with_no_parse(t: &Token) -> String {
    match t.kind {
        TokenKind::NoParseScope => NoParse {
            kind: NoParseKind::Scope,
            contents: t.value.clone(),
        }
        .to_verbatim(),
        TokenKind::NoParseGlobal => NoParse {
            kind: NoParseKind::Global,
            contents: t.value.clone(),
        }
        .to_verbatim(),
        _ => t.surface(),
    }
}

/// Statement names are stored unquoted like every other name.
fn unquote_surface(surface: String) -> String {
    match surface
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\""),
        None => surface,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Config {
        match parse("named.conf", input) {
            Ok(config) => config,
            Err(e) => panic!("unexpected parse error: {e}"),
        }
    }

    #[test]
    fn empty_input_has_no_statements() {
        assert!(parse_ok("").statements.is_empty());
        assert!(parse_ok("  // only a comment\n").statements.is_empty());
    }

    #[test]
    fn parses_acl_with_mixed_elements() {
        let config = parse_ok(r#"acl "trusted" { !192.0.2.1; 10.0.0.0/8; key "k1"; { localhost; }; other; ::1; };"#);
        let Statement::Acl(acl) = &config.statements[0] else {
            panic!("expected ACL");
        };
        assert_eq!(acl.name, "trusted");
        let elements = &acl.address_match_list.elements;
        assert_eq!(elements.len(), 6);
        assert!(elements[0].negation);
        assert_eq!(elements[0].kind, ElementKind::IPv4Address("192.0.2.1".into()));
        assert_eq!(elements[1].kind, ElementKind::IPv4Address("10.0.0.0/8".into()));
        assert_eq!(elements[2].kind, ElementKind::Key("k1".into()));
        assert!(matches!(&elements[3].kind, ElementKind::Acl(list) if list.elements.len() == 1));
        assert_eq!(elements[4].kind, ElementKind::AclName("other".into()));
        assert_eq!(elements[5].kind, ElementKind::IPv6Address("::1".into()));
    }

    #[test]
    fn parses_key_controls_and_statistics() {
        let config = parse_ok(
            r#"
            key "rndc-key" { algorithm hmac-sha256; secret "c2VjcmV0"; };
            controls {
                inet 127.0.0.1 port 953 allow { localhost; } keys { "rndc-key"; } read-only no;
                unix "/run/named.sock" perm 0600 owner 101 group 101;
            };
            statistics-channels { inet * port 8053 allow { any; }; };
            "#,
        );
        assert_eq!(config.statements.len(), 3);
        let Statement::Key(key) = &config.statements[0] else {
            panic!("expected key");
        };
        assert_eq!(key.clauses[0], KeyClause::Algorithm("hmac-sha256".into()));
        assert_eq!(key.clauses[1], KeyClause::Secret("c2VjcmV0".into()));
        let Statement::Controls(controls) = &config.statements[1] else {
            panic!("expected controls");
        };
        let ControlClause::Inet(inet) = &controls.clauses[0] else {
            panic!("expected inet clause");
        };
        assert_eq!(inet.port.as_deref(), Some("953"));
        assert_eq!(inet.keys.as_deref(), Some(&["rndc-key".to_string()][..]));
        assert_eq!(inet.read_only, Some(false));
        let ControlClause::Unix(unix) = &controls.clauses[1] else {
            panic!("expected unix clause");
        };
        assert_eq!(unix.perm.as_deref(), Some("0600"));
        let Statement::StatisticsChannels(stats) = &config.statements[2] else {
            panic!("expected statistics-channels");
        };
        assert_eq!(stats.clauses[0].address, "*");
    }

    #[test]
    fn parses_options_clauses() {
        let config = parse_ok(
            r#"
            options {
                directory "/var/cache/bind";
                allow-transfer port 853 transport tls { none; };
                listen-on port 5353 { 127.0.0.1; };
                listen-on-v6 { any; };
                response-policy { zone "rpz.example" policy given; zone "other"; } break-dnssec yes;
                also-notify { 192.0.2.7; };
                check-names master ignore;
            };
            "#,
        );
        let Statement::Options(options) = &config.statements[0] else {
            panic!("expected options");
        };
        assert_eq!(options.clauses.len(), 7);
        assert_eq!(
            options.clauses[0],
            OptionClause::Option(GenericOption {
                identifier: "directory".into(),
                values: vec!["\"/var/cache/bind\"".into()],
            })
        );
        let OptionClause::AllowTransfer(transfer) = &options.clauses[1] else {
            panic!("expected allow-transfer");
        };
        assert_eq!(transfer.port, Some(853));
        assert_eq!(transfer.transport.as_deref(), Some("tls"));
        assert!(matches!(&options.clauses[2], OptionClause::ListenOn(l) if l.port == Some(5353)));
        assert!(matches!(&options.clauses[3], OptionClause::ListenOnV6(l) if l.port.is_none()));
        let OptionClause::ResponsePolicy(policy) = &options.clauses[4] else {
            panic!("expected response-policy");
        };
        assert_eq!(policy.zones.len(), 2);
        assert_eq!(policy.zones[0].switches, vec!["policy", "given"]);
        assert_eq!(policy.switches, vec!["break-dnssec", "yes"]);
        assert!(matches!(&options.clauses[5], OptionClause::Unnamed(u) if u.identifier == "also-notify"));
        assert!(matches!(&options.clauses[6], OptionClause::Option(o) if o.values.len() == 2));
    }

    #[test]
    fn parses_views_and_zones() {
        let config = parse_ok(
            r#"
            view "internal" IN {
                match-clients { 10.0.0.0/8; };
                zone "example.com" {
                    type primary;
                    file "db.example.com";
                    allow-transfer { key xfer; };
                };
                recursion yes;
            };
            zone "." { type hint; file "root.hints"; };
            "#,
        );
        let Statement::View(view) = &config.statements[0] else {
            panic!("expected view");
        };
        assert_eq!(view.name, "internal");
        assert_eq!(view.class.as_deref(), Some("IN"));
        assert_eq!(view.clauses.len(), 3);
        let ViewClause::Zone(zone) = &view.clauses[1] else {
            panic!("expected zone");
        };
        assert_eq!(zone.name, "example.com");
        assert!(matches!(zone.clauses[2], ZoneClause::AllowTransfer(_)));
        let Statement::Zone(root) = &config.statements[1] else {
            panic!("expected zone");
        };
        assert_eq!(root.name, ".");
    }

    #[test]
    fn generic_statements_absorb_unknown_constructs() {
        let config = parse_ok(
            r#"
            logging { channel default_log { file "log" versions 3; severity info; }; };
            primaries p1 port 5353 { 192.0.2.1 key "k"; };
            dnssec-policy "standard" { keys { ksk lifetime unlimited; }; };
            "#,
        );
        let Statement::Unnamed(logging) = &config.statements[0] else {
            panic!("expected unnamed");
        };
        assert_eq!(logging.identifier, "logging");
        assert_eq!(logging.contents.tokens[0], "channel");
        assert!(logging.contents.tokens.contains(&"\"log\"".to_string()));
        let Statement::Named(primaries) = &config.statements[1] else {
            panic!("expected named");
        };
        assert_eq!(primaries.name, "p1");
        assert_eq!(primaries.switches, vec!["port", "5353"]);
        let Statement::Named(policy) = &config.statements[2] else {
            panic!("expected named");
        };
        assert_eq!(policy.name, "standard");
    }

    #[test]
    fn malformed_specific_statement_falls_back_to_generic() {
        let config = parse_ok("key \"k\" { unknown-clause x; };");
        assert!(matches!(&config.statements[0], Statement::Named(n) if n.identifier == "key"));
    }

    #[test]
    fn no_parse_regions_are_recorded() {
        let config = parse_ok(
            "options {\n//@stork:no-parse:scope\nfoo bar;\n//@stork:no-parse:end\n};\n//@stork:no-parse:global\nanything { goes here\n",
        );
        let Statement::Options(options) = &config.statements[0] else {
            panic!("expected options");
        };
        assert_eq!(
            options.clauses[0],
            OptionClause::NoParse(NoParse {
                kind: NoParseKind::Scope,
                contents: "foo bar;".into()
            })
        );
        assert_eq!(
            config.statements[1],
            Statement::NoParse(NoParse {
                kind: NoParseKind::Global,
                contents: "anything { goes here".into()
            })
        );
    }

    #[test]
    fn errors_carry_position() {
        let err = parse(
            "named.conf",
            "acl a { any; };\nzone \"a\" {\n  type primary;\n}\nview",
        )
        .unwrap_err();
        assert_eq!(err.file, "named.conf");
        assert_eq!(err.line, 5);
        assert!(err.to_string().contains("named.conf:5:"));
    }

    #[test]
    fn unterminated_input_is_an_error() {
        assert!(parse("named.conf", "options {").is_err());
        assert!(parse("named.conf", "}").is_err());
        assert!(parse("named.conf", "zone \"a\" { type primary; }").is_err());
        assert!(parse("named.conf", "logging { channel a { x; };").is_err());
    }

    fn nested_generic(levels: usize) -> String {
        format!("deep {}a {};", "{ a ".repeat(levels), "} ".repeat(levels))
    }

    fn nested_acl(levels: usize) -> String {
        format!("acl a {{ {}any; {}}};", "{ ".repeat(levels), "}; ".repeat(levels))
    }

    #[test]
    fn deeply_nested_scopes_parse_and_reformat() {
        for input in [nested_generic(20), nested_acl(20), nested_generic(200)] {
            let config = parse_ok(&input);
            let output = config.get_formatted_output(None);
            let reparsed = parse_ok(&output);
            assert_eq!(reparsed.statements, config.statements);
        }
        let config = parse_ok(&nested_generic(20));
        assert!(matches!(&config.statements[0], Statement::Unnamed(_)));
        let config = parse_ok(&nested_acl(20));
        assert!(matches!(&config.statements[0], Statement::Acl(_)));
    }

    #[test]
    fn nesting_beyond_the_limit_is_an_error() {
        for input in [nested_generic(5000), nested_acl(5000)] {
            let err = parse("named.conf", &input).unwrap_err();
            assert!(err.to_string().contains("nesting"), "{err}");
        }
        assert!(parse("named.conf", &nested_acl(MAX_NESTING_DEPTH - 1)).is_ok());
    }
}
