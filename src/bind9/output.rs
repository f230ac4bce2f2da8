//! Canonical re-serialization of a parsed configuration.

use super::ast::*;
use super::filter::{Filter, FilterTag};
use super::formatter::{self, Clause, Node, Scope, StringBuilder, Token};
use super::lexer::{
    quote, significant_tokens, TokenKind, NO_PARSE_END, NO_PARSE_GLOBAL, NO_PARSE_PREFIX,
    NO_PARSE_SCOPE,
};

/// Filter categories of a tree node. An empty slice means the node is
/// emitted whenever its parent is.
pub trait Tagged {
    fn filter_tags(&self) -> &'static [FilterTag];
}

impl Tagged for Statement {
    fn filter_tags(&self) -> &'static [FilterTag] {
        match self {
            Statement::Include(_) => &[],
            Statement::View(_) => &[FilterTag::View],
            Statement::Zone(_) => &[FilterTag::Zone],
            Statement::NoParse(_) => &[FilterTag::NoParse],
            Statement::Acl(_)
            | Statement::Key(_)
            | Statement::Controls(_)
            | Statement::StatisticsChannels(_)
            | Statement::Options(_)
            | Statement::Option(_)
            | Statement::Named(_)
            | Statement::Unnamed(_) => &[FilterTag::Config],
        }
    }
}

impl Tagged for OptionClause {
    fn filter_tags(&self) -> &'static [FilterTag] {
        match self {
            OptionClause::NoParse(_) => &[FilterTag::NoParse],
            _ => &[],
        }
    }
}

impl Tagged for ViewClause {
    fn filter_tags(&self) -> &'static [FilterTag] {
        match self {
            ViewClause::Zone(_) => &[FilterTag::Zone],
            ViewClause::NoParse(_) => &[FilterTag::NoParse],
            _ => &[],
        }
    }
}

impl Tagged for ZoneClause {
    fn filter_tags(&self) -> &'static [FilterTag] {
        match self {
            ZoneClause::NoParse(_) => &[FilterTag::NoParse],
            _ => &[],
        }
    }
}

impl Config {
    /// Serializes the configuration with tab indentation.
    pub fn get_formatted_output(&self, filter: Option<&Filter>) -> String {
        self.format(formatter::DEFAULT_INDENT, filter)
    }

    /// Serializes the statements accepted by `filter`, separated by one
    /// blank line.
    pub fn format(&self, indent_pattern: &str, filter: Option<&Filter>) -> String {
        let mut builder = StringBuilder::new(indent_pattern);
        let mut first = true;
        for statement in &self.statements {
            if !Filter::accepts(filter, statement.filter_tags()) {
                continue;
            }
            if !first {
                builder.write("\n\n");
            }
            first = false;
            statement.to_clause(filter).write(0, false, &mut builder);
        }
        builder.finish()
    }
}

impl Statement {
    pub fn to_clause(&self, filter: Option<&Filter>) -> Clause {
        match self {
            Statement::Include(include) => {
                let mut clause = Clause::new();
                clause.push_tokens(["include".to_string(), quote(&include.path)]);
                clause
            }
            Statement::Acl(acl) => acl.to_clause(),
            Statement::Key(key) => key.to_clause(),
            Statement::Controls(controls) => controls.to_clause(),
            Statement::StatisticsChannels(channels) => channels.to_clause(),
            Statement::Options(options) => options.to_clause(filter),
            Statement::View(view) => view.to_clause(filter),
            Statement::Zone(zone) => zone.to_clause(filter),
            Statement::NoParse(no_parse) => no_parse.to_clause(),
            Statement::Option(option) => option.to_clause(),
            Statement::Named(named) => named.to_clause(),
            Statement::Unnamed(unnamed) => unnamed.to_clause(),
        }
    }
}

impl Acl {
    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::new();
        clause
            .push_tokens(["acl".to_string(), quote(&self.name)])
            .push(self.address_match_list.to_scope());
        clause
    }
}

impl AddressMatchList {
    /// The list as an inline scope, e.g. `{ "192.0.2.1"; !key "k"; }`.
    pub fn to_scope(&self) -> Scope {
        let mut scope = Scope::new();
        for element in &self.elements {
            scope.push_token(format!("{};", element.to_text()));
        }
        scope
    }

    fn to_text(&self) -> String {
        if self.elements.is_empty() {
            return "{ }".to_string();
        }
        let elements: Vec<String> = self
            .elements
            .iter()
            .map(|e| format!("{};", e.to_text()))
            .collect();
        format!("{{ {} }}", elements.join(" "))
    }
}

impl AddressMatchListElement {
    fn to_text(&self) -> String {
        let body = match &self.kind {
            ElementKind::Acl(list) => list.to_text(),
            ElementKind::Key(key) => format!("key {}", quote(key)),
            ElementKind::IPv4Address(a) | ElementKind::IPv6Address(a) => quote(a),
            ElementKind::AclName(name) => ident_or_quote(name),
        };
        if self.negation {
            format!("!{body}")
        } else {
            body
        }
    }
}

impl Key {
    pub fn to_clause(&self) -> Clause {
        let mut scope = Scope::new();
        for key_clause in &self.clauses {
            let mut c = Clause::new();
            match key_clause {
                KeyClause::Algorithm(a) => c.push_tokens(["algorithm".to_string(), a.clone()]),
                KeyClause::Secret(s) => c.push_tokens(["secret".to_string(), quote(s)]),
            };
            scope.push(c);
        }
        let mut clause = Clause::new();
        clause
            .push_tokens(["key".to_string(), quote(&self.name)])
            .push(scope);
        clause
    }
}

fn key_list_scope(keys: &[String]) -> Scope {
    let mut scope = Scope::new();
    for key in keys {
        scope.push_token(format!("{};", quote(key)));
    }
    scope
}

fn read_only_tokens(clause: &mut Clause, read_only: Option<bool>) {
    if let Some(read_only) = read_only {
        clause.push_tokens(["read-only", if read_only { "true" } else { "false" }]);
    }
}

impl InetClause {
    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::new();
        clause.push_tokens(["inet".to_string(), self.address.clone()]);
        if let Some(port) = &self.port {
            clause.push_tokens(["port".to_string(), port.clone()]);
        }
        if let Some(allow) = &self.allow {
            clause.push_token("allow").push(allow.to_scope());
        }
        if let Some(keys) = &self.keys {
            clause.push_token("keys").push(key_list_scope(keys));
        }
        read_only_tokens(&mut clause, self.read_only);
        clause
    }
}

impl UnixClause {
    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::new();
        clause.push_tokens(["unix".to_string(), quote(&self.path)]);
        for (switch, value) in [
            ("perm", &self.perm),
            ("owner", &self.owner),
            ("group", &self.group),
        ] {
            if let Some(value) = value {
                clause.push_tokens([switch.to_string(), value.clone()]);
            }
        }
        if let Some(keys) = &self.keys {
            clause.push_token("keys").push(key_list_scope(keys));
        }
        read_only_tokens(&mut clause, self.read_only);
        clause
    }
}

impl Controls {
    pub fn to_clause(&self) -> Clause {
        let mut scope = Scope::new();
        for control in &self.clauses {
            match control {
                ControlClause::Inet(inet) => scope.push(inet.to_clause()),
                ControlClause::Unix(unix) => scope.push(unix.to_clause()),
            };
        }
        let mut clause = Clause::new();
        clause.push_token("controls").push(scope);
        clause
    }
}

impl StatisticsChannels {
    pub fn to_clause(&self) -> Clause {
        let mut scope = Scope::new();
        for inet in &self.clauses {
            scope.push(inet.to_clause());
        }
        let mut clause = Clause::new();
        clause.push_token("statistics-channels").push(scope);
        clause
    }
}

impl Options {
    pub fn to_clause(&self, filter: Option<&Filter>) -> Clause {
        let mut scope = Scope::new();
        for option in &self.clauses {
            if !Filter::accepts(filter, option.filter_tags()) {
                continue;
            }
            scope.push(match option {
                OptionClause::NoParse(n) => n.to_clause(),
                OptionClause::AllowTransfer(a) => a.to_clause(),
                OptionClause::ListenOn(l) => l.to_clause("listen-on"),
                OptionClause::ListenOnV6(l) => l.to_clause("listen-on-v6"),
                OptionClause::ResponsePolicy(r) => r.to_clause(),
                OptionClause::Option(o) => o.to_clause(),
                OptionClause::Named(n) => n.to_clause(),
                OptionClause::Unnamed(u) => u.to_clause(),
            });
        }
        let mut clause = Clause::new();
        clause.push_token("options").push(scope);
        clause
    }
}

impl AllowTransfer {
    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::new();
        clause.push_token("allow-transfer");
        if let Some(port) = self.port {
            clause.push_tokens(["port".to_string(), port.to_string()]);
        }
        if let Some(transport) = &self.transport {
            clause.push_tokens(["transport".to_string(), transport.clone()]);
        }
        clause.push(self.address_match_list.to_scope());
        clause
    }
}

impl ListenOn {
    pub fn to_clause(&self, keyword: &str) -> Clause {
        let mut clause = Clause::new();
        clause.push_token(keyword);
        if let Some(port) = self.port {
            clause.push_tokens(["port".to_string(), port.to_string()]);
        }
        if let Some(tls) = &self.tls {
            clause.push_tokens(["tls".to_string(), tls.clone()]);
        }
        if let Some(http) = &self.http {
            clause.push_tokens(["http".to_string(), http.clone()]);
        }
        clause.push(self.address_match_list.to_scope());
        clause
    }
}

impl ResponsePolicy {
    pub fn to_clause(&self) -> Clause {
        let mut scope = Scope::new();
        for zone in &self.zones {
            let mut c = Clause::new();
            c.push_tokens(["zone".to_string(), quote(&zone.zone)])
                .push_tokens(zone.switches.iter().cloned());
            scope.push(c);
        }
        let mut clause = Clause::new();
        clause
            .push_token("response-policy")
            .push(scope)
            .push_tokens(self.switches.iter().cloned());
        clause
    }
}

impl View {
    pub fn to_clause(&self, filter: Option<&Filter>) -> Clause {
        let mut scope = Scope::new();
        for view_clause in &self.clauses {
            if !Filter::accepts(filter, view_clause.filter_tags()) {
                continue;
            }
            scope.push(match view_clause {
                ViewClause::MatchClients(m) => {
                    let mut c = Clause::new();
                    c.push_token("match-clients")
                        .push(m.address_match_list.to_scope());
                    c
                }
                ViewClause::Zone(z) => z.to_clause(filter),
                ViewClause::NoParse(n) => n.to_clause(),
                ViewClause::AllowTransfer(a) => a.to_clause(),
                ViewClause::ResponsePolicy(r) => r.to_clause(),
                ViewClause::Option(o) => o.to_clause(),
                ViewClause::Named(n) => n.to_clause(),
                ViewClause::Unnamed(u) => u.to_clause(),
            });
        }
        let mut clause = Clause::new();
        clause.push_tokens(["view".to_string(), quote(&self.name)]);
        if let Some(class) = &self.class {
            clause.push_token(class.clone());
        }
        clause.push(scope);
        clause
    }
}

impl Zone {
    pub fn to_clause(&self, filter: Option<&Filter>) -> Clause {
        let mut scope = Scope::new();
        for zone_clause in &self.clauses {
            if !Filter::accepts(filter, zone_clause.filter_tags()) {
                continue;
            }
            scope.push(match zone_clause {
                ZoneClause::NoParse(n) => n.to_clause(),
                ZoneClause::AllowTransfer(a) => a.to_clause(),
                ZoneClause::Option(o) => o.to_clause(),
                ZoneClause::Named(n) => n.to_clause(),
                ZoneClause::Unnamed(u) => u.to_clause(),
            });
        }
        let mut clause = Clause::new();
        clause.push_tokens(["zone".to_string(), quote(&self.name)]);
        if let Some(class) = &self.class {
            clause.push_token(class.clone());
        }
        clause.push(scope);
        clause
    }
}

impl NoParse {
    /// The region with its sentinels, as it appears in a file.
    pub fn to_verbatim(&self) -> String {
        let (open, close) = match self.kind {
            NoParseKind::Scope => (NO_PARSE_SCOPE, Some(NO_PARSE_END)),
            NoParseKind::Global => (NO_PARSE_GLOBAL, None),
        };
        let mut text = open.to_string();
        if !self.contents.is_empty() {
            text.push('\n');
            text.push_str(&self.contents);
        }
        if let Some(close) = close {
            text.push('\n');
            text.push_str(close);
        }
        text
    }

    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::unterminated();
        clause.push_token(self.to_verbatim());
        clause
    }
}

impl GenericOption {
    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::new();
        clause
            .push_token(self.identifier.clone())
            .push_tokens(self.values.iter().cloned());
        clause
    }
}

impl NamedStatement {
    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::new();
        clause
            .push_tokens([self.identifier.clone(), ident_or_quote(&self.name)])
            .push_tokens(self.switches.iter().cloned())
            .push(self.contents.to_scope());
        clause
    }
}

impl UnnamedStatement {
    pub fn to_clause(&self) -> Clause {
        let mut clause = Clause::new();
        clause
            .push_token(self.identifier.clone())
            .push(self.contents.to_scope());
        clause
    }
}

/// One `;`-terminated piece of a generic body.
enum GenericItem {
    Plain(Vec<String>, bool),
    Nested(Vec<GenericPart>, bool),
    Verbatim(String),
}

enum GenericPart {
    Token(String),
    Scope(Vec<GenericItem>),
}

impl GenericContents {
    /// Rebuilds layout from the recorded tokens. A body whose statements
    /// hold no nested braces is written inline, otherwise one statement per
    /// line.
    pub fn to_scope(&self) -> Scope {
        let mut pos = 0;
        generic_scope(&split_items(&self.tokens, &mut pos))
    }
}

/// Splits tokens into items up to an unmatched `}` or the end.
fn split_items(tokens: &[String], pos: &mut usize) -> Vec<GenericItem> {
    let mut items = Vec::new();
    let mut parts: Vec<GenericPart> = Vec::new();
    let finish = |parts: &mut Vec<GenericPart>, items: &mut Vec<GenericItem>, terminated| {
        if parts.is_empty() {
            return;
        }
        let parts = std::mem::take(parts);
        if parts.iter().all(|p| matches!(p, GenericPart::Token(_))) {
            let tokens = parts
                .into_iter()
                .filter_map(|p| match p {
                    GenericPart::Token(t) => Some(t),
                    GenericPart::Scope(_) => None,
                })
                .collect();
            items.push(GenericItem::Plain(tokens, terminated));
        } else {
            items.push(GenericItem::Nested(parts, terminated));
        }
    };
    while let Some(token) = tokens.get(*pos) {
        *pos += 1;
        match token.as_str() {
            ";" => finish(&mut parts, &mut items, true),
            "{" => parts.push(GenericPart::Scope(split_items(tokens, pos))),
            "}" => break,
            t if t.starts_with(NO_PARSE_PREFIX) => {
                finish(&mut parts, &mut items, false);
                items.push(GenericItem::Verbatim(t.to_string()));
            }
            t => parts.push(GenericPart::Token(t.to_string())),
        }
    }
    finish(&mut parts, &mut items, false);
    items
}

fn generic_scope(items: &[GenericItem]) -> Scope {
    let mut scope = Scope::new();
    let inline = items.iter().all(|i| matches!(i, GenericItem::Plain(..)));
    for item in items {
        match item {
            GenericItem::Plain(tokens, terminated) if inline => {
                let mut text = tokens.join(" ");
                if *terminated {
                    text.push(';');
                }
                scope.push(Token::new(text));
            }
            GenericItem::Plain(tokens, terminated) => {
                let mut clause = if *terminated {
                    Clause::new()
                } else {
                    Clause::unterminated()
                };
                clause.push_tokens(tokens.iter().cloned());
                scope.push(clause);
            }
            GenericItem::Nested(parts, terminated) => {
                let mut clause = if *terminated {
                    Clause::new()
                } else {
                    Clause::unterminated()
                };
                for part in parts {
                    match part {
                        GenericPart::Token(t) => clause.push_token(t.clone()),
                        GenericPart::Scope(inner) => clause.push(generic_scope(inner)),
                    };
                }
                scope.push(clause);
            }
            GenericItem::Verbatim(text) => {
                let mut clause = Clause::unterminated();
                clause.push_token(text.clone());
                scope.push(clause);
            }
        }
    }
    scope
}

/// Leaves a name bare only when it lexes back to a single unquoted token
/// with the same text. Anything else is quoted.
fn ident_or_quote(name: &str) -> String {
    let bare = matches!(
        significant_tokens(name).as_slice(),
        [t] if t.value == name
            && matches!(
                t.kind,
                TokenKind::Ident
                    | TokenKind::Number
                    | TokenKind::IPv4Address
                    | TokenKind::IPv6Address
            )
    );
    if bare {
        name.to_string()
    } else {
        quote(name)
    }
}
