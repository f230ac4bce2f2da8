//! Typed tree produced by the `named.conf` parser.
//!
//! Tagged unions are Rust enums, so exactly one variant is always populated.
//! Children are owned by their parent; the only state that changes after
//! parsing is the response-policy memo inside [`Options`].

use std::path::PathBuf;
use std::sync::OnceLock;

/// A parsed configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Absolute path of the file the statements came from, when known.
    /// Used to recognize an include of the file itself.
    pub source_path: Option<PathBuf>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Include(Include),
    Acl(Acl),
    Key(Key),
    Controls(Controls),
    StatisticsChannels(StatisticsChannels),
    Options(Options),
    View(View),
    Zone(Zone),
    NoParse(NoParse),
    Option(GenericOption),
    Named(NamedStatement),
    Unnamed(UnnamedStatement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub name: String,
    pub address_match_list: AddressMatchList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMatchList {
    pub elements: Vec<AddressMatchListElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMatchListElement {
    /// Set when the element was prefixed with `!`.
    pub negation: bool,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// A nested `{ ... }` list.
    Acl(AddressMatchList),
    /// `key <id>`.
    Key(String),
    IPv4Address(String),
    IPv6Address(String),
    /// An ACL name or built-in identifier such as `any` or `none`.
    AclName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub name: String,
    pub clauses: Vec<KeyClause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClause {
    Algorithm(String),
    Secret(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controls {
    pub clauses: Vec<ControlClause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlClause {
    Inet(InetClause),
    Unix(UnixClause),
}

/// `inet <address> [port <port>] [allow { ... }] [keys { ... }] [read-only <bool>]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InetClause {
    pub address: String,
    /// A number or `*`.
    pub port: Option<String>,
    pub allow: Option<AddressMatchList>,
    pub keys: Option<Vec<String>>,
    pub read_only: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnixClause {
    pub path: String,
    pub perm: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub keys: Option<Vec<String>>,
    pub read_only: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsChannels {
    pub clauses: Vec<InetClause>,
}

/// The `options` statement.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub clauses: Vec<OptionClause>,
    /// Index of the first `response-policy` clause, resolved on first use.
    pub(crate) response_policy: OnceLock<Option<usize>>,
}

impl Options {
    pub fn new(clauses: Vec<OptionClause>) -> Self {
        Self {
            clauses,
            response_policy: OnceLock::new(),
        }
    }
}

impl PartialEq for Options {
    fn eq(&self, other: &Self) -> bool {
        self.clauses == other.clauses
    }
}

impl Eq for Options {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionClause {
    NoParse(NoParse),
    AllowTransfer(AllowTransfer),
    ListenOn(ListenOn),
    ListenOnV6(ListenOn),
    ResponsePolicy(ResponsePolicy),
    Option(GenericOption),
    Named(NamedStatement),
    Unnamed(UnnamedStatement),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowTransfer {
    pub port: Option<i64>,
    pub transport: Option<String>,
    pub address_match_list: AddressMatchList,
}

/// `listen-on` or `listen-on-v6`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenOn {
    pub port: Option<i64>,
    pub tls: Option<String>,
    pub http: Option<String>,
    pub address_match_list: AddressMatchList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub zones: Vec<ResponsePolicyZone>,
    /// Tokens following the zone list, e.g. `break-dnssec yes`.
    pub switches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePolicyZone {
    pub zone: String,
    pub switches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub name: String,
    pub class: Option<String>,
    pub clauses: Vec<ViewClause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewClause {
    MatchClients(MatchClients),
    Zone(Zone),
    NoParse(NoParse),
    AllowTransfer(AllowTransfer),
    ResponsePolicy(ResponsePolicy),
    Option(GenericOption),
    Named(NamedStatement),
    Unnamed(UnnamedStatement),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchClients {
    pub address_match_list: AddressMatchList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub name: String,
    pub class: Option<String>,
    pub clauses: Vec<ZoneClause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneClause {
    NoParse(NoParse),
    AllowTransfer(AllowTransfer),
    Option(GenericOption),
    Named(NamedStatement),
    Unnamed(UnnamedStatement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoParseKind {
    /// Bounded by `//@stork:no-parse:scope` and `//@stork:no-parse:end`.
    Scope,
    /// From `//@stork:no-parse:global` to the end of the enclosing block.
    Global,
}

/// A region kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoParse {
    pub kind: NoParseKind,
    pub contents: String,
}

/// `<identifier> [<value> ...];`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericOption {
    pub identifier: String,
    pub values: Vec<String>,
}

/// `<identifier> <name> [<switch> ...] { ... };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStatement {
    pub identifier: String,
    pub name: String,
    pub switches: Vec<String>,
    pub contents: GenericContents,
}

/// `<identifier> { ... };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnnamedStatement {
    pub identifier: String,
    pub contents: GenericContents,
}

/// Uninterpreted body of a braced region, one surface string per token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericContents {
    pub tokens: Vec<String>,
}

impl AddressMatchListElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            negation: false,
            kind,
        }
    }

    pub fn negated(kind: ElementKind) -> Self {
        Self {
            negation: true,
            kind,
        }
    }
}

impl AddressMatchList {
    pub fn new(elements: Vec<AddressMatchListElement>) -> Self {
        Self { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
