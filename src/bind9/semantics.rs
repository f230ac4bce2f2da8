//! Lookups and derived values over a parsed configuration.
//!
//! Lookups scan in source order and return the first match; a missing entry
//! is `None`, not an error.

use super::ast::*;
use crate::error::{Error, Result};
use ipnet::IpNet;
use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Depth limit of the ACL walk in [`Config::get_view_key`].
pub const MAX_ACL_RECURSION_DEPTH: usize = 5;

pub const DEFAULT_DNS_PORT: i64 = 53;
pub const DEFAULT_RNDC_PORT: u16 = 953;
pub const DEFAULT_STATISTICS_PORT: u16 = 80;

/// Where and how to reach the server's rndc channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RndcConnectionParams<'a> {
    pub address: String,
    pub port: u16,
    pub key: Option<&'a Key>,
}

impl Config {
    pub fn get_view(&self, name: &str) -> Option<&View> {
        self.statements.iter().find_map(|s| match s {
            Statement::View(view) if view.name == name => Some(view),
            _ => None,
        })
    }

    pub fn get_key(&self, id: &str) -> Option<&Key> {
        self.statements.iter().find_map(|s| match s {
            Statement::Key(key) if key.name == id => Some(key),
            _ => None,
        })
    }

    pub fn get_acl(&self, name: &str) -> Option<&Acl> {
        self.statements.iter().find_map(|s| match s {
            Statement::Acl(acl) if acl.name == name => Some(acl),
            _ => None,
        })
    }

    /// Returns a zone defined at the top level (outside any view).
    pub fn get_zone(&self, name: &str) -> Option<&Zone> {
        self.statements.iter().find_map(|s| match s {
            Statement::Zone(zone) if zone.name == name => Some(zone),
            _ => None,
        })
    }

    pub fn get_options(&self) -> Option<&Options> {
        self.statements.iter().find_map(|s| match s {
            Statement::Options(options) => Some(options),
            _ => None,
        })
    }

    pub fn get_controls(&self) -> Option<&Controls> {
        self.statements.iter().find_map(|s| match s {
            Statement::Controls(controls) => Some(controls),
            _ => None,
        })
    }

    pub fn get_statistics_channels(&self) -> Option<&StatisticsChannels> {
        self.statements.iter().find_map(|s| match s {
            Statement::StatisticsChannels(channels) => Some(channels),
            _ => None,
        })
    }

    /// Resolves the TSIG key a view's clients are matched with.
    ///
    /// Walks `match-clients` in order, skipping negated elements and
    /// address literals, descending into inline and named ACLs. The first
    /// `key` element decides the result, which is `None` when that key is
    /// not defined. Fails when ACL references nest deeper than
    /// [`MAX_ACL_RECURSION_DEPTH`], which is how reference cycles end.
    pub fn get_view_key(&self, view_name: &str) -> Result<Option<&Key>> {
        let Some(match_clients) = self
            .get_view(view_name)
            .and_then(|view| view.get_match_clients())
        else {
            return Ok(None);
        };
        match self.find_key_reference(&match_clients.address_match_list, 0) {
            Ok(found) => Ok(found.flatten()),
            Err(()) => Err(Error::TooMuchRecursion {
                view: view_name.to_string(),
            }),
        }
    }

    /// `Ok(Some(_))` once a key element is reached, `Ok(None)` when the
    /// list holds none, `Err` when the depth limit is exceeded.
    fn find_key_reference(
        &self,
        list: &AddressMatchList,
        depth: usize,
    ) -> std::result::Result<Option<Option<&Key>>, ()> {
        if depth > MAX_ACL_RECURSION_DEPTH {
            return Err(());
        }
        for element in list.elements.iter().filter(|e| e.is_match_expected()) {
            let found = match &element.kind {
                ElementKind::Key(name) => Some(self.get_key(name)),
                ElementKind::Acl(nested) => self.find_key_reference(nested, depth + 1)?,
                ElementKind::AclName(name) => match self.get_acl(name) {
                    Some(acl) => self.find_key_reference(&acl.address_match_list, depth + 1)?,
                    None => None,
                },
                ElementKind::IPv4Address(_) | ElementKind::IPv6Address(_) => None,
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Connection parameters of the first `controls inet` clause. The key
    /// is the first one listed in the clause's `keys`, when defined.
    pub fn get_rndc_connection_params(&self) -> Option<RndcConnectionParams<'_>> {
        let inet = self.get_controls()?.get_first_inet_clause()?;
        let (address, port) = inet.get_connectable_address_and_port(DEFAULT_RNDC_PORT);
        let key = inet
            .keys
            .as_ref()
            .and_then(|keys| keys.first())
            .and_then(|name| self.get_key(name));
        Some(RndcConnectionParams { address, port, key })
    }

    /// Address and port of the first statistics channel.
    pub fn get_statistics_channel_address(&self) -> Option<(String, u16)> {
        self.get_statistics_channels()?
            .get_first_inet_clause()
            .map(|inet| inet.get_connectable_address_and_port(DEFAULT_STATISTICS_PORT))
    }
}

impl Key {
    /// Returns `(algorithm, secret)`.
    pub fn get_algorithm_secret(&self) -> Result<(&str, &str)> {
        let mut algorithm = None;
        let mut secret = None;
        for clause in &self.clauses {
            match clause {
                KeyClause::Algorithm(a) => algorithm = algorithm.or(Some(a.as_str())),
                KeyClause::Secret(s) => secret = secret.or(Some(s.as_str())),
            }
        }
        let missing = |what| Error::MissingKeyMaterial {
            key: self.name.clone(),
            missing: what,
        };
        Ok((
            algorithm.ok_or_else(|| missing("algorithm"))?,
            secret.ok_or_else(|| missing("secret"))?,
        ))
    }
}

impl View {
    pub fn get_match_clients(&self) -> Option<&MatchClients> {
        self.clauses.iter().find_map(|c| match c {
            ViewClause::MatchClients(m) => Some(m),
            _ => None,
        })
    }

    pub fn get_response_policy(&self) -> Option<&ResponsePolicy> {
        self.clauses.iter().find_map(|c| match c {
            ViewClause::ResponsePolicy(r) => Some(r),
            _ => None,
        })
    }

    pub fn get_allow_transfer(&self) -> Option<&AllowTransfer> {
        self.clauses.iter().find_map(|c| match c {
            ViewClause::AllowTransfer(a) => Some(a),
            _ => None,
        })
    }

    pub fn get_zone(&self, name: &str) -> Option<&Zone> {
        self.clauses.iter().find_map(|c| match c {
            ViewClause::Zone(zone) if zone.name == name => Some(zone),
            _ => None,
        })
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.clauses.iter().filter_map(|c| match c {
            ViewClause::Zone(zone) => Some(zone),
            _ => None,
        })
    }
}

impl Zone {
    pub fn get_allow_transfer(&self) -> Option<&AllowTransfer> {
        self.clauses.iter().find_map(|c| match c {
            ZoneClause::AllowTransfer(a) => Some(a),
            _ => None,
        })
    }
}

impl Options {
    pub fn get_allow_transfer(&self) -> Option<&AllowTransfer> {
        self.clauses.iter().find_map(|c| match c {
            OptionClause::AllowTransfer(a) => Some(a),
            _ => None,
        })
    }

    /// All `listen-on` and `listen-on-v6` clauses in source order.
    pub fn get_listen_on_set(&self) -> ListenOnClauses<'_> {
        ListenOnClauses(
            self.clauses
                .iter()
                .filter_map(|c| match c {
                    OptionClause::ListenOn(l) | OptionClause::ListenOnV6(l) => Some(l),
                    _ => None,
                })
                .collect(),
        )
    }

    /// The first `response-policy` clause. Located once per instance, so
    /// repeated calls return the same reference.
    pub fn get_response_policy(&self) -> Option<&ResponsePolicy> {
        let index = self.response_policy.get_or_init(|| {
            self.clauses
                .iter()
                .position(|c| matches!(c, OptionClause::ResponsePolicy(_)))
        });
        match self.clauses.get((*index)?) {
            Some(OptionClause::ResponsePolicy(policy)) => Some(policy),
            _ => None,
        }
    }
}

impl ResponsePolicy {
    /// Whether `zone_name` is one of the response policy zones. Names are
    /// compared case-insensitively.
    pub fn is_rpz(&self, zone_name: &str) -> bool {
        self.zones
            .iter()
            .any(|z| z.zone.eq_ignore_ascii_case(zone_name))
    }
}

impl Controls {
    pub fn get_first_inet_clause(&self) -> Option<&InetClause> {
        self.clauses.iter().find_map(|c| match c {
            ControlClause::Inet(inet) => Some(inet),
            ControlClause::Unix(_) => None,
        })
    }
}

impl StatisticsChannels {
    pub fn get_first_inet_clause(&self) -> Option<&InetClause> {
        self.clauses.first()
    }
}

impl InetClause {
    /// Host and port a client can connect to. Wildcard or missing ports
    /// fall back to `default_port`; wildcard addresses become `localhost`.
    pub fn get_connectable_address_and_port(&self, default_port: u16) -> (String, u16) {
        let port = self
            .port
            .as_deref()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(default_port);
        let address = match self.address.as_str() {
            "" | "*" | "0.0.0.0" => "localhost".to_string(),
            other => other.to_string(),
        };
        (address, port)
    }
}

impl ListenOn {
    pub fn get_port(&self) -> i64 {
        self.port.unwrap_or(DEFAULT_DNS_PORT)
    }

    /// The clause BIND assumes when `listen-on` is absent.
    pub fn default_v4() -> Self {
        Self {
            port: Some(DEFAULT_DNS_PORT),
            address_match_list: AddressMatchList::new(vec![AddressMatchListElement::new(
                ElementKind::IPv4Address(Ipv4Addr::LOCALHOST.to_string()),
            )]),
            ..Self::default()
        }
    }

    fn accepts(&self, ip: IpAddr) -> bool {
        self.address_match_list.includes_ip_address(ip)
            || self.address_match_list.contains_literal(match ip {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            })
    }
}

/// The `listen-on` and `listen-on-v6` clauses of an `options` statement.
#[derive(Debug, Clone, Default)]
pub struct ListenOnClauses<'a>(pub Vec<&'a ListenOn>);

impl<'a> ListenOnClauses<'a> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Picks the clause a local client should use to reach the server on
    /// `port`: one accepting the IPv4 loopback (or listening on all IPv4
    /// addresses), then the IPv6 equivalent, then any clause with the port.
    pub fn get_matching_listen_on(&self, port: i64) -> Option<Cow<'a, ListenOn>> {
        if self.0.is_empty() {
            return (port == DEFAULT_DNS_PORT).then(|| Cow::Owned(ListenOn::default_v4()));
        }
        let with_port: Vec<&'a ListenOn> = self
            .0
            .iter()
            .copied()
            .filter(|l| l.get_port() == port)
            .collect();
        let loopbacks = [
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
        ];
        loopbacks
            .iter()
            .find_map(|ip| with_port.iter().copied().find(|l| l.accepts(*ip)))
            .or_else(|| with_port.first().copied())
            .map(Cow::Borrowed)
    }
}

impl AllowTransfer {
    /// True when nobody may transfer: the list is empty or only `none`.
    pub fn is_disabled(&self) -> bool {
        self.address_match_list.elements.iter().all(|e| {
            !e.negation && matches!(&e.kind, ElementKind::AclName(name) if name == "none")
        })
    }
}

impl AddressMatchListElement {
    /// Whether a matching client is accepted (rather than rejected).
    pub fn is_match_expected(&self) -> bool {
        !self.negation
    }

    fn literal(&self) -> Option<IpAddr> {
        match &self.kind {
            ElementKind::IPv4Address(a) | ElementKind::IPv6Address(a) => a.parse().ok(),
            _ => None,
        }
    }

    fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, ElementKind::AclName(n) if n == name)
    }

    /// Whether `ip` falls under this element, ignoring negation. Named ACL
    /// references other than the built-ins never match.
    fn covers(&self, ip: IpAddr) -> bool {
        match &self.kind {
            ElementKind::IPv4Address(a) | ElementKind::IPv6Address(a) => match a.parse::<IpNet>() {
                Ok(net) => net.contains(&ip),
                Err(_) => a.parse::<IpAddr>().is_ok_and(|addr| addr == ip),
            },
            ElementKind::AclName(name) => match name.as_str() {
                "any" => true,
                "localhost" => ip.is_loopback(),
                _ => false,
            },
            ElementKind::Acl(nested) => nested.includes_ip_address(ip),
            ElementKind::Key(_) => false,
        }
    }
}

impl AddressMatchList {
    /// True when the list explicitly rejects `ip`: it holds `!ip`, `none`
    /// or `!any`.
    pub fn excludes_ip_address(&self, ip: IpAddr) -> bool {
        self.elements.iter().any(|e| {
            (e.negation && e.literal() == Some(ip))
                || (!e.negation && e.is_name("none"))
                || (e.negation && e.is_name("any"))
        })
    }

    /// Evaluates the list for `ip` the way BIND does: the first covering
    /// element decides.
    pub fn includes_ip_address(&self, ip: IpAddr) -> bool {
        self.elements
            .iter()
            .find(|e| e.covers(ip))
            .is_some_and(AddressMatchListElement::is_match_expected)
    }

    /// Whether the list holds the non-negated literal address `ip`.
    pub fn contains_literal(&self, ip: IpAddr) -> bool {
        self.elements
            .iter()
            .any(|e| !e.negation && e.literal() == Some(ip))
    }
}
