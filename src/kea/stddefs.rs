//! Standard option definitions known to Kea.

use super::definition::{DefinitionType, OptionDefinition};
use super::option::FieldType;
use super::Universe;
use std::sync::LazyLock;

use FieldType::*;

struct StdDef {
    universe: Universe,
    name: &'static str,
    code: u16,
    space: &'static str,
    def_type: DefinitionType,
    record_types: &'static [FieldType],
    array: bool,
    encapsulate: &'static str,
}

const fn field(
    universe: Universe,
    name: &'static str,
    code: u16,
    space: &'static str,
    field_type: FieldType,
    array: bool,
) -> StdDef {
    StdDef {
        universe,
        name,
        code,
        space,
        def_type: DefinitionType::Field(field_type),
        record_types: &[],
        array,
        encapsulate: "",
    }
}

const fn record(
    name: &'static str,
    code: u16,
    space: &'static str,
    record_types: &'static [FieldType],
    encapsulate: &'static str,
) -> StdDef {
    StdDef {
        universe: Universe::V6,
        name,
        code,
        space,
        def_type: DefinitionType::Record,
        record_types,
        array: false,
        encapsulate,
    }
}

const fn container(name: &'static str, code: u16, encapsulate: &'static str) -> StdDef {
    StdDef {
        universe: Universe::V6,
        name,
        code,
        space: "dhcp6",
        def_type: DefinitionType::Empty,
        record_types: &[],
        array: false,
        encapsulate,
    }
}

const S46_RULE: &[FieldType] = &[Uint8, Uint8, Uint8, Ipv4Address, Ipv6Prefix];
const S46_V4V6BIND: &[FieldType] = &[Ipv4Address, Ipv6Prefix];
const S46_PORTPARAMS: &[FieldType] = &[Uint8, Psid];

const TABLE: &[StdDef] = &[
    field(Universe::V4, "routers", 3, "dhcp4", Ipv4Address, true),
    field(Universe::V4, "domain-name-servers", 6, "dhcp4", Ipv4Address, true),
    field(Universe::V4, "host-name", 12, "dhcp4", String, false),
    field(Universe::V4, "domain-name", 15, "dhcp4", Fqdn, false),
    field(Universe::V4, "ntp-servers", 42, "dhcp4", Ipv4Address, true),
    field(Universe::V6, "dns-servers", 23, "dhcp6", Ipv6Address, true),
    field(Universe::V6, "domain-search", 24, "dhcp6", Fqdn, true),
    field(Universe::V6, "sntp-servers", 31, "dhcp6", Ipv6Address, true),
    // MAP-E, MAP-T and lightweight 4over6 (RFC 7598).
    container("s46-cont-mape", 94, "s46-cont-mape-options"),
    container("s46-cont-mapt", 95, "s46-cont-mapt-options"),
    container("s46-cont-lw", 96, "s46-cont-lw-options"),
    record("s46-rule", 89, "s46-cont-mape-options", S46_RULE, "s46-rule-options"),
    field(Universe::V6, "s46-br", 90, "s46-cont-mape-options", Ipv6Address, false),
    record("s46-rule", 89, "s46-cont-mapt-options", S46_RULE, "s46-rule-options"),
    field(Universe::V6, "s46-dmr", 91, "s46-cont-mapt-options", Ipv6Prefix, false),
    field(Universe::V6, "s46-br", 90, "s46-cont-lw-options", Ipv6Address, false),
    record("s46-v4v6bind", 92, "s46-cont-lw-options", S46_V4V6BIND, "s46-v4v6bind-options"),
    record("s46-portparams", 93, "s46-rule-options", S46_PORTPARAMS, ""),
    record("s46-portparams", 93, "s46-v4v6bind-options", S46_PORTPARAMS, ""),
];

static STD_DEFINITIONS: LazyLock<Vec<(Universe, OptionDefinition)>> = LazyLock::new(|| {
    TABLE
        .iter()
        .map(|d| {
            (
                d.universe,
                OptionDefinition {
                    code: d.code,
                    name: d.name.to_string(),
                    space: d.space.to_string(),
                    encapsulate: d.encapsulate.to_string(),
                    def_type: d.def_type,
                    record_types: d.record_types.to_vec(),
                    array: d.array,
                },
            )
        })
        .collect()
});

/// Looks up a standard definition by code, option space and universe.
pub fn find_std_definition(
    code: u16,
    space: &str,
    universe: Universe,
) -> Option<&'static OptionDefinition> {
    STD_DEFINITIONS
        .iter()
        .find(|(u, d)| *u == universe && d.code == code && d.space == space)
        .map(|(_, d)| d)
}

/// Every standard definition of a universe.
pub fn std_definitions(universe: Universe) -> impl Iterator<Item = &'static OptionDefinition> {
    STD_DEFINITIONS
        .iter()
        .filter(move |(u, _)| *u == universe)
        .map(|(_, d)| d)
}
