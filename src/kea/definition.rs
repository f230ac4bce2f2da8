use super::option::{DhcpOption, FieldType};
use super::{stddefs, Universe};
use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Shape of an option's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionType {
    /// No payload; the option only carries sub-options.
    Empty,
    /// A sequence of fields typed by `record-types`.
    Record,
    /// A single field, or a list of them when the definition is an array.
    Field(FieldType),
}

impl fmt::Display for DefinitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionType::Empty => f.write_str("empty"),
            DefinitionType::Record => f.write_str("record"),
            DefinitionType::Field(t) => fmt::Display::fmt(t, f),
        }
    }
}

impl std::str::FromStr for DefinitionType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim() {
            "empty" => Ok(DefinitionType::Empty),
            "record" => Ok(DefinitionType::Record),
            other => other.parse().map(DefinitionType::Field),
        }
    }
}

impl Serialize for DefinitionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DefinitionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kea writes record types as one comma separated string.
fn deserialize_record_types<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<FieldType>, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse().map_err(serde::de::Error::custom))
        .collect()
}

fn serialize_record_types<S: Serializer>(
    types: &[FieldType],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let joined: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
    serializer.serialize_str(&joined.join(", "))
}

/// An `option-def` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptionDefinition {
    pub code: u16,
    pub name: String,
    pub space: String,
    #[serde(default)]
    pub encapsulate: String,
    #[serde(rename = "type")]
    pub def_type: DefinitionType,
    #[serde(
        default,
        deserialize_with = "deserialize_record_types",
        serialize_with = "serialize_record_types"
    )]
    pub record_types: Vec<FieldType>,
    #[serde(default)]
    pub array: bool,
}

impl OptionDefinition {
    /// Type of the field at `index`, or `None` past the last field the
    /// definition allows. Arrays of records repeat the record types.
    pub fn field_type_at(&self, index: usize) -> Option<FieldType> {
        match self.def_type {
            DefinitionType::Empty => None,
            DefinitionType::Record if self.record_types.is_empty() => None,
            DefinitionType::Record if self.array => {
                Some(self.record_types[index % self.record_types.len()])
            }
            DefinitionType::Record => self.record_types.get(index).copied(),
            DefinitionType::Field(t) if self.array || index == 0 => Some(t),
            DefinitionType::Field(_) => None,
        }
    }
}

/// Source of option definitions for the codec.
pub trait DhcpOptionDefinitionLookup {
    /// Finds a definition. With a daemon, definitions configured for it are
    /// consulted before the shared ones.
    fn find(
        &self,
        daemon_id: Option<i64>,
        code: u16,
        space: &str,
        universe: Universe,
    ) -> Option<&OptionDefinition>;

    /// Whether the daemon knows a definition for the option, which decides
    /// between the CSV and the hex form.
    fn definition_exists(&self, daemon_id: i64, option: &DhcpOption) -> bool {
        self.find(Some(daemon_id), option.code, &option.space, option.universe)
            .is_some()
    }
}

/// Custom definitions layered over the standard table.
#[derive(Debug, Clone, Default)]
pub struct DefinitionStore {
    daemons: HashMap<i64, Vec<OptionDefinition>>,
    shared: Vec<OptionDefinition>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers definitions from one daemon's configuration.
    pub fn add_daemon_definitions(
        &mut self,
        daemon_id: i64,
        definitions: impl IntoIterator<Item = OptionDefinition>,
    ) {
        self.daemons.entry(daemon_id).or_default().extend(definitions);
    }

    /// Registers definitions visible to every daemon.
    pub fn add_shared_definitions(&mut self, definitions: impl IntoIterator<Item = OptionDefinition>) {
        self.shared.extend(definitions);
    }

    /// Loads every `*.json` file in `dir` as a list of shared definitions.
    /// A missing directory yields an empty store.
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut store = Self::new();
        if !dir.exists() {
            return Ok(store);
        }
        for entry in fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|x| x.to_str()) != Some("json") {
                continue;
            }
            let s = fs::read_to_string(&path)
                .with_context(|| format!("read option definitions {}", path.display()))?;
            let definitions: Vec<OptionDefinition> = serde_json::from_str(&s)
                .with_context(|| format!("parse option definitions {}", path.display()))?;
            debug!(path = %path.display(), count = definitions.len(), "loaded option definitions");
            store.add_shared_definitions(definitions);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.shared.len() + self.daemons.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matching<'a>(
    definitions: &'a [OptionDefinition],
    code: u16,
    space: &str,
) -> Option<&'a OptionDefinition> {
    definitions.iter().find(|d| d.code == code && d.space == space)
}

impl DhcpOptionDefinitionLookup for DefinitionStore {
    fn find(
        &self,
        daemon_id: Option<i64>,
        code: u16,
        space: &str,
        universe: Universe,
    ) -> Option<&OptionDefinition> {
        daemon_id
            .and_then(|id| self.daemons.get(&id))
            .and_then(|defs| matching(defs, code, space))
            .or_else(|| matching(&self.shared, code, space))
            .or_else(|| stddefs::find_std_definition(code, space, universe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(types: &[FieldType], array: bool) -> OptionDefinition {
        OptionDefinition {
            code: 222,
            name: "custom".into(),
            space: "dhcp4".into(),
            encapsulate: String::new(),
            def_type: DefinitionType::Record,
            record_types: types.to_vec(),
            array,
        }
    }

    #[test]
    fn deserializes_kea_option_def() {
        let def: OptionDefinition = serde_json::from_str(
            r#"{
                "name": "foo", "code": 222, "space": "dhcp4", "type": "record",
                "record-types": "ipv4-address, uint16", "array": false, "encapsulate": ""
            }"#,
        )
        .unwrap();
        assert_eq!(def.def_type, DefinitionType::Record);
        assert_eq!(def.record_types, vec![FieldType::Ipv4Address, FieldType::Uint16]);

        let def: OptionDefinition = serde_json::from_str(
            r#"{ "name": "bar", "code": 223, "space": "dhcp6", "type": "ipv6-address", "array": true }"#,
        )
        .unwrap();
        assert_eq!(def.def_type, DefinitionType::Field(FieldType::Ipv6Address));
        assert!(def.record_types.is_empty());

        let json = serde_json::to_value(&record(&[FieldType::Uint8, FieldType::Psid], false)).unwrap();
        assert_eq!(json["record-types"], "uint8, psid");
        assert_eq!(json["type"], "record");

        assert!(serde_json::from_str::<OptionDefinition>(
            r#"{ "name": "x", "code": 1, "space": "dhcp4", "type": "uint64" }"#
        )
        .is_err());
    }

    #[test]
    fn field_type_positions() {
        let plain = record(&[FieldType::Uint8, FieldType::Ipv4Address], false);
        assert_eq!(plain.field_type_at(1), Some(FieldType::Ipv4Address));
        assert_eq!(plain.field_type_at(2), None);

        let array = record(&[FieldType::Uint8, FieldType::Ipv4Address], true);
        assert_eq!(array.field_type_at(2), Some(FieldType::Uint8));
        assert_eq!(array.field_type_at(5), Some(FieldType::Ipv4Address));

        let mut scalar = record(&[], false);
        scalar.def_type = DefinitionType::Field(FieldType::Uint16);
        assert_eq!(scalar.field_type_at(0), Some(FieldType::Uint16));
        assert_eq!(scalar.field_type_at(1), None);
        scalar.array = true;
        assert_eq!(scalar.field_type_at(7), Some(FieldType::Uint16));

        scalar.def_type = DefinitionType::Empty;
        assert_eq!(scalar.field_type_at(0), None);
    }

    #[test]
    fn daemon_definitions_take_precedence() {
        let mut store = DefinitionStore::new();
        let mut shared = record(&[FieldType::Uint8], false);
        shared.name = "shared".into();
        let mut own = record(&[FieldType::Uint16], false);
        own.name = "own".into();
        store.add_shared_definitions([shared]);
        store.add_daemon_definitions(7, [own]);
        assert_eq!(store.len(), 2);

        let find = |daemon| store.find(daemon, 222, "dhcp4", Universe::V4).map(|d| d.name.as_str());
        assert_eq!(find(Some(7)), Some("own"));
        assert_eq!(find(Some(8)), Some("shared"));
        assert_eq!(find(None), Some("shared"));
        assert!(store.find(None, 222, "dhcp6", Universe::V6).is_none());
    }

    #[test]
    fn falls_back_to_standard_table() {
        let store = DefinitionStore::new();
        let def = store.find(None, 94, "dhcp6", Universe::V6).unwrap();
        assert_eq!(def.name, "s46-cont-mape");
        let option = DhcpOption {
            code: 6,
            space: "dhcp4".into(),
            universe: Universe::V4,
            ..DhcpOption::default()
        };
        assert!(store.definition_exists(1, &option));
    }

    #[test]
    fn load_dir_reads_json_files() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        fs::write(
            dir.path().join("custom.json"),
            r#"[{ "name": "foo", "code": 222, "space": "dhcp4", "type": "uint32" }]"#,
        )?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;
        let store = DefinitionStore::load_dir(dir.path())?;
        assert_eq!(store.len(), 1);
        assert!(store.find(Some(1), 222, "dhcp4", Universe::V4).is_some());

        let missing = DefinitionStore::load_dir(&dir.path().join("nope"))?;
        assert!(missing.is_empty());

        fs::write(dir.path().join("broken.json"), "[{")?;
        assert!(DefinitionStore::load_dir(dir.path()).is_err());
        Ok(())
    }
}
