use super::Universe;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of a single option field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Binary,
    String,
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Int8,
    Int16,
    Int32,
    Ipv4Address,
    Ipv6Address,
    Ipv6Prefix,
    Psid,
    Fqdn,
}

impl FieldType {
    pub const ALL: [FieldType; 14] = [
        Self::Binary,
        Self::String,
        Self::Bool,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Ipv4Address,
        Self::Ipv6Address,
        Self::Ipv6Prefix,
        Self::Psid,
        Self::Fqdn,
    ];

    /// The name Kea uses in option definitions.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Ipv4Address => "ipv4-address",
            Self::Ipv6Address => "ipv6-address",
            Self::Ipv6Prefix => "ipv6-prefix",
            Self::Psid => "psid",
            Self::Fqdn => "fqdn",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::conversion(format!("unknown option field type {s:?}")))
    }
}

/// A value held by an option field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionFieldValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for OptionFieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionFieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for OptionFieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptionFieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// One typed field of a normalized option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpOptionField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub values: Vec<OptionFieldValue>,
}

impl DhcpOptionField {
    pub fn new<I, V>(field_type: FieldType, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<OptionFieldValue>,
    {
        Self {
            field_type,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Option in the normalized, field-typed form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DhcpOption {
    #[serde(default)]
    pub always_send: bool,
    pub code: u16,
    #[serde(default)]
    pub name: String,
    pub space: String,
    #[serde(default)]
    pub universe: Universe,
    #[serde(default)]
    pub encapsulate: String,
    #[serde(default)]
    pub fields: Vec<DhcpOptionField>,
}

fn default_csv_format() -> bool {
    true
}

/// An `option-data` entry as it appears in Kea configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SingleOptionData {
    #[serde(default)]
    pub always_send: bool,
    #[serde(default)]
    pub code: u16,
    #[serde(default = "default_csv_format")]
    pub csv_format: bool,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub space: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_names_match_kea() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        assert!("uint64".parse::<FieldType>().is_err());
    }

    #[test]
    fn option_data_defaults() {
        let data: SingleOptionData =
            serde_json::from_str(r#"{ "code": 6, "data": "192.0.2.1" }"#).unwrap();
        assert!(data.csv_format);
        assert!(!data.always_send);
        assert_eq!(data.space, "");

        let data: SingleOptionData = serde_json::from_str(
            r#"{ "always-send": true, "code": 250, "csv-format": false, "data": "0A0B", "space": "dhcp4" }"#,
        )
        .unwrap();
        assert!(data.always_send);
        assert!(!data.csv_format);
    }

    #[test]
    fn field_values_are_untagged() {
        let field: DhcpOptionField =
            serde_json::from_str(r#"{ "type": "ipv6-prefix", "values": ["3000::", 64] }"#).unwrap();
        assert_eq!(
            field,
            DhcpOptionField {
                field_type: FieldType::Ipv6Prefix,
                values: vec![OptionFieldValue::Str("3000::".into()), OptionFieldValue::Int(64)],
            }
        );
    }
}
