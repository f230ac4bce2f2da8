//! Read access to a Kea daemon configuration document.

use super::definition::OptionDefinition;
use super::option::SingleOptionData;
use super::Universe;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;

/// The daemon a configuration belongs to, named after its root key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonRole {
    Dhcp4,
    Dhcp6,
    ControlAgent,
    DhcpDdns,
}

impl DaemonRole {
    const ALL: [DaemonRole; 4] = [
        DaemonRole::Dhcp4,
        DaemonRole::Dhcp6,
        DaemonRole::ControlAgent,
        DaemonRole::DhcpDdns,
    ];

    pub fn root_key(self) -> &'static str {
        match self {
            DaemonRole::Dhcp4 => "Dhcp4",
            DaemonRole::Dhcp6 => "Dhcp6",
            DaemonRole::ControlAgent => "Control-agent",
            DaemonRole::DhcpDdns => "DhcpDdns",
        }
    }

    /// Protocol family served by a DHCP daemon.
    pub fn universe(self) -> Option<Universe> {
        match self {
            DaemonRole::Dhcp4 => Some(Universe::V4),
            DaemonRole::Dhcp6 => Some(Universe::V6),
            _ => None,
        }
    }
}

impl fmt::Display for DaemonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub user: String,
    pub password: String,
}

/// The Control Agent `authentication` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    #[serde(rename = "type")]
    pub auth_type: String,
    #[serde(default)]
    pub realm: Option<String>,
    #[serde(default)]
    pub clients: Vec<ClientCredentials>,
}

impl Authentication {
    pub fn is_basic_auth(&self) -> bool {
        self.auth_type == "basic"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookLibrary {
    pub library: String,
    #[serde(default)]
    pub parameters: Option<Value>,
}

/// A parsed Kea configuration: one daemon root key and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct KeaConfig {
    role: DaemonRole,
    root: Map<String, Value>,
}

impl KeaConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut document) = value else {
            return Err(Error::conversion("Kea configuration must be a JSON object"));
        };
        for role in DaemonRole::ALL {
            if let Some(Value::Object(root)) = document.remove(role.root_key()) {
                return Ok(Self { role, root });
            }
        }
        Err(Error::conversion(
            "Kea configuration has no Dhcp4, Dhcp6, Control-agent or DhcpDdns root",
        ))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn role(&self) -> DaemonRole {
        self.role
    }

    pub fn universe(&self) -> Option<Universe> {
        self.role.universe()
    }

    pub fn is_control_agent(&self) -> bool {
        self.role == DaemonRole::ControlAgent
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.root.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(T::deserialize(value)?)),
        }
    }

    fn require_control_agent(&self, parameter: &str) -> Result<()> {
        if self.is_control_agent() {
            Ok(())
        } else {
            Err(Error::UnsupportedConfigParameter {
                parameter: parameter.to_string(),
                daemon: self.role.to_string(),
            })
        }
    }

    /// Address the Control Agent listens on, with wildcard addresses
    /// replaced by the matching loopback so the result can be connected to.
    pub fn get_http_host(&self) -> Result<Option<String>> {
        self.require_control_agent("http-host")?;
        let host: Option<String> = self.get("http-host")?;
        Ok(host.map(|h| match h.trim() {
            "" | "0.0.0.0" => "127.0.0.1".to_string(),
            "::" => "::1".to_string(),
            other => other.to_string(),
        }))
    }

    pub fn get_http_port(&self) -> Result<Option<u16>> {
        self.require_control_agent("http-port")?;
        self.get("http-port")
    }

    pub fn get_authentication(&self) -> Result<Option<Authentication>> {
        self.get("authentication")
    }

    pub fn get_hook_libraries(&self) -> Result<Vec<HookLibrary>> {
        Ok(self.get("hooks-libraries")?.unwrap_or_default())
    }

    /// The first configured hook library whose file name contains
    /// `name`.
    pub fn get_hook_library(&self, name: &str) -> Result<Option<HookLibrary>> {
        Ok(self.get_hook_libraries()?.into_iter().find(|h| {
            Path::new(&h.library)
                .file_name()
                .and_then(|f| f.to_str())
                .is_some_and(|f| f.contains(name))
        }))
    }

    pub fn get_option_definitions(&self) -> Result<Vec<OptionDefinition>> {
        Ok(self.get("option-def")?.unwrap_or_default())
    }

    pub fn get_global_option_data(&self) -> Result<Vec<SingleOptionData>> {
        Ok(self.get("option-data")?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DHCP4: &str = r#"{
        "Dhcp4": {
            "option-def": [
                { "name": "foo", "code": 222, "space": "dhcp4", "type": "record", "record-types": "ipv4-address, uint16" }
            ],
            "option-data": [
                { "name": "domain-name-servers", "code": 6, "data": "192.0.2.1, 192.0.2.2" },
                { "code": 222, "csv-format": false, "data": "C00002010050" }
            ],
            "hooks-libraries": [
                { "library": "/usr/lib/kea/hooks/libdhcp_lease_cmds.so" },
                { "library": "/usr/lib/kea/hooks/libdhcp_host_cmds.so", "parameters": { "x": 1 } }
            ]
        }
    }"#;

    const AGENT: &str = r#"{
        "Control-agent": {
            "http-host": "0.0.0.0",
            "http-port": 8000,
            "authentication": {
                "type": "basic",
                "realm": "kea",
                "clients": [ { "user": "admin", "password": "secret" } ]
            }
        }
    }"#;

    #[test]
    fn detects_role_and_reads_dhcp_parameters() {
        let config = KeaConfig::from_json(DHCP4).unwrap();
        assert_eq!(config.role(), DaemonRole::Dhcp4);
        assert_eq!(config.universe(), Some(Universe::V4));
        assert_eq!(config.get_option_definitions().unwrap().len(), 1);
        let data = config.get_global_option_data().unwrap();
        assert_eq!(data.len(), 2);
        assert!(data[0].csv_format);
        assert!(!data[1].csv_format);
        assert_eq!(config.get_hook_libraries().unwrap().len(), 2);
        let host_cmds = config.get_hook_library("host_cmds").unwrap().unwrap();
        assert!(host_cmds.parameters.is_some());
        assert!(config.get_hook_library("stat_cmds").unwrap().is_none());
        assert!(config.get_authentication().unwrap().is_none());
    }

    #[test]
    fn http_parameters_belong_to_control_agent() {
        let config = KeaConfig::from_json(DHCP4).unwrap();
        assert!(matches!(
            config.get_http_port(),
            Err(Error::UnsupportedConfigParameter { ref daemon, .. }) if daemon == "Dhcp4"
        ));
        assert!(config.get_http_host().is_err());

        let agent = KeaConfig::from_json(AGENT).unwrap();
        assert!(agent.is_control_agent());
        assert_eq!(agent.universe(), None);
        assert_eq!(agent.get_http_host().unwrap().as_deref(), Some("127.0.0.1"));
        assert_eq!(agent.get_http_port().unwrap(), Some(8000));
        let auth = agent.get_authentication().unwrap().unwrap();
        assert!(auth.is_basic_auth());
        assert_eq!(auth.clients[0].user, "admin");
        assert!(agent.get_option_definitions().unwrap().is_empty());
    }

    #[test]
    fn ipv6_wildcard_host_becomes_loopback() {
        let agent = KeaConfig::from_json(r#"{ "Control-agent": { "http-host": "::" } }"#).unwrap();
        assert_eq!(agent.get_http_host().unwrap().as_deref(), Some("::1"));
        assert_eq!(agent.get_http_port().unwrap(), None);
    }

    #[test]
    fn rejects_unknown_documents() {
        assert!(matches!(KeaConfig::from_json("[]"), Err(Error::Conversion(_))));
        assert!(matches!(
            KeaConfig::from_json(r#"{ "Dhcp5": {} }"#),
            Err(Error::Conversion(_))
        ));
        assert!(matches!(KeaConfig::from_json("{"), Err(Error::Json(_))));
        let ddns = KeaConfig::from_json(r#"{ "DhcpDdns": {} }"#).unwrap();
        assert_eq!(ddns.role(), DaemonRole::DhcpDdns);
    }
}
