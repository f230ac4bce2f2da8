//! Kea DHCP support: the option-field codec, option definitions and the
//! conversions that feed host reservations.

pub mod codec;
pub mod config;
pub mod definition;
pub mod field;
pub mod option;
pub mod reservation;
pub mod stddefs;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use codec::{create_dhcp_option, create_single_option_data};
pub use config::KeaConfig;
pub use definition::{DefinitionStore, DhcpOptionDefinitionLookup, OptionDefinition};
pub use option::{DhcpOption, DhcpOptionField, FieldType, OptionFieldValue, SingleOptionData};

/// DHCP protocol family an option belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Universe {
    #[default]
    V4,
    V6,
}

impl Universe {
    /// Top-level option space of the family.
    pub fn default_space(self) -> &'static str {
        match self {
            Universe::V4 => "dhcp4",
            Universe::V6 => "dhcp6",
        }
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Universe::V4 => "v4",
            Universe::V6 => "v6",
        })
    }
}

impl std::str::FromStr for Universe {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v4" | "4" | "dhcp4" => Ok(Universe::V4),
            "v6" | "6" | "dhcp6" => Ok(Universe::V6),
            other => Err(crate::Error::conversion(format!("unknown universe {other:?}"))),
        }
    }
}
