//! Host reservations in the shape Kea expects.

use super::codec::create_single_option_data;
use super::definition::DhcpOptionDefinitionLookup;
use super::option::{DhcpOption, SingleOptionData};
use crate::error::{Error, Result};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::warn;

/// Kind of identifier a host is reserved by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierType {
    HwAddress,
    Duid,
    CircuitId,
    ClientId,
    FlexId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentifier {
    pub kind: IdentifierType,
    pub value: Vec<u8>,
}

/// Host data that is specific to one daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalHost {
    pub daemon_id: i64,
    /// Kea subnet id the host belongs to on this daemon, if known.
    pub subnet_id: Option<i64>,
    pub client_classes: Vec<String>,
    pub options: Vec<DhcpOption>,
}

/// A host reservation as tracked outside of Kea.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Host {
    pub identifiers: Vec<HostIdentifier>,
    /// Reserved addresses and delegated prefixes, e.g. `192.0.2.5` or
    /// `2001:db8:1::/64`.
    pub ip_reservations: Vec<String>,
    pub hostname: String,
    pub local_hosts: Vec<LocalHost>,
}

impl Host {
    pub fn local_host(&self, daemon_id: i64) -> Option<&LocalHost> {
        self.local_hosts.iter().find(|l| l.daemon_id == daemon_id)
    }
}

/// Kea `reservations` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Reservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_data: Vec<SingleOptionData>,
}

/// Reservation sent through the host commands hook, which also names the
/// subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostCmdsReservation {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub subnet_id: i64,
}

enum Reserved {
    V4(String),
    V6(String),
    Prefix(String),
}

fn classify(reservation: &str) -> Option<Reserved> {
    let reservation = reservation.trim();
    if let Ok(ip) = reservation.parse::<IpAddr>() {
        return Some(match ip {
            IpAddr::V4(_) => Reserved::V4(reservation.to_string()),
            IpAddr::V6(_) => Reserved::V6(reservation.to_string()),
        });
    }
    match reservation.parse::<IpNet>().ok()? {
        IpNet::V4(net) if net.prefix_len() == 32 => Some(Reserved::V4(net.addr().to_string())),
        IpNet::V6(net) if net.prefix_len() == 128 => Some(Reserved::V6(net.addr().to_string())),
        IpNet::V6(_) => Some(Reserved::Prefix(reservation.to_string())),
        IpNet::V4(_) => None,
    }
}

/// Converts a host to the reservation a daemon should receive.
pub fn create_reservation(
    daemon_id: i64,
    lookup: &impl DhcpOptionDefinitionLookup,
    host: &Host,
) -> Result<Reservation> {
    let mut reservation = Reservation {
        hostname: host.hostname.clone(),
        ..Reservation::default()
    };
    for identifier in &host.identifiers {
        let value = Some(hex::encode(&identifier.value));
        match identifier.kind {
            IdentifierType::HwAddress => reservation.hw_address = value,
            IdentifierType::Duid => reservation.duid = value,
            IdentifierType::CircuitId => reservation.circuit_id = value,
            IdentifierType::ClientId => reservation.client_id = value,
            IdentifierType::FlexId => reservation.flex_id = value,
        }
    }
    for entry in &host.ip_reservations {
        match classify(entry) {
            Some(Reserved::Prefix(prefix)) => reservation.prefixes.push(prefix),
            Some(Reserved::V6(address)) => reservation.ip_addresses.push(address),
            Some(Reserved::V4(address)) if reservation.ip_address.is_none() => {
                reservation.ip_address = Some(address)
            }
            Some(Reserved::V4(address)) => {
                warn!(%address, "host already has an IPv4 reservation, skipping");
            }
            None => warn!(reservation = %entry, "skipping invalid IP reservation"),
        }
    }
    if let Some(local) = host.local_host(daemon_id) {
        reservation.client_classes = local.client_classes.clone();
        for option in &local.options {
            reservation
                .option_data
                .push(create_single_option_data(daemon_id, lookup, option)?);
        }
    }
    Ok(reservation)
}

/// Like [`create_reservation`], adding the daemon's subnet id.
pub fn create_host_cmds_reservation(
    daemon_id: i64,
    lookup: &impl DhcpOptionDefinitionLookup,
    host: &Host,
) -> Result<HostCmdsReservation> {
    let subnet_id = host
        .local_host(daemon_id)
        .and_then(|l| l.subnet_id)
        .ok_or_else(|| {
            Error::conversion(format!("host has no subnet id for daemon {daemon_id}"))
        })?;
    Ok(HostCmdsReservation {
        reservation: create_reservation(daemon_id, lookup, host)?,
        subnet_id,
    })
}
