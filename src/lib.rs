//! Parsing, formatting and querying of DHCP and DNS server configurations:
//! BIND 9 `named.conf` files and Kea DHCP option data.

pub mod bind9;
pub mod config;
pub mod error;
pub mod kea;

pub use error::{Error, ParseError, Result};
