//! Per-type encoding of option fields.
//!
//! Every field has a textual form, used when `csv-format` is on, and a hex
//! form, used otherwise. Hex output is always uppercase with no separators.

use super::option::{DhcpOptionField, FieldType, OptionFieldValue};
use crate::error::{Error, Result};
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const MAX_LABEL_LEN: usize = 63;
const MAX_FQDN_WIRE_LEN: usize = 255;

impl DhcpOptionField {
    /// The value as written in a CSV `data` string.
    pub fn to_text(&self) -> Result<String> {
        match self.field_type {
            FieldType::Binary => sanitize_hex(self.str_value()?),
            FieldType::String => Ok(self.non_empty_str()?.to_string()),
            FieldType::Bool => Ok(self.bool_value()?.to_string()),
            t @ (FieldType::Uint8
            | FieldType::Uint16
            | FieldType::Uint32
            | FieldType::Int8
            | FieldType::Int16
            | FieldType::Int32) => Ok(checked_int(t, self.int_value()?)?.to_string()),
            FieldType::Ipv4Address => {
                let s = self.str_value()?;
                parse_ipv4(s)?;
                Ok(s.trim().to_string())
            }
            FieldType::Ipv6Address => {
                let s = self.str_value()?;
                parse_ipv6(s)?;
                Ok(s.trim().to_string())
            }
            FieldType::Ipv6Prefix => {
                let (prefix, len) = self.prefix_values()?;
                Ok(format!("{prefix}/{len}"))
            }
            FieldType::Psid => {
                let (psid, len) = self.psid_values()?;
                Ok(format!("{psid}/{len}"))
            }
            FieldType::Fqdn => {
                let s = self.str_value()?;
                fqdn_labels(s)?;
                Ok(s.to_string())
            }
        }
    }

    /// The value as uppercase hex of its wire bytes.
    pub fn to_hex(&self) -> Result<String> {
        match self.field_type {
            FieldType::Binary => sanitize_hex(self.str_value()?),
            FieldType::String => Ok(hex::encode_upper(self.non_empty_str()?)),
            FieldType::Bool => Ok(if self.bool_value()? { "01" } else { "00" }.to_string()),
            t @ (FieldType::Uint8 | FieldType::Int8) => int_hex(t, self.int_value()?, 2),
            t @ (FieldType::Uint16 | FieldType::Int16) => int_hex(t, self.int_value()?, 4),
            t @ (FieldType::Uint32 | FieldType::Int32) => int_hex(t, self.int_value()?, 8),
            FieldType::Ipv4Address => Ok(hex::encode_upper(parse_ipv4(self.str_value()?)?.octets())),
            FieldType::Ipv6Address => Ok(hex::encode_upper(parse_ipv6(self.str_value()?)?.octets())),
            FieldType::Ipv6Prefix => {
                let (prefix, len) = self.prefix_values()?;
                let address = match prefix {
                    IpAddr::V4(v4) => hex::encode_upper(v4.octets()),
                    IpAddr::V6(v6) => hex::encode_upper(v6.octets()),
                };
                Ok(format!("{address}{len:02X}"))
            }
            FieldType::Psid => {
                let (psid, len) = self.psid_values()?;
                Ok(format!("{psid:04X}{len:02X}"))
            }
            FieldType::Fqdn => {
                let (labels, absolute) = fqdn_labels(self.str_value()?)?;
                let mut out = String::new();
                for label in labels {
                    out.push_str(&format!("{:02X}", label.len()));
                    out.push_str(&hex::encode_upper(label));
                }
                if absolute {
                    out.push_str("00");
                }
                Ok(out)
            }
        }
    }

    /// Parses one CSV token as a field of the given type.
    pub fn parse(field_type: FieldType, token: &str) -> Result<Self> {
        let token = token.trim();
        let field = match field_type {
            FieldType::Binary => Self::new(field_type, [sanitize_hex(token)?]),
            FieldType::String => {
                if token.is_empty() {
                    return Err(Error::conversion("string option field must not be empty"));
                }
                Self::new(field_type, [token])
            }
            FieldType::Bool => match parse_bool(token) {
                Some(v) => Self::new(field_type, [v]),
                None => {
                    return Err(Error::conversion(format!("invalid bool option field {token:?}")))
                }
            },
            FieldType::Uint8
            | FieldType::Uint16
            | FieldType::Uint32
            | FieldType::Int8
            | FieldType::Int16
            | FieldType::Int32 => {
                let value = token.parse::<i64>().map_err(|_| {
                    Error::conversion(format!("invalid {field_type} option field {token:?}"))
                })?;
                Self::new(field_type, [checked_int(field_type, value)?])
            }
            FieldType::Ipv4Address => {
                parse_ipv4(token)?;
                Self::new(field_type, [token])
            }
            FieldType::Ipv6Address => {
                parse_ipv6(token)?;
                Self::new(field_type, [token])
            }
            FieldType::Ipv6Prefix => {
                let (prefix, len) = split_prefix(token)?;
                let field = Self {
                    field_type,
                    values: vec![OptionFieldValue::Str(prefix.to_string()), OptionFieldValue::Int(len)],
                };
                field.prefix_values()?;
                field
            }
            FieldType::Psid => {
                let (psid, len) = split_psid(token)?;
                let field = Self {
                    field_type,
                    values: vec![OptionFieldValue::Int(psid), OptionFieldValue::Int(len)],
                };
                field.psid_values()?;
                field
            }
            FieldType::Fqdn => {
                fqdn_labels(token)?;
                Self::new(field_type, [token])
            }
        };
        Ok(field)
    }

    /// Picks a field type for a token when no definition is known.
    ///
    /// Candidates are tried in order: bool, uint32, IP address, prefix,
    /// absolute FQDN, PSID and finally string. Smaller integer types are
    /// never inferred and a partial FQDN stays a string.
    pub fn infer(token: &str) -> Self {
        let token = token.trim();
        if let Some(v) = parse_bool(token) {
            return Self::new(FieldType::Bool, [v]);
        }
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(v) = token.parse::<u32>() {
                return Self::new(FieldType::Uint32, [i64::from(v)]);
            }
        }
        match token.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => return Self::new(FieldType::Ipv4Address, [token]),
            Ok(IpAddr::V6(_)) => return Self::new(FieldType::Ipv6Address, [token]),
            Err(_) => {}
        }
        if let Ok(field) = Self::parse(FieldType::Ipv6Prefix, token) {
            return field;
        }
        if token.ends_with('.') && token.len() > 1 && fqdn_labels(token).is_ok() {
            return Self::new(FieldType::Fqdn, [token]);
        }
        if let Ok(field) = Self::parse(FieldType::Psid, token) {
            return field;
        }
        Self::new(FieldType::String, [token])
    }

    fn single(&self) -> Result<&OptionFieldValue> {
        match self.values.as_slice() {
            [v] => Ok(v),
            values => Err(Error::conversion(format!(
                "{} option field requires 1 value, got {}",
                self.field_type,
                values.len()
            ))),
        }
    }

    fn pair(&self) -> Result<(&OptionFieldValue, &OptionFieldValue)> {
        match self.values.as_slice() {
            [a, b] => Ok((a, b)),
            values => Err(Error::conversion(format!(
                "{} option field requires 2 values, got {}",
                self.field_type,
                values.len()
            ))),
        }
    }

    fn str_value(&self) -> Result<&str> {
        expect_str(self.field_type, self.single()?)
    }

    fn non_empty_str(&self) -> Result<&str> {
        let s = self.str_value()?;
        if s.is_empty() {
            return Err(Error::conversion(format!("{} option field must not be empty", self.field_type)));
        }
        Ok(s)
    }

    fn int_value(&self) -> Result<i64> {
        expect_int(self.field_type, self.single()?)
    }

    fn bool_value(&self) -> Result<bool> {
        match self.single()? {
            OptionFieldValue::Bool(v) => Ok(*v),
            other => Err(kind_error(self.field_type, "a bool", other)),
        }
    }

    fn prefix_values(&self) -> Result<(IpAddr, i64)> {
        let (prefix, len) = self.pair()?;
        let prefix_str = expect_str(self.field_type, prefix)?;
        let prefix = prefix_str
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| Error::conversion(format!("invalid prefix address {prefix_str:?}")))?;
        let len = expect_int(self.field_type, len)?;
        let max = if prefix.is_ipv4() { 32 } else { 128 };
        if len <= 0 || len > max {
            return Err(Error::conversion(format!(
                "prefix length {len} out of range (0, {max}]"
            )));
        }
        Ok((prefix, len))
    }

    fn psid_values(&self) -> Result<(i64, i64)> {
        let (psid, len) = self.pair()?;
        let psid = expect_int(self.field_type, psid)?;
        let len = expect_int(self.field_type, len)?;
        if psid <= 0 || psid > i64::from(u16::MAX) {
            return Err(Error::conversion(format!("PSID {psid} out of range (0, 65535]")));
        }
        if len <= 0 || len > i64::from(u8::MAX) {
            return Err(Error::conversion(format!("PSID length {len} out of range (0, 255]")));
        }
        Ok((psid, len))
    }
}

fn expect_str(field_type: FieldType, value: &OptionFieldValue) -> Result<&str> {
    match value {
        OptionFieldValue::Str(s) => Ok(s),
        other => Err(kind_error(field_type, "a string", other)),
    }
}

fn expect_int(field_type: FieldType, value: &OptionFieldValue) -> Result<i64> {
    match value {
        OptionFieldValue::Int(v) => Ok(*v),
        other => Err(kind_error(field_type, "an integer", other)),
    }
}

fn kind_error(field_type: FieldType, expected: &str, found: &OptionFieldValue) -> Error {
    Error::conversion(format!(
        "{field_type} option field expects {expected}, got {found:?}"
    ))
}

fn parse_bool(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn int_bounds(field_type: FieldType) -> (i64, i64) {
    match field_type {
        FieldType::Uint8 => (0, i64::from(u8::MAX)),
        FieldType::Uint16 => (0, i64::from(u16::MAX)),
        FieldType::Uint32 => (0, i64::from(u32::MAX)),
        FieldType::Int8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
        FieldType::Int16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
        _ => (i64::from(i32::MIN), i64::from(i32::MAX)),
    }
}

fn checked_int(field_type: FieldType, value: i64) -> Result<i64> {
    let (min, max) = int_bounds(field_type);
    if value < min || value > max {
        return Err(Error::conversion(format!(
            "{field_type} value {value} out of range [{min}, {max}]"
        )));
    }
    Ok(value)
}

/// Two's complement of `value` truncated to `digits` hex digits.
fn int_hex(field_type: FieldType, value: i64, digits: usize) -> Result<String> {
    let value = checked_int(field_type, value)?;
    let mask = (1u64 << (digits * 4)) - 1;
    Ok(format!("{:0digits$X}", (value as u64) & mask))
}

/// Strips spaces and colons, validates the digits and uppercases them.
fn sanitize_hex(value: &str) -> Result<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect::<String>()
        .to_ascii_uppercase();
    hex::decode(&cleaned)
        .map_err(|e| Error::conversion(format!("invalid hex data {value:?}: {e}")))?;
    Ok(cleaned)
}

fn parse_ipv4(s: &str) -> Result<Ipv4Addr> {
    s.trim()
        .parse()
        .map_err(|_| Error::conversion(format!("invalid IPv4 address {s:?}")))
}

fn parse_ipv6(s: &str) -> Result<Ipv6Addr> {
    s.trim()
        .parse()
        .map_err(|_| Error::conversion(format!("invalid IPv6 address {s:?}")))
}

fn split_prefix(token: &str) -> Result<(&str, i64)> {
    let net: IpNet = token
        .parse()
        .map_err(|_| Error::conversion(format!("invalid prefix {token:?}")))?;
    let (address, _) = token
        .split_once('/')
        .ok_or_else(|| Error::conversion(format!("invalid prefix {token:?}")))?;
    Ok((address, i64::from(net.prefix_len())))
}

fn split_psid(token: &str) -> Result<(i64, i64)> {
    let invalid = || Error::conversion(format!("invalid PSID {token:?}"));
    let (psid, len) = token.split_once('/').ok_or_else(invalid)?;
    let psid = psid.trim().parse::<u16>().map_err(|_| invalid())?;
    let len = len.trim().parse::<u8>().map_err(|_| invalid())?;
    Ok((i64::from(psid), i64::from(len)))
}

/// Splits a domain name into labels. The flag reports a trailing dot.
fn fqdn_labels(name: &str) -> Result<(Vec<&str>, bool)> {
    let invalid = |why: &str| Error::conversion(format!("invalid FQDN {name:?}: {why}"));
    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    let (body, absolute) = match name.strip_suffix('.') {
        Some(body) => (body, true),
        None => (name, false),
    };
    let labels: Vec<&str> = if body.is_empty() {
        Vec::new()
    } else {
        body.split('.').collect()
    };
    let mut wire_len = 1;
    for label in &labels {
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid("label longer than 63 octets"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(invalid("unexpected character"));
        }
        wire_len += label.len() + 1;
    }
    if labels.is_empty() && !absolute {
        return Err(invalid("no labels"));
    }
    if wire_len > MAX_FQDN_WIRE_LEN {
        return Err(invalid("longer than 255 octets"));
    }
    Ok((labels, absolute))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(t: FieldType, v: i64) -> DhcpOptionField {
        DhcpOptionField::new(t, [v])
    }

    fn text(t: FieldType, v: &str) -> DhcpOptionField {
        DhcpOptionField::new(t, [v])
    }

    #[test]
    fn uint16_hex() {
        assert_eq!(int(FieldType::Uint16, 1550).to_hex().unwrap(), "060E");
    }

    #[test]
    fn integer_boundaries() {
        let cases: [(FieldType, i64, i64, &str); 6] = [
            (FieldType::Uint8, 0, 255, "FF"),
            (FieldType::Uint16, 0, 65535, "FFFF"),
            (FieldType::Uint32, 0, 4294967295, "FFFFFFFF"),
            (FieldType::Int8, -128, 127, "7F"),
            (FieldType::Int16, -32768, 32767, "7FFF"),
            (FieldType::Int32, -2147483648, 2147483647, "7FFFFFFF"),
        ];
        for (t, min, max, max_hex) in cases {
            assert!(int(t, min).to_hex().is_ok());
            assert_eq!(int(t, max).to_hex().unwrap(), max_hex);
            assert!(matches!(int(t, max + 1).to_hex(), Err(Error::Conversion(_))));
            assert!(matches!(int(t, min - 1).to_text(), Err(Error::Conversion(_))));
            assert!(DhcpOptionField::parse(t, &(max + 1).to_string()).is_err());
        }
    }

    #[test]
    fn negative_integers_are_twos_complement() {
        assert_eq!(int(FieldType::Int8, -1).to_hex().unwrap(), "FF");
        assert_eq!(int(FieldType::Int16, -2).to_hex().unwrap(), "FFFE");
        assert_eq!(int(FieldType::Int32, -5).to_hex().unwrap(), "FFFFFFFB");
        assert_eq!(int(FieldType::Int32, -5).to_text().unwrap(), "-5");
    }

    #[test]
    fn address_encodings() {
        assert_eq!(
            text(FieldType::Ipv4Address, "192.0.2.1").to_hex().unwrap(),
            "C0000201"
        );
        assert_eq!(
            text(FieldType::Ipv6Address, "2001:db8::1").to_hex().unwrap(),
            "20010DB8000000000000000000000001"
        );
        assert!(text(FieldType::Ipv6Address, "2001:db8::/64").to_hex().is_err());
        assert!(text(FieldType::Ipv4Address, "192.0.2").to_text().is_err());
    }

    #[test]
    fn prefix_lengths() {
        let prefix = |len: i64| DhcpOptionField {
            field_type: FieldType::Ipv6Prefix,
            values: vec![OptionFieldValue::Str("3000::".into()), OptionFieldValue::Int(len)],
        };
        assert!(prefix(0).to_hex().is_err());
        assert!(prefix(129).to_hex().is_err());
        assert_eq!(prefix(1).to_text().unwrap(), "3000::/1");
        assert_eq!(
            prefix(128).to_hex().unwrap(),
            "3000000000000000000000000000000080"
        );
        assert!(DhcpOptionField::parse(FieldType::Ipv6Prefix, "3000::/0").is_err());
        assert!(DhcpOptionField::parse(FieldType::Ipv6Prefix, "3000::/129").is_err());
    }

    #[test]
    fn ipv4_prefix_hex_is_ten_digits() {
        let f = DhcpOptionField::parse(FieldType::Ipv6Prefix, "10.0.0.0/8").unwrap();
        let hex = f.to_hex().unwrap();
        assert_eq!(hex, "0A00000008");
        assert_eq!(hex.len(), 10);
        assert!(DhcpOptionField::parse(FieldType::Ipv6Prefix, "10.0.0.0/33").is_err());
    }

    #[test]
    fn psid_encoding() {
        let f = DhcpOptionField::parse(FieldType::Psid, "90/2").unwrap();
        assert_eq!(f.values, vec![OptionFieldValue::Int(90), OptionFieldValue::Int(2)]);
        assert_eq!(f.to_text().unwrap(), "90/2");
        assert_eq!(f.to_hex().unwrap(), "005A02");
        assert!(DhcpOptionField::parse(FieldType::Psid, "0/2").is_err());
        assert!(DhcpOptionField::parse(FieldType::Psid, "1/0").is_err());
        assert!(DhcpOptionField::parse(FieldType::Psid, "65536/1").is_err());
    }

    #[test]
    fn fqdn_encoding() {
        let absolute = text(FieldType::Fqdn, "foo.example.com.");
        assert_eq!(
            absolute.to_hex().unwrap(),
            "03666F6F076578616D706C6503636F6D00"
        );
        let partial = text(FieldType::Fqdn, "foo.example");
        assert_eq!(partial.to_hex().unwrap(), "03666F6F076578616D706C65");
        assert!(text(FieldType::Fqdn, "foo..com.").to_hex().is_err());
        let long = format!("{}.com.", "a".repeat(64));
        assert!(text(FieldType::Fqdn, long.as_str()).to_hex().is_err());
    }

    #[test]
    fn binary_and_string() {
        let binary = text(FieldType::Binary, "0a:0b 0c");
        assert_eq!(binary.to_hex().unwrap(), "0A0B0C");
        assert_eq!(binary.to_text().unwrap(), "0A0B0C");
        assert!(text(FieldType::Binary, "xyz").to_hex().is_err());
        assert_eq!(text(FieldType::String, "ab").to_hex().unwrap(), "6162");
        assert!(text(FieldType::String, "").to_text().is_err());
        assert_eq!(DhcpOptionField::new(FieldType::Bool, [true]).to_hex().unwrap(), "01");
    }

    #[test]
    fn arity_and_kind_are_checked() {
        assert!(DhcpOptionField::new(FieldType::Uint8, [1i64, 2]).to_hex().is_err());
        assert!(DhcpOptionField::new(FieldType::Uint8, Vec::<i64>::new()).to_text().is_err());
        assert!(text(FieldType::Uint8, "1").to_hex().is_err());
        assert!(int(FieldType::Bool, 1).to_text().is_err());
        assert!(int(FieldType::Psid, 1).to_text().is_err());
    }

    #[test]
    fn inference_order() {
        let inferred = |token: &str| DhcpOptionField::infer(token).field_type;
        assert_eq!(inferred("TRUE"), FieldType::Bool);
        assert_eq!(inferred("1020"), FieldType::Uint32);
        assert_eq!(inferred("4294967296"), FieldType::String);
        assert_eq!(inferred("-5"), FieldType::String);
        assert_eq!(inferred("192.0.2.1"), FieldType::Ipv4Address);
        assert_eq!(inferred("2001:db8:1::12"), FieldType::Ipv6Address);
        assert_eq!(inferred("3000::/64"), FieldType::Ipv6Prefix);
        assert_eq!(inferred("foobar.example.com."), FieldType::Fqdn);
        assert_eq!(inferred("foobar.example.com"), FieldType::String);
        assert_eq!(inferred("90/2"), FieldType::Psid);
        assert_eq!(inferred("xyz"), FieldType::String);
    }

    #[test]
    fn hex_is_uppercase_even_length() {
        let fields = [
            DhcpOptionField::infer("foobar.example.com."),
            DhcpOptionField::infer("xyz"),
            DhcpOptionField::infer("3000::/64"),
            DhcpOptionField::infer("90/2"),
            int(FieldType::Int16, -300),
        ];
        for f in fields {
            let hex = f.to_hex().unwrap();
            assert_eq!(hex.len() % 2, 0);
            assert!(hex.chars().all(|c| matches!(c, '0'..='9' | 'A'..='F')));
        }
    }

    #[test]
    fn text_round_trip_with_known_types() {
        let cases = [
            (FieldType::Uint8, "7"),
            (FieldType::Int16, "-300"),
            (FieldType::Ipv6Prefix, "2001:db8::/48"),
            (FieldType::Psid, "4/8"),
            (FieldType::Fqdn, "a.example."),
            (FieldType::Bool, "false"),
        ];
        for (t, text) in cases {
            let parsed = DhcpOptionField::parse(t, text).unwrap();
            assert_eq!(parsed.to_text().unwrap(), text);
            assert_eq!(DhcpOptionField::parse(t, &parsed.to_text().unwrap()).unwrap(), parsed);
        }
    }
}
