//! Conversion between normalized options and Kea `option-data` entries.

use super::definition::{DefinitionType, DhcpOptionDefinitionLookup};
use super::option::{DhcpOption, DhcpOptionField, FieldType, SingleOptionData};
use super::Universe;
use crate::error::Result;

/// Builds the Kea form of `option`. Options the daemon has a definition for
/// are written as CSV, everything else as one hex string.
pub fn create_single_option_data(
    daemon_id: i64,
    lookup: &impl DhcpOptionDefinitionLookup,
    option: &DhcpOption,
) -> Result<SingleOptionData> {
    let csv_format = lookup.definition_exists(daemon_id, option);
    let mut encoded = Vec::with_capacity(option.fields.len());
    for field in &option.fields {
        encoded.push(if csv_format {
            field.to_text()?
        } else {
            field.to_hex()?
        });
    }
    let data = if csv_format {
        encoded.join(",")
    } else {
        encoded.concat()
    };
    Ok(SingleOptionData {
        always_send: option.always_send,
        code: option.code,
        csv_format,
        data,
        name: option.name.clone(),
        space: option.space.clone(),
    })
}

/// Decodes a Kea `option-data` entry into typed fields.
///
/// CSV data is typed by the option definition when one exists and by
/// inference otherwise. Hex data becomes a single binary field.
pub fn create_dhcp_option(
    data: &SingleOptionData,
    universe: Universe,
    lookup: &impl DhcpOptionDefinitionLookup,
) -> Result<DhcpOption> {
    let space = if data.space.is_empty() {
        universe.default_space()
    } else {
        data.space.as_str()
    };
    let definition = lookup.find(None, data.code, space, universe);
    let encapsulate = match definition {
        Some(def) => def.encapsulate.clone(),
        None if space == Universe::V4.default_space() || space == Universe::V6.default_space() => {
            format!("option-{}", data.code)
        }
        None => format!("{space}.{}", data.code),
    };
    let mut option = DhcpOption {
        always_send: data.always_send,
        code: data.code,
        name: data.name.clone(),
        space: space.to_string(),
        universe,
        encapsulate,
        fields: Vec::new(),
    };

    let payload = data.data.trim();
    if payload.is_empty() || definition.is_some_and(|d| d.def_type == DefinitionType::Empty) {
        return Ok(option);
    }

    if !data.csv_format {
        let hex: String = payload
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        option.fields.push(DhcpOptionField::new(
            FieldType::Binary,
            [hex.to_ascii_uppercase()],
        ));
        return Ok(option);
    }

    for (index, token) in payload.split(',').map(str::trim).enumerate() {
        let field = match definition {
            Some(def) => match def.field_type_at(index) {
                Some(field_type) => DhcpOptionField::parse(field_type, token)?,
                None => break,
            },
            None => DhcpOptionField::infer(token),
        };
        option.fields.push(field);
    }
    Ok(option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kea::definition::{DefinitionStore, OptionDefinition};
    use crate::kea::option::OptionFieldValue;
    use crate::Error;

    /// Claims every option is defined without knowing any definition, so
    /// encoding uses CSV while decoding infers field types.
    struct AlwaysDefined;

    impl DhcpOptionDefinitionLookup for AlwaysDefined {
        fn find(&self, _: Option<i64>, _: u16, _: &str, _: Universe) -> Option<&OptionDefinition> {
            None
        }

        fn definition_exists(&self, _: i64, _: &DhcpOption) -> bool {
            true
        }
    }

    fn option_data(code: u16, csv_format: bool, data: &str) -> SingleOptionData {
        SingleOptionData {
            code,
            csv_format,
            data: data.to_string(),
            ..SingleOptionData::default()
        }
    }

    #[test]
    fn csv_round_trip_with_inferred_types() {
        let original = "192.0.2.1, xyz, true, 1020, 3000::/64, 90/2, foobar.example.com., 2001:db8:1::12, -5";
        let option = create_dhcp_option(&option_data(244, true, original), Universe::V4, &AlwaysDefined).unwrap();
        let types: Vec<FieldType> = option.fields.iter().map(|f| f.field_type).collect();
        assert_eq!(
            types,
            vec![
                FieldType::Ipv4Address,
                FieldType::String,
                FieldType::Bool,
                FieldType::Uint32,
                FieldType::Ipv6Prefix,
                FieldType::Psid,
                FieldType::Fqdn,
                FieldType::Ipv6Address,
                FieldType::String,
            ]
        );
        let data = create_single_option_data(1, &AlwaysDefined, &option).unwrap();
        assert!(data.csv_format);
        assert_eq!(data.data, original.replace(' ', ""));
        assert_eq!(data.code, 244);
        assert_eq!(data.space, "dhcp4");
    }

    #[test]
    fn undefined_option_is_written_as_hex() {
        let option = DhcpOption {
            code: 250,
            space: "dhcp4".into(),
            fields: vec![
                DhcpOptionField::new(FieldType::Uint16, [1550i64]),
                DhcpOptionField::new(FieldType::Ipv4Address, ["192.0.2.1"]),
            ],
            ..DhcpOption::default()
        };
        let data = create_single_option_data(1, &DefinitionStore::new(), &option).unwrap();
        assert!(!data.csv_format);
        assert_eq!(data.data, "060EC0000201");
    }

    #[test]
    fn conversion_errors_propagate() {
        let option = DhcpOption {
            code: 250,
            space: "dhcp4".into(),
            fields: vec![DhcpOptionField::new(FieldType::Uint8, [256i64])],
            ..DhcpOption::default()
        };
        assert!(matches!(
            create_single_option_data(1, &DefinitionStore::new(), &option),
            Err(Error::Conversion(_))
        ));
        let bad = option_data(222, true, "192.0.2.1, 70000");
        let mut store = DefinitionStore::new();
        store.add_shared_definitions([record_definition(false)]);
        assert!(matches!(
            create_dhcp_option(&bad, Universe::V4, &store),
            Err(Error::Conversion(_))
        ));
    }

    fn record_definition(array: bool) -> OptionDefinition {
        OptionDefinition {
            code: 222,
            name: "custom".into(),
            space: "dhcp4".into(),
            encapsulate: "custom-space".into(),
            def_type: DefinitionType::Record,
            record_types: vec![FieldType::Ipv4Address, FieldType::Uint16],
            array,
        }
    }

    #[test]
    fn record_definition_types_fields() {
        let mut store = DefinitionStore::new();
        store.add_shared_definitions([record_definition(false)]);
        let option = create_dhcp_option(
            &option_data(222, true, "192.0.2.1, 80, 10.0.0.1"),
            Universe::V4,
            &store,
        )
        .unwrap();
        assert_eq!(option.encapsulate, "custom-space");
        assert_eq!(option.fields.len(), 2);
        assert_eq!(option.fields[1].values, vec![OptionFieldValue::Int(80)]);

        let data = create_single_option_data(3, &store, &option).unwrap();
        assert!(data.csv_format);
        assert_eq!(data.data, "192.0.2.1,80");

        let mut arrays = DefinitionStore::new();
        arrays.add_shared_definitions([record_definition(true)]);
        let option = create_dhcp_option(
            &option_data(222, true, "192.0.2.1, 80, 10.0.0.1, 81"),
            Universe::V4,
            &arrays,
        )
        .unwrap();
        assert_eq!(option.fields.len(), 4);
        assert_eq!(option.fields[2].field_type, FieldType::Ipv4Address);
    }

    #[test]
    fn standard_definitions_drive_decoding() {
        let store = DefinitionStore::new();
        let data = SingleOptionData {
            name: "domain-name-servers".into(),
            ..option_data(6, true, "192.0.2.1, 192.0.2.2")
        };
        let option = create_dhcp_option(&data, Universe::V4, &store).unwrap();
        assert_eq!(option.fields.len(), 2);
        assert!(option.fields.iter().all(|f| f.field_type == FieldType::Ipv4Address));
        assert_eq!(option.encapsulate, "");

        let container = option_data(94, true, "ignored");
        let option = create_dhcp_option(
            &SingleOptionData {
                space: "dhcp6".into(),
                ..container
            },
            Universe::V6,
            &store,
        )
        .unwrap();
        assert!(option.fields.is_empty());
        assert_eq!(option.encapsulate, "s46-cont-mape-options");
    }

    #[test]
    fn encapsulate_is_synthesized() {
        let store = DefinitionStore::new();
        let option = create_dhcp_option(&option_data(250, true, ""), Universe::V4, &store).unwrap();
        assert_eq!(option.encapsulate, "option-250");
        assert_eq!(option.space, "dhcp4");
        assert!(option.fields.is_empty());

        let data = SingleOptionData {
            space: "vendor-4491".into(),
            ..option_data(2, true, "  ")
        };
        let option = create_dhcp_option(&data, Universe::V4, &store).unwrap();
        assert_eq!(option.encapsulate, "vendor-4491.2");

        let option = create_dhcp_option(&option_data(250, true, ""), Universe::V6, &store).unwrap();
        assert_eq!(option.encapsulate, "option-250");
        assert_eq!(option.space, "dhcp6");
    }

    #[test]
    fn hex_data_becomes_one_binary_field() {
        let option = create_dhcp_option(
            &option_data(250, false, " 0a:0b 0c:FF "),
            Universe::V4,
            &DefinitionStore::new(),
        )
        .unwrap();
        assert_eq!(
            option.fields,
            vec![DhcpOptionField::new(FieldType::Binary, ["0A0B0CFF"])]
        );
        let data = create_single_option_data(1, &DefinitionStore::new(), &option).unwrap();
        assert_eq!(data.data, "0A0B0CFF");
    }
}
