// SPDX-License-Identifier: Apache-2.0

use std::convert::TryFrom;

use crate::{
    unit_tests::testlib::{apply_yaml, merge_yaml, new_provider, show},
    ErrorKind, OvnConfiguration,
};

fn localnets(ovn: &OvnConfiguration) -> Vec<(String, String)> {
    ovn.bridge_mappings
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|m| {
            (m.localnet.clone(), m.bridge.clone().unwrap_or_default())
        })
        .collect()
}

#[test]
fn test_ovn_duplicate_localnet() {
    let result = merge_yaml(
        r"---
ovn:
  bridge-mappings:
  - localnet: blue
    bridge: br1
  - localnet: blue
    bridge: br2
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovn_mapping_without_bridge() {
    let result = merge_yaml(
        r"---
ovn:
  bridge-mappings:
  - localnet: blue
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovn_mapping_reserved_in_ovsdb_section() {
    let result = merge_yaml(
        r"---
ovs-db:
  external_ids:
    ovn-bridge-mappings: blue:br1
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovn_parse_external_id_value() {
    let ovn = OvnConfiguration::try_from("red:br2,blue:br1").unwrap();
    assert_eq!(
        localnets(&ovn),
        vec![
            ("blue".to_string(), "br1".to_string()),
            ("red".to_string(), "br2".to_string()),
        ]
    );
    assert!(OvnConfiguration::try_from("blue").is_err());
    assert!(OvnConfiguration::try_from("blue:br1:br2").is_err());
    assert!(OvnConfiguration::try_from("").unwrap().is_none());
}

#[test]
fn test_ovn_mapping_partial_edit() {
    let mut provider = new_provider(
        r"---
ovs-db:
  external_ids:
    hostname: host-a
",
    );
    apply_yaml(
        &mut provider,
        r"---
ovn:
  bridge-mappings:
  - localnet: blue
    bridge: br1
  - localnet: red
    bridge: br2
",
    )
    .unwrap();
    apply_yaml(
        &mut provider,
        r"---
ovn:
  bridge-mappings:
  - localnet: red
    state: absent
  - localnet: green
    bridge: br3
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert_eq!(
        localnets(&state.ovn),
        vec![
            ("blue".to_string(), "br1".to_string()),
            ("green".to_string(), "br3".to_string()),
        ]
    );
    let external_ids = state
        .ovsdb
        .as_ref()
        .and_then(|o| o.external_ids.as_ref())
        .unwrap();
    assert_eq!(
        external_ids.get("ovn-bridge-mappings"),
        Some(&Some("blue:br1,green:br3".to_string()))
    );
    assert_eq!(external_ids.get("hostname"), Some(&Some("host-a".to_string())));
}
