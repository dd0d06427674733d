// SPDX-License-Identifier: Apache-2.0

use crate::{
    schema::schema, unit_tests::testlib::get_iface, ErrorKind, Interface,
    InterfaceType, NetworkState,
};

#[test]
fn test_schema_loaded() {
    let sc = schema().unwrap();
    assert!(sc.is_top_level_key("dns-resolver"));
    assert!(!sc.is_top_level_key("dns"));
    assert!(sc.is_known_iface_type("macvlan"));
    assert_eq!(sc.canonical_iface_type("macvtap"), "mac-vtap");
    assert_eq!(sc.canonical_iface_type("bond"), "bond");
}

#[test]
fn test_schema_bond_mode_name() {
    let sc = schema().unwrap();
    assert_eq!(sc.bond_mode_name("1"), Some("active-backup"));
    assert_eq!(sc.bond_mode_name("round-robin"), Some("balance-rr"));
    assert_eq!(sc.bond_mode_name("802.3ad"), Some("802.3ad"));
    assert_eq!(sc.bond_mode_name("7"), None);
    assert_eq!(sc.bond_mode_name("bogus"), None);
}

#[test]
fn test_schema_bond_option_name() {
    let sc = schema().unwrap();
    assert_eq!(
        sc.bond_option_name("xmit_hash_policy", "1"),
        Some("layer3+4")
    );
    assert_eq!(sc.bond_option_name("lacp_rate", "fast"), Some("fast"));
    assert_eq!(sc.bond_option_name("lacp_rate", "2"), None);
    assert_eq!(sc.bond_option_name("miimon", "100"), None);
    assert_eq!(sc.bond_option_index("arp_validate", "filter"), Some(4));
}

#[test]
fn test_unknown_top_level_key() {
    let result = NetworkState::new_from_yaml(
        r"---
interface:
- name: eth1
  type: ethernet
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_iface_type_alias() {
    let state = NetworkState::new_from_yaml(
        r"---
interfaces:
- name: macvlan0
  type: macvlan
  state: up
  mac-vlan:
    base-iface: eth1
    mode: passthru
",
    )
    .unwrap();
    assert_eq!(
        get_iface(&state, "macvlan0").iface_type(),
        InterfaceType::MacVlan
    );
}

#[test]
fn test_deprecated_master_key() {
    let state = NetworkState::new_from_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  master: br0
",
    )
    .unwrap();
    assert_eq!(
        get_iface(&state, "eth1").base_iface().controller.as_deref(),
        Some("br0")
    );
}

#[test]
fn test_bond_mode_alias_and_number() {
    let state = NetworkState::new_from_yaml(
        r"---
interfaces:
- name: bond0
  type: bond
  link-aggregation:
    mode: round-robin
- name: bond1
  type: bond
  link-aggregation:
    mode: 1
",
    )
    .unwrap();
    for (name, mode) in [
        ("bond0", crate::BondMode::RoundRobin),
        ("bond1", crate::BondMode::ActiveBackup),
    ] {
        if let Interface::Bond(bond) = get_iface(&state, name) {
            assert_eq!(bond.bond.as_ref().and_then(|b| b.mode), Some(mode));
        } else {
            panic!("{name} should be bond");
        }
    }
}

#[test]
fn test_unknown_iface_state_rejected() {
    let result = NetworkState::new_from_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: sleeping
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.msg().contains("state 'sleeping'"));
        assert!(e.msg().contains("up, down, absent, ignore"));
    }
}

#[test]
fn test_unknown_iface_type_rejected() {
    let result = NetworkState::new_from_yaml(
        r"---
interfaces:
- name: team0
  type: team
  state: up
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.msg().contains("type 'team'"));
    }
}
