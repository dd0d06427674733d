// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    BondInterface, BondMode, BondOptions, ErrorKind, Interface, InterfaceType,
};

const TWO_ETHS: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
- name: eth2
  type: ethernet
  state: up
";

const BOND99_WITH_TWO_PORTS: &str = r#"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: balance-rr
    port:
    - eth1
    - eth2
    options:
      miimon: "140"
  ipv4:
    enabled: true
    address:
    - ip: 192.168.122.250
      prefix-length: 24
"#;

#[test]
fn test_bond_add_with_two_ports_set_controller_of_ports() {
    let merged_state = merge_yaml(BOND99_WITH_TWO_PORTS, TWO_ETHS).unwrap();

    for port_name in ["eth1", "eth2"] {
        let port = for_apply(&merged_state, port_name);
        assert_eq!(port.base_iface().controller.as_deref(), Some("bond99"));
        assert_eq!(
            port.base_iface().controller_type,
            Some(InterfaceType::Bond)
        );
    }
}

#[test]
fn test_bond_add_with_two_ports_apply_and_verify() {
    let mut provider = new_provider(TWO_ETHS);
    apply_yaml(&mut provider, BOND99_WITH_TWO_PORTS).unwrap();

    let state = show(&mut provider);
    let bond_iface = match get_iface(&state, "bond99") {
        Interface::Bond(i) => i,
        _ => panic!("bond99 should be bond interface"),
    };
    let bond_conf = bond_iface.bond.as_ref().unwrap();
    assert_eq!(bond_conf.mode, Some(BondMode::RoundRobin));
    assert_eq!(
        bond_conf.options.as_ref().and_then(|o| o.miimon),
        Some(140)
    );
    assert_eq!(
        bond_iface.base.ipv4.as_ref().unwrap().addresses.as_ref().unwrap()[0]
            .ip
            .to_string(),
        "192.168.122.250"
    );
    for port_name in ["eth1", "eth2"] {
        assert_eq!(
            get_iface(&state, port_name)
                .base_iface()
                .controller
                .as_deref(),
            Some("bond99")
        );
    }
}

#[test]
fn test_bond_mode_change_discard_current_options() {
    let current = r"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: 802.3ad
    options:
      lacp_rate: fast
";
    let desired = r#"---
interfaces:
- name: bond99
  type: bond
  link-aggregation:
    mode: balance-rr
    options:
      miimon: "140"
"#;
    let merged_state = merge_yaml(desired, current).unwrap();
    let bond_iface = match for_apply(&merged_state, "bond99") {
        Interface::Bond(i) => i,
        _ => panic!("bond99 should be bond interface"),
    };
    let opts = bond_iface.bond.as_ref().unwrap().options.as_ref().unwrap();
    assert_eq!(opts.miimon, Some(140));
    assert_eq!(opts.lacp_rate, None);
    assert!(bond_iface.mode_changed);
}

#[test]
fn test_bond_mode_change_without_options_purge_options() {
    let current = r"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: 802.3ad
    options:
      lacp_rate: fast
      miimon: 100
";
    let desired = r"---
interfaces:
- name: bond99
  type: bond
  link-aggregation:
    mode: active-backup
";
    let merged_state = merge_yaml(desired, current).unwrap();
    let bond_iface = match for_apply(&merged_state, "bond99") {
        Interface::Bond(i) => i,
        _ => panic!("bond99 should be bond interface"),
    };
    assert_eq!(
        bond_iface.bond.as_ref().unwrap().options,
        Some(BondOptions::new())
    );
}

#[test]
fn test_bond_same_mode_merge_options() {
    let current = r"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: 802.3ad
    options:
      lacp_rate: fast
";
    let desired = r"---
interfaces:
- name: bond99
  type: bond
  link-aggregation:
    options:
      miimon: 200
";
    let merged_state = merge_yaml(desired, current).unwrap();
    let bond_iface = match for_apply(&merged_state, "bond99") {
        Interface::Bond(i) => i,
        _ => panic!("bond99 should be bond interface"),
    };
    let opts = bond_iface.bond.as_ref().unwrap().options.as_ref().unwrap();
    assert_eq!(opts.miimon, Some(200));
    assert_eq!(opts.lacp_rate.as_deref(), Some("fast"));
    assert!(!bond_iface.mode_changed);
}

#[test]
fn test_bond_numeric_option_stored_as_name() {
    let iface: BondInterface = serde_yaml::from_str(
        r"---
name: bond99
type: bond
state: up
link-aggregation:
  mode: 4
  options:
    lacp_rate: 1
    fail_over_mac: 2
",
    )
    .unwrap();
    let bond_conf = iface.bond.as_ref().unwrap();
    assert_eq!(bond_conf.mode, Some(BondMode::LACP));
    let opts = bond_conf.options.as_ref().unwrap();
    assert_eq!(opts.lacp_rate.as_deref(), Some("fast"));
    assert_eq!(opts.fail_over_mac.as_deref(), Some("follow"));
}

#[test]
fn test_bond_deprecated_slaves_key() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: balance-rr
    slaves:
    - eth1
",
        TWO_ETHS,
    )
    .unwrap();
    assert_eq!(
        for_apply(&merged_state, "eth1")
            .base_iface()
            .controller
            .as_deref(),
        Some("bond99")
    );
}

#[test]
fn test_bond_fail_over_mac_active_forbid_mac() {
    let result = merge_yaml(
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  mac-address: 00:01:02:03:04:05
  link-aggregation:
    mode: active-backup
    options:
      fail_over_mac: active
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_bond_fail_over_mac_active_inherited_from_current() {
    let result = merge_yaml(
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  mac-address: 00:01:02:03:04:05
",
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: active-backup
    options:
      fail_over_mac: 1
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_bond_port_moved_to_another_bond() {
    let mut provider = new_provider(TWO_ETHS);
    apply_yaml(&mut provider, BOND99_WITH_TWO_PORTS).unwrap();
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: bond98
  type: bond
  state: up
  link-aggregation:
    mode: active-backup
    port:
    - eth2
- name: bond99
  type: bond
  state: up
  link-aggregation:
    port:
    - eth1
",
    )
    .unwrap();
    let state = show(&mut provider);
    assert_eq!(
        get_iface(&state, "eth2").base_iface().controller.as_deref(),
        Some("bond98")
    );
    assert_eq!(
        get_iface(&state, "bond99").ports(),
        Some(vec!["eth1"])
    );
}

#[test]
fn test_bond_overbook_port() {
    let result = merge_yaml(
        r"---
interfaces:
- name: bond98
  type: bond
  state: up
  link-aggregation:
    mode: active-backup
    port:
    - eth1
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: active-backup
    port:
    - eth1
",
        TWO_ETHS,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

const TWO_ETHS_WITH_MAC: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  mac-address: 00:23:45:67:89:1A
  permanent-mac-address: 00:23:45:67:89:1B
- name: eth2
  type: ethernet
  state: up
  mac-address: 00:23:45:67:89:2A
";

#[test]
fn test_bond_copy_mac_from_prefers_permanent_mac() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  copy-mac-from: eth1
  link-aggregation:
    mode: active-backup
    port:
    - eth1
    - eth2
",
        TWO_ETHS_WITH_MAC,
    )
    .unwrap();
    let base = for_apply(&merged_state, "bond99").base_iface();
    assert_eq!(base.mac_address.as_deref(), Some("00:23:45:67:89:1B"));
    assert_eq!(base.copy_mac_from, None);
}

#[test]
fn test_bond_copy_mac_from_apply_and_verify() {
    let mut provider = new_provider(TWO_ETHS_WITH_MAC);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  copy-mac-from: eth2
  link-aggregation:
    mode: active-backup
    port:
    - eth1
    - eth2
",
    )
    .unwrap();

    let state = show(&mut provider);
    let base = get_iface(&state, "bond99").base_iface();
    assert_eq!(base.mac_address.as_deref(), Some("00:23:45:67:89:2A"));
    assert_eq!(base.copy_mac_from, None);
}

#[test]
fn test_bond_copy_mac_from_missing_iface() {
    let result = merge_yaml(
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  copy-mac-from: eth9
  link-aggregation:
    mode: active-backup
    port:
    - eth1
",
        TWO_ETHS_WITH_MAC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}
