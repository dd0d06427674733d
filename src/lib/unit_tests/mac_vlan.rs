// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, get_iface, merge_yaml, new_provider, show,
    },
    ErrorKind, Interface, MacVlanMode,
};

const ETH1_UP: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
";

#[test]
fn test_mac_vlan_disable_promiscuous_requires_passthru() {
    let result = merge_yaml(
        r"---
interfaces:
- name: mac0
  type: mac-vlan
  state: up
  mac-vlan:
    base-iface: eth1
    mode: vepa
    promiscuous: false
",
        ETH1_UP,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.msg().contains("mode vepa"));
    }
}

#[test]
fn test_mac_vtap_disable_promiscuous_requires_passthru() {
    let result = merge_yaml(
        r"---
interfaces:
- name: tap0
  type: mac-vtap
  state: up
  mac-vtap:
    base-iface: eth1
    mode: bridge
    accept-all-mac: false
",
        ETH1_UP,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_mac_vtap_passthru_without_promiscuous() {
    let mut provider = new_provider(ETH1_UP);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: tap0
  type: mac-vtap
  state: up
  mac-vtap:
    base-iface: eth1
    mode: passthru
    accept-all-mac: false
",
    )
    .unwrap();

    let state = show(&mut provider);
    if let Interface::MacVtap(iface) = get_iface(&state, "tap0") {
        let conf = iface.mac_vtap.as_ref().unwrap();
        assert_eq!(conf.mode, MacVlanMode::Passthru);
        assert_eq!(conf.accept_all_mac, Some(false));
        assert_eq!(conf.base_iface, "eth1");
    } else {
        panic!("Expecting mac-vtap interface");
    }
}
