// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{apply_yaml, get_iface, new_provider, show},
    ErrorKind, Interface, IpVlanMode,
};

const ETH1_UP: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
";

#[test]
fn test_ipvlan_private_and_vepa_conflict() {
    let mut provider = new_provider(ETH1_UP);
    let result = apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: ipvlan0
  type: ipvlan
  state: up
  ipvlan:
    base-iface: eth1
    private: true
    vepa: true
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ipvlan_l3s_mode() {
    let mut provider = new_provider(ETH1_UP);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: ipvlan0
  type: ipvlan
  state: up
  ipvlan:
    base-iface: eth1
    mode: l3s
",
    )
    .unwrap();

    let state = show(&mut provider);
    if let Interface::IpVlan(iface) = get_iface(&state, "ipvlan0") {
        let conf = iface.ipvlan.as_ref().unwrap();
        assert_eq!(conf.mode, Some(IpVlanMode::L3S));
        assert_eq!(conf.base_iface.as_deref(), Some("eth1"));
    } else {
        panic!("Expecting ipvlan interface");
    }
}
