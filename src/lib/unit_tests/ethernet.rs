// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    ErrorKind, EthernetConfig, EthernetDuplex, Interface,
};

const ETH1_FIXED_SPEED: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    auto-negotiation: false
    speed: 1000
    duplex: full
";

const ETH1_AUTO_NEG: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    auto-negotiation: true
";

fn eth_conf(iface: &Interface) -> EthernetConfig {
    if let Interface::Ethernet(eth_iface) = iface {
        eth_iface.ethernet.clone().unwrap_or_default()
    } else {
        panic!("{} should be ethernet", iface.name());
    }
}

#[test]
fn test_ethernet_auto_neg_strips_speed_and_duplex() {
    let merged_state = merge_yaml(ETH1_AUTO_NEG, ETH1_FIXED_SPEED).unwrap();
    let conf = eth_conf(for_apply(&merged_state, "eth1"));
    assert_eq!(conf.auto_neg, Some(true));
    assert_eq!(conf.speed, None);
    assert_eq!(conf.duplex, None);
}

#[test]
fn test_ethernet_auto_neg_off_requires_speed_and_duplex() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    auto-negotiation: false
    speed: 100
",
        ETH1_AUTO_NEG,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ethernet_auto_neg_off_inherit_duplex() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    auto-negotiation: false
    speed: 100
",
        ETH1_FIXED_SPEED,
    )
    .unwrap();
    let conf = eth_conf(for_apply(&merged_state, "eth1"));
    assert_eq!(conf.speed, Some(100));
    assert_eq!(conf.duplex, Some(EthernetDuplex::Full));
}

#[test]
fn test_ethernet_auto_neg_ignores_desired_speed_in_verify() {
    let mut provider = new_provider(ETH1_FIXED_SPEED);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    auto-negotiation: true
    speed: 10
    duplex: half
",
    )
    .unwrap();

    let state = show(&mut provider);
    let conf = eth_conf(get_iface(&state, "eth1"));
    assert_eq!(conf.auto_neg, Some(true));
    assert_eq!(conf.speed, None);
    assert_eq!(conf.duplex, None);
}
