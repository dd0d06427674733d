// SPDX-License-Identifier: Apache-2.0

use crate::{unit_tests::testlib::get_iface, InterfaceState, NetworkState};

const CURRENT: &str = r"---
hostname:
  running: host-a.example.org
  config: host-a.example.org
dns-resolver:
  config:
    server:
    - 192.0.2.250
interfaces:
- name: eth1
  type: ethernet
  state: up
  mtu: 1500
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
- name: eth2
  type: ethernet
  state: up
  mtu: 1500
";

fn gen_diff(desired_yaml: &str) -> NetworkState {
    let desired: NetworkState = serde_yaml::from_str(desired_yaml).unwrap();
    let current: NetworkState = serde_yaml::from_str(CURRENT).unwrap();
    desired.gen_diff(&current).unwrap()
}

#[test]
fn test_gen_diff_no_change() {
    let diff = gen_diff(CURRENT);
    assert!(diff.interfaces.is_empty());
    assert!(diff.routes.is_empty());
    assert!(diff.rules.is_empty());
    assert!(diff.dns.is_empty());
    assert!(diff.hostname.is_none());
}

#[test]
fn test_gen_diff_only_changed_property() {
    let diff = gen_diff(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  mtu: 1400
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
- name: eth2
  type: ethernet
  state: up
  mtu: 1500
",
    );
    assert_eq!(diff.interfaces.to_vec().len(), 1);
    let eth1 = get_iface(&diff, "eth1");
    assert_eq!(eth1.base_iface().mtu, Some(1400));
    assert_eq!(eth1.base_iface().state, InterfaceState::Up);
    assert!(eth1.base_iface().ipv4.is_none());
}

#[test]
fn test_gen_diff_new_and_absent_iface() {
    let diff = gen_diff(
        r"---
interfaces:
- name: dummy1
  type: dummy
  state: up
  mtu: 1280
- name: eth2
  type: ethernet
  state: absent
",
    );
    let dummy1 = get_iface(&diff, "dummy1");
    assert_eq!(dummy1.base_iface().mtu, Some(1280));
    assert!(get_iface(&diff, "eth2").is_absent());
    assert!(diff.interfaces.get_iface("eth1", crate::InterfaceType::Unknown)
        .is_none());
}

#[test]
fn test_gen_diff_global_sections() {
    let diff = gen_diff(
        r"---
hostname:
  running: host-a.example.org
  config: host-b.example.org
dns-resolver:
  config:
    server:
    - 192.0.2.251
",
    );
    assert_eq!(
        diff.hostname.as_ref().and_then(|h| h.config.as_deref()),
        Some("host-b.example.org")
    );
    assert_eq!(
        diff.dns.config.and_then(|c| c.server),
        Some(vec!["192.0.2.251".to_string()])
    );
    assert!(diff.interfaces.is_empty());
}
