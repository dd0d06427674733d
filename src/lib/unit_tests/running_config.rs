// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{get_iface, new_provider},
    NetworkState,
};

const CURRENT: &str = r"---
hostname:
  running: host-a.example.org
  config: host-a.example.org
dns-resolver:
  config:
    server:
    - 192.0.2.250
routes:
  config:
  - destination: 198.51.100.0/24
    next-hop-interface: eth1
    next-hop-address: 192.0.2.254
interfaces:
- name: eth1
  type: ethernet
  state: up
  mac-address: 00:23:45:67:89:1A
  ipv4:
    enabled: true
    dhcp: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
      valid-left: 30sec
      preferred-left: 30sec
  ipv6:
    enabled: true
    address:
    - ip: fe80::1
      prefix-length: 64
    - ip: 2001:db8:1::1
      prefix-length: 64
      valid-left: forever
      preferred-left: forever
- name: dummy1
  type: dummy
  state: up
  mac-address: 00:23:45:67:89:1B
";

fn running_config() -> NetworkState {
    let mut provider = new_provider(CURRENT);
    let mut state = NetworkState::new();
    state.retrieve_running_config(&mut provider).unwrap();
    state
}

#[test]
fn test_running_config_strip_dynamic_ip() {
    let state = running_config();
    let base = get_iface(&state, "eth1").base_iface();

    let ipv4 = base.ipv4.as_ref().unwrap();
    assert_eq!(ipv4.dhcp, Some(true));
    assert_eq!(ipv4.addresses, None);

    let v6_addrs =
        base.ipv6.as_ref().and_then(|i| i.addresses.clone()).unwrap();
    assert_eq!(v6_addrs.len(), 1);
    assert_eq!(v6_addrs[0].ip.to_string(), "2001:db8:1::1");
    assert_eq!(v6_addrs[0].valid_left, None);
    assert_eq!(v6_addrs[0].preferred_left, None);
}

#[test]
fn test_running_config_strip_virtual_iface_mac() {
    let state = running_config();
    assert_eq!(
        get_iface(&state, "eth1").base_iface().mac_address.as_deref(),
        Some("00:23:45:67:89:1A")
    );
    assert_eq!(get_iface(&state, "dummy1").base_iface().mac_address, None);
}

#[test]
fn test_running_config_strip_running_sections() {
    let state = running_config();
    assert_eq!(state.routes.running, None);
    assert_eq!(state.routes.config.as_ref().map(|r| r.len()), Some(1));
    assert_eq!(state.dns.running, None);
    assert!(state.dns.config.is_some());
    let hostname = state.hostname.unwrap();
    assert_eq!(hostname.running, None);
    assert_eq!(hostname.config.as_deref(), Some("host-a.example.org"));
}

#[test]
fn test_running_config_applies_back_cleanly() {
    let mut provider = new_provider(CURRENT);
    let mut state = NetworkState::new();
    state.retrieve_running_config(&mut provider).unwrap();
    assert!(NetworkState::state_match(&state, &state.clone()));
}
