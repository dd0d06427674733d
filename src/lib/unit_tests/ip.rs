// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    ErrorKind, InterfaceIpAddr, InterfaceIpv4, InterfaceIpv6, NetworkState,
};

const ETH1_DHCP4: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    dhcp: true
    address:
    - ip: 192.0.2.200
      prefix-length: 24
";

const ETH1_DHCP4_OFF: &str = r"---
interfaces:
- name: eth1
  ipv4:
    enabled: true
    dhcp: false
";

#[test]
fn test_ipv4_dhcp_off_freeze_dynamic_address() {
    let merged_state = merge_yaml(ETH1_DHCP4_OFF, ETH1_DHCP4).unwrap();
    let ipv4 = for_apply(&merged_state, "eth1")
        .base_iface()
        .ipv4
        .as_ref()
        .unwrap();

    assert_eq!(ipv4.dhcp, Some(false));
    assert_eq!(
        ipv4.addresses.as_deref(),
        Some(
            vec![InterfaceIpAddr::new("192.0.2.200".parse().unwrap(), 24)]
                .as_slice()
        )
    );
}

#[test]
fn test_ipv4_dhcp_off_apply_keep_address() {
    let mut provider = new_provider(ETH1_DHCP4);
    apply_yaml(&mut provider, ETH1_DHCP4_OFF).unwrap();

    let state = show(&mut provider);
    let ipv4 = get_iface(&state, "eth1").base_iface().ipv4.clone().unwrap();
    assert_eq!(ipv4.dhcp, Some(false));
    let addrs = ipv4.addresses.unwrap();
    assert_eq!(addrs.len(), 1);
    assert_eq!(addrs[0].ip.to_string(), "192.0.2.200");
    assert_eq!(addrs[0].prefix_length, 24);
}

#[test]
fn test_ipv4_dhcp_on_does_not_inherit_static_address() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  ipv4:
    enabled: true
    dhcp: true
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    dhcp: false
    address:
    - ip: 192.0.2.1
      prefix-length: 24
",
    )
    .unwrap();
    let ipv4 = for_apply(&merged_state, "eth1")
        .base_iface()
        .ipv4
        .as_ref()
        .unwrap();
    assert!(ipv4.addresses.as_deref().unwrap_or_default().is_empty());
}

#[test]
fn test_ipv6_link_local_ignored_in_verify() {
    let desired: NetworkState = serde_yaml::from_str(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv6:
    enabled: true
    address:
    - ip: 2001:db8:1::1
      prefix-length: 64
",
    )
    .unwrap();
    let current: NetworkState = serde_yaml::from_str(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv6:
    enabled: true
    address:
    - ip: fe80::1
      prefix-length: 64
    - ip: 2001:db8:1::1
      prefix-length: 64
",
    )
    .unwrap();

    assert!(NetworkState::state_match(&desired, &current));
}

#[test]
fn test_ipv6_link_local_removed_from_desired() {
    let mut ipv6: InterfaceIpv6 = serde_yaml::from_str(
        r"---
enabled: true
address:
- ip: fe80::9
  prefix-length: 64
- ip: 2001:db8:1::2
  prefix-length: 64
",
    )
    .unwrap();
    ipv6.sanitize(true).unwrap();

    let addrs = ipv6.addresses.unwrap();
    assert_eq!(addrs.len(), 1);
    assert_eq!(addrs[0].ip.to_string(), "2001:db8:1::2");
}

#[test]
fn test_ip_dynamic_address_ignored_in_verify() {
    let desired: NetworkState = serde_yaml::from_str(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
",
    )
    .unwrap();
    let current: NetworkState = serde_yaml::from_str(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
    - ip: 198.51.100.7
      prefix-length: 24
      valid-left: 30sec
      preferred-left: 30sec
",
    )
    .unwrap();

    assert!(NetworkState::state_match(&desired, &current));
}

#[test]
fn test_ip_missing_static_address_fails_verify() {
    let desired: NetworkState = serde_yaml::from_str(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
    - ip: 192.0.2.2
      prefix-length: 24
",
    )
    .unwrap();
    let current: NetworkState = serde_yaml::from_str(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
",
    )
    .unwrap();

    assert!(!NetworkState::state_match(&desired, &current));
}

#[test]
fn test_ipv6_autoconf_without_dhcp() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv6:
    enabled: true
    dhcp: false
    autoconf: true
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ipv4_address_in_ipv6_section() {
    let mut ipv6: InterfaceIpv6 = serde_yaml::from_str(
        r"---
enabled: true
address:
- ip: 192.0.2.1
  prefix-length: 24
",
    )
    .unwrap();
    let result = ipv6.sanitize(true);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ipv6_apply_gets_link_local_address() {
    let mut provider = new_provider(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
",
    );
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv6:
    enabled: true
    address:
    - ip: 2001:db8:1::1
      prefix-length: 64
",
    )
    .unwrap();

    let state = show(&mut provider);
    let addrs = get_iface(&state, "eth1")
        .base_iface()
        .ipv6
        .as_ref()
        .and_then(|i| i.addresses.clone())
        .unwrap();
    assert_eq!(addrs.len(), 2);
    assert!(addrs.iter().any(|a| a.ip.to_string().starts_with("fe80:")));
}

#[test]
fn test_ipv6_token_normalized() {
    let mut ipv6: InterfaceIpv6 = serde_yaml::from_str(
        r"---
enabled: true
autoconf: true
token: 0:0:0:0:0:0:fe80:1
",
    )
    .unwrap();
    ipv6.sanitize(true).unwrap();
    assert_eq!(ipv6.token.as_deref(), Some("::fe80:1"));
}

#[test]
fn test_ipv6_invalid_token() {
    let mut ipv6: InterfaceIpv6 = serde_yaml::from_str(
        r"---
enabled: true
autoconf: true
token: ::fe80:zz
",
    )
    .unwrap();
    let result = ipv6.sanitize(true);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ipv4_prefix_length_over_32() {
    let mut ipv4: InterfaceIpv4 = serde_yaml::from_str(
        r"---
enabled: true
address:
- ip: 192.0.2.1
  prefix-length: 33
",
    )
    .unwrap();
    let result = ipv4.sanitize(true);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.msg().contains("range of 0 to 32"));
    }
}

#[test]
fn test_ipv4_rejects_ipv6_only_keys() {
    let result = serde_yaml::from_str::<InterfaceIpv4>(
        r"---
enabled: true
token: ::1
",
    );
    assert!(result.is_err());
}

#[test]
fn test_wait_ip_needs_enabled_stack() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  wait-ip: ipv4+ipv6
  ipv4:
    enabled: true
    dhcp: true
  ipv6:
    enabled: false
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.msg().contains("with IPv6 disabled"));
    }
}
