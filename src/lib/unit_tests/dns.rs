// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, merge_yaml, new_provider, show,
    },
    ErrorKind,
};

const ETH1_ETH2_STATIC: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
  ipv6:
    enabled: true
    address:
    - ip: 2001:db8:1::1
      prefix-length: 64
- name: eth2
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 198.51.100.1
      prefix-length: 24
";

#[test]
fn test_dns_ipv4_between_ipv6_not_supported() {
    let result = merge_yaml(
        r"---
dns-resolver:
  config:
    server:
    - 2001:db8:1::250
    - 192.0.2.250
    - 2001:db8:1::251
",
        ETH1_ETH2_STATIC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::NotImplementedError);
    }
}

#[test]
fn test_dns_ipv6_between_ipv4_not_supported() {
    let result = merge_yaml(
        r"---
dns-resolver:
  config:
    server:
    - 192.0.2.250
    - 2001:db8:1::250
    - 192.0.2.251
",
        ETH1_ETH2_STATIC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::NotImplementedError);
    }
}

#[test]
fn test_dns_three_ipv4_servers() {
    let merged_state = merge_yaml(
        r"---
dns-resolver:
  config:
    server:
    - 192.0.2.250
    - 192.0.2.251
    - 192.0.2.252
",
        ETH1_ETH2_STATIC,
    )
    .unwrap();
    let dns = for_apply(&merged_state, "eth1")
        .base_iface()
        .ipv4
        .as_ref()
        .and_then(|i| i.dns())
        .unwrap();
    assert_eq!(
        dns.server.as_deref(),
        Some(
            vec![
                "192.0.2.250".to_string(),
                "192.0.2.251".to_string(),
                "192.0.2.252".to_string()
            ]
            .as_slice()
        )
    );
    assert_eq!(dns.priority(), Some(40));
}

#[test]
fn test_dns_placed_per_family_with_priority() {
    let merged_state = merge_yaml(
        r"---
dns-resolver:
  config:
    search:
    - example.org
    server:
    - 192.0.2.250
    - 2001:db8:1::250
",
        ETH1_ETH2_STATIC,
    )
    .unwrap();
    let base = for_apply(&merged_state, "eth1").base_iface();
    let ipv4_dns = base.ipv4.as_ref().and_then(|i| i.dns()).unwrap();
    let ipv6_dns = base.ipv6.as_ref().and_then(|i| i.dns()).unwrap();

    assert_eq!(ipv4_dns.priority(), Some(40));
    assert_eq!(ipv6_dns.priority(), Some(41));
    assert_eq!(
        ipv4_dns.search.as_deref(),
        Some(vec!["example.org".to_string()].as_slice())
    );
    assert_eq!(ipv6_dns.search, Some(Vec::new()));
}

#[test]
fn test_dns_prefer_gateway_interface() {
    let merged_state = merge_yaml(
        r"---
dns-resolver:
  config:
    server:
    - 192.0.2.250
routes:
  config:
  - destination: 0.0.0.0/0
    next-hop-interface: eth2
    next-hop-address: 198.51.100.254
",
        ETH1_ETH2_STATIC,
    )
    .unwrap();
    let eth2_dns = for_apply(&merged_state, "eth2")
        .base_iface()
        .ipv4
        .as_ref()
        .and_then(|i| i.dns());
    assert!(eth2_dns.is_some());
    assert!(merged_state
        .interfaces
        .kernel_ifaces
        .get("eth1")
        .and_then(|i| i.for_apply.as_ref())
        .and_then(|i| i.base_iface().ipv4.as_ref())
        .and_then(|i| i.dns())
        .is_none());
}

#[test]
fn test_dns_prefer_auto_iface_with_auto_dns_off() {
    let merged_state = merge_yaml(
        r"---
dns-resolver:
  config:
    server:
    - 192.0.2.250
",
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
- name: eth3
  type: ethernet
  state: up
  ipv4:
    enabled: true
    dhcp: true
    auto-dns: false
",
    )
    .unwrap();
    assert!(for_apply(&merged_state, "eth3")
        .base_iface()
        .ipv4
        .as_ref()
        .and_then(|i| i.dns())
        .is_some());
}

#[test]
fn test_dns_no_bearer() {
    let result = merge_yaml(
        r"---
dns-resolver:
  config:
    server:
    - 2001:db8:1::250
",
        r"---
interfaces:
- name: eth2
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 198.51.100.1
      prefix-length: 24
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_dns_apply_keep_server_order() {
    let mut provider = new_provider(ETH1_ETH2_STATIC);
    apply_yaml(
        &mut provider,
        r"---
dns-resolver:
  config:
    search:
    - example.org
    - example.net
    server:
    - 192.0.2.250
    - 192.0.2.251
    - 2001:db8:1::250
",
    )
    .unwrap();

    let state = show(&mut provider);
    let dns_conf = state.dns.config.unwrap();
    assert_eq!(
        dns_conf.server,
        Some(vec![
            "192.0.2.250".to_string(),
            "192.0.2.251".to_string(),
            "2001:db8:1::250".to_string(),
        ])
    );
    assert_eq!(
        dns_conf.search,
        Some(vec!["example.org".to_string(), "example.net".to_string()])
    );
}

#[test]
fn test_dns_purge() {
    let mut provider = new_provider(ETH1_ETH2_STATIC);
    apply_yaml(
        &mut provider,
        r"---
dns-resolver:
  config:
    server:
    - 192.0.2.250
",
    )
    .unwrap();
    apply_yaml(
        &mut provider,
        r"---
dns-resolver:
  config: {}
",
    )
    .unwrap();

    let state = show(&mut provider);
    let dns_conf = state.dns.config.unwrap_or_default();
    assert!(dns_conf.server.unwrap_or_default().is_empty());
}
