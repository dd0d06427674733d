// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, merge_yaml, new_provider, show,
    },
    AddressFamily, ErrorKind, NetworkState, RouteRuleEntry,
};

const ETH_WITH_TABLE_100: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
- name: eth2
  type: ethernet
  state: up
  ipv4:
    enabled: true
    address:
    - ip: 198.51.100.1
      prefix-length: 24
routes:
  config:
  - destination: 203.0.113.0/24
    next-hop-interface: eth2
    next-hop-address: 198.51.100.254
    table-id: 100
";

const RULE_TABLE_100: &str = r"---
route-rules:
  config:
  - ip-from: 192.0.2.0/24
    priority: 1000
    route-table: 100
";

fn assert_invalid_rule(yaml: &str) {
    let result = merge_yaml(yaml, ETH_WITH_TABLE_100);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_route_rule_placed_on_iface_with_route_table() {
    let merged_state = merge_yaml(RULE_TABLE_100, ETH_WITH_TABLE_100).unwrap();

    let rules = for_apply(&merged_state, "eth2")
        .base_iface()
        .ipv4
        .as_ref()
        .and_then(|i| i.rules())
        .unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].ip_from.as_deref(), Some("192.0.2.0/24"));
    assert_eq!(rules[0].table_id, Some(100));
    assert!(!merged_state
        .interfaces
        .kernel_ifaces
        .get("eth1")
        .map(|i| i.is_changed())
        .unwrap_or_default());
}

#[test]
fn test_route_rule_fallback_to_first_static_iface() {
    let merged_state = merge_yaml(
        r"---
route-rules:
  config:
  - ip-to: 192.0.2.0/24
    route-table: 200
",
        ETH_WITH_TABLE_100,
    )
    .unwrap();

    let rules = for_apply(&merged_state, "eth1")
        .base_iface()
        .ipv4
        .as_ref()
        .and_then(|i| i.rules())
        .unwrap();
    assert_eq!(rules[0].table_id, Some(200));
}

#[test]
fn test_route_rule_apply_and_show() {
    let mut provider = new_provider(ETH_WITH_TABLE_100);
    apply_yaml(&mut provider, RULE_TABLE_100).unwrap();

    let state = show(&mut provider);
    let rules = state.rules.config.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].ip_from.as_deref(), Some("192.0.2.0/24"));
    assert_eq!(rules[0].priority, Some(1000));
    assert_eq!(rules[0].family, Some(AddressFamily::IPv4));
}

#[test]
fn test_route_rule_absent_without_table_id() {
    let mut provider = new_provider(ETH_WITH_TABLE_100);
    apply_yaml(&mut provider, RULE_TABLE_100).unwrap();
    apply_yaml(
        &mut provider,
        r"---
route-rules:
  config:
  - ip-from: 192.0.2.0/24
    state: absent
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert!(state.rules.config.unwrap_or_default().is_empty());
}

#[test]
fn test_route_rule_single_ip_matches_host_network() {
    let mut absent_rule: RouteRuleEntry = serde_yaml::from_str(
        r"---
ip-from: 192.0.2.9
state: absent
",
    )
    .unwrap();
    let mut cur_rule: RouteRuleEntry = serde_yaml::from_str(
        r"---
ip-from: 192.0.2.9/32
route-table: 100
",
    )
    .unwrap();
    cur_rule.sanitize().unwrap();
    assert!(absent_rule.is_match(&cur_rule));
    absent_rule.sanitize().unwrap();
    assert_eq!(absent_rule.ip_from.as_deref(), Some("192.0.2.9/32"));
}

#[test]
fn test_route_rule_without_ip_or_family() {
    assert_invalid_rule(
        r"---
route-rules:
  config:
  - priority: 1000
    route-table: 100
",
    );
}

#[test]
fn test_route_rule_family_mismatch() {
    assert_invalid_rule(
        r"---
route-rules:
  config:
  - family: ipv6
    ip-from: 192.0.2.0/24
",
    );
}

#[test]
fn test_route_rule_fwmask_without_fwmark() {
    assert_invalid_rule(
        r"---
route-rules:
  config:
  - ip-from: 192.0.2.0/24
    fwmask: 0xff
",
    );
}

#[test]
fn test_route_rule_action_with_table() {
    assert_invalid_rule(
        r"---
route-rules:
  config:
  - ip-from: 192.0.2.0/24
    action: blackhole
    route-table: 100
",
    );
}

#[test]
fn test_route_rule_verify_missing_rule() {
    let desired: NetworkState = serde_yaml::from_str(RULE_TABLE_100).unwrap();
    let current: NetworkState =
        serde_yaml::from_str(ETH_WITH_TABLE_100).unwrap();
    assert!(!NetworkState::state_match(&desired, &current));
}

#[test]
fn test_route_rule_fwmark_shown_as_hex() {
    let rule: RouteRuleEntry = serde_yaml::from_str(
        r"---
ip-from: 192.0.2.0/24
fwmark: 16
fwmask: '0xff'
",
    )
    .unwrap();
    assert_eq!(rule.fwmark, Some(16));
    assert_eq!(rule.fwmask, Some(255));

    let value = serde_json::to_value(&rule).unwrap();
    assert_eq!(value["fwmark"], "0x10");
    assert_eq!(value["fwmask"], "0xff");
}
