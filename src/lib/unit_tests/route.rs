// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, merge_yaml, new_provider, show,
    },
    ErrorKind, NetworkState, RouteEntry,
};

const ETH1_STATIC: &str = r"---
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
";

const ETH1_WITH_ROUTES: &str = r"---
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
routes:
  config:
  - destination: 198.51.100.0/24
    next-hop-interface: eth1
    next-hop-address: 192.0.2.254
    metric: 150
    table-id: 254
  - destination: 2001:db8:2::/64
    next-hop-interface: eth1
    next-hop-address: 2001:db8:1::fe
    metric: 150
    table-id: 254
";

fn route_dsts(routes: &[RouteEntry]) -> Vec<&str> {
    let mut dsts: Vec<&str> = routes
        .iter()
        .filter_map(|r| r.destination.as_deref())
        .collect();
    dsts.sort_unstable();
    dsts
}

#[test]
fn test_route_placed_on_next_hop_iface() {
    let merged_state = merge_yaml(
        r"---
routes:
  config:
  - destination: 198.51.100.0/24
    next-hop-interface: eth1
    next-hop-address: 192.0.2.254
",
        ETH1_WITH_ROUTES,
    )
    .unwrap();

    let base = for_apply(&merged_state, "eth1").base_iface();
    let v4_rts = base.ipv4.as_ref().and_then(|i| i.routes()).unwrap();
    let v6_rts = base.ipv6.as_ref().and_then(|i| i.routes()).unwrap();
    // Full route list of interface is placed, not only the changed ones.
    assert_eq!(route_dsts(v4_rts), vec!["198.51.100.0/24"]);
    assert_eq!(route_dsts(v6_rts), vec!["2001:db8:2::/64"]);
}

#[test]
fn test_route_add_apply_and_show() {
    let mut provider = new_provider(ETH1_STATIC);
    apply_yaml(
        &mut provider,
        r"---
routes:
  config:
  - destination: 198.51.100.0/24
    next-hop-interface: eth1
    next-hop-address: 192.0.2.254
  - destination: 203.0.113.0/24
    next-hop-interface: eth1
    next-hop-address: 192.0.2.253
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert_eq!(
        route_dsts(state.routes.config.as_deref().unwrap()),
        vec!["198.51.100.0/24", "203.0.113.0/24"]
    );
}

#[test]
fn test_route_absent_wildcard() {
    let mut provider = new_provider(ETH1_WITH_ROUTES);
    apply_yaml(
        &mut provider,
        r"---
routes:
  config:
  - next-hop-interface: eth1
    state: absent
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert!(state.routes.config.unwrap_or_default().is_empty());
}

#[test]
fn test_route_absent_only_matching_family() {
    let mut provider = new_provider(ETH1_WITH_ROUTES);
    apply_yaml(
        &mut provider,
        r"---
routes:
  config:
  - destination: 2001:db8:2::/64
    state: absent
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert_eq!(
        route_dsts(state.routes.config.as_deref().unwrap()),
        vec!["198.51.100.0/24"]
    );
}

#[test]
fn test_route_removed_with_iface() {
    let mut provider = new_provider(ETH1_WITH_ROUTES);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: absent
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert!(state.routes.config.unwrap_or_default().is_empty());
}

#[test]
fn test_route_next_hop_iface_not_exist() {
    let result = merge_yaml(
        r"---
routes:
  config:
  - destination: 198.51.100.0/24
    next-hop-interface: eth9
    next-hop-address: 192.0.2.254
",
        ETH1_STATIC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_route_next_hop_iface_ipv6_disabled() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  ipv6:
    enabled: false
routes:
  config:
  - destination: 2001:db8:2::/64
    next-hop-interface: eth1
    next-hop-address: 2001:db8:1::fe
",
        ETH1_STATIC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_route_without_next_hop_iface() {
    let result = merge_yaml(
        r"---
routes:
  config:
  - destination: 198.51.100.0/24
    next-hop-address: 192.0.2.254
",
        ETH1_STATIC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::NotImplementedError);
    }
}

#[test]
fn test_route_blackhole_with_next_hop() {
    let result = merge_yaml(
        r"---
routes:
  config:
  - destination: 198.51.100.0/24
    route-type: blackhole
    next-hop-interface: eth1
",
        ETH1_STATIC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_route_zero_network_destination() {
    let result = merge_yaml(
        r"---
routes:
  config:
  - destination: 0.0.0.0/8
    next-hop-interface: eth1
    next-hop-address: 192.0.2.254
",
        ETH1_STATIC,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_route_destination_sanitized() {
    let mut rt: RouteEntry = serde_yaml::from_str(
        r"---
destination: 198.51.100.9/24
next-hop-interface: eth1
next-hop-address: 2001:0db8:1::00fe
",
    )
    .unwrap();
    rt.sanitize().unwrap();
    assert_eq!(rt.destination.as_deref(), Some("198.51.100.0/24"));
    assert_eq!(rt.next_hop_addr.as_deref(), Some("2001:db8:1::fe"));
}

#[test]
fn test_route_verify_missing_route() {
    let desired: NetworkState = serde_yaml::from_str(
        r"---
routes:
  config:
  - destination: 203.0.113.0/24
    next-hop-interface: eth1
    next-hop-address: 192.0.2.254
",
    )
    .unwrap();
    let current: NetworkState =
        serde_yaml::from_str(ETH1_WITH_ROUTES).unwrap();
    assert!(!NetworkState::state_match(&desired, &current));
}

#[test]
fn test_route_verify_extra_current_route_is_fine() {
    let desired: NetworkState = serde_yaml::from_str(
        r"---
routes:
  config:
  - destination: 198.51.100.0/24
    next-hop-interface: eth1
    next-hop-address: 192.0.2.254
",
    )
    .unwrap();
    let current: NetworkState =
        serde_yaml::from_str(ETH1_WITH_ROUTES).unwrap();
    assert!(NetworkState::state_match(&desired, &current));
}

fn route_from_yaml(yaml: &str) -> RouteEntry {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_route_absent_empty_gateway_matches_direct_route_only() {
    let filter = route_from_yaml(
        r"---
state: absent
next-hop-interface: eth1
next-hop-address: ''
",
    );
    let direct = route_from_yaml(
        r"---
destination: 198.51.100.0/24
next-hop-interface: eth1
",
    );
    let via_gateway = route_from_yaml(
        r"---
destination: 198.51.100.0/24
next-hop-interface: eth1
next-hop-address: 192.0.2.254
",
    );
    assert!(filter.is_match(&direct));
    assert!(!filter.is_match(&via_gateway));
}

#[test]
fn test_route_default_table_matches_main() {
    let filter = route_from_yaml(
        r"---
destination: 198.51.100.0/24
table-id: 254
",
    );
    let route = route_from_yaml(
        r"---
destination: 198.51.100.0/24
next-hop-interface: eth1
",
    );
    assert!(filter.is_match(&route));
}

#[test]
fn test_route_metric_ignored_in_dedup() {
    let mut routes = vec![
        route_from_yaml(
            r"---
destination: 198.51.100.0/24
next-hop-interface: eth1
metric: 100
",
        ),
        route_from_yaml(
            r"---
destination: 198.51.100.0/24
next-hop-interface: eth1
metric: 200
",
        ),
    ];
    routes.sort_unstable();
    routes.dedup();
    assert_eq!(routes.len(), 1);
}

#[test]
fn test_route_invalid_weight() {
    let mut route = route_from_yaml(
        r"---
destination: 198.51.100.0/24
next-hop-interface: eth1
weight: 300
",
    );
    let result = route.sanitize();
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_route_display() {
    let route = route_from_yaml(
        r"---
state: absent
destination: 198.51.100.0/24
metric: 100
",
    );
    assert_eq!(
        route.to_string(),
        "state: absent destination: 198.51.100.0/24 metric: 100"
    );
}
