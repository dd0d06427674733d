// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{apply_yaml, get_iface, new_provider, show},
    ErrorKind, InterfaceState, NetstateCapability, NetworkState,
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
";

const ETH1_DHCP: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ipv4:
    enabled: true
    dhcp: true
";

const OVS_BR0: &str = r"---
interfaces:
- name: br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: br0
";

#[test]
fn test_net_state_empty() {
    assert!(NetworkState::new().is_empty());
    assert!(NetworkState::new_from_yaml("---\n").unwrap().is_empty());
    assert!(!NetworkState::new_from_yaml(ETH1_STATIC).unwrap().is_empty());
}

#[test]
fn test_net_state_invalid_json() {
    let result = NetworkState::new_from_json("[1, 2]");
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_net_state_apply_is_idempotent() {
    let mut provider = new_provider(ETH1_STATIC);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: dummy1
  type: dummy
  state: up
  mtu: 1280
",
    )
    .unwrap();
    let first = show(&mut provider);

    apply_yaml(&mut provider, &serde_yaml::to_string(&first).unwrap())
        .unwrap();
    let second = show(&mut provider);

    assert!(NetworkState::state_match(&first, &second));
    assert!(NetworkState::state_match(&second, &first));
}

#[test]
fn test_net_state_no_type_for_new_iface() {
    let mut provider = new_provider(ETH1_STATIC);
    let result = apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: dummy1
  state: up
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_net_state_ignore_iface() {
    let mut provider = new_provider(ETH1_STATIC);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  state: ignore
  mtu: 9000
",
    )
    .unwrap();
    assert_eq!(
        get_iface(&show(&mut provider), "eth1").base_iface().mtu,
        None
    );
}

#[test]
fn test_net_state_ovs_without_capability() {
    let mut provider = new_provider("{}");
    provider.set_capabilities(&[
        NetstateCapability::DhcpV4,
        NetstateCapability::DhcpV6,
        NetstateCapability::Checkpoint,
    ]);
    let result = apply_yaml(&mut provider, OVS_BR0);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::DependencyError);
    }
}

#[test]
fn test_net_state_dhcp_without_capability() {
    let mut provider = new_provider(ETH1_STATIC);
    provider.set_capabilities(&[NetstateCapability::Checkpoint]);
    let result = apply_yaml(&mut provider, ETH1_DHCP);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::DependencyError);
    }
}

#[test]
fn test_net_state_kernel_only_skip_dhcp_capability() {
    let mut provider = new_provider(ETH1_STATIC);
    provider.set_capabilities(&[]);
    let mut desired = NetworkState::new_from_yaml(ETH1_DHCP).unwrap();
    desired.set_kernel_only(true).set_verify_retry(2, 10);
    desired.apply(&mut provider).unwrap();

    let state = show(&mut provider);
    let eth1 = get_iface(&state, "eth1");
    assert_eq!(eth1.base_iface().state, InterfaceState::Up);
    assert_eq!(
        eth1.base_iface().ipv4.as_ref().and_then(|i| i.dhcp),
        Some(true)
    );
}

#[test]
fn test_net_state_hide_secrets() {
    let mut state = NetworkState::new_from_yaml(
        r"---
interfaces:
- name: wg0
  type: wireguard
  state: up
  wireguard:
    private-key: aGlkZGVuLWtleS1mb3ItdGVzdGluZy1wdXJwb3Nlcwo=
",
    )
    .unwrap();
    state.hide_secrets();
    let yaml = serde_yaml::to_string(&state).unwrap();
    assert!(!yaml.contains("aGlkZGVu"));
    assert!(yaml.contains("<_password_hid_>"));
}
