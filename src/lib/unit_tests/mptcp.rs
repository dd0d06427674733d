// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    ErrorKind, MptcpAddressFlag,
};

const ETH1: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
";

#[test]
fn test_mptcp_signal_with_fullmesh() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  mptcp:
    address-flags:
    - signal
    - fullmesh
",
        ETH1,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_mptcp_iface_flags_propagated_to_addresses() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  mptcp:
    address-flags:
    - subflow
    - backup
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
",
        ETH1,
    )
    .unwrap();
    let addrs = for_apply(&merged_state, "eth1")
        .base_iface()
        .ipv4
        .as_ref()
        .and_then(|i| i.addresses.clone())
        .unwrap();
    assert_eq!(
        addrs[0].mptcp_flags,
        Some(vec![MptcpAddressFlag::Subflow, MptcpAddressFlag::Backup])
    );
}

#[test]
fn test_mptcp_flags_apply_and_verify() {
    let mut provider = new_provider(ETH1);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  mptcp:
    address-flags:
    - backup
    - subflow
  ipv4:
    enabled: true
    address:
    - ip: 192.0.2.1
      prefix-length: 24
    - ip: 192.0.2.2
      prefix-length: 24
      mptcp-flags:
      - signal
",
    )
    .unwrap();

    let state = show(&mut provider);
    let addrs = get_iface(&state, "eth1")
        .base_iface()
        .ipv4
        .as_ref()
        .and_then(|i| i.addresses.clone())
        .unwrap();
    assert_eq!(
        addrs[0].mptcp_flags,
        Some(vec![MptcpAddressFlag::Backup, MptcpAddressFlag::Subflow])
    );
    assert_eq!(addrs[1].mptcp_flags, Some(vec![MptcpAddressFlag::Signal]));
}
