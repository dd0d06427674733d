// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{apply_yaml, get_iface, new_provider, show},
    Interface, InterfaceState, InterfaceType, MemoryProvider, NetstateProvider,
    NetworkState,
};

const ETH1_AND_DUMMY1: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  min-mtu: 68
  max-mtu: 9702
- name: dummy1
  type: dummy
  state: up
";

#[test]
fn test_memory_absent_virtual_iface_removed() {
    let mut provider = new_provider(ETH1_AND_DUMMY1);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: dummy1
  type: dummy
  state: absent
",
    )
    .unwrap();
    assert!(show(&mut provider)
        .interfaces
        .get_iface("dummy1", InterfaceType::Dummy)
        .is_none());
}

#[test]
fn test_memory_absent_physical_iface_marked_down() {
    let mut provider = new_provider(ETH1_AND_DUMMY1);
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
    assert_eq!(
        get_iface(&show(&mut provider), "eth1").base_iface().state,
        InterfaceState::Down
    );
}

#[test]
fn test_memory_veth_peer_lifecycle() {
    let mut provider = new_provider(ETH1_AND_DUMMY1);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: veth1
  type: veth
  state: up
  veth:
    peer: veth1-ep
",
    )
    .unwrap();

    let state = show(&mut provider);
    match get_iface(&state, "veth1-ep") {
        Interface::Ethernet(peer) => {
            assert_eq!(peer.base.iface_type, InterfaceType::Veth);
            assert_eq!(peer.veth_peer(), Some("veth1"));
        }
        iface => panic!("Expecting veth interface, got {iface:?}"),
    }

    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: veth1
  type: veth
  state: absent
",
    )
    .unwrap();
    let state = show(&mut provider);
    assert!(state
        .interfaces
        .get_iface("veth1", InterfaceType::Unknown)
        .is_none());
    assert!(state
        .interfaces
        .get_iface("veth1-ep", InterfaceType::Unknown)
        .is_none());
}

#[test]
fn test_memory_removed_controller_releases_ports() {
    let mut provider = new_provider(ETH1_AND_DUMMY1);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth1
",
    )
    .unwrap();
    assert_eq!(
        get_iface(&show(&mut provider), "eth1")
            .base_iface()
            .controller
            .as_deref(),
        Some("br0")
    );

    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: absent
",
    )
    .unwrap();
    assert_eq!(
        get_iface(&show(&mut provider), "eth1").base_iface().controller,
        None
    );
}

#[test]
fn test_memory_status_data_on_request() {
    let mut provider = new_provider(ETH1_AND_DUMMY1);

    let state = provider.show(false).unwrap();
    assert_eq!(get_iface(&state, "eth1").base_iface().max_mtu, None);

    let mut state = NetworkState::new();
    state.set_include_status_data(true);
    state.retrieve(&mut provider).unwrap();
    assert_eq!(get_iface(&state, "eth1").base_iface().max_mtu, Some(9702));
}

#[test]
fn test_memory_provider_starts_empty() {
    let mut provider = MemoryProvider::new();
    assert!(provider.show(false).unwrap().interfaces.is_empty());
    assert_eq!(provider.last_checkpoint(), None);
}

#[test]
fn test_memory_snapshot_keeps_pending_checkpoint() {
    let mut provider = new_provider(ETH1_AND_DUMMY1);
    let mut desired = NetworkState::new_from_yaml(
        r"---
interfaces:
- name: dummy1
  type: dummy
  state: up
  mtu: 9000
",
    )
    .unwrap();
    desired.set_commit(false).set_verify_retry(2, 10);
    let checkpoint = desired.apply(&mut provider).unwrap().unwrap();

    let content = serde_json::to_string(&provider.snapshot()).unwrap();
    let mut restored =
        MemoryProvider::from_snapshot(&serde_json::from_str(&content).unwrap());
    assert_eq!(restored.last_checkpoint(), Some(checkpoint.clone()));
    assert_eq!(
        get_iface(&show(&mut restored), "dummy1").base_iface().mtu,
        Some(9000)
    );

    NetworkState::checkpoint_rollback(&mut restored, Some(&checkpoint))
        .unwrap();
    let state = show(&mut restored);
    assert_eq!(get_iface(&state, "dummy1").base_iface().mtu, None);
    assert_eq!(restored.last_checkpoint(), None);
}
