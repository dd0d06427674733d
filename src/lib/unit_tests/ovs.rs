// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    BridgePortVlanMode, ErrorKind, Interface, InterfaceType, NetworkState,
};

const OVS_PATCH_PAIR: &str = r"---
interfaces:
- name: patch0
  type: ovs-interface
  state: up
  patch:
    peer: patch1
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: patch0
- name: patch1
  type: ovs-interface
  state: up
  patch:
    peer: patch0
- name: ovs-br1
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: patch1
";

#[test]
fn test_ovs_patch_pair_intended_has_no_mtu() {
    let merged_state = merge_yaml(
        OVS_PATCH_PAIR,
        r"---
interfaces:
- name: patch0
  type: ovs-interface
  state: up
  mtu: 65000
  controller: ovs-br0
  patch:
    peer: patch1
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: patch0
",
    )
    .unwrap();

    for port_name in ["patch0", "patch1"] {
        let iface = for_apply(&merged_state, port_name);
        assert_eq!(iface.base_iface().mtu, None);
        assert_eq!(
            iface.base_iface().controller_type,
            Some(InterfaceType::OvsBridge)
        );
    }
}

#[test]
fn test_ovs_patch_pair_apply_and_verify() {
    let mut provider = new_provider("{}");
    apply_yaml(&mut provider, OVS_PATCH_PAIR).unwrap();

    let state = show(&mut provider);
    let patch0 = get_iface(&state, "patch0");
    assert_eq!(patch0.base_iface().mtu, None);
    assert_eq!(patch0.base_iface().controller.as_deref(), Some("ovs-br0"));
    if let Interface::OvsInterface(iface) = patch0 {
        assert_eq!(iface.patch_peer(), Some("patch1"));
    } else {
        panic!("patch0 should be OVS interface");
    }
    let br1 = state
        .interfaces
        .get_iface("ovs-br1", InterfaceType::OvsBridge)
        .unwrap();
    assert_eq!(br1.ports(), Some(vec!["patch1"]));
}

#[test]
fn test_ovs_patch_with_mtu() {
    let result = merge_yaml(
        r"---
interfaces:
- name: patch0
  type: ovs-interface
  state: up
  mtu: 1500
  patch:
    peer: patch1
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: patch0
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovs_patch_without_peer() {
    let result = merge_yaml(
        r"---
interfaces:
- name: patch0
  type: ovs-interface
  state: up
  patch: {}
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: patch0
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovs_patch_peer_not_pointing_back() {
    let result = merge_yaml(
        r"---
interfaces:
- name: patch0
  type: ovs-interface
  state: up
  patch:
    peer: ovs0
- name: ovs0
  type: ovs-interface
  state: up
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: patch0
    - name: ovs0
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovs_iface_name_length_limit() {
    let template = r"---
interfaces:
- name: NAME
  type: ovs-interface
  state: up
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: NAME
";
    let name_15 = "ovs123456789012";
    assert_eq!(name_15.len(), 15);
    assert!(merge_yaml(&template.replace("NAME", name_15), "{}").is_ok());

    let name_16 = "ovs1234567890123";
    let result = merge_yaml(&template.replace("NAME", name_16), "{}");
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovs_bridge_unknown_port_becomes_internal_iface() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: ovs0
",
        "{}",
    )
    .unwrap();
    let ovs0 = for_apply(&merged_state, "ovs0");
    assert_eq!(ovs0.iface_type(), InterfaceType::OvsInterface);
    assert_eq!(ovs0.base_iface().controller.as_deref(), Some("ovs-br0"));
}

#[test]
fn test_ovs_bridge_without_port_gets_internal_iface() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: ovs-br0
  type: ovs-bridge
  state: up
",
        "{}",
    )
    .unwrap();
    let iface = for_apply(&merged_state, "ovs-br0");
    assert_eq!(iface.iface_type(), InterfaceType::OvsInterface);
    assert_eq!(iface.base_iface().controller.as_deref(), Some("ovs-br0"));
}

#[test]
fn test_ovs_bridge_port_listed_twice() {
    let result = merge_yaml(
        r"---
interfaces:
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: eth1
    - name: eth1
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
fn test_ovs_patch_mtu_noise_ignored_in_verify() {
    let desired: NetworkState =
        serde_yaml::from_str(OVS_PATCH_PAIR).unwrap();
    let mut current = desired.clone();
    for name in ["patch0", "patch1"] {
        if let Some(iface) =
            current.interfaces.get_iface_mut(name, InterfaceType::OvsInterface)
        {
            iface.base_iface_mut().mtu = Some(65000);
            iface.base_iface_mut().controller = Some(
                if name == "patch0" { "ovs-br0" } else { "ovs-br1" }
                    .to_string(),
            );
        }
    }
    assert!(NetworkState::state_match(&desired, &current));
}

const OVS_BR0_LAG: &str = r"---
interfaces:
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: bond1
      link-aggregation:
        mode: balance-slb
        port:
        - name: eth1
        - name: eth2
- name: eth1
  type: ethernet
  state: up
- name: eth2
  type: ethernet
  state: up
";

// Current state as reported after OVS attached the LAG members.
fn lag_current(members: &[&str]) -> NetworkState {
    let mut current: NetworkState = serde_yaml::from_str(OVS_BR0_LAG).unwrap();
    if let Some(Interface::OvsBridge(br)) = current
        .interfaces
        .get_iface_mut("ovs-br0", InterfaceType::OvsBridge)
    {
        if let Some(bond_conf) = br
            .bridge
            .as_mut()
            .and_then(|b| b.ports.as_mut())
            .and_then(|ports| ports.first_mut())
            .and_then(|p| p.bond.as_mut())
        {
            bond_conf.ports = Some(
                members
                    .iter()
                    .map(|name| {
                        let mut member = crate::OvsBridgeBondPortConfig::new();
                        member.name = name.to_string();
                        member
                    })
                    .collect(),
            );
        }
    }
    for name in ["eth1", "eth2"] {
        if let Some(iface) =
            current.interfaces.get_iface_mut(name, InterfaceType::Ethernet)
        {
            iface.base_iface_mut().controller = Some("ovs-br0".to_string());
        }
    }
    current
}

#[test]
fn test_ovs_lag_member_order_ignored_in_verify() {
    let desired: NetworkState = serde_yaml::from_str(OVS_BR0_LAG).unwrap();
    let current = lag_current(&["eth2", "eth1"]);
    assert!(NetworkState::state_match(&desired, &current));
}

#[test]
fn test_ovs_lag_missing_member_fails_verify() {
    let desired: NetworkState = serde_yaml::from_str(OVS_BR0_LAG).unwrap();
    let current = lag_current(&["eth1"]);
    assert!(!NetworkState::state_match(&desired, &current));
}

#[test]
fn test_ovs_access_port_vlan_tag_zero() {
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
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: eth1
      vlan:
        mode: access
        tag: 0
",
    )
    .unwrap();

    let state = show(&mut provider);
    let vlan = if let Interface::OvsBridge(br) = get_iface(&state, "ovs-br0")
    {
        br.bridge
            .as_ref()
            .and_then(|b| b.ports.as_ref())
            .and_then(|ports| ports.iter().find(|p| p.name == "eth1"))
            .and_then(|p| p.vlan.clone())
            .unwrap()
    } else {
        panic!("ovs-br0 should be OVS bridge");
    };
    assert_eq!(vlan.mode, Some(BridgePortVlanMode::Access));
    assert_eq!(vlan.tag, Some(0));
}

#[test]
fn test_ovs_trunk_port_native_tag_zero_without_enable_native() {
    let result = merge_yaml(
        r"---
interfaces:
- name: ovs-br0
  type: ovs-bridge
  state: up
  bridge:
    port:
    - name: eth1
      vlan:
        mode: trunk
        tag: 0
        trunk-tags:
        - id: 100
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
",
    );
    assert!(result.is_ok());
}

const OVSDB_CURRENT: &str = r"---
ovs-db:
  external_ids:
    hostname: host.example.org
    rack: r1
  other_config:
    stats-update-interval: '10000'
";

fn ovsdb_map(pairs: &[(&str, &str)]) -> HashMap<String, Option<String>> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect()
}

#[test]
fn test_ovsdb_global_merge_null_removes_and_empty_purges() {
    let merged = merge_yaml(
        r"---
ovs-db:
  external_ids:
    rack: null
    zone: 3
  other_config: {}
",
        OVSDB_CURRENT,
    )
    .unwrap();
    assert!(merged.ovsdb.is_changed);
    assert_eq!(
        merged.ovsdb.external_ids,
        ovsdb_map(&[("hostname", "host.example.org"), ("zone", "3")])
    );
    assert!(merged.ovsdb.other_config.is_empty());
}

#[test]
fn test_ovsdb_global_untouched_section_kept() {
    let merged = merge_yaml(
        r"---
ovs-db:
  other_config:
    stats-update-interval: '5000'
",
        OVSDB_CURRENT,
    )
    .unwrap();
    assert_eq!(
        merged.ovsdb.external_ids,
        ovsdb_map(&[("hostname", "host.example.org"), ("rack", "r1")])
    );
    assert_eq!(
        merged.ovsdb.other_config,
        ovsdb_map(&[("stats-update-interval", "5000")])
    );
}

#[test]
fn test_ovsdb_global_empty_purges_all() {
    let merged = merge_yaml("---\novs-db: {}\n", OVSDB_CURRENT).unwrap();
    assert!(merged.ovsdb.external_ids.is_empty());
    assert!(merged.ovsdb.other_config.is_empty());
    assert!(merged.ovsdb.is_changed);
}

#[test]
fn test_ovsdb_unknown_section() {
    let result = serde_yaml::from_str::<NetworkState>(
        r"---
ovs-db:
  external-ids:
    rack: r1
",
    );
    assert!(result.is_err());
}
