// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    BridgePortTrunkTag, BridgePortVlanMode, ErrorKind, Interface,
    InterfaceState, InterfaceType, LinuxBridgeInterface,
};

const BR0_WITH_TWO_PORTS: &str = r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth1
    - name: eth2
- name: eth1
  type: ethernet
  state: up
  controller: br0
- name: eth2
  type: ethernet
  state: up
  controller: br0
";

#[test]
fn test_bridge_port_absent_purged_from_controller() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  state: absent
",
        BR0_WITH_TWO_PORTS,
    )
    .unwrap();

    assert_eq!(
        for_apply(&merged_state, "br0").ports(),
        Some(vec!["eth2"])
    );
    assert!(for_apply(&merged_state, "eth1").is_absent());
}

#[test]
fn test_bridge_port_absent_apply() {
    let mut provider = new_provider(BR0_WITH_TWO_PORTS);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  state: absent
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert_eq!(get_iface(&state, "br0").ports(), Some(vec!["eth2"]));
    let eth1 = get_iface(&state, "eth1");
    assert_eq!(eth1.base_iface().state, InterfaceState::Down);
    assert_eq!(eth1.base_iface().controller, None);
    assert_eq!(
        get_iface(&state, "eth2").base_iface().controller.as_deref(),
        Some("br0")
    );
}

#[test]
fn test_bridge_absent_keeps_ports_untouched() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: absent
",
        BR0_WITH_TWO_PORTS,
    )
    .unwrap();

    assert!(for_apply(&merged_state, "br0").is_absent());
    let eth1 = merged_state.interfaces.kernel_ifaces.get("eth1").unwrap();
    assert!(!eth1.is_changed());
}

#[test]
fn test_bridge_keep_undeclared_existing_port() {
    let current = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
";
    let desired = r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth1
";
    let merged_state = merge_yaml(desired, current).unwrap();
    let eth1 = for_apply(&merged_state, "eth1");
    assert_eq!(eth1.base_iface().controller.as_deref(), Some("br0"));
    assert_eq!(
        eth1.base_iface().controller_type,
        Some(InterfaceType::LinuxBridge)
    );

    let mut provider = new_provider(current);
    apply_yaml(&mut provider, desired).unwrap();
    let state = show(&mut provider);
    assert_eq!(get_iface(&state, "br0").ports(), Some(vec!["eth1"]));
}

#[test]
fn test_bridge_port_not_exist() {
    let result = merge_yaml(
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth9
",
        "{}",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_bridge_port_options_copied_to_port() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth1
      stp-priority: 32
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
",
    )
    .unwrap();
    let eth1 = for_apply(&merged_state, "eth1");
    let port_opts = eth1.base_iface().port_options.as_ref().unwrap();
    assert_eq!(port_opts["stp-priority"], serde_json::json!(32));
}

#[test]
fn test_bridge_port_cannot_hold_ip() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth1
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
",
    )
    .unwrap();
    assert!(for_apply(&merged_state, "eth1").base_iface().ipv4.is_none());
}

#[test]
fn test_bridge_stringlized_options() {
    let iface: LinuxBridgeInterface = serde_yaml::from_str(
        r#"---
name: br0
type: linux-bridge
state: up
bridge:
  options:
    mac-ageing-time: "300"
    multicast-snooping: "true"
  port:
  - name: eth1
    stp-path-cost: "100"
    stp-priority: "32"
"#,
    )
    .unwrap();
    let br_conf = iface.bridge.as_ref().unwrap();
    let opts = br_conf.options.as_ref().unwrap();
    assert_eq!(opts.mac_ageing_time, Some(300));
    assert_eq!(opts.multicast_snooping, Some(true));
    let port_conf = &br_conf.port.as_ref().unwrap()[0];
    assert_eq!(port_conf.stp_path_cost, Some(100));
    assert_eq!(port_conf.stp_priority, Some(32));
}

#[test]
fn test_bridge_add_port_to_existing_bridge() {
    let mut provider = new_provider(
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth1
- name: eth1
  type: ethernet
  state: up
  controller: br0
- name: eth2
  type: ethernet
  state: up
",
    );
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth2
  type: ethernet
  state: up
  controller: br0
",
    )
    .unwrap();
    let state = show(&mut provider);
    if let Interface::LinuxBridge(br) = get_iface(&state, "br0") {
        let mut ports = br.ports().unwrap_or_default();
        ports.sort_unstable();
        assert_eq!(ports, vec!["eth1", "eth2"]);
    } else {
        panic!("br0 should be linux bridge");
    }
}

fn trunk_merge(trunk_tags_yaml: &str) -> Result<(), crate::NetstateError> {
    merge_yaml(
        &format!(
            r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: eth1
      vlan:
        mode: trunk
        trunk-tags:
{trunk_tags_yaml}
    - name: eth2
"
        ),
        BR0_WITH_TWO_PORTS,
    )
    .map(|_| ())
}

#[test]
fn test_bridge_trunk_tags_with_id_range_apply_and_verify() {
    let mut provider = new_provider(BR0_WITH_TWO_PORTS);
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
      vlan:
        mode: trunk
        enable-native: true
        tag: 100
        trunk-tags:
        - id-range:
            min: 200
            max: 299
        - id: 101
    - name: eth2
",
    )
    .unwrap();

    let state = show(&mut provider);
    let vlan = if let Interface::LinuxBridge(br) = get_iface(&state, "br0") {
        br.bridge
            .as_ref()
            .and_then(|b| b.port.as_ref())
            .and_then(|ports| ports.iter().find(|p| p.name == "eth1"))
            .and_then(|p| p.vlan.clone())
            .unwrap()
    } else {
        panic!("br0 should be linux bridge");
    };
    assert_eq!(vlan.mode, Some(BridgePortVlanMode::Trunk));
    assert_eq!(vlan.tag, Some(100));
    let mut ranges: Vec<(u16, u16)> = vlan
        .trunk_tags
        .unwrap_or_default()
        .iter()
        .map(BridgePortTrunkTag::get_vlan_tag_range)
        .collect();
    ranges.sort_unstable();
    assert_eq!(ranges, vec![(101, 101), (200, 299)]);
}

#[test]
fn test_bridge_trunk_tags_overlapping_range() {
    let result = trunk_merge(
        r"        - id: 250
        - id-range:
            min: 200
            max: 299",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_bridge_trunk_tags_reversed_range() {
    let result = trunk_merge(
        r"        - id-range:
            min: 300
            max: 200",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_bridge_trunk_tags_adjacent_ranges() {
    assert!(trunk_merge(
        r"        - id-range:
            min: 100
            max: 199
        - id-range:
            min: 200
            max: 299
        - id: 4094",
    )
    .is_ok());
}

#[test]
fn test_bridge_trunk_tag_over_max_vlan_id() {
    let result = trunk_merge(
        r"        - id-range:
            min: 4000
            max: 4095",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}
