// SPDX-License-Identifier: Apache-2.0

use crate::{
    ifaces::sriov::parse_sriov_vf_naming,
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    ErrorKind, Interface, InterfaceType, SrIovConfig,
};

const PF_ONLY: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
";

const PF_WITH_TWO_VFS: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 2
";

fn sriov_conf(iface: &Interface) -> &SrIovConfig {
    match iface {
        Interface::Ethernet(i) => {
            i.ethernet.as_ref().and_then(|e| e.sr_iov.as_ref()).unwrap()
        }
        _ => panic!("Expecting ethernet interface, got {iface:?}"),
    }
}

#[test]
fn test_parse_sriov_vf_naming() {
    assert_eq!(parse_sriov_vf_naming("eth1").unwrap(), None);
    assert_eq!(
        parse_sriov_vf_naming("sriov:eth1:3").unwrap(),
        Some(("eth1", 3))
    );
    for invalid in ["sriov:eth1", "sriov::1", "sriov:eth1:a"] {
        let result = parse_sriov_vf_naming(invalid);
        assert!(result.is_err(), "{invalid} should be invalid");
        if let Err(e) = result {
            assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        }
    }
}

#[test]
fn test_sriov_create_vfs() {
    let mut provider = new_provider(PF_ONLY);
    apply_yaml(&mut provider, PF_WITH_TWO_VFS).unwrap();

    let state = show(&mut provider);
    let sriov = sriov_conf(get_iface(&state, "eth1"));
    assert_eq!(sriov.total_vfs, Some(2));
    assert_eq!(sriov.get_vf_iface_name(0), Some("eth1v0"));
    assert_eq!(sriov.get_vf_iface_name(1), Some("eth1v1"));
    assert!(state
        .interfaces
        .get_iface("eth1v1", InterfaceType::Ethernet)
        .is_some());
}

#[test]
fn test_sriov_decrease_total_vfs() {
    let mut provider = new_provider(PF_ONLY);
    apply_yaml(&mut provider, PF_WITH_TWO_VFS).unwrap();
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 1
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert!(state
        .interfaces
        .get_iface("eth1v0", InterfaceType::Ethernet)
        .is_some());
    assert!(state
        .interfaces
        .get_iface("eth1v1", InterfaceType::Ethernet)
        .is_none());
}

#[test]
fn test_sriov_vf_reference_in_same_desired_state() {
    let mut provider = new_provider(PF_ONLY);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 2
- name: sriov:eth1:0
  type: ethernet
  state: up
  mtu: 9000
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: active-backup
    port:
    - sriov:eth1:1
- name: vlan10
  type: vlan
  state: up
  vlan:
    base-iface: sriov:eth1:0
    id: 10
",
    )
    .unwrap();

    let state = show(&mut provider);
    assert_eq!(get_iface(&state, "eth1v0").base_iface().mtu, Some(9000));
    assert_eq!(get_iface(&state, "bond99").ports(), Some(vec!["eth1v1"]));
    assert_eq!(
        get_iface(&state, "eth1v1").base_iface().controller.as_deref(),
        Some("bond99")
    );
    assert_eq!(get_iface(&state, "vlan10").parent(), Some("eth1v0"));
}

#[test]
fn test_sriov_vf_settings_merged_by_id() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      vfs:
      - id: 1
        trust: true
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 2
      vfs:
      - id: 0
        spoof-check: true
      - id: 1
        mac-address: 00:11:22:33:44:55
",
    )
    .unwrap();
    let merged = &merged_state.interfaces.kernel_ifaces["eth1"].merged;
    let vfs = sriov_conf(merged).vfs.as_deref().unwrap();
    assert_eq!(vfs.len(), 2);
    assert_eq!(vfs[0].spoof_check, Some(true));
    assert_eq!(vfs[1].trust, Some(true));
    assert_eq!(vfs[1].mac_address.as_deref(), Some("00:11:22:33:44:55"));
}

#[test]
fn test_sriov_vf_id_out_of_range() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 2
      vfs:
      - id: 2
        trust: true
",
        PF_ONLY,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_sriov_invalid_vf_vlan_id() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 2
      vfs:
      - id: 0
        vlan-id: 4095
",
        PF_ONLY,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_sriov_lower_total_vfs_drops_inherited_vfs() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 1
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 2
      vfs:
      - id: 0
        trust: true
      - id: 1
        trust: false
",
    )
    .unwrap();

    let sriov = sriov_conf(for_apply(&merged_state, "eth1"));
    assert_eq!(sriov.total_vfs, Some(1));
    let vfs = sriov.vfs.as_deref().unwrap();
    assert_eq!(vfs.len(), 1);
    assert_eq!(vfs[0].id, 0);
    assert_eq!(vfs[0].trust, Some(true));
}

#[test]
fn test_sriov_desired_vf_beyond_lowered_total_vfs() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 1
      vfs:
      - id: 1
        trust: true
",
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethernet:
    sr-iov:
      total-vfs: 2
      vfs:
      - id: 0
      - id: 1
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}
