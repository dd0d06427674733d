// SPDX-License-Identifier: Apache-2.0

use crate::{
    ifaces::infiniband::parse_partition_name,
    unit_tests::testlib::{for_apply, merge_yaml},
    ErrorKind, InfiniBandInterface, InfiniBandMode, Interface,
};

const IB0: &str = r"---
interfaces:
- name: ib0
  type: infiniband
  state: up
  infiniband:
    mode: datagram
";

#[test]
fn test_ib_parse_partition_name() {
    assert_eq!(parse_partition_name("ib0.0080"), Some(("ib0", 0x80)));
    assert_eq!(parse_partition_name("ib0.8001"), Some(("ib0", 0x8001)));
    assert_eq!(parse_partition_name("ib0"), None);
    assert_eq!(parse_partition_name("ib0.80"), None);
    assert_eq!(parse_partition_name("ib0.ffff"), None);
}

#[test]
fn test_ib_partition_props_from_name() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: ib0.0080
  type: infiniband
  state: up
",
        IB0,
    )
    .unwrap();

    let ib_conf = match for_apply(&merged_state, "ib0.0080") {
        Interface::InfiniBand(i) => i.ib.as_ref().unwrap(),
        _ => panic!("ib0.0080 should be InfiniBand interface"),
    };
    assert_eq!(ib_conf.pkey, Some(0x80));
    assert_eq!(ib_conf.base_iface.as_deref(), Some("ib0"));
    assert_eq!(ib_conf.mode, InfiniBandMode::Datagram);
}

#[test]
fn test_ib_pkey_serialized_as_hex() {
    let mut iface: InfiniBandInterface = serde_yaml::from_str(
        r#"---
name: ib0.8001
type: infiniband
state: up
infiniband:
  mode: connected
  pkey: "0x8001"
"#,
    )
    .unwrap();
    iface.sanitize(true).unwrap();
    let ib_conf = iface.ib.as_ref().unwrap();
    assert_eq!(ib_conf.pkey, Some(0x8001));
    assert_eq!(ib_conf.base_iface.as_deref(), Some("ib0"));

    let value = serde_json::to_value(&iface).unwrap();
    assert_eq!(value["infiniband"]["pkey"], "0x8001");
    assert_eq!(value["infiniband"]["base-iface"], "ib0");
}

#[test]
fn test_ib_pkey_zero() {
    let result = merge_yaml(
        r"---
interfaces:
- name: ib0.0080
  type: infiniband
  state: up
  infiniband:
    base-iface: ib0
    pkey: 0
",
        IB0,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ib_partition_without_base_iface() {
    let mut iface: InfiniBandInterface = serde_yaml::from_str(
        r#"---
name: ipoib1
type: infiniband
state: up
infiniband:
  pkey: "0x80"
"#,
    )
    .unwrap();
    let result = iface.sanitize(true);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ib_as_bridge_port() {
    let result = merge_yaml(
        r"---
interfaces:
- name: br0
  type: linux-bridge
  state: up
  bridge:
    port:
    - name: ib0
",
        IB0,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ib_as_active_backup_bond_port() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: active-backup
    port:
    - ib0
",
        IB0,
    )
    .unwrap();
    assert_eq!(
        for_apply(&merged_state, "ib0")
            .base_iface()
            .controller
            .as_deref(),
        Some("bond99")
    );
}

#[test]
fn test_ib_as_round_robin_bond_port() {
    let result = merge_yaml(
        r"---
interfaces:
- name: bond99
  type: bond
  state: up
  link-aggregation:
    mode: balance-rr
    port:
    - ib0
",
        IB0,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}
