// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::{
    unit_tests::testlib::{
        apply_yaml, for_apply, get_iface, merge_yaml, new_provider, show,
    },
    ErrorKind, EthtoolConfig,
};

const ETH1: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethtool:
    pause:
      autoneg: false
      rx: true
      tx: true
    feature:
      rx-gro: true
      rx-lro: false
";

fn ethtool_of(iface: &crate::Interface) -> &EthtoolConfig {
    iface.base_iface().ethtool.as_ref().unwrap()
}

#[test]
fn test_ethtool_feature_alias_renamed() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethtool:
    feature:
      gro: false
      rx-checksumming: true
      tso: true
",
        ETH1,
    )
    .unwrap();
    let features = ethtool_of(for_apply(&merged_state, "eth1"))
        .feature
        .clone()
        .unwrap();
    let expected: BTreeMap<String, bool> = [
        ("rx-checksum", true),
        ("rx-gro", false),
        ("rx-lro", false),
        ("tx-tcp-segmentation", true),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    assert_eq!(features, expected);
}

#[test]
fn test_ethtool_feature_alias_conflict() {
    let result = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethtool:
    feature:
      rx: true
      rx-checksum: false
",
        ETH1,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ethtool_feature_alias_same_value() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethtool:
    feature:
      lro: true
      rx-lro: true
",
        ETH1,
    )
    .unwrap();
    let features = ethtool_of(for_apply(&merged_state, "eth1"))
        .feature
        .clone()
        .unwrap();
    assert_eq!(features.get("rx-lro"), Some(&true));
    assert!(!features.contains_key("lro"));
}

#[test]
fn test_ethtool_pause_autoneg_drops_rx_tx() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethtool:
    pause:
      autoneg: true
      rx: false
",
        ETH1,
    )
    .unwrap();
    let pause = ethtool_of(for_apply(&merged_state, "eth1")).pause.unwrap();
    assert_eq!(pause.autoneg, Some(true));
    assert_eq!(pause.rx, None);
    assert_eq!(pause.tx, None);
}

#[test]
fn test_ethtool_pause_without_autoneg_merged() {
    let merged_state = merge_yaml(
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethtool:
    pause:
      tx: false
",
        ETH1,
    )
    .unwrap();
    let pause = ethtool_of(for_apply(&merged_state, "eth1")).pause.unwrap();
    assert_eq!(pause.autoneg, Some(false));
    assert_eq!(pause.rx, Some(true));
    assert_eq!(pause.tx, Some(false));
}

#[test]
fn test_ethtool_apply_and_verify() {
    let mut provider = new_provider(ETH1);
    apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  ethtool:
    pause:
      autoneg: true
    feature:
      gro: false
    ring:
      rx: 256
      tx: 512
    coalesce:
      adaptive-rx: true
      rx-usecs: 100
",
    )
    .unwrap();

    let state = show(&mut provider);
    let ethtool = ethtool_of(get_iface(&state, "eth1"));
    let pause = ethtool.pause.unwrap();
    assert_eq!(pause.autoneg, Some(true));
    assert_eq!(pause.rx, None);
    let features = ethtool.feature.as_ref().unwrap();
    assert_eq!(features.get("rx-gro"), Some(&false));
    assert_eq!(features.get("rx-lro"), Some(&false));
    let ring = ethtool.ring.unwrap();
    assert_eq!(ring.rx, Some(256));
    assert_eq!(ring.tx, Some(512));
    let coalesce = ethtool.coalesce.unwrap();
    assert_eq!(coalesce.adaptive_rx, Some(true));
    assert_eq!(coalesce.rx_usecs, Some(100));
}

#[test]
fn test_ethtool_unknown_ring_property() {
    let result = serde_yaml::from_str::<crate::NetworkState>(
        r"---
interfaces:
- name: eth1
  type: ethernet
  ethtool:
    ring:
      rx-max: 4096
",
    );
    assert!(result.is_err());
}
