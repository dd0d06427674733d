// SPDX-License-Identifier: Apache-2.0

use crate::{unit_tests::testlib::merge_yaml, ErrorKind, HsrInterface};

const ETHS_UP: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
- name: eth2
  type: ethernet
  state: up
";

#[test]
fn test_hsr_same_port_twice() {
    let result = merge_yaml(
        r"---
interfaces:
- name: hsr0
  type: hsr
  state: up
  hsr:
    port1: eth1
    port2: eth1
    multicast-spec: 40
    protocol: prp
",
        ETHS_UP,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_hsr_supervision_address_ignored_in_desired() {
    let mut iface: HsrInterface = serde_yaml::from_str(
        r"---
name: hsr0
type: hsr
state: up
hsr:
  port1: eth1
  port2: eth2
  multicast-spec: 40
  protocol: hsr
  supervision-address: 01:15:4e:00:01:28
",
    )
    .unwrap();
    iface.sanitize(true).unwrap();
    assert_eq!(iface.hsr.unwrap().supervision_address, None);
}

#[test]
fn test_hsr_supervision_address_upper_case_in_current() {
    let mut iface: HsrInterface = serde_yaml::from_str(
        r"---
name: hsr0
type: hsr
state: up
hsr:
  port1: eth1
  port2: eth2
  multicast-spec: 40
  protocol: hsr
  supervision-address: 01:15:4e:00:01:28
",
    )
    .unwrap();
    iface.sanitize(false).unwrap();
    assert_eq!(
        iface.hsr.unwrap().supervision_address.as_deref(),
        Some("01:15:4E:00:01:28")
    );
}
