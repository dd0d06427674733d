// SPDX-License-Identifier: Apache-2.0

use crate::{
    state::PASSWORD_HID, unit_tests::testlib::merge_yaml, ErrorKind,
    Interface, InterfaceType, NetworkState,
};

const ETH1_UP: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
";

fn macsec_yaml(mka: &str) -> String {
    format!(
        r"---
interfaces:
- name: macsec0
  type: macsec
  state: up
  macsec:
    base-iface: eth1
    encrypt: true
    port: 0
    validation: strict
    send-sci: true
{mka}"
    )
}

#[test]
fn test_macsec_cak_without_ckn() {
    let result = merge_yaml(
        &macsec_yaml("    mka-cak: 50b71a8ef0bd5751ea76de6d6c98c03a\n"),
        ETH1_UP,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.msg().contains("both set or both unset"));
    }
}

#[test]
fn test_macsec_ckn_odd_length() {
    let result = merge_yaml(
        &macsec_yaml(
            "    mka-cak: 50b71a8ef0bd5751ea76de6d6c98c03a\n    \
            mka-ckn: f2b\n",
        ),
        ETH1_UP,
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        assert!(e.msg().contains("mka-ckn"));
    }
}

#[test]
fn test_macsec_without_mka() {
    assert!(merge_yaml(&macsec_yaml(""), ETH1_UP).is_ok());
}

#[test]
fn test_macsec_hide_cak() {
    let mut state: NetworkState = serde_yaml::from_str(&macsec_yaml(
        "    mka-cak: 50b71a8ef0bd5751ea76de6d6c98c03a\n    \
        mka-ckn: f2b4297d39da7330910a74abc0449feb\n",
    ))
    .unwrap();
    state.hide_secrets();
    let iface = state
        .interfaces
        .get_iface("macsec0", InterfaceType::MacSec)
        .unwrap();
    if let Interface::MacSec(iface) = iface {
        let conf = iface.macsec.as_ref().unwrap();
        assert_eq!(conf.mka_cak.as_deref(), Some(PASSWORD_HID));
        assert_eq!(
            conf.mka_ckn.as_deref(),
            Some("f2b4297d39da7330910a74abc0449feb")
        );
    } else {
        panic!("Expecting macsec interface");
    }
}
