// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{BaseInterface, ErrorKind, InterfaceType, NetstateError};

const VXLAN_ID_MAX: u32 = (1 << 24) - 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// Linux kernel Virtual extensible LAN interface. The example yaml output of
/// [crate::NetworkState] with a VXLAN interface would be:
/// ```yml
/// interfaces:
/// - name: eth1.10
///   type: vxlan
///   state: up
///   vxlan:
///     base-iface: eth1
///     id: 10
///     remote: 192.0.2.251
///     destination-port: 4790
/// ```
pub struct VxlanInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vxlan: Option<VxlanConfig>,
}

impl Default for VxlanInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::Vxlan;
        Self { base, vxlan: None }
    }
}

impl VxlanInterface {
    pub fn new() -> Self {
        Self::default()
    }

    // VXLAN without base interface is allowed, the kernel routes the
    // encapsulated packet.
    pub(crate) fn parent(&self) -> Option<&str> {
        self.vxlan
            .as_ref()
            .and_then(|cfg| cfg.base_iface.as_deref())
            .filter(|p| !p.is_empty())
    }

    pub(crate) fn change_parent_name(&mut self, name: &str) {
        if let Some(conf) = self.vxlan.as_mut() {
            conf.base_iface = Some(name.to_string());
        }
    }

    pub(crate) fn sanitize(
        &self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if let Some(conf) = self.vxlan.as_ref().filter(|_| is_desired) {
            if conf.id > VXLAN_ID_MAX {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "VXLAN ID {} of interface {} is out of range \
                        [0, {VXLAN_ID_MAX}]",
                        conf.id, self.base.name
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct VxlanConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_iface: Option<String>,
    #[serde(deserialize_with = "crate::deserializer::u32_or_string")]
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<std::net::IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<std::net::IpAddr>,
    #[serde(
        rename = "destination-port",
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub dst_port: Option<u16>,
}
