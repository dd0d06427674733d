// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{BaseInterface, ErrorKind, InterfaceType, NetstateError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// IPVLAN interface sharing the MAC address of `base-iface`.
/// ```yaml
/// interfaces:
/// - name: ipvlan0
///   type: ipvlan
///   state: up
///   ipvlan:
///     base-iface: eth1
///     mode: l2
///     vepa: true
/// ```
pub struct IpVlanInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipvlan: Option<IpVlanConfig>,
}

impl Default for IpVlanInterface {
    fn default() -> Self {
        Self {
            base: BaseInterface {
                iface_type: InterfaceType::IpVlan,
                ..BaseInterface::new()
            },
            ipvlan: None,
        }
    }
}

impl IpVlanInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        match self.ipvlan.as_ref() {
            Some(conf) if is_desired => conf.validate(&self.base.name),
            _ => Ok(()),
        }
    }

    pub(crate) fn parent(&self) -> Option<&str> {
        self.ipvlan.as_ref()?.base_iface.as_deref()
    }

    pub(crate) fn change_parent_name(&mut self, name: &str) {
        if let Some(conf) = self.ipvlan.as_mut() {
            conf.base_iface = Some(name.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct IpVlanConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_iface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<IpVlanMode>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Block traffic between siblings.
    pub private: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Send traffic between siblings through the external switch.
    pub vepa: Option<bool>,
}

impl IpVlanConfig {
    fn validate(&self, iface_name: &str) -> Result<(), NetstateError> {
        if self.private != Some(true) || self.vepa != Some(true) {
            return Ok(());
        }
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!(
                "IPVLAN interface {iface_name} cannot enable both private \
                and vepa flags"
            ),
        );
        log::error!("{}", e);
        Err(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum IpVlanMode {
    L2,
    #[default]
    L3,
    /// L3 with netfilter hooks applied.
    L3S,
}
