// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{BaseInterface, ErrorKind, InterfaceType, NetstateError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// MAC VLAN interface stacked on `base-iface`, holding its own MAC address.
/// ```yaml
/// interfaces:
/// - name: mac0
///   type: mac-vlan
///   state: up
///   mac-vlan:
///     base-iface: eth1
///     mode: vepa
///     promiscuous: true
/// ```
pub struct MacVlanInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mac-vlan")]
    pub mac_vlan: Option<MacVlanConfig>,
}

impl Default for MacVlanInterface {
    fn default() -> Self {
        Self {
            base: BaseInterface {
                iface_type: InterfaceType::MacVlan,
                ..BaseInterface::new()
            },
            mac_vlan: None,
        }
    }
}

impl MacVlanInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        match self.mac_vlan.as_ref() {
            Some(conf) if is_desired => conf.validate(&self.base.name),
            _ => Ok(()),
        }
    }

    pub(crate) fn parent(&self) -> Option<&str> {
        self.mac_vlan.as_ref().map(|conf| conf.base_iface.as_str())
    }

    pub(crate) fn change_parent_name(&mut self, name: &str) {
        if let Some(conf) = self.mac_vlan.as_mut() {
            conf.base_iface = name.to_string();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Settings shared by MAC VLAN and MAC VTAP.
pub struct MacVlanConfig {
    pub base_iface: String,
    pub mode: MacVlanMode,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "promiscuous",
        alias = "accept-all-mac",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Accept all MAC addresses. Shown as `promiscuous`, `accept-all-mac`
    /// is accepted on input. Only passthru mode may disable it.
    pub accept_all_mac: Option<bool>,
}

impl MacVlanConfig {
    pub(crate) fn validate(
        &self,
        iface_name: &str,
    ) -> Result<(), NetstateError> {
        if self.accept_all_mac != Some(false)
            || self.mode == MacVlanMode::Passthru
        {
            return Ok(());
        }
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Interface {iface_name} can only disable promiscuous \
                in passthru mode, but got mode {}",
                self.mode
            ),
        );
        log::error!("{}", e);
        Err(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum MacVlanMode {
    /// Traffic between sibling interfaces goes through the external switch.
    Vepa,
    /// Sibling interfaces talk to each other directly.
    Bridge,
    /// Sibling interfaces never talk to each other.
    Private,
    /// Single child taking over the parent.
    Passthru,
    /// Only accept frames from listed source MAC addresses.
    Source,
    #[default]
    Unknown,
}

impl std::fmt::Display for MacVlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Vepa => "vepa",
            Self::Bridge => "bridge",
            Self::Private => "private",
            Self::Passthru => "passthru",
            Self::Source => "source",
            Self::Unknown => "unknown",
        })
    }
}
