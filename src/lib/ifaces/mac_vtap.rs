// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    BaseInterface, InterfaceType, MacVlanConfig, MacVlanMode, NetstateError,
};

/// MAC VTAP shares every setting with MAC VLAN.
pub type MacVtapConfig = MacVlanConfig;
pub type MacVtapMode = MacVlanMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// Tap device on top of MAC VLAN, used to hand a link to a virtual
/// machine.
/// ```yaml
/// interfaces:
/// - name: mac0
///   type: mac-vtap
///   state: up
///   mac-vtap:
///     base-iface: eth1
///     mode: passthru
///     promiscuous: true
/// ```
pub struct MacVtapInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mac-vtap")]
    pub mac_vtap: Option<MacVtapConfig>,
}

impl Default for MacVtapInterface {
    fn default() -> Self {
        Self {
            base: BaseInterface {
                iface_type: InterfaceType::MacVtap,
                ..BaseInterface::new()
            },
            mac_vtap: None,
        }
    }
}

impl MacVtapInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        match self.mac_vtap.as_ref() {
            Some(conf) if is_desired => conf.validate(&self.base.name),
            _ => Ok(()),
        }
    }

    pub(crate) fn parent(&self) -> Option<&str> {
        self.mac_vtap.as_ref().map(|conf| conf.base_iface.as_str())
    }

    pub(crate) fn change_parent_name(&mut self, name: &str) {
        if let Some(conf) = self.mac_vtap.as_mut() {
            conf.base_iface = name.to_string();
        }
    }
}
