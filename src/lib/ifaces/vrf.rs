// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    BaseInterface, ErrorKind, Interface, InterfaceType, MergedInterface,
    NetstateError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// Linux kernel Virtual Routing and Forwarding(VRF) interface. The example
/// yaml output of a [crate::NetworkState] with a VRF interface would be:
/// ```yml
/// interfaces:
/// - name: vrf1
///   type: vrf
///   state: up
///   vrf:
///     port:
///     - eth1
///     - eth2
///     route-table-id: 100
/// ```
pub struct VrfInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrf: Option<VrfConfig>,
}

impl Default for VrfInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::Vrf;
        Self { base, vrf: None }
    }
}

impl VrfInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ports(&self) -> Option<Vec<&str>> {
        self.vrf
            .as_ref()
            .and_then(|vrf_conf| vrf_conf.port.as_ref())
            .map(|ports| ports.as_slice().iter().map(|p| p.as_str()).collect())
    }

    pub(crate) fn sanitize(
        &self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if !is_desired {
            return Ok(());
        }
        if let Some(ports) = self.ports() {
            if ports.contains(&self.base.name.as_str()) {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "VRF interface {} cannot hold itself as port",
                        self.base.name
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn table_id(&self) -> Option<u32> {
        self.vrf.as_ref().map(|v| v.table_id)
    }

    pub(crate) fn remove_port(&mut self, port_name: &str) {
        if let Some(ports) = self.vrf.as_mut().and_then(|c| c.port.as_mut()) {
            ports.retain(|p| p != port_name);
        }
    }

    pub(crate) fn add_port(&mut self, port_name: &str) {
        let ports = self
            .vrf
            .get_or_insert_with(VrfConfig::default)
            .port
            .get_or_insert_with(Vec::new);
        if !ports.iter().any(|p| p == port_name) {
            ports.push(port_name.to_string());
        }
    }

    pub(crate) fn change_port_name(&mut self, org_name: &str, new_name: &str) {
        if let Some(port) = self
            .vrf
            .as_mut()
            .and_then(|c| c.port.as_mut())
            .and_then(|ports| ports.iter_mut().find(|p| *p == org_name))
        {
            *port = new_name.to_string();
        }
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        self.base.mac_address = None;
        if self.base.accept_all_mac_addresses == Some(false) {
            self.base.accept_all_mac_addresses = None;
        }
        if let Some(ports) = self.vrf.as_mut().and_then(|c| c.port.as_mut()) {
            ports.sort();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct VrfConfig {
    #[serde(alias = "ports", skip_serializing_if = "Option::is_none")]
    pub port: Option<Vec<String>>,
    #[serde(
        rename = "route-table-id",
        default,
        deserialize_with = "crate::deserializer::u32_or_string"
    )]
    /// Route table ID of this VRF interface.
    /// Use 0 to preserve current `table_id`.
    pub table_id: u32,
}

impl MergedInterface {
    // Table ID 0 means keeping current one. New VRF must define it.
    pub(crate) fn post_inter_ifaces_process_vrf(
        &mut self,
    ) -> Result<(), NetstateError> {
        let cur_table_id = match self.current.as_ref() {
            Some(Interface::Vrf(cur)) => cur.table_id(),
            _ => None,
        };
        let iface_name = self.merged.name().to_string();
        if let Some(Interface::Vrf(apply_iface)) = self.for_apply.as_ref() {
            if apply_iface.table_id() == Some(0) {
                match cur_table_id {
                    Some(id) if id != 0 => {
                        self.apply_change(|iface| {
                            if let Interface::Vrf(vrf) = iface {
                                if let Some(conf) = vrf.vrf.as_mut() {
                                    conf.table_id = id;
                                }
                            }
                        });
                    }
                    _ => {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "Route table ID undefined or 0 is not \
                                allowed for new VRF interface {iface_name}"
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}
