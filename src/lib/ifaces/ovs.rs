// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::{
    BaseInterface, BridgePortVlanConfig, ErrorKind, Interface, InterfaceState,
    InterfaceType, MergedInterface, NetstateError, OvsDbIfaceConfig,
};

const KERNEL_IFACE_NAME_MAX_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// OpenvSwitch bridge interface. Example yaml output of [crate::NetworkState]
/// with an OVS bridge:
/// ```yaml
/// ---
/// interfaces:
/// - name: br0
///   type: ovs-interface
///   state: up
///   ipv4:
///     address:
///     - ip: 192.0.2.252
///       prefix-length: 24
///     dhcp: false
///     enabled: true
/// - name: br0
///   type: ovs-bridge
///   state: up
///   bridge:
///     port:
///     - name: br0
///     - name: eth1
/// ```
pub struct OvsBridgeInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<OvsBridgeConfig>,
}

impl Default for OvsBridgeInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::OvsBridge;
        Self { base, bridge: None }
    }
}

impl OvsBridgeInterface {
    pub fn new() -> Self {
        Self::default()
    }

    // Return None when desire state does not mention ports.
    // Members of link aggregation are listed instead of the aggregation
    // itself.
    pub(crate) fn ports(&self) -> Option<Vec<&str>> {
        self.bridge
            .as_ref()
            .and_then(|br_conf| br_conf.ports.as_ref())
            .map(|port_confs| {
                let mut port_names = Vec::new();
                for port_conf in port_confs {
                    if let Some(bond_conf) = &port_conf.bond {
                        port_names.extend(bond_conf.ports());
                    } else {
                        port_names.push(port_conf.name.as_str());
                    }
                }
                port_names
            })
    }

    pub(crate) fn port_confs(&self) -> Vec<&OvsBridgePortConfig> {
        self.bridge
            .as_ref()
            .and_then(|br_conf| br_conf.ports.as_deref())
            .unwrap_or_default()
            .iter()
            .collect()
    }

    pub(crate) fn allow_extra_patch_ports(&self) -> bool {
        self.bridge.as_ref().and_then(|b| b.allow_extra_patch_ports)
            == Some(true)
    }

    // A member of link aggregation gets the port configuration of the
    // aggregation it belongs to.
    pub(crate) fn get_port_conf(
        &self,
        port_name: &str,
    ) -> Option<&OvsBridgePortConfig> {
        self.port_confs().into_iter().find(|port_conf| {
            if let Some(bond_conf) = port_conf.bond.as_ref() {
                bond_conf.ports().contains(&port_name)
            } else {
                port_conf.name == port_name
            }
        })
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if !is_desired {
            return Ok(());
        }
        let br_name = self.base.name.clone();
        let mut seen: HashSet<String> = HashSet::new();
        for port_conf in self
            .bridge
            .as_mut()
            .and_then(|b| b.ports.as_mut())
            .into_iter()
            .flatten()
        {
            if let Some(vlan_conf) = port_conf.vlan.as_mut() {
                vlan_conf.sanitize(port_conf.name.as_str())?;
            }
            if let Some(bond_conf) = port_conf.bond.as_ref() {
                let member_count = bond_conf.ports().len();
                if bond_conf.ports.is_some() && member_count < 2 {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "OVS bond {} of bridge {br_name} has {} port, \
                            at least 2 ports are required",
                            port_conf.name, member_count
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                for member in bond_conf.ports() {
                    if !seen.insert(member.to_string()) {
                        return Err(duplicate_port_error(member, &br_name));
                    }
                }
            } else if !seen.insert(port_conf.name.clone()) {
                return Err(duplicate_port_error(&port_conf.name, &br_name));
            }
        }
        Ok(())
    }

    // Port entry without VLAN section inherits the VLAN of current port
    // with the same name.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        if desired.ports().is_none() {
            return;
        }
        let cur_port_confs: HashMap<&str, &OvsBridgePortConfig> = current
            .port_confs()
            .into_iter()
            .map(|p| (p.name.as_str(), p))
            .collect();
        for port_conf in self
            .bridge
            .as_mut()
            .and_then(|b| b.ports.as_mut())
            .into_iter()
            .flatten()
        {
            if let Some(cur_port_conf) =
                cur_port_confs.get(port_conf.name.as_str())
            {
                if port_conf.vlan.is_none() {
                    port_conf.vlan.clone_from(&cur_port_conf.vlan);
                }
                if port_conf.ovsdb.is_none() {
                    port_conf.ovsdb.clone_from(&cur_port_conf.ovsdb);
                }
            }
        }
    }

    pub(crate) fn remove_port(&mut self, port_name: &str) {
        if let Some(port_confs) =
            self.bridge.as_mut().and_then(|b| b.ports.as_mut())
        {
            port_confs.retain(|p| p.name != port_name);
            for bond_conf in
                port_confs.iter_mut().filter_map(|p| p.bond.as_mut())
            {
                if let Some(members) = bond_conf.ports.as_mut() {
                    members.retain(|m| m.name != port_name);
                }
            }
        }
    }

    pub(crate) fn add_port(&mut self, port_name: &str) {
        if self
            .ports()
            .map(|ports| ports.contains(&port_name))
            .unwrap_or_default()
        {
            return;
        }
        let br_conf = self.bridge.get_or_insert_with(OvsBridgeConfig::new);
        br_conf
            .ports
            .get_or_insert_with(Vec::new)
            .push(OvsBridgePortConfig {
                name: port_name.to_string(),
                ..Default::default()
            });
    }

    pub(crate) fn change_port_name(&mut self, org_name: &str, new_name: &str) {
        for port_conf in self
            .bridge
            .as_mut()
            .and_then(|b| b.ports.as_mut())
            .into_iter()
            .flatten()
        {
            if let Some(bond_conf) = port_conf.bond.as_mut() {
                for member in bond_conf.ports.iter_mut().flatten() {
                    if member.name == org_name {
                        member.name = new_name.to_string();
                    }
                }
            } else if port_conf.name == org_name {
                port_conf.name = new_name.to_string();
            }
        }
    }

    // Bridge with no port would be purged by OVS daemon, an internal
    // interface with the same name as bridge is created instead.
    pub(crate) fn create_ovs_iface_for_empty_ports(
        &mut self,
        is_new: bool,
    ) -> Option<OvsInterface> {
        let ports_empty = self.ports().map(|p| p.is_empty());
        if (is_new && ports_empty != Some(false)) || ports_empty == Some(true)
        {
            log::warn!(
                "OVS bridge {} cannot exist with empty port list, adding a \
                OVS internal interface with the same name",
                self.base.name.as_str()
            );
            let port_conf = OvsBridgePortConfig {
                name: self.base.name.clone(),
                ..Default::default()
            };
            let br_conf = self.bridge.get_or_insert_with(OvsBridgeConfig::new);
            br_conf.ports = Some(vec![port_conf]);
            Some(OvsInterface::new_with_name_and_ctrl(
                self.base.name.as_str(),
                self.base.name.as_str(),
            ))
        } else {
            None
        }
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        if let Some(port_confs) =
            self.bridge.as_mut().and_then(|b| b.ports.as_mut())
        {
            port_confs.sort_unstable_by(|a, b| a.name.cmp(&b.name));
            for port_conf in port_confs.iter_mut() {
                if let Some(members) =
                    port_conf.bond.as_mut().and_then(|b| b.ports.as_mut())
                {
                    members.sort_unstable_by(|a, b| a.name.cmp(&b.name));
                }
                if let Some(vlan_conf) = port_conf.vlan.as_mut() {
                    vlan_conf.pre_verify_cleanup();
                }
                if let Some(ovsdb) = port_conf.ovsdb.as_mut() {
                    ovsdb.pre_verify_cleanup();
                }
            }
        }
    }
}

fn duplicate_port_error(port_name: &str, br_name: &str) -> NetstateError {
    let e = NetstateError::new(
        ErrorKind::InvalidArgument,
        format!("Port {port_name} is listed twice in OVS bridge {br_name}"),
    );
    log::error!("{}", e);
    e
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct OvsBridgeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OvsBridgeOptions>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "port",
        alias = "ports"
    )]
    /// Serialize to 'port'. Deserialize from `port` or `ports`.
    pub ports: Option<Vec<OvsBridgePortConfig>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Allow patch ports not mentioned in port list to stay attached and
    /// skip the peer check of patch interfaces on this bridge.
    pub allow_extra_patch_ports: Option<bool>,
}

impl OvsBridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct OvsBridgeOptions {
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub stp: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub rstp: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Deserialize and serialize from/to `mcast-snooping-enable`.
    pub mcast_snooping_enable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Deserialize and serialize from/to `fail-mode`.
    pub fail_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Set to `netdev` for DPDK.
    pub datapath: Option<String>,
}

impl OvsBridgeOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct OvsBridgePortConfig {
    pub name: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "link-aggregation"
    )]
    pub bond: Option<OvsBridgeBondConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<BridgePortVlanConfig>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "ovs-db")]
    pub ovsdb: Option<OvsDbIfaceConfig>,
}

impl OvsBridgePortConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// OpenvSwitch internal interface. Example yaml output of [crate::NetworkState]
/// with an DPDK enabled OVS interface:
/// ```yml
/// ---
/// interfaces:
/// - name: ovs0
///   type: ovs-interface
///   state: up
///   dpdk:
///     devargs: "0000:af:00.1"
///     rx-queue: 100
/// - name: br0
///   type: ovs-bridge
///   state: up
///   bridge:
///     options:
///       datapath: "netdev"
///     port:
///     - name: ovs0
/// ovs-db:
///   other_config:
///     dpdk-init: "true"
/// ```
///
/// The yaml example of OVS patching:
/// ```yml
/// ---
/// interfaces:
/// - name: patch0
///   type: ovs-interface
///   state: up
///   patch:
///     peer: patch1
/// - name: ovs-br0
///   type: ovs-bridge
///   state: up
///   bridge:
///     port:
///     - name: patch0
/// - name: patch1
///   type: ovs-interface
///   state: up
///   patch:
///     peer: patch0
/// - name: ovs-br1
///   type: ovs-bridge
///   state: up
///   bridge:
///     port:
///     - name: patch1
/// ```
pub struct OvsInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<OvsPatchConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpdk: Option<OvsDpdkConfig>,
}

impl Default for OvsInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::OvsInterface;
        Self {
            base,
            patch: None,
            dpdk: None,
        }
    }
}

impl OvsInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn new_with_name_and_ctrl(
        iface_name: &str,
        ctrl_name: &str,
    ) -> Self {
        let mut iface = Self::new();
        iface.base.name = iface_name.to_string();
        iface.base.controller = Some(ctrl_name.to_string());
        iface.base.controller_type = Some(InterfaceType::OvsBridge);
        iface
    }

    pub(crate) fn is_patch(&self) -> bool {
        self.patch.is_some()
    }

    pub(crate) fn patch_peer(&self) -> Option<&str> {
        self.patch.as_ref().map(|p| p.peer.as_str())
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if is_desired && self.base.name.len() > KERNEL_IFACE_NAME_MAX_LEN {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "OVS interface name {} exceeds the kernel limit of \
                    {KERNEL_IFACE_NAME_MAX_LEN} characters",
                    self.base.name
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        if let Some(patch_conf) = self.patch.as_ref() {
            if patch_conf.peer.is_empty() {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "OVS patch interface {} has no peer defined",
                        self.base.name
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
            if is_desired {
                if self.base.mtu.is_some() {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "OVS patch interface is not allowed to hold MTU \
                            configuration, interface name {}",
                            self.base.name.as_str()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                if self.base.is_ipv4_enabled() || self.base.is_ipv6_enabled()
                {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "OVS patch interface is not allowed to hold IP \
                            configuration, interface name {}",
                            self.base.name.as_str()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // Patch interface never holds MTU, the one merged from current is
    // only kernel noise.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        if self.is_patch() {
            self.base.mtu = None;
        }
        if desired.dpdk.is_none() {
            self.dpdk.clone_from(&current.dpdk);
        }
    }

    pub(crate) fn pre_edit_cleanup(&mut self) {
        if self.is_patch() {
            self.base.mtu = None;
        }
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        if self.is_patch() {
            self.base.mtu = None;
            self.base.ipv4 = None;
            self.base.ipv6 = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// The example yaml output of OVS bond:
/// ```yml
/// ---
/// interfaces:
/// - name: eth1
///   type: ethernet
///   state: up
/// - name: eth2
///   type: ethernet
///   state: up
/// - name: br0
///   type: ovs-bridge
///   state: up
///   bridge:
///     port:
///     - name: veth1
///     - name: ovs0
///     - name: bond1
///       link-aggregation:
///         mode: balance-slb
///         port:
///           - name: eth2
///           - name: eth1
/// ```
pub struct OvsBridgeBondConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<OvsBridgeBondMode>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "port",
        alias = "ports"
    )]
    /// Serialize to 'port'. Deserialize from `port` or `ports`.
    pub ports: Option<Vec<OvsBridgeBondPortConfig>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub bond_downdelay: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub bond_updelay: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "ovs-db")]
    pub ovsdb: Option<OvsDbIfaceConfig>,
}

impl OvsBridgeBondConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ports(&self) -> Vec<&str> {
        self.ports
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct OvsBridgeBondPortConfig {
    pub name: String,
}

impl OvsBridgeBondPortConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum OvsBridgeBondMode {
    /// Deserialize and serialize from/to `active-backup`.
    ActiveBackup,
    /// Deserialize and serialize from/to `balance-slb`.
    #[default]
    BalanceSlb,
    /// Deserialize and serialize from/to `balance-tcp`.
    BalanceTcp,
    /// Deserialize and serialize from/to `lacp`.
    Lacp,
}

impl TryFrom<&str> for OvsBridgeBondMode {
    type Error = NetstateError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active-backup" => Ok(Self::ActiveBackup),
            "balance-slb" => Ok(Self::BalanceSlb),
            "balance-tcp" => Ok(Self::BalanceTcp),
            "lacp" => Ok(Self::Lacp),
            _ => Err(NetstateError::new(
                ErrorKind::InvalidArgument,
                format!("Unsupported OVS Bond mode {value}"),
            )),
        }
    }
}

impl std::fmt::Display for OvsBridgeBondMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::ActiveBackup => "active-backup",
                Self::BalanceSlb => "balance-slb",
                Self::BalanceTcp => "balance-tcp",
                Self::Lacp => "lacp",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct OvsPatchConfig {
    #[serde(default)]
    pub peer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
#[non_exhaustive]
pub struct OvsDpdkConfig {
    pub devargs: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub rx_queue: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    /// Number of receive queue descriptors, must be power of 2.
    pub n_rxq_desc: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    /// Number of transmit queue descriptors, must be power of 2.
    pub n_txq_desc: Option<u32>,
}

impl OvsDpdkConfig {
    pub(crate) fn sanitize(
        &self,
        iface_name: &str,
    ) -> Result<(), NetstateError> {
        for (prop, value) in
            [("n_rxq_desc", self.n_rxq_desc), ("n_txq_desc", self.n_txq_desc)]
        {
            if let Some(v) = value {
                if v == 0 || v > 4096 || !v.is_power_of_two() {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "OVS DPDK interface {iface_name} has invalid \
                            {prop} {v}, should be power of 2 within \
                            range [1, 4096]"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

impl MergedInterface {
    // Patch peer should be a patch interface pointing back to this one.
    pub(crate) fn validate_ovs_patch_peer(
        &self,
        peer_iface: Option<&Interface>,
        allow_extra_patch_ports: bool,
    ) -> Result<(), NetstateError> {
        let apply_iface = match self.for_apply.as_ref() {
            Some(Interface::OvsInterface(i))
                if i.base.state == InterfaceState::Up =>
            {
                i
            }
            _ => return Ok(()),
        };
        if let Some(dpdk_conf) = apply_iface.dpdk.as_ref() {
            dpdk_conf.sanitize(apply_iface.base.name.as_str())?;
        }
        let peer_name = match apply_iface.patch_peer() {
            Some(p) => p,
            None => return Ok(()),
        };
        if allow_extra_patch_ports {
            return Ok(());
        }
        let peer_is_valid = match peer_iface {
            Some(Interface::OvsInterface(peer)) => {
                peer.patch_peer() == Some(apply_iface.base.name.as_str())
            }
            _ => false,
        };
        if !peer_is_valid {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "OVS patch interface {} has peer {peer_name} which is \
                    not an OVS patch interface pointing back to it",
                    apply_iface.base.name
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        Ok(())
    }
}
