// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    BaseInterface, BridgePortVlanConfig, ErrorKind, InterfaceType,
    NetstateError, VlanProtocol,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Bridge interface provided by linux kernel.
///
/// When serializing or deserializing, the [BaseInterface] will
/// be flatted and [LinuxBridgeConfig] stored as `bridge` section. The yaml
/// output [crate::NetworkState] containing an example linux bridge interface:
/// ```yml
/// interfaces:
/// - name: br0
///   type: linux-bridge
///   state: up
///   bridge:
///     options:
///       group-addr: 01:80:C2:00:00:00
///       mac-ageing-time: 300
///       multicast-snooping: true
///       stp:
///         enabled: true
///         forward-delay: 15
///         hello-time: 2
///         max-age: 20
///         priority: 32768
///     port:
///     - name: eth1
///       stp-hairpin-mode: false
///       stp-path-cost: 100
///       stp-priority: 32
///       vlan:
///         mode: access
///         tag: 100
/// ```
pub struct LinuxBridgeInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<LinuxBridgeConfig>,
}

impl Default for LinuxBridgeInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::LinuxBridge;
        Self { base, bridge: None }
    }
}

impl LinuxBridgeInterface {
    pub fn new() -> Self {
        Self::default()
    }

    // Return None when desire state does not mention ports
    pub(crate) fn ports(&self) -> Option<Vec<&str>> {
        self.bridge
            .as_ref()
            .and_then(|br_conf| br_conf.port.as_ref())
            .map(|ports| ports.iter().map(|p| p.name.as_str()).collect())
    }

    pub(crate) fn get_port_conf(
        &self,
        port_name: &str,
    ) -> Option<&LinuxBridgePortConfig> {
        self.bridge
            .as_ref()
            .and_then(|br_conf| br_conf.port.as_ref())
            .and_then(|ports| ports.iter().find(|p| p.name == port_name))
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        let iface_name = self.base.name.clone();
        if let Some(opts) =
            self.bridge.as_mut().and_then(|b| b.options.as_mut())
        {
            if let Some(address) = opts.group_addr.as_mut() {
                address.make_ascii_uppercase();
            }
            if is_desired {
                // Runtime only
                opts.gc_timer = None;
                opts.hello_timer = None;
                if let Some(stp_opts) = opts.stp.as_mut() {
                    stp_opts.sanitize(iface_name.as_str())?;
                }
            }
        }
        if is_desired {
            let mut seen: HashSet<&str> = HashSet::new();
            for port_conf in self
                .bridge
                .as_mut()
                .and_then(|b| b.port.as_mut())
                .into_iter()
                .flatten()
            {
                if let Some(vlan_conf) = port_conf.vlan.as_mut() {
                    vlan_conf.sanitize(port_conf.name.as_str())?;
                }
            }
            for port_name in self.ports().unwrap_or_default() {
                if !seen.insert(port_name) {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Port {port_name} is listed twice in linux \
                            bridge {iface_name}"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // Port entry holding only name inherits STP and VLAN settings from
    // the current port entry of the same name.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        let des_ports =
            match desired.bridge.as_ref().and_then(|b| b.port.as_ref()) {
                Some(p) => p,
                None => return,
            };
        if let Some(ports) = self.bridge.as_mut().and_then(|b| b.port.as_mut())
        {
            for port_conf in ports.iter_mut() {
                if !des_ports.iter().any(|p| p.name == port_conf.name) {
                    continue;
                }
                if let Some(cur_port_conf) =
                    current.get_port_conf(port_conf.name.as_str())
                {
                    port_conf.merge(cur_port_conf);
                }
            }
        }
        // STP disabled makes other STP options meaningless
        if let Some(stp_opts) = self
            .bridge
            .as_mut()
            .and_then(|b| b.options.as_mut())
            .and_then(|o| o.stp.as_mut())
        {
            if stp_opts.enabled == Some(false) {
                *stp_opts = LinuxBridgeStpOptions {
                    enabled: Some(false),
                    ..Default::default()
                };
            }
        }
    }

    pub(crate) fn remove_port(&mut self, port_name: &str) {
        if let Some(ports) =
            self.bridge.as_mut().and_then(|b| b.port.as_mut())
        {
            ports.retain(|p| p.name != port_name);
        }
    }

    pub(crate) fn add_port(&mut self, port_name: &str) {
        let ports = self
            .bridge
            .get_or_insert_with(LinuxBridgeConfig::new)
            .port
            .get_or_insert_with(Vec::new);
        if !ports.iter().any(|p| p.name == port_name) {
            ports.push(LinuxBridgePortConfig {
                name: port_name.to_string(),
                ..Default::default()
            });
        }
    }

    pub(crate) fn change_port_name(&mut self, org_name: &str, new_name: &str) {
        if let Some(port_conf) = self
            .bridge
            .as_mut()
            .and_then(|b| b.port.as_mut())
            .and_then(|ports| ports.iter_mut().find(|p| p.name == org_name))
        {
            port_conf.name = new_name.to_string();
        }
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        if let Some(br_conf) = self.bridge.as_mut() {
            if let Some(opts) = br_conf.options.as_mut() {
                opts.gc_timer = None;
                opts.hello_timer = None;
            }
            if let Some(ports) = br_conf.port.as_mut() {
                for port_conf in ports.iter_mut() {
                    if let Some(vlan_conf) = port_conf.vlan.as_mut() {
                        vlan_conf.pre_verify_cleanup();
                    }
                }
                ports.sort_unstable_by(|a, b| a.name.cmp(&b.name));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct LinuxBridgeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Linux bridge options. When applying, existing options will merged
    /// into desired.
    pub options: Option<LinuxBridgeOptions>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "ports")]
    /// Linux bridge ports. When applying, desired port list will
    /// __override__ current port list.
    pub port: Option<Vec<LinuxBridgePortConfig>>,
}

impl LinuxBridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct LinuxBridgePortConfig {
    /// The kernel interface name of this bridge port.
    pub name: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Controls whether traffic may be send back out of the port on which it
    /// was received.
    pub stp_hairpin_mode: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub stp_path_cost: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub stp_priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// VLAN filtering of this port. If not defined, current VLAN filtering
    /// is preserved.
    pub vlan: Option<BridgePortVlanConfig>,
}

impl LinuxBridgePortConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn merge(&mut self, current: &Self) {
        if self.stp_hairpin_mode.is_none() {
            self.stp_hairpin_mode = current.stp_hairpin_mode;
        }
        if self.stp_path_cost.is_none() {
            self.stp_path_cost = current.stp_path_cost;
        }
        if self.stp_priority.is_none() {
            self.stp_priority = current.stp_priority;
        }
        if self.vlan.is_none() {
            self.vlan.clone_from(&current.vlan);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct LinuxBridgeOptions {
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    /// Query only.
    pub gc_timer: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_addr: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        alias = "group-forward-mask",
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub group_fwd_mask: Option<u16>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub hash_max: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    /// Query only.
    pub hello_timer: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub mac_ageing_time: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub multicast_last_member_count: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    pub multicast_last_member_interval: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    pub multicast_membership_interval: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub multicast_querier: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    pub multicast_querier_interval: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    pub multicast_query_interval: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    pub multicast_query_response_interval: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub multicast_query_use_ifaddr: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multicast_router: Option<LinuxBridgeMulticastRouterType>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub multicast_snooping: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub multicast_startup_query_count: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    pub multicast_startup_query_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stp: Option<LinuxBridgeStpOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_protocol: Option<VlanProtocol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct LinuxBridgeStpOptions {
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// If disabled during applying, the remaining STP options will be
    /// discarded.
    pub enabled: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u8_or_string"
    )]
    pub forward_delay: Option<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u8_or_string"
    )]
    pub hello_time: Option<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u8_or_string"
    )]
    pub max_age: Option<u8>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub priority: Option<u16>,
}

impl LinuxBridgeStpOptions {
    pub const HELLO_TIME_MAX: u8 = 10;
    pub const HELLO_TIME_MIN: u8 = 1;
    pub const MAX_AGE_MAX: u8 = 40;
    pub const MAX_AGE_MIN: u8 = 6;
    pub const FORWARD_DELAY_MAX: u8 = 30;
    pub const FORWARD_DELAY_MIN: u8 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    fn sanitize(&self, iface_name: &str) -> Result<(), NetstateError> {
        for (prop, value, min, max) in [
            (
                "hello-time",
                self.hello_time,
                Self::HELLO_TIME_MIN,
                Self::HELLO_TIME_MAX,
            ),
            ("max-age", self.max_age, Self::MAX_AGE_MIN, Self::MAX_AGE_MAX),
            (
                "forward-delay",
                self.forward_delay,
                Self::FORWARD_DELAY_MIN,
                Self::FORWARD_DELAY_MAX,
            ),
        ] {
            if let Some(value) = value {
                if !(min..=max).contains(&value) {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Desired STP {prop} {value} of linux bridge \
                            {iface_name} is not in the range of \
                            [{min},{max}]"
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum LinuxBridgeMulticastRouterType {
    #[default]
    #[serde(alias = "1")]
    Auto,
    #[serde(alias = "0")]
    Disabled,
    #[serde(alias = "2")]
    Enabled,
}
