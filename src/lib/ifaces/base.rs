// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    ip::validate_wait_ip,
    mptcp::{propagate_iface_mptcp_flags, validate_mptcp},
    ErrorKind, EthtoolConfig, InterfaceIpv4, InterfaceIpv6, InterfaceState,
    InterfaceType, MergedInterface, MptcpConfig, NetstateError,
    OvsDbIfaceConfig, WaitIp,
};

const MINIMUM_IPV6_MTU: u64 = 1280;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
/// Information shared among all interface types
pub struct BaseInterface {
    /// Interface name. When `identifier` is
    /// [InterfaceIdentifier::MacAddress], this is only the name of the
    /// profile and the real interface is searched by MAC address.
    pub name: String,
    #[serde(skip_serializing_if = "crate::serializer::is_option_string_empty")]
    /// Interface description stored in network backend.
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    /// Interface type. Serialize and deserialize to/from `type`
    pub iface_type: InterfaceType,
    #[serde(default)]
    /// Interface state. Default to [InterfaceState::Up] when applying.
    pub state: InterfaceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Define how provider choose network interface.
    /// Default to [InterfaceIdentifier::Name].
    pub identifier: Option<InterfaceIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// MAC address in the format: upper case hex string separated by `:` on
    /// every two characters. Case insensitive when applying.
    /// Serialize and deserialize to/from `mac-address`.
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// MAC address stored in firmware. Ignored during apply.
    pub permanent_mac_address: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    /// Maximum transmission unit.
    pub mtu: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    /// Minimum MTU allowed. Ignored during apply.
    pub min_mtu: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u64_or_string"
    )]
    /// Maximum MTU allowed. Ignored during apply.
    pub max_mtu: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Whether system should wait certain IP stack before considering
    /// network interface activated.
    pub wait_ip: Option<WaitIp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// IPv4 information.
    /// Hided if interface is not allowed to hold IP information(e.g. port of
    /// bond is not allowed to hold IP information).
    pub ipv4: Option<InterfaceIpv4>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// IPv6 information.
    pub ipv6: Option<InterfaceIpv6>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Interface wide MPTCP flags applied to all valid IP addresses.
    pub mptcp: Option<MptcpConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethtool: Option<EthtoolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Controller of the specified interface.
    /// `None` means no change, empty string means detach from current
    /// controller. An error is raised if this property conflicts with
    /// the port list of the controller.
    pub controller: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    /// Whether kernel should skip check on package targeting MAC address and
    /// accept all packages, also known as promiscuous mode.
    pub accept_all_mac_addresses: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Copy the MAC address from specified interface.
    pub copy_mac_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "ovs-db")]
    /// Interface specific OpenvSwitch database configurations.
    pub ovsdb: Option<OvsDbIfaceConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Opaque settings keyed by provider name. Passed to provider as it is.
    pub backend_specific: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(skip)]
    pub controller_type: Option<InterfaceType>,
    #[serde(skip)]
    /// Per-port settings copied from controller, e.g. STP options of linux
    /// bridge port or VLAN filtering of OVS bridge port.
    pub(crate) port_options: Option<serde_json::Value>,
    // The interface lowest up_priority will be activated first.
    // The up_priority should be its controller's up_priority
    // plus one.
    // The 0 means top controller or no controller.
    #[serde(skip)]
    pub(crate) up_priority: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum InterfaceIdentifier {
    /// Use interface name to match the network interface.
    #[default]
    Name,
    /// Use interface MAC address to match the network interface.
    MacAddress,
}

impl BaseInterface {
    /// Create empty [BaseInterface] with state set to [InterfaceState::Up]
    pub fn new() -> Self {
        Self {
            state: InterfaceState::Up,
            ..Default::default()
        }
    }

    pub(crate) fn clone_name_type_only(&self) -> Self {
        Self {
            name: self.name.clone(),
            iface_type: self.iface_type.clone(),
            state: InterfaceState::Up,
            ..Default::default()
        }
    }

    // Besides JSON level merging:
    //  * the IP stacks need extra care
    //  * `copy_mac_from` is only meaningful in desired
    //  * ethtool pause autoneg overrides the merged rx/tx
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        if let Some(ipv4) = self.ipv4.as_mut() {
            if let (Some(d), Some(c)) =
                (desired.ipv4.as_ref(), current.ipv4.as_ref())
            {
                ipv4.special_merge(d, c);
            }
        }
        if let Some(ipv6) = self.ipv6.as_mut() {
            if let (Some(d), Some(c)) =
                (desired.ipv6.as_ref(), current.ipv6.as_ref())
            {
                ipv6.special_merge(d, c);
            }
        }
        self.copy_mac_from.clone_from(&desired.copy_mac_from);
        if let Some(ethtool) = self.ethtool.as_mut() {
            ethtool.special_merge();
        }
    }

    pub(crate) fn has_controller(&self) -> bool {
        self.controller
            .as_deref()
            .map(|c| !c.is_empty())
            .unwrap_or_default()
    }

    /// Whether this interface can hold IP information or not.
    pub fn can_have_ip(&self) -> bool {
        (!self.has_controller())
            || self.iface_type == InterfaceType::OvsInterface
            || self.controller_type == Some(InterfaceType::Vrf)
    }

    pub(crate) fn is_up_priority_valid(&self) -> bool {
        if self.has_controller() {
            self.up_priority != 0
        } else {
            true
        }
    }

    pub(crate) fn is_ipv4_enabled(&self) -> bool {
        self.ipv4.as_ref().map(|i| i.enabled) == Some(true)
    }

    pub(crate) fn is_ipv6_enabled(&self) -> bool {
        self.ipv6.as_ref().map(|i| i.enabled) == Some(true)
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if let Some(mac) = self.mac_address.as_mut() {
            mac.make_ascii_uppercase();
        }
        if is_desired {
            // Runtime only properties
            self.permanent_mac_address = None;
            self.max_mtu = None;
            self.min_mtu = None;
        }
        if self.identifier == Some(InterfaceIdentifier::MacAddress)
            && self.mac_address.is_none()
            && is_desired
            && self.state != InterfaceState::Absent
        {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Interface {} is using MAC address as identifier \
                    but `mac-address` is not defined",
                    self.name
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }

        if let Some(ipv4_conf) = self.ipv4.as_mut() {
            ipv4_conf.sanitize(is_desired)?;
        }
        if let Some(ipv6_conf) = self.ipv6.as_mut() {
            ipv6_conf.sanitize(is_desired)?;
            if ipv6_conf.enabled && is_desired {
                if let Some(mtu) = self.mtu {
                    if mtu < MINIMUM_IPV6_MTU {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "MTU should be >= {MINIMUM_IPV6_MTU} \
                                when IPv6 is enabled on interface {}, \
                                but got mtu: {mtu}",
                                self.name.as_str()
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                }
            }
        }
        if is_desired {
            validate_mptcp(self)?;
        }
        if let Some(ethtool) = self.ethtool.as_mut() {
            ethtool.sanitize(self.name.as_str(), is_desired)?;
        }

        if !self.can_have_ip() {
            self.wait_ip = None;
        }
        Ok(())
    }

    pub(crate) fn pre_edit_cleanup(&mut self) {
        self.permanent_mac_address = None;
        self.min_mtu = None;
        self.max_mtu = None;
        if let Some(ipv4) = self.ipv4.as_mut() {
            ipv4.pre_edit_cleanup();
        }
        if let Some(ipv6) = self.ipv6.as_mut() {
            ipv6.pre_edit_cleanup();
        }
    }
}

impl MergedInterface {
    pub(crate) fn post_inter_ifaces_process_base_iface(
        &mut self,
    ) -> Result<(), NetstateError> {
        self.validate_mtu()?;
        self.validate_can_have_ip()?;
        if let Some(apply_iface) = self.for_apply.as_mut() {
            let base = apply_iface.base_iface_mut();
            if base.can_have_ip() {
                validate_wait_ip(base)?;
            }
            propagate_iface_mptcp_flags(base);
        }
        Ok(())
    }

    fn validate_mtu(&self) -> Result<(), NetstateError> {
        if let (Some(desired), Some(current)) = (
            self.desired.as_ref().map(|i| i.base_iface()),
            self.current.as_ref().map(|i| i.base_iface()),
        ) {
            if let (Some(desire_mtu), Some(min_mtu), Some(max_mtu)) =
                (desired.mtu, current.min_mtu, current.max_mtu)
            {
                if desire_mtu > max_mtu || desire_mtu < min_mtu {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Desired MTU {} for interface {} is out of \
                            allowed range [{}, {}]",
                            desire_mtu, desired.name, min_mtu, max_mtu
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // Port of non-VRF controller cannot hold IP. The IP is silently removed
    // unless user desired it explicitly.
    fn validate_can_have_ip(&mut self) -> Result<(), NetstateError> {
        let is_desired = self.is_desired();
        if !self.merged.is_up() {
            return Ok(());
        }
        if let Some(apply_iface) = self.for_apply.as_mut() {
            let base_iface = apply_iface.base_iface_mut();
            if !base_iface.can_have_ip() {
                if is_desired
                    && (base_iface.is_ipv4_enabled()
                        || base_iface.is_ipv6_enabled())
                    && self
                        .desired
                        .as_ref()
                        .map(|d| {
                            d.base_iface().is_ipv4_enabled()
                                || d.base_iface().is_ipv6_enabled()
                        })
                        .unwrap_or_default()
                {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {} cannot have IP enabled as it is \
                            attached to a controller where IP is not allowed",
                            base_iface.name.as_str()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                base_iface.ipv4 = None;
                base_iface.ipv6 = None;
                self.merged.base_iface_mut().ipv4 = None;
                self.merged.base_iface_mut().ipv6 = None;
                if let Some(verify_iface) = self.for_verify.as_mut() {
                    verify_iface.base_iface_mut().ipv4 = None;
                    verify_iface.base_iface_mut().ipv6 = None;
                }
            }
        }
        Ok(())
    }
}
