// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    BaseInterface, ErrorKind, Interface, InterfaceType, MergedInterface,
    NetstateError, SrIovConfig,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Ethernet(IEEE 802.3) interface.
/// Besides [BaseInterface], optionally could hold [EthernetConfig] and/or
/// [VethConfig].
/// The yaml output of [crate::NetworkState] containing ethernet interface would
/// be:
/// ```yml
/// interfaces:
/// - name: ens3
///   type: ethernet
///   state: up
///   mac-address: 00:11:22:33:44:FF
///   mtu: 1500
///   ipv4:
///     enabled: true
///     dhcp: true
///   ipv6:
///     enabled: false
///   ethernet:
///     auto-negotiation: false
///     speed: 1000
///     duplex: full
/// ```
/// The yaml output of [crate::NetworkState] containing veth interface would be:
/// ```yml
/// interfaces:
/// - name: veth1
///   type: veth
///   state: up
///   veth:
///     peer: veth1peer
/// ```
pub struct EthernetInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethernet: Option<EthernetConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// When applying, the [VethConfig] is only valid when
    /// [BaseInterface.iface_type] is set to [InterfaceType::Veth] explicitly.
    pub veth: Option<VethConfig>,
}

impl Default for EthernetInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::Ethernet;
        Self {
            base,
            ethernet: None,
            veth: None,
        }
    }
}

impl EthernetInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sriov_is_enabled(&self) -> bool {
        self.ethernet
            .as_ref()
            .and_then(|eth_conf| {
                eth_conf.sr_iov.as_ref().map(SrIovConfig::sriov_is_enabled)
            })
            .unwrap_or_default()
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if self.base.iface_type != InterfaceType::Veth && self.veth.is_some() {
            if is_desired {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Interface {} holds veth configure but its type is {}",
                        self.base.name, self.base.iface_type
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
            self.veth = None;
        }
        if let Some(sriov_conf) =
            self.ethernet.as_mut().and_then(|e| e.sr_iov.as_mut())
        {
            sriov_conf.sanitize(self.base.name.as_str(), is_desired)?;
        }
        Ok(())
    }

    // Auto negotiation on means speed and duplex are decided by link partner.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        if desired.ethernet.as_ref().and_then(|e| e.auto_neg) == Some(true) {
            if let Some(eth_conf) = self.ethernet.as_mut() {
                eth_conf.speed = None;
                eth_conf.duplex = None;
            }
        }
        if let (Some(des_sriov), Some(cur_sriov)) = (
            desired.ethernet.as_ref().and_then(|e| e.sr_iov.as_ref()),
            current.ethernet.as_ref().and_then(|e| e.sr_iov.as_ref()),
        ) {
            if let Some(sriov) =
                self.ethernet.as_mut().and_then(|e| e.sr_iov.as_mut())
            {
                sriov.special_merge(des_sriov, cur_sriov);
            }
        }
    }

    pub(crate) fn pre_edit_cleanup(&mut self) {
        if let Some(eth_conf) = self.ethernet.as_mut() {
            if eth_conf.auto_neg == Some(true) {
                eth_conf.speed = None;
                eth_conf.duplex = None;
            }
        }
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        if let Some(eth_conf) = self.ethernet.as_mut() {
            eth_conf.pre_verify_cleanup()
        }
    }

    pub(crate) fn veth_peer(&self) -> Option<&str> {
        self.veth.as_ref().map(|v| v.peer.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum EthernetDuplex {
    /// Deserialize and serialize from/to `full`.
    Full,
    /// Deserialize and serialize from/to `half`.
    Half,
}

impl std::fmt::Display for EthernetDuplex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Full => "full",
                Self::Half => "half",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct EthernetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Single Root I/O Virtualization(SRIOV) configuration.
    pub sr_iov: Option<SrIovConfig>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "auto-negotiation",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub auto_neg: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    /// Link speed in Mbps.
    pub speed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplex: Option<EthernetDuplex>,
}

impl EthernetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        if self.auto_neg == Some(true) {
            self.speed = None;
            self.duplex = None;
        }
        if let Some(sriov_conf) = self.sr_iov.as_mut() {
            sriov_conf.pre_verify_cleanup()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct VethConfig {
    /// The name of veth peer.
    pub peer: String,
}

impl MergedInterface {
    pub(crate) fn post_inter_ifaces_process_ethernet(
        &mut self,
    ) -> Result<(), NetstateError> {
        let des_eth_conf = match self.desired.as_ref() {
            Some(Interface::Ethernet(des)) => des.ethernet.as_ref(),
            _ => return Ok(()),
        };
        if des_eth_conf.and_then(|e| e.auto_neg) == Some(false) {
            if let Interface::Ethernet(merged) = &self.merged {
                let merged_conf = merged.ethernet.clone().unwrap_or_default();
                if merged_conf.speed.is_none() || merged_conf.duplex.is_none()
                {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {} has auto-negotiation disabled, \
                            both speed and duplex should be defined",
                            merged.base.name
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }

        if let (Some(Interface::Ethernet(apply_iface)), None) =
            (self.for_apply.as_ref(), self.current.as_ref())
        {
            if apply_iface.base.iface_type == InterfaceType::Veth
                && apply_iface.veth.is_none()
            {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Veth interface {} does not exist, \
                        peer name is required for creating it",
                        apply_iface.base.name
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }

        if let Interface::Ethernet(merged) = &self.merged {
            if let Some(sriov) =
                merged.ethernet.as_ref().and_then(|e| e.sr_iov.as_ref())
            {
                sriov.validate_vf_ids(merged.base.name.as_str())?;
            }
        }
        Ok(())
    }
}
