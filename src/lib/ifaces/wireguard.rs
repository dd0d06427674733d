// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    state::PASSWORD_HID, BaseInterface, ErrorKind, Interface, InterfaceType,
    MergedInterface, NetstateError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// WireGuard tunnel interface.
/// ```yml
/// interfaces:
/// - name: wg0
///   type: wireguard
///   state: up
///   wireguard:
///     private-key: <_password_hid_>
///     listen-port: 51820
///     peers:
///     - endpoint: 192.0.2.1:51820
///       public-key: 5ZKfB4mXn5zY6wkF/Z4hO8s2f0sEUXYb2f0a2lMaP2s=
///       allowed-ips:
///       - ip: 198.51.100.0
///         prefix-length: 24
/// ```
pub struct WireGuardInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wireguard: Option<WireGuardConfig>,
}

impl Default for WireGuardInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::WireGuard;
        Self {
            base,
            wireguard: None,
        }
    }
}

impl WireGuardInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if let Some(wg_conf) = self.wireguard.as_mut() {
            wg_conf.sanitize(self.base.name.as_str(), is_desired)?;
        }
        Ok(())
    }

    pub(crate) fn hide_secrets(&mut self) {
        if let Some(wg_conf) = self.wireguard.as_mut() {
            wg_conf.hide_secrets();
        }
    }

    pub(crate) fn pre_verify_cleanup(&mut self) {
        if let Some(wg_conf) = self.wireguard.as_mut() {
            wg_conf.private_key = None;
            wg_conf.public_key = None;
            for peer in wg_conf.peers.as_deref_mut().unwrap_or_default() {
                peer.preshared_key = None;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct WireGuardConfig {
    /// Base64 encoded public key, query only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Base64 encoded private key. Current value is used if undefined or
    /// set to the hidden password string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub listen_port: Option<u16>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub fwmark: Option<u32>,
    /// Desired list overrides current peers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<WireGuardPeerConfig>>,
}

impl WireGuardConfig {
    fn sanitize(
        &mut self,
        iface_name: &str,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if !is_desired {
            return Ok(());
        }
        self.public_key = None;
        if self.private_key.as_deref() == Some(PASSWORD_HID) {
            self.private_key = None;
        }
        for peer in self.peers.as_deref_mut().unwrap_or_default() {
            if peer.endpoint.as_deref().unwrap_or_default().is_empty() {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Missing mandatory property `endpoint` for \
                        wireguard peer {} of interface {iface_name}",
                        peer.public_key.as_deref().unwrap_or_default()
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
            peer.sanitize();
        }
        Ok(())
    }

    fn hide_secrets(&mut self) {
        if self.private_key.is_some() {
            self.private_key = Some(PASSWORD_HID.to_string());
        }
        for peer in self.peers.as_deref_mut().unwrap_or_default() {
            if peer.preshared_key.is_some() {
                peer.preshared_key = Some(PASSWORD_HID.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct WireGuardPeerConfig {
    /// Mandatory for apply, in the form of `host:port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preshared_key: Option<String>,
    /// Query only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_handshake: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub persistent_keepalive: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_ips: Option<Vec<WireGuardIpAddress>>,
}

impl WireGuardPeerConfig {
    fn sanitize(&mut self) {
        self.last_handshake = None;
        if self.preshared_key.as_deref() == Some(PASSWORD_HID) {
            self.preshared_key = None;
        }
        for addr in self.allowed_ips.as_deref_mut().unwrap_or_default() {
            if let Ok(ip) = crate::iplib::canonicalize_ip_addr(&addr.ip) {
                addr.ip = ip;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct WireGuardIpAddress {
    pub ip: String,
    #[serde(deserialize_with = "crate::deserializer::u8_or_string")]
    pub prefix_length: u8,
}

impl MergedInterface {
    pub(crate) fn post_inter_ifaces_process_wireguard(
        &self,
    ) -> Result<(), NetstateError> {
        if let (Some(Interface::WireGuard(apply_iface)), None) =
            (self.for_apply.as_ref(), self.current.as_ref())
        {
            if apply_iface
                .wireguard
                .as_ref()
                .and_then(|c| c.private_key.as_ref())
                .is_none()
            {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Need private key for creating wireguard \
                        interface {}",
                        apply_iface.base.name
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}
