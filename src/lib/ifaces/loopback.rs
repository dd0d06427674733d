// SPDX-License-Identifier: Apache-2.0

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::{
    BaseInterface, ErrorKind, InterfaceIpAddr, InterfaceIpv4, InterfaceIpv6,
    InterfaceState, InterfaceType, NetstateError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
/// Loopback interface. Only contain information of [BaseInterface].
/// Limitations
///  * Cannot enable DHCP or autoconf.
///  * The [InterfaceState::Absent] can only restore the loopback configure back
///    to default.
///  * Cannot disable IPv4 or IPv6.
///  * Even not desired, the `127.0.0.1/8` and `::1` are always appended to
///    static IP address list.
///
/// Example yaml outpuf of `[crate::NetworkState]` with loopback interface:
/// ```yml
/// interfaces:
/// - name: lo
///   type: loopback
///   state: up
///   mtu: 65535
///   ipv4:
///     enabled: true
///     address:
///     - ip: 127.0.0.1
///       prefix-length: 8
///   ipv6:
///     enabled: true
///     address:
///     - ip: ::1
///       prefix-length: 128
/// ```
pub struct LoopbackInterface {
    #[serde(flatten)]
    pub base: BaseInterface,
}

impl Default for LoopbackInterface {
    fn default() -> Self {
        let mut base = BaseInterface::new();
        base.iface_type = InterfaceType::Loopback;
        base.name = "lo".to_string();
        base.state = InterfaceState::Up;
        let mut ipv4 = InterfaceIpv4::new();
        ipv4.enabled = true;
        ipv4.prop_list.push("enabled");
        ipv4.addresses = Some(vec![InterfaceIpAddr::new(
            Ipv4Addr::LOCALHOST.into(),
            8,
        )]);
        let mut ipv6 = InterfaceIpv6::new();
        ipv6.enabled = true;
        ipv6.prop_list.push("enabled");
        ipv6.addresses = Some(vec![InterfaceIpAddr::new(
            Ipv6Addr::LOCALHOST.into(),
            128,
        )]);
        base.ipv4 = Some(ipv4);
        base.ipv6 = Some(ipv6);
        Self { base }
    }
}

impl LoopbackInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if is_desired {
            let err_msg =
                if self.base.ipv4.as_ref().map(|i| i.enabled) == Some(false)
                    && self.base.ipv4.as_ref().map(|i| i.is_enabled_defined())
                        == Some(true)
                {
                    Some("Loopback interface cannot have IPv4 disabled")
                } else if self.base.ipv6.as_ref().map(|i| i.enabled)
                    == Some(false)
                    && self.base.ipv6.as_ref().map(|i| i.is_enabled_defined())
                        == Some(true)
                {
                    Some("Loopback interface cannot have IPv6 disabled")
                } else if self.base.ipv4.as_ref().map(|i| i.is_auto())
                    == Some(true)
                {
                    Some("Loopback interface cannot have IPv4 DHCP enabled")
                } else if self.base.ipv6.as_ref().map(|i| i.is_auto())
                    == Some(true)
                {
                    Some(
                        "Loopback interface cannot have IPv6 autoconf/DHCPv6 \
                        enabled",
                    )
                } else {
                    None
                };
            if let Some(msg) = err_msg {
                let e =
                    NetstateError::new(ErrorKind::InvalidArgument, msg.into());
                log::error!("{}", e);
                return Err(e);
            }
        }
        self.include_localhost_addresses();
        Ok(())
    }

    fn include_localhost_addresses(&mut self) {
        if let Some(addrs) =
            self.base.ipv4.as_mut().and_then(|i| i.addresses.as_mut())
        {
            let lo: std::net::IpAddr = Ipv4Addr::LOCALHOST.into();
            if !addrs.iter().any(|a| a.ip == lo) {
                addrs.insert(0, InterfaceIpAddr::new(lo, 8));
            }
        }
        if let Some(addrs) =
            self.base.ipv6.as_mut().and_then(|i| i.addresses.as_mut())
        {
            let lo: std::net::IpAddr = Ipv6Addr::LOCALHOST.into();
            if !addrs.iter().any(|a| a.ip == lo) {
                addrs.insert(0, InterfaceIpAddr::new(lo, 128));
            }
        }
    }
}
