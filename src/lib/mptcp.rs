// SPDX-License-Identifier: Apache-2.0

// The document string for MptcpAddressFlag is copy from manpage of
// `IP-MPTCP(8)` which is licensed under GPLv2.0+

use serde::{Deserialize, Serialize};

use crate::{BaseInterface, ErrorKind, InterfaceIpAddr, NetstateError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct MptcpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Automatically assign MPTCP flags to all valid IP addresses of this
    /// interface including both static and dynamic ones.
    pub address_flags: Option<Vec<MptcpAddressFlag>>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum MptcpAddressFlag {
    /// The endpoint will be announced/signaled to each peer via an MPTCP
    /// ADD_ADDR sub-option. Upon reception of an ADD_ADDR sub-option, the
    /// peer can try to create additional subflows. Cannot used along with
    /// MptcpAddressFlag::Fullmesh as Linux kernel enforced.
    Signal,
    /// If additional subflow creation is allowed by the MPTCP limits, the
    /// MPTCP path manager will try to create an additional subflow using
    /// this endpoint as the source address after the MPTCP connection is
    /// established.
    Subflow,
    /// If this is a subflow endpoint, the subflows created using this endpoint
    /// will have the backup flag set during the connection process.
    Backup,
    /// If this is a subflow endpoint and additional subflow creation is
    /// allowed by the MPTCP limits, the MPTCP path manager will try to
    /// create an additional subflow for each known peer address, using
    /// this endpoint as the source address.
    Fullmesh,
}

fn iter_addrs_mut(
    iface: &mut BaseInterface,
) -> impl Iterator<Item = &mut InterfaceIpAddr> {
    let ipv4_addrs = iface
        .ipv4
        .as_mut()
        .and_then(|i| i.addresses.as_mut())
        .map(|a| a.iter_mut());
    let ipv6_addrs = iface
        .ipv6
        .as_mut()
        .and_then(|i| i.addresses.as_mut())
        .map(|a| a.iter_mut());
    ipv4_addrs
        .into_iter()
        .flatten()
        .chain(ipv6_addrs.into_iter().flatten())
}

pub(crate) fn validate_mptcp(
    iface: &BaseInterface,
) -> Result<(), NetstateError> {
    if let Some(iface_flags) =
        iface.mptcp.as_ref().and_then(|m| m.address_flags.as_ref())
    {
        check_flags(iface_flags)?;
    }
    for addr in iface
        .ipv4
        .as_ref()
        .and_then(|i| i.addresses.as_deref())
        .unwrap_or_default()
        .iter()
        .chain(
            iface
                .ipv6
                .as_ref()
                .and_then(|i| i.addresses.as_deref())
                .unwrap_or_default()
                .iter(),
        )
    {
        if let Some(addr_flags) = addr.mptcp_flags.as_ref() {
            check_flags(addr_flags)?;
        }
    }
    Ok(())
}

fn check_flags(flags: &[MptcpAddressFlag]) -> Result<(), NetstateError> {
    if flags.contains(&MptcpAddressFlag::Signal)
        && flags.contains(&MptcpAddressFlag::Fullmesh)
    {
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            "MPTCP flags mustn't have both signal and fullmesh".to_string(),
        );
        log::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

fn remove_per_addr_mptcp_flags(iface: &mut BaseInterface) {
    for ip_addr in iter_addrs_mut(iface) {
        ip_addr.mptcp_flags = None;
    }
}

// Interface level flags apply to every address which has none.
pub(crate) fn propagate_iface_mptcp_flags(iface: &mut BaseInterface) {
    let flags = match iface.mptcp.as_ref().and_then(|m| m.address_flags.clone())
    {
        Some(f) => f,
        None => return,
    };
    for ip_addr in iter_addrs_mut(iface) {
        if ip_addr.mptcp_flags.is_none() {
            ip_addr.mptcp_flags = Some(flags.clone());
        }
    }
}

pub(crate) fn mptcp_pre_verify_cleanup(iface: &mut BaseInterface) {
    if let Some(flags) =
        iface.mptcp.as_mut().and_then(|m| m.address_flags.as_mut())
    {
        flags.sort_unstable();
        flags.dedup();
    }
    remove_per_addr_mptcp_flags(iface);
}
