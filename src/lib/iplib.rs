// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::{ErrorKind, NetstateError};

pub(crate) const AF_INET: u8 = 2;
pub(crate) const AF_INET6: u8 = 10;
pub(crate) const IPV4_ADDR_LEN: u8 = 32;
pub(crate) const IPV6_ADDR_LEN: u8 = 128;

pub(crate) fn is_ipv6_addr(addr: &str) -> bool {
    addr.contains(':')
}

// Copy from Rust official std::net::Ipv6Addr::is_unicast_link_local() which
// is experimental.
pub(crate) fn is_ipv6_unicast_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// Parse IP address in human form into [IpAddr].
/// IPv4 mapped IPv6 address is kept as IPv6, its presentation follows
/// RFC 5952: `::ffff:192.0.2.1`.
pub fn parse_ip_addr(addr: &str) -> Result<IpAddr, NetstateError> {
    IpAddr::from_str(addr.trim()).map_err(|e| {
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IP address {addr}: {e}"),
        );
        log::error!("{}", e);
        e
    })
}

/// Canonical presentation of IP address, e.g. `2001:0db8::1` becomes
/// `2001:db8::1`.
pub fn canonicalize_ip_addr(addr: &str) -> Result<String, NetstateError> {
    Ok(match parse_ip_addr(addr)? {
        IpAddr::V4(ip) => ip.to_string(),
        IpAddr::V6(ip) => canonicalize_ipv6(&ip),
    })
}

fn canonicalize_ipv6(ip: &Ipv6Addr) -> String {
    let seg = ip.segments();
    // Rust std only renders dotted form for IPv4 mapped addresses, we also
    // need it for IPv4 translated or compatible ones starting with
    // `::ffff:`.
    if seg[0..5] == [0, 0, 0, 0, 0] && seg[5] == 0xffff {
        let v4 = Ipv4Addr::new(
            (seg[6] >> 8) as u8,
            (seg[6] & 0xff) as u8,
            (seg[7] >> 8) as u8,
            (seg[7] & 0xff) as u8,
        );
        format!("::ffff:{v4}")
    } else {
        ip.to_string()
    }
}

/// Parse `ip/prefix` form. Prefix is optional and defaults to full
/// length of address family.
pub fn parse_ip_net(ip_net: &str) -> Result<(IpAddr, u8), NetstateError> {
    let mut items = ip_net.splitn(2, '/');
    let ip = parse_ip_addr(items.next().unwrap_or_default())?;
    let max_len = if ip.is_ipv6() {
        IPV6_ADDR_LEN
    } else {
        IPV4_ADDR_LEN
    };
    let prefix = match items.next() {
        Some(p) => p.trim().parse::<u8>().map_err(|e| {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid IP network {ip_net}: {e}"),
            );
            log::error!("{}", e);
            e
        })?,
        None => max_len,
    };
    if prefix > max_len {
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Invalid IP network {ip_net}: prefix length should be \
                less or equal to {max_len}"
            ),
        );
        log::error!("{}", e);
        return Err(e);
    }
    Ok((ip, prefix))
}

fn ip_to_u128(ip: &IpAddr) -> u128 {
    match ip {
        IpAddr::V4(i) => u32::from(*i) as u128,
        IpAddr::V6(i) => u128::from(*i),
    }
}

fn mask(prefix: u8, max_len: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        let bits = u128::MAX << (128 - prefix as u32);
        bits >> (128 - max_len as u32)
    }
}

fn network_of(ip: &IpAddr, prefix: u8) -> IpAddr {
    match ip {
        IpAddr::V4(_) => {
            let num = ip_to_u128(ip) & mask(prefix, IPV4_ADDR_LEN);
            IpAddr::V4(Ipv4Addr::from(num as u32))
        }
        IpAddr::V6(_) => {
            let num = ip_to_u128(ip) & mask(prefix, IPV6_ADDR_LEN);
            IpAddr::V6(Ipv6Addr::from(num))
        }
    }
}

/// Normalize IP network to `network_address/prefix` with host bits
/// cleared: `192.0.2.1/24` becomes `192.0.2.0/24`.
pub fn sanitize_ip_network(ip_net: &str) -> Result<String, NetstateError> {
    let (ip, prefix) = parse_ip_net(ip_net)?;
    Ok(match network_of(&ip, prefix) {
        IpAddr::V4(net) => format!("{net}/{prefix}"),
        IpAddr::V6(net) => format!("{}/{prefix}", canonicalize_ipv6(&net)),
    })
}

/// Whether network `sub` is contained by network `net`.
/// Different address family is never a subnet.
pub fn is_subnet_of(sub: &str, net: &str) -> Result<bool, NetstateError> {
    let (sub_ip, sub_prefix) = parse_ip_net(sub)?;
    let (net_ip, net_prefix) = parse_ip_net(net)?;
    if sub_ip.is_ipv6() != net_ip.is_ipv6() || sub_prefix < net_prefix {
        return Ok(false);
    }
    Ok(network_of(&sub_ip, net_prefix) == network_of(&net_ip, net_prefix))
}

/// Whether IP address `ip` belongs to network `net`.
pub fn is_ip_in_net(ip: &str, net: &str) -> Result<bool, NetstateError> {
    let ip = parse_ip_addr(ip)?;
    let max_len = if ip.is_ipv6() {
        IPV6_ADDR_LEN
    } else {
        IPV4_ADDR_LEN
    };
    is_subnet_of(&format!("{ip}/{max_len}"), net)
}

pub(crate) fn is_default_route_dst(dst: &str) -> bool {
    matches!(dst, "0.0.0.0/0" | "::/0")
}
