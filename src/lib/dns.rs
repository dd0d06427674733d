// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    iplib::is_ipv6_addr, ErrorKind, MergedInterfaces, MergedRoutes,
    NetstateError,
};

const SUPPORTED_DNS_OPTIONS: [&str; 18] = [
    "attempts",
    "debug",
    "edns0",
    "inet6",
    "ip6-bytestring",
    "ip6-dotint",
    "ndots",
    "no-aaaa",
    "no-check-names",
    "no-ip6-dotint",
    "no-reload",
    "no-tld-query",
    "rotate",
    "single-request",
    "single-request-reopen",
    "timeout",
    "trust-ad",
    "use-vc",
];

// Static DNS servers get priority after this base, index of server in
// desired list appended. Lower is better.
const DNS_PRIORITY_STATIC_BASE: i32 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
/// DNS resolver state. Example partial yaml output of [crate::NetworkState]
/// with static DNS config:
/// ```yaml
/// ---
/// dns-resolver:
///   running:
///      server:
///      - 2001:db8:1::250
///      - 192.0.2.250
///      search:
///      - example.org
///      - example.net
///   config:
///      search:
///      - example.org
///      - example.net
///      server:
///      - 2001:db8:1::250
///      - 192.0.2.250
///      options:
///      - trust-ad
///      - rotate
/// ```
pub struct DnsState {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// The running effective state. The DNS server might be from DHCP(IPv6
    /// autoconf) or manual setup.
    /// Ignored when applying state.
    pub running: Option<DnsClientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// The static saved DNS resolver config.
    /// When applying, if this not mentioned(None), current static DNS config
    /// will be preserved as it was. If defined(Some), will override current
    /// static DNS config.
    pub config: Option<DnsClientState>,
}

impl DnsState {
    /// [DnsState] with empty static DNS resolver config.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_none() && self.config.is_none()
    }

    pub(crate) fn sanitize(&mut self) -> Result<(), NetstateError> {
        if let Some(config) = self.config.as_mut() {
            config.sanitize()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
/// DNS Client state
pub struct DnsClientState {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Name server IP address list.
    /// To remove all existing servers, please use `Some(Vec::new())`.
    /// If undefined(set to `None`), will preserve current config.
    pub server: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Search list for host-name lookup.
    /// To remove all existing search, please use `Some(Vec::new())`.
    /// If undefined(set to `None`), will preserve current config.
    pub search: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// DNS option list.
    /// To remove all existing search, please use `Some(Vec::new())`.
    /// If undefined(set to `None`), will preserve current config.
    pub options: Option<Vec<String>>,
    #[serde(skip)]
    // Lower is better
    pub(crate) priority: Option<i32>,
}

impl DnsClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.server.is_none() && self.search.is_none() && self.options.is_none()
    }

    /// DNS priority of the interface holding this config, only set on
    /// DNS bearer interfaces.
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    // Whether user want to purge all DNS settings
    pub(crate) fn is_purge(&self) -> bool {
        self.server.as_deref().unwrap_or_default().is_empty()
            && self.search.as_deref().unwrap_or_default().is_empty()
            && self.options.as_deref().unwrap_or_default().is_empty()
    }

    // Canonicalize the IP addresses and validate options.
    pub(crate) fn sanitize(&mut self) -> Result<(), NetstateError> {
        if let Some(srvs) = self.server.as_mut() {
            let mut sanitized_srvs = Vec::new();
            for srv in srvs.iter() {
                sanitized_srvs.push(sanitize_dns_srv(srv)?);
            }
            *srvs = sanitized_srvs;
        }
        if let Some(opts) = self.options.as_ref() {
            for opt in opts {
                let opt_name = opt.split(':').next().unwrap_or(opt.as_str());
                if !SUPPORTED_DNS_OPTIONS.contains(&opt_name) {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Unsupported DNS option {opt}, \
                            only support: {}",
                            SUPPORTED_DNS_OPTIONS.join(", ")
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

fn sanitize_dns_srv(srv: &str) -> Result<String, NetstateError> {
    if let Some((ip, iface_name)) = parse_dns_ipv6_link_local_srv(srv)? {
        return Ok(format!("{ip}%{iface_name}"));
    }
    if is_ipv6_addr(srv) {
        if let Ok(ip_addr) = srv.parse::<Ipv6Addr>() {
            return Ok(ip_addr.to_string());
        }
    } else if let Ok(ip_addr) = srv.parse::<Ipv4Addr>() {
        return Ok(ip_addr.to_string());
    }
    let e = NetstateError::new(
        ErrorKind::InvalidArgument,
        format!("Invalid DNS server string {srv}"),
    );
    log::error!("{}", e);
    Err(e)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedDnsState {
    pub(crate) desired: DnsState,
    pub(crate) current: DnsState,
    pub(crate) servers: Vec<String>,
    pub(crate) searches: Vec<String>,
    pub(crate) options: Vec<String>,
}

impl MergedDnsState {
    pub(crate) fn new(
        mut desired: DnsState,
        mut current: DnsState,
    ) -> Result<Self, NetstateError> {
        desired.sanitize()?;
        current.sanitize().ok();
        let cur_conf = current.config.clone().unwrap_or_default();
        let mut servers = cur_conf.server.unwrap_or_default();
        let mut searches = cur_conf.search.unwrap_or_default();
        let mut options = cur_conf.options.unwrap_or_default();

        if let Some(conf) = desired.config.as_ref() {
            if conf.is_purge() {
                servers.clear();
                searches.clear();
                options.clear();
            } else {
                if let Some(des_srvs) = conf.server.as_ref() {
                    servers.clone_from(des_srvs);
                }
                if let Some(des_schs) = conf.search.as_ref() {
                    searches.clone_from(des_schs);
                }
                if let Some(des_opts) = conf.options.as_ref() {
                    options.clone_from(des_opts);
                }
            }
        }
        validate_dns_srv_families(servers.as_slice())?;

        Ok(Self {
            desired,
            current,
            servers,
            searches,
            options,
        })
    }

    pub(crate) fn is_changed(&self) -> bool {
        let cur_conf = self.current.config.clone().unwrap_or_default();

        self.servers != cur_conf.server.unwrap_or_default()
            || self.searches != cur_conf.search.unwrap_or_default()
            || self.options != cur_conf.options.unwrap_or_default()
    }

    pub(crate) fn to_config(&self) -> DnsClientState {
        DnsClientState {
            server: Some(self.servers.clone()),
            search: Some(self.searches.clone()),
            options: Some(self.options.clone()),
            priority: None,
        }
    }
}

// Placing IPv4 name server between IPv6 name servers (or vice versa) cannot
// be expressed by per-interface DNS priority.
fn validate_dns_srv_families(servers: &[String]) -> Result<(), NetstateError> {
    let families: Vec<bool> =
        servers.iter().map(|s| is_ipv6_addr(s.as_str())).collect();
    if families.windows(3).any(|w| w[0] == w[2] && w[0] != w[1]) {
        let e = NetstateError::new(
            ErrorKind::NotImplementedError,
            format!(
                "Placing IPv4/IPv6 name server in the middle of IPv6/IPv4 \
                name servers is not supported yet: {}",
                servers.join(" ")
            ),
        );
        log::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

impl MergedInterfaces {
    // Store static DNS config as metadata of the bearer interfaces:
    //  * IPv6 link local server with `%iface` suffix goes to that interface.
    //  * Interface with static default gateway of that family.
    //  * Dynamic interface with `auto-dns: false`.
    //  * First interface with static IP of that family.
    // Search and options are stored with the first name server.
    pub(crate) fn place_dns(
        &mut self,
        merged_dns: &MergedDnsState,
        merged_routes: &MergedRoutes,
    ) -> Result<(), NetstateError> {
        if !merged_dns.is_changed() {
            return Ok(());
        }
        self.validate_ipv6_link_local_dns_srv(merged_dns)?;

        let ipv4_bearer = self.find_dns_bearer(false, merged_routes);
        let ipv6_bearer = self.find_dns_bearer(true, merged_routes);

        // (iface_name, is_ipv6) -> config
        let mut placements: Vec<((String, bool), DnsClientState)> = Vec::new();
        let mut extra_saved = false;

        for (index, srv) in merged_dns.servers.iter().enumerate() {
            let is_ipv6 = is_ipv6_addr(srv);
            let bearer = match parse_dns_ipv6_link_local_srv(srv)? {
                Some((_, iface_name)) => Some(iface_name.to_string()),
                None => {
                    if is_ipv6 {
                        ipv6_bearer.clone()
                    } else {
                        ipv4_bearer.clone()
                    }
                }
            };
            let bearer = match bearer {
                Some(b) => b,
                None => {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Failed to find suitable interface for saving \
                            DNS name server: {srv}, DNS can only be saved to \
                            interface with static gateway, auto interface \
                            with auto-dns:false or interface with static IP"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            };
            let key = (bearer, is_ipv6);
            let pos = match placements.iter().position(|(k, _)| k == &key) {
                Some(p) => p,
                None => {
                    placements.push((
                        key,
                        DnsClientState {
                            server: Some(Vec::new()),
                            search: Some(Vec::new()),
                            options: Some(Vec::new()),
                            priority: Some(
                                DNS_PRIORITY_STATIC_BASE + index as i32,
                            ),
                        },
                    ));
                    placements.len() - 1
                }
            };
            let conf = &mut placements[pos].1;
            if let Some(srvs) = conf.server.as_mut() {
                srvs.push(srv.to_string());
            }
            if !extra_saved {
                conf.search = Some(merged_dns.searches.clone());
                conf.options = Some(merged_dns.options.clone());
                extra_saved = true;
            }
        }

        if !extra_saved
            && !(merged_dns.searches.is_empty()
                && merged_dns.options.is_empty())
        {
            let bearer = match ipv4_bearer
                .map(|n| (n, false))
                .or_else(|| ipv6_bearer.map(|n| (n, true)))
            {
                Some(b) => b,
                None => {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Failed to find suitable interface for saving \
                            DNS search {:?}",
                            merged_dns.searches
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            };
            placements.push((
                bearer,
                DnsClientState {
                    server: Some(Vec::new()),
                    search: Some(merged_dns.searches.clone()),
                    options: Some(merged_dns.options.clone()),
                    priority: Some(DNS_PRIORITY_STATIC_BASE),
                },
            ));
        }

        if placements.is_empty() {
            // Purging, carried by any interface so provider knows DNS
            // changed.
            if let Some(name) = self.first_ip_iface() {
                placements.push(((name, false), DnsClientState::new()));
            } else {
                log::warn!("No interface found to carry DNS purge");
            }
        }

        for ((iface_name, is_ipv6), conf) in placements {
            log::debug!(
                "Placing DNS {:?} on interface {} IPv{}",
                conf,
                iface_name,
                if is_ipv6 { 6 } else { 4 }
            );
            if let Some(iface) = self.kernel_ifaces.get_mut(&iface_name) {
                iface.mark_as_changed();
                if let Some(apply_iface) = iface.for_apply.as_mut() {
                    let base = apply_iface.base_iface_mut();
                    if is_ipv6 {
                        if base.ipv6.is_none() {
                            base.ipv6 = iface.merged.base_iface().ipv6.clone();
                        }
                        if let Some(ipv6) = base.ipv6.as_mut() {
                            ipv6.dns = Some(conf);
                        }
                    } else {
                        if base.ipv4.is_none() {
                            base.ipv4 = iface.merged.base_iface().ipv4.clone();
                        }
                        if let Some(ipv4) = base.ipv4.as_mut() {
                            ipv4.dns = Some(conf);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn find_dns_bearer(
        &self,
        is_ipv6: bool,
        merged_routes: &MergedRoutes,
    ) -> Option<String> {
        let valid = |name: &str| {
            self.kernel_ifaces
                .get(name)
                .map(|i| {
                    !i.merged.is_ignore()
                        && !i.merged.is_absent()
                        && i.merged.is_iface_valid_for_dns(is_ipv6)
                })
                .unwrap_or_default()
        };
        if let Some(name) = merged_routes.gateway_iface(is_ipv6) {
            if valid(name) {
                return Some(name.to_string());
            }
        }
        let mut auto_ifaces: Vec<&str> = self
            .kernel_ifaces
            .values()
            .filter(|i| {
                let base = i.merged.base_iface();
                if is_ipv6 {
                    base.ipv6
                        .as_ref()
                        .map(|ip| ip.is_auto() && ip.auto_dns == Some(false))
                        == Some(true)
                } else {
                    base.ipv4
                        .as_ref()
                        .map(|ip| ip.is_auto() && ip.auto_dns == Some(false))
                        == Some(true)
                }
            })
            .map(|i| i.merged.name())
            .filter(|n| valid(n))
            .collect();
        auto_ifaces.sort_unstable();
        if let Some(name) = auto_ifaces.first() {
            return Some(name.to_string());
        }
        self.first_static_iface(is_ipv6)
    }

    // * Specified interface is valid for hold IPv6 DNS config.
    // * Cannot have more than one IPv6 link-local DNS interface.
    fn validate_ipv6_link_local_dns_srv(
        &self,
        merged_dns: &MergedDnsState,
    ) -> Result<(), NetstateError> {
        let mut iface_names: HashSet<&str> = HashSet::new();
        for srv in merged_dns.servers.as_slice() {
            if let Some((_, iface_name)) = parse_dns_ipv6_link_local_srv(srv)? {
                let iface = match self.kernel_ifaces.get(iface_name) {
                    Some(i) => i,
                    None => {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "Desired IPv6 link local DNS server {srv} is \
                                pointing to interface {iface_name} \
                                which does not exist."
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                };
                if iface.merged.is_iface_valid_for_dns(true) {
                    iface_names.insert(iface.merged.name());
                } else {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {iface_name} has IPv6 disabled, \
                            hence cannot hold desired IPv6 link local \
                            DNS server {srv}"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        if iface_names.len() >= 2 {
            let mut names: Vec<&str> = iface_names.into_iter().collect();
            names.sort_unstable();
            let e = NetstateError::new(
                ErrorKind::NotImplementedError,
                format!(
                    "Only support IPv6 link local DNS name server(s) \
                    pointing to a single interface, but got '{}'",
                    names.join(" ")
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        Ok(())
    }
}

pub(crate) fn parse_dns_ipv6_link_local_srv(
    srv: &str,
) -> Result<Option<(Ipv6Addr, &str)>, NetstateError> {
    if let Some((ip, iface_name)) = srv.split_once('%') {
        if iface_name.is_empty() || iface_name.contains('%') {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Invalid DNS server {srv}, the IPv6 \
                    link local DNS server should be in the format like \
                    'fe80::deef:1%eth1'"
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        match Ipv6Addr::from_str(ip) {
            Ok(ip) => Ok(Some((ip, iface_name))),
            Err(_) => {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Invalid IPv6 address in {srv}, only IPv6 link local \
                        address is allowed to have '%' character in DNS \
                        name server, the correct format should be \
                        'fe80::deef:1%eth1'"
                    ),
                );
                log::error!("{}", e);
                Err(e)
            }
        }
    } else {
        Ok(None)
    }
}
