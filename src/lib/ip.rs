// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    iplib::{is_ipv6_unicast_link_local, AF_INET, AF_INET6},
    BaseInterface, DnsClientState, ErrorKind, MptcpAddressFlag, NetstateError,
    RouteEntry, RouteRuleEntry,
};

const LIFETIME_FOREVER: &str = "forever";

// YAML key and the matching property name tracked in `prop_list`.
const IP_PROPS: [(&str, &str); 13] = [
    ("enabled", "enabled"),
    ("dhcp", "dhcp"),
    ("autoconf", "autoconf"),
    ("dhcp-client-id", "dhcp_client_id"),
    ("dhcp-duid", "dhcp_duid"),
    ("address", "addresses"),
    ("auto-dns", "auto_dns"),
    ("auto-gateway", "auto_gateway"),
    ("auto-routes", "auto_routes"),
    ("auto-route-table-id", "auto_table_id"),
    ("auto-route-metric", "auto_route_metric"),
    ("addr-gen-mode", "addr_gen_mode"),
    ("token", "token"),
];

// Wire form shared by both families, the family specific keys are
// rejected by the `Deserialize` of [InterfaceIpv4] and [InterfaceIpv6].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct InterfaceIp {
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    enabled: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    dhcp: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    autoconf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dhcp_client_id: Option<Dhcpv4ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dhcp_duid: Option<Dhcpv6Duid>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "address")]
    addresses: Option<Vec<InterfaceIpAddr>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    auto_dns: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    auto_gateway: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    auto_routes: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "auto-route-table-id",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    auto_table_id: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    auto_route_metric: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    addr_gen_mode: Option<Ipv6AddrGenMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    allow_extra_address: Option<bool>,
}

// Parse the wire form, refusing keys listed in `not_allowed` with the
// given message.
fn parse_ip_section<E>(
    value: Value,
    not_allowed: &[(&str, &str)],
) -> Result<(InterfaceIp, Vec<&'static str>), E>
where
    E: serde::de::Error,
{
    let prop_list = value
        .as_object()
        .map(get_ip_prop_list)
        .unwrap_or_default();
    if let Some((_, msg)) = not_allowed
        .iter()
        .find(|(prop, _)| prop_list.iter().any(|p| p == prop))
    {
        return Err(E::custom(msg));
    }
    let ip = InterfaceIp::deserialize(value).map_err(E::custom)?;
    Ok((ip, prop_list))
}

fn get_ip_prop_list(map: &Map<String, Value>) -> Vec<&'static str> {
    IP_PROPS
        .iter()
        .filter(|(key, _)| map.contains_key(*key))
        .map(|(_, prop)| *prop)
        .collect()
}

// `enabled` is only shown when it was defined or is known.
fn defined_enabled(prop_list: &[&str], enabled: bool) -> Option<bool> {
    prop_list.contains(&"enabled").then_some(enabled)
}

fn validate_addresses(
    addrs: &[InterfaceIpAddr],
    family: AddressFamily,
) -> Result<(), NetstateError> {
    let max_prefix = match family {
        AddressFamily::IPv6 => 128,
        _ => 32,
    };
    for addr in addrs {
        let msg = if addr.ip.is_ipv6() != (family == AddressFamily::IPv6) {
            format!(
                "Got {} address {}/{} in {family} config section",
                AddressFamily::of(&addr.ip).label(),
                addr.ip,
                addr.prefix_length
            )
        } else if addr.prefix_length > max_prefix {
            format!(
                "Invalid {} network prefix length '{}', should be in \
                the range of 0 to {max_prefix}",
                family.label(),
                addr.prefix_length
            )
        } else {
            continue;
        };
        let e = NetstateError::new(ErrorKind::InvalidArgument, msg);
        log::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

// Dynamic IP implies the auto options unless told otherwise, and the
// static addresses among dynamic ones are dropped.
fn fill_auto_options(
    auto_dns: &mut Option<bool>,
    auto_routes: &mut Option<bool>,
    auto_gateway: &mut Option<bool>,
    addresses: &mut Option<Vec<InterfaceIpAddr>>,
) {
    for opt in [auto_dns, auto_routes, auto_gateway] {
        opt.get_or_insert(true);
    }
    if let Some(addrs) = addresses.as_mut() {
        addrs.retain(|a| !a.is_auto());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(into = "InterfaceIp")]
#[non_exhaustive]
/// The `ipv4` section of an interface.
///
/// A disabled stack carries nothing else. When `dhcp` is on, the
/// `auto-*` options tune what is taken from the DHCP server, and they
/// are dropped otherwise.
/// ```yaml
/// ipv4:
///   enabled: true
///   dhcp: false
///   address:
///   - ip: 192.0.2.252
///     prefix-length: 24
/// ```
pub struct InterfaceIpv4 {
    pub enabled: bool,
    pub(crate) prop_list: Vec<&'static str>,
    pub dhcp: Option<bool>,
    /// Shown as `dhcp-client-id`.
    pub dhcp_client_id: Option<Dhcpv4ClientId>,
    /// `None` keeps the current addresses on apply while an empty list
    /// removes them all.
    pub addresses: Option<Vec<InterfaceIpAddr>>,
    pub auto_dns: Option<bool>,
    pub auto_gateway: Option<bool>,
    pub auto_routes: Option<bool>,
    /// Route table of DHCP routes, main table when undefined.
    pub auto_table_id: Option<u32>,
    pub auto_route_metric: Option<u32>,
    /// Let verification pass with extra addresses in current state.
    pub allow_extra_address: Option<bool>,
    pub(crate) dns: Option<DnsClientState>,
    pub(crate) routes: Option<Vec<RouteEntry>>,
    pub(crate) rules: Option<Vec<RouteRuleEntry>>,
}

impl InterfaceIpv4 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static DNS config placed on this stack for the provider to persist.
    /// `priority` orders the interfaces holding DNS.
    pub fn dns(&self) -> Option<&DnsClientState> {
        self.dns.as_ref()
    }

    /// Every static IPv4 route of this interface, only set when any of them
    /// changed.
    pub fn routes(&self) -> Option<&[RouteEntry]> {
        self.routes.as_deref()
    }

    /// IPv4 route rules bound to this interface, absent ones included.
    pub fn rules(&self) -> Option<&[RouteRuleEntry]> {
        self.rules.as_deref()
    }

    pub(crate) fn is_auto(&self) -> bool {
        self.enabled && self.dhcp == Some(true)
    }

    pub fn is_static(&self) -> bool {
        self.enabled
            && !self.is_auto()
            && self.addresses.as_ref().map_or(false, |a| !a.is_empty())
    }

    pub(crate) fn is_enabled_defined(&self) -> bool {
        self.prop_list.contains(&"enabled")
    }

    pub(crate) fn cleanup(&mut self) {
        if !self.enabled {
            self.dhcp = None;
            self.dhcp_client_id = None;
            self.addresses = None;
        }
        if self.dhcp != Some(true) {
            self.auto_dns = None;
            self.auto_gateway = None;
            self.auto_routes = None;
            self.auto_table_id = None;
            self.auto_route_metric = None;
        }
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if let Some(addrs) = self.addresses.as_deref() {
            validate_addresses(addrs, AddressFamily::IPv4)?;
            if is_desired && self.is_auto() {
                let static_addrs: Vec<String> = addrs
                    .iter()
                    .filter(|a| !a.is_auto())
                    .map(String::from)
                    .collect();
                if !static_addrs.is_empty() {
                    log::info!(
                        "Static addresses {} defined when dynamic IP is \
                        enabled",
                        static_addrs.join(", ")
                    );
                }
            }
        }
        if is_desired && self.is_enabled_defined() && !self.enabled {
            self.cleanup();
        }
        Ok(())
    }

    // On top of the JSON merge: turning DHCP off keeps the leased
    // addresses as static ones, turning it on drops the static ones.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        if !desired.is_enabled_defined() {
            self.enabled = current.enabled;
            self.prop_list.push("enabled");
        }
        if !self.enabled {
            self.cleanup();
            return;
        }
        if desired.dhcp.is_none() {
            self.dhcp = current.dhcp;
        }
        if desired.addresses.is_none() {
            if current.is_auto() && !self.is_auto() {
                self.addresses = current.addresses.as_ref().map(|addrs| {
                    addrs.iter().map(InterfaceIpAddr::to_static).collect()
                });
                if let Some(addrs) = self.addresses.as_ref() {
                    log::debug!(
                        "Keeping {} DHCPv4 addresses as static",
                        addrs.len()
                    );
                }
            } else if self.is_auto() {
                self.addresses = None;
            }
        }
        self.cleanup();
    }

    pub(crate) fn pre_edit_cleanup(&mut self) {
        if self.is_auto() {
            fill_auto_options(
                &mut self.auto_dns,
                &mut self.auto_routes,
                &mut self.auto_gateway,
                &mut self.addresses,
            );
        }
        self.allow_extra_address = None;
        self.cleanup();
    }
}

impl<'de> Deserialize<'de> for InterfaceIpv4 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (ip, prop_list) = parse_ip_section::<D::Error>(
            Value::deserialize(deserializer)?,
            &[
                ("autoconf", "autoconf is not allowed for IPv4"),
                ("dhcp_duid", "dhcp-duid is not allowed for IPv4"),
                ("addr_gen_mode", "addr-gen-mode is not allowed for IPv4"),
                ("token", "token is not allowed for IPv4"),
            ],
        )?;
        Ok(Self {
            enabled: ip.enabled.unwrap_or_default(),
            prop_list,
            dhcp: ip.dhcp,
            dhcp_client_id: ip.dhcp_client_id,
            addresses: ip.addresses,
            auto_dns: ip.auto_dns,
            auto_gateway: ip.auto_gateway,
            auto_routes: ip.auto_routes,
            auto_table_id: ip.auto_table_id,
            auto_route_metric: ip.auto_route_metric,
            allow_extra_address: ip.allow_extra_address,
            ..Default::default()
        })
    }
}

impl From<InterfaceIpv4> for InterfaceIp {
    fn from(v4: InterfaceIpv4) -> Self {
        Self {
            enabled: defined_enabled(&v4.prop_list, v4.enabled),
            dhcp: v4.dhcp,
            dhcp_client_id: v4.dhcp_client_id,
            addresses: v4.addresses,
            auto_dns: v4.auto_dns,
            auto_gateway: v4.auto_gateway,
            auto_routes: v4.auto_routes,
            auto_table_id: v4.auto_table_id,
            auto_route_metric: v4.auto_route_metric,
            allow_extra_address: v4.allow_extra_address,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(into = "InterfaceIp")]
#[non_exhaustive]
/// The `ipv6` section of an interface.
///
/// Dynamic IP means DHCPv6 or router advertisement (`autoconf`), and
/// autoconf requires DHCPv6 not being explicitly disabled. Link local
/// addresses are managed by kernel and ignored in desired state.
/// ```yaml
/// ipv6:
///   enabled: true
///   dhcp: true
///   autoconf: true
///   token: ::fe80:1
/// ```
pub struct InterfaceIpv6 {
    /// Disabling removes the link local address as well.
    pub enabled: bool,
    pub(crate) prop_list: Vec<&'static str>,
    pub dhcp: Option<bool>,
    /// Shown as `dhcp-duid`.
    pub dhcp_duid: Option<Dhcpv6Duid>,
    pub autoconf: Option<bool>,
    /// Shown as `addr-gen-mode`.
    pub addr_gen_mode: Option<Ipv6AddrGenMode>,
    /// Interface identifier used by autoconf, normalized to `::x:y` form.
    pub token: Option<String>,
    /// `None` keeps the current addresses on apply while an empty list
    /// removes them all.
    pub addresses: Option<Vec<InterfaceIpAddr>>,
    pub auto_dns: Option<bool>,
    pub auto_gateway: Option<bool>,
    pub auto_routes: Option<bool>,
    pub auto_table_id: Option<u32>,
    pub auto_route_metric: Option<u32>,
    /// Let verification pass with extra addresses in current state.
    pub allow_extra_address: Option<bool>,
    pub(crate) dns: Option<DnsClientState>,
    pub(crate) routes: Option<Vec<RouteEntry>>,
    pub(crate) rules: Option<Vec<RouteRuleEntry>>,
}

impl InterfaceIpv6 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static DNS config placed on this stack for the provider to persist.
    /// `priority` orders the interfaces holding DNS.
    pub fn dns(&self) -> Option<&DnsClientState> {
        self.dns.as_ref()
    }

    /// Every static IPv6 route of this interface, only set when any of them
    /// changed.
    pub fn routes(&self) -> Option<&[RouteEntry]> {
        self.routes.as_deref()
    }

    /// IPv6 route rules bound to this interface, absent ones included.
    pub fn rules(&self) -> Option<&[RouteRuleEntry]> {
        self.rules.as_deref()
    }

    pub(crate) fn is_auto(&self) -> bool {
        self.enabled && (self.dhcp == Some(true) || self.autoconf == Some(true))
    }

    pub fn is_static(&self) -> bool {
        self.enabled
            && !self.is_auto()
            && self.addresses.as_ref().map_or(false, |a| !a.is_empty())
    }

    pub(crate) fn is_enabled_defined(&self) -> bool {
        self.prop_list.contains(&"enabled")
    }

    pub(crate) fn cleanup(&mut self) {
        if !self.enabled {
            self.dhcp = None;
            self.autoconf = None;
            self.dhcp_duid = None;
            self.addresses = None;
            self.addr_gen_mode = None;
            self.token = None;
        }
        if !self.is_auto() {
            self.auto_dns = None;
            self.auto_gateway = None;
            self.auto_routes = None;
            self.auto_table_id = None;
            self.auto_route_metric = None;
        }
    }

    pub(crate) fn sanitize(
        &mut self,
        is_desired: bool,
    ) -> Result<(), NetstateError> {
        if let Some(addrs) = self.addresses.as_mut() {
            validate_addresses(addrs.as_slice(), AddressFamily::IPv6)?;
            if is_desired {
                for addr in addrs.iter().filter(|a| a.is_link_local()) {
                    log::warn!(
                        "Ignoring IPv6 link local address {}",
                        String::from(addr)
                    );
                }
                addrs.retain(|a| !a.is_link_local());
            }
        }
        if is_desired
            && self.enabled
            && self.autoconf == Some(true)
            && self.dhcp == Some(false)
        {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                "IPv6 autoconf cannot be enabled with DHCPv6 disabled"
                    .to_string(),
            );
            log::error!("{}", e);
            return Err(e);
        }
        self.token = match self.token.take() {
            Some(token) if token.is_empty() => None,
            Some(token) => Some(normalize_ipv6_token(&token)?),
            None => None,
        };
        if is_desired && self.is_enabled_defined() && !self.enabled {
            self.cleanup();
        }
        Ok(())
    }

    // On top of the JSON merge: turning dynamic IP off keeps the leased
    // addresses (except link local) as static ones, turning it on drops
    // the static ones.
    pub(crate) fn special_merge(&mut self, desired: &Self, current: &Self) {
        if !desired.is_enabled_defined() {
            self.enabled = current.enabled;
            self.prop_list.push("enabled");
        }
        if !self.enabled {
            self.cleanup();
            return;
        }
        if desired.dhcp.is_none() {
            self.dhcp = current.dhcp;
        }
        if desired.autoconf.is_none() {
            self.autoconf = current.autoconf;
        }
        if desired.addresses.is_none() {
            if current.is_auto() && !self.is_auto() {
                self.addresses = current.addresses.as_ref().map(|addrs| {
                    addrs
                        .iter()
                        .filter(|a| !a.is_link_local())
                        .map(InterfaceIpAddr::to_static)
                        .collect()
                });
            } else if self.is_auto() {
                self.addresses = None;
            }
        }
        self.cleanup();
    }

    pub(crate) fn pre_edit_cleanup(&mut self) {
        if let Some(addrs) = self.addresses.as_mut() {
            addrs.retain(|a| !a.is_link_local());
        }
        if self.is_auto() {
            fill_auto_options(
                &mut self.auto_dns,
                &mut self.auto_routes,
                &mut self.auto_gateway,
                &mut self.addresses,
            );
        }
        self.allow_extra_address = None;
        self.cleanup();
    }
}

// Token is the lower 64 bits of an IPv6 address, `::` prefix optional.
fn normalize_ipv6_token(token: &str) -> Result<String, NetstateError> {
    let full = format!("::{}", token.trim_start_matches("::"));
    Ipv6Addr::from_str(&full)
        .map(|ip| ip.to_string())
        .map_err(|e| {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid IPv6 token {token}: {e}"),
            );
            log::error!("{}", e);
            e
        })
}

impl<'de> Deserialize<'de> for InterfaceIpv6 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (ip, prop_list) = parse_ip_section::<D::Error>(
            Value::deserialize(deserializer)?,
            &[("dhcp_client_id", "dhcp-client-id is not allowed for IPv6")],
        )?;
        Ok(Self {
            enabled: ip.enabled.unwrap_or_default(),
            prop_list,
            dhcp: ip.dhcp,
            dhcp_duid: ip.dhcp_duid,
            autoconf: ip.autoconf,
            addr_gen_mode: ip.addr_gen_mode,
            token: ip.token,
            addresses: ip.addresses,
            auto_dns: ip.auto_dns,
            auto_gateway: ip.auto_gateway,
            auto_routes: ip.auto_routes,
            auto_table_id: ip.auto_table_id,
            auto_route_metric: ip.auto_route_metric,
            allow_extra_address: ip.allow_extra_address,
            ..Default::default()
        })
    }
}

impl From<InterfaceIpv6> for InterfaceIp {
    fn from(v6: InterfaceIpv6) -> Self {
        Self {
            enabled: defined_enabled(&v6.prop_list, v6.enabled),
            dhcp: v6.dhcp,
            autoconf: v6.autoconf,
            dhcp_duid: v6.dhcp_duid,
            addresses: v6.addresses,
            auto_dns: v6.auto_dns,
            auto_gateway: v6.auto_gateway,
            auto_routes: v6.auto_routes,
            auto_table_id: v6.auto_table_id,
            auto_route_metric: v6.auto_route_metric,
            addr_gen_mode: v6.addr_gen_mode,
            token: v6.token,
            allow_extra_address: v6.allow_extra_address,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Address with its prefix length. Lifetimes are only reported for
/// addresses obtained from DHCP or autoconf.
pub struct InterfaceIpAddr {
    pub ip: IpAddr,
    #[serde(deserialize_with = "crate::deserializer::u8_or_string")]
    pub prefix_length: u8,
    #[serde(skip_serializing_if = "is_none_or_empty_mptcp_flags", default)]
    /// Interface level MPTCP flags are copied to addresses holding none.
    pub mptcp_flags: Option<Vec<MptcpAddressFlag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// `forever` or seconds with `sec` suffix.
    pub valid_left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_left: Option<String>,
}

impl Default for InterfaceIpAddr {
    fn default() -> Self {
        Self::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 128)
    }
}

impl InterfaceIpAddr {
    pub fn new(ip: IpAddr, prefix_length: u8) -> Self {
        Self {
            ip,
            prefix_length,
            mptcp_flags: None,
            valid_left: None,
            preferred_left: None,
        }
    }

    pub(crate) fn is_link_local(&self) -> bool {
        matches!(self.ip, IpAddr::V6(ip) if is_ipv6_unicast_link_local(&ip))
    }

    // Finite lifetime means the address is dynamic.
    pub(crate) fn is_auto(&self) -> bool {
        matches!(self.valid_left.as_deref(), Some(v) if v != LIFETIME_FOREVER)
    }

    pub(crate) fn to_static(&self) -> Self {
        Self::new(self.ip, self.prefix_length)
    }
}

impl TryFrom<&str> for InterfaceIpAddr {
    type Error = NetstateError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (ip, prefix_length) = crate::iplib::parse_ip_net(value)?;
        Ok(Self::new(ip, prefix_length))
    }
}

impl From<&InterfaceIpAddr> for String {
    fn from(v: &InterfaceIpAddr) -> String {
        format!("{}/{}", v.ip, v.prefix_length)
    }
}

fn is_none_or_empty_mptcp_flags(v: &Option<Vec<MptcpAddressFlag>>) -> bool {
    v.as_ref().map_or(true, Vec::is_empty)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(from = "String", into = "String")]
/// DHCPv4 client identifier, `ll`, `iaid+duid` or a backend specific
/// string such as a hex client ID.
pub enum Dhcpv4ClientId {
    LinkLayerAddress,
    /// RFC 4361, IAID followed by DUID.
    IaidPlusDuid,
    Other(String),
}

impl From<String> for Dhcpv4ClientId {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ll" => Self::LinkLayerAddress,
            "iaid+duid" => Self::IaidPlusDuid,
            _ => Self::Other(s),
        }
    }
}

impl From<Dhcpv4ClientId> for String {
    fn from(v: Dhcpv4ClientId) -> Self {
        match v {
            Dhcpv4ClientId::LinkLayerAddress => "ll".into(),
            Dhcpv4ClientId::IaidPlusDuid => "iaid+duid".into(),
            Dhcpv4ClientId::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(from = "String", into = "String")]
/// DHCPv6 unique identifier type of RFC 8415: `llt`, `en`, `ll`, `uuid`
/// or a backend specific string.
pub enum Dhcpv6Duid {
    LinkLayerAddressPlusTime,
    EnterpriseNumber,
    LinkLayerAddress,
    Uuid,
    Other(String),
}

impl From<String> for Dhcpv6Duid {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "llt" => Self::LinkLayerAddressPlusTime,
            "en" => Self::EnterpriseNumber,
            "ll" => Self::LinkLayerAddress,
            "uuid" => Self::Uuid,
            _ => Self::Other(s),
        }
    }
}

impl From<Dhcpv6Duid> for String {
    fn from(v: Dhcpv6Duid) -> Self {
        match v {
            Dhcpv6Duid::LinkLayerAddressPlusTime => "llt".into(),
            Dhcpv6Duid::EnterpriseNumber => "en".into(),
            Dhcpv6Duid::LinkLayerAddress => "ll".into(),
            Dhcpv6Duid::Uuid => "uuid".into(),
            Dhcpv6Duid::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(from = "String", into = "String")]
/// How the IPv6 interface identifier is generated: `eui64` (RFC 4862),
/// `stable-privacy` (RFC 7217) or a backend specific string.
pub enum Ipv6AddrGenMode {
    Eui64,
    StablePrivacy,
    Other(String),
}

impl From<String> for Ipv6AddrGenMode {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "eui64" => Self::Eui64,
            "stable-privacy" => Self::StablePrivacy,
            _ => Self::Other(s),
        }
    }
}

impl From<Ipv6AddrGenMode> for String {
    fn from(v: Ipv6AddrGenMode) -> Self {
        match v {
            Ipv6AddrGenMode::Eui64 => "eui64".into(),
            Ipv6AddrGenMode::StablePrivacy => "stable-privacy".into(),
            Ipv6AddrGenMode::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// The IP stack(s) an activation waits for before being considered done:
/// `any`, `ipv4`, `ipv6` or `ipv4+ipv6`.
pub enum WaitIp {
    Any,
    Ipv4,
    Ipv6,
    #[serde(rename = "ipv4+ipv6")]
    Ipv4AndIpv6,
}

impl WaitIp {
    fn needs(&self, family: AddressFamily) -> bool {
        match self {
            Self::Any => false,
            Self::Ipv4 => family == AddressFamily::IPv4,
            Self::Ipv6 => family == AddressFamily::IPv6,
            Self::Ipv4AndIpv6 => true,
        }
    }
}

impl std::fmt::Display for WaitIp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Any => "any",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Ipv4AndIpv6 => "ipv4+ipv6",
        })
    }
}

pub(crate) fn validate_wait_ip(
    base_iface: &BaseInterface,
) -> Result<(), NetstateError> {
    let wait_ip = match base_iface.wait_ip {
        Some(w) => w,
        None => return Ok(()),
    };
    for (family, enabled) in [
        (AddressFamily::IPv4, base_iface.is_ipv4_enabled()),
        (AddressFamily::IPv6, base_iface.is_ipv6_enabled()),
    ] {
        if wait_ip.needs(family) && !enabled {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Cannot set 'wait-ip: {wait_ip}' with {} disabled. \
                    Interface: {}({})",
                    family.label(),
                    base_iface.name,
                    base_iface.iface_type
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AddressFamily {
    #[default]
    IPv4,
    IPv6,
    Unknown,
}

impl AddressFamily {
    pub(crate) fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::IPv4,
            IpAddr::V6(_) => Self::IPv6,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::IPv4 => "IPv4",
            Self::IPv6 => "IPv6",
            Self::Unknown => "unknown",
        }
    }
}

impl From<u8> for AddressFamily {
    fn from(d: u8) -> Self {
        match d {
            AF_INET => Self::IPv4,
            AF_INET6 => Self::IPv6,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::IPv4 => "ipv4",
            Self::IPv6 => "ipv6",
            Self::Unknown => "unknown",
        })
    }
}
