// SPDX-License-Identifier: Apache-2.0

use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::{
    iplib::{
        canonicalize_ip_addr, is_default_route_dst, is_ipv6_addr,
        parse_ip_net, sanitize_ip_network,
    },
    ErrorKind, InterfaceType, MergedInterfaces, NetstateError,
};

const DEFAULT_TABLE_ID: u32 = 254; // main route table ID
pub(crate) const LOOPBACK_IFACE_NAME: &str = "lo";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
/// IP routing status
pub struct Routes {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Running effected routes including those from DHCP or IPv6
    /// autoconf.
    /// Ignored when applying.
    pub running: Option<Vec<RouteEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Static routes.
    ///
    /// When applying, `None` means preserve current routes.
    /// This property is not overriding but adding specified routes to
    /// existing routes. To delete a route entry, please [RouteEntry.state] as
    /// [RouteState::Absent]. Any property of absent [RouteEntry] set to
    /// `None` means wildcard. For example, this [crate::NetworkState] could
    /// remove all routes next hop to interface eth1(showing in yaml):
    /// ```yaml
    /// routes:
    ///   config:
    ///   - next-hop-interface: eth1
    ///     state: absent
    /// ```
    ///
    /// To change a route entry, you need to delete old one and add new one(can
    /// be in single transaction).
    pub config: Option<Vec<RouteEntry>>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_none() && self.config.is_none()
    }

    pub(crate) fn validate(&self) -> Result<(), NetstateError> {
        // All desire non-absent route should have next hop interface except
        // for route with route type `Blackhole`, `Unreachable`, `Prohibit`.
        for route in self.config.as_deref().unwrap_or_default() {
            if !route.is_absent() {
                if route.destination.is_none() {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!("Route destination is mandatory: {route}"),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                if let Some(route_type) = route.route_type {
                    if route.next_hop_addr.is_some()
                        || (route.next_hop_iface.is_some()
                            && route.next_hop_iface.as_deref()
                                != Some(LOOPBACK_IFACE_NAME))
                    {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "A {route_type} route cannot have a next \
                                hop: {route}"
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                } else if route.next_hop_iface.is_none() {
                    let e = NetstateError::new(
                        ErrorKind::NotImplementedError,
                        format!(
                            "Route with empty next hop interface \
                            is not supported: {route}"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
            validate_route_dst(route)?;
        }
        Ok(())
    }

    // Remove routes holding dynamic data. Routes learned from DHCP or
    // autoconf are only found in `running`.
    pub(crate) fn hide_running(&mut self) {
        self.running = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum RouteState {
    /// Route should exist. Default when not defined.
    #[default]
    Present,
    /// Mark a route entry as absent to remove it.
    Absent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// A static route. In desired state, an entry with `state: absent` acts as
/// a filter: every current route it matches is removed, undefined
/// properties matching anything.
pub struct RouteEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RouteState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Destination network, required unless absent.
    pub destination: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "next-hop-interface"
    )]
    /// Required unless absent or holding a `route-type`.
    pub next_hop_iface: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "next-hop-address"
    )]
    /// Gateway. An empty string in an absent route only matches routes
    /// without gateway.
    pub next_hop_addr: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_i64_or_string"
    )]
    /// [RouteEntry::USE_DEFAULT_METRIC] leaves the choice to the provider.
    pub metric: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    /// [RouteEntry::USE_DEFAULT_ROUTE_TABLE] means the main table.
    pub table_id: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    /// ECMP weight, 1 to 256, IPv4 only.
    pub weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_type: Option<RouteType>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    /// Congestion window clamp, non zero.
    pub cwnd: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Preferred source address of packets using this route.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
/// Routes dropping traffic, they need no next hop.
pub enum RouteType {
    Blackhole,
    Unreachable,
    Prohibit,
}

impl std::fmt::Display for RouteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Blackhole => "blackhole",
            Self::Unreachable => "unreachable",
            Self::Prohibit => "prohibit",
        })
    }
}

// `None` in `filter` matches anything.
fn wildcard_eq<T: PartialEq>(filter: &Option<T>, value: &Option<T>) -> bool {
    filter.is_none() || filter == value
}

fn table_or_main(table_id: Option<u32>) -> u32 {
    match table_id {
        None | Some(RouteEntry::USE_DEFAULT_ROUTE_TABLE) => DEFAULT_TABLE_ID,
        Some(i) => i,
    }
}

fn invalid_route(kind: ErrorKind, msg: String) -> NetstateError {
    let e = NetstateError::new(kind, msg);
    log::error!("{}", e);
    e
}

impl RouteEntry {
    pub const USE_DEFAULT_METRIC: i64 = -1;
    pub const USE_DEFAULT_ROUTE_TABLE: u32 = 0;

    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_absent(&self) -> bool {
        matches!(self.state, Some(RouteState::Absent))
    }

    /// Whether `self`, used as a filter, matches `other`. Metric is never
    /// compared.
    pub(crate) fn is_match(&self, other: &Self) -> bool {
        let dst_matches = match self.destination.as_deref() {
            None | Some("") => true,
            dst => dst == other.destination.as_deref(),
        };
        let via_matches = match self.next_hop_addr.as_deref() {
            None => true,
            Some("") => other.next_hop_addr.is_none(),
            via => via == other.next_hop_addr.as_deref(),
        };
        let table_matches =
            matches!(self.table_id, None | Some(Self::USE_DEFAULT_ROUTE_TABLE))
                || table_or_main(self.table_id)
                    == table_or_main(other.table_id);
        dst_matches
            && via_matches
            && table_matches
            && wildcard_eq(&self.next_hop_iface, &other.next_hop_iface)
            && wildcard_eq(&self.weight, &other.weight)
            && wildcard_eq(&self.route_type, &other.route_type)
            && wildcard_eq(&self.cwnd, &other.cwnd)
            && wildcard_eq(&self.source, &other.source)
    }

    // Identity of a route: everything but metric. Absent first, then
    // IPv6 before IPv4 when sorted.
    fn sort_key(&self) -> (bool, bool, u32, &str, &str, &str, &str, u16, u32) {
        (
            !self.is_absent(),
            !self.is_ipv6(),
            table_or_main(self.table_id),
            self.iface_name(),
            self.destination.as_deref().unwrap_or_default(),
            self.next_hop_addr.as_deref().unwrap_or_default(),
            self.source.as_deref().unwrap_or_default(),
            self.weight.unwrap_or_default(),
            self.cwnd.unwrap_or_default(),
        )
    }

    pub(crate) fn sanitize(&mut self) -> Result<(), NetstateError> {
        if self.state == Some(RouteState::Present) {
            self.state = None;
        }
        self.destination = match self.destination.take() {
            Some(dst) if dst.is_empty() => None,
            Some(dst) => Some(canonicalize_prop(
                "destination",
                dst,
                sanitize_ip_network,
            )?),
            None => None,
        };
        self.next_hop_addr = match self.next_hop_addr.take() {
            Some(via) if !via.is_empty() => Some(canonicalize_prop(
                "next-hop-address",
                via,
                canonicalize_ip_addr,
            )?),
            via => via,
        };
        self.source = match self.source.take() {
            Some(src) => {
                Some(canonicalize_prop("source", src, canonicalize_ip_addr)?)
            }
            None => None,
        };
        if self.table_id == Some(Self::USE_DEFAULT_ROUTE_TABLE)
            && !self.is_absent()
        {
            self.table_id = None;
        }
        match self.weight {
            Some(w) if !(1..=256).contains(&w) => {
                return Err(invalid_route(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Invalid ECMP route weight {w}, should be in the \
                        range of 1 to 256"
                    ),
                ));
            }
            Some(_) if self.is_ipv6() => {
                return Err(invalid_route(
                    ErrorKind::NotSupportedError,
                    "IPv6 ECMP route with weight is not supported yet"
                        .to_string(),
                ));
            }
            _ => (),
        }
        if self.cwnd == Some(0) {
            return Err(invalid_route(
                ErrorKind::InvalidArgument,
                "The value of 'cwnd' cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_ipv6(&self) -> bool {
        self.destination.as_deref().map_or(false, is_ipv6_addr)
    }

    pub(crate) fn is_unicast(&self) -> bool {
        self.route_type.is_none()
    }

    /// Whether this is a default gateway route, `0.0.0.0/0` or `::/0`.
    pub(crate) fn is_gateway(&self) -> bool {
        !self.is_absent()
            && self.next_hop_addr.is_some()
            && self.destination.as_deref().map_or(false, is_default_route_dst)
    }

    fn iface_name(&self) -> &str {
        self.next_hop_iface
            .as_deref()
            .unwrap_or(LOOPBACK_IFACE_NAME)
    }
}

fn canonicalize_prop(
    prop: &str,
    value: String,
    canonicalize: fn(&str) -> Result<String, NetstateError>,
) -> Result<String, NetstateError> {
    let new_value = canonicalize(&value)?;
    if new_value != value {
        log::warn!("Route {prop} {value} sanitized to {new_value}");
    }
    Ok(new_value)
}

// Equality, ordering and hashing all follow `sort_key()`, so that
// `sort_unstable()` and `dedup()` treat metric-only differences as the
// same route.
impl PartialEq for RouteEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for RouteEntry {}

impl Ord for RouteEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for RouteEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for RouteEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl std::fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let props: [(&str, Option<String>); 10] = [
            ("state", self.is_absent().then(|| "absent".to_string())),
            ("destination", self.destination.clone()),
            ("next-hop-interface", self.next_hop_iface.clone()),
            ("next-hop-address", self.next_hop_addr.clone()),
            ("source", self.source.clone()),
            ("metric", self.metric.map(|v| v.to_string())),
            ("table-id", self.table_id.map(|v| v.to_string())),
            ("weight", self.weight.map(|v| v.to_string())),
            ("route-type", self.route_type.map(|v| v.to_string())),
            ("cwnd", self.cwnd.map(|v| v.to_string())),
        ];
        let shown: Vec<String> = props
            .iter()
            .filter_map(|(key, value)| {
                value.as_ref().map(|value| format!("{key}: {value}"))
            })
            .collect();
        f.write_str(&shown.join(" "))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedRoutes {
    // When all routes next hop to a interface are all marked as absent,
    // the `MergedRoutes.merged` will not have entry for this interface, but
    // interface name is found in `MergedRoutes.route_changed_ifaces`.
    pub(crate) merged: HashMap<String, Vec<RouteEntry>>,
    pub(crate) route_changed_ifaces: Vec<String>,
    // Changed routes including those been marked as absent. Not including
    // desired route equal to current route.
    pub(crate) changed_routes: Vec<RouteEntry>,
    pub(crate) desired: Routes,
    pub(crate) current: Routes,
}

impl MergedRoutes {
    pub(crate) fn new(
        desired: Routes,
        current: Routes,
        merged_ifaces: &MergedInterfaces,
    ) -> Result<Self, NetstateError> {
        desired.validate()?;
        let mut desired_routes = Vec::new();
        for rt in desired.config.as_deref().unwrap_or_default() {
            let mut rt = rt.clone();
            rt.sanitize()?;
            desired_routes.push(rt);
        }

        let mut changed_ifaces: HashSet<String> = HashSet::new();
        let mut changed_routes: HashSet<RouteEntry> = HashSet::new();

        for rt in desired_routes.iter().filter(|rt| !rt.is_absent()) {
            if let Some(via) = rt.next_hop_iface.as_deref() {
                validate_next_hop_iface(rt, via, merged_ifaces)?;
            }
            changed_ifaces.insert(rt.iface_name().to_string());
        }

        let absent_routes: Vec<&RouteEntry> =
            desired_routes.iter().filter(|rt| rt.is_absent()).collect();

        let mut merged_routes: Vec<RouteEntry> = Vec::new();

        for rt in current.config.as_deref().unwrap_or_default() {
            let via = rt.iface_name();
            // Current route is dropped when its next hop interface is
            // marked as absent, lost the IP stack of that family or the
            // route matches a desired absent route.
            let iface_gone = via != LOOPBACK_IFACE_NAME
                && merged_ifaces
                    .kernel_ifaces
                    .get(via)
                    .map(|i| {
                        i.merged.is_absent()
                            || (rt.is_ipv6()
                                && !i.merged.base_iface().is_ipv6_enabled())
                            || (!rt.is_ipv6()
                                && !i.merged.base_iface().is_ipv4_enabled())
                    })
                    .unwrap_or_default();
            if iface_gone || absent_routes.iter().any(|a| a.is_match(rt)) {
                log::debug!("Removing route {rt}");
                let mut new_rt = rt.clone();
                new_rt.state = Some(RouteState::Absent);
                changed_routes.insert(new_rt);
                changed_ifaces.insert(via.to_string());
            } else {
                merged_routes.push(rt.clone());
            }
        }

        // Append desired routes
        for rt in desired_routes.iter().filter(|rt| !rt.is_absent()) {
            if !current
                .config
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|cur_rt| cur_rt.is_match(rt))
            {
                changed_routes.insert(rt.clone());
            }
            merged_routes.push(rt.clone());
        }

        merged_routes.sort_unstable();
        merged_routes.dedup();

        let mut merged: HashMap<String, Vec<RouteEntry>> = HashMap::new();

        for rt in merged_routes {
            match merged.entry(rt.iface_name().to_string()) {
                Entry::Occupied(o) => o.into_mut().push(rt),
                Entry::Vacant(v) => {
                    v.insert(vec![rt]);
                }
            };
        }

        let mut route_changed_ifaces: Vec<String> =
            changed_ifaces.into_iter().collect();
        route_changed_ifaces.sort_unstable();
        let mut changed_routes: Vec<RouteEntry> =
            changed_routes.into_iter().collect();
        changed_routes.sort_unstable();

        Ok(Self {
            merged,
            route_changed_ifaces,
            changed_routes,
            desired,
            current,
        })
    }

    pub(crate) fn remove_routes_to_ignored_ifaces(
        &mut self,
        ignored_ifaces: &[(String, InterfaceType)],
    ) {
        let ignored_ifaces: Vec<&str> = ignored_ifaces
            .iter()
            .filter(|(_, t)| !t.is_userspace())
            .map(|(n, _)| n.as_str())
            .collect();

        for iface in ignored_ifaces.as_slice() {
            self.merged.remove(*iface);
        }
        self.route_changed_ifaces
            .retain(|n| !ignored_ifaces.contains(&n.as_str()));
    }

    pub(crate) fn is_changed(&self) -> bool {
        !self.route_changed_ifaces.is_empty()
    }

    /// Name of the interface holding the default gateway of the specified
    /// family in the merged static routes.
    pub(crate) fn gateway_iface(&self, is_ipv6: bool) -> Option<&str> {
        let mut names: Vec<&str> = self
            .merged
            .iter()
            .filter(|(_, rts)| {
                rts.iter().any(|rt| rt.is_gateway() && rt.is_ipv6() == is_ipv6)
            })
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names.first().copied()
    }

    /// Names of the interfaces holding any route to the specified table in
    /// the specified family.
    pub(crate) fn ifaces_with_table(
        &self,
        table_id: u32,
        is_ipv6: bool,
    ) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .merged
            .iter()
            .filter(|(_, rts)| {
                rts.iter().any(|rt| {
                    rt.is_ipv6() == is_ipv6
                        && rt.table_id.unwrap_or(DEFAULT_TABLE_ID) == table_id
                })
            })
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl MergedInterfaces {
    // Copy the full route list of each route-changed interface into the
    // `routes` of its IP stack, so the provider sees per-interface intent.
    pub(crate) fn place_routes(
        &mut self,
        merged_routes: &MergedRoutes,
    ) -> Result<(), NetstateError> {
        for iface_name in merged_routes.route_changed_ifaces.iter() {
            let iface = match self.kernel_ifaces.get_mut(iface_name) {
                Some(i) => i,
                None => {
                    if iface_name != LOOPBACK_IFACE_NAME {
                        log::debug!(
                            "Skip placing routes on non-exist interface \
                            {iface_name}"
                        );
                    }
                    continue;
                }
            };
            if iface.merged.is_absent() || iface.merged.is_ignore() {
                continue;
            }
            let rts = merged_routes
                .merged
                .get(iface_name)
                .cloned()
                .unwrap_or_default();
            let (v6_rts, v4_rts): (Vec<RouteEntry>, Vec<RouteEntry>) =
                rts.into_iter().partition(|r| r.is_ipv6());
            log::debug!(
                "Placing {} IPv4 and {} IPv6 routes on interface {}",
                v4_rts.len(),
                v6_rts.len(),
                iface_name
            );
            iface.mark_as_changed();
            if let Some(apply_iface) = iface.for_apply.as_mut() {
                let base = apply_iface.base_iface_mut();
                if base.ipv4.is_none() {
                    base.ipv4 = iface.merged.base_iface().ipv4.clone();
                }
                if base.ipv6.is_none() {
                    base.ipv6 = iface.merged.base_iface().ipv6.clone();
                }
                if let Some(ipv4) = base.ipv4.as_mut() {
                    ipv4.routes = Some(v4_rts);
                }
                if let Some(ipv6) = base.ipv6.as_mut() {
                    ipv6.routes = Some(v6_rts);
                }
            }
        }
        Ok(())
    }
}

fn validate_next_hop_iface(
    rt: &RouteEntry,
    via: &str,
    merged_ifaces: &MergedInterfaces,
) -> Result<(), NetstateError> {
    let reason = match merged_ifaces.kernel_ifaces.get(via) {
        None => Some("does not exist"),
        Some(iface) if iface.merged.is_absent() => {
            Some("has been marked as absent")
        }
        Some(iface)
            if rt.is_ipv6() && !iface.merged.base_iface().is_ipv6_enabled() =>
        {
            Some("has been marked as IPv6 disabled")
        }
        Some(iface)
            if !rt.is_ipv6() && !iface.merged.base_iface().is_ipv4_enabled() =>
        {
            Some("has been marked as IPv4 disabled")
        }
        _ => None,
    };
    if let Some(reason) = reason {
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            format!("The next hop interface of desired route '{rt}' {reason}"),
        );
        log::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

// 0.0.0.0/8 and its subnet cannot be used as the route destination network
// for unicast route.
fn validate_route_dst(route: &RouteEntry) -> Result<(), NetstateError> {
    if let Some(dst) = route.destination.as_deref() {
        if dst.is_empty() || is_ipv6_addr(dst) || !route.is_unicast() {
            return Ok(());
        }
        let (ip, prefix) = parse_ip_net(dst)?;
        if let std::net::IpAddr::V4(ip) = ip {
            if ip.octets()[0] == 0 && prefix >= 8 {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    "0.0.0.0/8 and its subnet cannot be used as \
                    the route destination for unicast route, please use \
                    the default gateway 0.0.0.0/0 instead"
                        .to_string(),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
    }
    Ok(())
}
