// SPDX-License-Identifier: Apache-2.0

use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::{
    iplib::{is_ipv6_addr, sanitize_ip_network},
    route::LOOPBACK_IFACE_NAME,
    AddressFamily, ErrorKind, InterfaceIpAddr, MergedInterfaces,
    MergedRoutes, NetstateError,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
/// Routing rules
pub struct RouteRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// When applying, `None` means preserve existing route rules.
    /// Desired route rules only append to existing instead of overriding.
    /// To delete any route rule, please set [crate::RouteRuleEntry.state] to
    /// [RouteRuleState::Absent]. Any property set to None in absent route rule
    /// means wildcard. For example, this [crate::NetworkState] will delete all
    /// route rule looking up route table 500:
    /// ```yml
    /// ---
    /// route-rules:
    ///   config:
    ///     - state: absent
    ///       route-table: 500
    /// ```
    pub config: Option<Vec<RouteRuleEntry>>,
}

impl RouteRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_none()
    }

    pub(crate) fn validate(&self) -> Result<(), NetstateError> {
        for rule in self
            .config
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|r| !r.is_absent())
        {
            rule.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum RouteRuleState {
    #[default]
    Present,
    /// Used for delete route rule
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
/// Action taken when rule matches instead of table lookup.
pub enum RouteRuleAction {
    Blackhole,
    Unreachable,
    Prohibit,
}

impl std::fmt::Display for RouteRuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Blackhole => "blackhole",
                Self::Unreachable => "unreachable",
                Self::Prohibit => "prohibit",
            }
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
#[serde(deny_unknown_fields)]
pub struct RouteRuleEntry {
    /// Indicate the address family of the route rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<AddressFamily>,
    /// Indicate this is normal route rule or absent route rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RouteRuleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Source prefix to match.
    /// Serialize and deserialize to/from `ip-from`.
    pub ip_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Destination prefix to match.
    /// Serialize and deserialize to/from `ip-to`.
    pub ip_to: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_i64_or_string"
    )]
    /// Priority of this route rule.
    /// Bigger number means lower priority.
    pub priority: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "route-table",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    /// The routing table ID to lookup if the rule selector matches.
    /// Serialize and deserialize to/from `route-table`.
    pub table_id: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string",
        serialize_with = "crate::serializer::option_u32_as_hex"
    )]
    /// Select the fwmark value to match
    pub fwmark: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string",
        serialize_with = "crate::serializer::option_u32_as_hex"
    )]
    /// Select the fwmask value to match
    pub fwmask: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Incoming interface to match.
    pub iif: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RouteRuleAction>,
}

impl RouteRuleEntry {
    /// Let network backend choose the default priority.
    pub const USE_DEFAULT_PRIORITY: i64 = -1;
    /// Use main route table 254.
    pub const USE_DEFAULT_ROUTE_TABLE: u32 = 0;
    /// Default route table main(254).
    pub const DEFAULT_ROUTE_TABLE_ID: u32 = 254;

    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate(&self) -> Result<(), NetstateError> {
        if self.ip_from.is_none()
            && self.ip_to.is_none()
            && self.family.is_none()
        {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Neither ip-from, ip-to nor family is defined {self}"
                ),
            );
            log::error!("{}", e);
            return Err(e);
        } else if let Some(family) = self.family {
            let ips = [("ip-from", &self.ip_from), ("ip-to", &self.ip_to)];
            for (prop, ip) in ips {
                if let Some(ip) = ip.as_deref() {
                    if is_ipv6_addr(ip) != (family == AddressFamily::IPv6) {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "The {prop} format mismatches with the \
                                family set {self}"
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                }
            }
        }
        if self.fwmark.is_none() && self.fwmask.is_some() {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "fwmask is present but fwmark is not defined or is \
                    zero {self}"
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        if self.action.is_some() && self.table_id.is_some() {
            let e = NetstateError::new(
                ErrorKind::InvalidArgument,
                format!(
                    "Route rule with action cannot have route-table \
                    defined: {self}"
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn is_absent(&self) -> bool {
        matches!(self.state, Some(RouteRuleState::Absent))
    }

    pub(crate) fn is_ipv6(&self) -> bool {
        self.family == Some(AddressFamily::IPv6)
            || self.ip_from.as_deref().map(is_ipv6_addr) == Some(true)
            || self.ip_to.as_deref().map(is_ipv6_addr) == Some(true)
    }

    pub(crate) fn table_id_or_default(&self) -> u32 {
        match self.table_id {
            Some(RouteRuleEntry::USE_DEFAULT_ROUTE_TABLE) | None => {
                RouteRuleEntry::DEFAULT_ROUTE_TABLE_ID
            }
            Some(i) => i,
        }
    }

    pub(crate) fn is_match(&self, other: &Self) -> bool {
        for (des, cur) in
            [(&self.ip_from, &other.ip_from), (&self.ip_to, &other.ip_to)]
        {
            if let Some(ip) = des.as_deref() {
                let ip = if !ip.contains('/') {
                    match InterfaceIpAddr::try_from(ip) {
                        Ok(ref i) => i.into(),
                        Err(e) => {
                            log::error!("{}", e);
                            return false;
                        }
                    }
                } else {
                    ip.to_string()
                };
                if cur.as_ref() != Some(&ip) {
                    return false;
                }
            }
        }
        if self.family.is_some()
            && other.family.is_some()
            && self.family != other.family
        {
            return false;
        }
        if self.priority.is_some()
            && self.priority != Some(RouteRuleEntry::USE_DEFAULT_PRIORITY)
            && self.priority != other.priority
        {
            return false;
        }
        if self.table_id.is_some()
            && self.table_id != Some(RouteRuleEntry::USE_DEFAULT_ROUTE_TABLE)
            && self.table_id_or_default() != other.table_id_or_default()
        {
            return false;
        }
        if self.fwmark.is_some() && self.fwmark != other.fwmark {
            return false;
        }
        if self.fwmask.is_some() && self.fwmask != other.fwmask {
            return false;
        }
        if self.iif.is_some() && self.iif != other.iif {
            return false;
        }
        if self.action.is_some() && self.action != other.action {
            return false;
        }
        true
    }

    // Return tuple of (no_absent, is_ipv4, table_id, ip_from,
    // ip_to, priority, fwmark, fwmask, iif)
    #[allow(clippy::type_complexity)]
    fn sort_key(&self) -> (bool, bool, u32, &str, &str, i64, u32, u32, &str) {
        (
            !self.is_absent(),
            !self.is_ipv6(),
            self.table_id_or_default(),
            self.ip_from.as_deref().unwrap_or(""),
            self.ip_to.as_deref().unwrap_or(""),
            self.priority
                .unwrap_or(RouteRuleEntry::USE_DEFAULT_PRIORITY),
            self.fwmark.unwrap_or(0),
            self.fwmask.unwrap_or(0),
            self.iif.as_deref().unwrap_or(""),
        )
    }

    pub(crate) fn sanitize(&mut self) -> Result<(), NetstateError> {
        if self.state == Some(RouteRuleState::Present) {
            self.state = None;
        }
        if let Some(ip) = self.ip_from.as_ref() {
            let new_ip = sanitize_ip_network(ip)?;
            if self.family.is_none() {
                self.family = Some(if is_ipv6_addr(new_ip.as_str()) {
                    AddressFamily::IPv6
                } else {
                    AddressFamily::IPv4
                });
            }
            if ip != &new_ip {
                log::warn!("Route rule ip-from {} sanitized to {}", ip, new_ip);
                self.ip_from = Some(new_ip);
            }
        }
        if let Some(ip) = self.ip_to.as_ref() {
            let new_ip = sanitize_ip_network(ip)?;
            if self.family.is_none() {
                self.family = Some(if is_ipv6_addr(new_ip.as_str()) {
                    AddressFamily::IPv6
                } else {
                    AddressFamily::IPv4
                });
            }
            if ip != &new_ip {
                log::warn!("Route rule ip-to {} sanitized to {}", ip, new_ip);
                self.ip_to = Some(new_ip);
            }
        }
        Ok(())
    }
}

// For Vec::dedup()
impl PartialEq for RouteRuleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

// For Vec::sort_unstable()
impl Ord for RouteRuleEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl Eq for RouteRuleEntry {}

impl PartialOrd for RouteRuleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for RouteRuleEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl std::fmt::Display for RouteRuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut props = Vec::new();
        if self.is_absent() {
            props.push("state: absent".to_string());
        }
        if let Some(v) = self.family.as_ref() {
            props.push(format!("family: {v}"));
        }
        if let Some(v) = self.ip_from.as_ref() {
            props.push(format!("ip-from: {v}"));
        }
        if let Some(v) = self.ip_to.as_ref() {
            props.push(format!("ip-to: {v}"));
        }
        if let Some(v) = self.priority.as_ref() {
            props.push(format!("priority: {v}"));
        }
        if let Some(v) = self.table_id.as_ref() {
            props.push(format!("route-table: {v}"));
        }
        if let Some(v) = self.fwmark.as_ref() {
            props.push(format!("fwmark: {v:#x}"));
        }
        if let Some(v) = self.fwmask.as_ref() {
            props.push(format!("fwmask: {v:#x}"));
        }
        if let Some(v) = self.iif.as_ref() {
            props.push(format!("iif: {v}"));
        }
        if let Some(v) = self.action.as_ref() {
            props.push(format!("action: {v}"));
        }
        write!(f, "{}", props.join(" "))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedRouteRules {
    pub(crate) desired: RouteRules,
    pub(crate) current: RouteRules,
    // Sanitized desired rules, absent ones included.
    pub(crate) for_verify: Vec<RouteRuleEntry>,
    // Full rule list of every changed route table after absent rules
    // removed and desired rules appended.
    pub(crate) for_apply: Vec<RouteRuleEntry>,
}

impl MergedRouteRules {
    // Rules for a route table touched by desired state are all carried,
    // including the current ones, so provider can replace them as a whole.
    //  1. Find out all table id with desired add rules.
    //  2. Find out all table id impacted by desired absent rules.
    //  3. Copy all rules from current which are to changed table id.
    //  4. Remove rules base on absent.
    //  5. Add rules in desire.
    //  6. Sort and remove duplicate rule.
    pub(crate) fn new(
        desired: RouteRules,
        current: RouteRules,
    ) -> Result<Self, NetstateError> {
        desired.validate()?;
        let mut for_verify: Vec<RouteRuleEntry> =
            desired.config.as_ref().cloned().unwrap_or_default();
        for rule in for_verify.iter_mut() {
            rule.sanitize()?;
        }
        let cur_rules = current.config.as_deref().unwrap_or_default();

        let des_rules_index = create_rule_index_by_table_id(&for_verify);
        let cur_rules_index = create_rule_index_by_table_id(cur_rules);

        let mut table_ids: HashSet<u32> =
            des_rules_index.keys().copied().collect();

        let absent_rules = flat_absent_rule(&for_verify, cur_rules);
        for absent_rule in &absent_rules {
            log::debug!("Route table impacted by absent rule {absent_rule}");
            table_ids.insert(absent_rule.table_id_or_default());
        }

        let mut changed: HashMap<u32, Vec<RouteRuleEntry>> = HashMap::new();
        for table_id in &table_ids {
            if let Some(rules) = cur_rules_index.get(table_id) {
                changed.insert(
                    *table_id,
                    rules.iter().map(|r| (*r).clone()).collect(),
                );
            }
        }

        for absent_rule in &absent_rules {
            if let Some(rules) =
                changed.get_mut(&absent_rule.table_id_or_default())
            {
                rules.retain(|r| !absent_rule.is_match(r));
            }
        }

        for (table_id, rules) in des_rules_index.iter() {
            let new_rules: Vec<RouteRuleEntry> =
                rules.iter().map(|r| (*r).clone()).collect();
            match changed.entry(*table_id) {
                Entry::Occupied(o) => o.into_mut().extend(new_rules),
                Entry::Vacant(v) => {
                    v.insert(new_rules);
                }
            };
        }

        // Absent rules are kept for provider to purge matching ones.
        let mut for_apply: Vec<RouteRuleEntry> = absent_rules;
        for rules in changed.into_values() {
            for_apply.extend(rules);
        }
        for_apply.sort_unstable();
        for_apply.dedup();

        Ok(Self {
            desired,
            current,
            for_verify,
            for_apply,
        })
    }
}

impl MergedInterfaces {
    // Each rule is stored on the interface holding a route to the rule's
    // route table. Falls back to first interface with static IP of the same
    // family. Absent rules could also fall back to loopback.
    pub(crate) fn place_route_rules(
        &mut self,
        merged_rules: &MergedRouteRules,
        merged_routes: &MergedRoutes,
    ) -> Result<(), NetstateError> {
        let mut rules_by_iface: HashMap<String, (Vec<_>, Vec<_>)> =
            HashMap::new();
        for rule in merged_rules.for_apply.iter() {
            let is_ipv6 = rule.is_ipv6();
            let iface_name = match merged_routes
                .ifaces_with_table(rule.table_id_or_default(), is_ipv6)
                .first()
            {
                Some(n) => n.to_string(),
                None => match self.first_static_iface(is_ipv6) {
                    Some(n) => n.to_string(),
                    None if rule.is_absent()
                        && self
                            .kernel_ifaces
                            .contains_key(LOOPBACK_IFACE_NAME) =>
                    {
                        LOOPBACK_IFACE_NAME.to_string()
                    }
                    None => {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "Failed to find suitable interface for \
                                saving route rule: {rule}"
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                },
            };
            let entry = rules_by_iface.entry(iface_name).or_default();
            if is_ipv6 {
                entry.1.push(rule.clone());
            } else {
                entry.0.push(rule.clone());
            }
        }

        for (iface_name, (v4_rules, v6_rules)) in rules_by_iface {
            if let Some(iface) = self.kernel_ifaces.get_mut(&iface_name) {
                log::debug!(
                    "Placing route rules {:?} {:?} on interface {}",
                    v4_rules,
                    v6_rules,
                    iface_name
                );
                iface.mark_as_changed();
                if let Some(apply_iface) = iface.for_apply.as_mut() {
                    let base = apply_iface.base_iface_mut();
                    if !v4_rules.is_empty() {
                        if base.ipv4.is_none() {
                            base.ipv4 = iface.merged.base_iface().ipv4.clone();
                        }
                        if let Some(ipv4) = base.ipv4.as_mut() {
                            ipv4.rules = Some(v4_rules);
                        }
                    }
                    if !v6_rules.is_empty() {
                        if base.ipv6.is_none() {
                            base.ipv6 = iface.merged.base_iface().ipv6.clone();
                        }
                        if let Some(ipv6) = base.ipv6.as_mut() {
                            ipv6.rules = Some(v6_rules);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// Absent rule will be ignored
fn create_rule_index_by_table_id(
    rules: &[RouteRuleEntry],
) -> HashMap<u32, Vec<&RouteRuleEntry>> {
    let mut ret: HashMap<u32, Vec<&RouteRuleEntry>> = HashMap::new();
    for rule in rules.iter().filter(|r| !r.is_absent()) {
        ret.entry(rule.table_id_or_default()).or_default().push(rule);
    }
    ret
}

// Absent rule without table id is expanded to one absent rule per matching
// current rule table.
fn flat_absent_rule(
    desire_rules: &[RouteRuleEntry],
    cur_rules: &[RouteRuleEntry],
) -> Vec<RouteRuleEntry> {
    let mut ret: Vec<RouteRuleEntry> = Vec::new();
    for absent_rule in desire_rules.iter().filter(|r| r.is_absent()) {
        if absent_rule.table_id.is_none() {
            for cur_rule in cur_rules {
                if absent_rule.is_match(cur_rule) {
                    let mut new_absent_rule = absent_rule.clone();
                    new_absent_rule.table_id = cur_rule.table_id;
                    ret.push(new_absent_rule);
                }
            }
        } else {
            ret.push(absent_rule.clone());
        }
    }
    ret
}
