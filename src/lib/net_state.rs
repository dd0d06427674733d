// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    ovn::MergedOvnConfiguration, schema::schema, DnsState, ErrorKind,
    HostNameState, Interfaces, MergedDnsState, MergedHostNameState,
    MergedInterfaces, MergedOvsDbGlobalConfig, MergedRouteRules, MergedRoutes,
    NetstateError, OvnConfiguration, OvsDbGlobalConfig, RouteRules, Routes,
};

pub(crate) const DEFAULT_ROLLBACK_TIMEOUT: u32 = 60;
pub(crate) const DEFAULT_VERIFY_RETRY_COUNT: u32 = 5;
pub(crate) const DEFAULT_VERIFY_RETRY_INTERVAL_MS: u64 = 1000;
pub(crate) const DEFAULT_PHASE_TIMEOUT: u32 = 20;

#[derive(Clone, Debug, Serialize, Default, PartialEq, Eq)]
#[non_exhaustive]
/// Full network state of a host: the desired document handed to
/// [NetworkState::apply()] or the observed one filled by
/// [NetworkState::retrieve()].
///
/// Sections missing from a desired document are left untouched on apply.
///
/// ```yaml
/// hostname:
///   config: edge01.example.org
/// dns-resolver:
///   config:
///     server:
///     - 192.0.2.53
/// routes:
///   config:
///   - destination: 0.0.0.0/0
///     next-hop-interface: eth0
///     next-hop-address: 192.0.2.1
/// interfaces:
/// - name: eth0
///   type: ethernet
///   state: up
///   ipv4:
///     enabled: true
///     address:
///     - ip: 192.0.2.10
///       prefix-length: 24
/// ```
pub struct NetworkState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<HostNameState>,
    #[serde(rename = "dns-resolver", default)]
    pub dns: DnsState,
    #[serde(rename = "route-rules", default)]
    pub rules: RouteRules,
    #[serde(default)]
    pub routes: Routes,
    #[serde(default)]
    pub interfaces: Interfaces,
    #[serde(rename = "ovs-db", skip_serializing_if = "Option::is_none")]
    /// An empty `ovs-db: {}` in desired state removes every global
    /// `external_ids` and `other_config` entry.
    pub ovsdb: Option<OvsDbGlobalConfig>,
    #[serde(default, skip_serializing_if = "OvnConfiguration::is_none")]
    pub ovn: OvnConfiguration,
    #[serde(skip)]
    // Sections present in the desired document.
    pub(crate) prop_list: Vec<&'static str>,
    #[serde(skip)]
    pub(crate) kernel_only: bool,
    #[serde(skip)]
    pub(crate) no_verify: bool,
    #[serde(skip)]
    pub(crate) no_commit: bool,
    #[serde(skip)]
    pub(crate) timeout: Option<u32>,
    #[serde(skip)]
    pub(crate) include_secrets: bool,
    #[serde(skip)]
    pub(crate) include_status_data: bool,
    #[serde(skip)]
    pub(crate) running_config_only: bool,
    #[serde(skip)]
    pub(crate) memory_only: bool,
    #[serde(skip)]
    pub(crate) verify_retry: Option<(u32, u64)>,
    #[serde(skip)]
    pub(crate) phase_timeout: Option<u32>,
}

impl<'de> Deserialize<'de> for NetworkState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut net_state = NetworkState::new();
        let mut v = serde_json::Value::deserialize(deserializer)?;
        if v.is_null() {
            return Ok(net_state);
        }
        let v = match v.as_object_mut() {
            Some(v) => v,
            None => {
                return Err(serde::de::Error::custom(format!(
                    "Expecting a HashMap/Object/Dictionary, but got {v}"
                )));
            }
        };
        schema()
            .and_then(|s| s.validate_top_level(v))
            .map_err(serde::de::Error::custom)?;

        if let Some(ifaces) = take_section::<_, D::Error>(v, "interfaces")? {
            net_state.prop_list.push("interfaces");
            net_state.interfaces = ifaces;
        }
        if let Some(dns) = take_section::<_, D::Error>(v, "dns-resolver")? {
            net_state.prop_list.push("dns");
            net_state.dns = dns;
        }
        if let Some(routes) = take_section::<_, D::Error>(v, "routes")? {
            net_state.prop_list.push("routes");
            net_state.routes = routes;
        }
        if let Some(rules) = take_section::<_, D::Error>(v, "route-rules")? {
            net_state.prop_list.push("rules");
            net_state.rules = rules;
        }
        if let Some(ovsdb) = take_section::<_, D::Error>(v, "ovs-db")? {
            net_state.prop_list.push("ovsdb");
            net_state.ovsdb = Some(ovsdb);
        }
        if let Some(ovn) = take_section::<_, D::Error>(v, "ovn")? {
            net_state.prop_list.push("ovn");
            net_state.ovn = ovn;
        }
        if let Some(hostname) = take_section::<_, D::Error>(v, "hostname")? {
            net_state.prop_list.push("hostname");
            net_state.hostname = Some(hostname);
        }
        Ok(net_state)
    }
}

fn take_section<T, E>(
    doc: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<Option<T>, E>
where
    T: serde::de::DeserializeOwned,
    E: serde::de::Error,
{
    doc.remove(key)
        .map(|value| {
            T::deserialize(value)
                .map_err(|e| E::custom(format!("Invalid {key} section: {e}")))
        })
        .transpose()
}

impl NetworkState {
    pub fn is_empty(&self) -> bool {
        self.hostname.is_none()
            && self.dns.is_empty()
            && self.rules.is_empty()
            && self.routes.is_empty()
            && self.interfaces.is_empty()
            && self.ovsdb.is_none()
            && self.ovn.is_none()
    }

    /// Talk to the kernel only: no checkpoint is opened, user space
    /// interfaces are ignored and the DHCP capability of the provider is
    /// not required. Off by default.
    pub fn set_kernel_only(&mut self, value: bool) -> &mut Self {
        self.kernel_only = value;
        self
    }

    /// Compare the observed state with the merged one after apply and roll
    /// back on mismatch. On by default.
    pub fn set_verify_change(&mut self, value: bool) -> &mut Self {
        self.no_verify = !value;
        self
    }

    /// Turning this off keeps the checkpoint open after a successful apply.
    /// [NetworkState::apply()] then returns the checkpoint handle for
    /// [NetworkState::checkpoint_commit()] or
    /// [NetworkState::checkpoint_rollback()]. Unclosed checkpoints roll back
    /// by themselves once [NetworkState::set_timeout()] seconds pass.
    pub fn set_commit(&mut self, value: bool) -> &mut Self {
        self.no_commit = !value;
        self
    }

    /// Checkpoint lifetime in seconds, 60 when unset.
    pub fn set_timeout(&mut self, value: u32) -> &mut Self {
        self.timeout = Some(value);
        self
    }

    pub fn set_include_secrets(&mut self, value: bool) -> &mut Self {
        self.include_secrets = value;
        self
    }

    /// Keep `running` sub-trees and address lifetimes in
    /// [NetworkState::retrieve()] output.
    pub fn set_include_status_data(&mut self, value: bool) -> &mut Self {
        self.include_status_data = value;
        self
    }

    /// Drop dynamic data (DHCP or autoconf addresses, routes and DNS) from
    /// [NetworkState::retrieve()] output.
    pub fn set_running_config_only(&mut self, value: bool) -> &mut Self {
        self.running_config_only = value;
        self
    }

    /// Ask the provider not to persist anything, the change is gone after
    /// reboot.
    pub fn set_memory_only(&mut self, value: bool) -> &mut Self {
        self.memory_only = value;
        self
    }

    /// Verification attempts and the pause between them. A count of 0 is
    /// treated as a single attempt. Default: 5 attempts, 1000 ms apart.
    pub fn set_verify_retry(
        &mut self,
        count: u32,
        interval_ms: u64,
    ) -> &mut Self {
        self.verify_retry = Some((count, interval_ms));
        self
    }

    /// Upper bound in seconds for each of the add and edit phases, 20 when
    /// unset. An overrun fails the apply with [crate::ErrorKind::Timeout]
    /// and rolls back.
    pub fn set_phase_timeout(&mut self, value: u32) -> &mut Self {
        self.phase_timeout = Some(value);
        self
    }

    /// Create empty [NetworkState]
    pub fn new() -> Self {
        Default::default()
    }

    /// Parse a JSON document, errors are reported as
    /// [crate::ErrorKind::InvalidArgument].
    pub fn new_from_json(net_state_json: &str) -> Result<Self, NetstateError> {
        match serde_json::from_str(net_state_json) {
            Ok(s) => Ok(s),
            Err(e) => {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!("Invalid JSON string: {e}"),
                );
                log::error!("{}", e);
                Err(e)
            }
        }
    }

    /// YAML counterpart of [NetworkState::new_from_json()]. JSON is valid
    /// YAML, so both formats are accepted.
    pub fn new_from_yaml(net_state_yaml: &str) -> Result<Self, NetstateError> {
        match serde_yaml::from_str(net_state_yaml) {
            Ok(s) => Ok(s),
            Err(e) => {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!("Invalid YAML string: {e}"),
                );
                log::error!("{}", e);
                Err(e)
            }
        }
    }

    /// Mask passwords and keys.
    pub fn hide_secrets(&mut self) {
        self.interfaces.hide_secrets();
    }

    pub(crate) fn verify_retry(&self) -> (u32, u64) {
        self.verify_retry.unwrap_or((
            DEFAULT_VERIFY_RETRY_COUNT,
            DEFAULT_VERIFY_RETRY_INTERVAL_MS,
        ))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedNetworkState {
    pub(crate) hostname: MergedHostNameState,
    pub(crate) dns: MergedDnsState,
    pub(crate) interfaces: MergedInterfaces,
    pub(crate) ovsdb: MergedOvsDbGlobalConfig,
    pub(crate) ovn: MergedOvnConfiguration,
    pub(crate) routes: MergedRoutes,
    pub(crate) rules: MergedRouteRules,
    pub(crate) memory_only: bool,
    pub(crate) prop_list: Vec<&'static str>,
}

impl MergedNetworkState {
    pub(crate) fn new(
        desired: NetworkState,
        current: NetworkState,
        memory_only: bool,
    ) -> Result<Self, NetstateError> {
        let mut interfaces = MergedInterfaces::new(
            desired.interfaces,
            current.interfaces,
            memory_only,
        )?;

        let mut routes =
            MergedRoutes::new(desired.routes, current.routes, &interfaces)?;
        routes.remove_routes_to_ignored_ifaces(
            interfaces.ignored_ifaces.as_slice(),
        );

        let rules = MergedRouteRules::new(desired.rules, current.rules)?;
        let dns = MergedDnsState::new(desired.dns, current.dns)?;

        interfaces.place_routes(&routes)?;
        interfaces.place_route_rules(&rules, &routes)?;
        interfaces.place_dns(&dns, &routes)?;

        let hostname =
            MergedHostNameState::new(desired.hostname, current.hostname)?;

        let ovn = MergedOvnConfiguration::new(desired.ovn, current.ovn)?;
        let ovsdb = MergedOvsDbGlobalConfig::new(
            desired.ovsdb,
            current.ovsdb.unwrap_or_default(),
            &ovn,
        )?;

        Ok(Self {
            interfaces,
            routes,
            rules,
            dns,
            ovsdb,
            ovn,
            hostname,
            memory_only,
            prop_list: desired.prop_list,
        })
    }

    pub(crate) fn is_global_changed(&self) -> bool {
        self.hostname.is_changed()
            || self.ovsdb.is_changed
            || self.dns.is_changed()
    }

    // Only the sections provider need to apply globally.
    pub(crate) fn gen_global_state(&self) -> NetworkState {
        let mut state = NetworkState::new();
        if self.hostname.is_changed() {
            state.hostname.clone_from(&self.hostname.desired);
        }
        if self.ovsdb.is_changed {
            state.ovsdb = Some(self.ovsdb.to_config());
            state.ovn = self.ovn.merged.clone();
        }
        // Per-interface placement is already attached to interfaces,
        // the merged config is for provider managing DNS globally.
        if self.dns.is_changed() {
            state.dns.config = Some(self.dns.to_config());
        }
        state
    }
}
