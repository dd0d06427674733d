// SPDX-License-Identifier: Apache-2.0

use netstate::{
    DnsState, HostNameState, NetworkState, OvnConfiguration, OvsDbGlobalConfig,
    RouteRules, Routes,
};
use serde::Serialize;
use serde_yaml::Value;

use crate::{config::Config, error::CliError, store::ProviderStore};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct SortedNetworkState {
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<HostNameState>,
    #[serde(rename = "dns-resolver", default)]
    dns: DnsState,
    #[serde(rename = "route-rules", default)]
    rules: RouteRules,
    routes: Routes,
    interfaces: Vec<Value>,
    #[serde(rename = "ovs-db", skip_serializing_if = "Option::is_none")]
    ovsdb: Option<OvsDbGlobalConfig>,
    #[serde(skip_serializing_if = "OvnConfiguration::is_none")]
    ovn: OvnConfiguration,
}

const IFACE_TOP_PRIORTIES: [&str; 2] = ["name", "type"];

pub(crate) fn show(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let mut store = ProviderStore::new(&config.provider.state_file);
    let mut provider = store.load()?;

    let mut net_state = NetworkState::new();
    net_state
        .set_kernel_only(matches.is_present("KERNEL"))
        .set_include_secrets(matches.is_present("SHOW_SECRETS"))
        .set_include_status_data(matches.is_present("STATUS_DATA"));
    if matches.is_present("RUNNING_CONFIG_ONLY") {
        net_state.retrieve_running_config(&mut provider)?;
    } else {
        net_state.retrieve(&mut provider)?;
    }

    let net_state = match matches.value_of("IFNAME") {
        Some(patterns) => filter_net_state_with_iface(&net_state, patterns),
        None => net_state,
    };
    Ok(if matches.is_present("JSON") {
        serde_json::to_string_pretty(&sort_netstate(net_state)?)?
    } else {
        serde_yaml::to_string(&sort_netstate(net_state)?)?
    })
}

// Interfaces sorted by name with `name` and `type` placed first.
pub(crate) fn sort_netstate(
    net_state: NetworkState,
) -> Result<SortedNetworkState, CliError> {
    let mut ifaces = net_state.interfaces.to_vec();
    ifaces.sort_by(|a, b| a.name().cmp(b.name()));

    let mut new_ifaces = Vec::new();
    if let Value::Sequence(ifaces) = serde_yaml::to_value(&ifaces)? {
        for iface_v in ifaces {
            if let Value::Mapping(iface) = iface_v {
                let mut new_iface = serde_yaml::Mapping::new();
                for top_property in &IFACE_TOP_PRIORTIES {
                    if let Some(v) =
                        iface.get(&Value::String(top_property.to_string()))
                    {
                        new_iface.insert(
                            Value::String(top_property.to_string()),
                            v.clone(),
                        );
                    }
                }
                for (k, v) in iface.iter() {
                    if let Value::String(ref name) = k {
                        if IFACE_TOP_PRIORTIES.contains(&name.as_str()) {
                            continue;
                        }
                    }
                    new_iface.insert(k.clone(), v.clone());
                }

                new_ifaces.push(Value::Mapping(new_iface));
            }
        }
    }
    Ok(SortedNetworkState {
        hostname: net_state.hostname,
        interfaces: new_ifaces,
        routes: net_state.routes,
        rules: net_state.rules,
        dns: net_state.dns,
        ovsdb: net_state.ovsdb,
        ovn: net_state.ovn,
    })
}

/// Keep interfaces whose name matches any of the comma separated glob
/// `patterns`, along with the routes using them and the route rules
/// pointing to those routes' tables.
pub(crate) fn filter_net_state_with_iface(
    net_state: &NetworkState,
    patterns: &str,
) -> NetworkState {
    let patterns: Vec<&str> = patterns.split(',').map(|p| p.trim()).collect();
    let matches_any =
        |name: &str| patterns.iter().any(|p| glob_match(p, name));

    let mut ret = NetworkState::new();
    for iface in net_state.interfaces.to_vec() {
        if matches_any(iface.name()) {
            ret.interfaces.push(iface.clone())
        }
    }
    if let Some(running_rts) = net_state.routes.running.as_ref() {
        ret.routes.running = Some(
            running_rts
                .iter()
                .filter(|rt| {
                    rt.next_hop_iface
                        .as_deref()
                        .map(matches_any)
                        .unwrap_or_default()
                })
                .cloned()
                .collect(),
        );
    }
    let mut route_table_ids = Vec::new();

    if let Some(config_rts) = net_state.routes.config.as_ref() {
        let mut rts = Vec::new();
        for rt in config_rts {
            if rt
                .next_hop_iface
                .as_deref()
                .map(matches_any)
                .unwrap_or_default()
            {
                if let Some(table_id) = rt.table_id {
                    route_table_ids.push(table_id);
                }
                rts.push(rt.clone());
            }
        }
        ret.routes.config = Some(rts);
    }

    if let Some(config_rules) = net_state.rules.config.as_ref() {
        ret.rules.config = Some(
            config_rules
                .iter()
                .filter(|r| {
                    r.table_id
                        .map(|t| route_table_ids.contains(&t))
                        .unwrap_or_default()
                })
                .cloned()
                .collect(),
        );
    }

    ret
}

// Shell style wildcard: `*` for any sequence and `?` for any single char.
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}
