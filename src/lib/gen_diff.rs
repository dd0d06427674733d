// SPDX-License-Identifier: Apache-2.0

use serde_json::{Map, Value};

use crate::{
    state::get_json_value_difference, Interface, MergedInterface,
    MergedNetworkState, NetstateError, NetworkState,
};

// Properties kept in difference even unchanged.
const IFACE_IDENTITY_KEYS: [&str; 3] = ["name", "type", "state"];

impl NetworkState {
    /// Generate a new [NetworkState] containing only the properties of
    /// `self` which differ from `current`.
    /// Interfaces are compared per top level property while keeping
    /// `name`, `type` and `state`, unchanged interfaces are omitted.
    pub fn gen_diff(&self, current: &Self) -> Result<Self, NetstateError> {
        let mut ret = Self::new();
        let merged_state = MergedNetworkState::new(
            self.clone(),
            current.clone(),
            self.memory_only,
        )?;

        for merged_iface in merged_state
            .interfaces
            .iter()
            .filter(|i| i.is_desired() && i.is_changed())
        {
            if let Some(iface) = gen_iface_diff(merged_iface)? {
                ret.interfaces.push(iface);
            }
        }
        if !ret.interfaces.is_empty() {
            ret.prop_list.push("interfaces");
        }

        let routes = merged_state.routes.gen_diff();
        if !routes.is_empty() {
            ret.routes = routes;
            ret.prop_list.push("routes");
        }
        let rules = merged_state.rules.gen_diff();
        if !rules.is_empty() {
            ret.rules = rules;
            ret.prop_list.push("rules");
        }
        let dns = merged_state.dns.gen_diff();
        if !dns.is_empty() {
            ret.dns = dns;
            ret.prop_list.push("dns");
        }
        if let Some(hostname) = merged_state.hostname.gen_diff() {
            ret.hostname = Some(hostname);
            ret.prop_list.push("hostname");
        }
        if let Some(ovsdb) = merged_state.ovsdb.gen_diff() {
            ret.ovsdb = Some(ovsdb);
            ret.prop_list.push("ovsdb");
        }
        let ovn = merged_state.ovn.gen_diff();
        if !ovn.is_none() {
            ret.ovn = ovn;
            ret.prop_list.push("ovn");
        }
        Ok(ret)
    }
}

fn gen_iface_diff(
    merged_iface: &MergedInterface,
) -> Result<Option<Interface>, NetstateError> {
    let (desired, current) =
        match (merged_iface.desired.as_ref(), merged_iface.current.as_ref()) {
            (Some(d), Some(c)) => (d, c),
            (Some(d), None) => return Ok(Some(d.clone())),
            (None, _) => return Ok(None),
        };
    if desired.is_absent() || desired.is_ignore() {
        return Ok(Some(desired.clone()));
    }
    let (des_canonical, cur_canonical) = desired.canonicalize_pair(current);
    let des_value = serde_json::to_value(&des_canonical)?;
    let cur_value = serde_json::to_value(&cur_canonical)?;
    let org_value = serde_json::to_value(desired)?;

    let (des_obj, cur_obj, org_obj) = match (
        des_value.as_object(),
        cur_value.as_object(),
        org_value.as_object(),
    ) {
        (Some(d), Some(c), Some(o)) => (d, c, o),
        _ => return Ok(Some(desired.clone())),
    };

    let mut diff_obj = Map::new();
    let mut has_diff = desired.base_iface().state != current.base_iface().state;
    for (key, org_prop) in org_obj.iter() {
        if IFACE_IDENTITY_KEYS.contains(&key.as_str()) {
            diff_obj.insert(key.to_string(), org_prop.clone());
            continue;
        }
        let des_prop = des_obj.get(key).unwrap_or(org_prop);
        let cur_prop = cur_obj.get(key).unwrap_or(&Value::Null);
        if get_json_value_difference(key.to_string(), des_prop, cur_prop)
            .is_some()
        {
            log::debug!(
                "Interface {} property {} changed from {} to {}",
                desired.name(),
                key,
                cur_prop,
                org_prop
            );
            diff_obj.insert(key.to_string(), org_prop.clone());
            has_diff = true;
        }
    }
    if has_diff {
        Ok(Some(serde_json::from_value(Value::Object(diff_obj))?))
    } else {
        Ok(None)
    }
}
