// SPDX-License-Identifier: Apache-2.0

use crate::{
    memory::MemoryState, DnsState, Interface, NetworkState, RouteRules, Routes,
};

impl MemoryState {
    pub(crate) fn to_net_state(
        &self,
        include_status_data: bool,
    ) -> NetworkState {
        let mut net_state = NetworkState::new();
        net_state.prop_list = vec![
            "interfaces",
            "routes",
            "rules",
            "dns",
            "hostname",
            "ovsdb",
            "ovn",
        ];
        for iface in self.ifaces.to_vec() {
            let mut iface = iface.clone();
            if !include_status_data {
                hide_status_data(&mut iface);
            }
            log::debug!("Got interface {:?}", iface);
            net_state.interfaces.push(iface);
        }
        net_state.routes = Routes {
            running: Some(self.routes.clone()),
            config: Some(self.routes.clone()),
        };
        net_state.rules = RouteRules {
            config: Some(self.rules.clone()),
        };
        net_state.dns = DnsState {
            running: self.dns.clone(),
            config: self.dns.clone(),
        };
        net_state.hostname.clone_from(&self.hostname);
        net_state.ovsdb.clone_from(&self.ovsdb);
        net_state.ovn = self.ovn.clone();
        net_state
    }

    pub(crate) fn vf_iface_name(
        &self,
        pf_name: &str,
        vf_id: u32,
    ) -> Option<String> {
        if let Some(Interface::Ethernet(pf_iface)) =
            self.ifaces.kernel_ifaces.get(pf_name)
        {
            pf_iface
                .ethernet
                .as_ref()
                .and_then(|e| e.sr_iov.as_ref())
                .and_then(|s| s.get_vf_iface_name(vf_id))
                .map(|n| n.to_string())
        } else {
            None
        }
    }
}

// Kernel reported limits are only shown on request.
fn hide_status_data(iface: &mut Interface) {
    let base_iface = iface.base_iface_mut();
    base_iface.min_mtu = None;
    base_iface.max_mtu = None;
    base_iface.permanent_mac_address = None;
}
