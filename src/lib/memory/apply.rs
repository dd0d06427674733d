// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv6Addr};

use crate::{
    memory::MemoryState, BaseInterface, DnsClientState, EthernetInterface,
    HostNameState, Interface, InterfaceIpAddr, InterfaceState, InterfaceType,
    NetstateError, NetworkState, RouteEntry, RouteRuleEntry, SrIovVfConfig,
    VethConfig,
};

const IPV6_LINK_LOCAL_PREFIX_LEN: u8 = 64;

impl MemoryState {
    pub(crate) fn store_iface(
        &mut self,
        iface: &Interface,
    ) -> Result<(), NetstateError> {
        let mut iface = iface.clone();
        self.take_ip_metadata(&mut iface);

        let base_iface = iface.base_iface_mut();
        base_iface.port_options = None;
        if base_iface.controller.as_deref() == Some("") {
            base_iface.controller = None;
            base_iface.controller_type = None;
        }
        add_ipv6_link_local(base_iface);

        match &mut iface {
            Interface::OvsInterface(ovs_iface) if ovs_iface.is_patch() => {
                ovs_iface.base.mtu = None;
            }
            Interface::Ethernet(eth_iface) => {
                if let Some(peer) = eth_iface.veth_peer() {
                    let peer = peer.to_string();
                    self.create_veth_peer(&eth_iface.base.name, &peer);
                }
                self.sync_vfs(eth_iface);
            }
            _ => (),
        }
        log::info!(
            "Storing interface {} {}",
            iface.name(),
            iface.iface_type()
        );
        self.ifaces.push(iface);
        Ok(())
    }

    // Absent or down virtual interface is deleted, physical one is only
    // marked as down.
    pub(crate) fn deactivate_iface(&mut self, iface: &Interface) {
        let cur_iface =
            match self.ifaces.get_iface(iface.name(), iface.iface_type()) {
                Some(i) => i.clone(),
                None => {
                    log::debug!(
                        "Interface {} {} already removed",
                        iface.name(),
                        iface.iface_type()
                    );
                    return;
                }
            };
        if cur_iface.is_virtual() {
            log::info!(
                "Deleting interface {} {}",
                cur_iface.name(),
                cur_iface.iface_type()
            );
            self.remove_iface(&cur_iface);
            if let Interface::Ethernet(eth_iface) = &cur_iface {
                if let Some(peer) = eth_iface.veth_peer() {
                    if let Some(peer_iface) = self
                        .ifaces
                        .get_iface(peer, InterfaceType::Unknown)
                        .cloned()
                    {
                        self.remove_iface(&peer_iface);
                    }
                }
            }
        } else if let Some(stored) =
            self.ifaces.get_iface_mut(iface.name(), iface.iface_type())
        {
            log::info!(
                "Deactivating interface {} {}",
                iface.name(),
                iface.iface_type()
            );
            let base_iface = stored.base_iface_mut();
            base_iface.state = InterfaceState::Down;
            base_iface.controller = None;
            base_iface.controller_type = None;
            // Kernel flushes routes of link down interface
            self.routes
                .retain(|r| r.next_hop_iface.as_deref() != Some(iface.name()));
        }
    }

    fn remove_iface(&mut self, iface: &Interface) {
        self.ifaces.remove_iface(iface.name(), iface.iface_type());
        self.routes
            .retain(|r| r.next_hop_iface.as_deref() != Some(iface.name()));
        for port in self.ifaces.iter_mut() {
            let base_iface = port.base_iface_mut();
            if base_iface.controller.as_deref() == Some(iface.name()) {
                base_iface.controller = None;
                base_iface.controller_type = None;
            }
        }
    }

    pub(crate) fn apply_global(
        &mut self,
        state: &NetworkState,
        memory_only: bool,
    ) {
        if let Some(hostname) = state.hostname.as_ref() {
            let cur = self.hostname.get_or_insert_with(HostNameState::new);
            // Empty string means no change
            let running = hostname.running.as_ref().filter(|h| !h.is_empty());
            if let Some(config) =
                hostname.config.as_ref().filter(|h| !h.is_empty())
            {
                // Persistent host name is picked up by the running system
                // unless a transient one is requested explicitly.
                if running.is_none() {
                    cur.running = Some(config.to_string());
                }
                if !memory_only {
                    cur.config = Some(config.to_string());
                }
            }
            if let Some(running) = running {
                cur.running = Some(running.to_string());
            }
        }
        if state.dns.config.is_some() {
            self.rebuild_dns();
        }
        if let Some(ovsdb) = state.ovsdb.as_ref() {
            self.ovsdb = Some(ovsdb.clone());
            self.ovn = state.ovn.clone();
        }
    }

    // Routes, route rules and DNS placed on IP stacks are moved to global
    // stores.
    fn take_ip_metadata(&mut self, iface: &mut Interface) {
        let iface_name = iface.name().to_string();
        let base_iface = iface.base_iface_mut();
        let mut dns_confs: Vec<DnsClientState> = Vec::new();
        if let Some(ipv4) = base_iface.ipv4.as_mut() {
            if let Some(rts) = ipv4.routes.take() {
                self.replace_routes(&iface_name, false, rts);
            }
            if let Some(rules) = ipv4.rules.take() {
                self.update_rules(rules);
            }
            if let Some(dns) = ipv4.dns.take() {
                dns_confs.push(dns);
            }
        }
        if let Some(ipv6) = base_iface.ipv6.as_mut() {
            if let Some(rts) = ipv6.routes.take() {
                self.replace_routes(&iface_name, true, rts);
            }
            if let Some(rules) = ipv6.rules.take() {
                self.update_rules(rules);
            }
            if let Some(dns) = ipv6.dns.take() {
                dns_confs.push(dns);
            }
        }
        self.pending_dns.extend(dns_confs);
    }

    fn replace_routes(
        &mut self,
        iface_name: &str,
        is_ipv6: bool,
        routes: Vec<RouteEntry>,
    ) {
        self.routes.retain(|r| {
            r.next_hop_iface.as_deref() != Some(iface_name)
                || r.is_ipv6() != is_ipv6
        });
        self.routes
            .extend(routes.into_iter().filter(|r| !r.is_absent()));
        self.routes.sort_unstable();
        self.routes.dedup();
    }

    fn update_rules(&mut self, rules: Vec<RouteRuleEntry>) {
        for rule in rules {
            if rule.is_absent() {
                self.rules.retain(|r| !rule.is_match(r));
            } else if !self.rules.contains(&rule) {
                self.rules.push(rule);
            }
        }
        self.rules.sort_unstable();
    }

    // Name servers are ordered by the priority of their bearers, search
    // and options are taken from the first bearer holding them.
    fn rebuild_dns(&mut self) {
        let mut placements = std::mem::take(&mut self.pending_dns);
        placements.retain(|p| p.priority().is_some());
        placements.sort_by_key(|p| p.priority());
        let mut conf = DnsClientState {
            server: Some(Vec::new()),
            search: Some(Vec::new()),
            options: Some(Vec::new()),
            priority: None,
        };
        for placement in placements {
            if let (Some(srvs), Some(new_srvs)) =
                (conf.server.as_mut(), placement.server.as_ref())
            {
                srvs.extend_from_slice(new_srvs);
            }
            if conf.search.as_deref().unwrap_or_default().is_empty() {
                conf.search.clone_from(&placement.search);
            }
            if conf.options.as_deref().unwrap_or_default().is_empty() {
                conf.options.clone_from(&placement.options);
            }
        }
        log::info!("DNS changed to {:?}", conf);
        self.dns = Some(conf);
    }

    fn create_veth_peer(&mut self, iface_name: &str, peer: &str) {
        if self.ifaces.get_iface(peer, InterfaceType::Unknown).is_some() {
            return;
        }
        let mut peer_iface = EthernetInterface::new();
        peer_iface.base.name = peer.to_string();
        peer_iface.base.iface_type = InterfaceType::Veth;
        peer_iface.base.state = InterfaceState::Up;
        peer_iface.veth = Some(VethConfig {
            peer: iface_name.to_string(),
        });
        log::info!("Creating veth peer {peer} of {iface_name}");
        self.ifaces.push(Interface::Ethernet(peer_iface));
    }

    // Create or remove VF interfaces to match `total-vfs` of PF, VF
    // interface names are stored back to PF configure.
    fn sync_vfs(&mut self, pf_iface: &mut EthernetInterface) {
        let pf_name = pf_iface.base.name.clone();
        let sriov_conf = match pf_iface
            .ethernet
            .as_mut()
            .and_then(|e| e.sr_iov.as_mut())
        {
            Some(c) => c,
            None => return,
        };
        let total_vfs = sriov_conf.total_vfs.unwrap_or_default();
        let mut vfs: Vec<SrIovVfConfig> = sriov_conf
            .vfs
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter(|v| v.id < total_vfs)
            .collect();
        for vf_id in 0..total_vfs {
            let vf_name = gen_vf_name(&pf_name, vf_id);
            match vfs.iter_mut().find(|v| v.id == vf_id) {
                Some(vf) => vf.iface_name = Some(vf_name.clone()),
                None => {
                    let mut vf = SrIovVfConfig::new();
                    vf.id = vf_id;
                    vf.iface_name = Some(vf_name.clone());
                    vfs.push(vf);
                }
            }
            if self
                .ifaces
                .get_iface(&vf_name, InterfaceType::Ethernet)
                .is_none()
            {
                log::info!("Creating VF {vf_name} of PF {pf_name}");
                let mut vf_iface = EthernetInterface::new();
                vf_iface.base = BaseInterface::new();
                vf_iface.base.name = vf_name;
                vf_iface.base.iface_type = InterfaceType::Ethernet;
                vf_iface.base.state = InterfaceState::Up;
                self.ifaces.push(Interface::Ethernet(vf_iface));
            }
        }
        vfs.sort_unstable_by_key(|v| v.id);
        sriov_conf.vfs = if vfs.is_empty() { None } else { Some(vfs) };

        // Kernel removes VFs beyond `total-vfs`
        let vf_prefix = format!("{pf_name}v");
        let stale_vfs: Vec<String> = self
            .ifaces
            .kernel_ifaces
            .keys()
            .filter(|n| {
                n.strip_prefix(vf_prefix.as_str())
                    .and_then(|id| id.parse::<u32>().ok())
                    .map(|id| id >= total_vfs)
                    .unwrap_or_default()
            })
            .cloned()
            .collect();
        for vf_name in stale_vfs {
            log::info!("Removing VF {vf_name} of PF {pf_name}");
            self.ifaces.remove_iface(&vf_name, InterfaceType::Ethernet);
        }
    }
}

fn gen_vf_name(pf_name: &str, vf_id: u32) -> String {
    format!("{pf_name}v{vf_id}")
}

// Kernel generates IPv6 link-local address from MAC address, here we use a
// hash of interface name instead.
fn add_ipv6_link_local(base_iface: &mut BaseInterface) {
    let name_hash = base_iface
        .name
        .bytes()
        .fold(0u16, |h, b| h.wrapping_mul(31).wrapping_add(b.into()));
    if let Some(ipv6) = base_iface.ipv6.as_mut() {
        if !ipv6.enabled {
            return;
        }
        let addrs = ipv6.addresses.get_or_insert_with(Vec::new);
        if !addrs.iter().any(|a| a.is_link_local()) {
            addrs.push(InterfaceIpAddr::new(
                IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, name_hash)),
                IPV6_LINK_LOCAL_PREFIX_LEN,
            ));
        }
    }
}
