// SPDX-License-Identifier: Apache-2.0

use crate::{
    Interface, InterfaceIpAddr, NetstateError, NetstateProvider, NetworkState,
};

impl NetworkState {
    /// Retrieve the network state with dynamic data removed, only the
    /// configuration which could be applied back is kept.
    pub fn retrieve_running_config<P>(
        &mut self,
        provider: &mut P,
    ) -> Result<&mut Self, NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        self.set_running_config_only(true);
        self.retrieve(provider)
    }

    // Remove:
    //  * DHCP and autoconf learned addresses, routes and DNS.
    //  * Address lifetimes and IPv6 link-local addresses.
    //  * MAC address of virtual interfaces.
    //  * The `running` sub-trees.
    pub(crate) fn strip_dynamic_data(&mut self) {
        for iface in self
            .interfaces
            .kernel_ifaces
            .values_mut()
            .chain(self.interfaces.user_ifaces.values_mut())
        {
            strip_iface_dynamic_data(iface);
        }
        self.routes.hide_running();
        self.dns.running = None;
        if let Some(hostname) = self.hostname.as_mut() {
            hostname.running = None;
        }
    }
}

fn strip_iface_dynamic_data(iface: &mut Interface) {
    if iface.is_virtual() {
        iface.base_iface_mut().mac_address = None;
    }
    let base_iface = iface.base_iface_mut();
    if let Some(ipv4) = base_iface.ipv4.as_mut() {
        let is_auto = ipv4.is_auto();
        strip_dynamic_addrs(&mut ipv4.addresses, is_auto);
    }
    if let Some(ipv6) = base_iface.ipv6.as_mut() {
        let is_auto = ipv6.is_auto();
        strip_dynamic_addrs(&mut ipv6.addresses, is_auto);
    }
}

fn strip_dynamic_addrs(
    addrs: &mut Option<Vec<InterfaceIpAddr>>,
    is_auto: bool,
) {
    if let Some(addr_list) = addrs.as_mut() {
        addr_list.retain(|a| !a.is_link_local() && !a.is_auto());
        for addr in addr_list.iter_mut() {
            *addr = addr.to_static();
        }
    }
    // Dynamic IP without static address
    if is_auto && addrs.as_ref().map(|a| a.is_empty()).unwrap_or_default() {
        *addrs = None;
    }
}
