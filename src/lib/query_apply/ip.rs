// SPDX-License-Identifier: Apache-2.0

use crate::{InterfaceIpAddr, InterfaceIpv4, InterfaceIpv6};

// Link-local and dynamic(finite lifetime) addresses are not compared,
// lifetime and per-address MPTCP flags neither.
fn canonicalize_addresses(addrs: &mut Vec<InterfaceIpAddr>) {
    addrs.retain(|a| !a.is_link_local() && !a.is_auto());
    for addr in addrs.iter_mut() {
        *addr = addr.to_static();
    }
    addrs.sort_unstable_by(|a, b| {
        (&a.ip, a.prefix_length).cmp(&(&b.ip, b.prefix_length))
    });
}

impl InterfaceIpv4 {
    // Clean up before verification
    // * Sort IP address
    // * Ignore DHCP options if DHCP disabled
    // * Set DHCP as off if enabled and dhcp is None
    pub(crate) fn sanitize_for_verify(&mut self) {
        self.cleanup();
        self.allow_extra_address = None;
        if let Some(addrs) = self.addresses.as_mut() {
            canonicalize_addresses(addrs);
        }
        if self.enabled && self.dhcp.is_none() {
            self.dhcp = Some(false);
        }
    }
}

impl InterfaceIpv6 {
    // Clean up before verification
    // * Remove link-local address
    // * Ignore DHCP options if DHCP disabled
    // * Set DHCP and autoconf None to Some(false)
    pub(crate) fn sanitize_for_verify(&mut self) {
        self.cleanup();
        self.allow_extra_address = None;
        if let Some(addrs) = self.addresses.as_mut() {
            canonicalize_addresses(addrs);
        }
        if self.enabled {
            if self.dhcp.is_none() {
                self.dhcp = Some(false);
            }
            if self.autoconf.is_none() {
                self.autoconf = Some(false);
            }
        }
    }
}
