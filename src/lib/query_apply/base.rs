// SPDX-License-Identifier: Apache-2.0

use crate::{mptcp::mptcp_pre_verify_cleanup, BaseInterface};

impl BaseInterface {
    // Properties only meaningful for applying or only known by current
    // state are removed before comparison.
    pub(crate) fn pre_verify_cleanup(&mut self) {
        self.description = None;
        self.copy_mac_from = None;
        self.wait_ip = None;
        self.backend_specific = None;
        self.identifier = None;
        if let Some(mac) = self.mac_address.as_mut() {
            mac.make_ascii_uppercase();
        }
        if let Some(ovsdb_conf) = self.ovsdb.as_mut() {
            ovsdb_conf.pre_verify_cleanup();
        }
        mptcp_pre_verify_cleanup(self);
    }

    pub(crate) fn sanitize_current_for_verify(&mut self) {
        if self.controller.is_none() {
            self.controller = Some(String::new());
        }
        if self.ovsdb.is_none() {
            self.ovsdb = Some(Default::default());
        }
        if let Some(ipv4_conf) = self.ipv4.as_mut() {
            ipv4_conf.sanitize_for_verify();
        }
        if let Some(ipv6_conf) = self.ipv6.as_mut() {
            ipv6_conf.sanitize_for_verify();
        }
        self.pre_verify_cleanup();
    }

    pub(crate) fn sanitize_desired_for_verify(&mut self) {
        if let Some(ipv4_conf) = self.ipv4.as_mut() {
            ipv4_conf.sanitize_for_verify();
        }
        if let Some(ipv6_conf) = self.ipv6.as_mut() {
            ipv6_conf.sanitize_for_verify();
        }
        self.pre_verify_cleanup();
    }

    // With `allow-extra-address: true`, addresses of current not
    // mentioned in desired are ignored.
    pub(crate) fn remove_extra_address(&self, current: &mut Self) {
        if let (Some(des), Some(cur)) =
            (self.ipv4.as_ref(), current.ipv4.as_mut())
        {
            if des.allow_extra_address == Some(true) {
                if let (Some(des_addrs), Some(cur_addrs)) =
                    (des.addresses.as_ref(), cur.addresses.as_mut())
                {
                    cur_addrs.retain(|a| {
                        des_addrs.iter().any(|d| {
                            d.ip == a.ip && d.prefix_length == a.prefix_length
                        })
                    });
                }
            }
        }
        if let (Some(des), Some(cur)) =
            (self.ipv6.as_ref(), current.ipv6.as_mut())
        {
            if des.allow_extra_address == Some(true) {
                if let (Some(des_addrs), Some(cur_addrs)) =
                    (des.addresses.as_ref(), cur.addresses.as_mut())
                {
                    cur_addrs.retain(|a| {
                        des_addrs.iter().any(|d| {
                            d.ip == a.ip && d.prefix_length == a.prefix_length
                        })
                    });
                }
            }
        }
    }
}
