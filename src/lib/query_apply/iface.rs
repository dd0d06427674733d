// SPDX-License-Identifier: Apache-2.0

use crate::{state::verify_json, Interface, InterfaceType, NetstateError};

impl Interface {
    fn pre_verify_cleanup(&mut self) {
        match self {
            Self::LinuxBridge(ref mut iface) => {
                iface.pre_verify_cleanup();
            }
            Self::Bond(ref mut iface) => {
                iface.pre_verify_cleanup();
            }
            Self::Ethernet(ref mut iface) => {
                iface.pre_verify_cleanup();
            }
            Self::OvsBridge(ref mut iface) => {
                iface.pre_verify_cleanup();
            }
            Self::OvsInterface(ref mut iface) => {
                iface.pre_verify_cleanup();
            }
            Self::Vrf(ref mut iface) => {
                iface.pre_verify_cleanup();
            }
            Self::WireGuard(ref mut iface) => {
                iface.pre_verify_cleanup();
            }
            _ => (),
        }
    }

    // Canonical forms of desired and current for comparison.
    pub(crate) fn canonicalize_pair(&self, current: &Self) -> (Self, Self) {
        let mut self_clone = self.clone();
        let mut current_clone = current.clone();
        // In order to allow desire interface to determine whether it can
        // hold IP or not, we copy controller information from current to
        // desire.
        if current_clone.base_iface().controller.is_some()
            && self_clone.base_iface().controller.is_none()
        {
            self_clone.base_iface_mut().controller =
                current_clone.base_iface().controller.clone();
            self_clone.base_iface_mut().controller_type =
                current_clone.base_iface().controller_type.clone();
        }
        self_clone
            .base_iface()
            .remove_extra_address(current_clone.base_iface_mut());
        current_clone.base_iface_mut().sanitize_current_for_verify();
        current_clone.pre_verify_cleanup();
        self_clone.base_iface_mut().sanitize_desired_for_verify();
        self_clone.pre_verify_cleanup();

        if self_clone.iface_type() == InterfaceType::Unknown {
            current_clone.base_iface_mut().iface_type = InterfaceType::Unknown;
        }
        // Kernel reports veth as ethernet when peer is not visible.
        if self_clone.iface_type() == InterfaceType::Veth
            && current_clone.iface_type() == InterfaceType::Ethernet
        {
            current_clone.base_iface_mut().iface_type = InterfaceType::Veth;
        }

        (self_clone, current_clone)
    }

    pub(crate) fn verify(&self, current: &Self) -> Result<(), NetstateError> {
        let (desired, current) = self.canonicalize_pair(current);
        verify_json(&format!("{}.interface", self.name()), &desired, &current)
    }
}
