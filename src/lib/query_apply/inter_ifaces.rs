// SPDX-License-Identifier: Apache-2.0

use crate::{
    ErrorKind, Interface, InterfaceType, Interfaces, MergedInterfaces,
    NetstateError,
};

impl Interfaces {
    // Ports not found in current state(e.g. ignored ones) are not
    // verifiable, remove them from controller.
    fn remove_unknown_type_port(&mut self) {
        let mut pending_actions: Vec<(String, InterfaceType, String)> =
            Vec::new();
        for iface in self.iter().filter(|i| i.is_controller()) {
            for port_name in find_unknown_type_port(iface, self) {
                pending_actions.push((
                    iface.name().to_string(),
                    iface.iface_type(),
                    port_name.to_string(),
                ));
            }
        }

        for (ctrl_name, ctrl_type, port_name) in pending_actions {
            if let Some(iface) = self.get_iface_mut(&ctrl_name, ctrl_type) {
                iface.remove_port(&port_name);
            }
        }
    }

    fn remove_ignored_ifaces(&mut self, ignored: &[(String, InterfaceType)]) {
        for (iface_name, iface_type) in ignored {
            self.remove_iface(iface_name, iface_type.clone());
        }
    }
}

fn find_unknown_type_port<'a>(
    iface: &'a Interface,
    cur_ifaces: &Interfaces,
) -> Vec<&'a str> {
    let mut ret: Vec<&str> = Vec::new();
    if let Some(port_names) = iface.ports() {
        for port_name in port_names {
            if let Some(port_iface) =
                cur_ifaces.get_iface(port_name, InterfaceType::Unknown)
            {
                if port_iface.iface_type() == InterfaceType::Unknown {
                    ret.push(port_name);
                }
            } else {
                ret.push(port_name);
            }
        }
    }
    ret
}

fn verify_desire_absent_but_found_in_current(
    des_iface: &Interface,
    cur_iface: &Interface,
) -> Result<(), NetstateError> {
    if cur_iface.is_virtual() {
        // Virtual interface should be deleted by absent action
        let e = NetstateError::new(
            ErrorKind::VerificationError,
            format!(
                "Absent/Down interface {}/{} still found as {}/{}",
                des_iface.name(),
                des_iface.iface_type(),
                cur_iface.name(),
                cur_iface.iface_type(),
            ),
        );
        log::error!("{}", e);
        Err(e)
    } else {
        // Physical interface cannot be removed, only deactivated.
        Ok(())
    }
}

impl MergedInterfaces {
    /// Split changed interfaces into three lists for provider:
    ///  * New interfaces to create.
    ///  * Existing interfaces to modify.
    ///  * Interfaces to remove or deactivate.
    /// Each list is sorted by activation order.
    pub(crate) fn gen_state_for_apply(
        &self,
    ) -> Result<(Vec<Interface>, Vec<Interface>, Vec<Interface>), NetstateError>
    {
        let mut add_ifaces = Vec::new();
        let mut edit_ifaces = Vec::new();
        let mut admin_ifaces = Vec::new();

        for merged_iface in self.iter().filter(|i| i.is_changed()) {
            let mut iface = match merged_iface.for_apply.as_ref() {
                Some(i) => i.clone(),
                None => continue,
            };
            if iface.is_absent()
                || (iface.is_down() && merged_iface.current.is_some())
            {
                admin_ifaces.push(iface);
                continue;
            }
            iface.pre_edit_cleanup(merged_iface.current.as_ref())?;
            if merged_iface.current.is_none() {
                add_ifaces.push(iface);
            } else {
                edit_ifaces.push(iface);
            }
        }
        for ifaces in [&mut add_ifaces, &mut edit_ifaces, &mut admin_ifaces] {
            ifaces.sort_unstable_by(|a, b| a.name().cmp(b.name()));
            ifaces.sort_by_key(|i| i.base_iface().up_priority);
        }
        // Ports are removed before their controller.
        admin_ifaces.reverse();
        Ok((add_ifaces, edit_ifaces, admin_ifaces))
    }

    pub(crate) fn verify(
        &self,
        current: &Interfaces,
    ) -> Result<(), NetstateError> {
        let mut current = current.clone();
        current.remove_ignored_ifaces(self.ignored_ifaces.as_slice());
        current.remove_unknown_type_port();

        for des_iface in self.iter().filter(|i| i.is_desired()) {
            let iface = if let Some(i) = des_iface.for_verify.as_ref() {
                i
            } else {
                continue;
            };
            if iface.is_absent() || (iface.is_virtual() && iface.is_down()) {
                if let Some(cur_iface) =
                    current.get_iface(iface.name(), iface.iface_type())
                {
                    verify_desire_absent_but_found_in_current(
                        iface, cur_iface,
                    )?;
                }
            } else if let Some(cur_iface) =
                get_cur_iface(&current, iface.name(), iface.iface_type())
            {
                // Do not verify physical interface with state:down
                if iface.is_up() {
                    iface.verify(cur_iface)?;
                    if let Interface::Ethernet(eth_iface) = iface {
                        if eth_iface.sriov_is_enabled() {
                            eth_iface.verify_sriov(&current)?;
                        }
                    }
                }
            } else if iface.is_up() {
                let e = NetstateError::new(
                    ErrorKind::VerificationError,
                    format!(
                        "Failed to find desired interface {} {}",
                        iface.name(),
                        iface.iface_type()
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}

// Veth might be reported as ethernet.
fn get_cur_iface<'a>(
    current: &'a Interfaces,
    iface_name: &str,
    iface_type: InterfaceType,
) -> Option<&'a Interface> {
    if iface_type == InterfaceType::Veth {
        current.get_iface(iface_name, InterfaceType::Unknown)
    } else {
        current.get_iface(iface_name, iface_type)
    }
}
