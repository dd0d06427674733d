// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};

use crate::{
    ErrorKind, Interface, InterfaceState, InterfaceType, MergedInterface,
    MergedInterfaces, NetstateError, OvsInterface,
};

// Port attach or detach action: controller name(empty for detach),
// controller type and per-port options.
type PortChange = (String, Option<InterfaceType>, Option<serde_json::Value>);

impl MergedInterfaces {
    // Controller is searched in kernel interfaces first then OVS bridges.
    fn find_ctrl_key(
        &self,
        ctrl_name: &str,
    ) -> Option<(String, InterfaceType)> {
        match self.kernel_ifaces.get(ctrl_name) {
            Some(iface) if iface.merged.is_controller() => {
                Some((ctrl_name.to_string(), iface.merged.iface_type()))
            }
            _ => {
                let key = (ctrl_name.to_string(), InterfaceType::OvsBridge);
                if self.user_ifaces.contains_key(&key) {
                    Some(key)
                } else {
                    None
                }
            }
        }
    }

    // Controllers explicitly listing their ports in desired state, absent
    // controllers excluded.
    fn desired_ctrls_with_ports(&self) -> Vec<(String, InterfaceType)> {
        let mut ret: Vec<(String, InterfaceType)> = self
            .iter()
            .filter(|i| !i.merged.is_absent() && !i.merged.is_ignore())
            .filter(|i| {
                i.desired
                    .as_ref()
                    .map(|d| d.ports().is_some())
                    .unwrap_or_default()
            })
            .map(|i| (i.merged.name().to_string(), i.merged.iface_type()))
            .collect();
        ret.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        ret
    }

    fn is_port_listed_in_desired(
        &self,
        ctrl_key: &(String, InterfaceType),
        port_name: &str,
    ) -> Option<bool> {
        self.get_iface(ctrl_key.0.as_str(), ctrl_key.1.clone())
            .and_then(|i| i.desired.as_ref())
            .and_then(|d| d.ports())
            .map(|ports| ports.contains(&port_name))
    }

    fn remove_port_from_ctrl(
        &mut self,
        ctrl_key: &(String, InterfaceType),
        port_name: &str,
    ) {
        if let Some(ctrl) =
            self.get_iface_mut(ctrl_key.0.as_str(), ctrl_key.1.clone())
        {
            log::info!(
                "Removing port {port_name} from controller {}",
                ctrl_key.0
            );
            ctrl.mark_as_changed();
            ctrl.apply_change(|i| i.remove_port(port_name));
        }
    }

    // Interface marked as absent is removed from the port list of every
    // controller holding it.
    pub(crate) fn purge_absent_ports_from_controllers(
        &mut self,
    ) -> Result<(), NetstateError> {
        let absent_names: Vec<String> = self
            .kernel_ifaces
            .values()
            .filter(|i| i.is_desired() && i.merged.is_absent())
            .map(|i| i.merged.name().to_string())
            .collect();
        for absent_name in absent_names {
            let ctrl_keys: Vec<(String, InterfaceType)> = self
                .iter()
                .filter(|i| !i.merged.is_absent())
                .filter(|i| {
                    i.merged
                        .ports()
                        .map(|p| p.contains(&absent_name.as_str()))
                        .unwrap_or_default()
                })
                .map(|i| (i.merged.name().to_string(), i.merged.iface_type()))
                .collect();
            for ctrl_key in ctrl_keys {
                if self.is_port_listed_in_desired(&ctrl_key, &absent_name)
                    == Some(true)
                {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {absent_name} is marked as absent \
                            but still listed as port of {} {}",
                            ctrl_key.1, ctrl_key.0
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                self.remove_port_from_ctrl(&ctrl_key, &absent_name);
            }
        }
        Ok(())
    }

    // Handle the `controller` property defined on port side.
    pub(crate) fn apply_port_controller_prop(
        &mut self,
    ) -> Result<(), NetstateError> {
        let mut port_ctrls: Vec<(String, String)> = self
            .kernel_ifaces
            .values()
            .filter(|i| !i.merged.is_absent() && !i.merged.is_ignore())
            .filter_map(|i| {
                i.desired
                    .as_ref()
                    .and_then(|d| d.base_iface().controller.as_ref())
                    .map(|c| (i.merged.name().to_string(), c.to_string()))
            })
            .collect();
        port_ctrls.sort_unstable();

        for (port_name, ctrl_name) in port_ctrls {
            let cur_ctrl_key = self
                .kernel_ifaces
                .get(&port_name)
                .and_then(|i| i.current.as_ref())
                .and_then(|i| i.base_iface().controller.as_deref())
                .filter(|c| !c.is_empty())
                .and_then(|c| self.find_ctrl_key(c));

            if ctrl_name.is_empty() {
                if let Some(cur_ctrl_key) = cur_ctrl_key {
                    if self.is_port_listed_in_desired(&cur_ctrl_key, &port_name)
                        == Some(true)
                    {
                        return Err(conflict_ctrl_error(
                            &port_name,
                            "",
                            &cur_ctrl_key.0,
                        ));
                    }
                    self.remove_port_from_ctrl(&cur_ctrl_key, &port_name);
                }
                if let Some(port) = self.kernel_ifaces.get_mut(&port_name) {
                    port.apply_ctrller_change(String::new(), None, None)?;
                }
                continue;
            }

            let ctrl_key = match self.find_ctrl_key(&ctrl_name) {
                Some(k) => k,
                None => {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {port_name} is using controller \
                            {ctrl_name} which does not exist in desired or \
                            current state"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            };
            match self.is_port_listed_in_desired(&ctrl_key, &port_name) {
                // Port list of controller will handle it.
                Some(true) => continue,
                Some(false) => {
                    return Err(conflict_ctrl_error(
                        &port_name,
                        &ctrl_name,
                        &ctrl_name,
                    ));
                }
                None => (),
            }
            if let Some(cur_ctrl_key) = cur_ctrl_key {
                if cur_ctrl_key == ctrl_key {
                    continue;
                }
                if self.is_port_listed_in_desired(&cur_ctrl_key, &port_name)
                    == Some(true)
                {
                    return Err(conflict_ctrl_error(
                        &port_name,
                        &ctrl_name,
                        &cur_ctrl_key.0,
                    ));
                }
                self.remove_port_from_ctrl(&cur_ctrl_key, &port_name);
            }
            let port_options = if let Some(ctrl) =
                self.get_iface_mut(ctrl_key.0.as_str(), ctrl_key.1.clone())
            {
                if ctrl.merged.is_absent() {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {port_name} is using controller \
                            {ctrl_name} which is marked as absent"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                ctrl.mark_as_changed();
                ctrl.apply_change(|i| i.add_port(port_name.as_str()));
                ctrl.merged.get_port_options(&port_name)
            } else {
                None
            };
            if let Some(port) = self.kernel_ifaces.get_mut(&port_name) {
                port.apply_ctrller_change(
                    ctrl_name.to_string(),
                    Some(ctrl_key.1.clone()),
                    port_options,
                )?;
            }
        }
        Ok(())
    }

    // A port should only be listed by single controller.
    pub(crate) fn check_overbook_ports(&self) -> Result<(), NetstateError> {
        let mut port_to_ctrl: HashMap<&str, &str> = HashMap::new();
        for (ctrl_name, ctrl_type) in self.desired_ctrls_with_ports() {
            let ctrl = match self.get_iface(&ctrl_name, ctrl_type) {
                Some(i) => i,
                None => continue,
            };
            for port_name in ctrl
                .desired
                .as_ref()
                .and_then(|d| d.ports())
                .unwrap_or_default()
            {
                let ctrl_name = ctrl.merged.name();
                if let Some(other_ctrl) = port_to_ctrl.get(port_name) {
                    if *other_ctrl != ctrl_name {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "Port {port_name} is overbooked by two \
                                controller: {other_ctrl}, {ctrl_name}"
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                }
                port_to_ctrl.insert(port_name, ctrl_name);
            }
        }
        Ok(())
    }

    pub(crate) fn handle_changed_ports(&mut self) -> Result<(), NetstateError> {
        let desired_ctrls = self.desired_ctrls_with_ports();
        let desired_ctrl_names: HashSet<&str> =
            desired_ctrls.iter().map(|(n, _)| n.as_str()).collect();
        let mut pending_changes: HashMap<String, PortChange> = HashMap::new();

        for (ctrl_name, ctrl_type) in desired_ctrls.iter() {
            let ctrl = match self.get_iface(ctrl_name, ctrl_type.clone()) {
                Some(i) => i,
                None => continue,
            };
            gen_port_changes(ctrl, &mut pending_changes);
        }
        log::debug!("Pending port changes {:?}", pending_changes);

        let mut port_names: Vec<String> =
            pending_changes.keys().cloned().collect();
        port_names.sort_unstable();
        for port_name in port_names {
            let (ctrl_name, ctrl_type, port_options) =
                match pending_changes.remove(&port_name) {
                    Some(c) => c,
                    None => continue,
                };
            let is_attach = !ctrl_name.is_empty();

            let port = match self.kernel_ifaces.get(&port_name) {
                Some(p) => p,
                None => {
                    if !is_attach {
                        continue;
                    }
                    if ctrl_type == Some(InterfaceType::OvsBridge) {
                        log::info!(
                            "Creating OVS internal interface {port_name} for \
                            OVS bridge {ctrl_name}"
                        );
                        let iface = Interface::OvsInterface(
                            OvsInterface::new_with_name_and_ctrl(
                                &port_name, &ctrl_name,
                            ),
                        );
                        let mut merged_iface =
                            MergedInterface::new(Some(iface), None)?;
                        merged_iface.apply_ctrller_change(
                            ctrl_name.to_string(),
                            ctrl_type,
                            port_options,
                        )?;
                        self.kernel_ifaces.insert(port_name, merged_iface);
                        continue;
                    }
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {ctrl_name} is holding unknown port \
                            {port_name}"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            };

            if is_attach {
                if port.merged.is_absent() {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {port_name} is marked as absent but \
                            listed as port of {ctrl_name}"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
                if port.merged.is_ignore() {
                    if port.desired.as_ref().map(|d| d.is_ignore())
                        == Some(true)
                    {
                        let e = NetstateError::new(
                            ErrorKind::InvalidArgument,
                            format!(
                                "Interface {port_name} is marked as ignore \
                                but listed as port of {ctrl_name}"
                            ),
                        );
                        log::error!("{}", e);
                        return Err(e);
                    }
                    log::info!(
                        "Interface {port_name} is no longer ignored as it is \
                        listed as port of {ctrl_name}"
                    );
                    self.ignored_ifaces.retain(|(n, _)| n != &port_name);
                }
                // Port moved from controller not mentioned in desired
                let old_ctrl_key = port
                    .current
                    .as_ref()
                    .and_then(|i| i.base_iface().controller.as_deref())
                    .filter(|c| {
                        !c.is_empty()
                            && *c != ctrl_name.as_str()
                            && !desired_ctrl_names.contains(c)
                    })
                    .and_then(|c| self.find_ctrl_key(c));
                if let Some(old_ctrl_key) = old_ctrl_key {
                    self.remove_port_from_ctrl(&old_ctrl_key, &port_name);
                }
            }

            if let Some(port) = self.kernel_ifaces.get_mut(&port_name) {
                if port.merged.is_ignore() {
                    port.mark_as_changed();
                    port.apply_change(|i| {
                        i.base_iface_mut().state = InterfaceState::Up
                    });
                }
                if !is_attach && port.merged.need_controller() {
                    log::info!(
                        "Marking {} interface {port_name} as absent as it \
                        is detached from its controller",
                        port.merged.iface_type()
                    );
                    port.mark_as_absent();
                } else {
                    port.apply_ctrller_change(
                        ctrl_name,
                        ctrl_type,
                        port_options,
                    )?;
                }
            }
        }
        Ok(())
    }

    // OVS bridge cannot live without port.
    pub(crate) fn create_ovs_iface_for_empty_bridges(&mut self) {
        let mut new_ovs_ifaces: Vec<OvsInterface> = Vec::new();
        for iface in self.user_ifaces.values_mut() {
            if !iface.is_changed() || !iface.merged.is_up() {
                continue;
            }
            let is_new = iface.current.is_none();
            let mut new_iface = None;
            if let Some(Interface::OvsBridge(br)) = iface.for_apply.as_mut() {
                new_iface = br.create_ovs_iface_for_empty_ports(is_new);
            }
            if new_iface.is_some() {
                for br_iface in
                    [Some(&mut iface.merged), iface.for_verify.as_mut()]
                        .into_iter()
                        .flatten()
                {
                    if let Interface::OvsBridge(br) = br_iface {
                        br.create_ovs_iface_for_empty_ports(is_new);
                    }
                }
            }
            new_ovs_ifaces.extend(new_iface);
        }
        for ovs_iface in new_ovs_ifaces {
            let iface_name = ovs_iface.base.name.clone();
            if self.kernel_ifaces.contains_key(&iface_name) {
                continue;
            }
            match MergedInterface::new(
                Some(Interface::OvsInterface(ovs_iface)),
                None,
            ) {
                Ok(i) => {
                    self.kernel_ifaces.insert(iface_name, i);
                }
                Err(e) => {
                    log::warn!(
                        "Failed to create OVS internal interface \
                        {iface_name}: {e}"
                    );
                }
            }
        }
    }

    pub(crate) fn check_infiniband_as_ports(
        &self,
    ) -> Result<(), NetstateError> {
        for iface in self.kernel_ifaces.values().filter(|i| {
            i.is_changed() && i.merged.iface_type() == InterfaceType::InfiniBand
        }) {
            let ctrl_name =
                match iface.merged.base_iface().controller.as_deref() {
                    Some(c) if !c.is_empty() => c,
                    _ => continue,
                };
            if let Some(ctrl) = self
                .find_ctrl_key(ctrl_name)
                .and_then(|(n, t)| self.get_iface(&n, t))
            {
                iface.validate_infiniband_as_port(&ctrl.merged)?;
            }
        }
        Ok(())
    }

    pub(crate) fn validate_ovs_patch_peers(&self) -> Result<(), NetstateError> {
        for iface in self.kernel_ifaces.values().filter(|i| {
            i.is_changed()
                && i.merged.iface_type() == InterfaceType::OvsInterface
        }) {
            let peer_iface = match iface.for_apply.as_ref() {
                Some(Interface::OvsInterface(i)) => i
                    .patch_peer()
                    .and_then(|p| self.kernel_ifaces.get(p))
                    .map(|p| &p.merged),
                _ => None,
            };
            let allow_extra_patch_ports = iface
                .merged
                .base_iface()
                .controller
                .as_ref()
                .and_then(|c| {
                    self.user_ifaces
                        .get(&(c.to_string(), InterfaceType::OvsBridge))
                })
                .map(|br| match &br.merged {
                    Interface::OvsBridge(br) => br.allow_extra_patch_ports(),
                    _ => false,
                })
                .unwrap_or_default();
            iface.validate_ovs_patch_peer(peer_iface, allow_extra_patch_ports)?;
        }
        Ok(())
    }

    // Return true when all changed interfaces have valid up priority.
    pub(crate) fn set_ifaces_up_priority(&mut self) -> bool {
        let mut ret = true;
        let mut pending_changes: HashMap<String, u32> = HashMap::new();
        let iface_order = self.up_priority_order();

        for iface_name in iface_order.iter() {
            let base = match self.kernel_ifaces.get(iface_name) {
                Some(i) => i.merged.base_iface(),
                None => continue,
            };
            if base.state != InterfaceState::Up
                || base.is_up_priority_valid()
            {
                continue;
            }
            let ctrl_name = match base.controller.as_deref() {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            if let Some(ctrl_pri) = pending_changes.get(ctrl_name) {
                let pri = ctrl_pri + 1;
                pending_changes.insert(iface_name.to_string(), pri);
                continue;
            }
            let ctrl_base = match self
                .find_ctrl_key(ctrl_name)
                .and_then(|(n, t)| self.get_iface(&n, t))
            {
                Some(c) => c.merged.base_iface(),
                None => continue,
            };
            if ctrl_base.is_up_priority_valid() {
                pending_changes
                    .insert(iface_name.to_string(), ctrl_base.up_priority + 1);
            } else {
                log::debug!(
                    "Controller {ctrl_name} of {iface_name} has no up \
                    priority yet"
                );
                ret = false;
            }
        }

        // Child interface is activated after its parent
        if ret {
            for iface_name in iface_order.iter() {
                let iface = match self.kernel_ifaces.get(iface_name) {
                    Some(i) => &i.merged,
                    None => continue,
                };
                let parent = match iface.parent() {
                    Some(p) => p,
                    None => continue,
                };
                if !iface.is_up() || iface.base_iface().has_controller() {
                    continue;
                }
                let parent_pri = pending_changes.get(parent).cloned().or_else(
                    || {
                        self.kernel_ifaces
                            .get(parent)
                            .map(|p| p.merged.base_iface().up_priority)
                    },
                );
                if let Some(parent_pri) = parent_pri {
                    if parent_pri > 0 {
                        pending_changes
                            .insert(iface_name.to_string(), parent_pri + 1);
                    }
                }
            }
        }

        log::debug!("Pending kernel up priority changes {:?}", pending_changes);
        for (iface_name, priority) in pending_changes {
            if let Some(iface) = self.kernel_ifaces.get_mut(&iface_name) {
                iface.apply_change(|i| {
                    i.base_iface_mut().up_priority = priority
                });
            }
        }
        ret
    }

    // Desired interfaces in the order user provided, followed by other
    // changed interfaces sorted by name.
    fn up_priority_order(&self) -> Vec<String> {
        let mut ret: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for (iface_name, iface_type) in self.insert_order.iter() {
            if iface_type.is_userspace() {
                continue;
            }
            if seen.insert(iface_name.as_str()) {
                ret.push(iface_name.to_string());
            }
        }
        let mut others: Vec<&str> = self
            .kernel_ifaces
            .values()
            .filter(|i| i.is_changed())
            .map(|i| i.merged.name())
            .filter(|n| !seen.contains(n))
            .collect();
        others.sort_unstable();
        ret.extend(others.into_iter().map(|n| n.to_string()));
        ret
    }
}

fn gen_port_changes(
    ctrl: &MergedInterface,
    pending_changes: &mut HashMap<String, PortChange>,
) {
    let des_ctrl = match ctrl.desired.as_ref() {
        Some(d) => d,
        None => return,
    };
    let apply_ctrl = ctrl.for_apply.as_ref().unwrap_or(&ctrl.merged);
    let ctrl_name = ctrl.merged.name();
    let ctrl_type = ctrl.merged.iface_type();
    let des_ports: Vec<&str> = des_ctrl.ports().unwrap_or_default();
    let cur_ports: Vec<&str> = ctrl
        .current
        .as_ref()
        .and_then(|c| c.ports())
        .unwrap_or_default();

    for port_name in des_ports.iter() {
        let changed = if cur_ports.contains(port_name) {
            // Only port configuration changed
            let des_opts = des_ctrl.get_port_options(port_name);
            des_opts.is_some()
                && des_opts
                    != ctrl
                        .current
                        .as_ref()
                        .and_then(|c| c.get_port_options(port_name))
        } else {
            true
        };
        if changed {
            pending_changes.insert(
                port_name.to_string(),
                (
                    ctrl_name.to_string(),
                    Some(ctrl_type.clone()),
                    apply_ctrl.get_port_options(port_name),
                ),
            );
        }
    }
    for port_name in cur_ports.iter().filter(|p| !des_ports.contains(*p)) {
        pending_changes
            .entry(port_name.to_string())
            .or_insert((String::new(), None, None));
    }
}

fn conflict_ctrl_error(
    port_name: &str,
    ctrl_name: &str,
    listed_by: &str,
) -> NetstateError {
    let e = NetstateError::new(
        ErrorKind::InvalidArgument,
        format!(
            "Interface {port_name} has controller property set to \
            '{ctrl_name}' which conflicts with the port list of \
            controller {listed_by}"
        ),
    );
    log::error!("{}", e);
    e
}
