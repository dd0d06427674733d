// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use serde::{
    ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{
    ErrorKind, Interface, InterfaceState, InterfaceType, MergedInterface,
    NetstateError,
};

// The max loop count for MergedInterfaces.set_up_priority()
// This allows interface with 4 nested levels in any order.
// To support more nested level, user could place top controller at the
// beginning of desire state
const INTERFACES_SET_PRIORITY_MAX_RETRY: u32 = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
/// Represent a list of [Interface] with special serde handling: kernel
/// interfaces are stored by name, user space interfaces(e.g. OVS bridge) are
/// stored by name and type, as OVS bridge and OVS internal interface could
/// share the same name.
pub struct Interfaces {
    pub(crate) kernel_ifaces: HashMap<String, Interface>,
    pub(crate) user_ifaces: HashMap<(String, InterfaceType), Interface>,
    // The insert_order is allowing user to provided ordered interface
    // to support 5+ nested dependency.
    pub(crate) insert_order: Vec<(String, InterfaceType)>,
}

impl<'de> Deserialize<'de> for Interfaces {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut ret = Self::new();
        let ifaces =
            <Vec<Interface> as Deserialize>::deserialize(deserializer)?;
        for iface in ifaces {
            ret.push(iface)
        }
        Ok(ret)
    }
}

impl Serialize for Interfaces {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let ifaces = self.to_vec();
        let mut seq = serializer.serialize_seq(Some(ifaces.len()))?;
        for iface in ifaces {
            seq.serialize_element(iface)?;
        }
        seq.end()
    }
}

impl Interfaces {
    /// Create empty [Interfaces].
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no interface is stored.
    pub fn is_empty(&self) -> bool {
        self.kernel_ifaces.is_empty() && self.user_ifaces.is_empty()
    }

    /// Extract internal interfaces to `Vec()`, sorted by name then by
    /// activation order. User space interfaces come last.
    pub fn to_vec(&self) -> Vec<&Interface> {
        let mut ifaces = Vec::new();
        for iface in self.kernel_ifaces.values() {
            ifaces.push(iface);
        }
        ifaces.sort_unstable_by_key(|iface| iface.name());
        // Use sort_by_key() instead of unstable one, do we can alphabet
        // activation order which is required to simulate the OS boot-up.
        ifaces.sort_by_key(|iface| iface.base_iface().up_priority);

        let mut user_ifaces: Vec<&Interface> =
            self.user_ifaces.values().collect();
        user_ifaces.sort_unstable_by_key(|iface| iface.name());
        ifaces.extend(user_ifaces);
        ifaces
    }

    /// Iterate all interfaces without order guarantee.
    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.kernel_ifaces.values().chain(self.user_ifaces.values())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Interface> {
        self.kernel_ifaces
            .values_mut()
            .chain(self.user_ifaces.values_mut())
    }

    /// Append specified [Interface]. Existing interface with the same name
    /// (and type for user space interface) is replaced.
    pub fn push(&mut self, iface: Interface) {
        let is_userspace = iface.is_userspace();
        match self.insert_order.iter_mut().find(|(name, iface_type)| {
            name == iface.name()
                && (iface_type == &iface.iface_type()
                    || (!is_userspace && !iface_type.is_userspace()))
        }) {
            // Kernel interface might change type by replacement
            Some(existing) => existing.1 = iface.iface_type(),
            None => self
                .insert_order
                .push((iface.name().to_string(), iface.iface_type())),
        }
        if is_userspace {
            self.user_ifaces
                .insert((iface.name().to_string(), iface.iface_type()), iface);
        } else {
            self.kernel_ifaces.insert(iface.name().to_string(), iface);
        }
    }

    /// Search interface by name and type. The [InterfaceType::Unknown] will
    /// match any kernel interface first, then any user space interface.
    pub fn get_iface<'a>(
        &'a self,
        iface_name: &str,
        iface_type: InterfaceType,
    ) -> Option<&'a Interface> {
        if iface_type == InterfaceType::Unknown {
            self.kernel_ifaces.get(iface_name).or_else(|| {
                self.user_ifaces
                    .values()
                    .find(|i| i.name() == iface_name)
            })
        } else if iface_type.is_userspace() {
            self.user_ifaces.get(&(iface_name.to_string(), iface_type))
        } else {
            self.kernel_ifaces.get(iface_name)
        }
    }

    pub(crate) fn get_iface_mut<'a>(
        &'a mut self,
        iface_name: &str,
        iface_type: InterfaceType,
    ) -> Option<&'a mut Interface> {
        if iface_type.is_userspace() {
            self.user_ifaces.get_mut(&(iface_name.to_string(), iface_type))
        } else {
            self.kernel_ifaces.get_mut(iface_name)
        }
    }

    pub(crate) fn remove_iface(
        &mut self,
        iface_name: &str,
        iface_type: InterfaceType,
    ) -> Option<Interface> {
        let removed = if iface_type == InterfaceType::Unknown {
            match self.kernel_ifaces.remove(iface_name) {
                Some(iface) => Some(iface),
                None => {
                    let key = self
                        .user_ifaces
                        .keys()
                        .find(|(name, _)| name == iface_name)
                        .cloned()?;
                    self.user_ifaces.remove(&key)
                }
            }
        } else if iface_type.is_userspace() {
            self.user_ifaces.remove(&(iface_name.to_string(), iface_type))
        } else {
            self.kernel_ifaces.remove(iface_name)
        };
        if let Some(iface) = removed.as_ref() {
            self.insert_order.retain(|(name, iface_type)| {
                name != iface.name() || iface_type != &iface.iface_type()
            });
        }
        removed
    }

    pub(crate) fn hide_secrets(&mut self) {
        for iface in self.iter_mut() {
            iface.hide_secrets();
        }
    }

    // The `controller_type` is not serialized, deduce it from controller
    // interface found in the same state.
    pub(crate) fn set_controller_type(&mut self) {
        let mut pending_changes: Vec<(String, InterfaceType)> = Vec::new();
        for iface in self.iter() {
            let ctrl_name = match iface.base_iface().controller.as_deref() {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            if iface.base_iface().controller_type.is_some() {
                continue;
            }
            let ctrl_type = match self.kernel_ifaces.get(ctrl_name) {
                Some(ctrl) if ctrl.is_controller() => Some(ctrl.iface_type()),
                _ => self
                    .user_ifaces
                    .get(&(ctrl_name.to_string(), InterfaceType::OvsBridge))
                    .map(|_| InterfaceType::OvsBridge),
            };
            if let Some(ctrl_type) = ctrl_type {
                pending_changes.push((iface.name().to_string(), ctrl_type));
            }
        }
        for (iface_name, ctrl_type) in pending_changes {
            if let Some(iface) = self.kernel_ifaces.get_mut(&iface_name) {
                iface.base_iface_mut().controller_type = Some(ctrl_type);
            }
        }
    }

    fn ignored_iface_keys(&self) -> Vec<(String, InterfaceType)> {
        self.iter()
            .filter(|i| i.is_ignore())
            .map(|i| (i.name().to_string(), i.iface_type()))
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergedInterfaces {
    pub(crate) kernel_ifaces: HashMap<String, MergedInterface>,
    pub(crate) user_ifaces: HashMap<(String, InterfaceType), MergedInterface>,
    pub(crate) insert_order: Vec<(String, InterfaceType)>,
    pub(crate) ignored_ifaces: Vec<(String, InterfaceType)>,
    pub(crate) memory_only: bool,
}

impl MergedInterfaces {
    pub(crate) fn new(
        desired: Interfaces,
        current: Interfaces,
        memory_only: bool,
    ) -> Result<Self, NetstateError> {
        let mut desired = desired;
        let mut current = current;
        current.set_controller_type();

        let mut ignored_ifaces = desired.ignored_iface_keys();
        for (name, iface_type) in current.ignored_iface_keys() {
            if desired.get_iface(&name, iface_type.clone()).is_none() {
                ignored_ifaces.push((name, iface_type));
            }
        }

        let mut kernel_ifaces: HashMap<String, MergedInterface> =
            HashMap::new();
        let mut user_ifaces: HashMap<(String, InterfaceType), MergedInterface> =
            HashMap::new();

        let insert_order = desired.insert_order.clone();
        let mut des_ifaces: Vec<Interface> = desired
            .kernel_ifaces
            .drain()
            .map(|(_, i)| i)
            .chain(desired.user_ifaces.drain().map(|(_, i)| i))
            .collect();
        des_ifaces.sort_unstable_by(|a, b| a.name().cmp(b.name()));

        for des_iface in des_ifaces {
            let mut cur_iface =
                current.remove_iface(des_iface.name(), des_iface.iface_type());
            if let Some(cur) = cur_iface.as_ref() {
                if !is_iface_type_compatible(&des_iface, cur) {
                    if des_iface.is_absent() {
                        log::warn!(
                            "Interface {} in desired state has different \
                            interface type '{}' than current status '{}', \
                            ignoring the absent action",
                            des_iface.name(),
                            des_iface.iface_type(),
                            cur.iface_type()
                        );
                        if let Some(cur) = cur_iface.take() {
                            insert_merged_iface(
                                &mut kernel_ifaces,
                                &mut user_ifaces,
                                MergedInterface::new(None, Some(cur))?,
                            );
                        }
                        continue;
                    }
                    log::info!(
                        "Interface {} will be recreated as type {}, \
                        current type is {}",
                        des_iface.name(),
                        des_iface.iface_type(),
                        cur.iface_type()
                    );
                    cur_iface = None;
                }
            }
            insert_merged_iface(
                &mut kernel_ifaces,
                &mut user_ifaces,
                MergedInterface::new(Some(des_iface), cur_iface)?,
            );
        }

        for cur_iface in current
            .kernel_ifaces
            .drain()
            .map(|(_, i)| i)
            .chain(current.user_ifaces.drain().map(|(_, i)| i))
        {
            insert_merged_iface(
                &mut kernel_ifaces,
                &mut user_ifaces,
                MergedInterface::new(None, Some(cur_iface))?,
            );
        }

        let mut ret = Self {
            kernel_ifaces,
            user_ifaces,
            insert_order,
            ignored_ifaces,
            memory_only,
        };
        ret.post_merge_process()?;
        Ok(ret)
    }

    fn post_merge_process(&mut self) -> Result<(), NetstateError> {
        self.mark_orphan_interface_as_absent();
        self.purge_absent_ports_from_controllers()?;
        self.apply_port_controller_prop()?;
        self.check_overbook_ports()?;
        self.handle_changed_ports()?;
        self.create_ovs_iface_for_empty_bridges();
        self.validate_parents_exist()?;
        self.check_infiniband_as_ports()?;
        self.validate_ovs_patch_peers()?;
        for iface in self.iter_mut().filter(|i| i.is_changed()) {
            iface.post_inter_ifaces_process()?;
        }
        self.resolve_copy_mac_from()?;
        self.set_up_priority()?;
        Ok(())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &MergedInterface> {
        self.kernel_ifaces.values().chain(self.user_ifaces.values())
    }

    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut MergedInterface> {
        self.kernel_ifaces
            .values_mut()
            .chain(self.user_ifaces.values_mut())
    }

    pub(crate) fn get_iface<'a>(
        &'a self,
        iface_name: &str,
        iface_type: InterfaceType,
    ) -> Option<&'a MergedInterface> {
        if iface_type.is_userspace() {
            self.user_ifaces.get(&(iface_name.to_string(), iface_type))
        } else {
            self.kernel_ifaces.get(iface_name)
        }
    }

    pub(crate) fn get_iface_mut<'a>(
        &'a mut self,
        iface_name: &str,
        iface_type: InterfaceType,
    ) -> Option<&'a mut MergedInterface> {
        if iface_type.is_userspace() {
            self.user_ifaces
                .get_mut(&(iface_name.to_string(), iface_type))
        } else {
            self.kernel_ifaces.get_mut(iface_name)
        }
    }

    /// Interface holding static IP in specified family, sorted by name.
    pub(crate) fn first_static_iface(&self, is_ipv6: bool) -> Option<String> {
        let mut names: Vec<&str> = self
            .kernel_ifaces
            .values()
            .filter(|i| !i.merged.is_absent() && !i.merged.is_ignore())
            .filter(|i| {
                let base = i.merged.base_iface();
                if is_ipv6 {
                    base.ipv6.as_ref().map(|ip| ip.is_static())
                } else {
                    base.ipv4.as_ref().map(|ip| ip.is_static())
                }
                .unwrap_or_default()
            })
            .map(|i| i.merged.name())
            .collect();
        names.sort_unstable();
        names.first().map(|n| n.to_string())
    }

    /// First kernel interface with any IP stack enabled, sorted by name.
    pub(crate) fn first_ip_iface(&self) -> Option<String> {
        let mut names: Vec<&str> = self
            .kernel_ifaces
            .values()
            .filter(|i| !i.merged.is_absent() && !i.merged.is_ignore())
            .filter(|i| {
                let base = i.merged.base_iface();
                base.is_ipv4_enabled() || base.is_ipv6_enabled()
            })
            .map(|i| i.merged.name())
            .collect();
        names.sort_unstable();
        names.first().map(|n| n.to_string())
    }

    // Child interfaces(VLAN, MAC VLAN, etc) cannot live when their parent
    // is removed.
    fn mark_orphan_interface_as_absent(&mut self) {
        let absent_names: Vec<String> = self
            .kernel_ifaces
            .values()
            .filter(|i| i.is_desired() && i.merged.is_absent())
            .map(|i| i.merged.name().to_string())
            .collect();
        for iface in self.kernel_ifaces.values_mut() {
            if iface.is_desired() || iface.merged.is_absent() {
                continue;
            }
            let parent = match iface.merged.parent() {
                Some(p) => p.to_string(),
                None => continue,
            };
            if absent_names.contains(&parent) {
                log::info!(
                    "Marking interface {} as absent as its parent {} \
                    is marked as absent",
                    iface.merged.name(),
                    parent
                );
                iface.mark_as_absent();
            }
        }
    }

    fn validate_parents_exist(&self) -> Result<(), NetstateError> {
        for iface in self
            .kernel_ifaces
            .values()
            .filter(|i| i.is_changed() && !i.merged.is_absent())
        {
            let parent = match iface.merged.parent() {
                Some(p) => p,
                None => continue,
            };
            match self.kernel_ifaces.get(parent) {
                Some(p) if !p.merged.is_absent() => (),
                _ => {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {} is referring to parent interface \
                            {parent} which does not exist or is marked as \
                            absent",
                            iface.merged.name()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // `copy-mac-from` is resolved to the MAC address of referred interface.
    // Permanent MAC address is preferred as bond port might have its MAC
    // changed.
    fn resolve_copy_mac_from(&mut self) -> Result<(), NetstateError> {
        let mut pending_changes: Vec<(String, String)> = Vec::new();
        for iface in self.kernel_ifaces.values().filter(|i| i.is_changed()) {
            let src_name = match iface
                .for_apply
                .as_ref()
                .and_then(|i| i.base_iface().copy_mac_from.as_deref())
            {
                Some(n) => n,
                None => continue,
            };
            let src_base = match self
                .kernel_ifaces
                .get(src_name)
                .and_then(|i| i.current.as_ref())
            {
                Some(i) => i.base_iface(),
                None => {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Failed to find interface {src_name} for \
                            `copy-mac-from` of interface {}",
                            iface.merged.name()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            };
            match src_base
                .permanent_mac_address
                .as_ref()
                .or(src_base.mac_address.as_ref())
            {
                Some(mac) => pending_changes
                    .push((iface.merged.name().to_string(), mac.to_string())),
                None => {
                    let e = NetstateError::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "Interface {src_name} referred by `copy-mac-from` \
                            of interface {} has no MAC address",
                            iface.merged.name()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        for (iface_name, mac) in pending_changes {
            if let Some(iface) = self.kernel_ifaces.get_mut(&iface_name) {
                iface.apply_change(|i| {
                    let base = i.base_iface_mut();
                    base.mac_address = Some(mac.clone());
                    base.copy_mac_from = None;
                });
            }
        }
        Ok(())
    }

    fn set_up_priority(&mut self) -> Result<(), NetstateError> {
        for _ in 0..INTERFACES_SET_PRIORITY_MAX_RETRY {
            if self.set_ifaces_up_priority() {
                return Ok(());
            }
        }
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            "Failed to set up priority: only nested interface up to 4 levels \
            is supported. To support more nest level, please order the \
            interfaces in desire state to place controller before its ports"
                .to_string(),
        );
        log::error!("{}", e);
        Err(e)
    }
}

impl MergedInterface {
    pub(crate) fn mark_as_absent(&mut self) {
        let mut absent_iface = self.merged.clone_name_type_only();
        absent_iface.base_iface_mut().state = InterfaceState::Absent;
        if self.desired.is_none() {
            self.desired = Some(absent_iface.clone());
        }
        self.for_apply = Some(absent_iface.clone());
        self.for_verify = Some(absent_iface.clone());
        self.merged = absent_iface;
    }

    fn post_inter_ifaces_process(&mut self) -> Result<(), NetstateError> {
        if self.merged.is_absent() || self.merged.is_ignore() {
            return Ok(());
        }
        self.post_inter_ifaces_process_base_iface()?;
        match self.merged.iface_type() {
            InterfaceType::Bond => self.post_inter_ifaces_process_bond()?,
            InterfaceType::Ethernet | InterfaceType::Veth => {
                self.post_inter_ifaces_process_ethernet()?
            }
            InterfaceType::Vrf => self.post_inter_ifaces_process_vrf()?,
            InterfaceType::WireGuard => {
                self.post_inter_ifaces_process_wireguard()?
            }
            _ => (),
        }
        Ok(())
    }
}

fn insert_merged_iface(
    kernel_ifaces: &mut HashMap<String, MergedInterface>,
    user_ifaces: &mut HashMap<(String, InterfaceType), MergedInterface>,
    iface: MergedInterface,
) {
    if iface.merged.is_userspace() {
        user_ifaces.insert(
            (iface.merged.name().to_string(), iface.merged.iface_type()),
            iface,
        );
    } else {
        kernel_ifaces.insert(iface.merged.name().to_string(), iface);
    }
}

fn is_iface_type_compatible(desired: &Interface, current: &Interface) -> bool {
    let des_type = desired.iface_type();
    let cur_type = current.iface_type();
    des_type == InterfaceType::Unknown
        || cur_type == InterfaceType::Unknown
        || des_type == cur_type
        || (matches!(des_type, InterfaceType::Ethernet | InterfaceType::Veth)
            && matches!(
                cur_type,
                InterfaceType::Ethernet | InterfaceType::Veth
            ))
}
