// SPDX-License-Identifier: Apache-2.0

use crate::{
    ifaces::sriov::{parse_sriov_vf_naming, SRIOV_VF_NAMING_PREFIX},
    ErrorKind, EthernetConfig, EthernetInterface, Interface, InterfaceType,
    Interfaces, NetstateError, NetstateProvider, NetworkState, SrIovConfig,
};

impl EthernetInterface {
    pub(crate) fn verify_sriov(
        &self,
        cur_ifaces: &Interfaces,
    ) -> Result<(), NetstateError> {
        if let Some(sriov_conf) =
            self.ethernet.as_ref().and_then(|e| e.sr_iov.as_ref())
        {
            sriov_conf.verify_sriov(self.base.name.as_str(), cur_ifaces)?;
        }
        Ok(())
    }
}

impl SrIovConfig {
    // Many SRIOV card require extra time for kernel and udev to setup the
    // VF interface. This function will wait VF interface been found in
    // cur_ifaces.
    // This function does not handle the decrease of SRIOV count(interface been
    // removed from kernel) as kernel does not require extra time on deleting
    // interface.
    pub(crate) fn verify_sriov(
        &self,
        pf_name: &str,
        cur_ifaces: &Interfaces,
    ) -> Result<(), NetstateError> {
        let cur_pf_iface =
            match cur_ifaces.get_iface(pf_name, InterfaceType::Ethernet) {
                Some(Interface::Ethernet(i)) => i,
                _ => {
                    let e = NetstateError::new(
                        ErrorKind::VerificationError,
                        format!("Failed to find PF interface {pf_name}"),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            };

        let cur_sriov_conf = match cur_pf_iface
            .ethernet
            .as_ref()
            .and_then(|eth_conf| eth_conf.sr_iov.as_ref())
        {
            Some(c) => c,
            None => return Ok(()),
        };
        let total_vfs = self.total_vfs.unwrap_or_default();
        for vf_id in 0..total_vfs {
            let vf_name = match cur_sriov_conf.get_vf_iface_name(vf_id) {
                Some(n) => n,
                None => {
                    let e = NetstateError::new(
                        ErrorKind::VerificationError,
                        format!(
                            "Failed to find VF {vf_id} interface name of \
                            PF {pf_name}"
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            };
            if cur_ifaces
                .get_iface(vf_name, InterfaceType::Ethernet)
                .is_none()
            {
                let e = NetstateError::new(
                    ErrorKind::VerificationError,
                    format!(
                        "VF {vf_id} interface {vf_name} of PF {pf_name} \
                        does not exist yet"
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Interfaces {
    /// Replace `sriov:<pf>:<vf_id>` references in interface names, port
    /// lists and parents with the real VF interface name.
    pub(crate) fn resolve_sriov_reference<P>(
        &mut self,
        current: &Self,
        provider: &mut P,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        self.resolve_sriov_reference_iface_name(current, provider)?;
        self.resolve_sriov_reference_port_name(current, provider)?;
        self.resolve_sriov_reference_parent_name(current, provider)?;
        Ok(())
    }

    pub(crate) fn has_sriov_reference(&self) -> bool {
        self.iter().any(|iface| {
            iface.name().starts_with(SRIOV_VF_NAMING_PREFIX)
                || iface
                    .parent()
                    .map(|p| p.starts_with(SRIOV_VF_NAMING_PREFIX))
                    .unwrap_or_default()
                || iface
                    .ports()
                    .unwrap_or_default()
                    .iter()
                    .any(|p| p.starts_with(SRIOV_VF_NAMING_PREFIX))
        })
    }

    fn resolve_sriov_reference_iface_name<P>(
        &mut self,
        current: &Self,
        provider: &mut P,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let mut changed_iface_names: Vec<(String, String)> = Vec::new();
        for iface in self.kernel_ifaces.values() {
            if let Some((pf_name, vf_id)) = parse_sriov_vf_naming(iface.name())?
            {
                let vf_iface_name =
                    resolve_vf_name(current, provider, pf_name, vf_id)?;
                log::info!(
                    "SR-IOV VF {} resolved to interface name {}",
                    iface.name(),
                    vf_iface_name
                );
                changed_iface_names
                    .push((iface.name().to_string(), vf_iface_name));
            }
        }
        for (org_name, new_name) in changed_iface_names {
            if self.kernel_ifaces.contains_key(&new_name) {
                let e = NetstateError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "SR-IOV VF name {org_name} has been resolved as \
                        interface {new_name}, but it is already defined in \
                        desire state"
                    ),
                );
                log::error!("{}", e);
                return Err(e);
            }
            if let Some(mut iface) = self.kernel_ifaces.remove(&org_name) {
                iface.base_iface_mut().name.clone_from(&new_name);
                self.kernel_ifaces.insert(new_name.clone(), iface);
            }
            for (name, _) in self.insert_order.iter_mut() {
                if name == &org_name {
                    name.clone_from(&new_name);
                }
            }
        }
        Ok(())
    }

    fn resolve_sriov_reference_port_name<P>(
        &mut self,
        current: &Self,
        provider: &mut P,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        //  pending_changes:
        //      Vec<(ctrl_name, ctrl_iface_type, origin_name, new_name)>
        let mut pending_changes = Vec::new();
        for iface in self.iter().filter(|i| i.is_controller()) {
            for port in iface.ports().unwrap_or_default() {
                if let Some((pf_name, vf_id)) = parse_sriov_vf_naming(port)? {
                    let vf_iface_name =
                        resolve_vf_name(current, provider, pf_name, vf_id)?;
                    log::info!(
                        "SR-IOV VF {} resolved to interface name {}",
                        port,
                        vf_iface_name
                    );
                    pending_changes.push((
                        iface.name().to_string(),
                        iface.iface_type(),
                        port.to_string(),
                        vf_iface_name,
                    ));
                }
            }
        }
        for (ctrl, ctrl_iface_type, origin_name, new_name) in pending_changes {
            if let Some(iface) = self.get_iface_mut(&ctrl, ctrl_iface_type) {
                iface.change_port_name(origin_name.as_str(), new_name.as_str());
            }
        }
        Ok(())
    }

    fn resolve_sriov_reference_parent_name<P>(
        &mut self,
        current: &Self,
        provider: &mut P,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let mut pending_changes: Vec<(String, String)> = Vec::new();
        for iface in self.kernel_ifaces.values() {
            if let Some((pf_name, vf_id)) = iface
                .parent()
                .map(parse_sriov_vf_naming)
                .transpose()?
                .flatten()
            {
                let vf_iface_name =
                    resolve_vf_name(current, provider, pf_name, vf_id)?;
                pending_changes
                    .push((iface.name().to_string(), vf_iface_name));
            }
        }
        for (iface_name, parent) in pending_changes {
            if let Some(iface) = self.kernel_ifaces.get_mut(&iface_name) {
                iface.change_parent_name(parent.as_str());
            }
        }
        Ok(())
    }
}

// Lookup VF name in current state first, then ask provider.
fn resolve_vf_name<P>(
    current: &Interfaces,
    provider: &mut P,
    pf_name: &str,
    vf_id: u32,
) -> Result<String, NetstateError>
where
    P: NetstateProvider + ?Sized,
{
    if let Some(Interface::Ethernet(pf_iface)) =
        current.get_iface(pf_name, InterfaceType::Ethernet)
    {
        if let Some(name) = pf_iface
            .ethernet
            .as_ref()
            .and_then(|e| e.sr_iov.as_ref())
            .and_then(|s| s.get_vf_iface_name(vf_id))
        {
            return Ok(name.to_string());
        }
    }
    if let Some(name) = provider.resolve_vf_reference(pf_name, vf_id)? {
        return Ok(name);
    }
    let e = NetstateError::new(
        ErrorKind::SrIovVfNotFound,
        format!("Failed to find VF {vf_id} of SR-IOV PF {pf_name}"),
    );
    log::error!("{}", e);
    Err(e)
}

impl NetworkState {
    // SR-IOV PF changes are applied before everything else as VFs
    // referred by other interfaces only show up after that.
    pub(crate) fn isolate_sriov_conf_out(
        &self,
        current: &Self,
    ) -> Option<Self> {
        let mut pf_state = NetworkState::new();
        for iface in self.interfaces.kernel_ifaces.values() {
            let eth_iface = match iface {
                Interface::Ethernet(i)
                    if i.base.iface_type == InterfaceType::Ethernet =>
                {
                    i
                }
                _ => continue,
            };
            let sriov_conf = match eth_iface
                .ethernet
                .as_ref()
                .and_then(|e| e.sr_iov.as_ref())
            {
                Some(c) => c,
                None => continue,
            };
            let cur_total_vfs = match current
                .interfaces
                .get_iface(iface.name(), InterfaceType::Ethernet)
            {
                Some(Interface::Ethernet(cur)) => cur
                    .ethernet
                    .as_ref()
                    .and_then(|e| e.sr_iov.as_ref())
                    .and_then(|s| s.total_vfs),
                _ => None,
            };
            if sriov_conf.total_vfs.is_none()
                || sriov_conf.total_vfs == cur_total_vfs
            {
                continue;
            }
            let mut pf_iface = EthernetInterface::new();
            pf_iface.base = eth_iface.base.clone_name_type_only();
            // VF settings are applied in the second pass when VFs exist.
            pf_iface.ethernet = Some(EthernetConfig {
                sr_iov: Some(SrIovConfig {
                    total_vfs: sriov_conf.total_vfs,
                    drivers_autoprobe: sriov_conf.drivers_autoprobe,
                    vfs: None,
                }),
                ..Default::default()
            });
            pf_state.interfaces.push(Interface::Ethernet(pf_iface));
        }
        if pf_state.interfaces.is_empty() {
            None
        } else {
            pf_state.prop_list.push("interfaces");
            Some(pf_state)
        }
    }
}
