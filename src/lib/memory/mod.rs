// SPDX-License-Identifier: Apache-2.0

mod apply;
mod checkpoint;
mod show;
mod snapshot;

use crate::{
    DnsClientState, ErrorKind, HostNameState, Interface, Interfaces,
    NetstateCapability, NetstateError, NetstateProvider, NetworkState,
    OvnConfiguration, OvsDbGlobalConfig, RouteEntry, RouteRuleEntry,
};

pub(crate) use self::checkpoint::MemoryCheckpoint;
pub use self::snapshot::{MemoryCheckpointSnapshot, MemorySnapshot};

const PROVIDER_NAME: &str = "memory";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MemoryState {
    pub(crate) ifaces: Interfaces,
    pub(crate) routes: Vec<RouteEntry>,
    pub(crate) rules: Vec<RouteRuleEntry>,
    pub(crate) dns: Option<DnsClientState>,
    // DNS placements received in current transaction.
    pub(crate) pending_dns: Vec<DnsClientState>,
    pub(crate) hostname: Option<HostNameState>,
    pub(crate) ovsdb: Option<OvsDbGlobalConfig>,
    pub(crate) ovn: OvnConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// In-memory [NetstateProvider] simulating how Linux kernel and network
/// daemon react on changes:
///  * IPv6 link-local address is assigned to IPv6 enabled interfaces.
///  * SR-IOV VFs show up as `<pf>v<vf_id>` ethernet interfaces.
///  * Veth peer is created along with veth.
///  * OVS patch interface holds no MTU.
///  * Routes, route rules and DNS are rebuilt from interface metadata.
///
/// Checkpoint holds a snapshot of the whole state, auto rollback on timeout
/// is not simulated.
pub struct MemoryProvider {
    pub(crate) state: MemoryState,
    pub(crate) capabilities: Vec<NetstateCapability>,
    pub(crate) checkpoint: Option<MemoryCheckpoint>,
    pub(crate) fail_apply: bool,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self {
            state: MemoryState::default(),
            capabilities: vec![
                NetstateCapability::Ovs,
                NetstateCapability::DhcpV4,
                NetstateCapability::DhcpV6,
                NetstateCapability::Checkpoint,
                NetstateCapability::GenericDeviceHandler,
                NetstateCapability::SrIov,
            ],
            checkpoint: None,
            fail_apply: false,
        }
    }
}

impl MemoryProvider {
    /// Empty provider with all capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider seeded with specified state as if it were the running
    /// network state. Interface metadata is not required, routes, rules
    /// and DNS are taken from their own sections.
    pub fn new_with_state(state: &NetworkState) -> Self {
        let mut ret = Self::new();
        for iface in state.interfaces.to_vec() {
            ret.state.ifaces.push(iface.clone());
        }
        ret.state.routes = state.routes.config.clone().unwrap_or_default();
        ret.state.routes.sort_unstable();
        ret.state.rules = state.rules.config.clone().unwrap_or_default();
        ret.state.rules.sort_unstable();
        ret.state.dns.clone_from(&state.dns.config);
        ret.state.hostname.clone_from(&state.hostname);
        ret.state.ovsdb.clone_from(&state.ovsdb);
        ret.state.ovn = state.ovn.clone();
        ret
    }

    pub fn set_capabilities(
        &mut self,
        capabilities: &[NetstateCapability],
    ) -> &mut Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    /// Make every following `apply_*` call fail with
    /// [ErrorKind::PluginFailure].
    pub fn set_fail_apply(&mut self, value: bool) -> &mut Self {
        self.fail_apply = value;
        self
    }

    fn check_fail_apply(&self) -> Result<(), NetstateError> {
        if self.fail_apply {
            let e = NetstateError::new(
                ErrorKind::PluginFailure,
                "Simulated failure of memory provider".to_string(),
            );
            log::error!("{}", e);
            Err(e)
        } else {
            Ok(())
        }
    }
}

impl NetstateProvider for MemoryProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn capabilities(&self) -> Vec<NetstateCapability> {
        self.capabilities.clone()
    }

    fn show(
        &mut self,
        include_status_data: bool,
    ) -> Result<NetworkState, NetstateError> {
        Ok(self.state.to_net_state(include_status_data))
    }

    fn apply_add(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        self.check_fail_apply()?;
        log::debug!("Memory only {memory_only} has no effect on interfaces");
        for iface in ifaces {
            self.state.store_iface(iface)?;
        }
        Ok(())
    }

    fn apply_edit(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        self.check_fail_apply()?;
        log::debug!("Memory only {memory_only} has no effect on interfaces");
        for iface in ifaces {
            self.state.store_iface(iface)?;
        }
        Ok(())
    }

    fn apply_admin_state(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        self.check_fail_apply()?;
        log::debug!("Memory only {memory_only} has no effect on interfaces");
        for iface in ifaces {
            self.state.deactivate_iface(iface);
        }
        Ok(())
    }

    fn apply_global(
        &mut self,
        state: &NetworkState,
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        self.check_fail_apply()?;
        self.state.apply_global(state, memory_only);
        Ok(())
    }

    fn open_checkpoint(
        &mut self,
        timeout: u32,
    ) -> Result<String, NetstateError> {
        self.checkpoint_create(timeout)
    }

    fn commit_checkpoint(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        self.checkpoint_destroy(checkpoint)
    }

    fn rollback_checkpoint(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        self.checkpoint_rollback(checkpoint)
    }

    fn extend_checkpoint_timeout(
        &mut self,
        checkpoint: &str,
        timeout: u32,
    ) -> Result<(), NetstateError> {
        self.checkpoint_timeout_extend(checkpoint, timeout)
    }

    fn last_checkpoint(&self) -> Option<String> {
        self.checkpoint.as_ref().map(|c| c.id.clone())
    }

    fn resolve_vf_reference(
        &mut self,
        pf_name: &str,
        vf_id: u32,
    ) -> Result<Option<String>, NetstateError> {
        Ok(self.state.vf_iface_name(pf_name, vf_id))
    }
}
