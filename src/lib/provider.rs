// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, Interface, NetstateError, NetworkState};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
/// Feature supported by a [NetstateProvider].
pub enum NetstateCapability {
    /// OpenvSwitch bridge, interface and global database.
    Ovs,
    /// DHCPv4 client.
    DhcpV4,
    /// DHCPv6 client and IPv6 autoconf.
    DhcpV6,
    /// Checkpoint with rollback support.
    Checkpoint,
    /// Providing kernel interfaces of unknown type as they are.
    GenericDeviceHandler,
    /// Creating SR-IOV VFs.
    SrIov,
}

impl std::fmt::Display for NetstateCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Ovs => "ovs",
                Self::DhcpV4 => "dhcp-v4",
                Self::DhcpV6 => "dhcp-v6",
                Self::Checkpoint => "checkpoint",
                Self::GenericDeviceHandler => "generic-device-handler",
                Self::SrIov => "sr-iov",
            }
        )
    }
}

/// The executor of network changes.
///
/// The engine hands over fully merged interfaces with metadata attached:
/// controller linkage in [crate::BaseInterface::controller], routes, route
/// rules and DNS placed on the IP stacks through
/// [crate::InterfaceIpv4::routes()] and friends.
///
/// Methods are invoked in this order during
/// [NetworkState::apply()]:
///  1. [NetstateProvider::open_checkpoint()] unless in kernel only mode.
///  2. [NetstateProvider::apply_add()] for interfaces to create.
///  3. [NetstateProvider::apply_admin_state()] for interfaces to delete or
///     bring down.
///  4. [NetstateProvider::apply_edit()] for existing interfaces.
///  5. [NetstateProvider::apply_global()] for host name, DNS and OVS
///     database.
///  6. [NetstateProvider::show()] for verification.
///  7. [NetstateProvider::commit_checkpoint()] or
///     [NetstateProvider::rollback_checkpoint()].
pub trait NetstateProvider {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Vec<NetstateCapability>;

    fn has_capability(&self, cap: NetstateCapability) -> bool {
        self.capabilities().contains(&cap)
    }

    /// Query the network state. Secrets should be included as engine
    /// hides them when required.
    fn show(
        &mut self,
        include_status_data: bool,
    ) -> Result<NetworkState, NetstateError>;

    fn apply_add(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError>;

    fn apply_edit(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError>;

    /// Interfaces marked as down or absent.
    fn apply_admin_state(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError>;

    /// Only changed `hostname`, `dns-resolver`, `ovs-db` and `ovn` sections
    /// are set. The `dns-resolver.config` holds the full merged config.
    fn apply_global(
        &mut self,
        state: &NetworkState,
        memory_only: bool,
    ) -> Result<(), NetstateError>;

    /// Create checkpoint which will be rolled back automatically after
    /// `timeout` seconds.
    fn open_checkpoint(
        &mut self,
        timeout: u32,
    ) -> Result<String, NetstateError> {
        let _ = timeout;
        Err(no_checkpoint_error(self.name()))
    }

    fn commit_checkpoint(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        let _ = checkpoint;
        Err(no_checkpoint_error(self.name()))
    }

    fn rollback_checkpoint(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        let _ = checkpoint;
        Err(no_checkpoint_error(self.name()))
    }

    /// Extend the auto rollback timeout of checkpoint.
    fn extend_checkpoint_timeout(
        &mut self,
        checkpoint: &str,
        timeout: u32,
    ) -> Result<(), NetstateError> {
        let _ = (checkpoint, timeout);
        Ok(())
    }

    /// The most recently created checkpoint which is not committed or rolled
    /// back yet.
    fn last_checkpoint(&self) -> Option<String> {
        None
    }

    /// Resolve the interface name of specified VF. Return `Ok(None)` if VF
    /// is not created yet.
    fn resolve_vf_reference(
        &mut self,
        pf_name: &str,
        vf_id: u32,
    ) -> Result<Option<String>, NetstateError> {
        let _ = (pf_name, vf_id);
        Ok(None)
    }
}

fn no_checkpoint_error(provider: &str) -> NetstateError {
    let e = NetstateError::new(
        ErrorKind::DependencyError,
        format!("Provider {provider} does not support checkpoint"),
    );
    log::error!("{}", e);
    e
}
