// SPDX-License-Identifier: Apache-2.0

use std::time::{Duration, Instant};

use crate::{
    net_state::{DEFAULT_PHASE_TIMEOUT, DEFAULT_ROLLBACK_TIMEOUT},
    ErrorKind, InterfaceType, MergedNetworkState, NetstateCapability,
    NetstateError, NetstateProvider, NetworkState,
};

const VERIFY_RETRY_COUNT_SRIOV: u32 = 60;
const VERIFY_RETRY_INTERVAL_SRIOV_MILLISECONDS: u64 = 1000;
const APPLY_RETRY_COUNT: u32 = 2;
const MAX_SUPPORTED_INTERFACES: usize = 1000;

impl NetworkState {
    /// Rollback a checkpoint. When `checkpoint` is None, the most recent
    /// checkpoint of provider is used.
    /// Not available for `kernel only` mode.
    pub fn checkpoint_rollback<P>(
        provider: &mut P,
        checkpoint: Option<&str>,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let checkpoint = get_checkpoint(provider, checkpoint)?;
        provider.rollback_checkpoint(&checkpoint)?;
        log::info!("Rollbacked to checkpoint {}", checkpoint);
        Ok(())
    }

    /// Commit a checkpoint. When `checkpoint` is None, the most recent
    /// checkpoint of provider is used.
    /// Not available for `kernel only` mode.
    pub fn checkpoint_commit<P>(
        provider: &mut P,
        checkpoint: Option<&str>,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let checkpoint = get_checkpoint(provider, checkpoint)?;
        provider.commit_checkpoint(&checkpoint)?;
        log::info!("Committed checkpoint {}", checkpoint);
        Ok(())
    }

    /// Retrieve the [NetworkState] from provider honoring flags set by
    /// [NetworkState::set_kernel_only()],
    /// [NetworkState::set_include_secrets()],
    /// [NetworkState::set_include_status_data()] and
    /// [NetworkState::set_running_config_only()].
    pub fn retrieve<P>(
        &mut self,
        provider: &mut P,
    ) -> Result<&mut Self, NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let state = provider.show(self.include_status_data)?;
        self.hostname = state.hostname;
        self.interfaces = state.interfaces;
        self.routes = state.routes;
        self.rules = state.rules;
        self.dns = state.dns;
        self.ovsdb = state.ovsdb;
        self.ovn = state.ovn;
        self.prop_list = vec![
            "hostname",
            "interfaces",
            "routes",
            "rules",
            "dns",
            "ovsdb",
            "ovn",
        ];
        if self.kernel_only {
            self.interfaces.user_ifaces.clear();
            self.ovsdb = None;
            self.ovn = Default::default();
        }
        if self.running_config_only {
            self.strip_dynamic_data();
        }
        if !self.include_secrets {
            self.hide_secrets();
        }
        // Purge user space ignored interfaces
        self.interfaces
            .user_ifaces
            .retain(|_, iface| !iface.is_ignore());
        Ok(self)
    }

    /// Apply the [NetworkState] through specified provider.
    /// Return the checkpoint when [NetworkState::set_commit()] is set to
    /// false, caller should commit or rollback that checkpoint afterwards.
    pub fn apply<P>(
        &self,
        provider: &mut P,
    ) -> Result<Option<String>, NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        if self.interfaces.kernel_ifaces.len()
            + self.interfaces.user_ifaces.len()
            >= MAX_SUPPORTED_INTERFACES
        {
            log::warn!(
                "Interfaces count exceeds the support limit {} in \
                desired state",
                MAX_SUPPORTED_INTERFACES,
            );
        }
        let mut cur_net_state = NetworkState::new();
        cur_net_state.set_kernel_only(self.kernel_only);
        cur_net_state.set_include_secrets(true);
        cur_net_state.retrieve(provider)?;

        self.check_capabilities(provider)?;

        if self.kernel_only
            || !provider.has_capability(NetstateCapability::Checkpoint)
        {
            if !self.kernel_only {
                log::warn!(
                    "Provider {} does not support checkpoint, rollback \
                    will be no-op on failure",
                    provider.name()
                );
            }
            self.apply_with_provider(provider, cur_net_state, None)?;
            return Ok(None);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_ROLLBACK_TIMEOUT);
        let checkpoint = provider.open_checkpoint(timeout)?;
        log::info!("Created checkpoint {}", &checkpoint);

        with_checkpoint(provider, &checkpoint, self.no_commit, |provider| {
            self.apply_with_provider(
                provider,
                cur_net_state,
                Some(checkpoint.as_str()),
            )
        })?;
        if self.no_commit {
            Ok(Some(checkpoint))
        } else {
            Ok(None)
        }
    }

    fn check_capabilities<P>(&self, provider: &P) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let has_ovs = self
            .interfaces
            .iter()
            .any(|i| i.iface_type() == InterfaceType::OvsBridge && i.is_up())
            || self.ovsdb.as_ref().map(|o| !o.is_none()).unwrap_or_default()
            || !self.ovn.is_none();
        if has_ovs && !provider.has_capability(NetstateCapability::Ovs) {
            let e = NetstateError::new(
                ErrorKind::DependencyError,
                format!(
                    "Provider {} does not support OpenvSwitch",
                    provider.name()
                ),
            );
            log::error!("{}", e);
            return Err(e);
        }
        // Kernel only mode uses kernel DHCP client provided by host.
        if self.kernel_only {
            return Ok(());
        }
        for iface in self.interfaces.iter().filter(|i| i.is_up()) {
            let base = iface.base_iface();
            for (is_auto, cap) in [
                (
                    base.ipv4.as_ref().map(|i| i.is_auto()).unwrap_or_default(),
                    NetstateCapability::DhcpV4,
                ),
                (
                    base.ipv6.as_ref().map(|i| i.is_auto()).unwrap_or_default(),
                    NetstateCapability::DhcpV6,
                ),
            ] {
                if is_auto && !provider.has_capability(cap) {
                    let e = NetstateError::new(
                        ErrorKind::DependencyError,
                        format!(
                            "Interface {} requires {cap} capability which \
                            is not supported by provider {}",
                            iface.name(),
                            provider.name()
                        ),
                    );
                    log::error!("{}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn apply_with_provider<P>(
        &self,
        provider: &mut P,
        cur_net_state: NetworkState,
        checkpoint: Option<&str>,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let mut cur_net_state = cur_net_state;
        let mut desired_state = self.clone();

        if let Some(pf_state) =
            desired_state.isolate_sriov_conf_out(&cur_net_state)
        {
            log::info!("Applying SR-IOV PF changes first");
            let pf_merged_state = MergedNetworkState::new(
                pf_state,
                cur_net_state.clone(),
                self.memory_only,
            )?;
            self.apply_merged_state(
                provider,
                &pf_merged_state,
                checkpoint,
                VERIFY_RETRY_COUNT_SRIOV,
            )?;
            cur_net_state.retrieve(provider)?;
        }

        if desired_state.interfaces.has_sriov_reference() {
            // VF interface might show up later than PF changes
            with_retry(
                VERIFY_RETRY_INTERVAL_SRIOV_MILLISECONDS,
                VERIFY_RETRY_COUNT_SRIOV,
                || {
                    cur_net_state.retrieve(provider)?;
                    desired_state
                        .interfaces
                        .resolve_sriov_reference(
                            &cur_net_state.interfaces,
                            provider,
                        )
                },
            )?;
        }

        let merged_state = MergedNetworkState::new(
            desired_state,
            cur_net_state,
            self.memory_only,
        )?;
        let (verify_count, _) = self.verify_retry();
        self.apply_merged_state(
            provider,
            &merged_state,
            checkpoint,
            verify_count,
        )
    }

    fn apply_merged_state<P>(
        &self,
        provider: &mut P,
        merged_state: &MergedNetworkState,
        checkpoint: Option<&str>,
        verify_count: u32,
    ) -> Result<(), NetstateError>
    where
        P: NetstateProvider + ?Sized,
    {
        let timeout = self.timeout.unwrap_or(DEFAULT_ROLLBACK_TIMEOUT);
        let (_, verify_interval) = self.verify_retry();
        let phase_timeout = Duration::from_secs(u64::from(
            self.phase_timeout.unwrap_or(DEFAULT_PHASE_TIMEOUT),
        ));
        // Provider might have unknown race problem found by verify stage,
        // we try to apply the state again if so.
        with_retry(verify_interval, APPLY_RETRY_COUNT, || {
            if let Some(checkpoint) = checkpoint {
                provider.extend_checkpoint_timeout(checkpoint, timeout)?;
            }
            apply_to_provider(provider, merged_state, phase_timeout)?;
            if self.no_verify {
                return Ok(());
            }
            with_retry(verify_interval, verify_count, || {
                if let Some(checkpoint) = checkpoint {
                    provider.extend_checkpoint_timeout(checkpoint, timeout)?;
                }
                let mut new_cur_net_state = NetworkState::new();
                new_cur_net_state.set_kernel_only(self.kernel_only);
                new_cur_net_state.set_include_secrets(true);
                new_cur_net_state.retrieve(provider)?;
                merged_state.verify(&new_cur_net_state)
            })
        })
    }

    /// Whether `current` contains everything defined in `desired`.
    pub fn state_match(desired: &Self, current: &Self) -> bool {
        match MergedNetworkState::new(
            desired.clone(),
            current.clone(),
            desired.memory_only,
        ) {
            Ok(merged_state) => merged_state.verify(current).is_ok(),
            Err(e) => {
                log::debug!("Failed to merge state: {e}");
                false
            }
        }
    }
}

fn apply_to_provider<P>(
    provider: &mut P,
    merged_state: &MergedNetworkState,
    phase_timeout: Duration,
) -> Result<(), NetstateError>
where
    P: NetstateProvider + ?Sized,
{
    let memory_only = merged_state.memory_only;
    let (add_ifaces, edit_ifaces, admin_ifaces) =
        merged_state.interfaces.gen_state_for_apply()?;

    // Add phase: fresh interfaces plus admin state changes, so ports
    // exist before any controller is edited.
    run_phase("add", phase_timeout, || {
        if !add_ifaces.is_empty() {
            log::info!(
                "Adding interfaces: {}",
                iface_names(add_ifaces.as_slice())
            );
            provider.apply_add(add_ifaces.as_slice(), memory_only)?;
        }
        if !admin_ifaces.is_empty() {
            log::info!(
                "Deleting or deactivating interfaces: {}",
                iface_names(admin_ifaces.as_slice())
            );
            provider.apply_admin_state(admin_ifaces.as_slice(), memory_only)?;
        }
        Ok(())
    })?;

    run_phase("edit", phase_timeout, || {
        if !edit_ifaces.is_empty() {
            log::info!(
                "Changing interfaces: {}",
                iface_names(edit_ifaces.as_slice())
            );
            provider.apply_edit(edit_ifaces.as_slice(), memory_only)?;
        }
        if merged_state.is_global_changed() {
            log::info!("Changing global configurations");
            provider
                .apply_global(&merged_state.gen_global_state(), memory_only)?;
        }
        Ok(())
    })
}

// Provider calls are blocking, an overrun phase is detected once the call
// returns and reported as timeout.
fn run_phase<T>(
    phase: &str,
    timeout: Duration,
    func: T,
) -> Result<(), NetstateError>
where
    T: FnOnce() -> Result<(), NetstateError>,
{
    let started = Instant::now();
    func()?;
    let elapsed = started.elapsed();
    if elapsed > timeout {
        let e = NetstateError::new(
            ErrorKind::Timeout,
            format!(
                "The {phase} phase took {} milliseconds, exceeded the \
                timeout of {} seconds",
                elapsed.as_millis(),
                timeout.as_secs()
            ),
        );
        log::error!("{}", e);
        return Err(e);
    }
    log::debug!("The {phase} phase took {} ms", elapsed.as_millis());
    Ok(())
}

fn iface_names(ifaces: &[crate::Interface]) -> String {
    ifaces
        .iter()
        .map(|i| i.name())
        .collect::<Vec<&str>>()
        .join(", ")
}

fn get_checkpoint<P>(
    provider: &P,
    checkpoint: Option<&str>,
) -> Result<String, NetstateError>
where
    P: NetstateProvider + ?Sized,
{
    if let Some(c) = checkpoint {
        Ok(c.to_string())
    } else if let Some(c) = provider.last_checkpoint() {
        Ok(c)
    } else {
        let e = NetstateError::new(
            ErrorKind::InvalidArgument,
            "No checkpoint specified and no active checkpoint found"
                .to_string(),
        );
        log::error!("{}", e);
        Err(e)
    }
}

fn with_checkpoint<P, T>(
    provider: &mut P,
    checkpoint: &str,
    no_commit: bool,
    func: T,
) -> Result<(), NetstateError>
where
    P: NetstateProvider + ?Sized,
    T: FnOnce(&mut P) -> Result<(), NetstateError>,
{
    match func(provider) {
        Ok(()) => {
            if !no_commit {
                provider.commit_checkpoint(checkpoint)?;
                log::info!("Destroyed checkpoint {}", checkpoint);
            } else {
                log::info!("Skipping commit for checkpoint {}", checkpoint);
            }
            Ok(())
        }
        Err(e) => {
            if let Err(e) = provider.rollback_checkpoint(checkpoint) {
                log::warn!("Failed to rollback checkpoint: {}", e);
            } else {
                log::info!("Rollbacked to checkpoint {}", checkpoint);
            }
            Err(e)
        }
    }
}

pub(crate) fn with_retry<T>(
    interval_ms: u64,
    count: u32,
    mut func: T,
) -> Result<(), NetstateError>
where
    T: FnMut() -> Result<(), NetstateError>,
{
    // Zero retry still means one attempt.
    let count = count.max(1);
    let mut attempt = 1u32;
    loop {
        match func() {
            Ok(()) => return Ok(()),
            Err(e) if attempt < count && e.kind().can_retry() => {
                log::info!("Retrying({attempt}/{count}) on: {e}");
                std::thread::sleep(Duration::from_millis(interval_ms));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

impl MergedNetworkState {
    pub(crate) fn verify(
        &self,
        current: &NetworkState,
    ) -> Result<(), NetstateError> {
        self.hostname
            .verify(current.hostname.as_ref(), self.memory_only)?;
        self.interfaces.verify(&current.interfaces)?;
        let ignored_kernel_ifaces: Vec<&str> = self
            .interfaces
            .ignored_ifaces
            .as_slice()
            .iter()
            .filter(|(_, t)| !t.is_userspace())
            .map(|(n, _)| n.as_str())
            .collect();
        self.routes
            .verify(&current.routes, ignored_kernel_ifaces.as_slice())?;
        self.rules
            .verify(&current.rules, ignored_kernel_ifaces.as_slice())?;
        self.dns.verify(&current.dns)?;
        self.ovsdb.verify(current.ovsdb.as_ref())?;
        self.ovn.verify(&current.ovn)?;
        Ok(())
    }
}
