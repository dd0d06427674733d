// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::{
    unit_tests::testlib::{apply_yaml, get_iface, new_provider, show},
    ErrorKind, Interface, InterfaceType, MemoryProvider, NetstateCapability,
    NetstateError, NetstateProvider, NetworkState,
};

const ETH1: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  mtu: 1500
";

const ETH1_MTU_9000: &str = r"---
interfaces:
- name: eth1
  type: ethernet
  state: up
  mtu: 9000
";

fn apply_no_commit(
    provider: &mut MemoryProvider,
    desired_yaml: &str,
) -> Result<Option<String>, NetstateError> {
    let mut desired: NetworkState = serde_yaml::from_str(desired_yaml)?;
    desired.set_commit(false).set_verify_retry(2, 10);
    desired.apply(provider)
}

fn eth1_mtu<P: NetstateProvider>(provider: &mut P) -> Option<u64> {
    show(provider)
        .interfaces
        .get_iface("eth1", InterfaceType::Ethernet)
        .and_then(|i| i.base_iface().mtu)
}

enum EditFault {
    // Acknowledge interface changes without doing them.
    Ignore,
    Slow(Duration),
}

struct FaultyProvider {
    inner: MemoryProvider,
    fault: EditFault,
}

impl FaultyProvider {
    fn new(current_yaml: &str, fault: EditFault) -> Self {
        Self {
            inner: new_provider(current_yaml),
            fault,
        }
    }
}

impl NetstateProvider for FaultyProvider {
    fn name(&self) -> &str {
        "faulty"
    }

    fn capabilities(&self) -> Vec<NetstateCapability> {
        self.inner.capabilities()
    }

    fn show(
        &mut self,
        include_status_data: bool,
    ) -> Result<NetworkState, NetstateError> {
        self.inner.show(include_status_data)
    }

    fn apply_add(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        self.inner.apply_add(ifaces, memory_only)
    }

    fn apply_edit(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        match self.fault {
            EditFault::Ignore => Ok(()),
            EditFault::Slow(delay) => {
                std::thread::sleep(delay);
                self.inner.apply_edit(ifaces, memory_only)
            }
        }
    }

    fn apply_admin_state(
        &mut self,
        ifaces: &[Interface],
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        self.inner.apply_admin_state(ifaces, memory_only)
    }

    fn apply_global(
        &mut self,
        state: &NetworkState,
        memory_only: bool,
    ) -> Result<(), NetstateError> {
        self.inner.apply_global(state, memory_only)
    }

    fn open_checkpoint(
        &mut self,
        timeout: u32,
    ) -> Result<String, NetstateError> {
        self.inner.open_checkpoint(timeout)
    }

    fn commit_checkpoint(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        self.inner.commit_checkpoint(checkpoint)
    }

    fn rollback_checkpoint(
        &mut self,
        checkpoint: &str,
    ) -> Result<(), NetstateError> {
        self.inner.rollback_checkpoint(checkpoint)
    }

    fn last_checkpoint(&self) -> Option<String> {
        self.inner.last_checkpoint()
    }
}

#[test]
fn test_checkpoint_no_commit_then_rollback() {
    let mut provider = new_provider(ETH1);
    let checkpoint = apply_no_commit(&mut provider, ETH1_MTU_9000)
        .unwrap()
        .unwrap();
    assert_eq!(provider.last_checkpoint(), Some(checkpoint.clone()));
    assert_eq!(eth1_mtu(&mut provider), Some(9000));

    NetworkState::checkpoint_rollback(&mut provider, Some(&checkpoint))
        .unwrap();
    assert_eq!(eth1_mtu(&mut provider), Some(1500));
    assert_eq!(provider.last_checkpoint(), None);
}

#[test]
fn test_checkpoint_no_commit_then_commit_latest() {
    let mut provider = new_provider(ETH1);
    apply_no_commit(&mut provider, ETH1_MTU_9000).unwrap();

    NetworkState::checkpoint_commit(&mut provider, None).unwrap();
    assert_eq!(eth1_mtu(&mut provider), Some(9000));
    assert_eq!(provider.last_checkpoint(), None);
}

#[test]
fn test_checkpoint_conflict() {
    let mut provider = new_provider(ETH1);
    provider.open_checkpoint(60).unwrap();

    let result = apply_yaml(&mut provider, ETH1_MTU_9000);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ConflictError);
    }
    assert_eq!(eth1_mtu(&mut provider), Some(1500));
}

#[test]
fn test_checkpoint_not_found() {
    let mut provider = new_provider(ETH1);
    let result = NetworkState::checkpoint_rollback(&mut provider, None);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
    let result = NetworkState::checkpoint_commit(
        &mut provider,
        Some("/memory/checkpoint/not-exist"),
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_checkpoint_rollback_on_provider_failure() {
    let mut provider = new_provider(ETH1);
    provider.set_fail_apply(true);

    let result = apply_yaml(&mut provider, ETH1_MTU_9000);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::PluginFailure);
    }
    assert_eq!(provider.last_checkpoint(), None);

    provider.set_fail_apply(false);
    assert_eq!(eth1_mtu(&mut provider), Some(1500));
}

#[test]
fn test_checkpoint_rollback_on_verification_failure() {
    let mut provider = FaultyProvider::new(ETH1, EditFault::Ignore);
    let result = apply_yaml(
        &mut provider,
        r"---
interfaces:
- name: dummy1
  type: dummy
  state: up
- name: eth1
  type: ethernet
  state: up
  mtu: 9000
",
    );
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::VerificationError);
    }
    assert_eq!(provider.last_checkpoint(), None);
    // The interface created before verification failure is rolled back.
    let state = show(&mut provider);
    assert!(state
        .interfaces
        .get_iface("dummy1", InterfaceType::Dummy)
        .is_none());
    assert_eq!(get_iface(&state, "eth1").base_iface().mtu, Some(1500));
}

#[test]
fn test_checkpoint_skipped_in_kernel_only_mode() {
    let mut provider = new_provider(ETH1);
    let mut desired: NetworkState =
        serde_yaml::from_str(ETH1_MTU_9000).unwrap();
    desired
        .set_kernel_only(true)
        .set_commit(false)
        .set_verify_retry(2, 10);

    assert_eq!(desired.apply(&mut provider).unwrap(), None);
    assert_eq!(provider.last_checkpoint(), None);
    assert_eq!(eth1_mtu(&mut provider), Some(9000));
}

#[test]
fn test_checkpoint_skipped_without_capability() {
    let mut provider = new_provider(ETH1);
    provider.set_capabilities(&[
        NetstateCapability::DhcpV4,
        NetstateCapability::DhcpV6,
    ]);

    assert_eq!(apply_yaml(&mut provider, ETH1_MTU_9000).unwrap(), None);
    assert_eq!(eth1_mtu(&mut provider), Some(9000));
}

#[test]
fn test_checkpoint_zero_verify_retry_still_verifies() {
    let mut provider = FaultyProvider::new(ETH1, EditFault::Ignore);
    let mut desired: NetworkState =
        serde_yaml::from_str(ETH1_MTU_9000).unwrap();
    desired.set_verify_retry(0, 10);

    let result = desired.apply(&mut provider);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::VerificationError);
    }
    assert_eq!(provider.last_checkpoint(), None);
    assert_eq!(eth1_mtu(&mut provider), Some(1500));
}

#[test]
fn test_checkpoint_rollback_on_phase_timeout() {
    let mut provider = FaultyProvider::new(
        ETH1,
        EditFault::Slow(Duration::from_millis(1100)),
    );
    let mut desired: NetworkState =
        serde_yaml::from_str(ETH1_MTU_9000).unwrap();
    desired.set_phase_timeout(1).set_verify_retry(2, 10);

    let result = desired.apply(&mut provider);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::Timeout);
    }
    assert_eq!(provider.last_checkpoint(), None);
    assert_eq!(eth1_mtu(&mut provider), Some(1500));
}

#[test]
fn test_checkpoint_slow_phase_within_timeout() {
    let mut provider = FaultyProvider::new(
        ETH1,
        EditFault::Slow(Duration::from_millis(50)),
    );
    apply_yaml(&mut provider, ETH1_MTU_9000).unwrap();
    assert_eq!(eth1_mtu(&mut provider), Some(9000));
}
