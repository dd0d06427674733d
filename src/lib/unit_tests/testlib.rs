// SPDX-License-Identifier: Apache-2.0

use crate::{
    Interface, InterfaceType, MemoryProvider, MergedNetworkState,
    NetstateError, NetstateProvider, NetworkState,
};

pub(crate) fn new_provider(current_yaml: &str) -> MemoryProvider {
    let current: NetworkState = serde_yaml::from_str(current_yaml).unwrap();
    MemoryProvider::new_with_state(&current)
}

// Short verification retry, memory provider settles instantly.
pub(crate) fn apply_yaml<P>(
    provider: &mut P,
    desired_yaml: &str,
) -> Result<Option<String>, NetstateError>
where
    P: NetstateProvider + ?Sized,
{
    let mut desired: NetworkState = serde_yaml::from_str(desired_yaml)?;
    desired.set_verify_retry(2, 10);
    desired.apply(provider)
}

pub(crate) fn show<P>(provider: &mut P) -> NetworkState
where
    P: NetstateProvider + ?Sized,
{
    let mut state = NetworkState::new();
    state.set_include_secrets(true);
    state.retrieve(provider).unwrap().clone()
}

pub(crate) fn get_iface<'a>(
    state: &'a NetworkState,
    name: &str,
) -> &'a Interface {
    state
        .interfaces
        .get_iface(name, InterfaceType::Unknown)
        .unwrap()
}

pub(crate) fn merge_yaml(
    desired_yaml: &str,
    current_yaml: &str,
) -> Result<MergedNetworkState, NetstateError> {
    let desired: NetworkState = serde_yaml::from_str(desired_yaml).unwrap();
    let current: NetworkState = serde_yaml::from_str(current_yaml).unwrap();
    MergedNetworkState::new(desired, current, false)
}

pub(crate) fn for_apply<'a>(
    merged_state: &'a MergedNetworkState,
    name: &str,
) -> &'a Interface {
    merged_state
        .interfaces
        .kernel_ifaces
        .get(name)
        .and_then(|i| i.for_apply.as_ref())
        .unwrap()
}
