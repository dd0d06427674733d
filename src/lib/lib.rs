// SPDX-License-Identifier: Apache-2.0

//! Declarative network state engine.
//!
//! Desired [NetworkState] is merged with the current state retrieved from a
//! [NetstateProvider], cross interface metadata(controller linkage, routes,
//! route rules and DNS placement) is generated, the changes are handed to
//! the provider under a checkpoint and then verified against the newly
//! retrieved state.
//!
//! ```no_run
//! use netstate::{MemoryProvider, NetworkState};
//!
//! let mut provider = MemoryProvider::new();
//! let desired = NetworkState::new_from_yaml(
//!     r"---
//!     interfaces:
//!     - name: dummy1
//!       type: dummy
//!       state: up
//!     ",
//! )
//! .unwrap();
//! desired.apply(&mut provider).unwrap();
//! ```

mod deserializer;
mod dns;
mod error;
mod gen_diff;
mod hostname;
mod iface;
mod ifaces;
mod ip;
mod iplib;
mod memory;
mod mptcp;
mod net_state;
mod ovn;
mod ovs;
mod provider;
mod query_apply;
mod route;
mod route_rule;
mod running_config;
mod schema;
mod serializer;
mod state;
#[cfg(test)]
mod unit_tests;

pub use crate::dns::{DnsClientState, DnsState};
pub(crate) use crate::dns::MergedDnsState;
pub use crate::error::{ErrorKind, NetstateError, VerificationDiff};
pub use crate::hostname::HostNameState;
pub(crate) use crate::hostname::MergedHostNameState;
pub(crate) use crate::iface::MergedInterface;
pub use crate::iface::{
    Interface, InterfaceState, InterfaceType, UnknownInterface,
};
pub(crate) use crate::ifaces::MergedInterfaces;
pub use crate::ifaces::{
    BaseInterface, BondConfig, BondInterface, BondMode, BondOptions,
    BondPortConfig, BridgePortTrunkTag, BridgePortVlanConfig,
    BridgePortVlanMode, BridgePortVlanRange, DispatchConfig,
    DispatchInterface, DummyInterface, EthernetConfig, EthernetDuplex,
    EthernetInterface, EthtoolCoalesceConfig, EthtoolConfig,
    EthtoolPauseConfig, EthtoolRingConfig, HsrConfig, HsrInterface,
    HsrProtocol, InfiniBandConfig, InfiniBandInterface, InfiniBandMode,
    InterfaceIdentifier, Interfaces, IpVlanConfig, IpVlanInterface,
    IpVlanMode, LinuxBridgeConfig, LinuxBridgeInterface,
    LinuxBridgeMulticastRouterType, LinuxBridgeOptions, LinuxBridgePortConfig,
    LinuxBridgeStpOptions, LoopbackInterface, MacSecConfig, MacSecInterface,
    MacSecValidate, MacVlanConfig, MacVlanInterface, MacVlanMode,
    MacVtapConfig, MacVtapInterface, MacVtapMode, OvsBridgeBondConfig,
    OvsBridgeBondMode, OvsBridgeBondPortConfig, OvsBridgeConfig,
    OvsBridgeInterface, OvsBridgeOptions, OvsBridgePortConfig, OvsDpdkConfig,
    OvsInterface, OvsPatchConfig, SrIovConfig, SrIovVfConfig,
    SrIovVfVlanProto, VethConfig, VlanConfig, VlanInterface, VlanProtocol,
    VrfConfig, VrfInterface, VxlanConfig, VxlanInterface, WireGuardConfig,
    WireGuardInterface, WireGuardIpAddress, WireGuardPeerConfig,
};
pub use crate::ip::{
    AddressFamily, Dhcpv4ClientId, Dhcpv6Duid, InterfaceIpAddr,
    InterfaceIpv4, InterfaceIpv6, Ipv6AddrGenMode, WaitIp,
};
pub use crate::iplib::{
    canonicalize_ip_addr, is_ip_in_net, is_subnet_of, parse_ip_addr,
    parse_ip_net, sanitize_ip_network,
};
pub use crate::memory::{
    MemoryCheckpointSnapshot, MemoryProvider, MemorySnapshot,
};
pub use crate::mptcp::{MptcpAddressFlag, MptcpConfig};
pub(crate) use crate::net_state::MergedNetworkState;
pub use crate::net_state::NetworkState;
pub use crate::ovn::{
    OvnBridgeMapping, OvnBridgeMappingState, OvnConfiguration,
};
pub(crate) use crate::ovs::MergedOvsDbGlobalConfig;
pub use crate::ovs::{OvsDbGlobalConfig, OvsDbIfaceConfig};
pub use crate::provider::{NetstateCapability, NetstateProvider};
pub(crate) use crate::route::MergedRoutes;
pub use crate::route::{RouteEntry, RouteState, RouteType, Routes};
pub(crate) use crate::route_rule::MergedRouteRules;
pub use crate::route_rule::{
    RouteRuleAction, RouteRuleEntry, RouteRuleState, RouteRules,
};
