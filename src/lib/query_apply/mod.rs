// SPDX-License-Identifier: Apache-2.0

mod base;
mod dns;
mod hostname;
mod iface;
mod inter_ifaces;
mod ip;
mod net_state;
mod ovn;
mod ovs;
mod route;
mod route_rule;
mod sriov;
